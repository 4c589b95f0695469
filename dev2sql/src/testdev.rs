//! Hand-built miniature devices for the unit tests.

use std::cell::Cell;
use std::collections::HashMap;

use devrex_rawdev::{
    Bel, BelClass, BelPinDef, Device, Grade, NodeDef, Package, PackagePin, PinDir, Pip, PipKind,
    RtPin, Series, Site, SiteKind, SitePin, SitePip, SiteWire, Tile, TileId, TileWire,
    WireCategory,
};
use unnamed_entity::{EntityId, EntityMap, EntitySet, EntityVec};

use crate::sink::Sink;
use crate::ExportSession;

fn pin(name: &str, dir: PinDir) -> BelPinDef {
    BelPinDef {
        name: name.to_string(),
        dir,
    }
}

fn bel(kind: &str, class: BelClass, pins: &[(&str, PinDir)]) -> Bel {
    Bel {
        kind: kind.to_string(),
        class,
        pins: pins.iter().map(|&(n, d)| pin(n, d)).collect(),
        non_inverting_pin: None,
        inverting_pin: None,
    }
}

fn port_bel(pin_name: &str, dir: PinDir) -> Bel {
    bel("PORT", BelClass::SitePort, &[(pin_name, dir)])
}

/// SLICE with 5 BELs and 11 BEL pins: LUT (3 declared), FF (2 declared
/// plus both implicit inverter pins), one routing BEL (2), two port BELs
/// (1 each).
fn slice_kind() -> SiteKind {
    let mut bels = EntityMap::new();
    let lut = bels
        .insert(
            "LUT".to_string(),
            bel(
                "LUT6",
                BelClass::Logic,
                &[
                    ("I0", PinDir::Input),
                    ("I1", PinDir::Input),
                    ("O", PinDir::Output),
                ],
            ),
        )
        .0;
    let mut ff = bel(
        "FDRE",
        BelClass::Logic,
        &[("D", PinDir::Input), ("Q", PinDir::Output)],
    );
    ff.non_inverting_pin = Some(pin("CK", PinDir::Input));
    ff.inverting_pin = Some(pin("CK_B", PinDir::Input));
    bels.insert("FF".to_string(), ff);
    let rbel = bels
        .insert(
            "CLKMUX".to_string(),
            bel(
                "MUX2",
                BelClass::Routing,
                &[("A", PinDir::Input), ("B", PinDir::Output)],
            ),
        )
        .0;
    let in0 = bels
        .insert("IN0".to_string(), port_bel("IN0", PinDir::Output))
        .0;
    let out0 = bels
        .insert("OUT0".to_string(), port_bel("OUT0", PinDir::Input))
        .0;

    let mut pins = EntityMap::new();
    pins.insert(
        "IN0".to_string(),
        SitePin {
            dir: PinDir::Input,
            bel: in0,
        },
    );
    pins.insert(
        "OUT0".to_string(),
        SitePin {
            dir: PinDir::Output,
            bel: out0,
        },
    );

    let mut wires = EntityMap::new();
    wires.insert(
        "SW_IN".to_string(),
        SiteWire {
            pins: vec![(in0, "IN0".to_string()), (lut, "I0".to_string())],
        },
    );
    wires.insert(
        "SW_OUT".to_string(),
        SiteWire {
            pins: vec![(lut, "O".to_string()), (out0, "OUT0".to_string())],
        },
    );

    SiteKind {
        bels,
        pins,
        wires,
        pips: vec![SitePip {
            in_pin: (rbel, "A".to_string()),
            out_pin: (rbel, "B".to_string()),
        }],
        pin_aliases: HashMap::new(),
    }
}

/// Two CLB tiles, one SLICE site each, 3 wires each; one cross-tile node
/// joining tile 0 wire 2 with tile 1 wire 0; one plain PIP and one
/// route-through PIP per tile.
pub(crate) fn slice_device() -> Device {
    let mut site_kinds = EntityMap::new();
    let slice = site_kinds.insert("SLICE".to_string(), slice_kind()).0;
    let mut tile_types = EntitySet::new();
    let clb = tile_types.insert("CLB".to_string()).0;
    let mut wire_names = EntitySet::new();
    let wn: Vec<_> = ["W0", "W1", "W2"]
        .iter()
        .map(|n| wire_names.insert(n.to_string()).0)
        .collect();
    let mut intents = EntityMap::new();
    let intent = intents
        .insert("INTERCONNECT".to_string(), WireCategory::General)
        .0;
    let mut nodes = EntityVec::new();
    let node = nodes.push(NodeDef {
        wires: vec![(TileId::from_idx(0), 2), (TileId::from_idx(1), 0)],
    });

    let pips = vec![
        Pip {
            wire_from: 0,
            wire_to: 1,
            kind: PipKind::Directional,
            route_through: None,
        },
        Pip {
            wire_from: 1,
            wire_to: 2,
            kind: PipKind::DirectionalBuffered21,
            route_through: Some(vec![
                RtPin {
                    bel: "LUT".to_string(),
                    pin: "I0".to_string(),
                },
                RtPin {
                    bel: "LUT".to_string(),
                    pin: "O".to_string(),
                },
            ]),
        },
    ];

    let mut tiles = EntityVec::new();
    for (i, name) in ["CLB_X0Y0", "CLB_X1Y0"].iter().enumerate() {
        let mut wires: Vec<TileWire> = wn
            .iter()
            .map(|&n| TileWire {
                name: n,
                intent,
                node: None,
            })
            .collect();
        if i == 0 {
            wires[2].node = Some(node);
        } else {
            wires[0].node = Some(node);
        }
        tiles.push(Tile {
            name: name.to_string(),
            kind: clb,
            row: 0,
            col: i as u16,
            wires,
            pips: pips.clone(),
            sites: vec![Site {
                name: format!("SLICE_X{i}Y0"),
                kind: slice,
                alt_kinds: vec![],
                pins: vec!["IN0".to_string(), "OUT0".to_string()],
                bound: Cell::new(false),
            }],
        });
    }

    Device {
        name: "xctest25t".to_string(),
        family: "artix7".to_string(),
        series: Series::Series7,
        tile_types,
        wire_names,
        intents,
        site_kinds,
        tiles,
        nodes,
        packages: vec![Package {
            name: "FFG1156".to_string(),
            pins: vec![
                PackagePin {
                    name: "A1".to_string(),
                    site: Some("SLICE_X0Y0".to_string()),
                    bel: Some("IN0".to_string()),
                },
                PackagePin {
                    name: "GND1".to_string(),
                    site: None,
                    bel: None,
                },
            ],
            grades: vec![Grade {
                name: "-2".to_string(),
                speed: "-2".to_string(),
                temp: "C".to_string(),
            }],
        }],
    }
}

/// slice_device with the first site's physical pin list broken so that
/// site pin IN0 no longer resolves.
pub(crate) fn malformed_device() -> Device {
    let mut dev = slice_device();
    let tid = TileId::from_idx(0);
    dev.tiles[tid].sites[0].pins.retain(|p| p != "IN0");
    dev
}

/// Alternate-site-type topology: site 0 is an IOB supporting IOB33 and
/// IPAD as alternates, site 1 is a plain IOB33. IPAD never occurs as a
/// primary type and its pin name resolves only through the primary-name
/// alias.
pub(crate) fn alt_device() -> Device {
    fn io_kind(pin_name: &str, alias: Option<(&str, &str)>) -> SiteKind {
        let mut bels = EntityMap::new();
        let port = bels
            .insert(
                format!("PORT_{pin_name}"),
                port_bel(pin_name, PinDir::Output),
            )
            .0;
        let mut pins = EntityMap::new();
        pins.insert(
            pin_name.to_string(),
            SitePin {
                dir: PinDir::Input,
                bel: port,
            },
        );
        SiteKind {
            bels,
            pins,
            wires: EntityMap::new(),
            pips: vec![],
            pin_aliases: alias
                .into_iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        }
    }

    let mut site_kinds = EntityMap::new();
    let iob = site_kinds.insert("IOB".to_string(), io_kind("IOP", None)).0;
    let iob33 = site_kinds
        .insert("IOB33".to_string(), io_kind("I", None))
        .0;
    let ipad = site_kinds
        .insert("IPAD".to_string(), io_kind("PAD", Some(("PAD", "IOP"))))
        .0;

    let mut tile_types = EntitySet::new();
    let iot = tile_types.insert("IO".to_string()).0;
    let mut tiles = EntityVec::new();
    tiles.push(Tile {
        name: "IO_X0Y0".to_string(),
        kind: iot,
        row: 0,
        col: 0,
        wires: vec![],
        pips: vec![],
        sites: vec![
            Site {
                name: "IOB_X0Y0".to_string(),
                kind: iob,
                alt_kinds: vec![iob33, ipad],
                pins: vec!["IOP".to_string()],
                bound: Cell::new(false),
            },
            Site {
                name: "IOB33_X0Y1".to_string(),
                kind: iob33,
                alt_kinds: vec![],
                pins: vec!["I".to_string()],
                bound: Cell::new(false),
            },
        ],
    });

    Device {
        name: "xctestio".to_string(),
        family: "artix7".to_string(),
        series: Series::Series7,
        tile_types,
        wire_names: EntitySet::new(),
        intents: EntityMap::new(),
        site_kinds,
        tiles,
        nodes: EntityVec::new(),
        packages: vec![],
    }
}

/// Fresh session over an in-memory sink, lookups populated and the write
/// transaction open.
pub(crate) fn session(dev: &Device) -> ExportSession<'_> {
    let sink = Sink::open().unwrap();
    let mut s = ExportSession::new(dev, sink);
    s.populate_lookups().unwrap();
    s.sink.begin().unwrap();
    s.insert_device().unwrap();
    s
}
