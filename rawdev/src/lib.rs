use std::cell::Cell;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use unnamed_entity::{EntityMap, EntitySet, EntityVec, entity_id};

pub mod probe;

pub use probe::{BelPinRef, SiteProbe, SiteRef};

entity_id! {
    pub id TileId u32;
    pub id TileTypeId u16;
    pub id SiteKindId u16;
    pub id WireNameId u32;
    pub id IntentId u16;
    pub id NodeId u32, reserve 1;
    pub id BelId u16;
    pub id SitePinId u16;
    pub id SiteWireId u16;
}

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize)]
pub enum Series {
    Series7,
    Ultrascale,
    UltrascalePlus,
    Versal,
}

impl Series {
    pub const ALL: [Series; 4] = [
        Series::Series7,
        Series::Ultrascale,
        Series::UltrascalePlus,
        Series::Versal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Series::Series7 => "series7",
            Series::Ultrascale => "ultrascale",
            Series::UltrascalePlus => "ultrascale_plus",
            Series::Versal => "versal",
        }
    }
}

pub const FAMILIES: &[&str] = &[
    "spartan7",
    "artix7",
    "kintex7",
    "virtex7",
    "zynq7000",
    "kintexu",
    "virtexu",
    "kintexuplus",
    "virtexuplus",
    "zynquplus",
    "versal",
];

pub const IO_STANDARDS: &[&str] = &[
    "LVCMOS12",
    "LVCMOS15",
    "LVCMOS18",
    "LVCMOS25",
    "LVCMOS33",
    "LVTTL",
    "LVDS",
    "LVDS_25",
    "SSTL12",
    "SSTL135",
    "SSTL15",
    "DIFF_SSTL15",
    "HSTL_I",
    "POD12",
];

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize)]
pub enum BelClass {
    Logic,
    Routing,
    SitePort,
}

impl BelClass {
    pub const ALL: [BelClass; 3] = [BelClass::Logic, BelClass::Routing, BelClass::SitePort];

    pub fn name(self) -> &'static str {
        match self {
            BelClass::Logic => "logic",
            BelClass::Routing => "routing",
            BelClass::SitePort => "sitePort",
        }
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize)]
pub enum PinDir {
    Input,
    Output,
    Bidir,
}

impl PinDir {
    pub const ALL: [PinDir; 3] = [PinDir::Input, PinDir::Output, PinDir::Bidir];

    pub fn name(self) -> &'static str {
        match self {
            PinDir::Input => "input",
            PinDir::Output => "output",
            PinDir::Bidir => "inout",
        }
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize)]
pub enum WireCategory {
    General,
    Global,
    Special,
}

impl WireCategory {
    pub const ALL: [WireCategory; 3] = [
        WireCategory::General,
        WireCategory::Global,
        WireCategory::Special,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WireCategory::General => "general",
            WireCategory::Global => "global",
            WireCategory::Special => "special",
        }
    }
}

// The directional/buffering classification of a PIP is a closed vocabulary
// carried on the type tag, not a computed property.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize)]
pub enum PipKind {
    Directional,
    DirectionalBuffered21,
    BiDir,
    BiDirBuffered20,
    BiDirBuffered21Buffered20,
}

impl PipKind {
    pub const ALL: [PipKind; 5] = [
        PipKind::Directional,
        PipKind::DirectionalBuffered21,
        PipKind::BiDir,
        PipKind::BiDirBuffered20,
        PipKind::BiDirBuffered21Buffered20,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PipKind::Directional => "directional",
            PipKind::DirectionalBuffered21 => "directional_buffered21",
            PipKind::BiDir => "bidir",
            PipKind::BiDirBuffered20 => "bidir_buffered20",
            PipKind::BiDirBuffered21Buffered20 => "bidir_buffered21_buffered20",
        }
    }

    pub fn is_directional(self) -> bool {
        matches!(self, PipKind::Directional | PipKind::DirectionalBuffered21)
    }

    pub fn is_buffered20(self) -> bool {
        matches!(
            self,
            PipKind::BiDirBuffered20 | PipKind::BiDirBuffered21Buffered20
        )
    }

    pub fn is_buffered21(self) -> bool {
        matches!(
            self,
            PipKind::DirectionalBuffered21 | PipKind::BiDirBuffered21Buffered20
        )
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct BelPinDef {
    pub name: String,
    pub dir: PinDir,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct Bel {
    pub kind: String,
    pub class: BelClass,
    pub pins: Vec<BelPinDef>,
    // Implicit polarity-selection pins; either may be missing even on an
    // invertible BEL.
    pub non_inverting_pin: Option<BelPinDef>,
    pub inverting_pin: Option<BelPinDef>,
}

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize)]
pub struct SitePin {
    pub dir: PinDir,
    pub bel: BelId,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct SiteWire {
    pub pins: Vec<(BelId, String)>,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct SitePip {
    pub in_pin: (BelId, String),
    pub out_pin: (BelId, String),
}

/// Architectural template shared by every site instantiating this kind.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct SiteKind {
    pub bels: EntityMap<BelId, String, Bel>,
    pub pins: EntityMap<SitePinId, String, SitePin>,
    pub wires: EntityMap<SiteWireId, String, SiteWire>,
    pub pips: Vec<SitePip>,
    // Maps this kind's pin names to the primary kind's physical pin names;
    // consulted when the kind is bound to a site as an alternate.
    pub pin_aliases: HashMap<String, String>,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub kind: SiteKindId,
    pub alt_kinds: Vec<SiteKindId>,
    // Physical pin names, in device pin-index order.
    pub pins: Vec<String>,
    // Probe occupancy; transient, managed by SiteProbe.
    #[serde(skip)]
    pub bound: Cell<bool>,
}

impl Site {
    pub fn pin_index(&self, name: &str) -> Option<usize> {
        self.pins.iter().position(|p| p == name)
    }
}

#[derive(Debug, Eq, PartialEq, Hash, Clone, Serialize, Deserialize)]
pub struct RtPin {
    pub bel: String,
    pub pin: String,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct Pip {
    pub wire_from: u32,
    pub wire_to: u32,
    pub kind: PipKind,
    // BEL pins used when the PIP routes through site logic.
    pub route_through: Option<Vec<RtPin>>,
}

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Serialize, Deserialize)]
pub struct TileWire {
    pub name: WireNameId,
    pub intent: IntentId,
    pub node: Option<NodeId>,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub name: String,
    pub kind: TileTypeId,
    pub row: u16,
    pub col: u16,
    pub wires: Vec<TileWire>,
    pub pips: Vec<Pip>,
    pub sites: Vec<Site>,
}

/// Wires that are electrically one routing resource; member 0 is the head
/// (tile, wire index) position.
#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    pub wires: Vec<(TileId, u32)>,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct PackagePin {
    pub name: String,
    pub site: Option<String>,
    pub bel: Option<String>,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub name: String,
    pub speed: String,
    pub temp: String,
}

#[derive(Debug, Eq, PartialEq, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub pins: Vec<PackagePin>,
    pub grades: Vec<Grade>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub family: String,
    pub series: Series,
    pub tile_types: EntitySet<TileTypeId, String>,
    pub wire_names: EntitySet<WireNameId, String>,
    pub intents: EntityMap<IntentId, String, WireCategory>,
    pub site_kinds: EntityMap<SiteKindId, String, SiteKind>,
    pub tiles: EntityVec<TileId, Tile>,
    pub nodes: EntityVec<NodeId, NodeDef>,
    pub packages: Vec<Package>,
}

impl Device {
    pub fn node_at(&self, tile: TileId, wire: u32) -> Option<NodeId> {
        self.tiles[tile].wires.get(wire as usize)?.node
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let f = File::open(path)?;
        let mut cf = zstd::stream::Decoder::new(f)?;
        let config = bincode::config::standard();
        Ok(bincode::serde::decode_from_std_read(&mut cf, config)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let f = File::create(path)?;
        let mut cf = zstd::stream::Encoder::new(f, 9)?;
        let config = bincode::config::standard();
        bincode::serde::encode_into_std_write(self, &mut cf, config)?;
        cf.finish()?;
        Ok(())
    }
}
