use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use devrex_rawdev::{
    BelClass, Device, FAMILIES, IO_STANDARDS, IntentId, PinDir, PipKind, Series, SiteKindId,
    TileId, TileTypeId, WireCategory,
};
use log::info;
use thiserror::Error;
use unnamed_entity::{EntityMap, EntityPartVec, EntitySet, EntityVec, entity_id};

use crate::sink::{Lookup, Sink};

pub mod graph;
pub mod packages;
pub mod sink;
pub mod site;
pub mod topo;

#[cfg(test)]
pub(crate) mod testdev;

entity_id! {
    pub id StId u16;
    pub id XWireId u32;
    pub id XPinId u32;
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("database failure: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("device family {family} is not a known family")]
    UnknownFamily { family: String },
    #[error(
        "site {site} bound as {kind}: site pin {pin} (primary name {primary:?}) \
         does not resolve to a physical pin"
    )]
    SitePinUnresolved {
        site: String,
        kind: String,
        pin: String,
        primary: Option<String>,
    },
    #[error(
        "site {site} bound as {kind}: site pin {pin} is backed by BEL {bel} \
         with {pins} pins, expected exactly one"
    )]
    SitePinBelShape {
        site: String,
        kind: String,
        pin: String,
        bel: String,
        pins: usize,
    },
    #[error("site type {kind}: alternate type {alt} was never enumerated")]
    MissingAltSiteType { kind: String, alt: String },
    #[error("snapshot emission failed: {0}")]
    Snapshot(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub skip_route_resources: bool,
}

/// Row ids of the populated lookup tables, for use as foreign keys in data
/// rows.
#[derive(Debug, Default)]
pub struct Lookups {
    pub family: i64,
    pub series: i64,
    pub bel_class: HashMap<BelClass, i64>,
    pub pin_dir: HashMap<PinDir, i64>,
    pub pip_kind: HashMap<PipKind, i64>,
    pub wire_category: HashMap<WireCategory, i64>,
    pub intent: EntityVec<IntentId, i64>,
    pub site_type: EntityVec<SiteKindId, i64>,
    pub tile_type: EntityVec<TileTypeId, i64>,
}

/// All state of one export run: the borrowed device model, the sink, and
/// every run-scoped enumerator. There is no ambient state anywhere; every
/// pass gets this context.
pub struct ExportSession<'a> {
    pub dev: &'a Device,
    pub sink: Sink,
    pub lookups: Lookups,
    /// Emitted site types, in emission order, with their row ids.
    pub site_types: EntityMap<StId, SiteKindId, i64>,
    /// Packed (tile << 32) | wire keys, in emission order.
    pub wires: EntitySet<XWireId, u64>,
    pub wire_rows: EntityVec<XWireId, i64>,
    /// Packed keys of node head wires.
    pub node_heads: Vec<u64>,
    pub tile_rows: EntityVec<TileId, i64>,
    pub tile_type_reps: EntityPartVec<TileTypeId, TileId>,
}

impl<'a> ExportSession<'a> {
    pub fn new(dev: &'a Device, sink: Sink) -> Self {
        ExportSession {
            dev,
            sink,
            lookups: Lookups::default(),
            site_types: EntityMap::new(),
            wires: EntitySet::new(),
            wire_rows: EntityVec::new(),
            node_heads: Vec::new(),
            tile_rows: EntityVec::new(),
            tile_type_reps: EntityPartVec::new(),
        }
    }

    /// Populates every lookup table, in the device model's vocabulary
    /// order, before any data rows are written.
    pub fn populate_lookups(&mut self) -> Result<(), ExportError> {
        let dev = self.dev;
        for c in BelClass::ALL {
            let row = self.sink.insert_lookup(Lookup::BelClass, c.name())?;
            self.lookups.bel_class.insert(c, row);
        }
        for d in PinDir::ALL {
            let row = self.sink.insert_lookup(Lookup::PinDir, d.name())?;
            self.lookups.pin_dir.insert(d, row);
        }
        let mut family = None;
        for f in FAMILIES {
            let row = self.sink.insert_lookup(Lookup::Family, f)?;
            if *f == dev.family {
                family = Some(row);
            }
        }
        self.lookups.family = family.ok_or_else(|| ExportError::UnknownFamily {
            family: dev.family.clone(),
        })?;
        for sr in Series::ALL {
            let row = self.sink.insert_lookup(Lookup::Series, sr.name())?;
            if sr == dev.series {
                self.lookups.series = row;
            }
        }
        for ios in IO_STANDARDS {
            self.sink.insert_lookup(Lookup::IoStandard, ios)?;
        }
        for k in PipKind::ALL {
            let row = self.sink.insert_lookup(Lookup::PipType, k.name())?;
            self.lookups.pip_kind.insert(k, row);
        }
        for c in WireCategory::ALL {
            let row = self.sink.insert_lookup(Lookup::WireCategory, c.name())?;
            self.lookups.wire_category.insert(c, row);
        }
        for (_, name, cat) in &dev.intents {
            let row = self
                .sink
                .insert_intent(name, self.lookups.wire_category[cat])?;
            self.lookups.intent.push(row);
        }
        for (_, name, _) in &dev.site_kinds {
            let row = self.sink.insert_lookup(Lookup::SiteType, name)?;
            self.lookups.site_type.push(row);
        }
        for (_, name) in &dev.tile_types {
            let row = self.sink.insert_lookup(Lookup::TileType, name)?;
            self.lookups.tile_type.push(row);
        }
        Ok(())
    }

    pub fn insert_device(&self) -> Result<(), ExportError> {
        self.sink
            .insert_device(&self.dev.name, self.lookups.family, self.lookups.series)?;
        Ok(())
    }
}

pub fn export_device(
    dev: &Device,
    path: &Path,
    opts: &ExportOptions,
) -> Result<(), ExportError> {
    let start = Instant::now();
    let sink = Sink::open()?;
    let mut session = ExportSession::new(dev, sink);
    session.populate_lookups()?;
    session.sink.begin()?;
    session.insert_device()?;
    let reps = topo::assign_representatives(dev);
    info!("{}: {} site types", dev.name, reps.len());
    site::write_site_types(&mut session, &reps)?;
    graph::write_tiles(&mut session)?;
    if opts.skip_route_resources {
        info!("{}: skipping route resources", dev.name);
    } else {
        graph::write_pips(&mut session)?;
        graph::write_wires_and_nodes(&mut session)?;
    }
    packages::write_packages(&mut session)?;
    session.sink.finish(path)?;
    info!(
        "{}: exported to {} in {:.2?}",
        dev.name,
        path.display(),
        start.elapsed()
    );
    Ok(())
}
