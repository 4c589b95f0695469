use devrex_rawdev::{Device, SiteKindId, SiteRef};
use unnamed_entity::EntityMap;

use crate::StId;

/// Site type -> representative physical site, in first-seen order. One
/// representative per site type is enough: the type is architecturally
/// identical wherever it occurs.
pub type SiteTypeMap = EntityMap<StId, SiteKindId, SiteRef>;

/// Sweeps every site of every tile once, probing it first as its primary
/// type and then as each alternate type it supports. A site type recorded
/// through a primary occurrence is never displaced by an alternate one;
/// alternates only guarantee that types never instantiated as primary
/// still get some representative.
pub fn assign_representatives(dev: &Device) -> SiteTypeMap {
    let mut primary = SiteTypeMap::new();
    let mut alternate = SiteTypeMap::new();
    for (tid, tile) in &dev.tiles {
        for (si, site) in tile.sites.iter().enumerate() {
            let sref = SiteRef {
                tile: tid,
                site: si,
            };
            {
                let probe = dev.bind_site(sref, site.kind);
                // the representative must carry the type as its primary
                if probe.kind() == site.kind && !primary.contains_key(&site.kind) {
                    primary.insert(site.kind, sref);
                }
            }
            for &alt in &site.alt_kinds {
                let _probe = dev.bind_site(sref, alt);
                if !alternate.contains_key(&alt) {
                    alternate.insert(alt, sref);
                }
            }
        }
    }
    for (_, &kind, &sref) in &alternate {
        if !primary.contains_key(&kind) {
            primary.insert(kind, sref);
        }
    }
    primary
}
