use crate::{BelId, BelPinDef, Device, Site, SiteKind, SiteKindId, TileId};

#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct SiteRef {
    pub tile: TileId,
    pub site: usize,
}

/// Path-independent handle for a BEL pin within one site kind. The same
/// physical pin resolves to the same handle whether it is reached through
/// BEL iteration, site-pin resolution, or site-wire resolution.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum BelPinRef {
    Declared { bel: BelId, pin: u32 },
    NonInverting { bel: BelId },
    Inverting { bel: BelId },
}

impl BelPinRef {
    pub fn bel(self) -> BelId {
        match self {
            BelPinRef::Declared { bel, .. }
            | BelPinRef::NonInverting { bel }
            | BelPinRef::Inverting { bel } => bel,
        }
    }
}

/// Transient binding of a site kind to a physical site. At most one probe
/// may be bound to a site at a time; the binding is released when the probe
/// is dropped, on every exit path.
pub struct SiteProbe<'a> {
    dev: &'a Device,
    sref: SiteRef,
    kind: SiteKindId,
}

impl Device {
    pub fn bind_site(&self, sref: SiteRef, kind: SiteKindId) -> SiteProbe<'_> {
        let site = &self.tiles[sref.tile].sites[sref.site];
        assert!(
            kind == site.kind || site.alt_kinds.contains(&kind),
            "site {} cannot be bound as {}",
            site.name,
            self.site_kinds.key(kind)
        );
        assert!(!site.bound.get(), "site {} already bound", site.name);
        site.bound.set(true);
        SiteProbe {
            dev: self,
            sref,
            kind,
        }
    }
}

impl<'a> SiteProbe<'a> {
    pub fn site(&self) -> &'a Site {
        &self.dev.tiles[self.sref.tile].sites[self.sref.site]
    }

    pub fn kind(&self) -> SiteKindId {
        self.kind
    }

    pub fn site_kind(&self) -> &'a SiteKind {
        &self.dev.site_kinds[self.kind]
    }

    /// Primary physical pin name behind one of this kind's pin names, if
    /// the bound kind renames it.
    pub fn primary_pin_name(&self, pin: &str) -> Option<&'a str> {
        self.site_kind().pin_aliases.get(pin).map(String::as_str)
    }

    pub fn resolve_pin(&self, bel: BelId, pin: &str) -> Option<BelPinRef> {
        let b = &self.site_kind().bels[bel];
        if let Some(idx) = b.pins.iter().position(|p| p.name == pin) {
            return Some(BelPinRef::Declared {
                bel,
                pin: idx as u32,
            });
        }
        if b.non_inverting_pin.as_ref().is_some_and(|p| p.name == pin) {
            return Some(BelPinRef::NonInverting { bel });
        }
        if b.inverting_pin.as_ref().is_some_and(|p| p.name == pin) {
            return Some(BelPinRef::Inverting { bel });
        }
        None
    }

    pub fn pin_def(&self, pin: BelPinRef) -> &'a BelPinDef {
        let b = &self.site_kind().bels[pin.bel()];
        match pin {
            BelPinRef::Declared { pin, .. } => &b.pins[pin as usize],
            BelPinRef::NonInverting { .. } => b.non_inverting_pin.as_ref().unwrap(),
            BelPinRef::Inverting { .. } => b.inverting_pin.as_ref().unwrap(),
        }
    }
}

impl Drop for SiteProbe<'_> {
    fn drop(&mut self) {
        self.site().bound.set(false);
    }
}
