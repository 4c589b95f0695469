use devrex_rawdev::{BelPinRef, PinDir, SiteKindId, SiteRef};
use unnamed_entity::{EntitySet, EntityVec};

use crate::topo::SiteTypeMap;
use crate::{ExportError, ExportSession, XPinId};

/// Writes every site type in representative order, then resolves the
/// cross-type alternate lists. The second pass needs every site type to
/// already have an assigned id, hence the split.
pub fn write_site_types(
    s: &mut ExportSession,
    reps: &SiteTypeMap,
) -> Result<(), ExportError> {
    for (_, &kind, &sref) in reps {
        write_site_type(s, kind, sref)?;
    }
    for (_, &kind, &sref) in reps {
        let (_, &st_row) = s.site_types.get(&kind).unwrap();
        let site = &s.dev.tiles[sref.tile].sites[sref.site];
        for (pos, &alt) in site.alt_kinds.iter().enumerate() {
            let Some((_, &alt_row)) = s.site_types.get(&alt) else {
                return Err(ExportError::MissingAltSiteType {
                    kind: s.dev.site_kinds.key(kind).clone(),
                    alt: s.dev.site_kinds.key(alt).clone(),
                });
            };
            s.sink.insert_alt_site_type(st_row, alt_row, pos as i64)?;
        }
    }
    Ok(())
}

fn write_site_type(
    s: &mut ExportSession,
    kind: SiteKindId,
    sref: SiteRef,
) -> Result<(), ExportError> {
    let dev = s.dev;
    let kind_name = dev.site_kinds.key(kind);
    let st_row = s
        .sink
        .insert_site_type(kind_name, s.lookups.site_type[kind])?;
    s.site_types.insert(kind, st_row);

    // released on every exit path below, including the error returns
    let probe = dev.bind_site(sref, kind);
    let sk = probe.site_kind();

    // One identity interner of BEL pins per site type. Every traversal
    // path below lands in this set, so a pin reached more than once still
    // yields a single record.
    let mut pins: EntitySet<XPinId, BelPinRef> = EntitySet::new();

    for (bid, name, bel) in &sk.bels {
        s.sink
            .insert_bel(st_row, name, &bel.kind, s.lookups.bel_class[&bel.class])?;
        for pi in 0..bel.pins.len() {
            pins.insert(BelPinRef::Declared {
                bel: bid,
                pin: pi as u32,
            });
        }
        if bel.non_inverting_pin.is_some() {
            pins.insert(BelPinRef::NonInverting { bel: bid });
        }
        if bel.inverting_pin.is_some() {
            pins.insert(BelPinRef::Inverting { bel: bid });
        }
    }

    // Site pins. The raw pin name may be an alternate-type alias; retry
    // through the primary name before declaring the description
    // self-contradictory.
    let mut site_pins: Vec<(&str, PinDir, BelPinRef)> = Vec::with_capacity(sk.pins.len());
    for (_, pin_name, pin) in &sk.pins {
        let site = probe.site();
        if site.pin_index(pin_name).is_none() {
            let primary = probe.primary_pin_name(pin_name);
            if primary.and_then(|p| site.pin_index(p)).is_none() {
                return Err(ExportError::SitePinUnresolved {
                    site: site.name.clone(),
                    kind: kind_name.clone(),
                    pin: pin_name.clone(),
                    primary: primary.map(str::to_string),
                });
            }
        }
        let bel = &sk.bels[pin.bel];
        if bel.pins.len() != 1 {
            return Err(ExportError::SitePinBelShape {
                site: site.name.clone(),
                kind: kind_name.clone(),
                pin: pin_name.clone(),
                bel: sk.bels.key(pin.bel).clone(),
                pins: bel.pins.len(),
            });
        }
        let pref = BelPinRef::Declared {
            bel: pin.bel,
            pin: 0,
        };
        pins.insert(pref);
        site_pins.push((pin_name.as_str(), pin.dir, pref));
    }

    // Site wires.
    let mut site_wires: Vec<(&str, Vec<BelPinRef>)> = Vec::with_capacity(sk.wires.len());
    for (_, name, sw) in &sk.wires {
        let mut wpins = Vec::with_capacity(sw.pins.len());
        for (bel, pin) in &sw.pins {
            let pref = probe.resolve_pin(*bel, pin).unwrap_or_else(|| {
                panic!(
                    "site type {kind_name}: site wire {name} references unknown pin {pin} on {bel}",
                    bel = sk.bels.key(*bel)
                )
            });
            pins.insert(pref);
            wpins.push(pref);
        }
        site_wires.push((name.as_str(), wpins));
    }

    // BEL pin records go out in first-seen enumerator order; downstream
    // consumers rely on this for compact indexing.
    let mut pin_rows: EntityVec<XPinId, i64> = EntityVec::new();
    for (_, &pref) in &pins {
        let def = probe.pin_def(pref);
        let row = s.sink.insert_bel_pin(
            st_row,
            &def.name,
            s.lookups.pin_dir[&def.dir],
            sk.bels.key(pref.bel()),
        )?;
        pin_rows.push(row);
    }

    for (name, dir, pref) in site_pins {
        let pid = pins.get(&pref).unwrap();
        s.sink
            .insert_site_pin(st_row, name, s.lookups.pin_dir[&dir], pin_rows[pid])?;
    }

    for (name, wpins) in site_wires {
        let sw_row = s.sink.insert_site_wire(st_row, name)?;
        for (pos, pref) in wpins.iter().enumerate() {
            let pid = pins.get(pref).unwrap();
            s.sink
                .insert_site_wire_pin(sw_row, pin_rows[pid], pos as i64)?;
        }
    }

    for pip in &sk.pips {
        let in_pin = probe
            .resolve_pin(pip.in_pin.0, &pip.in_pin.1)
            .unwrap_or_else(|| panic!("site type {kind_name}: bad site PIP input pin"));
        let out_pin = probe
            .resolve_pin(pip.out_pin.0, &pip.out_pin.1)
            .unwrap_or_else(|| panic!("site type {kind_name}: bad site PIP output pin"));
        s.sink.insert_site_pip(
            st_row,
            pin_rows[pins.get(&in_pin).unwrap()],
            pin_rows[pins.get(&out_pin).unwrap()],
        )?;
    }

    Ok(())
}
