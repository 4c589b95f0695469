use devrex_rawdev::TileId;
use indexmap::IndexMap;
use log::info;
use unnamed_entity::EntityId;

use crate::{ExportError, ExportSession};

/// Canonical identity of a wire, independent of traversal path. Distinct
/// (tile, index) pairs can never collide: the tile's unique address
/// occupies the high half.
pub fn wire_key(tile: TileId, wire: u32) -> u64 {
    ((tile.to_idx() as u64) << 32) | wire as u64
}

pub fn wire_key_split(key: u64) -> (TileId, u32) {
    (TileId::from_idx((key >> 32) as usize), key as u32)
}

pub fn write_tiles(s: &mut ExportSession) -> Result<(), ExportError> {
    let dev = s.dev;
    for (tid, tile) in &dev.tiles {
        let row = s
            .sink
            .insert_tile(&tile.name, s.lookups.tile_type[tile.kind], tile.row, tile.col)?;
        s.tile_rows.push(row);
        if s.tile_type_reps.get(tile.kind).is_none() {
            s.tile_type_reps.insert(tile.kind, tid);
        }
    }
    Ok(())
}

/// PIPs are per tile type, taken from the first tile of each type. A PIP
/// implementing a logic route-through additionally expands into one
/// pseudo-cell per distinct BEL it touches.
pub fn write_pips(s: &mut ExportSession) -> Result<(), ExportError> {
    let dev = s.dev;
    for (ttid, _) in &dev.tile_types {
        let Some(&tid) = s.tile_type_reps.get(ttid) else {
            continue;
        };
        let tt_row = s.lookups.tile_type[ttid];
        for pip in &dev.tiles[tid].pips {
            let row = s.sink.insert_pip(
                tt_row,
                pip.wire_from,
                pip.wire_to,
                pip.kind.is_directional(),
                pip.kind.is_buffered20(),
                pip.kind.is_buffered21(),
                s.lookups.pip_kind[&pip.kind],
            )?;
            let Some(rt) = &pip.route_through else {
                continue;
            };
            let mut cells: IndexMap<&str, Vec<&str>> = IndexMap::new();
            for p in rt {
                cells.entry(p.bel.as_str()).or_default().push(p.pin.as_str());
            }
            for (bel, pins) in cells {
                let pc_row = s.sink.insert_pseudo_cell(row, bel)?;
                for pin in pins {
                    s.sink.insert_pseudo_cell_pin(pc_row, pin)?;
                }
            }
        }
    }
    Ok(())
}

pub fn write_wires_and_nodes(s: &mut ExportSession) -> Result<(), ExportError> {
    let dev = s.dev;
    // Pass 1: collect packed keys only. The graph is too large to retain a
    // live record per wire, so the key is the one thing kept between
    // passes. A node is recorded exactly once, at its head wire.
    for (tid, tile) in &dev.tiles {
        for i in 0..tile.wires.len() as u32 {
            s.wires.insert(wire_key(tid, i));
            if let Some(node) = dev.node_at(tid, i)
                && dev.nodes[node].wires.first() == Some(&(tid, i))
            {
                s.node_heads.push(wire_key(tid, i));
            }
        }
    }
    info!(
        "{}: {} wires, {} nodes",
        dev.name,
        s.wires.len(),
        s.node_heads.len()
    );

    // Pass 2: re-resolve each key and emit the wire row.
    for (_, &key) in &s.wires {
        let (tid, wi) = wire_key_split(key);
        let tw = &dev.tiles[tid].wires[wi as usize];
        let row = s.sink.insert_wire(
            s.tile_rows[tid],
            &dev.wire_names[tw.name],
            s.lookups.intent[tw.intent],
        )?;
        s.wire_rows.push(row);
    }

    // Pass 3: expand each recorded node into its member wire list.
    for &key in &s.node_heads {
        let (tid, wi) = wire_key_split(key);
        let node = dev.node_at(tid, wi).unwrap();
        let head = s.wires.get(&key).unwrap();
        let node_row = s.sink.insert_node(s.wire_rows[head])?;
        for (pos, &(t, w)) in dev.nodes[node].wires.iter().enumerate() {
            let member = s.wires.get(&wire_key(t, w)).unwrap();
            s.sink
                .insert_node_wire(node_row, s.wire_rows[member], pos as i64)?;
        }
    }
    Ok(())
}
