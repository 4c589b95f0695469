use std::path::Path;
use std::time::Duration;

use rusqlite::backup::Backup;
use rusqlite::{Connection, params};

use crate::ExportError;

const SCHEMA: &str = include_str!("../sql/schema.sql");

/// The fixed enumeration domains of the snapshot. Each maps to one
/// single-column lookup table.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum Lookup {
    BelClass,
    PinDir,
    Family,
    Series,
    IoStandard,
    PipType,
    WireCategory,
    SiteType,
    TileType,
}

impl Lookup {
    fn insert_sql(self) -> &'static str {
        match self {
            Lookup::BelClass => "INSERT INTO enum_bel_class (name) VALUES (?1) RETURNING id",
            Lookup::PinDir => "INSERT INTO enum_pin_dir (name) VALUES (?1) RETURNING id",
            Lookup::Family => "INSERT INTO enum_family (name) VALUES (?1) RETURNING id",
            Lookup::Series => "INSERT INTO enum_series (name) VALUES (?1) RETURNING id",
            Lookup::IoStandard => "INSERT INTO enum_io_standard (name) VALUES (?1) RETURNING id",
            Lookup::PipType => "INSERT INTO enum_pip_type (name) VALUES (?1) RETURNING id",
            Lookup::WireCategory => {
                "INSERT INTO enum_wire_category (name) VALUES (?1) RETURNING id"
            }
            Lookup::SiteType => "INSERT INTO enum_site_type (name) VALUES (?1) RETURNING id",
            Lookup::TileType => "INSERT INTO enum_tile_type (name) VALUES (?1) RETURNING id",
        }
    }
}

/// Transactional writer owning the export's database connection. Every
/// insert returns the generated row id, for use as a foreign key in later
/// rows; a failed insert surfaces as an error, never as a sentinel id.
pub struct Sink {
    conn: Connection,
}

impl Sink {
    /// Sets up the connection and applies the schema. A failure here
    /// aborts the run before any enumeration work starts.
    pub fn open() -> Result<Sink, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(Duration::from_secs(30))?;
        conn.pragma_update(None, "encoding", "UTF-8")?;
        conn.pragma_update(None, "foreign_keys", 1)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Sink { conn })
    }

    /// Opens the exclusive write transaction. Foreign keys are validated
    /// at commit, since the emission order inserts child rows whose
    /// parents arrive later.
    pub fn begin(&self) -> Result<(), rusqlite::Error> {
        self.conn
            .execute_batch("BEGIN EXCLUSIVE; PRAGMA defer_foreign_keys = 1;")
    }

    fn row(
        &self,
        sql: &'static str,
        params: impl rusqlite::Params,
    ) -> Result<i64, rusqlite::Error> {
        self.conn
            .prepare_cached(sql)?
            .query_row(params, |row| row.get(0))
    }

    pub fn insert_lookup(&self, table: Lookup, name: &str) -> Result<i64, rusqlite::Error> {
        self.row(table.insert_sql(), params![name])
    }

    pub fn insert_intent(&self, name: &str, category: i64) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO enum_intent (name, category) VALUES (?1, ?2) RETURNING id",
            params![name, category],
        )
    }

    pub fn insert_device(
        &self,
        name: &str,
        family: i64,
        series: i64,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO device (name, family, series) VALUES (?1, ?2, ?3) RETURNING id",
            params![name, family, series],
        )
    }

    pub fn insert_site_type(&self, name: &str, site_type: i64) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO site_types (name, site_type) VALUES (?1, ?2) RETURNING id",
            params![name, site_type],
        )
    }

    pub fn insert_alt_site_type(
        &self,
        site_type: i64,
        alt: i64,
        pos: i64,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO alt_site_types (site_type, alt, pos) VALUES (?1, ?2, ?3) RETURNING id",
            params![site_type, alt, pos],
        )
    }

    pub fn insert_bel(
        &self,
        site_type: i64,
        name: &str,
        bel_type: &str,
        class: i64,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO bels (site_type, name, bel_type, class) VALUES (?1, ?2, ?3, ?4) \
             RETURNING id",
            params![site_type, name, bel_type, class],
        )
    }

    pub fn insert_bel_pin(
        &self,
        site_type: i64,
        name: &str,
        direction: i64,
        bel_name: &str,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO bel_pins (site_type, name, direction, bel_name) VALUES (?1, ?2, ?3, ?4) \
             RETURNING id",
            params![site_type, name, direction, bel_name],
        )
    }

    pub fn insert_site_pin(
        &self,
        site_type: i64,
        name: &str,
        direction: i64,
        bel_pin: i64,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO site_pins (site_type, name, direction, bel_pin) VALUES (?1, ?2, ?3, ?4) \
             RETURNING id",
            params![site_type, name, direction, bel_pin],
        )
    }

    pub fn insert_site_wire(&self, site_type: i64, name: &str) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO site_wires (site_type, name) VALUES (?1, ?2) RETURNING id",
            params![site_type, name],
        )
    }

    pub fn insert_site_wire_pin(
        &self,
        site_wire: i64,
        bel_pin: i64,
        pos: i64,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO site_wire_pins (site_wire, bel_pin, pos) VALUES (?1, ?2, ?3) \
             RETURNING id",
            params![site_wire, bel_pin, pos],
        )
    }

    pub fn insert_site_pip(
        &self,
        site_type: i64,
        in_pin: i64,
        out_pin: i64,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO site_pips (site_type, in_pin, out_pin) VALUES (?1, ?2, ?3) RETURNING id",
            params![site_type, in_pin, out_pin],
        )
    }

    pub fn insert_tile(
        &self,
        name: &str,
        tile_type: i64,
        row: u16,
        col: u16,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO tiles (name, tile_type, row, col) VALUES (?1, ?2, ?3, ?4) RETURNING id",
            params![name, tile_type, row, col],
        )
    }

    pub fn insert_wire(&self, tile: i64, name: &str, intent: i64) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO wires (tile, name, intent) VALUES (?1, ?2, ?3) RETURNING id",
            params![tile, name, intent],
        )
    }

    pub fn insert_node(&self, head_wire: i64) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO nodes (head_wire) VALUES (?1) RETURNING id",
            params![head_wire],
        )
    }

    pub fn insert_node_wire(&self, node: i64, wire: i64, pos: i64) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO node_wires (node, wire, pos) VALUES (?1, ?2, ?3) RETURNING id",
            params![node, wire, pos],
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn insert_pip(
        &self,
        tile_type: i64,
        wire0: u32,
        wire1: u32,
        directional: bool,
        buffered20: bool,
        buffered21: bool,
        pip_type: i64,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO pips (tile_type, wire0, wire1, directional, buffered20, buffered21, \
             pip_type) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING id",
            params![
                tile_type,
                wire0,
                wire1,
                directional,
                buffered20,
                buffered21,
                pip_type
            ],
        )
    }

    pub fn insert_pseudo_cell(&self, pip: i64, bel: &str) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO pseudo_cells (pip, bel) VALUES (?1, ?2) RETURNING id",
            params![pip, bel],
        )
    }

    pub fn insert_pseudo_cell_pin(
        &self,
        pseudo_cell: i64,
        pin: &str,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO pseudo_cell_pins (pseudo_cell, pin) VALUES (?1, ?2) RETURNING id",
            params![pseudo_cell, pin],
        )
    }

    pub fn insert_package(&self, name: &str) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO packages (name) VALUES (?1) RETURNING id",
            params![name],
        )
    }

    pub fn insert_package_pin(
        &self,
        package: i64,
        name: &str,
        site: Option<&str>,
        bel: Option<&str>,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO package_pins (package, name, site, bel) VALUES (?1, ?2, ?3, ?4) \
             RETURNING id",
            params![package, name, site, bel],
        )
    }

    pub fn insert_grade(
        &self,
        package: i64,
        name: &str,
        speed: &str,
        temp: &str,
    ) -> Result<i64, rusqlite::Error> {
        self.row(
            "INSERT INTO grades (package, name, speed, temp) VALUES (?1, ?2, ?3, ?4) RETURNING id",
            params![package, name, speed, temp],
        )
    }

    /// Commits the transaction (which re-arms foreign-key validation) and
    /// emits the snapshot file. The backup goes into a temporary file next
    /// to the target and is renamed over it only on success, so a failed
    /// run never leaves a partial snapshot and never damages a previous
    /// one.
    pub fn finish(self, path: &Path) -> Result<(), ExportError> {
        self.conn.execute_batch("COMMIT")?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let tmp = tempfile::Builder::new()
            .prefix("dev2sql")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        {
            let mut dst = Connection::open(tmp.path())?;
            let backup = Backup::new(&self.conn, &mut dst)?;
            backup.run_to_completion(4096, Duration::ZERO, None)?;
        }
        tmp.persist(path).map_err(|e| ExportError::Snapshot(e.error))?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rowids_are_sequential_and_returned() {
        let sink = Sink::open().unwrap();
        sink.begin().unwrap();
        let a = sink.insert_lookup(Lookup::BelClass, "logic").unwrap();
        let b = sink.insert_lookup(Lookup::BelClass, "routing").unwrap();
        let c = sink.insert_lookup(Lookup::BelClass, "sitePort").unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn test_insert_failure_is_reported() {
        let sink = Sink::open().unwrap();
        sink.begin().unwrap();
        sink.insert_lookup(Lookup::SiteType, "SLICE").unwrap();
        // UNIQUE violation must surface as an error, not a sentinel id
        assert!(sink.insert_lookup(Lookup::SiteType, "SLICE").is_err());
    }

    #[test]
    fn test_foreign_keys_deferred_until_commit() {
        let sink = Sink::open().unwrap();
        sink.begin().unwrap();
        // parent site type does not exist yet; the insert itself succeeds
        let r = sink.insert_bel(7, "LUT", "LUT6", 1);
        assert!(r.is_ok());
        // and the violation is caught at commit
        assert!(sink.conn.execute_batch("COMMIT").is_err());
    }

    #[test]
    fn test_finish_emits_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");
        let sink = Sink::open().unwrap();
        sink.begin().unwrap();
        sink.insert_lookup(Lookup::Family, "artix7").unwrap();
        sink.finish(&path).unwrap();
        let conn = Connection::open(&path).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM enum_family", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }
}
