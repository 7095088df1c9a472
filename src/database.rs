use crate::store::MappingStore;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

pub struct Database {
    conn: Connection,
}

/// A recorded signal sample
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub id: i64,
    pub location: String,
    pub rssi: i32,
    pub timestamp: i64,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database: {:?}", path.as_ref()))?;

        let db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS measurements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                rssi INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_measurements_location ON measurements(location);
            CREATE INDEX IF NOT EXISTS idx_measurements_timestamp ON measurements(timestamp);
            "#,
        )?;

        Ok(())
    }

    pub fn insert_measurement(&self, location: &str, rssi: i32, timestamp: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO measurements (location, rssi, timestamp) VALUES (?, ?, ?)",
            params![location, rssi, timestamp],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_all_measurements(&self) -> Result<Vec<Measurement>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, location, rssi, timestamp FROM measurements ORDER BY timestamp, id"
        )?;

        let measurements = stmt
            .query_map([], |row| {
                Ok(Measurement {
                    id: row.get(0)?,
                    location: row.get(1)?,
                    rssi: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(measurements)
    }

    pub fn get_measurements_for_location(&self, location: &str) -> Result<Vec<Measurement>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, location, rssi, timestamp FROM measurements
             WHERE location = ? ORDER BY timestamp, id"
        )?;

        let measurements = stmt
            .query_map(params![location], |row| {
                Ok(Measurement {
                    id: row.get(0)?,
                    location: row.get(1)?,
                    rssi: row.get(2)?,
                    timestamp: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(measurements)
    }

    /// Distinct location names in the order they were first recorded
    pub fn get_locations(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT location FROM measurements GROUP BY location ORDER BY MIN(id)"
        )?;

        let locations = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(locations)
    }

    /// Delete every measurement for a location, returning how many were removed
    pub fn delete_location(&self, location: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM measurements WHERE location = ?",
            params![location],
        )?;
        Ok(removed)
    }

    pub fn count_measurements(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM measurements",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl MappingStore for Database {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read key {}", key))?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
                params![key, value],
            )
            .with_context(|| format!("Failed to write key {}", key))?;
        Ok(())
    }
}
