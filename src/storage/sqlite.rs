use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{
    CredentialStore, Credentials, DefaultListRow, DefaultListStore, FormRegistry, MappingStore,
    RegisteredForm, RegistrationStore,
};
use crate::error::Result;
use crate::integrations::same_id;
use crate::mapping::registration::{RegistrationMap, RegistrationMapping};

pub struct Storage {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS credentials (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL,
        api_key TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS forms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        form_key TEXT NOT NULL UNIQUE,
        label TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS mappings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        form_id INTEGER NOT NULL UNIQUE,
        mapping TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS list_defaults (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        list_id TEXT NOT NULL,
        enabled_status INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS registration_mappings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        list_id TEXT NOT NULL,
        map TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 0
    );
";

impl Storage {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CredentialStore for Storage {
    fn credentials(&self) -> Result<Vec<Credentials>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, url, api_key FROM credentials ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Credentials {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    api_key: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn save_credentials(&self, url: &str, api_key: &str) -> Result<bool> {
        if url.trim().is_empty() || api_key.trim().is_empty() {
            return Ok(false);
        }

        let existing = self.credentials()?;
        let conn = self.conn.lock();
        let changed = match existing.first() {
            Some(current) => conn.execute(
                "UPDATE credentials SET url = ?1, api_key = ?2 WHERE id = ?3",
                params![url, api_key, current.id],
            )?,
            None => conn.execute(
                "INSERT INTO credentials (url, api_key) VALUES (?1, ?2)",
                params![url, api_key],
            )?,
        };
        Ok(changed > 0)
    }
}

impl FormRegistry for Storage {
    fn register_form(&self, form_key: &str, label: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "INSERT INTO forms (form_key, label) VALUES (?1, ?2)
             ON CONFLICT(form_key) DO UPDATE SET label = excluded.label",
            params![form_key, label],
        )?;
        Ok(changed > 0)
    }

    fn form_id(&self, form_key: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let id = conn
            .query_row(
                "SELECT id FROM forms WHERE form_key = ?1",
                params![form_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn forms(&self) -> Result<Vec<RegisteredForm>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, form_key, label FROM forms ORDER BY id")?;
        let forms = stmt
            .query_map([], |row| {
                Ok(RegisteredForm {
                    id: row.get(0)?,
                    form_key: row.get(1)?,
                    label: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(forms)
    }
}

impl MappingStore for Storage {
    fn mapping_documents(&self, form_id: i64) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT mapping FROM mappings WHERE form_id = ?1")?;
        let documents = stmt
            .query_map(params![form_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(documents)
    }

    fn save_mapping(&self, form_id: i64, document: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE mappings SET mapping = ?1 WHERE form_id = ?2",
            params![document, form_id],
        )?;
        if updated > 0 {
            return Ok(true);
        }
        let inserted = conn.execute(
            "INSERT INTO mappings (form_id, mapping) VALUES (?1, ?2)",
            params![form_id, document],
        )?;
        Ok(inserted > 0)
    }
}

impl DefaultListStore for Storage {
    fn default_list_rows(&self) -> Result<Vec<DefaultListRow>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, list_id, enabled_status FROM list_defaults ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DefaultListRow {
                    id: row.get(0)?,
                    list_id: row.get(1)?,
                    enabled: row.get::<_, i64>(2)? == 1,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn enable_exclusive(&self, list_id: &str) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let existing = {
            let mut stmt = tx.prepare("SELECT id, list_id FROM list_defaults ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter()
                .find(|(_, stored)| same_id(stored, list_id))
                .map(|(id, _)| id)
        };

        tx.execute("UPDATE list_defaults SET enabled_status = 0", [])?;
        let changed = match existing {
            Some(id) => tx.execute(
                "UPDATE list_defaults SET enabled_status = 1 WHERE id = ?1",
                params![id],
            )?,
            None => tx.execute(
                "INSERT INTO list_defaults (list_id, enabled_status) VALUES (?1, 1)",
                params![list_id],
            )?,
        };
        tx.commit()?;
        Ok(changed > 0)
    }

    fn clear_defaults(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE list_defaults SET enabled_status = 0 WHERE enabled_status = 1",
            [],
        )?;
        Ok(changed)
    }
}

fn registration_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(RegistrationMapping, String)> {
    Ok((
        RegistrationMapping {
            id: row.get(0)?,
            name: row.get(1)?,
            list_id: row.get(2)?,
            map: RegistrationMap::new(),
            active: row.get::<_, i64>(4)? == 1,
        },
        row.get(3)?,
    ))
}

fn decode_registration(
    (mut mapping, raw): (RegistrationMapping, String),
) -> Result<RegistrationMapping> {
    mapping.map = serde_json::from_str(&raw)?;
    Ok(mapping)
}

impl RegistrationStore for Storage {
    fn save_registration_mapping(
        &self,
        mapping: &RegistrationMapping,
    ) -> Result<RegistrationMapping> {
        let map_json = serde_json::to_string(&mapping.map)?;
        let conn = self.conn.lock();
        let existing: i64 =
            conn.query_row("SELECT COUNT(*) FROM registration_mappings", [], |row| {
                row.get(0)
            })?;
        let active = existing == 0;

        conn.execute(
            "INSERT INTO registration_mappings (name, list_id, map, active) VALUES (?1, ?2, ?3, ?4)",
            params![mapping.name, mapping.list_id, map_json, active as i64],
        )?;

        Ok(RegistrationMapping {
            id: conn.last_insert_rowid(),
            active,
            ..mapping.clone()
        })
    }

    fn registration_mappings(&self) -> Result<Vec<RegistrationMapping>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, list_id, map, active FROM registration_mappings ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], registration_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_registration).collect()
    }

    fn active_registration_mapping(&self) -> Result<Option<RegistrationMapping>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, name, list_id, map, active FROM registration_mappings
                 WHERE active = 1 ORDER BY id LIMIT 1",
                [],
                registration_from_row,
            )
            .optional()?;
        row.map(decode_registration).transpose()
    }

    fn set_registration_active(&self, id: i64, active: bool) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if active {
            tx.execute("UPDATE registration_mappings SET active = 0", [])?;
        }
        let changed = tx.execute(
            "UPDATE registration_mappings SET active = ?1 WHERE id = ?2",
            params![active as i64, id],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
