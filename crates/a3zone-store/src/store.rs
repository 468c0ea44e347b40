//! The character store and its three backends.
//!
//! ```text
//! mode     load                               save
//! ------   --------------------------------   --------------------------
//! db       SQLite only, errors are fatal      SQLite only
//! hybrid   SQLite, JSON file if SQLite fails  SQLite, JSON file on error
//! json     JSON files only                    JSON files only
//! ```
//!
//! The SQLite handle is opened lazily on first use. Opening it also
//! imports every `<data_dir>/characters/*.json` record into the
//! `characters` table, once per database.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use a3zone_rules::{Character, Class, FALLBACK_NAME};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{error, info, warn};

use crate::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS characters (
  name TEXT PRIMARY KEY,
  payload TEXT NOT NULL,
  updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS store_migrations (
  id TEXT PRIMARY KEY,
  applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

const UPSERT: &str = r#"
INSERT INTO characters(name, payload, updated_at)
VALUES (?1, ?2, CURRENT_TIMESTAMP)
ON CONFLICT(name) DO UPDATE SET
  payload = excluded.payload,
  updated_at = CURRENT_TIMESTAMP
"#;

const LEGACY_IMPORT: &str = "legacy_json_import";

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Which backend(s) the store reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistenceMode {
    #[default]
    Db,
    Hybrid,
    Json,
}

impl PersistenceMode {
    /// Parses a configured mode. Unknown values log a warning and fall
    /// back to [`PersistenceMode::Db`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "db" | "sqlite" => Self::Db,
            "hybrid" => Self::Hybrid,
            "json" | "legacy" => Self::Json,
            other => {
                warn!(mode = other, "unknown persistence mode, defaulting to db");
                Self::Db
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Db => "db",
            Self::Hybrid => "hybrid",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Storage key for a character name: lowercase `[a-z0-9_-]`, spaces
/// become `_`, anything else is dropped. Never empty.
pub fn sanitize_name(name: &str) -> String {
    let key: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|ch| match ch {
            'a'..='z' | '0'..='9' | '_' | '-' => Some(ch),
            ' ' => Some('_'),
            _ => None,
        })
        .collect();
    if key.is_empty() {
        "wanderer".to_string()
    } else {
        key
    }
}

fn display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// A record read from storage takes the requested display name and, when
/// the client asked for one, the class.
fn adopt(mut c: Character, name: &str, class_hint: Option<&str>) -> Character {
    c.name = name.to_string();
    if let Some(class) = class_hint.and_then(Class::parse) {
        c.class = class;
    }
    c.normalize();
    c
}

fn fresh(name: &str, class_hint: Option<&str>) -> Character {
    let class = class_hint.and_then(Class::parse).unwrap_or_default();
    Character::new(name, class)
}

// ---------------------------------------------------------------------------
// CharacterStore
// ---------------------------------------------------------------------------

/// Loads and saves characters.
///
/// All methods block; async callers should run them on
/// `tokio::task::spawn_blocking`.
pub struct CharacterStore {
    mode: PersistenceMode,
    json_dir: PathBuf,
    db_path: PathBuf,
    /// Opened on first use. A failed open is remembered and reported on
    /// every later call instead of being retried.
    db: OnceLock<Result<Mutex<Connection>, String>>,
}

impl CharacterStore {
    /// A store rooted at `data_dir`: JSON records live in
    /// `data_dir/characters/`, the database at `data_dir/characters.db`.
    pub fn new(mode: PersistenceMode, data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            mode,
            json_dir: data_dir.join("characters"),
            db_path: data_dir.join("characters.db"),
            db: OnceLock::new(),
        }
    }

    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    /// Loads a character, or builds a class-appropriate default when no
    /// record exists.
    pub fn load(&self, name: &str, class_hint: Option<&str>) -> Result<Character, StoreError> {
        let name = display_name(name);
        let found = match self.mode {
            PersistenceMode::Json => self.load_json(&name, class_hint)?,
            PersistenceMode::Db => load_db(self.db()?, &name, class_hint)?,
            PersistenceMode::Hybrid => self.load_hybrid(&name, class_hint)?,
        };
        Ok(found.unwrap_or_else(|| fresh(&name, class_hint)))
    }

    fn load_hybrid(
        &self,
        name: &str,
        class_hint: Option<&str>,
    ) -> Result<Option<Character>, StoreError> {
        let db = match self.db() {
            Ok(db) => db,
            Err(e) => {
                warn!(character = %name, error = %e, "character db unavailable, falling back to json");
                return self.load_json(name, class_hint);
            }
        };

        match load_db(db, name, class_hint) {
            Ok(found) => Ok(found),
            Err(e) => {
                warn!(character = %name, error = %e, "character db read failed, trying json");
                let legacy = self.load_json(name, class_hint)?;
                if let Some(c) = &legacy {
                    if let Err(e) = save_db(db, c) {
                        warn!(character = %name, error = %e, "migrating json record into db failed");
                    }
                }
                Ok(legacy)
            }
        }
    }

    /// Persists a character under its sanitized name.
    pub fn save(&self, c: &Character) -> Result<(), StoreError> {
        let mut record = c.clone();
        record.normalize();

        match self.mode {
            PersistenceMode::Json => self.save_json(&record),
            PersistenceMode::Db => save_db(self.db()?, &record),
            PersistenceMode::Hybrid => match self.db().and_then(|db| save_db(db, &record)) {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!(character = %record.name, error = %e, "character db write failed, falling back to json");
                    self.save_json(&record)
                }
            },
        }
    }

    fn db(&self) -> Result<&Mutex<Connection>, StoreError> {
        self.db
            .get_or_init(|| {
                self.open_db().map(Mutex::new).map_err(|e| {
                    error!(path = %self.db_path.display(), error = %e, "failed to open character db");
                    e.to_string()
                })
            })
            .as_ref()
            .map_err(|e| StoreError::DbUnavailable(e.clone()))
    }

    fn open_db(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(&self.db_path)?;
        conn.execute_batch(SCHEMA)?;
        let imported = import_legacy(&mut conn, &self.json_dir)?;
        info!(path = %self.db_path.display(), imported, "character db ready");
        Ok(conn)
    }

    fn json_path(&self, name: &str) -> PathBuf {
        self.json_dir.join(format!("{}.json", sanitize_name(name)))
    }

    fn load_json(
        &self,
        name: &str,
        class_hint: Option<&str>,
    ) -> Result<Option<Character>, StoreError> {
        let data = match fs::read(self.json_path(name)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let c: Character = serde_json::from_slice(&data)?;
        Ok(Some(adopt(c, name, class_hint)))
    }

    fn save_json(&self, c: &Character) -> Result<(), StoreError> {
        fs::create_dir_all(&self.json_dir)?;
        let path = self.json_path(&c.name);
        // Each write gets its own temp file; concurrent saves of one
        // character race only on the final rename.
        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(&self.json_dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(c)?)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn load_db(
    db: &Mutex<Connection>,
    name: &str,
    class_hint: Option<&str>,
) -> Result<Option<Character>, StoreError> {
    let payload: Option<String> = db
        .lock()
        .query_row(
            "SELECT payload FROM characters WHERE name = ?1",
            params![sanitize_name(name)],
            |row| row.get(0),
        )
        .optional()?;

    let Some(payload) = payload else {
        return Ok(None);
    };
    let c: Character = serde_json::from_str(&payload)?;
    Ok(Some(adopt(c, name, class_hint)))
}

fn save_db(db: &Mutex<Connection>, c: &Character) -> Result<(), StoreError> {
    let payload = serde_json::to_string(c)?;
    db.lock()
        .execute(UPSERT, params![sanitize_name(&c.name), payload])?;
    Ok(())
}

/// Copies every JSON record in `dir` into the database. Runs once per
/// database; the import is recorded in `store_migrations`.
fn import_legacy(conn: &mut Connection, dir: &Path) -> Result<usize, StoreError> {
    let done: Option<String> = conn
        .query_row(
            "SELECT id FROM store_migrations WHERE id = ?1",
            params![LEGACY_IMPORT],
            |row| row.get(0),
        )
        .optional()?;
    if done.is_some() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    let mut imported = 0;

    let entries = match fs::read_dir(dir) {
        Ok(entries) => Some(entries),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    for entry in entries.into_iter().flatten() {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable legacy entry");
                continue;
            }
        };
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !path.is_file() || !is_json {
            continue;
        }

        let c = match read_legacy(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable legacy record");
                continue;
            }
        };
        tx.execute(UPSERT, params![sanitize_name(&c.name), serde_json::to_string(&c)?])?;
        imported += 1;
    }

    tx.execute(
        "INSERT INTO store_migrations(id) VALUES (?1)",
        params![LEGACY_IMPORT],
    )?;
    tx.commit()?;
    Ok(imported)
}

/// Parses one legacy flat file. A record without a name takes the file
/// stem.
fn read_legacy(path: &Path) -> Result<Character, StoreError> {
    let value: serde_json::Value = serde_json::from_slice(&fs::read(path)?)?;
    let named = value
        .get("name")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|n| !n.trim().is_empty());
    let mut c: Character = serde_json::from_value(value)?;
    if !named {
        if let Some(stem) = path.file_stem() {
            c.name = stem.to_string_lossy().into_owned();
        }
    }
    c.normalize();
    Ok(c)
}
