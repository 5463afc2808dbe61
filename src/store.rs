//! Store Module
//!
//! The key-value engine over one SQLite table.
//!
//! ## Responsibilities
//! - Own the backing connection and the logical table
//! - Materialize the table lazily before any operation
//! - Compose reads/writes through the value codec
//! - Broadcast get/set events to subscribers
//!
//! ## Statement Safety
//!
//! The store name is the only identifier ever interpolated into statement
//! text, and it is allow-listed at open (ASCII alphanumeric/underscore, no
//! leading digit, at most 64 bytes). Keys, values, deltas, and search
//! patterns are always bound as statement parameters.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam::channel::Receiver;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec;
use crate::config::Config;
use crate::error::{Result, ShelfError};
use crate::events::{Event, EventBus, EventKind};

/// Maximum length of a store name, in bytes
const MAX_NAME_LEN: usize = 64;

/// A raw row from the backing table
///
/// The value is the stored text, not decoded; pass it through
/// [`codec::decode`] to recover the semantic value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The entry key
    pub key: String,

    /// The serialized value text as stored
    pub value: String,
}

/// The key-value store
///
/// ## Concurrency Model: Single Owner
///
/// The connection is exclusively owned by this instance; no operation
/// references any shared or ambient handle. Every public operation is one
/// synchronous unit of work against the backing store. `add`/`subtract`
/// execute as a single conditional upsert inside SQLite, so concurrent
/// accumulation through separate stores on the same file cannot lose
/// updates.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Database file path (None for in-memory stores)
    db_path: Option<PathBuf>,

    /// Exclusively-owned backing connection
    conn: Connection,

    /// Whether the backing table is known to exist
    table_ready: Cell<bool>,

    /// Broadcast of get/set notifications
    events: EventBus,
}

impl Store {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const DB_FILENAME: &'static str = "shelf.db";
    const BACKUP_EXT: &'static str = "sqlite3";

    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate the store name against the identifier allow-list
    /// 2. Open the database file (or an in-memory database)
    /// 3. Apply the lock-acquisition timeout and journal mode
    ///
    /// The backing table itself is created lazily by the first operation.
    pub fn open(config: Config) -> Result<Self> {
        validate_store_name(&config.name)?;

        let (conn, db_path) = if config.memory {
            (Connection::open_in_memory()?, None)
        } else {
            fs::create_dir_all(&config.data_dir)?;
            let path = config.data_dir.join(Self::DB_FILENAME);
            let conn = if config.file_must_exist {
                // Without the CREATE flag, opening a missing file fails
                Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_WRITE)?
            } else {
                Connection::open(&path)?
            };
            (conn, Some(path))
        };

        conn.busy_timeout(Duration::from_millis(config.timeout_ms))?;
        if db_path.is_some() {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }

        tracing::info!(
            "Opened store {:?} ({})",
            config.name,
            db_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "in-memory".to_string())
        );

        Ok(Self {
            config,
            db_path,
            conn,
            table_ready: Cell::new(false),
            events: EventBus::new(),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Whether the specified key exists
    pub fn has(&self, key: &str) -> Result<bool> {
        self.ensure_table()?;
        let sql = format!("SELECT 1 FROM \"{}\" WHERE key = ?1", self.config.name);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let row: Option<i64> = stmt.query_row(params![key], |row| row.get(0)).optional()?;
        Ok(row.is_some())
    }

    /// Get the value for a key
    ///
    /// Returns `None` when the key is not set. Emits a `Get` event on a hit.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_table()?;
        let sql = format!("SELECT value FROM \"{}\" WHERE key = ?1", self.config.name);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let stored: Option<String> = stmt.query_row(params![key], |row| row.get(0)).optional()?;

        match stored {
            Some(text) => {
                let value = codec::decode(&text);
                self.events.publish(Event {
                    kind: EventKind::Get,
                    key: key.to_string(),
                    value: value.clone(),
                });
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Get every entry in key order
    ///
    /// Values are the raw stored text; decode them with [`codec::decode`].
    pub fn get_all(&self) -> Result<Vec<Entry>> {
        self.ensure_table()?;
        let sql = format!(
            "SELECT key, value FROM \"{}\" ORDER BY key",
            self.config.name
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(Entry {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// Find entries whose key starts with the given prefix
    ///
    /// Returns a mapping from full key to decoded value. LIKE wildcards in
    /// the prefix (`%`, `_`, `\`) match literally.
    pub fn find(&self, prefix: &str) -> Result<BTreeMap<String, Value>> {
        if prefix.is_empty() {
            return Err(ShelfError::Validation(
                "find prefix must not be empty".to_string(),
            ));
        }
        self.ensure_table()?;

        let pattern = format!("{}%", escape_like_wildcards(prefix));
        let sql = format!(
            "SELECT key, value FROM \"{}\" WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key",
            self.config.name
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![pattern], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut found = BTreeMap::new();
        for row in rows {
            let (key, stored) = row?;
            found.insert(key, codec::decode(&stored));
        }
        Ok(found)
    }

    /// Set a key to a value, inserting or replacing as needed
    ///
    /// Returns the stored value as a subsequent `get` observes it, and emits
    /// a `Set` event carrying the same.
    pub fn set(&self, key: &str, value: Value) -> Result<Value> {
        if key.is_empty() {
            return Err(ShelfError::Validation("key must not be empty".to_string()));
        }
        self.ensure_table()?;

        let stored = codec::encode(&value);
        let sql = format!(
            "INSERT INTO \"{}\" (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            self.config.name
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params![key, stored])?;

        let value = codec::decode(&stored);
        self.events.publish(Event {
            kind: EventKind::Set,
            key: key.to_string(),
            value: value.clone(),
        });
        Ok(value)
    }

    /// Delete a key
    ///
    /// Delete-if-present is unconditionally successful: returns `true`
    /// whether or not the key existed.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_table()?;
        let sql = format!("DELETE FROM \"{}\" WHERE key = ?1", self.config.name);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params![key])?;
        Ok(true)
    }

    /// Delete every entry in the store
    pub fn delete_all(&self) -> Result<bool> {
        self.ensure_table()?;
        let sql = format!("DELETE FROM \"{}\"", self.config.name);
        self.conn.execute(&sql, [])?;
        Ok(true)
    }

    /// Delete every entry, then drop the backing table entirely
    ///
    /// Irreversible. The store itself remains usable: the next operation
    /// materializes a fresh empty table.
    pub fn destroy(&self) -> Result<()> {
        self.ensure_table()?;
        self.conn
            .execute(&format!("DELETE FROM \"{}\"", self.config.name), [])?;
        self.conn
            .execute(&format!("DROP TABLE IF EXISTS \"{}\"", self.config.name), [])?;
        self.table_ready.set(false);
        tracing::info!("Destroyed store {:?}", self.config.name);
        Ok(())
    }

    /// Add a delta to the numeric value stored at a key
    ///
    /// A missing key counts from 0, so `add` on a fresh key behaves as
    /// `set(key, delta)`. Fails with [`ShelfError::TypeConflict`] when the
    /// existing value is not a base-10 integer; the stored value is left
    /// unchanged in that case. Returns the new total.
    pub fn add(&self, key: &str, delta: i64) -> Result<i64> {
        self.accumulate(key, delta, '+')
    }

    /// Subtract a delta from the numeric value stored at a key
    ///
    /// Symmetric to [`add`](Store::add) with inverted sign: computes
    /// `current - delta`, with a missing key counting from 0.
    pub fn subtract(&self, key: &str, delta: i64) -> Result<i64> {
        self.accumulate(key, delta, '-')
    }

    /// Read-modify-write of a numeric value as ONE conditional upsert
    ///
    /// The arithmetic runs inside SQLite in a single round trip, so there is
    /// no window for a lost update between read and write. The guard clause
    /// only fires the update when the stored payload is an exact base-10
    /// integer; zero rows back for an existing key means the guard failed.
    fn accumulate(&self, key: &str, delta: i64, op: char) -> Result<i64> {
        self.ensure_table()?;

        let tag_s = codec::TAG_STRING as char;
        let tag_j = codec::TAG_JSON as char;
        let sql = format!(
            "INSERT INTO \"{table}\" (key, value) \
             VALUES (?1, '{tag_j}' || CAST(0 {op} ?2 AS TEXT)) \
             ON CONFLICT(key) DO UPDATE SET \
             value = '{tag_j}' || CAST(CAST(substr(value, 2) AS INTEGER) {op} ?2 AS TEXT) \
             WHERE substr(value, 1, 1) IN ('{tag_s}', '{tag_j}') \
             AND substr(value, 2) = CAST(CAST(substr(value, 2) AS INTEGER) AS TEXT) \
             RETURNING CAST(substr(value, 2) AS INTEGER)",
            table = self.config.name,
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;

        match stmt.query_row(params![key, delta], |row| row.get::<_, i64>(0)) {
            Ok(total) => Ok(total),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(ShelfError::TypeConflict {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of entries in the store
    pub fn count(&self) -> Result<u64> {
        self.ensure_table()?;
        let sql = format!("SELECT count(*) FROM \"{}\"", self.config.name);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let count: i64 = stmt.query_row([], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Every key currently stored, in key order
    pub fn keys(&self) -> Result<Vec<String>> {
        self.ensure_table()?;
        let sql = format!("SELECT key FROM \"{}\" ORDER BY key", self.config.name);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }

    /// Snapshot the entire backing store to a new file
    ///
    /// The snapshot lands in the data directory as `{name}.sqlite3`, with a
    /// timestamped name when none is given. Uses the SQLite online backup
    /// API, so the store stays usable during the copy. Returns the snapshot
    /// path.
    pub fn backup(&self, name: Option<&str>) -> Result<PathBuf> {
        let file_stem = match name {
            Some(n) => {
                validate_backup_name(n)?;
                n.to_string()
            }
            None => format!("backup-{}", unix_millis()),
        };

        // Memory-only stores may not have touched the data directory yet
        fs::create_dir_all(&self.config.data_dir)?;
        let target = self
            .config
            .data_dir
            .join(format!("{}.{}", file_stem, Self::BACKUP_EXT));

        let mut dst = Connection::open(&target)?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dst)?;
        backup.run_to_completion(100, Duration::from_millis(250), None)?;
        drop(backup);

        tracing::info!(
            "Backed up store {:?} to {}",
            self.config.name,
            target.display()
        );
        Ok(target)
    }

    /// Register an event subscriber
    ///
    /// The receiver sees every subsequent get/set notification, subject to
    /// best-effort delivery (see [`crate::events`]).
    pub fn subscribe(&self) -> Receiver<Event> {
        self.events.subscribe()
    }

    /// Close the store, releasing the backing connection
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_conn, err)| err.into())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the store name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Get the database file path (None for in-memory stores)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Create the backing table if it does not exist yet
    ///
    /// Idempotent; the round trip is skipped once the table is known to
    /// exist. `destroy` resets the flag so the table is recreated lazily.
    fn ensure_table(&self) -> Result<()> {
        if self.table_ready.get() {
            return Ok(());
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            self.config.name
        );
        self.conn.execute(&sql, [])?;
        self.table_ready.set(true);
        tracing::debug!("Ensured table {:?}", self.config.name);
        Ok(())
    }
}

/// Validate a store name against the identifier allow-list
///
/// Names are interpolated into statement text as the table identifier, so
/// they must be ASCII alphanumeric/underscore, must not start with a digit,
/// and are bounded at [`MAX_NAME_LEN`] bytes.
fn validate_store_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(ShelfError::Validation(format!(
            "store name must be 1-{} bytes, got {}",
            MAX_NAME_LEN,
            name.len()
        )));
    }
    if name.as_bytes()[0].is_ascii_digit() {
        return Err(ShelfError::Validation(format!(
            "store name must not start with a digit: {:?}",
            name
        )));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    {
        return Err(ShelfError::Validation(format!(
            "store name must be ASCII alphanumeric/underscore: {:?}",
            name
        )));
    }
    Ok(())
}

/// Validate a caller-supplied backup name
fn validate_backup_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ShelfError::Validation(
            "backup name must not be empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(ShelfError::Validation(format!(
            "backup name must not contain path separators: {:?}",
            name
        )));
    }
    Ok(())
}

/// Escape LIKE wildcards so a prefix matches literally
///
/// `%`, `_`, and the escape character itself are prefixed with `\`; the
/// query supplies `ESCAPE '\'`.
fn escape_like_wildcards(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Milliseconds since the Unix epoch, for default backup names
fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
