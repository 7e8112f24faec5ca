//! SQLite store with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `expenses` - Expense inserts, range queries, removal
//! - `profile` - Baseline averages, alert records, monthly budget
//! - `learning` - Learned keyword -> category map
//! - `store` - Async `ExpenseStore` / `LearningStore` adapters
//!
//! Amounts are stored as decimal text. Timestamps are fixed-width RFC 3339
//! UTC strings, so range filters and ordering compare lexically.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::ExpenseChange;
use crate::store::{StoreEvent, CHANGE_CHANNEL_CAPACITY};

mod expenses;
mod learning;
mod profile;
mod store;


pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "PAISA_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// A fixed application salt keeps the key stable across database paths.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"paisa-salt-v1-ok";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let output = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(output.as_bytes()))
}

/// Instants are stored with microsecond precision
pub(crate) fn stored_instant(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_decimal(idx: usize, s: &str) -> rusqlite::Result<Decimal> {
    Decimal::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
    changes: broadcast::Sender<StoreEvent>,
}

impl Database {
    /// Open an encrypted database
    ///
    /// Requires `PAISA_DB_KEY`. Use `new_unencrypted()` for development.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// WARNING: no encryption at rest
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?);
            let manager = manager.with_init(move |conn| conn.execute_batch(&key_pragma));
            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let db = Self {
            pool,
            db_path: path.to_string(),
            changes,
        };
        db.run_migrations()?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Temporary database for tests
    ///
    /// Uses a temp file rather than `:memory:` because SQLCipher has issues
    /// with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "paisa_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path.to_string_lossy())
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    pub(crate) fn publish(&self, user_id: &str, change: ExpenseChange) {
        // No receivers is fine
        let _ = self.changes.send(StoreEvent {
            user_id: user_id.to_string(),
            change,
        });
    }

    pub(crate) fn subscribe_changes(&self) -> broadcast::Receiver<StoreEvent> {
        self.changes.subscribe()
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Append-only expense log
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                amount TEXT NOT NULL,                      -- decimal text
                category TEXT NOT NULL,
                note TEXT NOT NULL,
                timestamp TEXT NOT NULL,                   -- RFC 3339 UTC, micros
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_user_time ON expenses(user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_expenses_user_category_time
                ON expenses(user_id, category, timestamp);

            -- Average daily spend per category, written by an offline job
            CREATE TABLE IF NOT EXISTS baselines (
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                average TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, category)
            );

            -- One alert per user and category, overwritten on each trigger
            CREATE TABLE IF NOT EXISTS alerts (
                user_id TEXT NOT NULL,
                category TEXT NOT NULL,
                alert_type TEXT NOT NULL,                  -- amount_spike, frequency_spike
                amount TEXT NOT NULL,
                count INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (user_id, category)
            );

            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                monthly_budget TEXT
            );

            CREATE TABLE IF NOT EXISTS learned_keywords (
                user_id TEXT NOT NULL,
                keyword TEXT NOT NULL,
                category TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (user_id, keyword)
            );
            "#,
        )?;

        debug!(path = %self.db_path, "Database migrations complete");
        Ok(())
    }
}
