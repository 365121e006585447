// 🗄️ Storage - key/value persistence for the three parking records
//
// The core never talks to a concrete backend. Each component gets a StoreSlot
// bound to the one key it owns and reads/writes that record whole.
//
// Layout:
//   parkingRates         → ordered list of RatePolicy
//   parkingTransactions  → ordered list of Transaction
//   parkingShift         → single Shift record

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use crate::ledger::Transaction;
use crate::rates::{RateData, RatePolicy};
use crate::shift::Shift;

pub const RATES_KEY: &str = "parkingRates";
pub const TRANSACTIONS_KEY: &str = "parkingTransactions";
pub const SHIFT_KEY: &str = "parkingShift";
pub const RATE_SEQUENCE_KEY: &str = "parkingRateSequence";

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Whole-record key/value store of JSON documents
pub trait Storage: Send + Sync {
    /// Read the record stored under `key` (None if never written)
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the record stored under `key`
    fn put(&self, key: &str, value: Value) -> Result<()>;
}

/// In-process store, used by tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let records = self
            .records
            .read()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        Ok(records.get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?;
        records.insert(key.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// SQLITE BACKEND
// ============================================================================

/// SQLite-backed store: one row per key, JSON text values
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) an on-disk database with WAL journaling
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database: {:?}", path.as_ref()))?;

        // WAL for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))
    }
}

impl Storage for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.lock()?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt JSON stored under {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let json = serde_json::to_string(&value)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            params![key, json],
        )
        .with_context(|| format!("Failed to write {}", key))?;

        Ok(())
    }
}

// ============================================================================
// TYPED SLOT
// ============================================================================

/// A shared store narrowed to the single key a component owns
#[derive(Clone)]
pub struct StoreSlot {
    store: Arc<dyn Storage>,
    key: &'static str,
}

impl StoreSlot {
    pub fn new(store: Arc<dyn Storage>, key: &'static str) -> Self {
        StoreSlot { store, key }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Load and decode the record, or None if the key was never written
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.store.get(self.key)? {
            Some(value) => {
                let decoded = serde_json::from_value(value)
                    .with_context(|| format!("Failed to decode {}", self.key))?;
                Ok(Some(decoded))
            }
            None => Ok(None),
        }
    }

    /// Load the record, falling back to `T::default()` when absent
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> Result<T> {
        Ok(self.load()?.unwrap_or_default())
    }

    pub fn save<T: Serialize>(&self, record: &T) -> Result<()> {
        let value = serde_json::to_value(record)
            .with_context(|| format!("Failed to encode {}", self.key))?;
        self.store.put(self.key, value)
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.store.get(self.key)?.is_some())
    }
}

/// Persisted high-water mark so an id is never handed out twice,
/// even after the record holding it was deleted
pub struct IdSequence {
    slot: StoreSlot,
}

impl IdSequence {
    pub fn new(slot: StoreSlot) -> Self {
        IdSequence { slot }
    }

    /// Time-derived id, strictly above every id issued before and above `floor`
    pub fn next(&self, now_millis: i64, floor: i64) -> Result<i64> {
        let last: i64 = self.slot.load_or_default()?;
        let id = now_millis.max(last + 1).max(floor + 1);
        self.slot.save(&id)?;
        Ok(id)
    }
}

/// Seed first-run state: rates, an empty ledger and a closed shift.
/// Keys that already hold a record are left untouched.
/// Returns whether anything was written.
pub fn initialize_defaults(store: &Arc<dyn Storage>, seed_rates: &[RateData]) -> Result<bool> {
    let mut seeded_any = false;

    let rates = StoreSlot::new(store.clone(), RATES_KEY);
    if !rates.exists()? {
        let seeded: Vec<RatePolicy> = seed_rates
            .iter()
            .enumerate()
            .map(|(i, data)| RatePolicy::from_data(i as i64 + 1, data.clone()))
            .collect();
        rates.save(&seeded)?;
        tracing::info!(count = seeded.len(), "seeded default rate policies");
        seeded_any = true;
    }

    let transactions = StoreSlot::new(store.clone(), TRANSACTIONS_KEY);
    if !transactions.exists()? {
        transactions.save(&Vec::<Transaction>::new())?;
        seeded_any = true;
    }

    let shift = StoreSlot::new(store.clone(), SHIFT_KEY);
    if !shift.exists()? {
        shift.save(&Shift::default())?;
        seeded_any = true;
    }

    Ok(seeded_any)
}
