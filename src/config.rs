// ⚙️ Configuration - lot settings as data
//
// Loaded from a JSON file; every field is optional and falls back to defaults.
// Keys are camelCase, like the persisted records the seed rates become.
//
// {
//   "databasePath": "parking.db",
//   "recentLimit": 10,
//   "seedRates": [
//     { "name": "Standard Rate", "type": "minute", "costPerMinute": 0.05, "status": "active" }
//   ]
// }

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::rates::{default_rates, RateData};
use crate::storage::{MemoryStore, SqliteStore, Storage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LotConfig {
    /// SQLite file; None keeps everything in memory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Policies written on first run only
    #[serde(default = "default_rates")]
    pub seed_rates: Vec<RateData>,

    /// How many recent transactions a report summary lists
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    10
}

impl Default for LotConfig {
    fn default() -> Self {
        LotConfig {
            database_path: None,
            seed_rates: default_rates(),
            recent_limit: default_recent_limit(),
        }
    }
}

impl LotConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: LotConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// Build the storage backend this config points at
    pub fn open_store(&self) -> Result<Arc<dyn Storage>> {
        match &self.database_path {
            Some(path) => Ok(Arc::new(SqliteStore::open(path)?)),
            None => Ok(Arc::new(MemoryStore::new())),
        }
    }
}
