// 🕐 Shift Tracker - the single operator session gating new entries
//
// Closed → open(now) → Open → close(now) → Closed
// No guard against double open/close here; callers check `is_open` first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::storage::{Storage, StoreSlot, SHIFT_KEY};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub is_open: bool,
    pub open_time: Option<DateTime<Utc>>,
    pub close_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub initial_balance: f64,
}

/// Whatever decides whether an entry may be registered right now
pub trait ShiftGate {
    fn is_open(&self) -> Result<bool>;
}

pub struct ShiftTracker {
    slot: StoreSlot,
}

impl ShiftTracker {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        ShiftTracker {
            slot: StoreSlot::new(store, SHIFT_KEY),
        }
    }

    pub fn open(&self, now: DateTime<Utc>) -> Result<Shift> {
        if self.status()?.is_open {
            tracing::warn!("opening a shift that is already open; restarting it");
        }

        let shift = Shift {
            is_open: true,
            open_time: Some(now),
            close_time: None,
            initial_balance: 0.0,
        };
        self.slot.save(&shift)?;

        tracing::info!(open_time = %now, "shift opened");
        Ok(shift)
    }

    pub fn close(&self, now: DateTime<Utc>) -> Result<Shift> {
        let mut shift = self.status()?;
        if !shift.is_open {
            tracing::warn!("closing a shift that is not open");
        }

        shift.is_open = false;
        shift.close_time = Some(now);
        self.slot.save(&shift)?;

        tracing::info!(close_time = %now, "shift closed");
        Ok(shift)
    }

    /// Current record; a store that was never seeded reads as a closed shift
    pub fn status(&self) -> Result<Shift> {
        Ok(self.slot.load_or_default()?)
    }
}

impl ShiftGate for ShiftTracker {
    fn is_open(&self) -> Result<bool> {
        Ok(self.status()?.is_open)
    }
}
