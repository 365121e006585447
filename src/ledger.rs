// 🚗 Transaction Ledger - vehicle entries and exits
//
// Single source of truth for who is parked and what was charged.
//
// Lifecycle per transaction:
//   registerEntry → Parked ──confirmExit──→ Completed   (irreversible)
//
// Exit is two-phase. prepare_exit computes a PendingExit without touching the
// ledger; confirm_exit commits exactly that preview. A preview can be thrown
// away, recomputed, or shown to the driver before anything is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ParkingError, Result};
use crate::fees::{billable_minutes, compute_charge, elapsed_minutes, format_parking_time};
use crate::rates::RateCatalog;
use crate::shift::ShiftGate;
use crate::storage::{Storage, StoreSlot, TRANSACTIONS_KEY};

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Parked,
    Completed,
}

/// One vehicle's stay.
///
/// `exit_time` is set iff `status == Completed`; `amount` stays 0 until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub plate: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    /// Rate chosen at entry; may dangle once the policy is deleted
    pub rate_id: i64,
    pub amount: f64,
    pub status: TransactionStatus,
}

impl Transaction {
    pub fn is_parked(&self) -> bool {
        self.status == TransactionStatus::Parked
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Exact stay length in (fractional) minutes, for completed transactions
    pub fn stay_minutes(&self) -> Option<f64> {
        self.exit_time
            .map(|exit| (exit - self.entry_time).num_milliseconds() as f64 / 60_000.0)
    }
}

/// Trimmed, upper-cased plate
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

// ============================================================================
// PENDING EXIT
// ============================================================================

/// Computed but uncommitted exit. Pass it to `confirm_exit` to commit or drop it to cancel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingExit {
    pub transaction_id: i64,
    pub plate: String,
    pub rate_id: i64,
    pub rate_name: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub billed_minutes: i64,
    pub amount: f64,
}

impl PendingExit {
    pub fn parked_time_label(&self) -> String {
        format_parking_time(self.billed_minutes)
    }
}

// ============================================================================
// LEDGER
// ============================================================================

pub struct TransactionLedger {
    slot: StoreSlot,
}

impl TransactionLedger {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        TransactionLedger {
            slot: StoreSlot::new(store, TRANSACTIONS_KEY),
        }
    }

    fn load(&self) -> Result<Vec<Transaction>> {
        Ok(self.slot.load_or_default()?)
    }

    fn save(&self, transactions: &[Transaction]) -> Result<()> {
        Ok(self.slot.save(&transactions)?)
    }

    /// Open a new stay for `plate`.
    ///
    /// Checks run in order (plate, rate, shift, duplicate) and all happen
    /// before the single write, so a failure leaves the ledger untouched.
    pub fn register_entry(
        &self,
        plate: &str,
        rate_id: Option<i64>,
        now: DateTime<Utc>,
        gate: &dyn ShiftGate,
    ) -> Result<Transaction> {
        let plate = normalize_plate(plate);
        if plate.is_empty() {
            return Err(ParkingError::validation("vehicle plate is required"));
        }

        let rate_id = rate_id.ok_or_else(|| ParkingError::validation("a rate must be selected"))?;

        if !gate.is_open()? {
            return Err(ParkingError::ShiftClosed);
        }

        let mut transactions = self.load()?;
        if transactions.iter().any(|t| t.is_parked() && t.plate == plate) {
            return Err(ParkingError::DuplicateVehicle { plate });
        }

        let highest = transactions.iter().map(|t| t.id).max().unwrap_or(0);
        let transaction = Transaction {
            id: now.timestamp_millis().max(highest + 1),
            plate,
            entry_time: now,
            exit_time: None,
            rate_id,
            amount: 0.0,
            status: TransactionStatus::Parked,
        };

        transactions.push(transaction.clone());
        self.save(&transactions)?;

        tracing::info!(
            transaction_id = transaction.id,
            plate = %transaction.plate,
            rate_id = transaction.rate_id,
            "entry registered"
        );
        Ok(transaction)
    }

    /// Preview the exit of a parked vehicle at `now`. Read-only.
    pub fn prepare_exit(
        &self,
        plate: &str,
        now: DateTime<Utc>,
        catalog: &RateCatalog,
    ) -> Result<PendingExit> {
        let plate = normalize_plate(plate);
        if plate.is_empty() {
            return Err(ParkingError::validation("vehicle plate is required"));
        }

        let parked = self
            .load()?
            .into_iter()
            .find(|t| t.is_parked() && t.plate == plate)
            .ok_or_else(|| ParkingError::not_found("parked vehicle", &plate))?;

        let rate = catalog
            .find_by_id(parked.rate_id)?
            .ok_or_else(|| ParkingError::not_found("rate", parked.rate_id))?;

        let amount = compute_charge(parked.entry_time, now, &rate);
        let pending = PendingExit {
            transaction_id: parked.id,
            plate: parked.plate,
            rate_id: rate.id,
            rate_name: rate.name,
            entry_time: parked.entry_time,
            exit_time: now,
            billed_minutes: billable_minutes(parked.entry_time, now),
            amount,
        };

        tracing::debug!(
            transaction_id = pending.transaction_id,
            plate = %pending.plate,
            amount = pending.amount,
            "exit prepared"
        );
        Ok(pending)
    }

    /// Commit a previewed exit with the previewed time and amount.
    ///
    /// Returns Ok(None) without writing when the transaction no longer exists
    /// or was already completed.
    pub fn confirm_exit(&self, pending: &PendingExit) -> Result<Option<Transaction>> {
        let mut transactions = self.load()?;

        let Some(transaction) = transactions
            .iter_mut()
            .find(|t| t.id == pending.transaction_id)
        else {
            tracing::warn!(
                transaction_id = pending.transaction_id,
                "pending exit refers to a missing transaction; ignored"
            );
            return Ok(None);
        };

        if !transaction.is_parked() {
            tracing::warn!(
                transaction_id = pending.transaction_id,
                "transaction already completed; ignored"
            );
            return Ok(None);
        }

        transaction.exit_time = Some(pending.exit_time);
        transaction.amount = pending.amount;
        transaction.status = TransactionStatus::Completed;
        let completed = transaction.clone();

        self.save(&transactions)?;

        tracing::info!(
            transaction_id = completed.id,
            plate = %completed.plate,
            amount = completed.amount,
            "exit confirmed"
        );
        Ok(Some(completed))
    }

    /// Open transactions, insertion order
    pub fn list_parked(&self) -> Result<Vec<Transaction>> {
        Ok(self.load()?.into_iter().filter(|t| t.is_parked()).collect())
    }

    /// Closed transactions, insertion order
    pub fn list_completed(&self) -> Result<Vec<Transaction>> {
        Ok(self.load()?.into_iter().filter(|t| t.is_completed()).collect())
    }

    pub fn list_all(&self) -> Result<Vec<Transaction>> {
        self.load()
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Transaction>> {
        Ok(self.load()?.into_iter().find(|t| t.id == id))
    }
}

/// Live (unclamped) minutes a vehicle has been parked as of `now`
pub fn minutes_parked(transaction: &Transaction, now: DateTime<Utc>) -> i64 {
    elapsed_minutes(transaction.entry_time, now)
}
