// 🅿️ ParkingLot - the three components wired over one store
//
// Entry registration is the only cross-component rule: the ledger asks the
// shift tracker whether a shift is open before it writes anything.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::config::LotConfig;
use crate::error::Result;
use crate::export::{export_rows, ExportRow};
use crate::ledger::{minutes_parked, PendingExit, Transaction, TransactionLedger};
use crate::rates::{rate_name_or_unresolved, RateCatalog};
use crate::reports::{ReportAggregator, ReportPeriod, ReportSummary, ShiftReport};
use crate::shift::{Shift, ShiftTracker};
use crate::storage::{initialize_defaults, Storage};

/// A parked vehicle as the lot overview shows it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkedVehicle {
    pub transaction_id: i64,
    pub plate: String,
    pub entry_time: DateTime<Utc>,
    pub minutes_parked: i64,
    pub rate_name: String,
}

pub struct ParkingLot {
    rates: RateCatalog,
    ledger: TransactionLedger,
    shift: ShiftTracker,
    recent_limit: usize,
}

impl ParkingLot {
    /// Open the configured store and seed it on first run
    pub fn open(config: &LotConfig) -> Result<Self> {
        let store = config.open_store()?;
        Self::with_store(store, config)
    }

    pub fn with_store(store: Arc<dyn Storage>, config: &LotConfig) -> Result<Self> {
        if initialize_defaults(&store, &config.seed_rates)? {
            tracing::info!("parking lot store initialized with first-run defaults");
        }

        Ok(ParkingLot {
            rates: RateCatalog::new(store.clone()),
            ledger: TransactionLedger::new(store.clone()),
            shift: ShiftTracker::new(store),
            recent_limit: config.recent_limit,
        })
    }

    pub fn rates(&self) -> &RateCatalog {
        &self.rates
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn shift(&self) -> &ShiftTracker {
        &self.shift
    }

    pub fn reports(&self) -> ReportAggregator<'_> {
        ReportAggregator::new(&self.ledger, &self.rates)
    }

    pub fn register_entry(
        &self,
        plate: &str,
        rate_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        self.ledger.register_entry(plate, rate_id, now, &self.shift)
    }

    pub fn prepare_exit(&self, plate: &str, now: DateTime<Utc>) -> Result<PendingExit> {
        self.ledger.prepare_exit(plate, now, &self.rates)
    }

    pub fn confirm_exit(&self, pending: &PendingExit) -> Result<Option<Transaction>> {
        self.ledger.confirm_exit(pending)
    }

    pub fn open_shift(&self, now: DateTime<Utc>) -> Result<Shift> {
        self.shift.open(now)
    }

    /// Close the shift and return its closing report
    pub fn close_shift(&self, now: DateTime<Utc>) -> Result<ShiftReport> {
        let shift = self.shift.close(now)?;
        let report = self.reports().shift_report(&shift, now)?;

        tracing::info!(
            vehicles = report.vehicles,
            income = report.income,
            "shift closing report"
        );
        Ok(report)
    }

    /// Parked vehicles with live elapsed time and their rate name ("N/A" if deleted)
    pub fn parked_vehicles(&self, now: DateTime<Utc>) -> Result<Vec<ParkedVehicle>> {
        let rates = self.rates.list_all()?;

        Ok(self
            .ledger
            .list_parked()?
            .into_iter()
            .map(|t| ParkedVehicle {
                transaction_id: t.id,
                minutes_parked: minutes_parked(&t, now),
                rate_name: rate_name_or_unresolved(&rates, t.rate_id),
                plate: t.plate,
                entry_time: t.entry_time,
            })
            .collect())
    }

    pub fn summary(&self, period: ReportPeriod, now: DateTime<Utc>) -> Result<ReportSummary> {
        self.reports().summary_for(period, now, self.recent_limit)
    }

    pub fn export_rows(&self) -> Result<Vec<ExportRow>> {
        let transactions = self.ledger.list_all()?;
        let rates = self.rates.list_all()?;
        Ok(export_rows(&transactions, &rates))
    }
}
