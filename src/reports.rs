// 📊 Report Aggregator - statistics derived from the ledger
//
// Read-only and uncached: every call rescans the ledger.
// Rate usage only counts rate ids that still resolve; dangling references
// stay in the raw totals but are left out of the per-rate breakdown.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::fees::round_cents;
use crate::ledger::{Transaction, TransactionLedger};
use crate::rates::{RateCatalog, RatePolicy};
use crate::shift::Shift;

// ============================================================================
// REPORT TYPES
// ============================================================================

/// Window of exit dates a report covers (UTC calendar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportPeriod {
    #[default]
    All,
    Today,
    /// ISO week (Monday-first) containing `now`
    ThisWeek,
    ThisMonth,
    /// Inclusive date range
    Custom { from: NaiveDate, to: NaiveDate },
}

impl ReportPeriod {
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        let today = now.date_naive();

        match self {
            ReportPeriod::All => true,
            ReportPeriod::Today => day == today,
            ReportPeriod::ThisWeek => day.iso_week() == today.iso_week(),
            ReportPeriod::ThisMonth => day.year() == today.year() && day.month() == today.month(),
            ReportPeriod::Custom { from, to } => *from <= day && day <= *to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateUsage {
    pub rate_id: i64,
    pub rate_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_vehicles: usize,
    pub total_income: f64,
    pub average_stay_minutes: f64,
    pub currently_parked: usize,
    /// Most recent first
    pub recent_transactions: Vec<Transaction>,
    pub rate_usage: Vec<RateUsage>,
}

/// Closing figures for one shift window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReport {
    pub open_time: Option<DateTime<Utc>>,
    pub close_time: Option<DateTime<Utc>>,
    pub vehicles: usize,
    pub income: f64,
    pub still_parked: usize,
}

// ============================================================================
// AGGREGATOR
// ============================================================================

pub struct ReportAggregator<'a> {
    ledger: &'a TransactionLedger,
    catalog: &'a RateCatalog,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(ledger: &'a TransactionLedger, catalog: &'a RateCatalog) -> Self {
        ReportAggregator { ledger, catalog }
    }

    pub fn total_vehicles(&self) -> Result<usize> {
        Ok(self.ledger.list_completed()?.len())
    }

    pub fn total_income(&self) -> Result<f64> {
        Ok(total_income(&self.ledger.list_completed()?))
    }

    /// Mean stay of completed transactions in minutes; 0 when there are none
    pub fn average_stay_minutes(&self) -> Result<f64> {
        Ok(average_stay_minutes(&self.ledger.list_completed()?))
    }

    pub fn currently_parked_count(&self) -> Result<usize> {
        Ok(self.ledger.list_parked()?.len())
    }

    /// Last `n` completed transactions, most recent first
    pub fn recent_transactions(&self, n: usize) -> Result<Vec<Transaction>> {
        Ok(recent(&self.ledger.list_completed()?, n))
    }

    /// Completed transactions per still-existing rate id
    pub fn per_rate_usage(&self) -> Result<BTreeMap<i64, usize>> {
        let completed = self.ledger.list_completed()?;
        let rates = self.catalog.list_all()?;
        Ok(usage_counts(&completed, &rates))
    }

    /// Same breakdown as `per_rate_usage`, with rate names resolved
    pub fn rate_usage(&self) -> Result<Vec<RateUsage>> {
        let completed = self.ledger.list_completed()?;
        let rates = self.catalog.list_all()?;
        Ok(named_usage(&completed, &rates))
    }

    /// Summary over the whole ledger
    pub fn summary(&self, now: DateTime<Utc>, recent_limit: usize) -> Result<ReportSummary> {
        self.summary_for(ReportPeriod::All, now, recent_limit)
    }

    /// Summary restricted to transactions whose exit falls in `period`
    pub fn summary_for(
        &self,
        period: ReportPeriod,
        now: DateTime<Utc>,
        recent_limit: usize,
    ) -> Result<ReportSummary> {
        let transactions = self.ledger.list_all()?;
        let rates = self.catalog.list_all()?;

        let completed: Vec<Transaction> = transactions
            .iter()
            .filter(|t| t.is_completed())
            .filter(|t| t.exit_time.is_some_and(|exit| period.contains(exit, now)))
            .cloned()
            .collect();

        Ok(ReportSummary {
            total_vehicles: completed.len(),
            total_income: total_income(&completed),
            average_stay_minutes: average_stay_minutes(&completed),
            currently_parked: transactions.iter().filter(|t| t.is_parked()).count(),
            recent_transactions: recent(&completed, recent_limit),
            rate_usage: named_usage(&completed, &rates),
        })
    }

    /// Vehicles and income whose exit falls inside the shift window.
    /// An open shift is measured up to `now`; a never-opened shift reports zeros.
    pub fn shift_report(&self, shift: &Shift, now: DateTime<Utc>) -> Result<ShiftReport> {
        let transactions = self.ledger.list_all()?;
        let still_parked = transactions.iter().filter(|t| t.is_parked()).count();

        let in_window: Vec<Transaction> = match shift.open_time {
            Some(open) => {
                let close = if shift.is_open {
                    now
                } else {
                    shift.close_time.unwrap_or(now)
                };
                transactions
                    .into_iter()
                    .filter(|t| t.exit_time.is_some_and(|exit| open <= exit && exit <= close))
                    .collect()
            }
            None => Vec::new(),
        };

        Ok(ShiftReport {
            open_time: shift.open_time,
            close_time: shift.close_time,
            vehicles: in_window.len(),
            income: total_income(&in_window),
            still_parked,
        })
    }
}

// ============================================================================
// PURE HELPERS
// ============================================================================

/// Exact sum of stored amounts, rounded to cents once at the end
fn total_income(completed: &[Transaction]) -> f64 {
    round_cents(completed.iter().map(|t| t.amount).sum())
}

fn average_stay_minutes(completed: &[Transaction]) -> f64 {
    let stays: Vec<f64> = completed.iter().filter_map(|t| t.stay_minutes()).collect();
    if stays.is_empty() {
        return 0.0;
    }
    stays.iter().sum::<f64>() / stays.len() as f64
}

fn recent(completed: &[Transaction], n: usize) -> Vec<Transaction> {
    completed.iter().rev().take(n).cloned().collect()
}

fn usage_counts(completed: &[Transaction], rates: &[RatePolicy]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for tx in completed {
        if rates.iter().any(|r| r.id == tx.rate_id) {
            *counts.entry(tx.rate_id).or_insert(0) += 1;
        }
    }
    counts
}

fn named_usage(completed: &[Transaction], rates: &[RatePolicy]) -> Vec<RateUsage> {
    usage_counts(completed, rates)
        .into_iter()
        .filter_map(|(rate_id, count)| {
            rates.iter().find(|r| r.id == rate_id).map(|rate| RateUsage {
                rate_id,
                rate_name: rate.name.clone(),
                count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PendingExit;
    use crate::rates::RateData;
    use crate::shift::ShiftGate;
    use crate::storage::{MemoryStore, Storage};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    struct AlwaysOpen;

    impl ShiftGate for AlwaysOpen {
        fn is_open(&self) -> Result<bool> {
            Ok(true)
        }
    }

    struct Fixture {
        ledger: TransactionLedger,
        catalog: RateCatalog,
        minute: i64,
        daily: i64,
    }

    impl Fixture {
        fn new() -> Self {
            let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
            let catalog = RateCatalog::new(store.clone());
            let minute = catalog.add(RateData::per_minute("Standard", 0.05)).unwrap().id;
            let daily = catalog.add(RateData::per_day("Daily", 20.0)).unwrap().id;
            Fixture {
                ledger: TransactionLedger::new(store),
                catalog,
                minute,
                daily,
            }
        }

        fn aggregator(&self) -> ReportAggregator<'_> {
            ReportAggregator::new(&self.ledger, &self.catalog)
        }

        fn stay(&self, plate: &str, rate: i64, entry: DateTime<Utc>, minutes: i64) -> Transaction {
            self.ledger
                .register_entry(plate, Some(rate), entry, &AlwaysOpen)
                .unwrap();
            let pending: PendingExit = self
                .ledger
                .prepare_exit(plate, entry + Duration::minutes(minutes), &self.catalog)
                .unwrap();
            self.ledger.confirm_exit(&pending).unwrap().unwrap()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 12, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_ledger_reports_zeros() {
        let fx = Fixture::new();
        let reports = fx.aggregator();

        assert_eq!(reports.total_vehicles().unwrap(), 0);
        assert_eq!(reports.total_income().unwrap(), 0.0);
        assert_eq!(reports.average_stay_minutes().unwrap(), 0.0);
        assert_eq!(reports.currently_parked_count().unwrap(), 0);
        assert!(reports.recent_transactions(10).unwrap().is_empty());
        assert!(reports.per_rate_usage().unwrap().is_empty());
    }

    #[test]
    fn test_totals_and_average() {
        let fx = Fixture::new();
        fx.stay("AAA111", fx.minute, t0(), 20);
        fx.stay("BBB222", fx.minute, t0(), 40);
        fx.stay("CCC333", fx.daily, t0(), 60);
        fx.ledger
            .register_entry("DDD444", Some(fx.minute), t0(), &AlwaysOpen)
            .unwrap();

        let reports = fx.aggregator();

        assert_eq!(reports.total_vehicles().unwrap(), 3);
        assert_eq!(reports.total_income().unwrap(), 23.0);
        assert_eq!(reports.average_stay_minutes().unwrap(), 40.0);
        assert_eq!(reports.currently_parked_count().unwrap(), 1);
    }

    #[test]
    fn test_recent_transactions_most_recent_first() {
        let fx = Fixture::new();
        for (i, plate) in ["P1", "P2", "P3", "P4"].iter().enumerate() {
            fx.stay(plate, fx.minute, t0() + Duration::hours(i as i64), 10);
        }

        let recent = fx.aggregator().recent_transactions(3).unwrap();
        let plates: Vec<&str> = recent.iter().map(|t| t.plate.as_str()).collect();

        assert_eq!(plates, vec!["P4", "P3", "P2"]);
    }

    #[test]
    fn test_rate_usage_excludes_deleted_rates() {
        let fx = Fixture::new();
        fx.stay("AAA111", fx.minute, t0(), 10);
        fx.stay("BBB222", fx.minute, t0(), 10);
        let daily_tx = fx.stay("CCC333", fx.daily, t0(), 10);

        fx.catalog.remove(fx.daily).unwrap();
        let reports = fx.aggregator();

        let usage = reports.per_rate_usage().unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage.get(&fx.minute), Some(&2));
        assert!(!usage.contains_key(&fx.daily));

        // raw totals still include the dangling transaction
        assert_eq!(reports.total_vehicles().unwrap(), 3);
        assert_eq!(reports.total_income().unwrap(), 21.0);
        let stored = fx.ledger.find_by_id(daily_tx.id).unwrap().unwrap();
        assert_eq!(stored.amount, 20.0);

        let named = reports.rate_usage().unwrap();
        assert_eq!(
            named,
            vec![RateUsage {
                rate_id: fx.minute,
                rate_name: "Standard".to_string(),
                count: 2,
            }]
        );
    }

    #[test]
    fn test_summary_covers_whole_ledger() {
        let fx = Fixture::new();
        let now = t0() + Duration::days(90);
        fx.stay("OLD111", fx.minute, t0() - Duration::days(400), 10);
        fx.stay("NEW222", fx.daily, t0(), 60);
        fx.ledger
            .register_entry("PARK33", Some(fx.minute), t0(), &AlwaysOpen)
            .unwrap();

        let summary = fx.aggregator().summary(now, 1).unwrap();

        assert_eq!(summary, fx.aggregator().summary_for(ReportPeriod::All, now, 1).unwrap());
        assert_eq!(summary.total_vehicles, 2);
        assert_eq!(summary.total_income, 20.5);
        assert_eq!(summary.currently_parked, 1);
        assert_eq!(summary.recent_transactions.len(), 1);
        assert_eq!(summary.recent_transactions[0].plate, "NEW222");
    }

    #[test]
    fn test_income_sums_exact_amounts_before_rounding() {
        let fx = Fixture::new();
        let odd = fx.catalog.add(RateData::per_minute("Odd", 0.333)).unwrap().id;
        fx.stay("AAA111", odd, t0(), 1);
        fx.stay("BBB222", odd, t0(), 1);
        fx.stay("CCC333", odd, t0(), 1);

        // 3 x 0.333 = 0.999, which shows as 1.00
        assert_eq!(fx.aggregator().total_income().unwrap(), 1.0);
    }

    #[test]
    fn test_summary_for_period() {
        let fx = Fixture::new();
        let now = t0() + Duration::days(2);
        fx.stay("OLD111", fx.minute, t0() - Duration::days(40), 10);
        fx.stay("WEEK22", fx.minute, t0(), 10);
        fx.stay("TODAY3", fx.minute, now - Duration::hours(2), 30);

        let reports = fx.aggregator();

        let today = reports.summary_for(ReportPeriod::Today, now, 10).unwrap();
        assert_eq!(today.total_vehicles, 1);
        assert_eq!(today.total_income, 1.5);

        let week = reports.summary_for(ReportPeriod::ThisWeek, now, 10).unwrap();
        assert_eq!(week.total_vehicles, 2);

        let month = reports.summary_for(ReportPeriod::ThisMonth, now, 10).unwrap();
        assert_eq!(month.total_vehicles, 2);

        let all = reports.summary_for(ReportPeriod::All, now, 10).unwrap();
        assert_eq!(all.total_vehicles, 3);
        assert_eq!(all.recent_transactions[0].plate, "TODAY3");

        let custom = ReportPeriod::Custom {
            from: (t0() - Duration::days(41)).date_naive(),
            to: (t0() - Duration::days(39)).date_naive(),
        };
        let old = reports.summary_for(custom, now, 10).unwrap();
        assert_eq!(old.total_vehicles, 1);
        assert_eq!(old.recent_transactions[0].plate, "OLD111");
    }

    #[test]
    fn test_shift_report_counts_exits_inside_window() {
        let fx = Fixture::new();
        fx.stay("BEFORE", fx.minute, t0() - Duration::hours(5), 10);
        fx.stay("DURING", fx.minute, t0() + Duration::hours(1), 60);
        fx.ledger
            .register_entry("PARKED", Some(fx.minute), t0() + Duration::hours(2), &AlwaysOpen)
            .unwrap();

        let shift = Shift {
            is_open: false,
            open_time: Some(t0()),
            close_time: Some(t0() + Duration::hours(8)),
            initial_balance: 0.0,
        };
        let report = fx.aggregator().shift_report(&shift, t0() + Duration::hours(9)).unwrap();

        assert_eq!(report.vehicles, 1);
        assert_eq!(report.income, 3.0);
        assert_eq!(report.still_parked, 1);
    }

    #[test]
    fn test_shift_report_never_opened() {
        let fx = Fixture::new();
        fx.stay("AAA111", fx.minute, t0(), 10);

        let report = fx.aggregator().shift_report(&Shift::default(), t0()).unwrap();

        assert_eq!(report.vehicles, 0);
        assert_eq!(report.income, 0.0);
    }
}
