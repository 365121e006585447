// 🏷️ Rate Catalog - pricing policies as data
//
// A rate id is identity: it never changes and is never handed out twice.
// Everything else (name, kind, prices, status) is a value replaced whole by update.
//
// Transactions keep the rate id chosen at entry, so deleting a policy leaves
// history pointing at nothing. Readers resolve that to "N/A" instead of failing.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ParkingError, Result};
use crate::storage::{IdSequence, Storage, StoreSlot, RATES_KEY, RATE_SEQUENCE_KEY};

/// Label shown wherever a rate id no longer resolves
pub const UNRESOLVED_RATE: &str = "N/A";

// ============================================================================
// RATE KIND / STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateKind {
    /// Billed per elapsed minute
    #[serde(rename = "minute")]
    PerMinute,

    /// Billed per started day (1440 minutes)
    #[serde(rename = "daily")]
    PerDay,
}

impl RateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateKind::PerMinute => "Per minute",
            RateKind::PerDay => "Daily rate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateStatus {
    Active,
    Inactive,
}

// ============================================================================
// RATE POLICY
// ============================================================================

/// Every field of a policy except its id; the unit of add and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateData {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: RateKind,

    #[serde(default)]
    pub cost_per_minute: f64,

    #[serde(default)]
    pub daily_rate: f64,

    pub status: RateStatus,
}

impl RateData {
    pub fn per_minute(name: &str, cost_per_minute: f64) -> Self {
        RateData {
            name: name.to_string(),
            kind: RateKind::PerMinute,
            cost_per_minute,
            daily_rate: 0.0,
            status: RateStatus::Active,
        }
    }

    pub fn per_day(name: &str, daily_rate: f64) -> Self {
        RateData {
            name: name.to_string(),
            kind: RateKind::PerDay,
            cost_per_minute: 0.0,
            daily_rate,
            status: RateStatus::Active,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.status = RateStatus::Inactive;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ParkingError::validation("rate name is required"));
        }

        for (field, value) in [
            ("cost per minute", self.cost_per_minute),
            ("daily rate", self.daily_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParkingError::validation(format!(
                    "{} must be a non-negative amount",
                    field
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePolicy {
    pub id: i64,
    pub name: String,

    #[serde(rename = "type")]
    pub kind: RateKind,

    #[serde(default)]
    pub cost_per_minute: f64,

    #[serde(default)]
    pub daily_rate: f64,

    pub status: RateStatus,
}

impl RatePolicy {
    pub fn from_data(id: i64, data: RateData) -> Self {
        RatePolicy {
            id,
            name: data.name.trim().to_string(),
            kind: data.kind,
            cost_per_minute: data.cost_per_minute,
            daily_rate: data.daily_rate,
            status: data.status,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RateStatus::Active
    }

    /// Price line for management views, e.g. "$0.05 per minute"
    pub fn describe(&self) -> String {
        match self.kind {
            RateKind::PerMinute => format!("${:.2} per minute", self.cost_per_minute),
            RateKind::PerDay => format!("${:.2} per day", self.daily_rate),
        }
    }
}

/// First-run catalog: a per-minute standard rate and a daily rate
pub fn default_rates() -> Vec<RateData> {
    vec![
        RateData::per_minute("Standard Rate", 0.05),
        RateData::per_day("Daily Rate", 20.0),
    ]
}

/// Resolve a rate id to its name, or "N/A" when the policy was deleted
pub fn rate_name_or_unresolved(rates: &[RatePolicy], rate_id: i64) -> String {
    rates
        .iter()
        .find(|r| r.id == rate_id)
        .map(|r| r.name.clone())
        .unwrap_or_else(|| UNRESOLVED_RATE.to_string())
}

// ============================================================================
// RATE CATALOG
// ============================================================================

pub struct RateCatalog {
    slot: StoreSlot,
    ids: IdSequence,
}

impl RateCatalog {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        RateCatalog {
            slot: StoreSlot::new(store.clone(), RATES_KEY),
            ids: IdSequence::new(StoreSlot::new(store, RATE_SEQUENCE_KEY)),
        }
    }

    fn load(&self) -> Result<Vec<RatePolicy>> {
        Ok(self.slot.load_or_default()?)
    }

    fn save(&self, rates: &[RatePolicy]) -> Result<()> {
        Ok(self.slot.save(&rates)?)
    }

    /// Create a policy with a fresh id and append it
    pub fn add(&self, data: RateData) -> Result<RatePolicy> {
        data.validate()?;

        let mut rates = self.load()?;
        let highest = rates.iter().map(|r| r.id).max().unwrap_or(0);
        let id = self.ids.next(Utc::now().timestamp_millis(), highest)?;
        let rate = RatePolicy::from_data(id, data);

        rates.push(rate.clone());
        self.save(&rates)?;

        tracing::info!(rate_id = rate.id, name = %rate.name, "rate policy created");
        Ok(rate)
    }

    /// Replace every field except the id
    pub fn update(&self, id: i64, data: RateData) -> Result<RatePolicy> {
        data.validate()?;

        let mut rates = self.load()?;
        let existing = rates
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| ParkingError::not_found("rate", id))?;

        *existing = RatePolicy::from_data(id, data);
        let updated = existing.clone();
        self.save(&rates)?;

        tracing::info!(rate_id = id, name = %updated.name, "rate policy updated");
        Ok(updated)
    }

    /// Remove a policy. Absent ids succeed; transactions may keep dangling references.
    pub fn remove(&self, id: i64) -> Result<()> {
        let mut rates = self.load()?;
        let before = rates.len();
        rates.retain(|r| r.id != id);

        if rates.len() == before {
            tracing::debug!(rate_id = id, "rate policy already absent");
            return Ok(());
        }

        self.save(&rates)?;
        tracing::info!(rate_id = id, "rate policy removed");

        if !rates.iter().any(|r| r.is_active()) {
            tracing::warn!("no active rate policy left; new entries cannot select a rate");
        }

        Ok(())
    }

    /// Policies selectable for new entries, insertion order
    pub fn list_active(&self) -> Result<Vec<RatePolicy>> {
        Ok(self.load()?.into_iter().filter(|r| r.is_active()).collect())
    }

    pub fn list_all(&self) -> Result<Vec<RatePolicy>> {
        self.load()
    }

    /// Missing ids are normal (deleted policies), so absence is Ok(None)
    pub fn find_by_id(&self, id: i64) -> Result<Option<RatePolicy>> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn empty_catalog() -> RateCatalog {
        RateCatalog::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_add_assigns_unique_ids_in_order() {
        let catalog = empty_catalog();

        let a = catalog.add(RateData::per_minute("Standard", 0.05)).unwrap();
        let b = catalog.add(RateData::per_day("Daily", 20.0)).unwrap();
        let c = catalog.add(RateData::per_minute("Night", 0.02)).unwrap();

        assert!(a.id < b.id && b.id < c.id);

        let names: Vec<String> = catalog.list_all().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Standard", "Daily", "Night"]);
    }

    #[test]
    fn test_add_rejects_empty_name() {
        let catalog = empty_catalog();

        let result = catalog.add(RateData::per_minute("   ", 0.05));

        assert!(matches!(result, Err(ParkingError::Validation(_))));
        assert!(catalog.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_add_rejects_negative_price() {
        let catalog = empty_catalog();

        let result = catalog.add(RateData::per_day("Broken", -1.0));

        assert!(matches!(result, Err(ParkingError::Validation(_))));
    }

    #[test]
    fn test_update_replaces_all_fields_but_id() {
        let catalog = empty_catalog();
        let rate = catalog.add(RateData::per_minute("Standard", 0.05)).unwrap();

        let updated = catalog
            .update(rate.id, RateData::per_day("Flat", 15.0).inactive())
            .unwrap();

        assert_eq!(updated.id, rate.id);
        assert_eq!(updated.name, "Flat");
        assert_eq!(updated.kind, RateKind::PerDay);
        assert_eq!(updated.cost_per_minute, 0.0);
        assert_eq!(updated.daily_rate, 15.0);
        assert_eq!(updated.status, RateStatus::Inactive);
        assert_eq!(catalog.find_by_id(rate.id).unwrap(), Some(updated));
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let catalog = empty_catalog();

        let result = catalog.update(999, RateData::per_minute("Ghost", 0.1));

        assert!(matches!(result, Err(ParkingError::NotFound { entity: "rate", .. })));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let catalog = empty_catalog();
        let rate = catalog.add(RateData::per_minute("Standard", 0.05)).unwrap();

        catalog.remove(rate.id).unwrap();
        catalog.remove(rate.id).unwrap();

        assert!(catalog.find_by_id(rate.id).unwrap().is_none());
    }

    #[test]
    fn test_list_active_hides_inactive() {
        let catalog = empty_catalog();
        catalog.add(RateData::per_minute("Standard", 0.05)).unwrap();
        catalog.add(RateData::per_day("Retired", 10.0).inactive()).unwrap();
        catalog.add(RateData::per_day("Daily", 20.0)).unwrap();

        let active: Vec<String> = catalog.list_active().unwrap().into_iter().map(|r| r.name).collect();

        assert_eq!(active, vec!["Standard", "Daily"]);
        assert_eq!(catalog.list_all().unwrap().len(), 3);
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let catalog = empty_catalog();
        let first = catalog.add(RateData::per_minute("A", 0.05)).unwrap();
        let second = catalog.add(RateData::per_minute("B", 0.05)).unwrap();
        catalog.remove(second.id).unwrap();

        let third = catalog.add(RateData::per_minute("C", 0.05)).unwrap();

        assert_ne!(third.id, first.id);
        assert!(third.id > second.id);
    }

    #[test]
    fn test_rate_name_or_unresolved() {
        let rates = vec![RatePolicy::from_data(1, RateData::per_minute("Standard", 0.05))];

        assert_eq!(rate_name_or_unresolved(&rates, 1), "Standard");
        assert_eq!(rate_name_or_unresolved(&rates, 7), "N/A");
    }

    #[test]
    fn test_describe() {
        let minute = RatePolicy::from_data(1, RateData::per_minute("Standard", 0.05));
        let daily = RatePolicy::from_data(2, RateData::per_day("Daily", 20.0));

        assert_eq!(minute.describe(), "$0.05 per minute");
        assert_eq!(daily.describe(), "$20.00 per day");
    }

    #[test]
    fn test_persisted_shape_matches_schema() {
        let rate = RatePolicy::from_data(1, RateData::per_minute("Standard", 0.05));
        let json = serde_json::to_value(&rate).unwrap();

        assert_eq!(json["type"], "minute");
        assert_eq!(json["costPerMinute"], 0.05);
        assert_eq!(json["dailyRate"], 0.0);
        assert_eq!(json["status"], "active");
    }
}
