// Parking Lot POS - Core Library
// Fee computation, transaction lifecycle, shift gating and reports

pub mod error;
pub mod storage;
pub mod config;
pub mod rates;   // Rate Catalog
pub mod fees;    // Fee Calculator
pub mod ledger;  // Transaction Ledger
pub mod shift;   // Shift Tracker
pub mod reports; // Report Aggregator
pub mod export;
pub mod lot;

// Re-export commonly used types
pub use error::{ParkingError, Result};
pub use storage::{
    MemoryStore, SqliteStore, Storage, StoreSlot,
    initialize_defaults,
    RATES_KEY, TRANSACTIONS_KEY, SHIFT_KEY,
};
pub use config::LotConfig;
pub use rates::{
    RateCatalog, RateData, RateKind, RatePolicy, RateStatus,
    default_rates, UNRESOLVED_RATE,
};
pub use fees::{compute_charge, format_parking_time};
pub use ledger::{
    PendingExit, Transaction, TransactionLedger, TransactionStatus,
    normalize_plate,
};
pub use shift::{Shift, ShiftGate, ShiftTracker};
pub use reports::{
    RateUsage, ReportAggregator, ReportPeriod, ReportSummary, ShiftReport,
};
pub use export::{export_file_name, export_rows, write_csv, ExportRow};
pub use lot::{ParkedVehicle, ParkingLot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
