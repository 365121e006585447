// 📤 Export - completed transactions as tabular rows
//
// `export_rows` is the projection; `write_csv` serializes it to any writer.
// Where the file goes is the caller's business.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::io::Write;

use crate::fees::elapsed_minutes;
use crate::ledger::Transaction;
use crate::rates::{rate_name_or_unresolved, RatePolicy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Plate")]
    pub plate: String,

    #[serde(rename = "Entry Date")]
    pub entry_date: String,

    #[serde(rename = "Entry Time")]
    pub entry_time: String,

    #[serde(rename = "Exit Date")]
    pub exit_date: String,

    #[serde(rename = "Exit Time")]
    pub exit_time: String,

    #[serde(rename = "Parked Time (min)")]
    pub elapsed_minutes: i64,

    #[serde(rename = "Rate")]
    pub rate_name: String,

    /// Fixed two decimals
    #[serde(rename = "Amount")]
    pub amount: String,
}

fn date_label(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y").to_string()
}

fn time_label(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

/// One row per completed transaction, ledger order. Parked ones are skipped.
pub fn export_rows(transactions: &[Transaction], rates: &[RatePolicy]) -> Vec<ExportRow> {
    transactions
        .iter()
        .filter(|t| t.is_completed())
        .filter_map(|t| t.exit_time.map(|exit| (t, exit)))
        .map(|(t, exit)| ExportRow {
            plate: t.plate.clone(),
            entry_date: date_label(t.entry_time),
            entry_time: time_label(t.entry_time),
            exit_date: date_label(exit),
            exit_time: time_label(exit),
            elapsed_minutes: elapsed_minutes(t.entry_time, exit),
            rate_name: rate_name_or_unresolved(rates, t.rate_id),
            amount: format!("{:.2}", t.amount),
        })
        .collect()
}

/// Write rows as CSV with a header line, every field quoted. Returns rows written.
pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(writer);

    if rows.is_empty() {
        wtr.write_record([
            "Plate",
            "Entry Date",
            "Entry Time",
            "Exit Date",
            "Exit Time",
            "Parked Time (min)",
            "Rate",
            "Amount",
        ])?;
    }

    for row in rows {
        wtr.serialize(row).context("Failed to write export row")?;
    }

    wtr.flush().context("Failed to flush CSV export")?;
    Ok(rows.len())
}

/// e.g. `parking_report_2025-03-01.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("parking_report_{}.csv", date.format("%Y-%m-%d"))
}
