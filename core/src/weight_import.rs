use std::io::{Read, Write};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{NewWeightEntry, RawWeightSample, WeightEntry};

/// Header written on export. The first line of an import is always skipped.
pub const CSV_HEADER: [&str; 2] = ["Date", "Weight (kg)"];

const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"];
const EXPORT_DATE_FORMAT: &str = "%d-%m-%Y";

/// Parse a sample date in `DD-MM-YYYY`, `DD/MM/YYYY` or ISO form.
#[must_use]
pub fn parse_sample_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Accept full timestamps like 2025-01-01T08:00:00Z by keeping the date part.
    let s = s.split_once('T').map_or(s, |(date, _)| date);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

#[must_use]
pub fn parse_sample_weight(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Validate one raw sample. `None` means the row should be skipped.
#[must_use]
pub fn parse_sample(raw: &RawWeightSample) -> Option<NewWeightEntry> {
    let date = parse_sample_date(raw.date.as_deref()?)?;
    let weight = parse_sample_weight(raw.weight.as_ref()?)?;
    NewWeightEntry::new(date, weight).ok()
}

/// Read `Date,Weight` rows from any reader.
///
/// Rows are returned raw so the caller can count and report skips;
/// blank lines are dropped here. A field that is not valid UTF-8 comes
/// back as `None`, which makes the row malformed rather than the file.
pub fn parse_weight_csv<R: Read>(reader: R) -> Result<Vec<RawWeightSample>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, result) in rdr.byte_records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", i + 2))?;
        if record.iter().all(<[u8]>::is_empty) {
            continue;
        }
        let field = |idx: usize| {
            record
                .get(idx)
                .and_then(|raw| std::str::from_utf8(raw).ok())
                .map(ToString::to_string)
        };
        rows.push(RawWeightSample {
            date: field(0),
            weight: field(1).map(Value::String),
        });
    }
    Ok(rows)
}

/// Write entries as `Date,Weight (kg)` with `DD-MM-YYYY` dates.
pub fn write_weight_csv<W: Write>(writer: W, entries: &[WeightEntry]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for entry in entries {
        wtr.write_record([
            entry.date.format(EXPORT_DATE_FORMAT).to_string(),
            entry.weight_kg.to_string(),
        ])?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}
