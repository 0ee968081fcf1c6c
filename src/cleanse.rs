//! Ingest cleansing pipeline.
//!
//! Raw upstream rows pass through three steps, in order: rows with a null or empty value in any
//! projected field are dropped; textual timestamps in time fields are parsed into integer
//! seconds since epoch, truncating sub-second precision; rows containing the sentinel
//! missing-value code in any field are dropped.

use crate::error::DecimatorError;
use crate::models::{DValue, Row};
use crate::upstream::RawTable;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Numeric code denoting "no data"; rows carrying it in any field are dropped at ingest.
pub const SENTINEL: f64 = -9999.0;

/// Cleanse a raw upstream table into typed rows in the projected field order.
///
/// A missing projected column is a malformed response; an unparsable cell only drops the row it
/// appears in.
pub fn cleanse(fields: &[String], table: &RawTable) -> Result<Vec<Row>, DecimatorError> {
    // Map each projected field to its column in the upstream response.
    let mut indices = Vec::with_capacity(fields.len());
    for field in fields {
        let index = table
            .columns
            .iter()
            .position(|column| column == field)
            .ok_or_else(|| DecimatorError::UpstreamMalformed {
                reason: format!("column {} missing from upstream response", field),
            })?;
        indices.push(index);
    }

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut dropped = 0_usize;
    'rows: for raw in &table.rows {
        let mut row: Row = Vec::with_capacity(fields.len());
        for (field, &index) in fields.iter().zip(&indices) {
            let cell = match raw.get(index) {
                Some(cell) if !cell.is_empty() => cell,
                _ => {
                    dropped += 1;
                    continue 'rows;
                }
            };
            let value = if field.contains("time") {
                match parse_timestamp(cell) {
                    Some(seconds) => DValue::from(seconds),
                    None => {
                        dropped += 1;
                        continue 'rows;
                    }
                }
            } else {
                match cell.parse::<f64>().ok().and_then(DValue::from_f64) {
                    Some(value) => value,
                    None => {
                        dropped += 1;
                        continue 'rows;
                    }
                }
            };
            row.push(value);
        }
        if row.iter().any(|value| value.as_f64() == Some(SENTINEL)) {
            dropped += 1;
            continue;
        }
        rows.push(row);
    }
    if dropped > 0 {
        tracing::debug!(dropped, "dropped rows during cleansing");
    }
    Ok(rows)
}

/// Parse a textual timestamp into whole seconds since epoch.
///
/// RFC 3339 is tried first; bare date-times are taken as UTC. Fractional seconds are truncated.
fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(parsed) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(parsed.unix_timestamp());
    }
    let head = text.split('.').next().unwrap_or(text);
    let formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    ];
    for format in formats {
        if let Ok(parsed) = PrimitiveDateTime::parse(head, format) {
            return Some(parsed.assume_utc().unix_timestamp());
        }
    }
    None
}
