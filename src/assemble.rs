//! Response assembly and encoding.
//!
//! Decimated rows are paired with output header labels and encoded as CSV or JSON. Header
//! labels come from the caller's original spelling where one was supplied; canonical field
//! names fill in for columns the caller never named, such as an implicitly appended time field.

use crate::error::DecimatorError;
use crate::models::{DecimatedSeries, Row};

use serde::Serialize;

/// Pair decimated rows with their output header labels.
///
/// Labels are taken positionally from the caller's requested names; any trailing fields the
/// canonical list added are labelled by their canonical name.
pub fn assemble(
    rows: Vec<Row>,
    source_rows: usize,
    requested: &[String],
    fields: &[String],
) -> DecimatedSeries {
    let columns = if requested.is_empty() {
        fields.to_vec()
    } else {
        let labelled = requested.len().min(fields.len());
        requested[..labelled]
            .iter()
            .chain(fields[labelled..].iter())
            .cloned()
            .collect()
    };
    DecimatedSeries {
        rows,
        source_rows,
        columns,
    }
}

/// Encode a series as CSV: one header line, then one line per row.
pub fn to_csv(series: &DecimatedSeries) -> String {
    let mut out = String::new();
    out.push_str(&series.columns.join(","));
    out.push('\n');
    for row in &series.rows {
        let cells: Vec<String> = row.iter().map(|value| value.to_string()).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// JSON envelope wrapping the rows with a metadata block.
#[derive(Serialize)]
struct Envelope<'a> {
    data: &'a [Row],
    meta: Meta<'a>,
}

/// Metadata block of the JSON envelope.
#[derive(Serialize)]
struct Meta<'a> {
    /// Row count the bounded query produced before decimation
    sub_size: usize,
    /// Row count after decimation
    dec_size: usize,
    /// Output header labels
    columns: &'a [String],
}

/// Encode a series as a JSON envelope.
pub fn to_json(series: &DecimatedSeries) -> Result<String, DecimatorError> {
    let envelope = Envelope {
        data: &series.rows,
        meta: Meta {
            sub_size: series.source_rows,
            dec_size: series.rows.len(),
            columns: &series.columns,
        },
    };
    Ok(serde_json::to_string(&envelope)?)
}
