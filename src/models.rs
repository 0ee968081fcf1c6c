//! Data types and associated functions and methods

use crate::error::DecimatorError;

use bytes::Bytes;
use serde::Deserialize;
use strum_macros::Display;
use validator::Validate;

/// A single value in a row.
///
/// This is an alias of the Number type from serde_json, an enum over i64, u64 and f64 with the
/// additional constraint that floating point numbers must be finite. Integer timestamps and
/// floating point measurements are both represented without loss.
pub type DValue = serde_json::Number;

/// One row of a series: an ordered tuple of values, one per field in the entry's field list.
pub type Row = Vec<DValue>;

/// Supported output encodings
#[derive(Clone, Copy, Debug, Display, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    /// Flat row-oriented table
    Csv,
    /// Structured envelope carrying rows plus a metadata block
    Json,
}

impl Format {
    /// Format applied when a request does not specify one.
    pub const DEFAULT_PARAM: &'static str = "csv";

    /// Resolve a caller-supplied format parameter.
    ///
    /// Matching is by substring, so MIME types such as `text/csv` are accepted alongside the
    /// bare names.
    pub fn from_param(param: &str) -> Result<Self, DecimatorError> {
        if param.contains("csv") {
            Ok(Format::Csv)
        } else if param.contains("json") {
            Ok(Format::Json)
        } else {
            Err(DecimatorError::UnsupportedFormat {
                format: param.to_string(),
            })
        }
    }

    /// Returns the MIME type of the encoding.
    pub fn mime(self) -> mime::Mime {
        match self {
            Format::Csv => mime::TEXT_CSV,
            Format::Json => mime::APPLICATION_JSON,
        }
    }
}

/// Request data for series queries
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct DataRequest {
    /// Comma-separated list of requested field names
    #[validate(length(min = 1, message = "keys must not be empty"))]
    pub keys: String,
    /// Project the series belongs to
    #[validate(length(min = 1, message = "project must not be empty"))]
    pub project: String,
    /// Identifier of the measurement source within the project
    #[validate(length(min = 1, message = "source_id must not be empty"))]
    pub source_id: String,
    /// Optional comma-separated (low, high) pair bounding the leading field
    pub bounds: Option<String>,
    /// Target point count; -1 disables decimation
    pub target: Option<i64>,
    /// Output format name
    pub format: Option<String>,
}

impl DataRequest {
    /// Return the requested field names as supplied by the caller, split on commas.
    ///
    /// These are the labels the response header carries; canonicalisation happens separately.
    pub fn requested_keys(&self) -> Vec<String> {
        self.keys
            .split(',')
            .filter(|key| !key.is_empty())
            .map(|key| key.to_string())
            .collect()
    }

    /// Parse the optional bounds parameter into a (low, high) pair.
    pub fn parse_bounds(&self) -> Result<Option<(f64, f64)>, DecimatorError> {
        let Some(bounds) = &self.bounds else {
            return Ok(None);
        };
        if bounds.is_empty() {
            return Ok(None);
        }
        let parts: Vec<&str> = bounds.split(',').collect();
        if let [low, high] = parts[..] {
            if let (Ok(low), Ok(high)) = (low.parse::<f64>(), high.parse::<f64>()) {
                return Ok(Some((low, high)));
            }
        }
        Err(DecimatorError::InvalidBounds {
            bounds: bounds.clone(),
        })
    }
}

/// A decimated series ready for encoding.
#[derive(Debug, PartialEq)]
pub struct DecimatedSeries {
    /// Ordered rows remaining after decimation
    pub rows: Vec<Row>,
    /// Number of rows the bounded query produced before decimation
    pub source_rows: usize,
    /// Ordered output header labels
    pub columns: Vec<String>,
}

/// Response containing an encoded series.
#[derive(Debug)]
pub struct Response {
    /// Encoded response body
    pub body: Bytes,
    /// Encoding of the body
    pub format: Format,
}

impl Response {
    /// Return a Response object
    pub fn new(body: Bytes, format: Format) -> Response {
        Response { body, format }
    }
}
