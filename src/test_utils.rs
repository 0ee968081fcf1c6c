//! Utilities for use in test cases.

use crate::app_state::{AppState, SharedAppState};
use crate::cli::CommandLineArgs;
use crate::error::DecimatorError;
use crate::models::{DValue, DataRequest, Row};
use crate::store::SledSeriesStore;
use crate::upstream::{RawTable, UpstreamFetcher};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

/// Return a row with an integer leading value and one floating point measurement.
pub(crate) fn row(t: i64, v: f64) -> Row {
    vec![DValue::from(t), DValue::from_f64(v).unwrap()]
}

/// Return `n` two-field rows sorted ascending on the leading field.
pub(crate) fn sample_rows(n: usize) -> Vec<Row> {
    (0..n).map(|i| row(i as i64, i as f64 * 1.5)).collect()
}

/// Return a raw upstream table from string slices.
pub(crate) fn raw_table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable {
        columns: columns.iter().map(|column| column.to_string()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    }
}

/// Return a valid DataRequest with optional parameters unset.
pub(crate) fn get_test_data_request() -> DataRequest {
    DataRequest {
        keys: "Time,Depth".to_string(),
        project: "P1".to_string(),
        source_id: "S1".to_string(),
        bounds: None,
        target: None,
        format: None,
    }
}

/// Return command line arguments with default values.
pub(crate) fn test_args() -> CommandLineArgs {
    CommandLineArgs {
        host: "0.0.0.0".to_string(),
        port: 8080,
        https: false,
        cert_file: "".to_string(),
        key_file: "".to_string(),
        graceful_shutdown_timeout: 60,
        upstream_url: Url::parse("http://localhost:8983/solr/").unwrap(),
        cache_path: "".to_string(),
        cache_files: true,
        default_target: 20000,
        upstream_connection_limit: None,
        task_limit: None,
    }
}

/// An upstream fetcher serving a fixed table, counting invocations.
pub(crate) struct CountingFetcher {
    pub table: RawTable,
    pub fetches: Arc<AtomicUsize>,
    pub delay: Option<Duration>,
}

impl CountingFetcher {
    pub(crate) fn new(table: RawTable) -> Self {
        Self {
            table,
            fetches: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }
}

#[async_trait]
impl UpstreamFetcher for CountingFetcher {
    async fn fetch(
        &self,
        _project: &str,
        _source_id: &str,
        _fields: &[String],
    ) -> Result<RawTable, DecimatorError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.table.clone())
    }
}

/// Return shared state backed by a temporary store and the given fetcher.
pub(crate) fn test_state(args: CommandLineArgs, fetcher: CountingFetcher) -> SharedAppState {
    Arc::new(AppState::new(
        &args,
        Box::new(SledSeriesStore::temporary()),
        Box::new(fetcher),
    ))
}
