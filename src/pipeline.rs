//! Request pipeline.
//!
//! Each data request passes through the same sequence: resolve and validate the cheap
//! parameters, canonicalise the field list, populate the cache entry if absent, read the
//! time-windowed rows back, decimate and encode. Population is serialised per cache key so
//! concurrent misses for the same series fetch from upstream exactly once.

use crate::app_state::AppState;
use crate::assemble;
use crate::cleanse;
use crate::decimate;
use crate::error::DecimatorError;
use crate::metrics;
use crate::models::{self, DataRequest, Format};
use crate::normalize;
use crate::store;

use bytes::Bytes;

/// Produce an encoded response for a data request.
pub async fn produce(
    state: &AppState,
    request: &DataRequest,
) -> Result<models::Response, DecimatorError> {
    // Fail on cheap parameter errors before any upstream or storage work.
    let format = Format::from_param(
        request
            .format
            .as_deref()
            .unwrap_or(Format::DEFAULT_PARAM),
    )?;
    let bounds = request.parse_bounds()?;

    let requested = request.requested_keys();
    let fields = normalize::canonicalize(&requested);
    let key = store::derive_key(&request.project, &request.source_id, &fields);

    ensure_cached(state, &key, &request.project, &request.source_id, &fields).await?;

    let bounds = adjust_time_bounds(&fields[0], bounds);
    let rows = match state.store.query_range(&key, bounds) {
        Ok(rows) => rows,
        Err(err @ DecimatorError::StorageCorrupt { .. }) => {
            // Evict the unreadable entry so a subsequent request re-fetches.
            evict(state, &key).await?;
            return Err(err);
        }
        Err(err) => return Err(err),
    };
    let source_rows = rows.len();

    let target = request.target.unwrap_or(state.args.default_target);
    let reduced = decimate::reduce(rows, target);
    let series = assemble::assemble(reduced, source_rows, &requested, &fields);

    let body = match format {
        Format::Csv => assemble::to_csv(&series),
        Format::Json => assemble::to_json(&series)?,
    };

    if !state.args.cache_files {
        evict(state, &key).await?;
    }

    Ok(models::Response::new(Bytes::from(body), format))
}

/// Populate the cache entry for a key unless a complete entry already exists.
///
/// Holds the key's lock across the existence check and the fetch, so concurrent misses for the
/// same key wait rather than duplicating the upstream request.
async fn ensure_cached(
    state: &AppState,
    key: &str,
    project: &str,
    source_id: &str,
    fields: &[String],
) -> Result<(), DecimatorError> {
    let lock = state.key_locks.get(key).await;
    let _guard = lock.lock().await;
    if state.store.exists(key)? {
        metrics::record_cache_result(true);
        return Ok(());
    }
    metrics::record_cache_result(false);
    let _task = state.resource_manager.task().await?;
    let table = {
        let _connection = state.resource_manager.upstream_connection().await?;
        state.upstream.fetch(project, source_id, fields).await?
    };
    let rows = cleanse::cleanse(fields, &table)?;
    state.store.persist(key, &rows)?;
    tracing::info!(key, rows = rows.len(), "cached series");
    Ok(())
}

/// Remove a cache entry under its key lock.
async fn evict(state: &AppState, key: &str) -> Result<(), DecimatorError> {
    let lock = state.key_locks.get(key).await;
    let _guard = lock.lock().await;
    state.store.evict(key)?;
    metrics::SERIES_CACHE_EVICTIONS.inc();
    Ok(())
}

/// Reconcile bounds given in milliseconds with stored second-precision timestamps.
///
/// Applies only when the leading field is time-like. A bound whose magnitude exceeds the
/// largest plausible second-precision epoch is taken to be milliseconds and divided by 1000.
fn adjust_time_bounds(
    leading_field: &str,
    bounds: Option<(f64, f64)>,
) -> Option<(f64, f64)> {
    if !leading_field.contains("time") {
        return bounds;
    }
    bounds.map(|(low, high)| (adjust_time_bound(low), adjust_time_bound(high)))
}

fn adjust_time_bound(value: f64) -> f64 {
    if value > 0.0 && value.log10().floor() as i32 > 9 {
        value / 1000.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::SharedAppState;
    use crate::test_utils::{self, CountingFetcher};
    use crate::upstream::RawTable;

    use std::sync::atomic::Ordering;
    use std::time::Duration;

    // A table of n rows, one second apart starting at 2017-01-01T00:00:00Z (epoch 1483228800).
    fn table(n: usize) -> RawTable {
        RawTable {
            columns: vec!["measurement_date_time".to_string(), "depth".to_string()],
            rows: (0..n)
                .map(|i| {
                    vec![
                        format!("2017-01-01T00:00:{:02}Z", i),
                        format!("{}.0", i),
                    ]
                })
                .collect(),
        }
    }

    fn state(n: usize) -> SharedAppState {
        test_utils::test_state(test_utils::test_args(), CountingFetcher::new(table(n)))
    }

    fn body_string(response: &models::Response) -> String {
        String::from_utf8(response.body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn produce_csv() {
        let state = state(10);
        let mut request = test_utils::get_test_data_request();
        request.target = Some(5);
        let response = produce(&state, &request).await.unwrap();
        assert_eq!(Format::Csv, response.format);
        let body = body_string(&response);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(6, lines.len());
        assert_eq!("Time,Depth", lines[0]);
        // First and last rows survive decimation.
        assert_eq!("1483228800,0.0", lines[1]);
        assert_eq!("1483228809,9.0", lines[5]);
    }

    #[tokio::test]
    async fn produce_json_meta() {
        let state = state(10);
        let mut request = test_utils::get_test_data_request();
        request.target = Some(5);
        request.format = Some("json".to_string());
        let response = produce(&state, &request).await.unwrap();
        assert_eq!(Format::Json, response.format);
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(10, value["meta"]["sub_size"]);
        assert_eq!(5, value["meta"]["dec_size"]);
        assert_eq!(
            serde_json::json!(["Time", "Depth"]),
            value["meta"]["columns"]
        );
        assert_eq!(5, value["data"].as_array().unwrap().len());
    }

    #[tokio::test]
    async fn fetches_once_for_repeated_requests() {
        let fetcher = CountingFetcher::new(table(10));
        let fetches = fetcher.fetches.clone();
        let state = test_utils::test_state(test_utils::test_args(), fetcher);
        let request = test_utils::get_test_data_request();
        produce(&state, &request).await.unwrap();
        produce(&state, &request).await.unwrap();
        assert_eq!(1, fetches.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fetches_once_for_concurrent_requests() {
        let mut fetcher = CountingFetcher::new(table(10));
        fetcher.delay = Some(Duration::from_millis(50));
        let fetches = fetcher.fetches.clone();
        let state = test_utils::test_state(test_utils::test_args(), fetcher);
        let request = test_utils::get_test_data_request();
        let (first, second) =
            tokio::join!(produce(&state, &request), produce(&state, &request));
        first.unwrap();
        second.unwrap();
        assert_eq!(1, fetches.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn disabled_cache_evicts_after_response() {
        let mut args = test_utils::test_args();
        args.cache_files = false;
        let fetcher = CountingFetcher::new(table(10));
        let fetches = fetcher.fetches.clone();
        let state = test_utils::test_state(args, fetcher);
        let request = test_utils::get_test_data_request();
        produce(&state, &request).await.unwrap();
        produce(&state, &request).await.unwrap();
        // Each request re-populates because the entry is evicted after the response.
        assert_eq!(2, fetches.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn sentinel_rows_never_served() {
        let mut table = table(10);
        table.rows[3][1] = "-9999.0".to_string();
        let state = test_utils::test_state(test_utils::test_args(), CountingFetcher::new(table));
        let mut request = test_utils::get_test_data_request();
        request.format = Some("json".to_string());
        let response = produce(&state, &request).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(9, value["meta"]["sub_size"]);
    }

    #[tokio::test]
    async fn bounds_window_rows() {
        let state = state(10);
        let mut request = test_utils::get_test_data_request();
        request.bounds = Some("1483228802,1483228805".to_string());
        request.format = Some("json".to_string());
        let response = produce(&state, &request).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(4, value["meta"]["sub_size"]);
    }

    #[tokio::test]
    async fn millisecond_bounds_reconciled() {
        let state = state(10);
        let mut request = test_utils::get_test_data_request();
        request.bounds = Some("1483228802000,1483228805000".to_string());
        request.format = Some("json".to_string());
        let response = produce(&state, &request).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(4, value["meta"]["sub_size"]);
    }

    #[tokio::test]
    async fn invalid_format_fails_before_fetching() {
        let fetcher = CountingFetcher::new(table(10));
        let fetches = fetcher.fetches.clone();
        let state = test_utils::test_state(test_utils::test_args(), fetcher);
        let mut request = test_utils::get_test_data_request();
        request.format = Some("yaml".to_string());
        let error = produce(&state, &request).await.unwrap_err();
        assert!(matches!(error, DecimatorError::UnsupportedFormat { .. }));
        assert_eq!(0, fetches.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn invalid_bounds_fail_before_fetching() {
        let fetcher = CountingFetcher::new(table(10));
        let fetches = fetcher.fetches.clone();
        let state = test_utils::test_state(test_utils::test_args(), fetcher);
        let mut request = test_utils::get_test_data_request();
        request.bounds = Some("1,2,3".to_string());
        let error = produce(&state, &request).await.unwrap_err();
        assert!(matches!(error, DecimatorError::InvalidBounds { .. }));
        assert_eq!(0, fetches.load(Ordering::SeqCst));
    }

    #[test]
    fn adjust_time_bounds_units() {
        // Second-precision bounds pass through.
        assert_eq!(
            Some((1483228800.0, 1483228900.0)),
            adjust_time_bounds("measurement_date_time", Some((1483228800.0, 1483228900.0)))
        );
        // Millisecond-precision bounds are scaled down.
        assert_eq!(
            Some((1483228800.0, 1483228900.0)),
            adjust_time_bounds(
                "measurement_date_time",
                Some((1483228800000.0, 1483228900000.0))
            )
        );
        // Non-time leading fields are never rescaled.
        assert_eq!(
            Some((1483228800000.0, 1483228900000.0)),
            adjust_time_bounds("depth", Some((1483228800000.0, 1483228900000.0)))
        );
        // Non-positive bounds pass through.
        assert_eq!(
            Some((-10.0, 0.0)),
            adjust_time_bounds("measurement_date_time", Some((-10.0, 0.0)))
        );
        assert_eq!(None, adjust_time_bounds("measurement_date_time", None));
    }
}
