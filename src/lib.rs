//! This crate provides a time series decimation server. It serves decimated views of large
//! time-ordered measurement series identified by a (project, source, field set) triple. On the
//! first request for a given triple the raw series is fetched from an upstream Solr-style search
//! endpoint, cleansed and persisted locally; every request then answers a time-windowed query
//! against the cached series and reduces it to a target point count with a shape-preserving
//! bucketed algorithm before encoding the result as CSV or JSON.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team. Axum performs well in [various](https://github.com/programatik29/rust-web-benchmarks/blob/master/result/hello-world.md) [benchmarks](https://web-frameworks-benchmark.netlify.app/result?l=rust)
//!   and is built on top of various popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of request and response data.
//! * [Sled](sled) provides the embedded, range-queryable store backing the series cache.
//! * [Reqwest](reqwest) is used to fetch raw series from the upstream search endpoint.

pub mod app;
pub mod app_state;
pub mod assemble;
pub mod cleanse;
pub mod cli;
pub mod decimate;
pub mod error;
pub mod keylock;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod resource_manager;
pub mod server;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod upstream;
pub mod validated_query;
