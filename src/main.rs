//! This file defines the decimator binary entry point.

use decimator::app;
use decimator::app_state::AppState;
use decimator::cli;
use decimator::metrics;
use decimator::server;
use decimator::store::SledSeriesStore;
use decimator::tracing;
use decimator::upstream::SolrFetcher;

use std::sync::Arc;

use expanduser::expanduser;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    println!("{:?}", args);
    tracing::init_tracing();
    metrics::register_metrics();
    let cache_path = expanduser(&args.cache_path)
        .expect("Failed to expand ~ to user name. Please provide an absolute path instead.");
    let store = SledSeriesStore::open(&cache_path).expect("failed to open series store");
    let upstream = SolrFetcher::new(args.upstream_url.clone());
    let state = Arc::new(AppState::new(&args, Box::new(store), Box::new(upstream)));
    let app = app::router(state);
    server::serve(&args, app).await;
}
