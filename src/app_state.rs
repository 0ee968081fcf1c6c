//! Shared application state.

use crate::cli::CommandLineArgs;
use crate::keylock::KeyLocks;
use crate::resource_manager::ResourceManager;
use crate::store::SeriesStore;
use crate::upstream::UpstreamFetcher;

use std::sync::Arc;

/// State shared by all request handlers.
pub struct AppState {
    /// Command line arguments
    pub args: CommandLineArgs,
    /// Store holding cached series
    pub store: Box<dyn SeriesStore>,
    /// Fetcher supplying raw series on cache misses
    pub upstream: Box<dyn UpstreamFetcher>,
    /// Per-cache-key locks serialising population and eviction
    pub key_locks: KeyLocks,
    /// Limits on concurrent resource use
    pub resource_manager: ResourceManager,
}

impl AppState {
    /// Return a new AppState object.
    pub fn new(
        args: &CommandLineArgs,
        store: Box<dyn SeriesStore>,
        upstream: Box<dyn UpstreamFetcher>,
    ) -> Self {
        // Leave one core free for the runtime when no explicit limit is given.
        let task_limit = args
            .task_limit
            .or_else(|| Some(std::cmp::max(1, num_cpus::get() - 1)));
        Self {
            args: args.clone(),
            store,
            upstream,
            key_locks: KeyLocks::new(),
            resource_manager: ResourceManager::new(args.upstream_connection_limit, task_limit),
        }
    }
}

/// Reference-counted state handle passed to handlers.
pub type SharedAppState = Arc<AppState>;
