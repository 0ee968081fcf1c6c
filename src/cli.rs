//! Command Line Interface (CLI) arguments.

use clap::Parser;
use url::Url;

/// Decimator command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "DECIMATOR_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "DECIMATOR_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "DECIMATOR_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/decimator/certs/cert.pem",
        env = "DECIMATOR_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/decimator/certs/key.pem",
        env = "DECIMATOR_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for operations to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "DECIMATOR_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Base URL of the upstream Solr search endpoint supplying raw series
    #[arg(
        long,
        default_value = "https://oiip.jpl.nasa.gov/solr/",
        env = "DECIMATOR_UPSTREAM_URL"
    )]
    pub upstream_url: Url,
    /// Directory in which cached series are persisted
    #[arg(
        long,
        default_value = "~/.cache/decimator",
        env = "DECIMATOR_CACHE_PATH"
    )]
    pub cache_path: String,
    /// Whether cached series are retained between requests. When false every cache entry is
    /// evicted immediately after the response that populated it has been produced.
    #[arg(
        long,
        default_value_t = true,
        env = "DECIMATOR_CACHE_FILES",
        action = clap::ArgAction::Set
    )]
    pub cache_files: bool,
    /// Default decimation target point count applied when a request does not specify one
    #[arg(long, default_value_t = 20000, env = "DECIMATOR_DEFAULT_TARGET")]
    pub default_target: i64,
    /// Optional limit on the number of concurrent upstream connections
    #[arg(long, env = "DECIMATOR_UPSTREAM_CONNECTION_LIMIT")]
    pub upstream_connection_limit: Option<usize>,
    /// Optional limit on the number of concurrently executing fetch tasks
    #[arg(long, env = "DECIMATOR_TASK_LIMIT")]
    pub task_limit: Option<usize>,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
