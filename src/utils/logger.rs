// Logger initialization for the `yop` binary. The library itself only emits
// `tracing` events and never installs a subscriber.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "yop_cloud_sdk=info,yop=info";

/// Install a global `tracing` subscriber writing to stderr.
///
/// `verbose` raises the crate's level to debug. Calling this twice is a no-op.
pub fn init_logger(verbose: bool) {
    let fallback = if verbose {
        "yop_cloud_sdk=debug,yop=debug"
    } else {
        DEFAULT_LOG_FILTER
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
