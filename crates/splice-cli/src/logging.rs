use std::env;
use std::io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Picks the filter directive: flag, then `RUST_LOG`, then config, then `warn`.
pub fn filter_directive(flag: Option<&str>, env_value: Option<String>, configured: Option<&str>) -> String {
    flag.map(str::to_string)
        .or(env_value.filter(|value| !value.trim().is_empty()))
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Installs the global subscriber. Events go to stderr so stdout stays JSON.
pub fn init(flag: Option<&str>, configured: Option<&str>) {
    let directive = filter_directive(flag, env::var("RUST_LOG").ok(), configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .try_init();
}
