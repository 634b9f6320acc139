use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Pipeline events log under short targets, not the crate path.
const DEFAULT_FILTER: &str =
    "fanout=info,notify=info,seen=info,limiter=info,source=info,api=info,trending_relay=info,warn";

/// Install the global subscriber: `RUST_LOG` filter (default: `info` for the
/// pipeline targets, `warn` for everything else), compact lines, or JSON when
/// `LOG_FORMAT=json`.
///
/// Later calls are no-ops, and so is a subscriber installed by the host runtime.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
