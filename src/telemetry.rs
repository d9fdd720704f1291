//! Process-level tracing setup.
//!
//! Libraries embedding this crate usually install their own subscriber; this
//! helper exists for workers and ad-hoc tools that want the standard
//! key=value telemetry lines on stderr with `RUST_LOG` control.

use tracing_subscriber::EnvFilter;

/// Install a formatted tracing subscriber.
///
/// `.env` is loaded first so `RUST_LOG` can live there. Calling this twice is
/// harmless; the second install is ignored.
pub fn init() {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
