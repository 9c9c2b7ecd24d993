//! Tracing setup for binaries and tests embedding the control core.
//!
//! The decision functions emit structured events through `tracing`; this is
//! the one place a subscriber gets installed. Library code never installs one
//! on its own.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG` when set, defaulting to `info`. With
/// `json` set, events are emitted as JSON lines for log collectors.
/// Installing twice is a no-op.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // A subscriber may already be installed by the embedding application.
    drop(result);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing(false);
        init_tracing(true);
        tracing::info!("subscriber installed");
    }
}
