use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT_LOGGING: Once = Once::new();

/// Installs the global subscriber. Safe to call more than once.
pub fn init() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("petsafety_sync=debug,offline=debug,network=debug,info")
        });

        let result = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init();

        if result.is_ok() {
            tracing::info!(target: "petsafety_sync", "logging initialized");
        }
    });
}
