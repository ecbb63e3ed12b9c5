//! tracing subscriber setup shared by the binaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingSettings;

/// Install a stderr subscriber. `RUST_LOG` wins over `logging.level`.
/// Calling it twice is harmless; the second call is ignored.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,medrag={0},medrag_core={0},medrag_hybrid={0},medrag_text={0},medrag_vector={0},medrag_embed={0}", settings.level)));
    let layer = fmt::layer().with_target(true).with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
