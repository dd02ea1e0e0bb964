use tracing_subscriber::EnvFilter;

use crate::output::OutputMode;

/// Install the stderr subscriber. `RUST_LOG` overrides the level picked from flags.
pub fn init(mode: &OutputMode) {
    let level = if mode.debug {
        "debug"
    } else if mode.verbose {
        "info"
    } else if mode.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatrelay={level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
