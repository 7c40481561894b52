//! A minimal three-level logging sink: `info`/`warn`/`error`, each
//! taking an action verb and a message. No color, no progress bars,
//! no span timing — those belong to the external CLI collaborator.

/// Install the global subscriber. Safe to call once per process; later
/// calls are ignored.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .try_init();
}

/// Log an action at `info`, e.g. `action("Compiling", "src/main.cpp")`.
pub fn action(verb: &str, message: impl std::fmt::Display) {
    tracing::info!("{verb} {message}");
}

pub fn warn(verb: &str, message: impl std::fmt::Display) {
    tracing::warn!("{verb} {message}");
}

pub fn error(verb: &str, message: impl std::fmt::Display) {
    tracing::error!("{verb} {message}");
}
