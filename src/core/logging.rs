//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable, e.g.
/// `RUST_LOG=skytint=debug` to see per-render cache statistics.
///
/// # Example
/// ```
/// skytint::core::logging::init();
/// log::info!("Sky renderer started");
/// ```
pub fn init() {
    // try_init so repeated calls from tests and doctests don't panic
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();
}
