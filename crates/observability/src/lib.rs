//! Tracing and logging (shared setup).

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    logging::init(logging::LogFormat::from_env());
}

/// Subscriber configuration (filters, output format).
pub mod logging;
