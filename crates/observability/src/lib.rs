//! Process-wide logging setup shared by the engine's binaries.

/// Initialize tracing with the format chosen by `REMANEJAMENTO_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init_with(tracing::LogFormat::from_env());
}

/// Tracing configuration (filter, output format).
pub mod tracing;

pub use self::tracing::LogFormat;
