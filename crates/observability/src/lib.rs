//! Tracing and logging setup shared by the service binaries.

/// Initialize process-wide logging from the environment.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    tracing::init();
}

/// Filter resolution and subscriber installation.
pub mod tracing;
