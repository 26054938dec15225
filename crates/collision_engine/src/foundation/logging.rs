//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Panics if a global logger was already installed.
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system, ignoring an already installed logger.
///
/// Intended for test harnesses where several tests race to set up logging.
pub fn try_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
