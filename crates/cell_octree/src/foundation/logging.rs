//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Reads the filter from `RUST_LOG`. Calling it more than once is harmless,
/// later calls leave the first logger in place.
pub fn init() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
