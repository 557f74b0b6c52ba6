//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Chatty loop modules (detection, checkout polling) define
//! `const ENABLE_LOGS: bool = true;` and use these instead of the bare
//! `log` macros so per-frame noise can be silenced per module.

/// Info-level logging, gated on the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level logging, gated on the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level logging, gated on the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
