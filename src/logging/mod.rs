//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output at a configurable level
//! - JSON-formatted local log files with rotation
//! - `RUST_LOG` overrides through `EnvFilter`
//!
//! # Example
//!
//! ```no_run
//! use cifdb::logging::init_logging;
//! use cifdb::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(collection = "pdbx_core_entry", "Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use cifdb::log_error_with_context;
/// use cifdb::domain::CifdbError;
///
/// let error = CifdbError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log the start of one loader sub-list
///
/// # Example
///
/// ```no_run
/// use cifdb::log_sub_list_progress;
///
/// log_sub_list_progress!(1, 2, 2000, 134, 4);
/// ```
#[macro_export]
macro_rules! log_sub_list_progress {
    ($current:expr, $total:expr, $documents:expr, $chunks:expr, $workers:expr) => {
        tracing::debug!(
            sub_list = $current,
            of = $total,
            documents = $documents,
            chunks = $chunks,
            workers = $workers,
            progress_pct = ($current as f64 / $total as f64 * 100.0),
            "Loading sub-list"
        );
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_expand() {
        let error = crate::domain::CifdbError::Other("boom".to_string());
        log_error_with_context!(&error, "unit test");
        log_sub_list_progress!(1usize, 2usize, 10usize, 3usize, 2usize);
    }
}
