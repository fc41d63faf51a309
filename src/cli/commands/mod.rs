//! CLI command implementations
//!
//! Commands return process exit codes: 0 success, 1 partial failure,
//! 2 configuration error, 5 fatal error.

pub mod fetch;
pub mod init;
pub mod load;
pub mod validate;

use crate::config::CifdbConfig;
use crate::core::reshape::Style;

/// Exit code for a successful run
pub const EXIT_OK: i32 = 0;
/// Exit code when some documents failed
pub const EXIT_PARTIAL: i32 = 1;
/// Exit code for configuration and schema errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for fatal errors
pub const EXIT_FATAL: i32 = 5;

/// Overrides shared by commands that build documents
fn apply_processing_overrides(
    config: &mut CifdbConfig,
    style: Option<&str>,
    slice: Option<&str>,
) -> crate::domain::Result<()> {
    let processing = &mut config.processing;
    if let Some(style) = style {
        tracing::info!(style, "Overriding document style from CLI");
        processing.style = style.parse::<Style>()?;
    }
    if let Some(slice) = slice {
        tracing::info!(slice, "Overriding slice from CLI");
        processing.slice = Some(slice.to_string());
    }
    Ok(())
}
