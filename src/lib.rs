//! dmr-transform library
//!
//! This crate transforms management operations and resource trees so that
//! hosts running older model versions understand them. Subsystems declare
//! per-version attribute and resource rules with the builders in
//! [`transform::description`]; the [`transform::TransformerRegistry`] then
//! applies them to operations, composites and whole resource trees.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod transform;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// Logs go to stderr so transformed output on stdout stays machine-readable.
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
