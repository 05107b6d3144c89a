//! CLI argument parsing for dmr-transform
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: transform.yaml, env: DMR_TRANSFORM_CONFIG)
//! - `--operation`: JSON file holding the operation to transform (env: DMR_TRANSFORM_OPERATION)
//! - `--model`: JSON file holding the source resource tree (env: DMR_TRANSFORM_MODEL)
//! - `--resource`: Transform the resource at this address of `--model` instead of an operation
//! - `--host`: Target host name (overrides config file, env: DMR_TRANSFORM_HOST)
//! - `--core-version`: Target core model version (overrides config file)
//! - `--subsystem-version`: `name=version` pairs, repeatable (overrides config file)
//! - `--validate`: Validate configuration and show the registered transformers
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: DMR_TRANSFORM_LOG_LEVEL)
//! - `--output-format`: Output format (text/json/yaml)
//!
//! # Precedence
//!
//! Target values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::model::PathAddress;
use crate::transform::ModelVersion;

/// dmr-transform - transforms management operations and resources for
/// hosts running older model versions
///
/// Loads the transformer declarations and the target description from a
/// YAML file, then transforms one JSON operation or one resource subtree.
#[derive(Parser, Debug)]
#[command(name = "dmr-transform")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "transform.yaml",
        env = "DMR_TRANSFORM_CONFIG"
    )]
    pub config: PathBuf,

    /// JSON file holding the operation to transform
    #[arg(long, value_name = "FILE", env = "DMR_TRANSFORM_OPERATION")]
    pub operation: Option<PathBuf>,

    /// JSON file holding the source resource tree
    #[arg(long, value_name = "FILE", env = "DMR_TRANSFORM_MODEL")]
    pub model: Option<PathBuf>,

    /// Transform the resource at this address of the model
    #[arg(long, value_name = "ADDRESS", requires = "model", conflicts_with = "operation")]
    pub resource: Option<PathAddress>,

    /// Target host name (overrides config file)
    #[arg(long, value_name = "NAME", env = "DMR_TRANSFORM_HOST")]
    pub host: Option<String>,

    /// Target core model version (overrides config file)
    #[arg(long, value_name = "VERSION", env = "DMR_TRANSFORM_CORE_VERSION")]
    pub core_version: Option<ModelVersion>,

    /// Subsystem version of the target as name=version (overrides config file)
    #[arg(long = "subsystem-version", value_name = "NAME=VERSION", value_parser = parse_subsystem_version)]
    pub subsystem_versions: Vec<(String, ModelVersion)>,

    /// Validate configuration without transforming anything
    #[arg(long)]
    pub validate: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "DMR_TRANSFORM_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

fn parse_subsystem_version(s: &str) -> Result<(String, ModelVersion), String> {
    let (name, version) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VERSION, got '{}'", s))?;
    let version = version.parse::<ModelVersion>().map_err(|e| e.to_string())?;
    Ok((name.to_string(), version))
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
