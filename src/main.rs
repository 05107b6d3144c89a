//! dmr-transform - transforms management operations for legacy hosts
//!
//! Loads transformer declarations from a YAML file and transforms one JSON
//! operation, or one resource subtree of a JSON model, for the configured
//! target.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

use dmr_transform::cli::{Cli, OutputFormat};
use dmr_transform::config::Config;
use dmr_transform::model::{PathAddress, Resource, Value};
use dmr_transform::transform::{OperationRejectionPolicy, TransformationContext, TransformerRegistry};

/// Outcome of one transformation, as printed
#[derive(Debug, Serialize)]
struct Report {
    host: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    operation: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<Value>,

    discarded: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    rejected: Option<String>,

    warnings: Vec<String>,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    dmr_transform::init_logging(&cli.log_level.to_string())?;

    debug!(version = env!("CARGO_PKG_VERSION"), "Starting dmr-transform");

    // Load configuration
    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let registry = config.build_registry()?;

    if cli.validate {
        print_registrations(&registry);
        return Ok(());
    }

    let target = config.resolve_target(cli.host.as_deref(), cli.core_version, &cli.subsystem_versions)?;
    info!(
        host = %target.host_name,
        core_version = %target.core_version,
        "Transforming for target"
    );

    let report = match (&cli.resource, &cli.operation) {
        (Some(address), _) => {
            let model_path = cli
                .model
                .as_deref()
                .context("--resource needs --model")?;
            let root = Resource::from_value(&read_json(model_path)?)?;
            let model = Arc::new(config.build_model(root));
            let context = TransformationContext::new(target, model.clone());
            transform_resource(&registry, &context, model.root(), address)?
        }
        (None, Some(operation_path)) => {
            let operation = read_json(operation_path)?;
            let root = match &cli.model {
                Some(model_path) => Resource::from_value(&read_json(model_path)?)?,
                None => Resource::new(),
            };
            let context = TransformationContext::new(target, Arc::new(config.build_model(root)));
            transform_operation(&registry, &context, operation)?
        }
        (None, None) => anyhow::bail!("Nothing to transform: pass --operation, --resource or --validate"),
    };

    print_report(&report, cli.output_format)
}

fn read_json(path: &Path) -> Result<Value> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Value::from_json(json)?)
}

fn transform_operation(
    registry: &TransformerRegistry,
    context: &TransformationContext,
    operation: Value,
) -> Result<Report> {
    let transformed = registry.transform_operation(context, operation)?;
    // without a live target the rejection is decided against an empty result
    let rejected = if transformed.reject_operation(&Value::Undefined) {
        Some(
            transformed
                .failure_description()
                .unwrap_or_else(|| "Operation rejected".to_string()),
        )
    } else {
        None
    };
    Ok(Report {
        host: context.target().host_name.clone(),
        discarded: transformed.is_discarded(),
        operation: transformed.into_operation(),
        resource: None,
        rejected,
        warnings: context.warnings(),
    })
}

fn transform_resource(
    registry: &TransformerRegistry,
    context: &TransformationContext,
    root: &Resource,
    address: &PathAddress,
) -> Result<Report> {
    let transformed = if address.is_empty() {
        Some(registry.transform_root_resource(context, root)?)
    } else {
        let resource = root
            .navigate(address)
            .with_context(|| format!("No resource at {}", address))?;
        registry.transform_resource(context, address, resource.clone())?
    };
    Ok(Report {
        host: context.target().host_name.clone(),
        discarded: transformed.is_none(),
        operation: None,
        resource: transformed.map(|resource| resource.to_value()),
        rejected: None,
        warnings: context.warnings(),
    })
}

fn print_registrations(registry: &TransformerRegistry) {
    let registrations = registry.registrations();
    println!("Configuration is valid");
    if registrations.is_empty() {
        println!("No subsystem transformers registered");
    }
    for (subsystem, versions) in registrations {
        let versions: Vec<String> = versions.iter().map(ToString::to_string).collect();
        println!("  {}: {}", subsystem, versions.join(", "));
    }
}

fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(report)?),
        OutputFormat::Text => {
            println!("Target host: {}", report.host);
            if let Some(operation) = &report.operation {
                println!("Operation:\n{}", serde_json::to_string_pretty(&operation.to_json())?);
            }
            if let Some(resource) = &report.resource {
                println!("Resource:\n{}", serde_json::to_string_pretty(&resource.to_json())?);
            }
            if report.discarded {
                println!("Discarded: not sent to the target");
            }
            if let Some(description) = &report.rejected {
                println!("Rejected: {}", description);
            }
            for warning in &report.warnings {
                println!("Warning: {}", warning);
            }
        }
    }
    Ok(())
}
