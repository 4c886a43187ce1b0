//! CLI command implementations
//!
//! Both commands are one-shot: load the configuration and schema, do the
//! work, print one JSON object, exit.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::acl::Principal;
use crate::crud::{plan, plan_batch_delete, Operation};
use crate::query::RequestParams;
use crate::schema::EntityRegistry;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check { config } => check(&config),
        Command::Explain { config } => explain(&config),
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn boot(config_path: &Path) -> CliResult<EntityRegistry> {
    let config = Config::load(config_path)?;
    init_logging(&config);

    let registry = config.load_registry()?;
    info!(
        schema = %config.schema_path.display(),
        entities = registry.len(),
        "Schema loaded"
    );
    Ok(registry)
}

/// Load config and schema, then print one summary line per entity
pub fn check(config_path: &Path) -> CliResult<()> {
    let registry = boot(config_path)?;
    write_response(summarize(&registry))
}

fn summarize(registry: &EntityRegistry) -> Value {
    let entities: Vec<Value> = registry
        .entities()
        .map(|entity| {
            json!({
                "name": entity.name,
                "columns": entity.column_order,
                "primary_key": entity.primary_key_columns,
                "acl_enabled": entity.acl_enabled,
                "acl_columns_present": entity.has_acl_columns(),
            })
        })
        .collect();
    json!({ "entities": entities })
}

/// Read one request from stdin and print the secured query it plans to
pub fn explain(config_path: &Path) -> CliResult<()> {
    let registry = boot(config_path)?;
    let request = read_request()?;
    write_response(explain_request(&registry, request)?)
}

#[derive(Debug, Deserialize)]
struct ExplainRequest {
    entity: String,
    operation: String,
    #[serde(default)]
    params: RequestParams,
    #[serde(default)]
    principal: Principal,
    #[serde(default)]
    id: Option<String>,
    /// Batch delete body
    #[serde(default)]
    body: Map<String, Value>,
}

fn explain_request(registry: &EntityRegistry, request: Value) -> CliResult<Value> {
    let request: ExplainRequest = serde_json::from_value(request)
        .map_err(|e| CliError::bad_request(format!("Invalid explain request: {}", e)))?;

    let entity = registry
        .get(&request.entity)
        .ok_or_else(|| CliError::bad_request(format!("Unknown entity '{}'", request.entity)))?;

    let query = if request.operation == "delete_batch" {
        plan_batch_delete(entity, &request.body, &request.principal)?
    } else {
        let operation: Operation = serde_json::from_value(Value::String(request.operation.clone()))
            .map_err(|_| {
                CliError::bad_request(format!("Unknown operation '{}'", request.operation))
            })?;
        plan(
            entity,
            operation,
            &request.params,
            request.id.as_deref(),
            &request.principal,
        )?
    };
    debug!(entity = %entity.name, operation = %request.operation, "Planned query");

    Ok(json!({
        "entity": entity.name,
        "operation": request.operation,
        "where": query.where_expr(),
        "query": query,
    }))
}
