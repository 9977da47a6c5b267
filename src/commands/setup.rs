//! Setup commands and the chain that runs them.
//!
//! Every run starts with the same preflight: load configuration, verify
//! the environment and open the warehouse (independent, so they run in a
//! parallel chain), then ensure the warehouse schema. Each command gates
//! itself on the context keys it needs, which is what lets the whole
//! chain be re-run safely: work already done is skipped, not repeated.

use std::path::PathBuf;

use async_trait::async_trait;
use skuforge_chain::{Command, CommandError, Context, ParallelChain, SequentialChain};
use skuforge_providers::{SqliteWarehouse, Warehouse};
use tracing::info;

use crate::commands::keys;

fn config_from(ctx: &Context) -> Result<std::sync::Arc<skuforge_core::Config>, CommandError> {
    ctx.get(&keys::CONFIG)
        .ok_or_else(|| CommandError::failed("configuration missing from context"))
}

/// Loads the TOML configuration into the context.
///
/// Skipped when a configuration is already present, so callers can seed
/// the context and re-use the same chain.
pub struct LoadConfigCommand {
    path: Option<PathBuf>,
}

impl LoadConfigCommand {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Command for LoadConfigCommand {
    fn name(&self) -> &str {
        "load-config"
    }

    fn is_executable(&self, ctx: &Context) -> bool {
        !ctx.contains(&keys::CONFIG)
    }

    async fn execute(&self, ctx: &Context) -> Result<(), CommandError> {
        let config = crate::config::load_config_or_default(self.path.as_deref())
            .map_err(|e| CommandError::failed(format!("{e:#}")))?;
        ctx.set(&keys::CONFIG, config);
        Ok(())
    }
}

/// Checks the credentials environment variable for the remote provider.
///
/// Skipped entirely when no remote endpoint is configured; the stub
/// provider needs no credentials.
pub struct VerifyEnvironmentCommand;

#[async_trait]
impl Command for VerifyEnvironmentCommand {
    fn name(&self) -> &str {
        "verify-environment"
    }

    fn is_executable(&self, ctx: &Context) -> bool {
        ctx.get(&keys::CONFIG)
            .map(|c| c.embedding.endpoint.is_some())
            .unwrap_or(false)
    }

    async fn execute(&self, ctx: &Context) -> Result<(), CommandError> {
        let config = config_from(ctx)?;
        let var = &config.embedding.token_env;
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => {
                ctx.set(&keys::ENV_VERIFIED, true);
                Ok(())
            }
            _ => Err(CommandError::failed(format!(
                "environment variable '{var}' is unset or empty"
            ))),
        }
    }
}

/// Opens the SQLite warehouse named by the configuration.
pub struct ConnectWarehouseCommand;

#[async_trait]
impl Command for ConnectWarehouseCommand {
    fn name(&self) -> &str {
        "connect-warehouse"
    }

    fn is_executable(&self, ctx: &Context) -> bool {
        ctx.contains(&keys::CONFIG) && !ctx.contains(&keys::WAREHOUSE)
    }

    async fn execute(&self, ctx: &Context) -> Result<(), CommandError> {
        let config = config_from(ctx)?;
        let warehouse = SqliteWarehouse::open(&config.warehouse.path)
            .map_err(|e| CommandError::failed(e.to_string()))?;
        info!(path = %config.warehouse.path, "warehouse opened");
        ctx.set(&keys::WAREHOUSE, warehouse);
        Ok(())
    }
}

/// Creates the product table if it does not exist yet.
pub struct EnsureSchemaCommand;

#[async_trait]
impl Command for EnsureSchemaCommand {
    fn name(&self) -> &str {
        "ensure-schema"
    }

    fn is_executable(&self, ctx: &Context) -> bool {
        ctx.contains(&keys::WAREHOUSE)
    }

    async fn execute(&self, ctx: &Context) -> Result<(), CommandError> {
        let warehouse = ctx
            .get(&keys::WAREHOUSE)
            .ok_or_else(|| CommandError::failed("warehouse missing from context"))?;
        warehouse
            .ensure_table()
            .await
            .map_err(|e| CommandError::failed(e.to_string()))
    }
}

/// The standard preflight chain.
///
/// `load-config` runs first; `verify-environment` and `connect-warehouse`
/// then run in parallel (they write disjoint keys); `ensure-schema` runs
/// last, once the warehouse handle exists.
pub fn build_setup_chain(config_path: Option<PathBuf>) -> SequentialChain {
    use std::sync::Arc;

    SequentialChain::new("setup")
        .with_command(Arc::new(LoadConfigCommand::new(config_path)))
        .with_command(Arc::new(
            ParallelChain::new("preflight")
                .with_command(Arc::new(VerifyEnvironmentCommand))
                .with_command(Arc::new(ConnectWarehouseCommand)),
        ))
        .with_command(Arc::new(EnsureSchemaCommand))
}
