//! Context keys shared by the setup commands.
//!
//! Keeping every key in one place makes the chain's data flow auditable:
//! a command's gate reads these, its execute writes them, and no two
//! parallel siblings write the same one.

use skuforge_chain::Key;
use skuforge_core::Config;
use skuforge_providers::SqliteWarehouse;

/// The loaded application configuration.
pub const CONFIG: Key<Config> = Key::new("config");

/// Present once the credentials environment variable has been checked.
pub const ENV_VERIFIED: Key<bool> = Key::new("env-verified");

/// The opened warehouse handle.
pub const WAREHOUSE: Key<SqliteWarehouse> = Key::new("warehouse");
