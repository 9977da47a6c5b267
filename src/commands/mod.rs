//! Application commands built on the chain engine.

pub mod keys;
pub mod setup;

pub use setup::{
    build_setup_chain, ConnectWarehouseCommand, EnsureSchemaCommand, LoadConfigCommand,
    VerifyEnvironmentCommand,
};
