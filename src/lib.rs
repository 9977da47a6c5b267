//! Skuforge - Product catalog enrichment tool
//!
//! This library crate exposes the application layer for integration testing.

pub mod commands;
pub mod config;
pub mod feed;
pub mod runner;
