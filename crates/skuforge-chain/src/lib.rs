//! Skuforge-Chain: command and chain execution engine.
//!
//! Setup and orchestration work is expressed as [`Command`]s that read and
//! write a shared [`Context`]. Commands declare their own preconditions via
//! `is_executable`, and chains gate every dispatch on it:
//!
//! - [`SequentialChain`] runs children in order, skipping the non-executable
//!   ones and continuing past failures.
//! - [`ParallelChain`] computes the gate set once, then dispatches the gated
//!   children onto a bounded set of tasks.
//!
//! Both aggregate child failures into a single [`CommandError::Aggregate`]
//! after the last child, and both implement [`Command`] themselves so chains
//! nest.
//!
//! # Examples
//!
//! ```
//! use skuforge_chain::{Command, CommandError, Context, Key, SequentialChain};
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! const GREETING: Key<String> = Key::new("greeting");
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Command for Greet {
//!     fn name(&self) -> &str {
//!         "greet"
//!     }
//!     fn is_executable(&self, ctx: &Context) -> bool {
//!         !ctx.contains(&GREETING)
//!     }
//!     async fn execute(&self, ctx: &Context) -> Result<(), CommandError> {
//!         ctx.set(&GREETING, "hello".to_string());
//!         Ok(())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let ctx = Context::new();
//! let chain = SequentialChain::new("setup").with_command(Arc::new(Greet));
//! let report = chain.run(&ctx).await;
//! assert!(!report.has_failures());
//! assert_eq!(*ctx.get(&GREETING).unwrap(), "hello");
//! # });
//! ```

pub mod chain;
pub mod command;
pub mod context;

pub use chain::{ChainReport, CommandState, ParallelChain, ReportEntry, SequentialChain};
pub use command::{ChildFailure, Command, CommandError};
pub use context::{Context, Key};
