//! The [`Command`] trait and its error types.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;

/// A unit of work in a chain.
///
/// `is_executable` is the command's own precondition: it must be pure (no
/// side effects, no panics) and chains promise to call `execute` only when
/// it returned true. A command may therefore assume its precondition held
/// on entry, typically that the context keys it reads are present.
#[async_trait]
pub trait Command: Send + Sync {
    /// Short name used in reports and logs.
    fn name(&self) -> &str;

    /// Whether the command can run against the current context.
    fn is_executable(&self, ctx: &Context) -> bool;

    /// Run the command. Only called when [`Command::is_executable`] is true.
    async fn execute(&self, ctx: &Context) -> Result<(), CommandError>;
}

/// Why a command (or a chain of commands) failed.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The command itself failed.
    #[error("{0}")]
    Failed(String),

    /// The command exceeded its time budget.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// One or more children of a chain failed. The chain still ran every
    /// executable child before surfacing this.
    #[error("{} of {} commands failed: {}", .failures.len(), .total, join_failures(.failures))]
    Aggregate {
        /// Total children in the chain, including skipped ones.
        total: usize,
        failures: Vec<ChildFailure>,
    },
}

impl CommandError {
    /// Create a [`CommandError::Failed`] from any message.
    pub fn failed<S: Into<String>>(msg: S) -> Self {
        Self::Failed(msg.into())
    }
}

/// One failed child inside a [`CommandError::Aggregate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildFailure {
    pub command: String,
    pub reason: String,
}

fn join_failures(failures: &[ChildFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.command, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
