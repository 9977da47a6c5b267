//! Sequential and parallel chains of commands.
//!
//! A chain owns an ordered list of commands and drives each one through the
//! per-run lifecycle `Pending -> Skipped` or `Pending -> Running ->
//! Completed | Failed`, captured in a [`ChainReport`]. A failed child never
//! prevents later (or sibling) children from running; failures are
//! aggregated and surfaced after the last child has finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::command::{ChildFailure, Command, CommandError};
use crate::context::Context;

/// Lifecycle state of one command within one chain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandState {
    /// Not yet considered.
    Pending,
    /// Gate was false at dispatch time; never executed.
    Skipped,
    /// Currently executing.
    Running,
    /// Executed and returned success.
    Completed,
    /// Executed and returned an error (the reason is kept).
    Failed(String),
}

/// Final state of one child command.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub command: String,
    pub state: CommandState,
}

/// Ordered per-child outcome of one chain run.
#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    entries: Vec<ReportEntry>,
}

impl ChainReport {
    fn new(commands: &[Arc<dyn Command>]) -> Self {
        Self {
            entries: commands
                .iter()
                .map(|c| ReportEntry {
                    command: c.name().to_string(),
                    state: CommandState::Pending,
                })
                .collect(),
        }
    }

    /// Entries in the chain's child order.
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// State of the first child with the given name.
    pub fn state_of(&self, command: &str) -> Option<&CommandState> {
        self.entries
            .iter()
            .find(|e| e.command == command)
            .map(|e| &e.state)
    }

    pub fn completed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == CommandState::Completed)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == CommandState::Skipped)
            .count()
    }

    /// Every failed child with its reason, in child order.
    pub fn failures(&self) -> Vec<ChildFailure> {
        self.entries
            .iter()
            .filter_map(|e| match &e.state {
                CommandState::Failed(reason) => Some(ChildFailure {
                    command: e.command.clone(),
                    reason: reason.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.state, CommandState::Failed(_)))
    }

    /// Convert the report into the aggregate error chains surface from
    /// [`Command::execute`], or `None` when every child succeeded or was
    /// skipped.
    pub fn to_error(&self) -> Option<CommandError> {
        let failures = self.failures();
        if failures.is_empty() {
            None
        } else {
            Some(CommandError::Aggregate {
                total: self.entries.len(),
                failures,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// SequentialChain
// ---------------------------------------------------------------------------

/// Runs children one after another in insertion order.
pub struct SequentialChain {
    name: String,
    commands: Vec<Arc<dyn Command>>,
}

impl SequentialChain {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn add_command(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Builder-style [`SequentialChain::add_command`].
    pub fn with_command(mut self, command: Arc<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run every child in order and report per-child outcomes.
    ///
    /// Gates are evaluated immediately before each child, so an earlier
    /// child's writes can enable a later one. A failure is recorded and the
    /// chain moves on.
    pub async fn run(&self, ctx: &Context) -> ChainReport {
        let mut report = ChainReport::new(&self.commands);

        for (i, command) in self.commands.iter().enumerate() {
            if !command.is_executable(ctx) {
                tracing::debug!(chain = %self.name, command = command.name(), "skipping");
                report.entries[i].state = CommandState::Skipped;
                continue;
            }

            report.entries[i].state = CommandState::Running;
            tracing::debug!(chain = %self.name, command = command.name(), "executing");

            match command.execute(ctx).await {
                Ok(()) => report.entries[i].state = CommandState::Completed,
                Err(e) => {
                    tracing::error!(
                        chain = %self.name,
                        command = command.name(),
                        error = %e,
                        "command failed"
                    );
                    report.entries[i].state = CommandState::Failed(e.to_string());
                }
            }
        }

        report
    }
}

#[async_trait::async_trait]
impl Command for SequentialChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_executable(&self, _ctx: &Context) -> bool {
        !self.commands.is_empty()
    }

    async fn execute(&self, ctx: &Context) -> Result<(), CommandError> {
        match self.run(ctx).await.to_error() {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// ParallelChain
// ---------------------------------------------------------------------------

/// Dispatches children concurrently onto a bounded set of tasks.
///
/// The gate set is computed once, before any child starts: a child's writes
/// cannot enable or disable a sibling within the same run. Children must
/// write disjoint context keys; no ordering between siblings is guaranteed
/// and none of a sibling's writes may be read during the run.
pub struct ParallelChain {
    name: String,
    commands: Vec<Arc<dyn Command>>,
    max_parallelism: usize,
    child_timeout: Option<Duration>,
}

impl ParallelChain {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
            max_parallelism: num_cpus::get(),
            child_timeout: None,
        }
    }

    /// Cap the number of children executing at once (default: CPU count).
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism.max(1);
        self
    }

    /// Give each child a time budget. A child that exceeds it is recorded
    /// as failed with a timeout reason; siblings are unaffected.
    pub fn with_child_timeout(mut self, timeout: Duration) -> Self {
        self.child_timeout = Some(timeout);
        self
    }

    pub fn add_command(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Builder-style [`ParallelChain::add_command`].
    pub fn with_command(mut self, command: Arc<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run every gated child concurrently and wait for all of them.
    pub async fn run(&self, ctx: &Context) -> ChainReport {
        let mut report = ChainReport::new(&self.commands);

        // Gate set is fixed before anything executes.
        let executable: Vec<bool> = self
            .commands
            .iter()
            .map(|c| c.is_executable(ctx))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.max_parallelism));
        let mut handles = Vec::new();

        for (i, command) in self.commands.iter().enumerate() {
            if !executable[i] {
                tracing::debug!(chain = %self.name, command = command.name(), "skipping");
                report.entries[i].state = CommandState::Skipped;
                continue;
            }

            report.entries[i].state = CommandState::Running;
            tracing::debug!(chain = %self.name, command = command.name(), "dispatching");

            let command = Arc::clone(command);
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            let child_timeout = self.child_timeout;

            handles.push((
                i,
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| CommandError::failed("chain semaphore closed"))?;
                    match child_timeout {
                        Some(budget) => {
                            match tokio::time::timeout(budget, command.execute(&ctx)).await {
                                Ok(result) => result,
                                Err(_) => Err(CommandError::TimedOut(budget)),
                            }
                        }
                        None => command.execute(&ctx).await,
                    }
                }),
            ));
        }

        for (i, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(CommandError::failed(format!("child task panicked: {e}"))),
            };
            match result {
                Ok(()) => report.entries[i].state = CommandState::Completed,
                Err(e) => {
                    tracing::error!(
                        chain = %self.name,
                        command = %report.entries[i].command,
                        error = %e,
                        "command failed"
                    );
                    report.entries[i].state = CommandState::Failed(e.to_string());
                }
            }
        }

        report
    }
}

#[async_trait::async_trait]
impl Command for ParallelChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_executable(&self, _ctx: &Context) -> bool {
        !self.commands.is_empty()
    }

    async fn execute(&self, ctx: &Context) -> Result<(), CommandError> {
        match self.run(ctx).await.to_error() {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}
