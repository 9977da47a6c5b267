//! Splitting a batch of outcomes into its success and failure branches.

use crate::outcome::{FailureRecord, Outcome};

/// Split outcomes into `(successes, failures)`.
///
/// The split is order-preserving within each branch: items that land in the
/// same branch keep the relative order they had in the input. Failures are
/// never dropped.
pub fn partition<T>(outcomes: Vec<Outcome<T>>) -> (Vec<T>, Vec<FailureRecord>) {
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Success(value) => successes.push(value),
            Outcome::Failure(record) => failures.push(record),
        }
    }
    (successes, failures)
}
