//! Outcome of one saga invocation

use crate::run::SagaState;
use relaykit_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// What happened when a completed step was rolled back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "snake_case")]
pub enum CompensationOutcome {
    Compensated,
    /// The step has no compensating action
    Skipped,
    /// The compensating action failed; rollback continued with earlier steps
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepCompensation {
    pub step: String,
    pub index: usize,
    #[serde(flatten)]
    pub outcome: CompensationOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStep {
    pub step: String,
    pub index: usize,
    pub message: String,
}

/// Full account of one saga invocation
#[derive(Debug, Serialize)]
pub struct SagaReport {
    pub saga: String,
    pub state: SagaState,
    /// Every state the run passed through, in order
    pub history: Vec<SagaState>,
    pub steps: usize,
    /// Number of steps whose forward action succeeded
    pub executed: usize,
    pub failed_step: Option<FailedStep>,
    /// Rollback results in the order they ran, last executed step first
    pub compensations: Vec<StepCompensation>,
    #[serde(serialize_with = "serialize_millis", rename = "elapsed_ms")]
    pub elapsed: Duration,
    #[serde(skip)]
    pub(crate) error: Option<Error>,
}

impl SagaReport {
    pub fn is_success(&self) -> bool {
        self.state == SagaState::Completed
    }

    /// The forward error that stopped the saga
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Messages of compensations that failed
    pub fn compensation_failures(&self) -> Vec<String> {
        self.compensations
            .iter()
            .filter_map(|c| match &c.outcome {
                CompensationOutcome::Failed(message) => Some(format!("{}: {message}", c.step)),
                _ => None,
            })
            .collect()
    }

    /// Ok for a completed saga; otherwise a `SagaStep` error wrapping the
    /// original forward error together with any compensation failures
    pub fn into_result(self) -> Result<()> {
        let compensation_failures = self.compensation_failures();
        match (self.error, self.failed_step) {
            (Some(error), Some(failed)) => Err(Error::saga_step(
                self.saga,
                failed.step,
                failed.index,
                error,
                compensation_failures,
            )),
            _ => Ok(()),
        }
    }
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
