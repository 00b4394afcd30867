//! Per-invocation saga state tracked with phantom types
//!
//! A [`SagaRun`] can only move along `Pending -> Running -> Completed` or
//! `Running -> Compensating -> Compensated`; forward progress is only
//! recordable while running, and compensations only while compensating.

use crate::report::{CompensationOutcome, FailedStep, SagaReport, StepCompensation};
use relaykit_core::Error;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use tokio::time::Instant;

/// Phantom type marker for a run that has not started
#[derive(Debug)]
pub struct Pending;

/// Phantom type marker for a run executing forward steps
#[derive(Debug)]
pub struct Running;

/// Phantom type marker for a run whose steps all succeeded
#[derive(Debug)]
pub struct Completed;

/// Phantom type marker for a run unwinding completed steps
#[derive(Debug)]
pub struct Compensating;

/// Phantom type marker for a run that finished unwinding
#[derive(Debug)]
pub struct Compensated;

/// Runtime view of the phantom states, used in reports and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaState {
    Pending,
    Running,
    Completed,
    Compensating,
    Compensated,
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SagaState::Pending => "pending",
            SagaState::Running => "running",
            SagaState::Completed => "completed",
            SagaState::Compensating => "compensating",
            SagaState::Compensated => "compensated",
        };
        f.write_str(name)
    }
}

/// One saga invocation
#[derive(Debug)]
pub struct SagaRun<State = Pending> {
    saga: String,
    steps: usize,
    executed: usize,
    started: Instant,
    history: Vec<SagaState>,
    failed_step: Option<FailedStep>,
    error: Option<Error>,
    compensations: Vec<StepCompensation>,
    _state: PhantomData<State>,
}

impl<S> SagaRun<S> {
    fn transition<T>(mut self, next: SagaState) -> SagaRun<T> {
        self.history.push(next);
        SagaRun {
            saga: self.saga,
            steps: self.steps,
            executed: self.executed,
            started: self.started,
            history: self.history,
            failed_step: self.failed_step,
            error: self.error,
            compensations: self.compensations,
            _state: PhantomData,
        }
    }

    fn report(self, state: SagaState) -> SagaReport {
        SagaReport {
            saga: self.saga,
            state,
            history: self.history,
            steps: self.steps,
            executed: self.executed,
            failed_step: self.failed_step,
            compensations: self.compensations,
            elapsed: self.started.elapsed(),
            error: self.error,
        }
    }

    pub fn saga(&self) -> &str {
        &self.saga
    }

    /// Steps whose forward action succeeded so far
    pub fn executed(&self) -> usize {
        self.executed
    }
}

impl SagaRun<Pending> {
    pub fn new(saga: impl Into<String>, steps: usize) -> Self {
        Self {
            saga: saga.into(),
            steps,
            executed: 0,
            started: Instant::now(),
            history: vec![SagaState::Pending],
            failed_step: None,
            error: None,
            compensations: Vec::new(),
            _state: PhantomData,
        }
    }

    pub fn start(self) -> SagaRun<Running> {
        self.transition(SagaState::Running)
    }
}

impl SagaRun<Running> {
    pub fn step_succeeded(&mut self) {
        self.executed += 1;
    }

    pub fn complete(self) -> SagaRun<Completed> {
        self.transition(SagaState::Completed)
    }

    /// Stop forward execution at step `index`; only steps before it get compensated
    pub fn fail(mut self, step: &str, index: usize, error: Error) -> SagaRun<Compensating> {
        self.failed_step = Some(FailedStep {
            step: step.to_string(),
            index,
            message: error.to_string(),
        });
        self.error = Some(error);
        self.transition(SagaState::Compensating)
    }
}

impl SagaRun<Compensating> {
    pub fn record(&mut self, step: &str, index: usize, outcome: CompensationOutcome) {
        self.compensations.push(StepCompensation {
            step: step.to_string(),
            index,
            outcome,
        });
    }

    pub fn finish(self) -> SagaRun<Compensated> {
        self.transition(SagaState::Compensated)
    }
}

impl SagaRun<Completed> {
    pub fn into_report(self) -> SagaReport {
        self.report(SagaState::Completed)
    }
}

impl SagaRun<Compensated> {
    pub fn into_report(self) -> SagaReport {
        self.report(SagaState::Compensated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_history() {
        let mut run = SagaRun::new("checkout", 2).start();
        run.step_succeeded();
        run.step_succeeded();
        let report = run.complete().into_report();

        assert!(report.is_success());
        assert_eq!(report.executed, 2);
        assert_eq!(
            report.history,
            vec![SagaState::Pending, SagaState::Running, SagaState::Completed]
        );
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_compensated_history_keeps_error() {
        let mut run = SagaRun::new("checkout", 3).start();
        run.step_succeeded();
        let mut unwinding = run.fail(
            "ChargePayment",
            1,
            Error::non_retryable("payments", "card declined"),
        );
        assert_eq!(unwinding.executed(), 1);
        unwinding.record("ReserveStock", 0, CompensationOutcome::Compensated);
        let report = unwinding.finish().into_report();

        assert_eq!(report.state, SagaState::Compensated);
        assert_eq!(
            report.history,
            vec![
                SagaState::Pending,
                SagaState::Running,
                SagaState::Compensating,
                SagaState::Compensated
            ]
        );
        let failed = report.failed_step.clone().unwrap();
        assert_eq!(failed.step, "ChargePayment");
        assert!(failed.message.contains("card declined"));

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("ChargePayment"));
        assert!(err.root_cause().to_string().contains("card declined"));
    }
}
