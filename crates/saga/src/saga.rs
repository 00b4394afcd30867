//! Saga orchestrator
//!
//! A [`Saga`] is a reusable template: an ordered list of steps plus settings.
//! Each call to [`Saga::run`] or [`Saga::execute`] is an independent
//! invocation over caller-supplied data. Steps run strictly in order; the
//! first failure stops forward progress and every step that had already
//! succeeded is compensated, last one first. A failing compensation is logged
//! and recorded, and the remaining compensations still run.

use crate::report::{CompensationOutcome, SagaReport};
use crate::run::{Compensating, SagaRun};
use crate::step::{Compensation, FnStep, SagaStep, StepAction};
use futures::future::BoxFuture;
use futures::FutureExt;
use relaykit_config::{RelayConfig, SagaSettings};
use relaykit_core::{CallContext, Error, Result};
use relaykit_utils::tracing::saga_span;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

/// Orchestrator settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SagaConfig {
    /// Upper bound for each compensating action
    pub compensation_timeout: Option<Duration>,
}

impl From<&SagaSettings> for SagaConfig {
    fn from(settings: &SagaSettings) -> Self {
        Self {
            compensation_timeout: settings.compensation_timeout(),
        }
    }
}

impl From<&RelayConfig> for SagaConfig {
    fn from(config: &RelayConfig) -> Self {
        Self::from(&config.saga)
    }
}

/// Ordered steps with compensation, generic over the data `C` the steps share
pub struct Saga<C: Send> {
    name: String,
    steps: Vec<Box<dyn SagaStep<C>>>,
    config: SagaConfig,
}

impl<C: Send> fmt::Debug for Saga<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saga")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Send + 'static> Saga<C> {
    pub fn builder(name: impl Into<String>) -> SagaBuilder<C> {
        SagaBuilder::new(name)
    }
}

impl<C: Send> Saga<C> {
    /// Run the saga and return the full report
    pub async fn run(&self, ctx: &CallContext, data: &mut C) -> SagaReport {
        let span = saga_span(&self.name, self.steps.len());
        self.run_inner(ctx, data).instrument(span).await
    }

    /// Run the saga.
    ///
    /// On failure the error is a `SagaStep` error carrying the original
    /// forward error (see [`Error::root_cause`]) and any compensation
    /// failures.
    pub async fn execute(&self, ctx: &CallContext, data: &mut C) -> Result<()> {
        self.run(ctx, data).await.into_result()
    }

    async fn run_inner(&self, ctx: &CallContext, data: &mut C) -> SagaReport {
        let mut run = SagaRun::new(&self.name, self.steps.len()).start();
        debug!(correlation_id = ctx.correlation_id(), "saga started");

        for (index, step) in self.steps.iter().enumerate() {
            let outcome = match ctx.check(step.name()) {
                Ok(()) => guarded(step.name(), step.execute(ctx, data)).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    run.step_succeeded();
                    debug!(step = step.name(), index, "saga step succeeded");
                }
                Err(error) => {
                    warn!(
                        step = step.name(),
                        index,
                        error = %error,
                        "saga step failed, compensating completed steps"
                    );
                    let mut unwinding = run.fail(step.name(), index, error);
                    self.compensate(&mut unwinding, ctx, data).await;
                    let report = unwinding.finish().into_report();
                    info!(
                        failed_step = step.name(),
                        compensation_failures = report.compensation_failures().len(),
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "saga compensated"
                    );
                    return report;
                }
            }
        }

        let report = run.complete().into_report();
        info!(
            steps = report.steps,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "saga completed"
        );
        report
    }

    /// Compensate every executed step, last first, under a context the caller
    /// cannot cancel
    async fn compensate(
        &self,
        run: &mut SagaRun<Compensating>,
        ctx: &CallContext,
        data: &mut C,
    ) {
        let detached = ctx.detached();

        for index in (0..run.executed()).rev() {
            let step = &self.steps[index];
            let result = match self.config.compensation_timeout {
                Some(limit) => {
                    let bounded = detached.clone().timeout(limit);
                    let compensation = guarded(step.name(), step.compensate(&bounded, data));
                    match tokio::time::timeout(limit, compensation).await {
                        Ok(result) => result,
                        Err(_) => Err(Error::deadline_exceeded(
                            format!("compensate {}", step.name()),
                            Some(limit),
                        )),
                    }
                }
                None => guarded(step.name(), step.compensate(&detached, data)).await,
            };

            let outcome = match result {
                Ok(Compensation::Applied) => {
                    debug!(step = step.name(), index, "step compensated");
                    CompensationOutcome::Compensated
                }
                Ok(Compensation::NotDefined) => {
                    debug!(step = step.name(), index, "no compensation for step");
                    CompensationOutcome::Skipped
                }
                Err(e) => {
                    error!(
                        step = step.name(),
                        index,
                        error = %e,
                        "compensation failed, continuing rollback"
                    );
                    CompensationOutcome::Failed(e.to_string())
                }
            };
            run.record(step.name(), index, outcome);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

/// Runs a step future, turning a panic into that step's error
async fn guarded<F, T>(step: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Error::non_retryable(step, panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("step panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("step panicked: {message}")
    } else {
        "step panicked".to_string()
    }
}

/// Builder for [`Saga`]
pub struct SagaBuilder<C: Send> {
    name: String,
    steps: Vec<Box<dyn SagaStep<C>>>,
    config: SagaConfig,
}

impl<C: Send + 'static> SagaBuilder<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            config: SagaConfig::default(),
        }
    }

    pub fn config(mut self, config: SagaConfig) -> Self {
        self.config = config;
        self
    }

    pub fn compensation_timeout(mut self, timeout: Duration) -> Self {
        self.config.compensation_timeout = Some(timeout);
        self
    }

    /// Append a step
    pub fn step(mut self, step: impl SagaStep<C> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Append a step without compensation
    ///
    /// ```ignore
    /// builder.step_fn("CreateOrderRecord", |ctx, order| {
    ///     Box::pin(async move { orders.create(ctx, order).await })
    /// })
    /// ```
    pub fn step_fn<E>(self, name: impl Into<String>, execute: E) -> Self
    where
        E: for<'a> Fn(&'a CallContext, &'a mut C) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        let action: StepAction<C> = Box::new(execute);
        self.step(FnStep::new(name, action))
    }

    /// Append a step with a compensating action
    pub fn step_with_compensation<E, K>(
        self,
        name: impl Into<String>,
        execute: E,
        compensate: K,
    ) -> Self
    where
        E: for<'a> Fn(&'a CallContext, &'a mut C) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
        K: for<'a> Fn(&'a CallContext, &'a mut C) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        let execute: StepAction<C> = Box::new(execute);
        let compensate: StepAction<C> = Box::new(compensate);
        self.step(FnStep::new(name, execute).with_compensation(compensate))
    }

    pub fn build(self) -> Saga<C> {
        Saga {
            name: self.name,
            steps: self.steps,
            config: self.config,
        }
    }
}
