//! Saga orchestration for multi-service operations without a shared
//! transaction.
//!
//! ## Key Components
//!
//! - **`saga`**: `Saga` templates, their builder and the orchestrator loop.
//! - **`step`**: The `SagaStep` trait and closure-backed steps.
//! - **`run`**: Typed-state tracking of one invocation.
//! - **`report`**: `SagaReport`, the outcome of one invocation.
//! - **`context`**: `DynamicContext` for sagas assembled at runtime.

pub mod context;
pub mod report;
pub mod run;
pub mod saga;
pub mod step;

pub use self::{
    context::DynamicContext,
    report::{CompensationOutcome, FailedStep, SagaReport, StepCompensation},
    run::{SagaRun, SagaState},
    saga::{Saga, SagaBuilder, SagaConfig},
    step::{Compensation, FnStep, SagaStep, StepAction},
};
