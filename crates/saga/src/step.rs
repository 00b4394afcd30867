//! Saga steps: a forward action paired with an optional compensation

use async_trait::async_trait;
use futures::future::BoxFuture;
use relaykit_core::{CallContext, Result};
use std::fmt;

/// What a step's compensating action did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// The completed forward action was undone
    Applied,
    /// The step has nothing to undo
    NotDefined,
}

/// One unit of work in a saga.
///
/// `compensate` semantically undoes a successful `execute`. The default
/// answers [`Compensation::NotDefined`], which the report shows as skipped.
#[async_trait]
pub trait SagaStep<C: Send>: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, ctx: &CallContext, data: &mut C) -> Result<()>;

    async fn compensate(&self, _ctx: &CallContext, _data: &mut C) -> Result<Compensation> {
        Ok(Compensation::NotDefined)
    }
}

/// Boxed async action over the saga data
pub type StepAction<C> =
    Box<dyn for<'a> Fn(&'a CallContext, &'a mut C) -> BoxFuture<'a, Result<()>> + Send + Sync>;

/// Step built from closures, see [`SagaBuilder::step_fn`](crate::SagaBuilder::step_fn)
pub struct FnStep<C> {
    name: String,
    execute: StepAction<C>,
    compensate: Option<StepAction<C>>,
}

impl<C> FnStep<C> {
    pub fn new(name: impl Into<String>, execute: StepAction<C>) -> Self {
        Self {
            name: name.into(),
            execute,
            compensate: None,
        }
    }

    pub fn with_compensation(mut self, compensate: StepAction<C>) -> Self {
        self.compensate = Some(compensate);
        self
    }
}

impl<C> fmt::Debug for FnStep<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("compensate", &self.compensate.is_some())
            .finish()
    }
}

#[async_trait]
impl<C: Send> SagaStep<C> for FnStep<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &CallContext, data: &mut C) -> Result<()> {
        (self.execute)(ctx, data).await
    }

    async fn compensate(&self, ctx: &CallContext, data: &mut C) -> Result<Compensation> {
        match &self.compensate {
            Some(compensate) => {
                compensate(ctx, data).await?;
                Ok(Compensation::Applied)
            }
            None => Ok(Compensation::NotDefined),
        }
    }
}
