use async_trait::async_trait;
use parking_lot::Mutex;
use relaykit_core::{CallContext, Error, Result};
use relaykit_saga::{Compensation, CompensationOutcome, Saga, SagaState, SagaStep};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Order {
    log: Vec<String>,
    reservation_id: Option<String>,
    payment_id: Option<String>,
}

impl Order {
    fn note(&mut self, entry: &str) {
        self.log.push(entry.to_string());
    }
}

struct ReserveStock;

#[async_trait]
impl SagaStep<Order> for ReserveStock {
    fn name(&self) -> &str {
        "ReserveStock"
    }

    async fn execute(&self, _ctx: &CallContext, order: &mut Order) -> Result<()> {
        order.note("reserve");
        order.reservation_id = Some("res-1".to_string());
        Ok(())
    }

    async fn compensate(&self, _ctx: &CallContext, order: &mut Order) -> Result<Compensation> {
        order.note("release");
        order.reservation_id = None;
        Ok(Compensation::Applied)
    }
}

struct ChargePayment {
    decline: bool,
}

#[async_trait]
impl SagaStep<Order> for ChargePayment {
    fn name(&self) -> &str {
        "ChargePayment"
    }

    async fn execute(&self, _ctx: &CallContext, order: &mut Order) -> Result<()> {
        order.note("charge");
        if self.decline {
            return Err(Error::non_retryable("payments", "card declined"));
        }
        order.payment_id = Some("pay-1".to_string());
        Ok(())
    }

    async fn compensate(&self, _ctx: &CallContext, order: &mut Order) -> Result<Compensation> {
        order.note("refund");
        order.payment_id = None;
        Ok(Compensation::Applied)
    }
}

/// No compensating action
struct CreateOrderRecord;

#[async_trait]
impl SagaStep<Order> for CreateOrderRecord {
    fn name(&self) -> &str {
        "CreateOrderRecord"
    }

    async fn execute(&self, _ctx: &CallContext, order: &mut Order) -> Result<()> {
        order.note("create");
        Ok(())
    }
}

fn order_saga(decline: bool) -> Saga<Order> {
    Saga::<Order>::builder("place-order")
        .step(ReserveStock)
        .step(ChargePayment { decline })
        .step(CreateOrderRecord)
        .build()
}

#[tokio::test]
async fn all_steps_succeed() {
    let saga = order_saga(false);
    let mut order = Order::default();

    let report = saga.run(&CallContext::new(), &mut order).await;

    assert!(report.is_success());
    assert_eq!(report.executed, 3);
    assert!(report.compensations.is_empty());
    assert_eq!(order.log, vec!["reserve", "charge", "create"]);
    assert_eq!(order.payment_id.as_deref(), Some("pay-1"));
}

#[tokio::test]
async fn payment_failure_releases_stock_and_skips_order_record() {
    let saga = order_saga(true);
    let mut order = Order::default();

    let report = saga.run(&CallContext::new(), &mut order).await;

    assert_eq!(report.state, SagaState::Compensated);
    assert_eq!(report.executed, 1);
    let failed = report.failed_step.clone().unwrap();
    assert_eq!((failed.step.as_str(), failed.index), ("ChargePayment", 1));
    assert_eq!(report.compensations.len(), 1);
    assert_eq!(report.compensations[0].step, "ReserveStock");
    assert_eq!(
        report.compensations[0].outcome,
        CompensationOutcome::Compensated
    );
    assert_eq!(order.log, vec!["reserve", "charge", "release"]);
    assert!(order.reservation_id.is_none());

    let mut order = Order::default();
    let err = saga
        .execute(&CallContext::new(), &mut order)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SagaStep { index: 1, .. }));
    assert!(err.root_cause().to_string().contains("card declined"));
}

#[tokio::test]
async fn rollback_runs_in_reverse_order() {
    let saga = Saga::<Order>::builder("place-order")
        .step(ReserveStock)
        .step(ChargePayment { decline: false })
        .step_fn("CreateOrderRecord", |_ctx, order| {
            Box::pin(async move {
                order.note("create");
                Err::<(), Error>(Error::retryable("orders-db", "connection reset"))
            })
        })
        .step_fn("SendConfirmation", |_ctx, order| {
            Box::pin(async move {
                order.note("confirm");
                Ok::<(), Error>(())
            })
        })
        .build();
    let mut order = Order::default();

    let report = saga.run(&CallContext::new(), &mut order).await;

    assert_eq!(
        order.log,
        vec!["reserve", "charge", "create", "refund", "release"]
    );
    let unwound: Vec<_> = report
        .compensations
        .iter()
        .map(|c| (c.step.as_str(), c.index))
        .collect();
    assert_eq!(unwound, vec![("ChargePayment", 1), ("ReserveStock", 0)]);
}

#[tokio::test]
async fn steps_without_compensation_are_skipped() {
    let saga = Saga::<Order>::builder("import")
        .step(CreateOrderRecord)
        .step(ReserveStock)
        .step(ChargePayment { decline: true })
        .build();
    let mut order = Order::default();

    let report = saga.run(&CallContext::new(), &mut order).await;

    let outcomes: Vec<_> = report
        .compensations
        .iter()
        .map(|c| (c.step.as_str(), c.outcome.clone()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            ("ReserveStock", CompensationOutcome::Compensated),
            ("CreateOrderRecord", CompensationOutcome::Skipped),
        ]
    );
    assert_eq!(order.log, vec!["create", "reserve", "charge", "release"]);
}

/// Overrides `compensate` and nothing else
struct HoldInventory;

#[async_trait]
impl SagaStep<Order> for HoldInventory {
    fn name(&self) -> &str {
        "HoldInventory"
    }

    async fn execute(&self, _ctx: &CallContext, order: &mut Order) -> Result<()> {
        order.note("hold");
        Ok(())
    }

    async fn compensate(&self, _ctx: &CallContext, order: &mut Order) -> Result<Compensation> {
        order.note("unhold");
        Ok(Compensation::Applied)
    }
}

#[tokio::test]
async fn overriding_compensate_alone_is_enough_to_be_undone() {
    let saga = Saga::<Order>::builder("hold-then-charge")
        .step(HoldInventory)
        .step(ChargePayment { decline: true })
        .build();
    let mut order = Order::default();

    let report = saga.run(&CallContext::new(), &mut order).await;

    assert_eq!(order.log, vec!["hold", "charge", "unhold"]);
    assert_eq!(report.compensations.len(), 1);
    assert_eq!(report.compensations[0].step, "HoldInventory");
    assert_eq!(
        report.compensations[0].outcome,
        CompensationOutcome::Compensated
    );
}

#[tokio::test]
async fn failed_compensation_does_not_stop_rollback() {
    let saga = Saga::<Order>::builder("place-order")
        .step(ReserveStock)
        .step_with_compensation(
            "ChargePayment",
            |_ctx, order| {
                Box::pin(async move {
                    order.note("charge");
                    Ok::<(), Error>(())
                })
            },
            |_ctx, order| {
                Box::pin(async move {
                    order.note("refund");
                    Err::<(), Error>(Error::retryable("payments", "refund endpoint unavailable"))
                })
            },
        )
        .step(ChargePayment { decline: true })
        .build();
    let mut order = Order::default();

    let report = saga.run(&CallContext::new(), &mut order).await;

    assert_eq!(
        order.log,
        vec!["reserve", "charge", "charge", "refund", "release"]
    );
    assert!(matches!(
        report.compensations[0].outcome,
        CompensationOutcome::Failed(_)
    ));
    assert_eq!(
        report.compensations[1].outcome,
        CompensationOutcome::Compensated
    );

    let err = report.into_result().unwrap_err();
    match &err {
        Error::SagaStep {
            compensation_failures,
            ..
        } => {
            assert_eq!(compensation_failures.len(), 1);
            assert!(compensation_failures[0].contains("refund endpoint unavailable"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.root_cause().to_string().contains("card declined"));
}

#[tokio::test]
async fn invocations_are_independent() {
    let attempts: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen = Arc::clone(&attempts);
    let saga = Saga::<Order>::builder("place-order")
        .step_fn("Record", move |_ctx, order| {
            let seen = Arc::clone(&seen);
            Box::pin(async move {
                seen.lock().push(format!("{} entries", order.log.len()));
                order.note("recorded");
                Ok::<(), Error>(())
            })
        })
        .build();

    let ctx = CallContext::new();
    let mut first = Order::default();
    let mut second = Order::default();
    let (a, b) = tokio::join!(saga.run(&ctx, &mut first), saga.run(&ctx, &mut second));

    assert!(a.is_success() && b.is_success());
    assert_eq!(first.log, vec!["recorded"]);
    assert_eq!(second.log, vec!["recorded"]);
    assert_eq!(*attempts.lock(), vec!["0 entries", "0 entries"]);
}

#[tokio::test(start_paused = true)]
async fn expired_deadline_stops_before_next_step() {
    let compensation_expired: Arc<Mutex<Option<bool>>> = Arc::default();
    let observed = Arc::clone(&compensation_expired);
    let saga = Saga::<Order>::builder("slow-order")
        .step_with_compensation(
            "ReserveStock",
            |_ctx, order| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    order.note("reserve");
                    Ok::<(), Error>(())
                })
            },
            move |ctx, order| {
                let observed = Arc::clone(&observed);
                Box::pin(async move {
                    *observed.lock() = Some(ctx.is_expired());
                    order.note("release");
                    Ok::<(), Error>(())
                })
            },
        )
        .step(ChargePayment { decline: false })
        .build();
    let mut order = Order::default();

    let ctx = CallContext::with_timeout(Duration::from_secs(1));
    let report = saga.run(&ctx, &mut order).await;

    assert_eq!(order.log, vec!["reserve", "release"]);
    assert!(report.error().unwrap().is_deadline_exceeded());
    assert_eq!(report.failed_step.as_ref().unwrap().step, "ChargePayment");
    assert_eq!(*compensation_expired.lock(), Some(false));
}

#[tokio::test]
async fn cancelled_context_runs_nothing() {
    let saga = order_saga(false);
    let ctx = CallContext::new();
    ctx.cancel();
    let mut order = Order::default();

    let report = saga.run(&ctx, &mut order).await;

    assert!(order.log.is_empty());
    assert_eq!(report.executed, 0);
    assert!(report.error().unwrap().is_cancelled());
    assert!(report.compensations.is_empty());
}

#[tokio::test]
async fn panics_become_step_failures() {
    let saga = Saga::<Order>::builder("fragile")
        .step(ReserveStock)
        .step_with_compensation(
            "Audit",
            |_ctx, order| {
                Box::pin(async move {
                    order.note("audit");
                    Ok::<(), Error>(())
                })
            },
            |_ctx, _order| {
                Box::pin(async move {
                    if true {
                        panic!("audit log unavailable");
                    }
                    Ok::<(), Error>(())
                })
            },
        )
        .step_fn("Explode", |_ctx, _order| {
            Box::pin(async move {
                if true {
                    panic!("inventory index corrupted");
                }
                Ok::<(), Error>(())
            })
        })
        .build();
    let mut order = Order::default();

    let report = saga.run(&CallContext::new(), &mut order).await;

    assert!(report
        .error()
        .unwrap()
        .to_string()
        .contains("inventory index corrupted"));
    assert!(matches!(
        &report.compensations[0].outcome,
        CompensationOutcome::Failed(message) if message.contains("audit log unavailable")
    ));
    assert_eq!(
        report.compensations[1].outcome,
        CompensationOutcome::Compensated
    );
    assert_eq!(order.log, vec!["reserve", "audit", "release"]);
}

#[tokio::test(start_paused = true)]
async fn compensation_timeout_bounds_each_compensation() {
    let saga = Saga::<Order>::builder("place-order")
        .compensation_timeout(Duration::from_millis(100))
        .step(ReserveStock)
        .step_with_compensation(
            "ChargePayment",
            |_ctx, order| {
                Box::pin(async move {
                    order.note("charge");
                    Ok::<(), Error>(())
                })
            },
            |_ctx, order| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    order.note("refund");
                    Ok::<(), Error>(())
                })
            },
        )
        .step(ChargePayment { decline: true })
        .build();
    let mut order = Order::default();

    let started = tokio::time::Instant::now();
    let report = saga.run(&CallContext::new(), &mut order).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(
        &report.compensations[0].outcome,
        CompensationOutcome::Failed(message) if message.contains("deadline exceeded")
    ));
    assert_eq!(order.log, vec!["reserve", "charge", "charge", "release"]);
}

#[tokio::test]
async fn empty_saga_completes() {
    let saga: Saga<Order> = Saga::<Order>::builder("noop").build();
    let report = saga.run(&CallContext::new(), &mut Order::default()).await;

    assert!(saga.is_empty());
    assert!(report.is_success());
    assert_eq!(
        report.history,
        vec![SagaState::Pending, SagaState::Running, SagaState::Completed]
    );
}
