use super::simulated::SimulatedDependency;
use async_trait::async_trait;
use relaykit_config::RelayConfig;
use relaykit_core::{BoxError, CallContext, Result};
use relaykit_events::EventBus;
use relaykit_saga::{Compensation, Saga, SagaConfig, SagaStep};
use relaykit_utils::resilience::{BreakerRegistry, Request, ResilientClient};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub const STEP_NAMES: [&str; 3] = ["ReserveStock", "ChargePayment", "CreateOrderRecord"];

#[derive(Debug, Default)]
pub struct OrderDraft {
    pub order_id: String,
    pub reservation: Option<String>,
    pub payment: Option<String>,
    pub record: Option<String>,
}

/// Which field of the draft a step fills in
#[derive(Debug, Clone, Copy)]
enum Slot {
    Reservation,
    Payment,
    Record,
}

/// A saga step backed by one call to a remote dependency
struct ServiceCall {
    name: &'static str,
    client: ResilientClient,
    target: &'static str,
    undo: Option<&'static str>,
    slot: Slot,
}

#[async_trait]
impl SagaStep<OrderDraft> for ServiceCall {
    fn name(&self) -> &str {
        self.name
    }

    async fn execute(&self, ctx: &CallContext, draft: &mut OrderDraft) -> Result<()> {
        let request = Request::post(self.target).json(&json!({ "order_id": draft.order_id }))?;
        let response = self.client.invoke(ctx, request).await?;
        let reference = String::from_utf8_lossy(&response.body).into_owned();
        match self.slot {
            Slot::Reservation => draft.reservation = Some(reference),
            Slot::Payment => draft.payment = Some(reference),
            Slot::Record => draft.record = Some(reference),
        }
        Ok(())
    }

    async fn compensate(&self, ctx: &CallContext, draft: &mut OrderDraft) -> Result<Compensation> {
        let Some(target) = self.undo else {
            return Ok(Compensation::NotDefined);
        };
        self.client.invoke(ctx, Request::post(target)).await?;
        match self.slot {
            Slot::Reservation => draft.reservation = None,
            Slot::Payment => draft.payment = None,
            Slot::Record => draft.record = None,
        }
        Ok(Compensation::Applied)
    }
}

/// ReserveStock, ChargePayment and CreateOrderRecord against simulated
/// dependencies; the step named `fail_at` talks to a dependency that is down
pub fn order_saga(
    config: &RelayConfig,
    registry: &BreakerRegistry,
    fail_at: Option<&str>,
) -> Result<Saga<OrderDraft>> {
    let client = |step: &str, dependency: &str| {
        let transport = if fail_at == Some(step) {
            SimulatedDependency::down(dependency)
        } else {
            SimulatedDependency::healthy(dependency)
        };
        ResilientClient::builder(dependency)
            .transport(transport)
            .registry(registry)
            .settings(&config.dependency(dependency))
            .build()
    };

    Ok(Saga::<OrderDraft>::builder("place-order")
        .config(SagaConfig::from(config))
        .step(ServiceCall {
            name: STEP_NAMES[0],
            client: client(STEP_NAMES[0], "inventory")?,
            target: "/reservations",
            undo: Some("/reservations/release"),
            slot: Slot::Reservation,
        })
        .step(ServiceCall {
            name: STEP_NAMES[1],
            client: client(STEP_NAMES[1], "payments")?,
            target: "/charges",
            undo: Some("/charges/refund"),
            slot: Slot::Payment,
        })
        .step(ServiceCall {
            name: STEP_NAMES[2],
            client: client(STEP_NAMES[2], "orders")?,
            target: "/orders",
            undo: None,
            slot: Slot::Record,
        })
        .build())
}

pub async fn execute(config: &RelayConfig, fail_at: Option<&str>) -> anyhow::Result<()> {
    let registry = BreakerRegistry::from_config(config);
    let saga = order_saga(config, &registry, fail_at)?;

    let bus = EventBus::from_config(config);
    bus.subscribe_fn("orders.*", "audit", |_ctx, event| async move {
        info!(topic = event.topic(), event_id = %event.id(), payload = %event.payload(), "order event");
        Ok::<(), BoxError>(())
    })?;

    let ctx = CallContext::new().with_correlation_id("demo-order-1");
    bus.start(&ctx).await?;

    let mut draft = OrderDraft {
        order_id: "order-1".to_string(),
        ..OrderDraft::default()
    };
    let report = saga.run(&ctx, &mut draft).await;

    let topic = if report.is_success() {
        "orders.placed"
    } else {
        "orders.failed"
    };
    bus.publish(
        &ctx,
        topic,
        json!({
            "order_id": draft.order_id,
            "state": report.state,
            "failed_step": report.failed_step,
        }),
    )
    .await?;
    bus.stop().await;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "report": report,
            "bus": bus.stats(),
        }))?
    );
    Ok(())
}
