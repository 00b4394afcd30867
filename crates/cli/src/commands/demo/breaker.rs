use super::simulated::SimulatedDependency;
use relaykit_config::RelayConfig;
use relaykit_core::CallContext;
use relaykit_utils::resilience::{BreakerRegistry, Request, ResilientClient};
use serde_json::json;
use std::collections::BTreeMap;

const DEPENDENCY: &str = "inventory";

pub async fn execute(config: &RelayConfig, failures: u32, calls: u32) -> anyhow::Result<()> {
    let registry = BreakerRegistry::from_config(config);
    let client = ResilientClient::builder(DEPENDENCY)
        .transport(SimulatedDependency::new(DEPENDENCY, failures))
        .registry(&registry)
        .settings(&config.dependency(DEPENDENCY))
        .build()?;

    let ctx = CallContext::new().with_correlation_id("demo-breaker");
    for call in 1..=calls {
        let outcome = match client.invoke(&ctx, Request::get("/stock/42")).await {
            Ok(response) => format!("ok {}", response.status),
            Err(e) => format!("{}: {e}", e.kind()),
        };
        println!(
            "call {call:>3}  breaker={:<9}  {outcome}",
            client.breaker().state().to_string()
        );
    }

    let breakers: BTreeMap<_, _> = registry.snapshot().into_iter().collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "breakers": breakers }))?
    );
    Ok(())
}
