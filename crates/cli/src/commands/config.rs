use anyhow::Context;
use relaykit_config::RelayConfig;
use serde_json::json;

/// The configuration plus the policy each declared dependency resolves to
pub fn render(config: &RelayConfig) -> anyhow::Result<serde_json::Value> {
    let mut value = serde_json::to_value(config).context("failed to serialize configuration")?;

    let resolved: serde_json::Map<_, _> = config
        .dependencies
        .keys()
        .map(|name| {
            let policy = config.dependency(name);
            (
                name.clone(),
                json!({
                    "breaker": policy.breaker,
                    "retry": policy.retry,
                    "client": policy.client,
                }),
            )
        })
        .collect();
    if let Some(object) = value.as_object_mut() {
        object.insert("resolved_dependencies".to_string(), resolved.into());
    }

    Ok(value)
}

pub fn execute(config: &RelayConfig) -> anyhow::Result<()> {
    let value = render(config)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
