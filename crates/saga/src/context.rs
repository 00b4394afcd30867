//! Untyped saga data for sagas composed at runtime

use relaykit_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String-keyed bag of JSON values shared by the steps of one invocation.
///
/// Sagas whose steps are known at compile time should use a typed struct
/// instead; this exists for steps assembled from configuration or plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicContext {
    values: BTreeMap<String, serde_json::Value>,
}

impl DynamicContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| Error::Json {
            message: format!("saga context value '{key}'"),
            source: e,
        })?;
        self.values.insert(key, value);
        Ok(())
    }

    /// Read `key` as `T`; `None` when absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.values
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| Error::Json {
                    message: format!("saga context value '{key}'"),
                    source: e,
                })
            })
            .transpose()
    }

    /// Read `key` as `T`, failing when an earlier step did not provide it
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key)?.ok_or_else(|| {
            Error::non_retryable(
                "saga context",
                format!("required value '{key}' was not set by an earlier step"),
            )
        })
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaykit_core::ErrorKind;

    #[test]
    fn test_typed_access() {
        let mut ctx = DynamicContext::new();
        ctx.insert("reservation_id", "res-9").unwrap();
        ctx.insert("quantity", 3u32).unwrap();

        assert_eq!(ctx.get::<String>("reservation_id").unwrap().as_deref(), Some("res-9"));
        assert_eq!(ctx.require::<u32>("quantity").unwrap(), 3);
        assert_eq!(ctx.get::<u32>("missing").unwrap(), None);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_require_missing_is_non_retryable() {
        let ctx = DynamicContext::new();
        let err = ctx.require::<String>("payment_id").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonRetryable);
        assert!(err.to_string().contains("payment_id"));
    }

    #[test]
    fn test_wrong_type_is_json_error() {
        let mut ctx = DynamicContext::new();
        ctx.insert("quantity", "three").unwrap();
        let err = ctx.get::<u32>("quantity").unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
    }

    #[test]
    fn test_remove() {
        let mut ctx = DynamicContext::new();
        ctx.insert("k", true).unwrap();
        assert!(ctx.contains("k"));
        assert_eq!(ctx.remove("k"), Some(serde_json::Value::Bool(true)));
        assert!(ctx.is_empty());
    }
}
