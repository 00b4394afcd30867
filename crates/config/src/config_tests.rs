//! Unit tests for configuration loading and validation

#[cfg(test)]
mod tests {
    use crate::{ConfigLoader, DependencySettings, RelayConfig, RetrySettings};
    use relaykit_core::ErrorKind;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn no_env() -> Vec<(String, String)> {
        Vec::new()
    }

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.breaker.max_failures, 5);
        assert_eq!(config.breaker.open_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.client.call_timeout(), Duration::from_secs(5));
        assert_eq!(config.bus.shutdown_grace(), Duration::from_secs(5));
        assert_eq!(
            config.saga.compensation_timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = ConfigLoader::new().env_vars(no_env()).load().unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(
            r#"{
                "service_name": "orders",
                "breaker": { "max_failures": 3 },
                "dependencies": {
                    "payments": {
                        "breaker": { "max_failures": 2, "open_timeout_ms": 1000 },
                        "call_timeout_ms": 250
                    }
                }
            }"#,
        );

        let config = ConfigLoader::new()
            .file(file.path())
            .env_vars(no_env())
            .load()
            .unwrap();

        assert_eq!(config.service_name, "orders");
        assert_eq!(config.breaker.max_failures, 3);
        // Unspecified fields keep their defaults
        assert_eq!(config.breaker.open_timeout_ms, 30_000);
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.dependencies.len(), 1);
    }

    #[test]
    fn test_dependency_resolution() {
        let mut config = RelayConfig::default();
        config.dependencies.insert(
            "payments".to_string(),
            DependencySettings {
                call_timeout_ms: Some(250),
                ..Default::default()
            },
        );

        let payments = config.dependency("payments");
        assert_eq!(payments.client.call_timeout(), Duration::from_millis(250));
        assert_eq!(payments.breaker, config.breaker);

        let unknown = config.dependency("inventory");
        assert_eq!(unknown.client, config.client);
        assert_eq!(unknown.retry, config.retry);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_config(r#"{ "service_name": "orders", "retry": { "max_retries": 1 } }"#);

        let config = ConfigLoader::new()
            .file(file.path())
            .env_vars([
                ("RELAYKIT_SERVICE_NAME", "billing"),
                ("RELAYKIT_RETRY_MAX_RETRIES", "7"),
                ("RELAYKIT_BUS_SHUTDOWN_GRACE_MS", "1500"),
                ("RELAYKIT_SAGA_COMPENSATION_TIMEOUT_MS", "none"),
                ("UNRELATED", "ignored"),
            ])
            .load()
            .unwrap();

        assert_eq!(config.service_name, "billing");
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.bus.shutdown_grace(), Duration::from_millis(1500));
        assert_eq!(config.saga.compensation_timeout(), None);
    }

    #[test]
    fn test_custom_env_prefix() {
        let config = ConfigLoader::new()
            .env_prefix("MYAPP")
            .env_vars([
                ("MYAPP_BREAKER_MAX_FAILURES", "9"),
                ("RELAYKIT_BREAKER_MAX_FAILURES", "2"),
            ])
            .load()
            .unwrap();

        assert_eq!(config.breaker.max_failures, 9);
    }

    #[test]
    fn test_invalid_env_value() {
        let err = ConfigLoader::new()
            .env_vars([("RELAYKIT_BREAKER_MAX_FAILURES", "many")])
            .load()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("RELAYKIT_BREAKER_MAX_FAILURES"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let file = write_config(r#"{ "breaker": { "max_failure": 3 } }"#);

        let err = ConfigLoader::new()
            .file(file.path())
            .env_vars(no_env())
            .load()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .file("/nonexistent/relaykit.json")
            .env_vars(no_env())
            .load()
            .unwrap_err();

        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = RelayConfig::default();
        config.breaker.max_failures = 0;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.retry.jitter_factor = 1.5;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.retry.max_delay_ms = 10;
        config.retry.base_delay_ms = 100;
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.service_name = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.dependencies.insert(
            "payments".to_string(),
            DependencySettings {
                call_timeout_ms: Some(0),
                ..Default::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dependencies.payments"));
    }
}
