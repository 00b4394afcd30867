/// Constants used throughout the relaykit codebase
// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "RELAYKIT";

// Log filter variable honoured by the tracing subscriber
pub const RELAYKIT_LOG_VAR: &str = "RELAYKIT_LOG";

// Default producing-service identifier stamped on events
pub const DEFAULT_SERVICE_NAME: &str = "relaykit";

// Topic wildcard matching every topic
pub const TOPIC_WILDCARD: &str = "*";

// Topic segment separator
pub const TOPIC_SEPARATOR: char = '.';
