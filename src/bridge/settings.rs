use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of the exchange, warmup, keepalive and teardown.
///
/// # JSON Example
///
/// ```json
/// {
///   "wait_budget_secs": 30,
///   "poll_timeout_ms": 1000,
///   "warmup_attempts": 20,
///   "keepalive_interval_secs": 600
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSettings {
    /// Total time a lookup waits for its reply.
    #[serde(default = "default_wait_budget_secs")]
    pub wait_budget_secs: u64,

    /// Upper bound of a single subscriber poll in the reply reader.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    #[serde(default = "default_warmup_attempts")]
    pub warmup_attempts: u32,

    #[serde(default = "default_poll_timeout_ms")]
    pub warmup_poll_timeout_ms: u64,

    /// Set to 0 to run without a keepalive task.
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    /// Bounded wait when joining background tasks on close.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
}

fn default_wait_budget_secs() -> u64 {
    30
}
fn default_poll_timeout_ms() -> u64 {
    1000
}
fn default_warmup_attempts() -> u32 {
    20
}
fn default_keepalive_interval_secs() -> u64 {
    600
}
fn default_join_timeout_ms() -> u64 {
    5000
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_flush_timeout_ms() -> u64 {
    5000
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            wait_budget_secs: default_wait_budget_secs(),
            poll_timeout_ms: default_poll_timeout_ms(),
            warmup_attempts: default_warmup_attempts(),
            warmup_poll_timeout_ms: default_poll_timeout_ms(),
            keepalive_interval_secs: default_keepalive_interval_secs(),
            join_timeout_ms: default_join_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            flush_timeout_ms: default_flush_timeout_ms(),
        }
    }
}

impl ExchangeSettings {
    pub fn wait_budget(&self) -> Duration {
        Duration::from_secs(self.wait_budget_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn warmup_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.warmup_poll_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Option<Duration> {
        match self.keepalive_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ExchangeSettings::default();
        assert_eq!(settings.wait_budget(), Duration::from_secs(30));
        assert_eq!(settings.warmup_attempts, 20);
        assert_eq!(settings.warmup_poll_timeout(), Duration::from_secs(1));
        assert_eq!(settings.keepalive_interval(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: ExchangeSettings =
            serde_json::from_str(r#"{"wait_budget_secs": 5, "keepalive_interval_secs": 0}"#)
                .unwrap();
        assert_eq!(settings.wait_budget(), Duration::from_secs(5));
        assert_eq!(settings.keepalive_interval(), None);
        assert_eq!(settings.poll_timeout(), Duration::from_secs(1));
    }
}
