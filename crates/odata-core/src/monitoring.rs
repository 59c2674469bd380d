use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl Default for HealthStatus {
    fn default() -> Self {
        HealthStatus::Unknown
    }
}

/// One probe result, e.g. "database pool" or "parse cache", reported by
/// `/healthz` and `/readyz` (§6 expansion) without exposing row data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub checked_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    pub details: HashMap<String, serde_json::Value>,
}

impl HealthCheck {
    fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            checked_at: OffsetDateTime::now_utc(),
            response_time_ms: None,
            details: HashMap::new(),
        }
    }

    pub fn healthy(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Healthy, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Warning, message)
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Critical, message)
    }

    pub fn with_response_time(mut self, duration: Duration) -> Self {
        self.response_time_ms = Some(duration.as_millis() as u64);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthStatus::Healthy)
    }
}

/// Aggregate report assembled by the server's `/healthz` handler from the
/// individual probes (DB pool, parse cache, …).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemHealth {
    pub checks: HashMap<String, HealthCheck>,
}

impl SystemHealth {
    pub fn add(&mut self, name: impl Into<String>, check: HealthCheck) {
        self.checks.insert(name.into(), check);
    }

    pub fn overall_status(&self) -> HealthStatus {
        if self.checks.is_empty() {
            return HealthStatus::Unknown;
        }
        if self.checks.values().any(|c| matches!(c.status, HealthStatus::Critical)) {
            return HealthStatus::Critical;
        }
        if self.checks.values().any(|c| matches!(c.status, HealthStatus::Warning)) {
            return HealthStatus::Warning;
        }
        if self.checks.values().all(HealthCheck::is_healthy) {
            return HealthStatus::Healthy;
        }
        HealthStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_status_is_critical_if_any_check_is() {
        let mut health = SystemHealth::default();
        health.add("db", HealthCheck::healthy("ok"));
        health.add("cache", HealthCheck::critical("unreachable"));
        assert_eq!(health.overall_status(), HealthStatus::Critical);
    }

    #[test]
    fn overall_status_is_healthy_when_all_checks_pass() {
        let mut health = SystemHealth::default();
        health.add("db", HealthCheck::healthy("ok"));
        health.add("cache", HealthCheck::healthy("ok"));
        assert_eq!(health.overall_status(), HealthStatus::Healthy);
    }

    #[test]
    fn empty_system_is_unknown() {
        assert_eq!(SystemHealth::default().overall_status(), HealthStatus::Unknown);
    }
}
