//! The layered settings object: defaults, overlaid by an optional TOML file,
//! overlaid by `ODATA__`-prefixed environment variables.

use odata_lang::Limits;
use serde::{Deserialize, Serialize};

/// Query-option limits (spec §6), deserialized with [`Limits`]'s own
/// defaults filling any field the file/env layers don't set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSettings(pub Limits);

impl Default for LimitsSettings {
    fn default() -> Self {
        Self(Limits::default())
    }
}

/// Connection-pool settings, mirroring `odata-db-postgres::PostgresConfig`
/// without introducing a dependency edge from config onto a concrete
/// `DatabaseProvider` realization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
    pub min_connections: Option<u32>,
    pub connect_timeout_ms: u64,
    pub idle_timeout_ms: Option<u64>,
    pub max_lifetime_secs: Option<u64>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/odata".into(),
            pool_size: 10,
            min_connections: None,
            connect_timeout_ms: 5000,
            idle_timeout_ms: Some(300_000),
            max_lifetime_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 8080 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

/// The full, merged configuration object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OdataConfig {
    pub dialect: String,
    pub limits: LimitsSettings,
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

impl OdataConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.database.url.is_empty() {
            return Err("database.url must be set".into());
        }
        if self.limits.0.max_top == 0 {
            return Err("limits.max_top must be > 0".into());
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        odata_dialect_exists(&self.dialect)?;
        Ok(())
    }
}

impl Default for OdataConfig {
    fn default() -> Self {
        Self {
            dialect: "postgres".into(),
            limits: LimitsSettings::default(),
            database: DatabaseSettings::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn odata_dialect_exists(name: &str) -> Result<(), String> {
    match name.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" | "mysql" | "oracle" => Ok(()),
        other => Err(format!("unknown dialect '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(OdataConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_port() {
        let mut cfg = OdataConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_dialect() {
        let mut cfg = OdataConfig::default();
        cfg.dialect = "nosql".into();
        assert!(cfg.validate().is_err());
    }
}
