//! Layered configuration for the OData query engine (spec §6 limits, dialect
//! selection, DB pool settings): defaults, overlaid by an optional TOML file,
//! overlaid by `ODATA__`-prefixed environment variables, with file hot-reload.

mod loader;
mod reload;
mod settings;

pub use loader::{load_config, load_config_with_default_path, ConfigError, Result};
pub use reload::ReloadableConfig;
pub use settings::{DatabaseSettings, LimitsSettings, LoggingSettings, OdataConfig, ServerSettings};
