//! Builds an [`OdataConfig`] by layering defaults, an optional TOML file,
//! then `ODATA__`-prefixed environment variables on top, e.g.
//! `ODATA__LIMITS__MAX_TOP=500` or `ODATA__DATABASE__URL=postgres://...`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};

use crate::settings::OdataConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Loads configuration from an optional file path, falling back to
/// `odata.toml` in the working directory when `path` is `None` and that
/// file exists, then applying environment overrides and validating.
pub fn load_config(path: Option<&str>) -> Result<OdataConfig> {
    let mut builder = Config::builder();

    let candidate = path.map(PathBuf::from).or_else(|| {
        let default_path = PathBuf::from("odata.toml");
        default_path.exists().then_some(default_path)
    });
    if let Some(candidate) = candidate.filter(|p| p.exists()) {
        builder = builder.add_source(File::new(&candidate.to_string_lossy(), FileFormat::Toml));
    }

    builder = builder.add_source(Environment::with_prefix("ODATA").try_parsing(true).separator("__"));

    let cfg = builder.build()?;
    let merged: OdataConfig = cfg.try_deserialize()?;
    merged.validate().map_err(ConfigError::Invalid)?;
    Ok(merged)
}

pub fn load_config_with_default_path<P: AsRef<Path>>(path: Option<P>) -> Result<OdataConfig> {
    let p = path.as_ref().map(|p| p.as_ref().to_string_lossy().to_string());
    load_config(p.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_defaults_without_a_file() {
        let cfg = load_config(Some("/nonexistent/odata.toml")).unwrap();
        assert_eq!(cfg.dialect, "postgres");
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dialect = \"mysql\"\n[limits]\nmax_top = 50\n").unwrap();
        let cfg = load_config(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(cfg.dialect, "mysql");
        assert_eq!(cfg.limits.0.max_top, 50);
    }
}
