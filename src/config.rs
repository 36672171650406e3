use clap::ValueEnum;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{DEFAULT_DATABASE_PATH, DEFAULT_LOG_DIR, DEFAULT_SOURCE_PATH, EMPLOYEES_TABLE};
use crate::error::{PipelineError, Result};

pub const ENV_SOURCE: &str = "EMPLOYEE_PIPELINE_SOURCE";
pub const ENV_DATABASE: &str = "EMPLOYEE_PIPELINE_DATABASE";
pub const ENV_BACKEND: &str = "EMPLOYEE_PIPELINE_BACKEND";
pub const ENV_LOG_DIR: &str = "EMPLOYEE_PIPELINE_LOG_DIR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
    pub load: LoadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SOURCE_PATH),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
            table: EMPLOYEES_TABLE.to_string(),
        }
    }
}

/// What the loader does with a birthdate the transformer could not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnparsedBirthdatePolicy {
    /// Store the original text unchanged
    #[default]
    Keep,
    /// Store NULL
    Null,
    /// Fail the load; nothing is committed
    Reject,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub unparsed_birthdate: UnparsedBirthdatePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: "employee_pipeline.log".to_string(),
        }
    }
}

impl Config {
    /// Read `path` if it exists, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                PipelineError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
            })?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from any key lookup (the process environment in practice)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(source) = lookup(ENV_SOURCE) {
            self.source.path = PathBuf::from(source);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.database.path = PathBuf::from(database);
        }
        if let Some(backend) = lookup(ENV_BACKEND) {
            self.database.backend = BackendKind::from_str(&backend, true).map_err(|_| {
                PipelineError::Config(format!("{} must be 'sqlite' or 'memory', got '{}'", ENV_BACKEND, backend))
            })?;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.logging.dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.source.path, PathBuf::from("employees_data.csv"));
        assert_eq!(config.database.backend, BackendKind::Sqlite);
        assert_eq!(config.database.table, "employees");
        assert_eq!(config.load.unparsed_birthdate, UnparsedBirthdatePolicy::Keep);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [database]
            backend = "memory"

            [load]
            unparsed_birthdate = "null"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.backend, BackendKind::Memory);
        assert_eq!(config.database.path, PathBuf::from("employees.db"));
        assert_eq!(config.load.unparsed_birthdate, UnparsedBirthdatePolicy::Null);
        assert_eq!(config.source.path, PathBuf::from("employees_data.csv"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(matches!(
            Config::from_toml("[database]\nbackend = \"oracle\""),
            Err(PipelineError::Toml(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_SOURCE, "in.csv"),
            (ENV_DATABASE, "out.db"),
            (ENV_BACKEND, "MEMORY"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.source.path, PathBuf::from("in.csv"));
        assert_eq!(config.database.path, PathBuf::from("out.db"));
        assert_eq!(config.database.backend, BackendKind::Memory);
    }

    #[test]
    fn test_bad_backend_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| (key == ENV_BACKEND).then(|| "oracle".to_string()));
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
