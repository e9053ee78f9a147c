use octofhir_cohort::GroupOptions;
use octofhir_cohort::group::DEFAULT_EXTENSION_URL;
use octofhir_cohort_client::{FhirServerConfig, PhenomlConfig};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "octofhir-cohort.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub phenoml: PhenomlConfig,
    #[serde(default)]
    pub fhir: FhirServerConfig,
    #[serde(default)]
    pub group: GroupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.phenoml.validate()?;
        self.fhir.validate()?;
        if self.group.extension_url.trim().is_empty() {
            return Err("group.extension_url must not be empty".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }
}

fn default_extension_url() -> String {
    DEFAULT_EXTENSION_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default = "default_extension_url")]
    pub extension_url: String,
    /// POST the assembled Group to the FHIR server without `--persist`.
    #[serde(default)]
    pub persist: bool,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            extension_url: default_extension_url(),
            persist: false,
        }
    }
}

impl GroupConfig {
    pub fn options(&self) -> GroupOptions {
        GroupOptions {
            extension_url: self.extension_url.clone(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, DEFAULT_CONFIG_FILE};
    use config::{Config, Environment, File, FileFormat, FileSourceFile};
    use std::path::{Path, PathBuf};

    /// Prefix of override variables, e.g. `OCTOFHIR_COHORT__FHIR__PAGE_SIZE=200`.
    pub const ENV_PREFIX: &str = "OCTOFHIR_COHORT";

    /// An explicit path must name an existing file; the default file is optional.
    fn file_source(path: Option<&str>) -> Result<File<FileSourceFile, FileFormat>, String> {
        let (file, required) = match path {
            Some(p) if !Path::new(p).is_file() => {
                return Err(format!("config file not found: {p}"));
            }
            Some(p) => (PathBuf::from(p), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        Ok(File::from(file).format(FileFormat::Toml).required(required))
    }

    fn env_source() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    /// Reads the TOML file, layers `OCTOFHIR_COHORT__*` variables over it and validates.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let cfg: AppConfig = Config::builder()
            .add_source(file_source(path)?)
            .add_source(env_source())
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| format!("failed to load configuration: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(!cfg.group.persist);
        assert_eq!(cfg.group.options(), GroupOptions::default());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }
}
