//! Connection settings for the HTTP collaborators.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_PHENOML_URL: &str = "https://experiment.pheno.ml";
pub const DEFAULT_FHIR_URL: &str = "http://localhost:8080/fhir";

fn default_phenoml_url() -> String {
    DEFAULT_PHENOML_URL.into()
}
fn default_fhir_url() -> String {
    DEFAULT_FHIR_URL.into()
}
fn default_timeout_ms() -> u64 {
    30_000
}

fn validate_url(field: &str, value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("{field} is not a valid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{field} must use http or https"));
    }
    Ok(())
}

/// Translation service settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct PhenomlConfig {
    #[serde(default = "default_phenoml_url")]
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    /// For security, prefer the OCTOFHIR_COHORT__PHENOML__CLIENT_SECRET env var
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PhenomlConfig {
    fn default() -> Self {
        Self {
            base_url: default_phenoml_url(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl fmt::Debug for PhenomlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhenomlConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl PhenomlConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_url("phenoml.base_url", &self.base_url)?;
        if self.timeout_ms == 0 {
            return Err("phenoml.timeout_ms must be > 0".into());
        }
        Ok(())
    }

    /// Credentials are only needed by commands that call the translator.
    pub fn require_credentials(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() || self.client_secret.is_empty() {
            return Err("phenoml.client_id and phenoml.client_secret are required".into());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// FHIR server settings. `base_url` is the FHIR base (e.g. `https://host/fhir`).
#[derive(Clone, Serialize, Deserialize)]
pub struct FhirServerConfig {
    #[serde(default = "default_fhir_url")]
    pub base_url: String,
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Value sent as `_count` unless the query sets one itself.
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for FhirServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_fhir_url(),
            bearer_token: None,
            page_size: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl fmt::Debug for FhirServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FhirServerConfig")
            .field("base_url", &self.base_url)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "***"))
            .field("page_size", &self.page_size)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl FhirServerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_url("fhir.base_url", &self.base_url)?;
        if self.page_size == Some(0) {
            return Err("fhir.page_size must be > 0".into());
        }
        if self.timeout_ms == 0 {
            return Err("fhir.timeout_ms must be > 0".into());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
