//! Collaborator traits for the cohort engine.
//!
//! The engine talks to three external systems, each behind a trait:
//! - [`PagedSearch`] - runs a FHIR search and yields its pages lazily
//! - [`Translator`] - turns free text into a [`CohortSpec`]
//! - [`GroupSink`] - stores the assembled `Group` resource
//!
//! All traits are object-safe and `Send + Sync` so implementations can be
//! shared behind `Arc<dyn ...>`.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, CohortResult};
use crate::model::{CohortSpec, ResourceKind};

/// A lazy, finite sequence of search result pages.
///
/// Each item is one page of resources. The stream ends when the backend has no
/// further pages; a failed fetch yields `Err` and the consumer stops there.
pub type PageStream<'a> = Pin<Box<dyn Stream<Item = Result<Vec<Value>, BackendError>> + Send + 'a>>;

/// A search backend that serves results page by page.
///
/// Pagination cursors stay inside the implementation. Pages must be produced
/// in the order the backend serves them.
pub trait PagedSearch: Send + Sync {
    /// Starts a search for `resource` with `search_params` forwarded verbatim.
    fn search_pages<'a>(&'a self, resource: &'a ResourceKind, search_params: &'a str)
    -> PageStream<'a>;

    /// Returns the name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}

fn default_exclude_deceased() -> bool {
    true
}

/// Options understood by the translation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOptions {
    /// Include the extracted coding details per query.
    #[serde(default)]
    pub include_extract_results: bool,
    /// Include a natural-language rationale per query.
    #[serde(default)]
    pub include_rationale: bool,
    /// Append a query that removes deceased patients.
    #[serde(default = "default_exclude_deceased")]
    pub exclude_deceased: bool,
    /// SQL dialect for the informational `sql` rendering (e.g. `bigquery`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_syntax: Option<String>,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            include_extract_results: false,
            include_rationale: false,
            exclude_deceased: default_exclude_deceased(),
            sql_syntax: None,
        }
    }
}

/// Free-text cohort request, as sent to the translation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortRequest {
    pub text: String,
    #[serde(default)]
    pub config: TranslationOptions,
}

impl CohortRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            config: TranslationOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, config: TranslationOptions) -> Self {
        self.config = config;
        self
    }
}

/// Natural-language to query translation.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translates a request into an ordered query list.
    ///
    /// # Errors
    ///
    /// Returns `CohortError::TranslationFailure` when the service rejects the
    /// request or returns a payload that is not a cohort spec.
    async fn translate(&self, request: &CohortRequest) -> CohortResult<CohortSpec>;
}

/// Stores the assembled cohort `Group`.
#[async_trait]
pub trait GroupSink: Send + Sync {
    /// Persists `group` and returns the stored resource (with server-assigned id).
    ///
    /// # Errors
    ///
    /// Returns `CohortError::Persistence` when the store rejects the resource.
    async fn persist(&self, group: Value) -> CohortResult<Value>;
}
