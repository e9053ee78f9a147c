//! In-memory search backend.
//!
//! Serves fixed pages keyed by resource type and search parameters. Used by
//! tests and for resolving saved cohort specs against fixture data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{StreamExt, stream};
use serde_json::Value;

use crate::error::BackendError;
use crate::model::ResourceKind;
use crate::traits::{PageStream, PagedSearch};

type SearchKey = (String, String);

#[derive(Debug, Clone)]
struct Failure {
    page_index: usize,
    error: BackendError,
}

/// A `PagedSearch` backed by fixture pages.
///
/// Searches that were never registered return no pages.
#[derive(Debug, Default)]
pub struct MemorySearchBackend {
    pages: HashMap<SearchKey, Vec<Vec<Value>>>,
    failures: HashMap<SearchKey, Failure>,
    fetches: AtomicUsize,
}

impl MemorySearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the pages returned for `resource?search_params`.
    #[must_use]
    pub fn with_pages(
        mut self,
        resource: ResourceKind,
        search_params: impl Into<String>,
        pages: Vec<Vec<Value>>,
    ) -> Self {
        self.pages
            .insert((resource.to_string(), search_params.into()), pages);
        self
    }

    /// Makes the fetch of page `page_index` fail for `resource?search_params`.
    ///
    /// Pages before the failing one are still served. An index past the last
    /// registered page fails after all pages were served.
    #[must_use]
    pub fn with_failure(
        mut self,
        resource: ResourceKind,
        search_params: impl Into<String>,
        page_index: usize,
        error: BackendError,
    ) -> Self {
        self.failures.insert(
            (resource.to_string(), search_params.into()),
            Failure { page_index, error },
        );
        self
    }

    /// Number of pages fetched so far, failed fetches included.
    pub fn page_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl PagedSearch for MemorySearchBackend {
    fn search_pages<'a>(
        &'a self,
        resource: &'a ResourceKind,
        search_params: &'a str,
    ) -> PageStream<'a> {
        let key = (resource.to_string(), search_params.to_string());
        let pages = self.pages.get(&key).cloned().unwrap_or_default();
        let failure = self.failures.get(&key).cloned();

        let mut results: Vec<Result<Vec<Value>, BackendError>> = Vec::new();
        for (index, page) in pages.into_iter().enumerate() {
            if failure.as_ref().is_some_and(|f| f.page_index == index) {
                break;
            }
            results.push(Ok(page));
        }
        if let Some(failure) = failure {
            results.push(Err(failure.error));
        }

        let fetches = &self.fetches;
        Box::pin(stream::iter(results).inspect(move |_| {
            fetches.fetch_add(1, Ordering::SeqCst);
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
