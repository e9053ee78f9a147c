//! # octofhir-cohort
//!
//! Cohort resolution engine.
//!
//! A cohort description is translated elsewhere into an ordered list of FHIR
//! search queries ([`CohortSpec`]). This crate runs those queries against a
//! paged search backend, maps every returned resource to the patient it
//! belongs to, and folds the per-query results into one patient set.
//!
//! ## Overview
//!
//! - [`mapper`] - resource to patient id extraction
//! - [`QueryExecutor`] - drains all pages of one query
//! - [`SetAccumulator`] - order-dependent include/exclude fold
//! - [`CohortResolver`] - runs the whole spec and packages a [`ResolvedCohort`]
//! - [`CohortService`] - translate, resolve, build the `Group`, persist
//!
//! ## Example
//!
//! ```
//! use octofhir_cohort::{CohortResolver, CohortSpec, MemorySearchBackend, Query, ResourceKind};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let backend = MemorySearchBackend::new()
//!     .with_pages(
//!         ResourceKind::Patient,
//!         "birthdate=lt1984-01-01",
//!         vec![vec![
//!             json!({ "resourceType": "Patient", "id": "1" }),
//!             json!({ "resourceType": "Patient", "id": "2" }),
//!         ]],
//!     )
//!     .with_pages(
//!         ResourceKind::Condition,
//!         "code=55822004",
//!         vec![vec![json!({ "resourceType": "Condition", "subject": { "reference": "Patient/2" } })]],
//!     );
//!
//! let spec = CohortSpec::new(
//!     "over 40 without hyperlipidemia",
//!     vec![
//!         Query::include(ResourceKind::Patient, "birthdate=lt1984-01-01"),
//!         Query::exclude(ResourceKind::Condition, "code=55822004"),
//!     ],
//! );
//!
//! let cohort = CohortResolver::new(&backend).resolve(&spec).await.unwrap();
//! assert_eq!(cohort.member_ids.to_vec(), vec!["1"]);
//! # });
//! ```

pub mod combinator;
mod error;
pub mod executor;
pub mod group;
pub mod mapper;
pub mod memory;
pub mod model;
pub mod resolver;
pub mod service;
mod traits;

pub use combinator::{SetAccumulator, combine};
pub use error::{BackendError, CohortError, CohortResult, ErrorCategory};
pub use executor::QueryExecutor;
pub use group::{GroupOptions, build_group, group_label};
pub use memory::MemorySearchBackend;
pub use model::{
    CodeExtract, CodeExtractResult, CohortSpec, ExtractedCode, PatientIdSet, Query,
    ResolvedCohort, ResourceKind, TraceAnnotation,
};
pub use resolver::CohortResolver;
pub use service::{CohortOutcome, CohortService};
pub use traits::{
    CohortRequest, GroupSink, PageStream, PagedSearch, TranslationOptions, Translator,
};

/// Type alias for a shared search backend.
pub type DynSearch = std::sync::Arc<dyn PagedSearch>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use octofhir_cohort::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{BackendError, CohortError, CohortResult};
    pub use crate::model::{CohortSpec, PatientIdSet, Query, ResolvedCohort, ResourceKind};
    pub use crate::service::{CohortOutcome, CohortService};
    pub use crate::traits::{
        CohortRequest, GroupSink, PageStream, PagedSearch, TranslationOptions, Translator,
    };
}
