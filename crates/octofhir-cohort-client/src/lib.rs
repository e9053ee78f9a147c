//! HTTP collaborators for `octofhir-cohort`.
//!
//! - [`PhenomlTranslator`] - free text to [`CohortSpec`](octofhir_cohort::CohortSpec)
//!   through the translation service
//! - [`FhirClient`] - paged FHIR search and `Group` creation

pub mod auth;
pub mod config;
mod fhir;
mod translator;

pub use config::{DEFAULT_FHIR_URL, DEFAULT_PHENOML_URL, FhirServerConfig, PhenomlConfig};
pub use fhir::FhirClient;
pub use translator::PhenomlTranslator;
