//! Cohort data model.
//!
//! These are the shapes exchanged with the translation service (`CohortSpec`,
//! `Query`) and the shapes handed to the output consumer (`ResolvedCohort`).
//! Wire names follow the translation service payload (`searchParams`,
//! `cohortDescription`, ...).

use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// FHIR resource types a cohort query can target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceKind {
    Patient,
    Condition,
    Observation,
    Encounter,
    MedicationRequest,
    MedicationStatement,
    Procedure,
    Immunization,
    AllergyIntolerance,
    DiagnosticReport,
    Custom(String),
}

impl ResourceKind {
    /// Returns the FHIR type name.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceKind::Patient => "Patient",
            ResourceKind::Condition => "Condition",
            ResourceKind::Observation => "Observation",
            ResourceKind::Encounter => "Encounter",
            ResourceKind::MedicationRequest => "MedicationRequest",
            ResourceKind::MedicationStatement => "MedicationStatement",
            ResourceKind::Procedure => "Procedure",
            ResourceKind::Immunization => "Immunization",
            ResourceKind::AllergyIntolerance => "AllergyIntolerance",
            ResourceKind::DiagnosticReport => "DiagnosticReport",
            ResourceKind::Custom(name) => name.as_str(),
        }
    }

    pub fn is_patient(&self) -> bool {
        matches!(self, ResourceKind::Patient)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not a usable FHIR resource type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid FHIR resource type: {0}")]
pub struct InvalidResourceKind(pub String);

impl FromStr for ResourceKind {
    type Err = InvalidResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(ResourceKind::Patient),
            "Condition" => Ok(ResourceKind::Condition),
            "Observation" => Ok(ResourceKind::Observation),
            "Encounter" => Ok(ResourceKind::Encounter),
            "MedicationRequest" => Ok(ResourceKind::MedicationRequest),
            "MedicationStatement" => Ok(ResourceKind::MedicationStatement),
            "Procedure" => Ok(ResourceKind::Procedure),
            "Immunization" => Ok(ResourceKind::Immunization),
            "AllergyIntolerance" => Ok(ResourceKind::AllergyIntolerance),
            "DiagnosticReport" => Ok(ResourceKind::DiagnosticReport),
            name if is_valid_resource_type_name(name) => {
                Ok(ResourceKind::Custom(name.to_string()))
            }
            name => Err(InvalidResourceKind(name.to_string())),
        }
    }
}

impl TryFrom<String> for ResourceKind {
    type Error = InvalidResourceKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

/// FHIR resource type names start with an uppercase letter and contain only letters.
pub fn is_valid_resource_type_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_alphabetic())
}

/// A single code picked by the translation service for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCode {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// Codes extracted for one coding system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExtractResult {
    pub system_name: String,
    #[serde(default)]
    pub codes: Vec<ExtractedCode>,
}

/// One structured, backend-executable query with include/exclude polarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub resource: ResourceKind,
    /// Search parameters forwarded verbatim to the backend, e.g. `gender=female&birthdate=lt2000`.
    pub search_params: String,
    #[serde(default)]
    pub exclude: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_extract_results: Vec<CodeExtractResult>,
}

impl Query {
    pub fn include(resource: ResourceKind, search_params: impl Into<String>) -> Self {
        Self {
            resource,
            search_params: search_params.into(),
            exclude: false,
            rationale: None,
            code_extract_results: Vec::new(),
        }
    }

    pub fn exclude(resource: ResourceKind, search_params: impl Into<String>) -> Self {
        Self {
            exclude: true,
            ..Self::include(resource, search_params)
        }
    }

    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// Flattened view of one extracted code, tagged with the query resource it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExtract {
    pub resource: ResourceKind,
    pub system: String,
    pub code: String,
    pub description: String,
}

/// Output of the translation step: an ordered list of queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSpec {
    #[serde(default)]
    pub queries: Vec<Query>,
    #[serde(default)]
    pub cohort_description: String,
    /// SQL rendering of the same cohort. Informational only.
    #[serde(default)]
    pub sql: String,
}

impl CohortSpec {
    pub fn new(cohort_description: impl Into<String>, queries: Vec<Query>) -> Self {
        Self {
            queries,
            cohort_description: cohort_description.into(),
            sql: String::new(),
        }
    }

    /// All extracted codes across queries, in query order.
    pub fn code_extracts(&self) -> Vec<CodeExtract> {
        self.queries
            .iter()
            .flat_map(|query| {
                query.code_extract_results.iter().flat_map(move |result| {
                    result.codes.iter().map(move |code| CodeExtract {
                        resource: query.resource.clone(),
                        system: result.system_name.clone(),
                        code: code.code.clone(),
                        description: code.description.clone(),
                    })
                })
            })
            .collect()
    }
}

/// Insertion-ordered set of patient identifiers. First appearance wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientIdSet(IndexSet<String>);

impl PatientIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an id, returning `false` if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<String> for PatientIdSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PatientIdSet {
    type Item = String;
    type IntoIter = indexmap::set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Per-query audit record kept alongside the resolved members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceAnnotation {
    pub filter_expression: String,
    pub exclude: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl From<&Query> for TraceAnnotation {
    fn from(query: &Query) -> Self {
        Self {
            filter_expression: query.search_params.clone(),
            exclude: query.exclude,
            rationale: query.rationale.clone(),
        }
    }
}

/// Final result of a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCohort {
    pub member_ids: PatientIdSet,
    /// One entry per input query, in input order.
    pub traceability: Vec<TraceAnnotation>,
    pub cohort_description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_extracts: Vec<CodeExtract>,
}
