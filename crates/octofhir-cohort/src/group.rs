//! FHIR `Group` assembly for a resolved cohort.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::model::{ResolvedCohort, TraceAnnotation};

/// Name used when the cohort has no description.
pub const DEFAULT_GROUP_NAME: &str = "Cohort Group";

/// Extension URL used for the criteria block when none is configured.
pub const DEFAULT_EXTENSION_URL: &str =
    "https://octofhir.io/fhir/StructureDefinition/cohort-query";

static WHITESPACE_RUN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\s+").expect("Invalid whitespace regex"));

fn default_extension_url() -> String {
    DEFAULT_EXTENSION_URL.to_string()
}

/// Options for building the `Group` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOptions {
    /// URL of the extension holding the per-query criteria.
    #[serde(default = "default_extension_url")]
    pub extension_url: String,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            extension_url: default_extension_url(),
        }
    }
}

fn group_name(description: &str) -> &str {
    if description.is_empty() {
        DEFAULT_GROUP_NAME
    } else {
        description
    }
}

/// Identifier value for a cohort: the name with each whitespace run replaced by `-`.
///
/// ```
/// use octofhir_cohort::group::group_label;
///
/// assert_eq!(group_label("over 40  with\thyperlipidemia"), "over-40-with-hyperlipidemia");
/// assert_eq!(group_label(""), "Cohort-Group");
/// ```
pub fn group_label(description: &str) -> String {
    WHITESPACE_RUN
        .replace_all(group_name(description), "-")
        .into_owned()
}

fn criteria_extension(annotation: &TraceAnnotation) -> Value {
    let mut elements = vec![
        json!({ "url": "query", "valueString": annotation.filter_expression }),
        json!({ "url": "exclude", "valueBoolean": annotation.exclude }),
    ];
    if let Some(rationale) = &annotation.rationale {
        elements.push(json!({ "url": "rationale", "valueString": rationale }));
    }
    json!({ "url": "criteria", "extension": elements })
}

/// Builds the `Group` resource handed to the output consumer.
pub fn build_group(cohort: &ResolvedCohort, options: &GroupOptions) -> Value {
    let members: Vec<Value> = cohort
        .member_ids
        .iter()
        .map(|id| json!({ "entity": { "reference": format!("Patient/{id}") } }))
        .collect();
    let criteria: Vec<Value> = cohort.traceability.iter().map(criteria_extension).collect();

    json!({
        "resourceType": "Group",
        "name": group_name(&cohort.cohort_description),
        "active": false,
        "type": "person",
        "actual": true,
        "extension": [
            { "url": options.extension_url, "extension": criteria }
        ],
        "identifier": [
            { "value": group_label(&cohort.cohort_description) }
        ],
        "member": members,
    })
}
