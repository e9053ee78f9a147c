use anyhow::Result;
use colored::Colorize;
use octofhir_cohort::{CohortOutcome, CohortSpec};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn polarity(exclude: bool) -> &'static str {
    if exclude { "exclude" } else { "include" }
}

pub fn print_spec(spec: &CohortSpec, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(spec),
        OutputFormat::Table => {
            println!("{} {}", "Cohort:".cyan(), spec.cohort_description);
            if spec.queries.is_empty() {
                println!("No queries.");
            } else {
                let mut builder = Builder::default();
                builder.push_record(["#", "Resource", "Search", "Mode", "Rationale"]);
                for (i, query) in spec.queries.iter().enumerate() {
                    builder.push_record([
                        (i + 1).to_string(),
                        query.resource.to_string(),
                        query.search_params.clone(),
                        polarity(query.exclude).to_string(),
                        query.rationale.clone().unwrap_or_else(|| "-".into()),
                    ]);
                }
                println!("{}", builder.build().with(Style::rounded()));
            }

            let codes = spec.code_extracts();
            if !codes.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["Resource", "System", "Code", "Description"]);
                for code in codes {
                    builder.push_record([
                        code.resource.to_string(),
                        code.system,
                        code.code,
                        code.description,
                    ]);
                }
                println!("{}", builder.build().with(Style::rounded()));
            }
            if !spec.sql.is_empty() {
                println!("{}\n{}", "SQL:".cyan(), spec.sql);
            }
            Ok(())
        }
    }
}

pub fn print_outcome(outcome: &CohortOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Table => {
            let cohort = &outcome.cohort;
            println!("{} {}", "Cohort:".cyan(), cohort.cohort_description);

            let mut builder = Builder::default();
            builder.push_record(["#", "Search", "Mode", "Rationale"]);
            for (i, step) in cohort.traceability.iter().enumerate() {
                builder.push_record([
                    (i + 1).to_string(),
                    step.filter_expression.clone(),
                    polarity(step.exclude).to_string(),
                    step.rationale.clone().unwrap_or_else(|| "-".into()),
                ]);
            }
            println!("{}", builder.build().with(Style::rounded()));

            if cohort.member_ids.is_empty() {
                println!("No patients matched.");
            } else {
                let mut builder = Builder::default();
                builder.push_record(["Patient"]);
                for id in cohort.member_ids.iter() {
                    builder.push_record([format!("Patient/{id}")]);
                }
                println!("{}", builder.build().with(Style::rounded()));
            }
            println!("Members: {}", cohort.member_ids.len());

            if outcome.persisted {
                let id = outcome
                    .group
                    .get("id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("?");
                println!("{} Group/{}", "Stored:".cyan(), id.cyan());
            }
            Ok(())
        }
    }
}
