//! Command-line front end for `octofhir-cohort`.

pub mod cli;
pub mod commands;
pub mod config;
pub mod observability;
pub mod output;
