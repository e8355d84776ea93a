pub mod csv;
pub mod json;
pub mod markdown;

use crate::errors::Result;
use crate::parse::{Endpoint, ParamKind};
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Default, Clone, Copy, ValueEnum, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
    #[default]
    Md,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| format!("unknown output format: {s}"))
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Md => write!(f, "md"),
        }
    }
}

/// Render endpoints in the chosen format.
pub fn write_endpoints<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    endpoints: &[Endpoint],
) -> Result<()> {
    match format {
        OutputFormat::Json => json::write_json(writer, endpoints),
        OutputFormat::Csv => csv::write_csv(writer, endpoints),
        OutputFormat::Md => markdown::write_markdown(writer, endpoints),
    }
}

/// Parameter names grouped by kind, in `ParamKind` order, skipping empty kinds.
pub(crate) fn parameter_groups(endpoint: &Endpoint) -> Vec<(ParamKind, String)> {
    ParamKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let names: Vec<&str> = endpoint.parameters_of(kind).map(|p| p.name.as_str()).collect();
            (!names.is_empty()).then(|| (kind, names.join(", ")))
        })
        .collect()
}

/// `Yes` when any auth mechanism was seen, otherwise `Unknown`.
pub(crate) fn auth_label(endpoint: &Endpoint) -> &'static str {
    if endpoint.is_authenticated() {
        "Yes"
    } else {
        "Unknown"
    }
}
