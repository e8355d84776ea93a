pub mod ignore;
pub mod provenance;
pub mod resolve;
pub mod schema;
pub mod show;

use crate::filter::{AuthFilter, EndpointFilter};
use crate::output::OutputFormat;
use crate::walk::{DiscoveryOptions, LanguageSelection};
use provenance::ProvenanceMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Fully resolved configuration — no Option fields.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    // Operational
    pub format: OutputFormat,
    pub lang: LanguageSelection,
    pub quiet: bool,

    // Targeting
    /// Lowercase extensions without the dot; empty means every supported file.
    pub ext: BTreeSet<String>,
    pub exclude_ext: BTreeSet<String>,
    pub ignore_paths: Vec<String>,
    /// Globs from `.apiscanignore`.
    pub ignore_patterns: Vec<String>,

    // Filters
    pub include_verbs: Vec<String>,
    pub exclude_verbs: Vec<String>,
    pub auth: AuthFilter,

    // Provenance
    pub provenance: ProvenanceMap,
    pub loaded_files: Vec<PathBuf>,
}

impl ResolvedConfig {
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            selection: self.lang,
            include_ext: self.ext.clone(),
            exclude_ext: self.exclude_ext.clone(),
            ignore_paths: self.ignore_paths.clone(),
            ignore_globs: self.ignore_patterns.clone(),
        }
    }

    pub fn endpoint_filter(&self) -> EndpointFilter {
        EndpointFilter::new(&self.include_verbs, &self.exclude_verbs, self.auth)
    }
}

/// Normalize user-supplied extensions: lowercase, no leading dot.
pub(crate) fn normalize_extensions<I, S>(exts: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    exts.into_iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
