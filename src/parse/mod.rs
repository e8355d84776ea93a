pub mod builder;
pub mod common;
pub mod correlate;
pub mod factory;
pub mod grammar;
pub mod java;
pub mod nodejs;
pub mod python;
pub mod query;
pub mod tree;

pub use common::{Endpoint, ParamKind, Parameter};
pub use grammar::GrammarRegistry;

use crate::errors::{Result, ScanError};
use crate::walk::Language;

/// Endpoint analyzer trait — each routing convention implements this.
pub trait EndpointAnalyzer {
    /// Grammar the analyzer's queries are written against.
    fn language(&self) -> Language;

    /// Extract endpoints from a parsed file. `file_path` is left empty.
    fn analyze(&self, tree: &tree_sitter::Tree, source: &[u8]) -> Result<Vec<Endpoint>>;
}

/// Analyze one buffer of source in the language named by `language_id`.
///
/// Unparseable regions produce no endpoints; only an unknown language or a
/// broken built-in query is an error.
pub fn analyze_source(
    registry: &GrammarRegistry,
    language_id: &str,
    source: &[u8],
) -> Result<Vec<Endpoint>> {
    let lang = language_id
        .parse::<Language>()
        .map_err(|_| ScanError::UnsupportedLanguage {
            language: language_id.to_string(),
        })?;
    analyze_language(registry, lang, source)
}

/// [`analyze_source`] for an already-resolved language.
pub fn analyze_language(
    registry: &GrammarRegistry,
    lang: Language,
    source: &[u8],
) -> Result<Vec<Endpoint>> {
    let grammar = registry.grammar(lang);
    let Some(tree) = tree::parse_source(source, &grammar, lang)? else {
        return Ok(Vec::new());
    };
    let analyzer = factory::create_analyzer(lang, registry);
    let endpoints = analyzer.analyze(&tree, source)?;
    Ok(builder::dedup_endpoints(endpoints))
}
