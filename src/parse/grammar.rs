use crate::errors::{Result, ScanError};
use crate::walk::Language;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tree_sitter::Query;

/// Lazily populated cache of tree-sitter grammars and compiled queries.
///
/// One registry is shared by every worker of a scan. Entries are immutable once
/// inserted; if two threads race to build the same entry, the first insert wins
/// and the duplicate is dropped.
#[derive(Default)]
pub struct GrammarRegistry {
    grammars: RwLock<HashMap<Language, tree_sitter::Language>>,
    queries: RwLock<HashMap<(Language, &'static str), Arc<Query>>>,
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the grammar for a language identifier such as `"python"` or `"ts"`.
    pub fn get(&self, language_id: &str) -> Result<tree_sitter::Language> {
        let lang = language_id
            .parse::<Language>()
            .map_err(|_| ScanError::UnsupportedLanguage {
                language: language_id.to_string(),
            })?;
        Ok(self.grammar(lang))
    }

    /// Grammar for an already-resolved language.
    pub fn grammar(&self, lang: Language) -> tree_sitter::Language {
        if let Some(grammar) = read_lock(&self.grammars).get(&lang) {
            return grammar.clone();
        }
        let mut grammars = write_lock(&self.grammars);
        grammars
            .entry(lang)
            .or_insert_with(|| {
                tracing::debug!(language = %lang, "loading grammar");
                load_grammar(lang)
            })
            .clone()
    }

    /// Compile `source` against the grammar for `lang`, reusing an earlier compile.
    ///
    /// Built-in queries are `'static` strings, so the text itself is the key.
    pub fn query(&self, lang: Language, source: &'static str) -> Result<Arc<Query>> {
        if let Some(query) = read_lock(&self.queries).get(&(lang, source)) {
            return Ok(Arc::clone(query));
        }
        let grammar = self.grammar(lang);
        let compiled = Query::new(&grammar, source).map_err(|e| ScanError::QueryCompile {
            language: lang.to_string(),
            message: e.to_string(),
        })?;
        let mut queries = write_lock(&self.queries);
        Ok(Arc::clone(
            queries
                .entry((lang, source))
                .or_insert_with(|| Arc::new(compiled)),
        ))
    }

    /// Number of grammars loaded so far.
    pub fn cached_grammars(&self) -> usize {
        read_lock(&self.grammars).len()
    }

    /// Number of distinct compiled queries held.
    pub fn cached_queries(&self) -> usize {
        read_lock(&self.queries).len()
    }
}

fn load_grammar(lang: Language) -> tree_sitter::Language {
    match lang {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
    }
}

// Cache entries are inserted whole, so a poisoned lock still guards a valid map.
fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
