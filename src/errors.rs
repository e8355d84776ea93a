use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ScanError {
    #[error("Unsupported language: {language}")]
    #[diagnostic(code(apiscan::unsupported_language))]
    UnsupportedLanguage { language: String },

    /// A built-in query does not compile against its grammar. This is a bug in
    /// an analyzer, never a property of the scanned source.
    #[error("Query failed to compile for {language}: {message}")]
    #[diagnostic(
        code(apiscan::query_compile),
        help("this is a defect in the analyzer's built-in query")
    )]
    QueryCompile { language: String, message: String },

    #[error("Could not load {language} grammar: {message}")]
    #[diagnostic(code(apiscan::grammar))]
    Grammar { language: String, message: String },

    #[error("Local path '{path}' is not a valid directory")]
    #[diagnostic(
        code(apiscan::invalid_source),
        help("pass an existing directory or an http(s):// or git@ repository URL")
    )]
    InvalidSource { path: PathBuf },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(apiscan::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(apiscan::io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(apiscan::git))]
    Git(#[from] git2::Error),

    #[error(transparent)]
    #[diagnostic(code(apiscan::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(apiscan::glob))]
    Glob(#[from] globset::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
