use serde::Serialize;
use std::collections::BTreeSet;

/// Where a request parameter is bound from.
///
/// Declaration order is the display order used when grouping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Path,
    Query,
    Body,
    Header,
    Cookie,
}

impl ParamKind {
    pub const ALL: [ParamKind; 5] = [
        ParamKind::Path,
        ParamKind::Query,
        ParamKind::Body,
        ParamKind::Header,
        ParamKind::Cookie,
    ];

    /// Lowercase name, as used for JSON keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Path => "path",
            ParamKind::Query => "query",
            ParamKind::Body => "body",
            ParamKind::Header => "header",
            ParamKind::Cookie => "cookie",
        }
    }

    /// Capitalized name, as used in table cells.
    pub fn label(&self) -> &'static str {
        match self {
            ParamKind::Path => "Path",
            ParamKind::Query => "Query",
            ParamKind::Body => "Body",
            ParamKind::Header => "Header",
            ParamKind::Cookie => "Cookie",
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type used when the framework reports none.
pub const UNKNOWN_TYPE: &str = "Any";

/// One request parameter of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamKind,
    pub declared_type: String,
    pub required: bool,
}

impl Parameter {
    pub fn new(
        name: impl Into<String>,
        kind: ParamKind,
        declared_type: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            declared_type: declared_type.into(),
            required,
        }
    }
}

/// One discovered route declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    /// Filled in by the caller; analyzers only see source bytes.
    pub file_path: String,
    pub handler_name: String,
    /// Upper-case verb, or `ANY`.
    pub http_method: String,
    pub path: String,
    /// 1-indexed
    pub line_number: usize,
    pub snippet: String,
    pub parameters: Vec<Parameter>,
    /// Empty means unknown or unauthenticated.
    pub auth_mechanisms: BTreeSet<String>,
}

impl Endpoint {
    pub fn is_authenticated(&self) -> bool {
        !self.auth_mechanisms.is_empty()
    }

    /// Parameters of one kind, in declaration order.
    pub fn parameters_of(&self, kind: ParamKind) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.kind == kind)
    }

    /// `file:line`
    pub fn location(&self) -> String {
        format!("{}:{}", self.file_path, self.line_number)
    }
}
