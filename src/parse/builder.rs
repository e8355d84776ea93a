use crate::parse::common::{Endpoint, ParamKind, Parameter};
use std::collections::{BTreeSet, HashSet};

/// Join a base path and a sub-path into one route template.
///
/// Duplicate slashes collapse and a trailing slash is dropped; an empty
/// result becomes `/`.
pub fn normalize_path(base: &str, sub: &str) -> String {
    let mut joined = format!("{base}/{sub}");
    while joined.contains("//") {
        joined = joined.replace("//", "/");
    }
    let trimmed = joined.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ordered parameter list that ignores repeated `(name, kind)` pairs.
#[derive(Debug, Default, Clone)]
pub struct ParameterSet {
    params: Vec<Parameter>,
    seen: HashSet<(String, ParamKind)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a parameter with the same name and kind is already held.
    pub fn push(&mut self, param: Parameter) -> bool {
        if !self.seen.insert((param.name.clone(), param.kind)) {
            return false;
        }
        self.params.push(param);
        true
    }

    pub fn contains(&self, name: &str, kind: ParamKind) -> bool {
        self.seen.contains(&(name.to_string(), kind))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_vec(self) -> Vec<Parameter> {
        self.params
    }
}

impl Extend<Parameter> for ParameterSet {
    fn extend<I: IntoIterator<Item = Parameter>>(&mut self, iter: I) {
        for param in iter {
            self.push(param);
        }
    }
}

/// Shared facts about one handler, stamped onto each route it serves.
#[derive(Debug, Clone)]
pub struct HandlerSite {
    pub handler_name: String,
    pub line_number: usize,
    pub snippet: String,
    pub parameters: Vec<Parameter>,
    pub auth_mechanisms: BTreeSet<String>,
}

impl HandlerSite {
    pub fn endpoint(&self, http_method: &str, path: impl Into<String>) -> Endpoint {
        Endpoint {
            file_path: String::new(),
            handler_name: self.handler_name.clone(),
            http_method: http_method.to_ascii_uppercase(),
            path: path.into(),
            line_number: self.line_number,
            snippet: self.snippet.clone(),
            parameters: self.parameters.clone(),
            auth_mechanisms: self.auth_mechanisms.clone(),
        }
    }
}

/// Keep the first endpoint for each `(handler, method, path)`.
pub fn dedup_endpoints(endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
    let mut seen = HashSet::new();
    endpoints
        .into_iter()
        .filter(|ep| {
            seen.insert((
                ep.handler_name.clone(),
                ep.http_method.clone(),
                ep.path.clone(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn joins_and_collapses() {
        assert_eq!(normalize_path("/api/", "/users/"), "/api/users");
        assert_eq!(normalize_path("", ""), "/");
        assert_eq!(normalize_path("/api", ""), "/api");
        assert_eq!(normalize_path("", "items/{id}"), "/items/{id}");
        assert_eq!(normalize_path("///", "//"), "/");
    }

    #[test]
    fn parameter_set_keys_on_name_and_kind() {
        let mut set = ParameterSet::new();
        assert!(set.push(Parameter::new("id", ParamKind::Path, "Any", true)));
        assert!(!set.push(Parameter::new("id", ParamKind::Path, "int", false)));
        assert!(set.push(Parameter::new("id", ParamKind::Query, "Any", false)));
        assert!(set.contains("id", ParamKind::Query));
        assert!(!set.contains("id", ParamKind::Body));

        let params = set.into_vec();
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].declared_type, "Any");
    }

    #[test]
    fn endpoints_dedup_on_handler_method_path() {
        let site = HandlerSite {
            handler_name: "list".to_string(),
            line_number: 3,
            snippet: "def list(): ...".to_string(),
            parameters: Vec::new(),
            auth_mechanisms: BTreeSet::new(),
        };
        let endpoints = vec![
            site.endpoint("get", "/a"),
            site.endpoint("GET", "/a"),
            site.endpoint("POST", "/a"),
            site.endpoint("GET", "/b"),
        ];
        let kept = dedup_endpoints(endpoints);
        let pairs: Vec<_> = kept
            .iter()
            .map(|e| (e.http_method.as_str(), e.path.as_str()))
            .collect();
        assert_eq!(pairs, vec![("GET", "/a"), ("POST", "/a"), ("GET", "/b")]);
        assert!(kept.iter().all(|e| e.file_path.is_empty()));
    }

    proptest! {
        #[test]
        fn normalized_paths_are_clean(base in "[a-z/{}]{0,12}", sub in "[a-z/:{}]{0,12}") {
            let path = normalize_path(&base, &sub);
            prop_assert!(!path.is_empty());
            prop_assert!(!path.contains("//"));
            prop_assert!(path == "/" || !path.ends_with('/'));
        }

        #[test]
        fn normalizing_a_rooted_path_is_idempotent(base in "/[a-z/]{0,12}", sub in "[a-z/]{0,12}") {
            let once = normalize_path(&base, &sub);
            prop_assert_eq!(normalize_path("", &once), once.clone());
            prop_assert_eq!(normalize_path(&once, ""), once);
        }
    }
}
