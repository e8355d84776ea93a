use crate::errors::Result;
use crate::parse::builder::{HandlerSite, ParameterSet};
use crate::parse::common::{Endpoint, ParamKind, Parameter, UNKNOWN_TYPE};
use crate::parse::correlate::Correlator;
use crate::parse::grammar::GrammarRegistry;
use crate::parse::query::execute;
use crate::parse::tree::{line_of, node_text, string_value};
use crate::parse::EndpointAnalyzer;
use crate::walk::Language;
use std::collections::{BTreeSet, HashMap};
use tree_sitter::{Node, Tree};

/// `@<object>.<verb>("<path>", ...)` on a function.
const ROUTE_QUERY: &str = r#"
(decorator
  (call
    function: (attribute
      object: (identifier) @object
      attribute: (identifier) @method)
    arguments: (argument_list (string) @path))
  (#match? @method "^(get|post|put|delete|patch|route)$")) @decorator
"#;

/// Type hints that FastAPI binds from the query string when no default is given.
const PRIMITIVE_HINTS: &[&str] = &["int", "str", "float", "bool", "any"];

/// FastAPI / Flask style decorator routes.
pub struct PythonAnalyzer<'r> {
    registry: &'r GrammarRegistry,
}

impl<'r> PythonAnalyzer<'r> {
    pub fn new(registry: &'r GrammarRegistry) -> Self {
        Self { registry }
    }
}

impl EndpointAnalyzer for PythonAnalyzer<'_> {
    fn language(&self) -> Language {
        Language::Python
    }

    fn analyze(&self, tree: &Tree, source: &[u8]) -> Result<Vec<Endpoint>> {
        let query = self.registry.query(Language::Python, ROUTE_QUERY)?;
        let captures = execute(&query, tree.root_node(), source);

        // One group per decorator node, so stacked decorators never share
        // a method or path.
        let groups = Correlator::new(&["decorator"]).correlate(&captures);

        let mut sites: HashMap<usize, HandlerSite> = HashMap::new();
        let mut endpoints = Vec::new();
        for group in &groups {
            let (Some(method), Some(path)) = (group.get("method"), group.get("path")) else {
                continue;
            };
            let Some(function) = decorated_function(group.boundary) else {
                tracing::trace!(line = line_of(group.boundary), "route decorator not on a function");
                continue;
            };
            let site = sites
                .entry(function.id())
                .or_insert_with(|| handler_site(function, source));

            let path = string_value(path, source);
            for verb in verbs(method, source) {
                endpoints.push(site.endpoint(&verb, path.clone()));
            }
        }
        Ok(endpoints)
    }
}

fn decorated_function(decorator: Node) -> Option<Node> {
    let parent = decorator.parent()?;
    if parent.kind() != "decorated_definition" {
        return None;
    }
    parent
        .child_by_field_name("definition")
        .filter(|def| def.kind() == "function_definition")
}

fn handler_site(function: Node, source: &[u8]) -> HandlerSite {
    HandlerSite {
        handler_name: function
            .child_by_field_name("name")
            .map(|n| node_text(n, source).into_owned())
            .unwrap_or_default(),
        line_number: line_of(function),
        snippet: node_text(function, source).into_owned(),
        parameters: parameters(function, source),
        auth_mechanisms: BTreeSet::new(),
    }
}

/// `route` takes its verbs from `methods=[...]`; every other decorator names one verb.
fn verbs(method: Node, source: &[u8]) -> Vec<String> {
    let name = node_text(method, source).to_ascii_uppercase();
    if name != "ROUTE" {
        return vec![name];
    }
    let listed: Vec<String> = method
        .parent()
        .and_then(|attribute| attribute.parent())
        .and_then(|call| call.child_by_field_name("arguments"))
        .and_then(|args| keyword_argument(args, "methods", source))
        .map(|list| {
            let mut cursor = list.walk();
            list.named_children(&mut cursor)
                .filter(|n| n.kind() == "string")
                .map(|n| string_value(n, source).to_ascii_uppercase())
                .collect()
        })
        .unwrap_or_default();
    if listed.is_empty() {
        vec!["GET".to_string()]
    } else {
        listed
    }
}

fn keyword_argument<'t>(args: Node<'t>, key: &str, source: &[u8]) -> Option<Node<'t>> {
    let mut cursor = args.walk();
    let found = args
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "keyword_argument")
        .find(|n| {
            n.child_by_field_name("name")
                .is_some_and(|name| node_text(name, source) == key)
        });
    found.and_then(|kw| kw.child_by_field_name("value"))
}

/// A recognized parameter binding: name, type hint and default value.
struct Binding<'t> {
    name: String,
    type_hint: Option<String>,
    default: Option<Node<'t>>,
}

fn parameters(function: Node, source: &[u8]) -> Vec<Parameter> {
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut set = ParameterSet::new();
    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        if let Some(binding) = binding(child, source) {
            set.push(classify(binding, source));
        }
    }
    set.into_vec()
}

fn binding<'t>(node: Node<'t>, source: &[u8]) -> Option<Binding<'t>> {
    let text = |n: Node| node_text(n, source).into_owned();
    match node.kind() {
        "identifier" => Some(Binding {
            name: text(node),
            type_hint: None,
            default: None,
        }),
        "typed_parameter" => {
            // `*args: int` and `**kw: str` have a splat pattern in place of the name
            let name = node.named_child(0).filter(|n| n.kind() == "identifier")?;
            Some(Binding {
                name: text(name),
                type_hint: node.child_by_field_name("type").map(text),
                default: None,
            })
        }
        "default_parameter" | "typed_default_parameter" => {
            let name = node
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")?;
            Some(Binding {
                name: text(name),
                type_hint: node.child_by_field_name("type").map(text),
                default: node.child_by_field_name("value"),
            })
        }
        _ => None,
    }
}

fn classify(binding: Binding, source: &[u8]) -> Parameter {
    let declared_type = binding
        .type_hint
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
    match binding.default {
        Some(default) => match sentinel_kind(default, source) {
            Some(kind) => {
                let args = default
                    .child_by_field_name("arguments")
                    .map(|a| node_text(a, source).into_owned())
                    .unwrap_or_default();
                let required = !args.contains("...");
                Parameter::new(binding.name, kind, declared_type, required)
            }
            None => Parameter::new(binding.name, ParamKind::Query, declared_type, false),
        },
        None => {
            let kind = if PRIMITIVE_HINTS.contains(&declared_type.to_ascii_lowercase().as_str()) {
                ParamKind::Query
            } else {
                ParamKind::Body
            };
            Parameter::new(binding.name, kind, declared_type, true)
        }
    }
}

/// `Path(...)`, `fastapi.Query(...)` and friends.
fn sentinel_kind(default: Node, source: &[u8]) -> Option<ParamKind> {
    if default.kind() != "call" {
        return None;
    }
    let function = default.child_by_field_name("function")?;
    let name = match function.kind() {
        "identifier" => node_text(function, source),
        "attribute" => node_text(function.child_by_field_name("attribute")?, source),
        _ => return None,
    };
    match name.as_ref() {
        "Path" => Some(ParamKind::Path),
        "Query" => Some(ParamKind::Query),
        "Body" => Some(ParamKind::Body),
        "Header" => Some(ParamKind::Header),
        "Cookie" => Some(ParamKind::Cookie),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::parse::analyze_source;
    use crate::parse::common::{Endpoint, ParamKind};
    use crate::parse::grammar::GrammarRegistry;
    use pretty_assertions::assert_eq;

    fn analyze(src: &str) -> Vec<Endpoint> {
        analyze_source(&GrammarRegistry::new(), "python", src.as_bytes()).unwrap()
    }

    fn params(ep: &Endpoint) -> Vec<(&str, ParamKind, &str, bool)> {
        ep.parameters
            .iter()
            .map(|p| (p.name.as_str(), p.kind, p.declared_type.as_str(), p.required))
            .collect()
    }

    #[test]
    fn stacked_decorators_do_not_cross_contaminate() {
        let eps = analyze(
            r#"
@app.get("/items/{id}")
@app.post("/items/{id}")
def item(id: int):
    return id
"#,
        );
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].http_method, "GET");
        assert_eq!(eps[1].http_method, "POST");
        for ep in &eps {
            assert_eq!(ep.path, "/items/{id}");
            assert_eq!(ep.handler_name, "item");
            assert_eq!(ep.line_number, 4);
            assert!(ep.snippet.starts_with("def item"));
            assert!(ep.file_path.is_empty());
        }
        assert_eq!(eps[0].parameters, eps[1].parameters);
    }

    #[test]
    fn different_paths_stay_with_their_decorator() {
        let eps = analyze(
            r#"
@router.delete('/a')
@router.put("/b")
async def h():
    pass
"#,
        );
        let pairs: Vec<_> = eps
            .iter()
            .map(|e| (e.http_method.as_str(), e.path.as_str()))
            .collect();
        assert_eq!(pairs, vec![("DELETE", "/a"), ("PUT", "/b")]);
    }

    #[test]
    fn sentinel_defaults_choose_kind() {
        let eps = analyze(
            r#"
@app.get("/users/{uid}")
def get_user(
    uid: int = Path(...),
    q: str = Query(None),
    payload: dict = Body(default=None),
    token: str = fastapi.Header(None),
    session = Cookie("x"),
):
    pass
"#,
        );
        assert_eq!(
            params(&eps[0]),
            vec![
                ("uid", ParamKind::Path, "int", false),
                ("q", ParamKind::Query, "str", true),
                ("payload", ParamKind::Body, "dict", true),
                ("token", ParamKind::Header, "str", true),
                ("session", ParamKind::Cookie, "Any", true),
            ]
        );
    }

    #[test]
    fn plain_parameters_follow_hints_and_defaults() {
        let eps = analyze(
            r#"
@app.post("/orders")
def create(order: Order, count: int, raw, limit: int = 10, flag=False, *args, **kwargs):
    pass
"#,
        );
        assert_eq!(
            params(&eps[0]),
            vec![
                ("order", ParamKind::Body, "Order", true),
                ("count", ParamKind::Query, "int", true),
                ("raw", ParamKind::Query, "Any", true),
                ("limit", ParamKind::Query, "int", false),
                ("flag", ParamKind::Query, "Any", false),
            ]
        );
    }

    #[test]
    fn route_reads_methods_keyword() {
        let eps = analyze(
            r#"
@bp.route("/login", methods=["GET", "post"])
def login():
    pass

@bp.route("/plain")
def plain():
    pass
"#,
        );
        let pairs: Vec<_> = eps
            .iter()
            .map(|e| (e.http_method.as_str(), e.path.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("GET", "/login"), ("POST", "/login"), ("GET", "/plain")]
        );
    }

    #[test]
    fn non_route_decorators_are_ignored() {
        let eps = analyze(
            r#"
@functools.lru_cache("x")
def cached():
    pass

@app.get
def bare():
    pass

@app.get("/ok")
class NotAFunction:
    pass
"#,
        );
        assert!(eps.is_empty());
    }

    #[test]
    fn truncated_source_does_not_fail() {
        let eps = analyze("@app.get(\"/x\")\ndef broken(a: int = Path(\n");
        assert!(eps.len() <= 1);
    }
}
