use crate::errors::Result;
use crate::parse::builder::{HandlerSite, ParameterSet};
use crate::parse::common::{Endpoint, ParamKind, Parameter, UNKNOWN_TYPE};
use crate::parse::correlate::{Correlator, LabelPolicy};
use crate::parse::grammar::GrammarRegistry;
use crate::parse::query::execute;
use crate::parse::tree::{line_of, node_text, string_value};
use crate::parse::EndpointAnalyzer;
use crate::walk::Language;
use std::collections::BTreeSet;
use tree_sitter::{Node, Tree};

/// `app.get(...)`, `router.post(...)` and friends.
const ROUTE_QUERY: &str = r#"
(call_expression
  function: (member_expression
    object: (identifier) @object
    property: (property_identifier) @method)
  arguments: (arguments) @args
  (#match? @object "^(app|router)$")
  (#match? @method "^(get|post|put|delete|patch|use)$")) @route
"#;

/// Request reads inside a handler body. The root identifier is checked
/// against the handler's own request parameter after matching.
const ACCESS_QUERY: &str = r#"
(member_expression
  object: (member_expression
    object: (identifier)
    property: (property_identifier) @source)
  property: (property_identifier)
  (#match? @source "^(query|params|body)$")) @access

(variable_declarator
  name: (object_pattern)
  value: (member_expression
    object: (identifier)
    property: (property_identifier) @source)
  (#match? @source "^(query|params|body)$")) @destructure

(member_expression
  object: (identifier)
  property: (property_identifier) @body
  (#eq? @body "body")) @body_access
"#;

const ROUTE_BOUNDARY: &[&str] = &["call_expression"];
const FUNCTION_BOUNDARY: &[&str] = &[
    "arrow_function",
    "function_expression",
    "function",
    "function_declaration",
    "method_definition",
];
const HANDLER_KINDS: &[&str] = &["identifier", "arrow_function", "function_expression", "function"];
const DEFAULT_REQUEST_IDENT: &str = "req";

/// Express-style route registration calls, for JavaScript and TypeScript.
pub struct NodeAnalyzer<'r> {
    registry: &'r GrammarRegistry,
    lang: Language,
}

impl<'r> NodeAnalyzer<'r> {
    pub fn new(registry: &'r GrammarRegistry, lang: Language) -> Self {
        Self { registry, lang }
    }

    /// Parameters read from `req.query`, `req.params` and `req.body` inside the handler.
    fn body_parameters(
        &self,
        handler: Node,
        source: &[u8],
        params: &mut ParameterSet,
    ) -> Result<()> {
        let request = request_ident(handler, source);
        let query = self.registry.query(self.lang, ACCESS_QUERY)?;
        let captures = execute(&query, handler, source);
        let groups = Correlator::new(FUNCTION_BOUNDARY)
            .with_default_policy(LabelPolicy::Collect)
            .correlate(&captures);

        // Nested callbacks form their own groups. Their reads count unless some
        // function between them and the handler rebinds the request name.
        let mut reads: Vec<(&str, Node)> = groups
            .iter()
            .filter(|g| sees_request(g.boundary, handler, &request, source))
            .flat_map(|g| {
                ["access", "destructure", "body_access"]
                    .into_iter()
                    .flat_map(move |label| g.all(label).iter().map(move |n| (label, *n)))
            })
            .collect();
        reads.sort_by_key(|(_, n)| n.start_byte());

        let mut reads_body = false;
        for (label, node) in reads {
            match label {
                "access" => {
                    let Some(inner) = node.child_by_field_name("object") else {
                        continue;
                    };
                    if !rooted_at(inner, &request, source) {
                        continue;
                    }
                    let (Some(kind), Some(name)) = (
                        inner.child_by_field_name("property").and_then(|p| source_kind(p, source)),
                        node.child_by_field_name("property"),
                    ) else {
                        continue;
                    };
                    params.push(Parameter::new(node_text(name, source), kind, UNKNOWN_TYPE, false));
                }
                "destructure" => {
                    let Some(value) = node.child_by_field_name("value") else {
                        continue;
                    };
                    if !rooted_at(value, &request, source) {
                        continue;
                    }
                    let (Some(kind), Some(pattern)) = (
                        value.child_by_field_name("property").and_then(|p| source_kind(p, source)),
                        node.child_by_field_name("name"),
                    ) else {
                        continue;
                    };
                    for name in destructured_names(pattern, source) {
                        params.push(Parameter::new(name, kind, UNKNOWN_TYPE, false));
                    }
                }
                _ => reads_body |= rooted_at(node, &request, source),
            }
        }

        if reads_body && !params.contains("body", ParamKind::Body) {
            params.push(Parameter::new("body", ParamKind::Body, "Object", false));
        }
        Ok(())
    }
}

impl EndpointAnalyzer for NodeAnalyzer<'_> {
    fn language(&self) -> Language {
        self.lang
    }

    fn analyze(&self, tree: &Tree, source: &[u8]) -> Result<Vec<Endpoint>> {
        let query = self.registry.query(self.lang, ROUTE_QUERY)?;
        let captures = execute(&query, tree.root_node(), source);
        let groups = Correlator::new(ROUTE_BOUNDARY).correlate(&captures);

        let mut endpoints = Vec::new();
        for group in &groups {
            let (Some(method), Some(args)) = (group.get("method"), group.get("args")) else {
                continue;
            };
            let mut cursor = args.walk();
            let arguments: Vec<Node> = args.named_children(&mut cursor).collect();

            let Some(path) = arguments
                .iter()
                .find(|n| matches!(n.kind(), "string" | "template_string"))
                .map(|n| string_value(*n, source))
            else {
                tracing::debug!(line = line_of(group.boundary), "route call without a path literal");
                continue;
            };
            let handler = arguments
                .iter()
                .rev()
                .find(|n| HANDLER_KINDS.contains(&n.kind()))
                .copied();

            let mut params = ParameterSet::new();
            params.extend(path_parameters(&path));
            if let Some(handler) = handler.filter(|h| h.kind() != "identifier") {
                self.body_parameters(handler, source, &mut params)?;
            }

            let site = HandlerSite {
                handler_name: handler_name(handler, source),
                line_number: line_of(group.boundary),
                snippet: node_text(group.boundary, source).into_owned(),
                parameters: params.into_vec(),
                auth_mechanisms: BTreeSet::new(),
            };
            endpoints.push(site.endpoint(&node_text(method, source), path));
        }
        Ok(endpoints)
    }
}

fn handler_name(handler: Option<Node>, source: &[u8]) -> String {
    match handler {
        Some(h) if h.kind() == "identifier" => node_text(h, source).into_owned(),
        Some(h) => format!("anonymous_handler_L{}", line_of(h)),
        None => "unknown_handler".to_string(),
    }
}

/// `:name` segments of an Express path. `:name?` is optional and a
/// `(regex)` constraint is not part of the name.
fn path_parameters(path: &str) -> impl Iterator<Item = Parameter> + '_ {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .filter_map(|segment| {
            let name_end = segment
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                .unwrap_or(segment.len());
            let (name, rest) = segment.split_at(name_end);
            if name.is_empty() {
                return None;
            }
            let optional = rest.ends_with('?');
            Some(Parameter::new(name, ParamKind::Path, UNKNOWN_TYPE, !optional))
        })
}

/// Name of the handler's first parameter, which holds the request.
fn request_ident(handler: Node, source: &[u8]) -> String {
    parameter_bindings(handler)
        .into_iter()
        .next()
        .flatten()
        .map(|n| node_text(n, source).into_owned())
        .unwrap_or_else(|| DEFAULT_REQUEST_IDENT.to_string())
}

/// Identifier bound by each formal parameter, `None` for destructured ones.
fn parameter_bindings(function: Node) -> Vec<Option<Node>> {
    if let Some(single) = function.child_by_field_name("parameter") {
        return vec![binding_ident(single)];
    }
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut cursor = params.walk();
    let bindings = params
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .map(binding_ident)
        .collect();
    bindings
}

fn binding_ident(param: Node) -> Option<Node> {
    // TypeScript wraps the binding as `required_parameter` / `optional_parameter`
    match param.kind() {
        "identifier" => Some(param),
        "required_parameter" | "optional_parameter" => param
            .child_by_field_name("pattern")
            .filter(|p| p.kind() == "identifier"),
        "assignment_pattern" => param
            .child_by_field_name("left")
            .filter(|l| l.kind() == "identifier"),
        _ => None,
    }
}

/// Whether `request` inside `function` still names the handler's request.
fn sees_request(function: Node, handler: Node, request: &str, source: &[u8]) -> bool {
    let mut current = Some(function);
    while let Some(node) = current {
        if node.id() == handler.id() {
            return true;
        }
        let rebinds = FUNCTION_BOUNDARY.contains(&node.kind())
            && parameter_bindings(node)
                .into_iter()
                .flatten()
                .any(|ident| node_text(ident, source) == request);
        if rebinds {
            return false;
        }
        current = node.parent();
    }
    true
}

/// `req.<source>` where the object is the request identifier.
fn rooted_at(member: Node, request: &str, source: &[u8]) -> bool {
    member.kind() == "member_expression"
        && member
            .child_by_field_name("object")
            .is_some_and(|o| o.kind() == "identifier" && node_text(o, source) == request)
}

fn source_kind(property: Node, source: &[u8]) -> Option<ParamKind> {
    match node_text(property, source).as_ref() {
        "query" => Some(ParamKind::Query),
        "params" => Some(ParamKind::Path),
        "body" => Some(ParamKind::Body),
        _ => None,
    }
}

/// Keys bound by `{ a, b: alias, c = 1 }`.
fn destructured_names(pattern: Node, source: &[u8]) -> Vec<String> {
    let mut cursor = pattern.walk();
    pattern
        .named_children(&mut cursor)
        .filter_map(|n| match n.kind() {
            "shorthand_property_identifier_pattern" => Some(node_text(n, source).into_owned()),
            "pair_pattern" => n.child_by_field_name("key").map(|k| string_or_text(k, source)),
            "object_assignment_pattern" => n
                .child_by_field_name("left")
                .map(|l| node_text(l, source).into_owned()),
            _ => None,
        })
        .collect()
}

fn string_or_text(node: Node, source: &[u8]) -> String {
    if node.kind() == "string" {
        string_value(node, source)
    } else {
        node_text(node, source).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use crate::parse::analyze_source;
    use crate::parse::common::{Endpoint, ParamKind};
    use crate::parse::grammar::GrammarRegistry;
    use pretty_assertions::assert_eq;

    fn analyze(lang: &str, src: &str) -> Vec<Endpoint> {
        analyze_source(&GrammarRegistry::new(), lang, src.as_bytes()).unwrap()
    }

    fn params(ep: &Endpoint) -> Vec<(&str, ParamKind, bool)> {
        ep.parameters
            .iter()
            .map(|p| (p.name.as_str(), p.kind, p.required))
            .collect()
    }

    #[test]
    fn inline_handler_reads_query_and_body() {
        let eps = analyze(
            "js",
            "router.get('/users/:id', (req, res) => { req.query.sort; req.body; });\n",
        );
        assert_eq!(eps.len(), 1);
        let ep = &eps[0];
        assert_eq!(ep.path, "/users/:id");
        assert_eq!(ep.http_method, "GET");
        assert_eq!(ep.handler_name, "anonymous_handler_L1");
        assert_eq!(
            params(ep),
            vec![
                ("id", ParamKind::Path, true),
                ("sort", ParamKind::Query, false),
                ("body", ParamKind::Body, false),
            ]
        );
        assert_eq!(ep.parameters[2].declared_type, "Object");
        assert!(ep.auth_mechanisms.is_empty());
    }

    #[test]
    fn named_handlers_and_missing_paths() {
        let eps = analyze(
            "javascript",
            r#"
app.use(express.json());
app.post("/orders", auth, createOrder);
app.delete(`/orders/:orderId`, function (req, res) {});
client.get("/not-a-route");
"#,
        );
        let summary: Vec<_> = eps
            .iter()
            .map(|e| (e.http_method.as_str(), e.path.as_str(), e.handler_name.as_str(), e.line_number))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("POST", "/orders", "createOrder", 3),
                ("DELETE", "/orders/:orderId", "anonymous_handler_L4", 4),
            ]
        );
        assert_eq!(params(&eps[1]), vec![("orderId", ParamKind::Path, true)]);
    }

    #[test]
    fn custom_request_name_and_destructuring() {
        let eps = analyze(
            "js",
            r#"
router.put('/items/:id', async (request, res) => {
  const { name, price: cost, tags = [] } = request.body;
  const { id } = request.params;
  req.query.ignored;
  items.forEach((i) => request.query.page);
});
"#,
        );
        assert_eq!(
            params(&eps[0]),
            vec![
                ("id", ParamKind::Path, true),
                ("name", ParamKind::Body, false),
                ("price", ParamKind::Body, false),
                ("tags", ParamKind::Body, false),
                ("page", ParamKind::Query, false),
                ("body", ParamKind::Body, false),
            ]
        );
    }

    #[test]
    fn typescript_handlers() {
        let src = r#"
import { Router, Request, Response } from 'express';
const router = Router();
router.patch('/profile/:uid', (req: Request, res: Response) => {
  const limit = req.query.limit as string;
  res.json(req.params.uid);
});
"#;
        for lang in ["ts", "tsx"] {
            let eps = analyze(lang, src);
            assert_eq!(eps.len(), 1, "{lang}");
            assert_eq!(eps[0].http_method, "PATCH");
            assert_eq!(
                params(&eps[0]),
                vec![("uid", ParamKind::Path, true), ("limit", ParamKind::Query, false)]
            );
        }
    }

    #[test]
    fn nested_function_with_own_request_is_not_credited() {
        let eps = analyze(
            "js",
            r#"
app.get('/x', (req, res) => {
  function inner(req) { return req.body.secret; }
  const wrap = function (other, req) { return req.query.hidden; };
  items.map((i) => req.query.b);
  req.query.a;
});
"#,
        );
        assert_eq!(
            params(&eps[0]),
            vec![("b", ParamKind::Query, false), ("a", ParamKind::Query, false)]
        );
    }

    #[test]
    fn optional_and_constrained_path_segments() {
        let eps = analyze("js", "app.get('/users/:id?/files/:file([0-9]+)', h);\n");
        assert_eq!(eps[0].path, "/users/:id?/files/:file([0-9]+)");
        assert_eq!(
            params(&eps[0]),
            vec![("id", ParamKind::Path, false), ("file", ParamKind::Path, true)]
        );
    }

    #[test]
    fn route_without_handler_is_unknown() {
        let eps = analyze("js", "app.get('/health');\n");
        assert_eq!(eps[0].handler_name, "unknown_handler");
        assert!(eps[0].parameters.is_empty());
    }

    #[test]
    fn truncated_source_does_not_fail() {
        let registry = GrammarRegistry::new();
        let result = analyze_source(&registry, "js", b"app.get('/a', (req, res) => { req.query.");
        assert!(result.is_ok());
    }
}
