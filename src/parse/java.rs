use crate::errors::Result;
use crate::parse::builder::{normalize_path, HandlerSite, ParameterSet};
use crate::parse::common::{Endpoint, ParamKind, Parameter};
use crate::parse::correlate::{Correlator, LabelPolicy};
use crate::parse::grammar::GrammarRegistry;
use crate::parse::query::execute;
use crate::parse::tree::{line_of, node_text, string_value};
use crate::parse::EndpointAnalyzer;
use crate::walk::Language;
use std::collections::BTreeSet;
use tree_sitter::{Node, Tree};

const TYPE_QUERY: &str = r#"
[
  (class_declaration body: (class_body) @body)
  (interface_declaration body: (interface_body) @body)
] @type
"#;

const ANNOTATION_QUERY: &str = r#"
[
  (annotation name: (_) @name arguments: (annotation_argument_list) @args)
  (marker_annotation name: (_) @name)
]
"#;

const PARAMETER_QUERY: &str = r#"
(formal_parameter
  (modifiers
    [
      (annotation name: (_) @param_annotation)
      (marker_annotation name: (_) @param_annotation)
    ])?
  type: (_) @param_type
  name: (identifier) @param_name) @param

(spread_parameter
  (modifiers
    [
      (annotation name: (_) @param_annotation)
      (marker_annotation name: (_) @param_annotation)
    ])?
  [
    (type_identifier)
    (scoped_type_identifier)
    (generic_type)
    (integral_type)
    (floating_point_type)
    (boolean_type)
    (array_type)
  ] @param_type
  (variable_declarator name: (identifier) @param_name)) @param
"#;

const TYPE_BOUNDARY: &[&str] = &["class_declaration", "interface_declaration"];
const ANNOTATION_BOUNDARY: &[&str] = &["annotation", "marker_annotation"];
const PARAMETER_BOUNDARY: &[&str] = &["formal_parameter", "spread_parameter"];

/// Annotations that carry a route path in their arguments.
const PATH_ANNOTATIONS: &[&str] = &[
    "RequestMapping",
    "GetMapping",
    "PostMapping",
    "PutMapping",
    "DeleteMapping",
    "PatchMapping",
    "Path",
];

const AUTH_ANNOTATIONS: &[&str] = &[
    "PreAuthorize",
    "RolesAllowed",
    "Secured",
    "PermitAll",
    "DenyAll",
    "SecurityRequirement",
    "SecurityRequirements",
    "PermissionRequired",
];

/// Verb declared by a mapping annotation; `ANY` for `RequestMapping`.
fn mapped_verb(annotation: &str) -> Option<&'static str> {
    match annotation {
        "GetMapping" | "GET" => Some("GET"),
        "PostMapping" | "POST" => Some("POST"),
        "PutMapping" | "PUT" => Some("PUT"),
        "DeleteMapping" | "DELETE" => Some("DELETE"),
        "PatchMapping" | "PATCH" => Some("PATCH"),
        "RequestMapping" => Some("ANY"),
        _ => None,
    }
}

fn parameter_kind(annotation: &str) -> Option<ParamKind> {
    match annotation {
        "PathVariable" | "PathParam" => Some(ParamKind::Path),
        "RequestParam" | "QueryParam" => Some(ParamKind::Query),
        "RequestHeader" | "HeaderParam" => Some(ParamKind::Header),
        "CookieValue" | "CookieParam" => Some(ParamKind::Cookie),
        _ => None,
    }
}

/// One annotation on a declaration.
struct Annotation<'t> {
    /// Simple name, without any package qualifier.
    name: String,
    args: Option<Node<'t>>,
    /// Written directly on the declaration rather than nested in another annotation.
    direct: bool,
}

/// Spring MVC and JAX-RS annotated controllers.
pub struct JavaAnalyzer<'r> {
    registry: &'r GrammarRegistry,
}

impl<'r> JavaAnalyzer<'r> {
    pub fn new(registry: &'r GrammarRegistry) -> Self {
        Self { registry }
    }

    fn annotations<'t>(
        &self,
        modifiers: Option<Node<'t>>,
        source: &'t [u8],
    ) -> Result<Vec<Annotation<'t>>> {
        let Some(modifiers) = modifiers else {
            return Ok(Vec::new());
        };
        let query = self.registry.query(Language::Java, ANNOTATION_QUERY)?;
        let captures = execute(&query, modifiers, source);
        let groups = Correlator::new(ANNOTATION_BOUNDARY).correlate(&captures);
        Ok(groups
            .iter()
            .filter_map(|group| {
                let name = group.get("name")?;
                Some(Annotation {
                    name: simple_name(&node_text(name, source)).to_string(),
                    args: group.get("args"),
                    direct: group.boundary.parent().map(|p| p.id()) == Some(modifiers.id()),
                })
            })
            .collect())
    }

    fn parameters(
        &self,
        method: Node,
        annotations: &[Annotation],
        source: &[u8],
    ) -> Result<Vec<Parameter>> {
        let mut set = ParameterSet::new();
        if let Some(params) = method.child_by_field_name("parameters") {
            let query = self.registry.query(Language::Java, PARAMETER_QUERY)?;
            let captures = execute(&query, params, source);
            let groups = Correlator::new(PARAMETER_BOUNDARY)
                .with_policy("param_annotation", LabelPolicy::Collect)
                .correlate(&captures);
            for group in &groups {
                let (Some(name), Some(ty)) = (group.get("param_name"), group.get("param_type")) else {
                    continue;
                };
                let kind = group
                    .all("param_annotation")
                    .iter()
                    .find_map(|a| parameter_kind(simple_name(&node_text(*a, source))))
                    .unwrap_or(ParamKind::Body);
                let mut declared_type = node_text(ty, source).into_owned();
                if group.boundary.kind() == "spread_parameter" {
                    declared_type.push_str("...");
                }
                set.push(Parameter::new(node_text(name, source), kind, declared_type, true));
            }
        }
        if annotations.iter().any(|a| a.name == "Parameter") {
            set.push(Parameter::new("swagger_param", ParamKind::Query, "", false));
        }
        Ok(set.into_vec())
    }

    fn method_endpoints(
        &self,
        method: Node,
        base_path: &str,
        class_auth: &BTreeSet<String>,
        source: &[u8],
    ) -> Result<Vec<Endpoint>> {
        let modifiers = child_of_kind(method, "modifiers");
        let annotations = self.annotations(modifiers, source)?;
        let direct: Vec<&Annotation> = annotations.iter().filter(|a| a.direct).collect();

        let mut verbs = vec!["ANY".to_string()];
        let mut is_endpoint = false;
        for annotation in &direct {
            if PATH_ANNOTATIONS.contains(&annotation.name.as_str()) {
                is_endpoint = true;
            }
            if let Some(mapped) = mapped_verb(&annotation.name) {
                is_endpoint = true;
                let concrete = match mapped {
                    "ANY" => annotation
                        .args
                        .map(|args| request_methods(args, source))
                        .unwrap_or_default(),
                    v => vec![v.to_string()],
                };
                if !concrete.is_empty() {
                    verbs = concrete;
                }
            }
        }
        if !is_endpoint {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for annotation in &direct {
            if !PATH_ANNOTATIONS.contains(&annotation.name.as_str()) {
                continue;
            }
            if let Some(args) = annotation.args {
                collect_path_literals(args, source, &mut paths);
            }
            if annotation.name == "Path" && verbs.iter().any(|v| v != "ANY") {
                break;
            }
        }
        if paths.is_empty() {
            paths.push(String::new());
        }

        let mut auth = class_auth.clone();
        auth.extend(auth_names(&annotations));

        let site = HandlerSite {
            handler_name: method
                .child_by_field_name("name")
                .map(|n| node_text(n, source).into_owned())
                .unwrap_or_default(),
            line_number: line_of(method),
            snippet: node_text(method, source).into_owned(),
            parameters: self.parameters(method, &annotations, source)?,
            auth_mechanisms: auth,
        };
        Ok(paths
            .iter()
            .flat_map(|p| {
                let path = normalize_path(base_path, p);
                verbs.iter().map(move |verb| (verb, path.clone()))
            })
            .map(|(verb, path)| site.endpoint(verb, path))
            .collect())
    }
}

impl EndpointAnalyzer for JavaAnalyzer<'_> {
    fn language(&self) -> Language {
        Language::Java
    }

    fn analyze(&self, tree: &Tree, source: &[u8]) -> Result<Vec<Endpoint>> {
        let query = self.registry.query(Language::Java, TYPE_QUERY)?;
        let captures = execute(&query, tree.root_node(), source);
        let groups = Correlator::new(TYPE_BOUNDARY).correlate(&captures);

        let mut endpoints = Vec::new();
        for group in &groups {
            let Some(body) = group.get("body") else {
                continue;
            };
            let annotations = self.annotations(child_of_kind(group.boundary, "modifiers"), source)?;
            let base_path = base_path(&annotations, source);
            let class_auth = auth_names(&annotations);

            let mut cursor = body.walk();
            let methods: Vec<Node> = body
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "method_declaration")
                .collect();
            for method in methods {
                endpoints.extend(self.method_endpoints(method, &base_path, &class_auth, source)?);
            }
        }
        Ok(endpoints)
    }
}

/// First literal of the first `@RequestMapping` / `@Path` on the type.
fn base_path(annotations: &[Annotation], source: &[u8]) -> String {
    annotations
        .iter()
        .filter(|a| a.direct && matches!(a.name.as_str(), "RequestMapping" | "Path"))
        .find_map(|a| a.args)
        .map(|args| {
            let mut literals = Vec::new();
            collect_path_literals(args, source, &mut literals);
            literals.into_iter().next().unwrap_or_default()
        })
        .unwrap_or_default()
}

fn auth_names(annotations: &[Annotation]) -> BTreeSet<String> {
    annotations
        .iter()
        .filter(|a| AUTH_ANNOTATIONS.contains(&a.name.as_str()))
        .map(|a| a.name.clone())
        .collect()
}

/// String literals under an annotation's arguments, in source order.
///
/// Inside `key = value` pairs only `value` and `path` hold paths.
fn collect_path_literals(node: Node, source: &[u8], out: &mut Vec<String>) {
    match node.kind() {
        "string_literal" => out.push(string_value(node, source)),
        "element_value_pair" => {
            let key = node.child_by_field_name("key").map(|k| node_text(k, source));
            if matches!(key.as_deref(), Some("value" | "path")) {
                if let Some(value) = node.child_by_field_name("value") {
                    collect_path_literals(value, source, out);
                }
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_path_literals(child, source, out);
            }
        }
    }
}

/// Verbs from `method = RequestMethod.POST` or `method = {RequestMethod.GET, RequestMethod.POST}`.
fn request_methods(args: Node, source: &[u8]) -> Vec<String> {
    let mut cursor = args.walk();
    let value = args
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "element_value_pair")
        .find(|n| {
            n.child_by_field_name("key")
                .is_some_and(|k| node_text(k, source) == "method")
        })
        .and_then(|pair| pair.child_by_field_name("value"));
    let Some(value) = value else {
        return Vec::new();
    };
    let entries: Vec<Node> = if value.kind() == "element_value_array_initializer" {
        let mut cursor = value.walk();
        let entries = value.named_children(&mut cursor).collect();
        entries
    } else {
        vec![value]
    };
    let mut verbs = Vec::new();
    for entry in entries {
        let verb = simple_name(&node_text(entry, source)).to_ascii_uppercase();
        if !verb.is_empty() && !verbs.contains(&verb) {
            verbs.push(verb);
        }
    }
    verbs
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name).trim()
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}
