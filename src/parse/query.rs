use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

/// One `(node, capture label)` pair produced by a query.
#[derive(Debug, Clone)]
pub struct Capture<'tree> {
    pub node: Node<'tree>,
    pub label: String,
}

/// Run `query` over the subtree rooted at `node`.
///
/// Captures come back in tree-sitter's capture order, which is stable for
/// identical input. Text predicates (`#eq?`, `#match?`) are evaluated against
/// `source`.
pub fn execute<'tree>(query: &Query, node: Node<'tree>, source: &'tree [u8]) -> Vec<Capture<'tree>> {
    let names = query.capture_names();
    let mut cursor = QueryCursor::new();
    let mut captures = cursor.captures(query, node, source);

    let mut out = Vec::new();
    while let Some((m, idx)) = captures.next() {
        let capture = m.captures[*idx];
        out.push(Capture {
            node: capture.node,
            label: names[capture.index as usize].to_string(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::grammar::GrammarRegistry;
    use crate::parse::tree::{node_text, parse_source};
    use crate::walk::Language;

    #[test]
    fn captures_are_labelled_and_filtered_by_predicates() {
        let registry = GrammarRegistry::new();
        let grammar = registry.grammar(Language::JavaScript);
        let src = b"app.get('/a', h);\nclient.get('/b');\n";
        let tree = parse_source(src, &grammar, Language::JavaScript)
            .unwrap()
            .unwrap();
        let query = registry
            .query(
                Language::JavaScript,
                r#"(call_expression
                     function: (member_expression object: (identifier) @obj)
                     (#eq? @obj "app")) @call"#,
            )
            .unwrap();

        let captures = execute(&query, tree.root_node(), src);
        assert_eq!(captures.len(), 2);
        let obj = captures.iter().find(|c| c.label == "obj").unwrap();
        assert_eq!(node_text(obj.node, src), "app");
        let call = captures.iter().find(|c| c.label == "call").unwrap();
        assert_eq!(node_text(call.node, src), "app.get('/a', h)");
    }

    #[test]
    fn execution_can_be_scoped_to_a_subtree() {
        let registry = GrammarRegistry::new();
        let grammar = registry.grammar(Language::Python);
        let src = b"def a(x):\n    pass\n\ndef b(y, z):\n    pass\n";
        let tree = parse_source(src, &grammar, Language::Python).unwrap().unwrap();
        let second_fn = tree.root_node().named_child(1).unwrap();
        let params = second_fn.child_by_field_name("parameters").unwrap();
        let query = registry
            .query(Language::Python, "(parameters (identifier) @name)")
            .unwrap();

        let names: Vec<String> = execute(&query, params, src)
            .iter()
            .map(|c| node_text(c.node, src).into_owned())
            .collect();
        assert_eq!(names, vec!["y", "z"]);
    }
}
