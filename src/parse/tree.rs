use crate::errors::{Result, ScanError};
use crate::walk::Language;

/// Parse `source` into a syntax tree.
///
/// Malformed input still yields a tree; broken regions show up as `ERROR` or
/// `MISSING` nodes that no analyzer query matches. `None` is only returned when
/// tree-sitter gives up entirely, which callers treat as "no endpoints".
pub fn parse_source(
    source: &[u8],
    grammar: &tree_sitter::Language,
    lang: Language,
) -> Result<Option<tree_sitter::Tree>> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(grammar)
        .map_err(|e| ScanError::Grammar {
            language: lang.to_string(),
            message: e.to_string(),
        })?;
    Ok(parser.parse(source, None))
}

/// UTF-8 text of a node, lossy on invalid bytes.
pub fn node_text<'a>(node: tree_sitter::Node, source: &'a [u8]) -> std::borrow::Cow<'a, str> {
    let end = node.end_byte().min(source.len());
    let start = node.start_byte().min(end);
    String::from_utf8_lossy(&source[start..end])
}

/// Value of a string literal node without its prefix and quotes.
///
/// Covers `"x"`, `'x'`, `` `x` ``, Python prefixes such as `r"x"` or `f'x'`,
/// and triple-quoted strings.
pub fn string_value(node: tree_sitter::Node, source: &[u8]) -> String {
    let text = node_text(node, source);
    let text = text.trim_start_matches(|c: char| "rRbBuUfF".contains(c));
    for quote in [r#"""""#, "'''", "\"", "'", "`"] {
        if text.len() >= 2 * quote.len() {
            if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
                return inner.to_string();
            }
        }
    }
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .to_string()
}

/// 1-based line of a node's first byte.
pub fn line_of(node: tree_sitter::Node) -> usize {
    node.start_position().row + 1
}
