use crate::errors::Result;
use crate::output::{auth_label, parameter_groups};
use crate::parse::Endpoint;
use std::io::Write;

/// Write endpoints as a Markdown table, ordered by file then line.
pub fn write_markdown<W: Write>(writer: &mut W, endpoints: &[Endpoint]) -> Result<()> {
    writeln!(
        writer,
        "| Endpoint | Method | Parameters | Authentication | Location | Snippet |"
    )?;
    writeln!(writer, "| :--- | :--- | :--- | :--- | :--- | :--- |")?;

    let mut sorted: Vec<&Endpoint> = endpoints.iter().collect();
    sorted.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.line_number.cmp(&b.line_number))
    });

    for endpoint in sorted {
        writeln!(
            writer,
            "| {} | {} | {} | {} | [{}] | <code>{}</code> |",
            endpoint.path,
            endpoint.http_method,
            parameters_cell(endpoint),
            auth_label(endpoint),
            endpoint.location(),
            escape_snippet(&endpoint.snippet),
        )?;
    }
    Ok(())
}

fn parameters_cell(endpoint: &Endpoint) -> String {
    let groups = parameter_groups(endpoint);
    if groups.is_empty() {
        return "None".to_string();
    }
    groups
        .iter()
        .map(|(kind, names)| format!("<b>{}:</b> {names}", kind.label()))
        .collect::<Vec<_>>()
        .join("<br>")
}

fn escape_snippet(snippet: &str) -> String {
    snippet.replace('|', "&#124;").replace('\n', "<br>")
}
