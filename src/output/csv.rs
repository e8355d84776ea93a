use crate::errors::Result;
use crate::output::{auth_label, parameter_groups};
use crate::parse::Endpoint;
use std::io::Write;

const HEADER: [&str; 6] = ["Endpoint", "Method", "Parameters", "Authentication", "Location", "Snippet"];

/// Write endpoints as `|`-delimited CSV.
pub fn write_csv<W: Write>(writer: &mut W, endpoints: &[Endpoint]) -> Result<()> {
    write_row(writer, HEADER.iter().map(|h| h.to_string()))?;
    for endpoint in endpoints {
        write_row(
            writer,
            [
                endpoint.path.clone(),
                endpoint.http_method.clone(),
                parameters_cell(endpoint),
                auth_label(endpoint).to_string(),
                endpoint.location(),
                endpoint.snippet.clone(),
            ],
        )?;
    }
    Ok(())
}

fn write_row<W: Write>(writer: &mut W, cells: impl IntoIterator<Item = String>) -> Result<()> {
    let row: Vec<String> = cells.into_iter().map(|c| quote(&clean(&c))).collect();
    writeln!(writer, "{}", row.join("|"))?;
    Ok(())
}

/// `Path: id Query: a, b`, or `None`.
fn parameters_cell(endpoint: &Endpoint) -> String {
    let groups = parameter_groups(endpoint);
    if groups.is_empty() {
        return "None".to_string();
    }
    groups
        .iter()
        .map(|(kind, names)| format!("{}: {names}", kind.label()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop the delimiter and flatten line breaks.
fn clean(cell: &str) -> String {
    cell.replace('|', "").replace(['\n', '\r'], " ")
}

fn quote(cell: &str) -> String {
    if cell.contains('"') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
