use crate::errors::Result;
use crate::output::{auth_label, parameter_groups};
use crate::parse::{Endpoint, ParamKind};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointRecord<'a> {
    pub endpoint: &'a str,
    pub method: &'a str,
    pub parameters: ParameterRecord,
    pub authentication: &'static str,
    pub location: String,
    pub snippet: &'a str,
}

/// Comma-joined names per kind; `null` when a kind has none.
#[derive(Debug, Default, Serialize)]
pub struct ParameterRecord {
    pub path: Option<String>,
    pub query: Option<String>,
    pub body: Option<String>,
    pub header: Option<String>,
    pub cookie: Option<String>,
}

impl<'a> From<&'a Endpoint> for EndpointRecord<'a> {
    fn from(endpoint: &'a Endpoint) -> Self {
        let mut parameters = ParameterRecord::default();
        for (kind, names) in parameter_groups(endpoint) {
            let slot = match kind {
                ParamKind::Path => &mut parameters.path,
                ParamKind::Query => &mut parameters.query,
                ParamKind::Body => &mut parameters.body,
                ParamKind::Header => &mut parameters.header,
                ParamKind::Cookie => &mut parameters.cookie,
            };
            *slot = Some(names);
        }
        Self {
            endpoint: &endpoint.path,
            method: &endpoint.http_method,
            parameters,
            authentication: auth_label(endpoint),
            location: endpoint.location(),
            snippet: &endpoint.snippet,
        }
    }
}

/// Write endpoints as a pretty-printed JSON array.
pub fn write_json<W: Write>(writer: &mut W, endpoints: &[Endpoint]) -> Result<()> {
    let records: Vec<EndpointRecord> = endpoints.iter().map(EndpointRecord::from).collect();
    serde_json::to_writer_pretty(&mut *writer, &records)?;
    writeln!(writer)?;
    Ok(())
}
