use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::Context;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{Connection, MindMapDetail, MindMapHeader, NodeWithTags};

/// Supported export formats, parsed from the `format` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Xml,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Xml => "application/xml",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            _ => Err(ApiError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// The JSON export payload: the full detail minus collaborators.
#[derive(Serialize)]
struct ExportDocument<'a> {
    #[serde(flatten)]
    mindmap: &'a MindMapHeader,
    nodes: &'a [NodeWithTags],
    connections: &'a [Connection],
}

/// Renders the detail payload in the requested format.
pub fn render(detail: &MindMapDetail, format: ExportFormat) -> Result<Vec<u8>, ApiError> {
    match format {
        ExportFormat::Json => render_json(detail),
        ExportFormat::Xml => Ok(render_xml(detail)),
    }
}

fn render_json(detail: &MindMapDetail) -> Result<Vec<u8>, ApiError> {
    let document = ExportDocument {
        mindmap: &detail.mindmap,
        nodes: &detail.nodes,
        connections: &detail.connections,
    };
    let bytes =
        serde_json::to_vec_pretty(&document).context("failed to serialize export payload")?;
    Ok(bytes)
}

fn render_xml(detail: &MindMapDetail) -> Vec<u8> {
    let map = &detail.mindmap.mindmap;
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<mindmap id=\"{}\" title=\"{}\" created=\"{}\">",
        map.map_id,
        escape_xml(&map.title),
        map.created_at.to_rfc3339(),
    );
    out.push_str("  <nodes>\n");
    for node in &detail.nodes {
        let node = &node.node;
        // A root node exports an empty parent_id attribute.
        let parent = node
            .parent_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "    <node id=\"{}\" parent_id=\"{}\" type=\"{}\">",
            node.node_id,
            parent,
            escape_xml(&node.node_type),
        );
        let _ = writeln!(out, "      <text>{}</text>", escape_xml(&node.node_text));
        let _ = writeln!(out, "      <x>{}</x>", node.position_x);
        let _ = writeln!(out, "      <y>{}</y>", node.position_y);
        let _ = writeln!(out, "      <color>{}</color>", escape_xml(&node.color));
        out.push_str("    </node>\n");
    }
    out.push_str("  </nodes>\n");
    out.push_str("</mindmap>\n");
    out.into_bytes()
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
