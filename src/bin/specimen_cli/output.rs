//! Output formatting for CLI results

use anyhow::Result;
use serde::Serialize;
use specimen::node::{Node, Terminal};
use specimen::Value;

/// Envelope printed by `generate --json`.
#[derive(Serialize)]
pub struct GenerateReport<'a> {
    #[serde(rename = "type")]
    pub type_name: &'a str,
    pub seed: u64,
    pub values: Vec<serde_json::Value>,
}

/// One JSON document, compact unless `pretty`.
pub fn format_value(value: &Value, pretty: bool) -> Result<String> {
    let json = value.to_json();
    Ok(if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    })
}

/// A node of the resolved field tree, as printed by `inspect --json`.
#[derive(Debug, Serialize)]
pub struct NodeView {
    pub path: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<&'static str>,
}

impl NodeView {
    pub fn from_node(node: &Node) -> Self {
        let declared = (node.declared_ty() != node.ty()).then(|| node.declared_ty().to_string());
        Self {
            path: node.path(),
            ty: node.ty().to_string(),
            depth: node.depth(),
            declared,
            terminal: node.terminal().map(terminal_name),
        }
    }
}

fn terminal_name(terminal: Terminal) -> &'static str {
    match terminal {
        Terminal::Cycle => "cycle",
        Terminal::Depth => "depth",
    }
}

/// Indented tree, one node per line.
pub fn format_tree(nodes: &[NodeView]) -> String {
    let mut out = String::new();
    for view in nodes {
        let label = view.path.rsplit('.').next().unwrap_or(&view.path);
        let label = if view.depth == 0 { view.path.as_str() } else { label };
        out.push_str(&"  ".repeat(view.depth));
        out.push_str(&format!("{}: {}", label, view.ty));
        if let Some(declared) = &view.declared {
            out.push_str(&format!(" (declared {})", declared));
        }
        if let Some(terminal) = view.terminal {
            out.push_str(&format!(" \x1b[2m[{}]\x1b[0m", terminal));
        }
        out.push('\n');
    }
    out
}
