//! Inspect command - print the resolved node tree of a schema type

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use specimen::{Request, Specimen};

use super::output::{format_tree, NodeView};

#[derive(Parser, Debug)]
pub struct InspectCmd {
    /// JSON schema describing the types
    #[arg(long)]
    pub schema: PathBuf,

    /// Root type, e.g. "Order" or "Pair<String, i32>"
    #[arg(long = "type")]
    pub type_name: String,

    /// Argument for a generic root's type parameter (repeatable, in order)
    #[arg(long = "type-arg")]
    pub type_args: Vec<String>,

    /// Follow self-references down to this depth
    #[arg(long)]
    pub max_depth: Option<usize>,
}

impl InspectCmd {
    pub fn execute(&self, json_output: bool) -> Result<()> {
        let model = super::load_schema(&self.schema)?;
        let mut builder = Request::builder(&self.type_name).with_type_args(&self.type_args);
        if let Some(depth) = self.max_depth {
            builder = builder.with_max_depth(depth);
        }
        let request = builder.build().context("Invalid request")?;
        let population = Specimen::new(model)
            .model(&request)
            .with_context(|| format!("Cannot resolve '{}'", self.type_name))?;

        let mut nodes = Vec::new();
        population
            .graph()
            .walk(population.root(), &mut |node| nodes.push(NodeView::from_node(node)));

        if json_output {
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        } else {
            print!("{}", format_tree(&nodes));
        }
        Ok(())
    }
}
