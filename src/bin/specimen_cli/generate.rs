//! Generate command - populate a schema type and print the values as JSON

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::Value as Json;
use specimen::convert::{field_type, value_from_json};
use specimen::env_utils::{env_bool, seed_from_env};
use specimen::random::random_seed;
use specimen::resolver::TypeResolver;
use specimen::{parse_type_expr, select, Request, RequestBuilder, Specimen, TypeModel, Value};
use tracing::info;

use super::output::{format_value, GenerateReport};

const LENIENT_ENV: &str = "SPECIMEN_LENIENT";

#[derive(Parser, Debug)]
pub struct GenerateCmd {
    /// JSON schema describing the types
    #[arg(long)]
    pub schema: PathBuf,

    /// Root type, e.g. "Order" or "Pair<String, i32>"
    #[arg(long = "type")]
    pub type_name: String,

    /// Argument for a generic root's type parameter (repeatable, in order)
    #[arg(long = "type-arg")]
    pub type_args: Vec<String>,

    /// Seed for reproducible output (falls back to SPECIMEN_SEED, then random)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of values to generate
    #[arg(long, default_value_t = 1)]
    pub count: usize,

    /// Follow self-references down to this depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Report unused --set/--ignore/--nullable paths instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Fix a field to a JSON value: "customer.name=\"Ada\"" (repeatable)
    #[arg(long = "set")]
    pub sets: Vec<String>,

    /// Leave a field out: "internal.notes" (repeatable)
    #[arg(long = "ignore")]
    pub ignores: Vec<String>,

    /// Allow a field to be null: "coupon" (repeatable)
    #[arg(long = "nullable")]
    pub nullables: Vec<String>,

    /// Pretty-print each document
    #[arg(long)]
    pub pretty: bool,
}

impl GenerateCmd {
    pub fn execute(&self, json_output: bool) -> Result<()> {
        let model = super::load_schema(&self.schema)?;
        let seed = self
            .seed
            .or_else(seed_from_env)
            .unwrap_or_else(random_seed);
        let request = self.request(&model, seed)?;

        let specimen = Specimen::new(model);
        let population = specimen
            .model(&request)
            .with_context(|| format!("Cannot populate '{}'", self.type_name))?;
        let values = population
            .create_many(self.count)
            .with_context(|| format!("Failed to generate '{}'", self.type_name))?;
        info!(seed, count = values.len(), "generated");

        if json_output {
            let report = GenerateReport {
                type_name: &self.type_name,
                seed,
                values: values.iter().map(Value::to_json).collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            for value in &values {
                println!("{}", format_value(value, self.pretty)?);
            }
        }
        Ok(())
    }

    fn request(&self, model: &Arc<TypeModel>, seed: u64) -> Result<Request> {
        let mut builder = Request::builder(&self.type_name)
            .with_type_args(&self.type_args)
            .with_seed(seed);
        if let Some(depth) = self.max_depth {
            builder = builder.with_max_depth(depth);
        }
        if self.lenient || env_bool(LENIENT_ENV) {
            builder = builder.lenient();
        }

        if !self.sets.is_empty() {
            builder = self.apply_sets(builder, model)?;
        }
        for path in &self.ignores {
            builder = builder.ignore(select::path(path));
        }
        for path in &self.nullables {
            builder = builder.with_nullable(select::path(path));
        }
        builder.build().context("Invalid request")
    }

    fn apply_sets(&self, mut builder: RequestBuilder, model: &Arc<TypeModel>) -> Result<RequestBuilder> {
        let resolver = TypeResolver::new(model.clone());
        let root = parse_type_expr(&self.type_name)?;
        let type_args = self
            .type_args
            .iter()
            .map(|a| parse_type_expr(a))
            .collect::<Result<Vec<_>, _>>()?;
        let root = resolver.resolve_root(&root, &type_args)?.ty;

        for assignment in &self.sets {
            let (path, raw) = parse_assignment(assignment)?;
            let segments: Vec<String> = path.split('.').map(|s| s.trim().to_string()).collect();
            let ty = field_type(&resolver, &root, &segments)
                .ok_or_else(|| anyhow!("'{}' has no field path '{}'", root, path))?;
            let value = value_from_json(&raw, &ty, &resolver)
                .with_context(|| format!("Invalid value for '{}'", path))?;
            builder = builder.set(select::path(path), value);
        }
        Ok(builder)
    }
}

/// Split `path=json`. A value that is not valid JSON is taken as a string.
fn parse_assignment(input: &str) -> Result<(&str, Json)> {
    let (path, raw) = input
        .split_once('=')
        .ok_or_else(|| anyhow!("expected path=value, got '{}'", input))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(anyhow!("missing field path in '{}'", input));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Json::String(raw.to_string()));
    Ok((path, value))
}
