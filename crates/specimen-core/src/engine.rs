//! PopulationEngine: walks the node graph and produces values.
//!
//! ## Per-node flow
//!
//! 1. terminal nodes (cycle or depth) yield null, or an empty container
//! 2. matching bindings are marked used, then the strategy is resolved
//! 3. a conditional assignment whose origin value qualifies replaces the
//!    strategy with its constant
//! 4. the nullability roll may short-circuit to null, whatever the strategy;
//!    such a null is final and is not offered to filters
//! 5. the strategy runs, repeating while a filter rejects the value
//! 6. the value is recorded for assignments, then callbacks fire
//!
//! A container whose element node is terminal is left empty.
//!
//! Construction failures never abort a build. A failed container element is
//! dropped (or left as a null array slot) and a failed member is null.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use specimen_types::{Construction, Instance, TypeModel, Value};
use tracing::{debug, trace};

use crate::assignment::{AssignmentStrategy, Instantiator};
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};
use crate::node::{Member, Node, NodeGraph, NodeKind};
use crate::random::RandomSource;
use crate::selectors::{Action, SelectorEngine, Usage};
use crate::settings::{AfterGenerate, Keys, Settings};
use crate::strategy::{GeneratorResolver, Hints, Resolution, Strategy};
use crate::{Error, Result};

/// Result of visiting one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The node was ignored; nothing is assigned.
    Ignored,
    Value(Value),
    /// The node's type could not be constructed.
    Failed,
}

impl Outcome {
    /// The produced value; ignored and failed nodes become null.
    pub fn into_value(self) -> Value {
        match self {
            Outcome::Value(v) => v,
            Outcome::Ignored | Outcome::Failed => Value::Null,
        }
    }
}

/// Mutable state owned by one build.
pub struct Traversal {
    pub random: RandomSource,
    pub usage: Usage,
    /// Latest value seen at an origin node, per assign binding.
    origins: HashMap<usize, Value>,
}

impl Traversal {
    pub fn new(random: RandomSource) -> Self {
        Self {
            random,
            usage: Usage::new(),
            origins: HashMap::new(),
        }
    }

    /// Forget origin values before the next root instance.
    pub fn reset_origins(&mut self) {
        self.origins.clear();
    }
}

pub struct PopulationEngine<'r> {
    graph: &'r NodeGraph,
    selectors: &'r SelectorEngine,
    resolver: GeneratorResolver<'r>,
    settings: &'r Settings,
    instantiator: &'r dyn Instantiator,
    assigner: AssignmentStrategy,
    max_attempts: usize,
}

impl<'r> PopulationEngine<'r> {
    pub fn new(
        graph: &'r NodeGraph,
        selectors: &'r SelectorEngine,
        settings: &'r Settings,
        registry: &'r GeneratorRegistry,
        instantiator: &'r dyn Instantiator,
    ) -> Self {
        Self {
            graph,
            selectors,
            resolver: GeneratorResolver::new(settings, registry),
            settings,
            instantiator,
            assigner: AssignmentStrategy::from_settings(settings),
            max_attempts: settings.get(&Keys::MAX_GENERATION_ATTEMPTS).max(1),
        }
    }

    fn model(&self) -> &'r TypeModel {
        self.graph.resolver().model()
    }

    fn assign(&self, parent: &mut Instance, child: &Node, value: Value) -> Result<bool> {
        self.assigner
            .assign(self.instantiator, parent, child, value, self.model())
    }

    pub fn populate(&self, node: &Arc<Node>, cx: &mut Traversal) -> Result<Outcome> {
        if node.is_terminal() {
            return Ok(Outcome::Value(empty_value(node.kind())));
        }
        for &index in node.subtype_bindings() {
            cx.usage.mark(index);
        }
        if let Some((from, to)) = node.subtype_violation() {
            return Err(Error::InvalidSubtype {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let model = self.model();
        let applicable = self.selectors.resolve(node, model);
        for binding in &applicable.bindings {
            cx.usage.mark(binding.index());
        }
        let mut resolution = self.resolver.resolve(node, &applicable, model)?;

        if !matches!(resolution.strategy, Strategy::Ignore) {
            let assigned = resolution.assignments.iter().rev().find_map(|(index, a)| {
                cx.origins
                    .get(index)
                    .filter(|origin| a.accepts(origin))
                    .map(|_| a.value().clone())
            });
            if let Some(value) = assigned {
                resolution.strategy = Strategy::Constant(value);
                resolution.hints.nullable = applicable.has_nullable();
                resolution.hints.after_generate = AfterGenerate::DoNotModify;
            }
        }
        trace!(path = %node.path(), strategy = resolution.strategy.name(), "visit");

        let outcome = match resolution.strategy {
            Strategy::Ignore => return Ok(Outcome::Ignored),
            _ if cx.random.null_roll(resolution.hints.nullable) => Outcome::Value(Value::Null),
            _ => self.produce_filtered(node, &resolution, cx)?,
        };

        if let Outcome::Value(value) = &outcome {
            for origin in &applicable.origins {
                cx.origins.insert(origin.index(), value.clone());
            }
            for callback in &resolution.callbacks {
                callback(value);
            }
        }
        Ok(outcome)
    }

    fn produce_filtered(
        &self,
        node: &Arc<Node>,
        resolution: &Resolution<'_>,
        cx: &mut Traversal,
    ) -> Result<Outcome> {
        let mut attempts = 0;
        loop {
            let outcome = self.produce(node, resolution, cx)?;
            let accepted = match &outcome {
                Outcome::Value(v) => resolution.filters.iter().all(|f| f(v)),
                _ => true,
            };
            if accepted {
                return Ok(outcome);
            }
            attempts += 1;
            if attempts >= self.max_attempts {
                return Err(Error::FilterExhausted {
                    path: node.path(),
                    attempts,
                });
            }
        }
    }

    fn produce(
        &self,
        node: &Arc<Node>,
        resolution: &Resolution<'_>,
        cx: &mut Traversal,
    ) -> Result<Outcome> {
        let ctx = GeneratorContext {
            settings: self.settings,
            options: resolution.options,
            ty: node.ty(),
            model: self.model(),
        };
        let generated = match &resolution.strategy {
            Strategy::Ignore => return Ok(Outcome::Ignored),
            Strategy::Null => return Ok(Outcome::Value(Value::Null)),
            Strategy::Recurse => return self.recurse(node, &resolution.hints, cx),
            Strategy::BuiltIn(builtin) => {
                return Ok(Outcome::Value(builtin.generate(&mut cx.random, &ctx)))
            }
            Strategy::Constant(v) => v.clone(),
            Strategy::Supplier(supply) => supply(&mut cx.random),
            Strategy::Custom(generator) => generator.generate(&mut cx.random, &ctx),
        };
        let mut value = generated;
        self.complete(node, &mut value, resolution.hints.after_generate, cx)?;
        Ok(Outcome::Value(value))
    }

    fn recurse(&self, node: &Arc<Node>, hints: &Hints, cx: &mut Traversal) -> Result<Outcome> {
        let value = match node.kind() {
            NodeKind::Struct { construction, .. } => return self.structure(node, *construction, cx),
            NodeKind::List => Value::List(self.elements(node, hints, false, cx)?),
            NodeKind::Set => Value::Set(self.elements(node, hints, true, cx)?),
            NodeKind::Array => Value::Array(self.array(node, hints, cx)?),
            NodeKind::Map => Value::Map(self.entries(node, hints, cx)?),
            NodeKind::Optional => match self.graph.children(node).first() {
                Some(inner) => self.populate(inner, cx)?.into_value(),
                None => Value::Null,
            },
            NodeKind::Primitive(_) | NodeKind::Enum { .. } | NodeKind::Unknown => Value::Null,
        };
        Ok(Outcome::Value(value))
    }

    fn structure(
        &self,
        node: &Arc<Node>,
        construction: Construction,
        cx: &mut Traversal,
    ) -> Result<Outcome> {
        let model = self.model();
        match construction {
            Construction::Mutable => {
                let mut instance = match self.instantiator.instantiate(node, model) {
                    Ok(instance) => instance,
                    Err(e) => return recovered(node, e),
                };
                for child in self.graph.children(node) {
                    match self.populate(child, cx)? {
                        Outcome::Ignored => {}
                        Outcome::Value(v) => {
                            self.assign(&mut instance, child, v)?;
                        }
                        Outcome::Failed => {
                            self.assign(&mut instance, child, Value::Null)?;
                        }
                    }
                }
                Ok(Outcome::Value(Value::Object(instance)))
            }
            Construction::Record => {
                let mut fields = IndexMap::new();
                for child in self.graph.children(node) {
                    let Some(name) = child.field_name() else { continue };
                    let value = self.populate(child, cx)?.into_value();
                    self.assigner.check(child, &value, model)?;
                    fields.insert(name.to_string(), value);
                }
                match self.instantiator.construct(node, fields, model) {
                    Ok(instance) => Ok(Outcome::Value(Value::Object(instance))),
                    Err(e) => recovered(node, e),
                }
            }
        }
    }

    fn elements(
        &self,
        node: &Arc<Node>,
        hints: &Hints,
        unique: bool,
        cx: &mut Traversal,
    ) -> Result<Vec<Value>> {
        let Some(element) = self.graph.children(node).first() else {
            return Ok(Vec::new());
        };
        if element.is_terminal() {
            return Ok(Vec::new());
        }
        let target = cx.random.usize_range(hints.size.0, hints.size.1);
        let budget = if unique { target + self.max_attempts } else { target };
        let mut items = Vec::with_capacity(target);
        let mut draws = 0;
        while items.len() < target && draws < budget {
            draws += 1;
            let item = if cx.random.null_roll(hints.nullable_elements) {
                Value::Null
            } else {
                match self.populate(element, cx)? {
                    Outcome::Value(v) => v,
                    Outcome::Ignored | Outcome::Failed => continue,
                }
            };
            if unique && items.contains(&item) {
                continue;
            }
            items.push(item);
        }
        if items.len() < target {
            debug!(path = %node.path(), target, realized = items.len(), "container smaller than target");
        }
        Ok(items)
    }

    fn array(&self, node: &Arc<Node>, hints: &Hints, cx: &mut Traversal) -> Result<Vec<Value>> {
        let Some(element) = self.graph.children(node).first() else {
            return Ok(Vec::new());
        };
        if element.is_terminal() {
            return Ok(Vec::new());
        }
        let len = cx.random.usize_range(hints.size.0, hints.size.1);
        let mut slots = Vec::with_capacity(len);
        for _ in 0..len {
            if cx.random.null_roll(hints.nullable_elements) {
                slots.push(Value::Null);
                continue;
            }
            match self.populate(element, cx)? {
                Outcome::Value(v) => slots.push(v),
                Outcome::Failed => slots.push(Value::Null),
                Outcome::Ignored => {}
            }
        }
        Ok(slots)
    }

    fn entries(
        &self,
        node: &Arc<Node>,
        hints: &Hints,
        cx: &mut Traversal,
    ) -> Result<Vec<(Value, Value)>> {
        let children = self.graph.children(node);
        let (Some(key_node), Some(value_node)) = (children.first(), children.get(1)) else {
            return Ok(Vec::new());
        };
        if key_node.is_terminal() || value_node.is_terminal() {
            return Ok(Vec::new());
        }
        let target = cx.random.usize_range(hints.size.0, hints.size.1);
        let budget = target + self.max_attempts;
        let mut entries: Vec<(Value, Value)> = Vec::with_capacity(target);
        let mut draws = 0;
        while entries.len() < target && draws < budget {
            draws += 1;
            let key = if cx.random.null_roll(hints.nullable_keys) {
                Value::Null
            } else {
                match self.populate(key_node, cx)? {
                    Outcome::Value(k) => k,
                    Outcome::Ignored | Outcome::Failed => continue,
                }
            };
            if entries.iter().any(|(k, _)| *k == key) {
                continue;
            }
            let value = if cx.random.null_roll(hints.nullable_values) {
                Value::Null
            } else {
                match self.populate(value_node, cx)? {
                    Outcome::Value(v) => v,
                    Outcome::Ignored | Outcome::Failed => continue,
                }
            };
            entries.push((key, value));
        }
        if entries.len() < target {
            debug!(path = %node.path(), target, realized = entries.len(), "map smaller than target");
        }
        Ok(entries)
    }

    /// Finish a value produced outside the engine according to `mode`.
    fn complete(
        &self,
        node: &Arc<Node>,
        value: &mut Value,
        mode: AfterGenerate,
        cx: &mut Traversal,
    ) -> Result<()> {
        if mode == AfterGenerate::DoNotModify || node.is_terminal() {
            return Ok(());
        }
        match value {
            Value::Object(instance) if !instance.is_frozen() => {
                let model = self.model();
                for child in self.graph.children(node) {
                    let Member::Field { name, .. } = child.member() else { continue };
                    let populate = match mode {
                        AfterGenerate::PopulateAll => true,
                        AfterGenerate::PopulateNulls => {
                            instance.get(name).map_or(true, Value::is_null)
                        }
                        AfterGenerate::ApplySelectors => {
                            let applicable = self.selectors.resolve(child, model);
                            applicable.value_producer().is_some()
                                || applicable.bindings.iter().any(|b| {
                                    matches!(b.action, Action::Assign(_))
                                })
                        }
                        AfterGenerate::DoNotModify => false,
                    };
                    if populate {
                        if let Outcome::Value(v) = self.populate(child, cx)? {
                            self.assign(instance, child, v)?;
                        }
                    } else if let Some(existing) = instance.get_mut(name) {
                        self.complete(child, existing, mode, cx)?;
                    }
                }
            }
            Value::List(items) | Value::Set(items) | Value::Array(items) => {
                if let Some(element) = self.graph.children(node).first() {
                    for item in items.iter_mut() {
                        self.complete(element, item, mode, cx)?;
                    }
                }
            }
            Value::Map(entries) => {
                if let Some(value_node) = self.graph.children(node).get(1) {
                    for (_, v) in entries.iter_mut() {
                        self.complete(value_node, v, mode, cx)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn empty_value(kind: &NodeKind) -> Value {
    match kind {
        NodeKind::List => Value::List(Vec::new()),
        NodeKind::Set => Value::Set(Vec::new()),
        NodeKind::Array => Value::Array(Vec::new()),
        NodeKind::Map => Value::Map(Vec::new()),
        _ => Value::Null,
    }
}

fn recovered(node: &Node, error: Error) -> Result<Outcome> {
    match error {
        Error::Construction { reason, .. } => {
            debug!(path = %node.path(), ty = %node.ty(), %reason, "construction failed, value omitted");
            Ok(Outcome::Failed)
        }
        other => Err(other),
    }
}
