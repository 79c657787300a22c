//! Matching registered bindings against nodes and tracking which ones fired.

use std::collections::BTreeSet;

use smallvec::SmallVec;
use specimen_types::TypeModel;

use super::binding::{Action, SelectorBinding};
use super::report::{UnusedBinding, UnusedSelectorReport};
use crate::node::{Node, SubtypeRule};

/// Bindings that apply to one node, in registration order.
#[derive(Debug, Default)]
pub struct Applicable<'a> {
    /// Bindings whose selector matches the node. Subtype bindings are
    /// excluded; they act while the graph is built.
    pub bindings: SmallVec<[&'a SelectorBinding; 4]>,
    /// Assign bindings whose origin selector matches the node. The value
    /// produced here is recorded for later destinations.
    pub origins: SmallVec<[&'a SelectorBinding; 2]>,
}

impl<'a> Applicable<'a> {
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.origins.is_empty()
    }

    pub fn has_ignore(&self) -> bool {
        self.bindings
            .iter()
            .any(|b| matches!(b.action, Action::Ignore))
    }

    pub fn has_nullable(&self) -> bool {
        self.bindings
            .iter()
            .any(|b| matches!(b.action, Action::Nullable))
    }

    /// The last registered set/supply/generate binding.
    pub fn value_producer(&self) -> Option<&'a SelectorBinding> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.action.is_value_producing())
            .copied()
    }
}

/// Set of binding indices that matched at least one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage {
    used: BTreeSet<usize>,
}

impl Usage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, index: usize) {
        self.used.insert(index);
    }

    pub fn merge(&mut self, other: &Usage) {
        self.used.extend(other.used.iter().copied());
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.used.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectorEngine {
    bindings: Vec<SelectorBinding>,
}

impl SelectorEngine {
    /// Bindings are re-indexed by their position, which is their
    /// registration order.
    pub fn new(mut bindings: Vec<SelectorBinding>) -> Self {
        for (i, b) in bindings.iter_mut().enumerate() {
            b.index = i;
        }
        Self { bindings }
    }

    pub fn bindings(&self) -> &[SelectorBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn resolve(&self, node: &Node, model: &TypeModel) -> Applicable<'_> {
        let mut applicable = Applicable::default();
        for binding in &self.bindings {
            if let Action::Assign(assignment) = &binding.action {
                if assignment.origin().matches(node, model) {
                    applicable.origins.push(binding);
                }
            }
            if matches!(binding.action, Action::Subtype(_)) {
                continue;
            }
            if binding.selector.matches(node, model) {
                applicable.bindings.push(binding);
            }
        }
        applicable
    }

    /// Subtype bindings in registration order, for graph construction.
    pub fn subtype_rules(&self) -> Vec<SubtypeRule> {
        self.bindings
            .iter()
            .filter_map(|b| match &b.action {
                Action::Subtype(target) => Some(SubtypeRule {
                    binding: b.index,
                    selector: b.selector.clone(),
                    target: target.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn unused(&self, usage: &Usage) -> UnusedSelectorReport {
        let unused = self
            .bindings
            .iter()
            .filter(|b| !usage.is_used(b.index))
            .map(|b| UnusedBinding {
                category: b.category(),
                selector: b.selector.to_string(),
                location: b.location.to_string(),
            })
            .collect();
        UnusedSelectorReport { unused }
    }
}
