//! GeneratorResolver: picks how a node's value is produced and the hints
//! that govern it.
//!
//! ## Strategy order
//!
//! 1. an ignore binding removes the node
//! 2. the last set, supply, or generate binding; `generate` only adds options
//!    and falls through to the default resolution below
//! 3. a registered generator for the exact or nearest assignable type
//! 4. the built-in generator for primitives and enums
//! 5. recursion into structs, containers, and options
//! 6. null for anything else
//!
//! ## Hints
//!
//! Layers apply field by field: settings, then the generator's own defaults,
//! then per-node options and nullable bindings.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use specimen_types::{Primitive, TypeModel, Value};

use crate::generators::{BuiltIn, GenOptions, Generator, GeneratorRegistry};
use crate::node::{Node, NodeKind};
use crate::selectors::{Action, Applicable, Assignment, CallbackFn, PredicateFn, SupplyFn};
use crate::settings::{AfterGenerate, Keys, Settings};
use crate::Result;

#[derive(Clone)]
pub enum Strategy {
    Ignore,
    Constant(Value),
    Supplier(SupplyFn),
    Custom(Arc<dyn Generator>),
    BuiltIn(BuiltIn),
    Recurse,
    Null,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Ignore => "ignore",
            Strategy::Constant(_) => "constant",
            Strategy::Supplier(_) => "supplier",
            Strategy::Custom(_) => "custom",
            Strategy::BuiltIn(b) => b.id(),
            Strategy::Recurse => "recurse",
            Strategy::Null => "null",
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Constant(v) => write!(f, "Constant({v})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Per-node generation directives. Computed once per node visit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hints {
    pub nullable: bool,
    pub nullable_elements: bool,
    pub nullable_keys: bool,
    pub nullable_values: bool,
    /// Inclusive size range for collections, maps, and arrays.
    pub size: (usize, usize),
    pub after_generate: AfterGenerate,
}

pub struct Resolution<'a> {
    pub strategy: Strategy,
    pub hints: Hints,
    pub options: Option<&'a GenOptions>,
    pub filters: SmallVec<[&'a PredicateFn; 2]>,
    pub callbacks: SmallVec<[&'a CallbackFn; 2]>,
    /// Conditional assignments targeting this node with their binding
    /// index, in registration order.
    pub assignments: SmallVec<[(usize, &'a Assignment); 2]>,
}

impl fmt::Debug for Resolution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("strategy", &self.strategy)
            .field("hints", &self.hints)
            .field("filters", &self.filters.len())
            .field("callbacks", &self.callbacks.len())
            .field("assignments", &self.assignments.len())
            .finish()
    }
}

pub struct GeneratorResolver<'s> {
    settings: &'s Settings,
    registry: &'s GeneratorRegistry,
}

impl<'s> GeneratorResolver<'s> {
    pub fn new(settings: &'s Settings, registry: &'s GeneratorRegistry) -> Self {
        Self { settings, registry }
    }

    pub fn resolve<'a>(
        &self,
        node: &Node,
        applicable: &Applicable<'a>,
        model: &TypeModel,
    ) -> Result<Resolution<'a>> {
        let mut filters = SmallVec::new();
        let mut callbacks = SmallVec::new();
        let mut assignments = SmallVec::new();
        for binding in applicable.bindings.iter().copied() {
            match &binding.action {
                Action::Filter(p) => filters.push(p),
                Action::OnComplete(c) => callbacks.push(c),
                Action::Assign(a) => assignments.push((binding.index(), a)),
                _ => {}
            }
        }

        let producer = applicable.value_producer().map(|b| &b.action);
        let options = match producer {
            Some(Action::Generate(opts)) => {
                opts.validate()?;
                Some(opts)
            }
            _ => None,
        };

        let (strategy, custom) = if applicable.has_ignore() {
            (Strategy::Ignore, None)
        } else {
            match producer {
                Some(Action::Set(v)) => (Strategy::Constant(v.clone()), None),
                Some(Action::Supply { supplier, .. }) => (Strategy::Supplier(supplier.clone()), None),
                _ => self.default_strategy(node, model),
            }
        };

        let mut hints = self.base_hints(node.kind());
        if let Some(g) = &custom {
            let gh = g.hints();
            if let Some(nullable) = gh.nullable {
                hints.nullable = nullable;
            }
            if let Some(after) = gh.after_generate {
                hints.after_generate = after;
            }
        }
        // Explicit values are only nulled by a nullable binding, never by
        // type-level settings.
        match producer {
            Some(Action::Set(_)) => {
                hints.nullable = false;
                hints.after_generate = AfterGenerate::DoNotModify;
            }
            Some(Action::Supply { after, .. }) => {
                hints.nullable = false;
                hints.after_generate = *after;
            }
            _ => {}
        }
        if let Some(opts) = options {
            if let Some(size) = opts.size {
                hints.size = size;
            }
            if let Some(v) = opts.nullable_elements {
                hints.nullable_elements = v;
            }
            if let Some(v) = opts.nullable_keys {
                hints.nullable_keys = v;
            }
            if let Some(v) = opts.nullable_values {
                hints.nullable_values = v;
            }
            if let Some(after) = opts.after_generate {
                hints.after_generate = after;
            }
        }
        if applicable.has_nullable() {
            hints.nullable = true;
        }

        Ok(Resolution {
            strategy,
            hints,
            options,
            filters,
            callbacks,
            assignments,
        })
    }

    fn default_strategy(
        &self,
        node: &Node,
        model: &TypeModel,
    ) -> (Strategy, Option<Arc<dyn Generator>>) {
        if let Some(g) = self.registry.lookup(node.ty(), model) {
            return (Strategy::Custom(g.clone()), Some(g));
        }
        if let Some(builtin) = BuiltIn::for_kind(node.kind()) {
            return (Strategy::BuiltIn(builtin), None);
        }
        let strategy = match node.kind() {
            NodeKind::Struct { .. }
            | NodeKind::List
            | NodeKind::Set
            | NodeKind::Map
            | NodeKind::Array
            | NodeKind::Optional => Strategy::Recurse,
            _ => Strategy::Null,
        };
        (strategy, None)
    }

    fn base_hints(&self, kind: &NodeKind) -> Hints {
        let s = self.settings;
        let nullable = match kind {
            NodeKind::Primitive(p) => match p {
                Primitive::String => s.get(&Keys::STRING_NULLABLE),
                Primitive::Bool => s.get(&Keys::BOOLEAN_NULLABLE),
                Primitive::Char => s.get(&Keys::CHARACTER_NULLABLE),
                p if p.is_float() => s.get(&Keys::FLOAT_NULLABLE),
                p if p.integer_bounds().is_some() => s.get(&Keys::INTEGER_NULLABLE),
                _ => false,
            },
            NodeKind::Enum { .. } => s.get(&Keys::ENUM_NULLABLE),
            NodeKind::List | NodeKind::Set => s.get(&Keys::COLLECTION_NULLABLE),
            NodeKind::Map => s.get(&Keys::MAP_NULLABLE),
            NodeKind::Array => s.get(&Keys::ARRAY_NULLABLE),
            NodeKind::Optional => s.get(&Keys::OPTION_NULLABLE),
            NodeKind::Struct { .. } | NodeKind::Unknown => false,
        };
        let (size, nullable_elements) = match kind {
            NodeKind::Map => (
                (s.get(&Keys::MAP_MIN_SIZE), s.get(&Keys::MAP_MAX_SIZE)),
                false,
            ),
            NodeKind::Array => (
                (s.get(&Keys::ARRAY_MIN_LENGTH), s.get(&Keys::ARRAY_MAX_LENGTH)),
                s.get(&Keys::ARRAY_ELEMENTS_NULLABLE),
            ),
            _ => (
                (s.get(&Keys::COLLECTION_MIN_SIZE), s.get(&Keys::COLLECTION_MAX_SIZE)),
                s.get(&Keys::COLLECTION_ELEMENTS_NULLABLE),
            ),
        };
        Hints {
            nullable,
            nullable_elements,
            nullable_keys: s.get(&Keys::MAP_KEYS_NULLABLE),
            nullable_values: s.get(&Keys::MAP_VALUES_NULLABLE),
            size,
            after_generate: s.get(&Keys::AFTER_GENERATE),
        }
    }
}
