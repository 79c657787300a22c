//! Instance construction and member assignment.
//!
//! An [`Instantiator`] creates struct instances: empty ones for mutable types
//! that are then filled member by member, or complete ones for record-like
//! types whose members are all passed at construction. Failures are
//! [`Error::Construction`] and are recovered by the engine.
//!
//! [`AssignmentStrategy`] writes a produced value into its parent. The policy
//! is chosen once per build from settings. Under [`AssignmentType::Method`]
//! a member with a declared mutator is written through
//! [`Instantiator::invoke_mutator`], so a custom instantiator can run its own
//! setter logic.

use indexmap::IndexMap;
use specimen_types::{Instance, TypeModel, Value};
use tracing::trace;

use crate::node::{Member, Node, NodeKind};
use crate::settings::{AssignmentType, Keys, OnSetterMissing, Settings};
use crate::{Error, Result};

pub trait Instantiator: Send + Sync {
    /// An empty instance of the node's type, ready for member assignment.
    fn instantiate(&self, node: &Node, model: &TypeModel) -> Result<Instance>;

    /// A record-like instance built from every member at once.
    fn construct(
        &self,
        node: &Node,
        fields: IndexMap<String, Value>,
        model: &TypeModel,
    ) -> Result<Instance>;

    /// Store `value` in `field` through the member's `mutator`. The default
    /// behaves like a plain setter and writes the member.
    fn invoke_mutator(
        &self,
        instance: &mut Instance,
        mutator: &str,
        field: &str,
        value: Value,
    ) -> Result<()> {
        trace!(ty = instance.type_name(), mutator, "invoking mutator");
        instance.set(field, value)?;
        Ok(())
    }
}

/// Instantiates every concrete struct in the model. Abstract types and
/// names the model does not define cannot be constructed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInstantiator;

impl DefaultInstantiator {
    fn check(node: &Node, model: &TypeModel) -> Result<()> {
        let name = node.ty().raw_name();
        let failure = |reason: &str| Error::Construction {
            path: node.path(),
            type_name: name.to_string(),
            reason: reason.to_string(),
        };
        match node.kind() {
            NodeKind::Struct {
                is_abstract: true, ..
            } => Err(failure("type is abstract; map it to a concrete subtype")),
            NodeKind::Struct { .. } if model.contains(name) => Ok(()),
            _ => Err(failure("not a struct type")),
        }
    }
}

impl Instantiator for DefaultInstantiator {
    fn instantiate(&self, node: &Node, model: &TypeModel) -> Result<Instance> {
        Self::check(node, model)?;
        Ok(Instance::new(node.ty().raw_name()))
    }

    fn construct(
        &self,
        node: &Node,
        fields: IndexMap<String, Value>,
        model: &TypeModel,
    ) -> Result<Instance> {
        Self::check(node, model)?;
        Ok(Instance::record(node.ty().raw_name(), fields))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentStrategy {
    kind: AssignmentType,
    on_missing: OnSetterMissing,
}

impl AssignmentStrategy {
    pub fn new(kind: AssignmentType, on_missing: OnSetterMissing) -> Self {
        Self { kind, on_missing }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.get(&Keys::ASSIGNMENT_TYPE),
            settings.get(&Keys::ON_SET_METHOD_NOT_FOUND),
        )
    }

    /// Fails when `value` cannot be stored in the member `node` declares.
    pub fn check(&self, node: &Node, value: &Value, model: &TypeModel) -> Result<()> {
        if value.conforms_to(node.declared_ty(), model) {
            return Ok(());
        }
        Err(Error::Assignment {
            path: node.path(),
            expected: node.declared_ty().to_string(),
            actual: value.kind_name(),
        })
    }

    /// Write `value` into `parent` at the member `node` describes. Returns
    /// whether the value was written.
    pub fn assign(
        &self,
        instantiator: &dyn Instantiator,
        parent: &mut Instance,
        node: &Node,
        value: Value,
        model: &TypeModel,
    ) -> Result<bool> {
        let Member::Field { name, mutator, .. } = node.member() else {
            return Ok(false);
        };
        self.check(node, &value, model)?;

        if self.kind == AssignmentType::Method {
            if let Some(mutator) = mutator {
                instantiator.invoke_mutator(parent, mutator, name, value)?;
                return Ok(true);
            }
            match self.on_missing {
                OnSetterMissing::Ignore => {
                    trace!(path = %node.path(), "no mutator, member skipped");
                    return Ok(false);
                }
                OnSetterMissing::Fail => {
                    return Err(Error::MissingMutator { path: node.path() });
                }
                OnSetterMissing::AssignField => {}
            }
        }
        parent.set(name.clone(), value)?;
        Ok(true)
    }
}
