//! Selector bindings: what happens to the nodes a selector matches.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use specimen_types::{TypeExpr, Value};

use crate::generators::GenOptions;
use crate::random::RandomSource;
use crate::selectors::Selector;
use crate::settings::AfterGenerate;

pub type SupplyFn = Arc<dyn Fn(&mut RandomSource) -> Value + Send + Sync>;
pub type CallbackFn = Arc<dyn Fn(&Value) + Send + Sync>;
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Groups used when reporting unused bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ignore,
    Nullable,
    Generator,
    Callback,
    Subtype,
    Assign,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ignore => "ignore",
            Category::Nullable => "nullable",
            Category::Generator => "generator",
            Category::Callback => "callback",
            Category::Subtype => "subtype",
            Category::Assign => "assign",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub enum Action {
    Ignore,
    Nullable,
    Set(Value),
    Supply {
        supplier: SupplyFn,
        after: AfterGenerate,
    },
    Generate(GenOptions),
    Subtype(TypeExpr),
    OnComplete(CallbackFn),
    Filter(PredicateFn),
    Assign(Assignment),
}

impl Action {
    pub fn category(&self) -> Category {
        match self {
            Action::Ignore => Category::Ignore,
            Action::Nullable => Category::Nullable,
            Action::Set(_) | Action::Supply { .. } | Action::Generate(_) | Action::Filter(_) => {
                Category::Generator
            }
            Action::Subtype(_) => Category::Subtype,
            Action::OnComplete(_) => Category::Callback,
            Action::Assign(_) => Category::Assign,
        }
    }

    /// Set, supply, and generate bindings compete; the last registered wins.
    pub fn is_value_producing(&self) -> bool {
        matches!(
            self,
            Action::Set(_) | Action::Supply { .. } | Action::Generate(_)
        )
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Ignore => write!(f, "Ignore"),
            Action::Nullable => write!(f, "Nullable"),
            Action::Set(v) => f.debug_tuple("Set").field(v).finish(),
            Action::Supply { after, .. } => f.debug_struct("Supply").field("after", after).finish(),
            Action::Generate(o) => f.debug_tuple("Generate").field(o).finish(),
            Action::Subtype(t) => write!(f, "Subtype({t})"),
            Action::OnComplete(_) => write!(f, "OnComplete"),
            Action::Filter(_) => write!(f, "Filter"),
            Action::Assign(a) => f.debug_tuple("Assign").field(a).finish(),
        }
    }
}

/// A conditional assignment: when the most recent value produced at a node
/// matching `origin` satisfies the predicate, nodes matching `destination`
/// receive `value`.
///
/// ```
/// use specimen_core::selectors::{select, Assignment};
///
/// let rule = Assignment::given(select::field("status"))
///     .satisfies(|v| v.as_str() == Some("SHIPPED"))
///     .set(select::field("tracking_id"), "TRK-1");
/// ```
#[derive(Clone)]
pub struct Assignment {
    origin: Selector,
    predicate: PredicateFn,
    destination: Selector,
    value: Value,
}

impl Assignment {
    pub fn given(origin: Selector) -> AssignmentBuilder {
        AssignmentBuilder {
            origin,
            predicate: Arc::new(|_| true),
        }
    }

    pub fn origin(&self) -> &Selector {
        &self.origin
    }

    pub fn destination(&self) -> &Selector {
        &self.destination
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn accepts(&self, origin_value: &Value) -> bool {
        (self.predicate)(origin_value)
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assignment")
            .field("origin", &self.origin.to_string())
            .field("destination", &self.destination.to_string())
            .field("value", &self.value)
            .finish()
    }
}

pub struct AssignmentBuilder {
    origin: Selector,
    predicate: PredicateFn,
}

impl AssignmentBuilder {
    pub fn satisfies(mut self, predicate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    pub fn set(self, destination: Selector, value: impl Into<Value>) -> Assignment {
        Assignment {
            origin: self.origin,
            predicate: self.predicate,
            destination,
            value: value.into(),
        }
    }
}

/// A selector paired with an action, remembering where it was declared.
#[derive(Debug, Clone)]
pub struct SelectorBinding {
    pub(crate) index: usize,
    pub selector: Selector,
    pub action: Action,
    pub location: &'static Location<'static>,
}

impl SelectorBinding {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn category(&self) -> Category {
        self.action.category()
    }
}
