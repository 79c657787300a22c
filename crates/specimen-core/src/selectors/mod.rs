//! Selector resolution.
//!
//! Selectors pick nodes; bindings attach an action to a selector. The
//! [`SelectorEngine`] returns every binding that applies to a node in
//! registration order and reports bindings that never matched.

mod binding;
mod engine;
mod report;
mod selector;

pub use binding::{
    Action, Assignment, AssignmentBuilder, CallbackFn, Category, PredicateFn, SelectorBinding,
    SupplyFn,
};
pub use engine::{Applicable, SelectorEngine, Usage};
pub use report::{UnusedBinding, UnusedSelectorReport};
pub use selector::{select, DepthBound, Selector};
