//! Specimen Core
//!
//! Object-population engine: synthesizes fully populated values of
//! described types for use as test fixtures.
//!
//! # Pipeline
//!
//! A [`Request`] names a root type and carries ordered selector bindings and
//! settings overrides. [`PopulationModel`] resolves the root's generic
//! parameters, builds the bounded [`NodeGraph`](node::NodeGraph), and
//! [`PopulationEngine`](engine::PopulationEngine) walks it, choosing a
//! strategy for every node and assigning the results into instances.
//!
//! # Core Modules
//!
//! - [`random`]: seeded random stream, one per build
//! - [`settings`]: typed keys layered over locked process-wide defaults
//! - [`resolver`]: generic parameter resolution across supertype chains
//! - [`node`]: lazily expanded node tree with cycle and depth bounds
//! - [`selectors`]: selectors, bindings, precedence, unused tracking
//! - [`strategy`]: per-node strategy and hints
//! - [`generators`]: built-in and registered generators
//! - [`engine`]: traversal, filters, callbacks, conditional assignment
//! - [`assignment`]: instantiation and member assignment
//! - [`convert`]: typed JSON input
//!
//! # Example
//!
//! ```ignore
//! use specimen_core::{Request, Specimen};
//! use specimen_core::selectors::select;
//!
//! let specimen = Specimen::new(model);
//! let request = Request::builder("Order")
//!     .set(select::field("status"), "NEW")
//!     .with_nullable(select::field("coupon"))
//!     .with_seed(42)
//!     .build()?;
//! let order = specimen.create(&request)?;
//! ```

#![allow(clippy::result_large_err)]
#![allow(clippy::type_complexity)]

pub mod assignment;
pub mod convert;
pub mod engine;
pub mod error;
pub mod generators;
pub mod node;
pub mod population;
pub mod random;
pub mod request;
pub mod resolver;
pub mod selectors;
pub mod settings;
pub mod strategy;

pub use error::{Error, Result};
pub use population::{Population, PopulationModel, Specimen};
pub use request::{Request, RequestBuilder};
pub use selectors::{select, Selector};
pub use settings::{Keys, Settings};
