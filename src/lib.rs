//! Specimen
//!
//! Populate described types with random, reproducible values for test
//! fixtures:
//!
//! - **Type model**: describe structs, enums, generics, and inheritance in a
//!   [`TypeModel`], from JSON or through [`Describe`]
//! - **Requests**: pick a root type, then bind selectors to ignore, set,
//!   supply, filter, or retype parts of the graph
//! - **Population**: seeded traversal of the bounded node graph, with
//!   built-in and registered generators
//!
//! See [`specimen_core`] for the engine and [`specimen_types`] for the type
//! and value model.

#![allow(clippy::result_large_err)]

pub use specimen_core::{
    assignment, convert, engine, error, generators, node, population, random, request, resolver,
    selectors, settings, strategy,
};
pub use specimen_core::{
    select, Error, Keys, Population, PopulationModel, Request, RequestBuilder, Result, Selector,
    Settings, Specimen,
};
pub use specimen_types::{
    env_utils, parse_type_expr, Describe, Instance, Primitive, TypeDef, TypeError, TypeExpr,
    TypeModel, Value,
};
