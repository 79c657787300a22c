//! Type descriptions and dynamic values for the specimen workspace.
//!
//! This crate is the introspection layer the population engine works against.
//! Rust has no runtime reflection, so types are described explicitly:
//!
//! - [`TypeExpr`] / [`Primitive`] - the shape of a value, including generic
//!   parameters and containers
//! - [`TypeModel`] - registry of named struct and enum definitions, loadable
//!   from JSON or filled through [`Describe`]
//! - [`Value`] / [`Instance`] - the dynamic value tree produced by population,
//!   convertible to JSON and deserializable into concrete Rust types
//!
//! ## Type strings
//!
//! Types can be written as strings and parsed with [`parse_type_expr`]:
//! `Pair<String, List<i32>>`, `Map<String, u64>`, `[i32]`, `Option<Person>`.

pub mod describe;
pub mod env_utils;
pub mod model;
pub mod type_expr;
pub mod type_parsing;
pub mod value;

pub use describe::Describe;
pub use model::{
    Construction, EnumDef, FieldDef, StructBuilder, StructDef, TypeDef, TypeKind, TypeModel,
    TypeParamDef,
};
pub use type_expr::{Primitive, TypeExpr};
pub use type_parsing::{parse_type_expr, parse_type_expr_in};
pub use value::{Instance, Value};

/// Errors raised while describing types or converting values.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("cannot parse type '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("invalid definition of '{type_name}': {reason}")]
    InvalidDefinition { type_name: String, reason: String },

    #[error("instance of '{0}' is frozen and cannot be modified")]
    Frozen(String),

    #[error("value does not fit '{expected}': {reason}")]
    Conversion { expected: String, reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = TypeError> = std::result::Result<T, E>;
