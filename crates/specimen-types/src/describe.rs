//! Bridge from Rust types to type descriptions.
//!
//! A type implementing [`Describe`] knows its [`TypeExpr`] and can register the
//! definitions it depends on into a [`TypeModel`]. Together with
//! [`Value::deserialize_into`](crate::Value::deserialize_into) this lets callers
//! ask for a `Person` and get a `Person` back.
//!
//! # Example
//!
//! ```
//! use specimen_types::{Describe, TypeDef, TypeExpr, TypeModel};
//!
//! struct Person {
//!     name: String,
//!     friends: Vec<Person>,
//! }
//!
//! impl Describe for Person {
//!     fn type_expr() -> TypeExpr {
//!         TypeExpr::named("Person")
//!     }
//!
//!     fn register(model: &mut TypeModel) -> specimen_types::Result<()> {
//!         if model.contains("Person") {
//!             return Ok(());
//!         }
//!         model.insert(
//!             TypeDef::structure("Person")
//!                 .field("name", "String")
//!                 .field("friends", "List<Person>")
//!                 .build()?,
//!         )?;
//!         Ok(())
//!     }
//! }
//!
//! let model = specimen_types::describe::model_of::<Person>().unwrap();
//! assert!(model.contains("Person"));
//! ```
//!
//! Implementations for self-referential types must check
//! [`TypeModel::contains`] before registering, or registration never ends.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::model::TypeModel;
use crate::type_expr::{Primitive, TypeExpr};
use crate::Result;

pub trait Describe {
    /// The type expression values of this type are generated for.
    fn type_expr() -> TypeExpr;

    /// Register every named definition this type needs.
    fn register(_model: &mut TypeModel) -> Result<()> {
        Ok(())
    }
}

/// Build a model containing everything `T` needs.
pub fn model_of<T: Describe>() -> Result<TypeModel> {
    let mut model = TypeModel::new();
    T::register(&mut model)?;
    Ok(model)
}

macro_rules! describe_primitive {
    ($($t:ty => $p:ident),* $(,)?) => {
        $(impl Describe for $t {
            fn type_expr() -> TypeExpr {
                TypeExpr::Primitive(Primitive::$p)
            }
        })*
    };
}

describe_primitive!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
);

impl<T: Describe> Describe for Option<T> {
    fn type_expr() -> TypeExpr {
        TypeExpr::optional(T::type_expr())
    }

    fn register(model: &mut TypeModel) -> Result<()> {
        T::register(model)
    }
}

impl<T: Describe> Describe for Box<T> {
    fn type_expr() -> TypeExpr {
        T::type_expr()
    }

    fn register(model: &mut TypeModel) -> Result<()> {
        T::register(model)
    }
}

macro_rules! describe_sequence {
    ($($c:ident => $ctor:path),* $(,)?) => {
        $(impl<T: Describe> Describe for $c<T> {
            fn type_expr() -> TypeExpr {
                $ctor(T::type_expr())
            }

            fn register(model: &mut TypeModel) -> Result<()> {
                T::register(model)
            }
        })*
    };
}

describe_sequence!(
    Vec => TypeExpr::list,
    VecDeque => TypeExpr::list,
    HashSet => TypeExpr::set,
    BTreeSet => TypeExpr::set,
);

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn type_expr() -> TypeExpr {
        TypeExpr::array(T::type_expr())
    }

    fn register(model: &mut TypeModel) -> Result<()> {
        T::register(model)
    }
}

impl<K: Describe, V: Describe> Describe for HashMap<K, V> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(K::type_expr(), V::type_expr())
    }

    fn register(model: &mut TypeModel) -> Result<()> {
        K::register(model)?;
        V::register(model)
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn type_expr() -> TypeExpr {
        TypeExpr::map(K::type_expr(), V::type_expr())
    }

    fn register(model: &mut TypeModel) -> Result<()> {
        K::register(model)?;
        V::register(model)
    }
}
