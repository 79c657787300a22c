//! Type expressions describing the shape of a value to synthesize.
//!
//! A [`TypeExpr`] is the unit the resolver substitutes into, the node graph
//! expands, and selectors match against. Named types refer to entries in a
//! [`TypeModel`](crate::model::TypeModel); everything else is built in.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar types with a built-in generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Uuid,
    Date,
    DateTime,
}

impl Primitive {
    /// Canonical spelling used in type strings and selectors.
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Char => "char",
            Primitive::String => "String",
            Primitive::Uuid => "Uuid",
            Primitive::Date => "Date",
            Primitive::DateTime => "DateTime",
        }
    }

    /// Look up a primitive by its canonical spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        let prim = match name {
            "bool" => Primitive::Bool,
            "i8" => Primitive::I8,
            "i16" => Primitive::I16,
            "i32" => Primitive::I32,
            "i64" => Primitive::I64,
            "u8" => Primitive::U8,
            "u16" => Primitive::U16,
            "u32" => Primitive::U32,
            "u64" => Primitive::U64,
            "f32" => Primitive::F32,
            "f64" => Primitive::F64,
            "char" => Primitive::Char,
            "String" | "string" => Primitive::String,
            "Uuid" => Primitive::Uuid,
            "Date" => Primitive::Date,
            "DateTime" => Primitive::DateTime,
            _ => return None,
        };
        Some(prim)
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    /// Inclusive bounds of an integer primitive, widened to `i128`.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        let bounds = match self {
            Primitive::I8 => (i8::MIN as i128, i8::MAX as i128),
            Primitive::I16 => (i16::MIN as i128, i16::MAX as i128),
            Primitive::I32 => (i32::MIN as i128, i32::MAX as i128),
            Primitive::I64 => (i64::MIN as i128, i64::MAX as i128),
            Primitive::U8 => (0, u8::MAX as i128),
            Primitive::U16 => (0, u16::MAX as i128),
            Primitive::U32 => (0, u32::MAX as i128),
            Primitive::U64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(bounds)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A possibly generic type.
///
/// `Param` only appears in declarations; after resolution every reachable
/// parameter has been substituted or replaced by `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeExpr {
    Primitive(Primitive),
    Named { name: String, args: Vec<TypeExpr> },
    Param(String),
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Array(Box<TypeExpr>),
    Optional(Box<TypeExpr>),
    /// A type that could not be resolved; populated as null.
    Unknown,
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Named {
            name: name.into(),
            args,
        }
    }

    pub fn list(inner: TypeExpr) -> Self {
        TypeExpr::List(Box::new(inner))
    }

    pub fn set(inner: TypeExpr) -> Self {
        TypeExpr::Set(Box::new(inner))
    }

    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Map(Box::new(key), Box::new(value))
    }

    pub fn array(inner: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(inner))
    }

    pub fn optional(inner: TypeExpr) -> Self {
        TypeExpr::Optional(Box::new(inner))
    }

    /// Name without type arguments, as matched by type selectors and the
    /// generator registry.
    pub fn raw_name(&self) -> &str {
        match self {
            TypeExpr::Primitive(p) => p.name(),
            TypeExpr::Named { name, .. } => name,
            TypeExpr::Param(name) => name,
            TypeExpr::List(_) => "List",
            TypeExpr::Set(_) => "Set",
            TypeExpr::Map(_, _) => "Map",
            TypeExpr::Array(_) => "Array",
            TypeExpr::Optional(_) => "Option",
            TypeExpr::Unknown => "?",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            TypeExpr::List(_) | TypeExpr::Set(_) | TypeExpr::Map(_, _) | TypeExpr::Array(_)
        )
    }

    /// True if no type parameter or unknown marker remains anywhere inside.
    pub fn is_concrete(&self) -> bool {
        match self {
            TypeExpr::Primitive(_) => true,
            TypeExpr::Named { args, .. } => args.iter().all(TypeExpr::is_concrete),
            TypeExpr::Param(_) | TypeExpr::Unknown => false,
            TypeExpr::List(inner)
            | TypeExpr::Set(inner)
            | TypeExpr::Array(inner)
            | TypeExpr::Optional(inner) => inner.is_concrete(),
            TypeExpr::Map(k, v) => k.is_concrete() && v.is_concrete(),
        }
    }

    /// Names of type parameters referenced anywhere in this expression,
    /// in first-seen order.
    pub fn params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Param(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            TypeExpr::Named { args, .. } => args.iter().for_each(|a| a.collect_params(out)),
            TypeExpr::List(inner)
            | TypeExpr::Set(inner)
            | TypeExpr::Array(inner)
            | TypeExpr::Optional(inner) => inner.collect_params(out),
            TypeExpr::Map(k, v) => {
                k.collect_params(out);
                v.collect_params(out);
            }
            TypeExpr::Primitive(_) | TypeExpr::Unknown => {}
        }
    }

    /// Replace parameters using `bindings`. Parameters without a binding are
    /// left in place so the caller can decide how to degrade.
    pub fn substitute(&self, bindings: &BTreeMap<String, TypeExpr>) -> TypeExpr {
        match self {
            TypeExpr::Param(name) => bindings
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            TypeExpr::Named { name, args } => TypeExpr::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            TypeExpr::List(inner) => TypeExpr::list(inner.substitute(bindings)),
            TypeExpr::Set(inner) => TypeExpr::set(inner.substitute(bindings)),
            TypeExpr::Array(inner) => TypeExpr::array(inner.substitute(bindings)),
            TypeExpr::Optional(inner) => TypeExpr::optional(inner.substitute(bindings)),
            TypeExpr::Map(k, v) => TypeExpr::map(k.substitute(bindings), v.substitute(bindings)),
            TypeExpr::Primitive(_) | TypeExpr::Unknown => self.clone(),
        }
    }

    /// Replace every remaining parameter with `Unknown`.
    pub fn erase_params(&self) -> TypeExpr {
        match self {
            TypeExpr::Param(_) => TypeExpr::Unknown,
            TypeExpr::Named { name, args } => TypeExpr::Named {
                name: name.clone(),
                args: args.iter().map(TypeExpr::erase_params).collect(),
            },
            TypeExpr::List(inner) => TypeExpr::list(inner.erase_params()),
            TypeExpr::Set(inner) => TypeExpr::set(inner.erase_params()),
            TypeExpr::Array(inner) => TypeExpr::array(inner.erase_params()),
            TypeExpr::Optional(inner) => TypeExpr::optional(inner.erase_params()),
            TypeExpr::Map(k, v) => TypeExpr::map(k.erase_params(), v.erase_params()),
            TypeExpr::Primitive(_) | TypeExpr::Unknown => self.clone(),
        }
    }
}

impl From<Primitive> for TypeExpr {
    fn from(p: Primitive) -> Self {
        TypeExpr::Primitive(p)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Primitive(p) => write!(f, "{}", p),
            TypeExpr::Named { name, args } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeExpr::Param(name) => write!(f, "{}", name),
            TypeExpr::List(inner) => write!(f, "List<{}>", inner),
            TypeExpr::Set(inner) => write!(f, "Set<{}>", inner),
            TypeExpr::Map(k, v) => write!(f, "Map<{}, {}>", k, v),
            TypeExpr::Array(inner) => write!(f, "[{}]", inner),
            TypeExpr::Optional(inner) => write!(f, "Option<{}>", inner),
            TypeExpr::Unknown => write!(f, "?"),
        }
    }
}

// Type expressions travel through schemas as type strings.
impl Serialize for TypeExpr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TypeExpr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::type_parsing::parse_type_expr(&s).map_err(serde::de::Error::custom)
    }
}
