//! Typed conversion from JSON into [`Value`]s.
//!
//! Used for values that arrive as text, such as `--set path=json` on the
//! command line. The target type decides how each JSON value is read, so
//! `"2024-01-31"` becomes a date where a `Date` is expected and a string
//! elsewhere.

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::Value as Json;
use specimen_types::{Construction, Instance, Primitive, TypeError, TypeExpr, TypeKind, Value};

use crate::resolver::TypeResolver;
use crate::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn mismatch(ty: &TypeExpr, reason: impl Into<String>) -> crate::Error {
    TypeError::Conversion {
        expected: ty.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Read `json` as a value of `ty`.
pub fn value_from_json(json: &Json, ty: &TypeExpr, resolver: &TypeResolver) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        TypeExpr::Primitive(p) => primitive(json, *p, ty),
        TypeExpr::Optional(inner) => value_from_json(json, inner, resolver),
        TypeExpr::List(inner) => Ok(Value::List(elements(json, inner, ty, resolver)?)),
        TypeExpr::Set(inner) => Ok(Value::Set(elements(json, inner, ty, resolver)?)),
        TypeExpr::Array(inner) => Ok(Value::Array(elements(json, inner, ty, resolver)?)),
        TypeExpr::Map(k, v) => {
            let Json::Object(map) = json else {
                return Err(mismatch(ty, "expected a JSON object"));
            };
            map.iter()
                .map(|(key, val)| {
                    let key = match k.as_ref() {
                        TypeExpr::Primitive(Primitive::String) => Value::String(key.clone()),
                        other => {
                            let parsed = serde_json::from_str(key)
                                .unwrap_or_else(|_| Json::String(key.clone()));
                            value_from_json(&parsed, other, resolver)?
                        }
                    };
                    Ok((key, value_from_json(val, v, resolver)?))
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Map)
        }
        TypeExpr::Named { name, .. } => match resolver.model().get(name).map(|d| &d.kind) {
            Some(TypeKind::Enum(e)) => match json.as_str() {
                Some(variant) if e.variants.iter().any(|v| v == variant) => Ok(Value::Enum {
                    type_name: name.clone(),
                    variant: variant.to_string(),
                }),
                _ => Err(mismatch(
                    ty,
                    format!("expected one of {}", e.variants.join(", ")),
                )),
            },
            Some(TypeKind::Struct(s)) => object(json, ty, s.construction, resolver),
            None => Ok(untyped(json)),
        },
        TypeExpr::Param(_) | TypeExpr::Unknown => Ok(untyped(json)),
    }
}

/// The declared type reached by following `path` field by field from
/// `root`. Containers and options along the way are looked through, as
/// field paths do.
pub fn field_type(resolver: &TypeResolver, root: &TypeExpr, path: &[String]) -> Option<TypeExpr> {
    let mut current = root.clone();
    for segment in path {
        let owner = unwrap_containers(current);
        current = resolver
            .fields_of(&owner)
            .into_iter()
            .find(|f| &f.name == segment)?
            .ty;
    }
    Some(current)
}

fn unwrap_containers(mut ty: TypeExpr) -> TypeExpr {
    loop {
        ty = match ty {
            TypeExpr::List(inner)
            | TypeExpr::Set(inner)
            | TypeExpr::Array(inner)
            | TypeExpr::Optional(inner) => *inner,
            TypeExpr::Map(_, v) => *v,
            other => return other,
        };
    }
}

fn primitive(json: &Json, p: Primitive, ty: &TypeExpr) -> Result<Value> {
    let value = match p {
        Primitive::Bool => json.as_bool().map(Value::Bool),
        Primitive::F32 | Primitive::F64 => json.as_f64().map(Value::Float),
        Primitive::Char => json.as_str().and_then(|s| {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Value::Char(c)),
                _ => None,
            }
        }),
        Primitive::String => json.as_str().map(|s| Value::String(s.to_string())),
        Primitive::Uuid => json
            .as_str()
            .and_then(|s| uuid::Uuid::parse_str(s).ok())
            .map(Value::Uuid),
        Primitive::Date => json
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            .map(Value::Date),
        Primitive::DateTime => json
            .as_str()
            .and_then(|s| NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT).ok())
            .map(Value::DateTime),
        p if p.is_unsigned_integer() => json.as_u64().map(Value::UInt),
        _ => json.as_i64().map(Value::Int),
    };
    let value = value.ok_or_else(|| mismatch(ty, format!("cannot read {json}")))?;
    let (lo, hi) = p.integer_bounds().unwrap_or((i128::MIN, i128::MAX));
    let n = match value {
        Value::Int(i) => i as i128,
        Value::UInt(u) => u as i128,
        _ => return Ok(value),
    };
    if n < lo || n > hi {
        return Err(mismatch(ty, format!("{n} is out of range")));
    }
    Ok(value)
}

fn elements(
    json: &Json,
    inner: &TypeExpr,
    ty: &TypeExpr,
    resolver: &TypeResolver,
) -> Result<Vec<Value>> {
    let Json::Array(items) = json else {
        return Err(mismatch(ty, "expected a JSON array"));
    };
    items
        .iter()
        .map(|item| value_from_json(item, inner, resolver))
        .collect()
}

fn object(
    json: &Json,
    ty: &TypeExpr,
    construction: Construction,
    resolver: &TypeResolver,
) -> Result<Value> {
    let Json::Object(map) = json else {
        return Err(mismatch(ty, "expected a JSON object"));
    };
    let fields = resolver.fields_of(ty);
    if let Some(unknown) = map.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
        return Err(mismatch(ty, format!("unknown field '{unknown}'")));
    }
    let mut values = IndexMap::new();
    for field in &fields {
        if let Some(item) = map.get(&field.name) {
            values.insert(field.name.clone(), value_from_json(item, &field.ty, resolver)?);
        }
    }
    let instance = match construction {
        Construction::Record => Instance::record(ty.raw_name(), values),
        Construction::Mutable => values
            .into_iter()
            .fold(Instance::new(ty.raw_name()), |inst, (k, v)| inst.with(k, v)),
    };
    Ok(Value::Object(instance))
}

/// Best-effort conversion when no type information is available.
fn untyped(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_u64().map(Value::UInt))
            .unwrap_or_else(|| Value::Float(n.as_f64().unwrap_or_default())),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(untyped).collect()),
        Json::Object(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (Value::String(k.clone()), untyped(v)))
                .collect(),
        ),
    }
}
