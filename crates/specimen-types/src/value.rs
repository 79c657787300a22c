//! Dynamic value tree produced by population.
//!
//! A [`Value`] mirrors the [`TypeExpr`] it was generated for. Struct values are
//! [`Instance`]s: a type name plus an ordered field map. Values convert to JSON
//! with [`Value::to_json`] and into concrete Rust types with
//! [`Value::deserialize_into`].

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::model::TypeModel;
use crate::type_expr::{Primitive, TypeExpr};
use crate::{Result, TypeError};

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    String(String),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Enum { type_name: String, variant: String },
    List(Vec<Value>),
    Set(Vec<Value>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Object(Instance),
}

/// A populated struct value.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_name: String,
    fields: IndexMap<String, Value>,
    frozen: bool,
}

impl Instance {
    /// An empty, mutable instance.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            frozen: false,
        }
    }

    /// A record-like instance built from all of its fields at once. It cannot
    /// be modified afterwards.
    pub fn record(type_name: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
            frozen: true,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Mutable access to a field. Frozen instances expose none.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        if self.frozen {
            return None;
        }
        self.fields.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Write a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Result<Option<Value>> {
        if self.frozen {
            return Err(TypeError::Frozen(self.type_name.clone()));
        }
        Ok(self.fields.insert(name.into(), value))
    }

    /// Builder-style [`Instance::set`] for mutable instances; ignored when frozen.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.frozen {
            self.fields.insert(name.into(), value.into());
        }
        self
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Enum { variant, .. } => Some(variant),
            _ => None,
        }
    }

    /// Elements of a list, set, or array.
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) | Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_entries(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Field of an object value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_object().and_then(|o| o.get(field))
    }

    /// Follow a dotted field path such as `"owner.address.city"`.
    pub fn at(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .try_fold(self, |value, field| value.get(field))
    }

    /// Short description of the value's runtime type, used in error messages.
    pub fn kind_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "integer".to_string(),
            Value::UInt(_) => "unsigned integer".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Char(_) => "char".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Uuid(_) => "Uuid".to_string(),
            Value::Date(_) => "Date".to_string(),
            Value::DateTime(_) => "DateTime".to_string(),
            Value::Enum { type_name, .. } => type_name.clone(),
            Value::List(_) => "List".to_string(),
            Value::Set(_) => "Set".to_string(),
            Value::Array(_) => "Array".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::Object(instance) => instance.type_name.clone(),
        }
    }

    /// True if this value may be stored where `ty` is expected.
    ///
    /// Null fits everywhere. Named types are checked for assignability through
    /// `model`; names the model does not know accept any value.
    pub fn conforms_to(&self, ty: &TypeExpr, model: &TypeModel) -> bool {
        if self.is_null() {
            return true;
        }
        match ty {
            TypeExpr::Param(_) | TypeExpr::Unknown => true,
            TypeExpr::Optional(inner) => self.conforms_to(inner, model),
            TypeExpr::Primitive(p) => self.conforms_to_primitive(*p),
            TypeExpr::Named { name, .. } => match self {
                Value::Object(instance) => model.is_assignable(&instance.type_name, name),
                Value::Enum { type_name, .. } => type_name == name,
                _ => !model.contains(name),
            },
            TypeExpr::List(inner) => matches!(self, Value::List(items)
                if items.iter().all(|v| v.conforms_to(inner, model))),
            TypeExpr::Set(inner) => matches!(self, Value::Set(items)
                if items.iter().all(|v| v.conforms_to(inner, model))),
            TypeExpr::Array(inner) => matches!(self, Value::Array(items)
                if items.iter().all(|v| v.conforms_to(inner, model))),
            TypeExpr::Map(k, v) => matches!(self, Value::Map(entries)
                if entries.iter().all(|(key, val)| key.conforms_to(k, model) && val.conforms_to(v, model))),
        }
    }

    fn conforms_to_primitive(&self, p: Primitive) -> bool {
        if let Some((min, max)) = p.integer_bounds() {
            let n = match self {
                Value::Int(i) => *i as i128,
                Value::UInt(u) => *u as i128,
                _ => return false,
            };
            return (min..=max).contains(&n);
        }
        matches!(
            (p, self),
            (Primitive::Bool, Value::Bool(_))
                | (Primitive::F32 | Primitive::F64, Value::Float(_) | Value::Int(_) | Value::UInt(_))
                | (Primitive::Char, Value::Char(_))
                | (Primitive::String, Value::String(_))
                | (Primitive::Uuid, Value::Uuid(_))
                | (Primitive::Date, Value::Date(_))
                | (Primitive::DateTime, Value::DateTime(_))
        )
    }

    /// Convert to JSON. Uuids and dates become strings, enums their variant
    /// name, and map keys are stringified.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Char(c) => Json::String(c.to_string()),
            Value::String(s) => Json::String(s.clone()),
            Value::Uuid(u) => Json::String(u.to_string()),
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => Json::String(dt.format(DATE_TIME_FORMAT).to_string()),
            Value::Enum { variant, .. } => Json::String(variant.clone()),
            Value::List(items) | Value::Set(items) | Value::Array(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (json_key(k), v.to_json()))
                    .collect(),
            ),
            Value::Object(instance) => Json::Object(
                instance
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Deserialize into a concrete Rust type through its JSON form.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

fn json_key(key: &Value) -> String {
    match key.to_json() {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::UInt(v as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Instance> for Value {
    fn from(v: Instance) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDef;
    use crate::parse_type_expr;
    use serde::Deserialize;

    fn ty(s: &str) -> TypeExpr {
        parse_type_expr(s).unwrap()
    }

    #[test]
    fn test_frozen_instance_rejects_writes() {
        let mut fields = IndexMap::new();
        fields.insert("x".to_string(), Value::Float(1.0));
        let mut point = Instance::record("Point", fields);
        assert!(point.is_frozen());
        assert!(matches!(
            point.set("x", Value::Float(2.0)),
            Err(TypeError::Frozen(name)) if name == "Point"
        ));
        assert_eq!(point.get("x"), Some(&Value::Float(1.0)));
    }

    #[test]
    fn test_integer_conformance_respects_bounds() {
        let model = TypeModel::new();
        assert!(Value::Int(200).conforms_to(&ty("u8"), &model));
        assert!(!Value::Int(300).conforms_to(&ty("u8"), &model));
        assert!(!Value::Int(-1).conforms_to(&ty("u64"), &model));
        assert!(!Value::String("7".into()).conforms_to(&ty("i32"), &model));
        assert!(Value::Null.conforms_to(&ty("i32"), &model));
    }

    #[test]
    fn test_named_conformance_uses_assignability() {
        let mut model = TypeModel::new();
        model
            .insert(TypeDef::structure("Animal").abstract_type().build().unwrap())
            .unwrap();
        model
            .insert(TypeDef::structure("Cat").extends("Animal").build().unwrap())
            .unwrap();
        let cat = Value::Object(Instance::new("Cat"));
        assert!(cat.conforms_to(&ty("Animal"), &model));
        assert!(!cat.conforms_to(&ty("List<Animal>"), &model));
        assert!(Value::List(vec![cat.clone()]).conforms_to(&ty("List<Animal>"), &model));
        assert!(!Value::Object(Instance::new("Animal")).conforms_to(&ty("Cat"), &model));
    }

    #[test]
    fn test_to_json_shapes() {
        let value = Value::Object(
            Instance::new("Order")
                .with("id", 7)
                .with("tags", vec!["a", "b"])
                .with(
                    "date",
                    NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                )
                .with(
                    "counts",
                    Value::Map(vec![(Value::Int(1), Value::UInt(2))]),
                ),
        );
        assert_eq!(
            value.to_json(),
            serde_json::json!({
                "id": 7,
                "tags": ["a", "b"],
                "date": "2024-02-29",
                "counts": { "1": 2 }
            })
        );
    }

    #[test]
    fn test_deserialize_into_rust_type() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Order {
            id: i32,
            tags: Option<Vec<String>>,
            when: NaiveDateTime,
        }

        let when = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let value = Value::Object(
            Instance::new("Order")
                .with("id", 7)
                .with("tags", Value::Null)
                .with("when", when),
        );
        let order: Order = value.deserialize_into().unwrap();
        assert_eq!(
            order,
            Order {
                id: 7,
                tags: None,
                when
            }
        );
    }

    #[test]
    fn test_path_navigation() {
        let value = Value::Object(
            Instance::new("A").with("b", Instance::new("B").with("c", "deep")),
        );
        assert_eq!(value.at("b.c").and_then(Value::as_str), Some("deep"));
        assert!(value.at("b.missing").is_none());
    }
}
