//! TypeModel: the registry of user-defined types.
//!
//! This is the introspection layer the population engine works against:
//! it lists the members of a named type, its declared type parameters, its
//! supertype, and how instances of it are constructed.
//!
//! ## Schema format
//!
//! A model can be loaded from JSON:
//!
//! ```json
//! {
//!   "types": [
//!     { "name": "Pair", "params": ["L", "R"],
//!       "fields": [{ "name": "left", "type": "L" }, { "name": "right", "type": "R" }] },
//!     { "name": "Animal", "abstract": true, "fields": [{ "name": "name", "type": "String" }] },
//!     { "name": "Dog", "extends": "Animal", "fields": [{ "name": "good", "type": "bool" }] },
//!     { "name": "Color", "variants": ["Red", "Green", "Blue"] }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::type_expr::TypeExpr;
use crate::type_parsing::parse_type_expr_in;
use crate::{Result, TypeError};

/// A declared type parameter, optionally bounded (`T: Comparable<T>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawTypeParam")]
pub struct TypeParamDef {
    pub name: String,
    pub bound: Option<TypeExpr>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTypeParam {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        bound: Option<TypeExpr>,
    },
}

impl From<RawTypeParam> for TypeParamDef {
    fn from(raw: RawTypeParam) -> Self {
        match raw {
            RawTypeParam::Name(name) => TypeParamDef { name, bound: None },
            RawTypeParam::Full { name, bound } => TypeParamDef { name, bound },
        }
    }
}

/// A member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    /// Name of the mutator used when assigning through mutators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutator: Option<String>,
}

/// How instances of a struct come into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Construction {
    /// Instantiated empty, then assigned member by member.
    #[default]
    Mutable,
    /// Record-like: every member is passed to the constructor at once and
    /// the instance cannot be mutated afterwards.
    Record,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub fields: Vec<FieldDef>,
    pub supertype: Option<TypeExpr>,
    pub is_abstract: bool,
    pub construction: Construction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Struct(StructDef),
    Enum(EnumDef),
}

/// Definition of a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: String,
    pub params: Vec<TypeParamDef>,
    pub kind: TypeKind,
}

impl TypeDef {
    /// Start describing a struct type.
    pub fn structure(name: impl Into<String>) -> StructBuilder {
        StructBuilder {
            name: name.into(),
            params: Vec::new(),
            fields: Vec::new(),
            supertype: None,
            is_abstract: false,
            construction: Construction::Mutable,
        }
    }

    /// Describe a unit-variant enum.
    pub fn enumeration<I, S>(name: impl Into<String>, variants: I) -> TypeDef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeDef {
            name: name.into(),
            params: Vec::new(),
            kind: TypeKind::Enum(EnumDef {
                variants: variants.into_iter().map(Into::into).collect(),
            }),
        }
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn as_struct(&self) -> Option<&StructDef> {
        match &self.kind {
            TypeKind::Struct(s) => Some(s),
            TypeKind::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDef> {
        match &self.kind {
            TypeKind::Enum(e) => Some(e),
            TypeKind::Struct(_) => None,
        }
    }

    /// Rewrite bare identifiers naming a declared parameter into `Param`.
    fn normalize(mut self) -> Self {
        let params = self.param_names();
        if params.is_empty() {
            return self;
        }
        for p in &mut self.params {
            if let Some(bound) = p.bound.take() {
                p.bound = Some(bind_params(bound, &params));
            }
        }
        if let TypeKind::Struct(s) = &mut self.kind {
            for field in &mut s.fields {
                field.ty = bind_params(field.ty.clone(), &params);
            }
            if let Some(sup) = s.supertype.take() {
                s.supertype = Some(bind_params(sup, &params));
            }
        }
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: String| TypeError::InvalidDefinition {
            type_name: self.name.clone(),
            reason,
        };
        let mut seen = HashSet::new();
        for p in &self.params {
            if !seen.insert(p.name.as_str()) {
                return Err(invalid(format!("duplicate type parameter '{}'", p.name)));
            }
        }
        match &self.kind {
            TypeKind::Struct(s) => {
                let mut seen = HashSet::new();
                for f in &s.fields {
                    if !seen.insert(f.name.as_str()) {
                        return Err(invalid(format!("duplicate field '{}'", f.name)));
                    }
                }
            }
            TypeKind::Enum(e) => {
                if e.variants.is_empty() {
                    return Err(invalid("enum has no variants".to_string()));
                }
            }
        }
        Ok(())
    }
}

fn bind_params(ty: TypeExpr, params: &[String]) -> TypeExpr {
    match ty {
        TypeExpr::Named { name, args } if args.is_empty() && params.contains(&name) => {
            TypeExpr::Param(name)
        }
        TypeExpr::Named { name, args } => TypeExpr::Named {
            name,
            args: args.into_iter().map(|a| bind_params(a, params)).collect(),
        },
        TypeExpr::List(inner) => TypeExpr::list(bind_params(*inner, params)),
        TypeExpr::Set(inner) => TypeExpr::set(bind_params(*inner, params)),
        TypeExpr::Array(inner) => TypeExpr::array(bind_params(*inner, params)),
        TypeExpr::Optional(inner) => TypeExpr::optional(bind_params(*inner, params)),
        TypeExpr::Map(k, v) => TypeExpr::map(bind_params(*k, params), bind_params(*v, params)),
        other => other,
    }
}

/// Fluent description of a struct type. Type strings are parsed with the
/// declared parameters in scope; the first parse error is reported by
/// [`StructBuilder::build`].
#[derive(Debug, Clone)]
pub struct StructBuilder {
    name: String,
    params: Vec<(String, Option<String>)>,
    fields: Vec<(String, String, Option<String>)>,
    supertype: Option<String>,
    is_abstract: bool,
    construction: Construction,
}

impl StructBuilder {
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push((name.into(), None));
        self
    }

    /// Declare a parameter with a bound, which may mention the parameter itself.
    pub fn bounded_param(mut self, name: impl Into<String>, bound: &str) -> Self {
        // Parsed in build() once every parameter is known.
        self.params.push((name.into(), Some(bound.to_string())));
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: &str) -> Self {
        self.fields.push((name.into(), ty.to_string(), None));
        self
    }

    pub fn field_with_mutator(
        mut self,
        name: impl Into<String>,
        ty: &str,
        mutator: impl Into<String>,
    ) -> Self {
        self.fields
            .push((name.into(), ty.to_string(), Some(mutator.into())));
        self
    }

    pub fn extends(mut self, supertype: &str) -> Self {
        self.supertype = Some(supertype.to_string());
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn record(mut self) -> Self {
        self.construction = Construction::Record;
        self
    }

    pub fn build(self) -> Result<TypeDef> {
        let param_names: Vec<String> = self.params.iter().map(|(n, _)| n.clone()).collect();
        let params = self
            .params
            .into_iter()
            .map(|(name, bound)| {
                let bound = bound
                    .map(|b| parse_type_expr_in(&b, &param_names))
                    .transpose()?;
                Ok(TypeParamDef { name, bound })
            })
            .collect::<Result<Vec<_>>>()?;

        let fields = self
            .fields
            .into_iter()
            .map(|(name, ty, mutator)| {
                Ok(FieldDef {
                    name,
                    ty: parse_type_expr_in(&ty, &param_names)?,
                    mutator,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let supertype = self
            .supertype
            .map(|s| parse_type_expr_in(&s, &param_names))
            .transpose()?;

        let def = TypeDef {
            name: self.name,
            params,
            kind: TypeKind::Struct(StructDef {
                fields,
                supertype,
                is_abstract: self.is_abstract,
                construction: self.construction,
            }),
        };
        def.validate()?;
        Ok(def)
    }
}

/// Registry of named types.
#[derive(Debug, Clone, Default)]
pub struct TypeModel {
    types: BTreeMap<String, TypeDef>,
}

impl TypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model from its JSON schema representation.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        let mut model = TypeModel::new();
        for raw in schema.types {
            model.insert(raw.into_def()?)?;
        }
        Ok(model)
    }

    /// Register a type definition. Later definitions with the same name replace
    /// earlier ones.
    pub fn insert(&mut self, def: TypeDef) -> Result<&mut Self> {
        def.validate()?;
        let def = def.normalize();
        self.types.insert(def.name.clone(), def);
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Supertype chain of `name`, nearest first, not including `name` itself.
    /// Stops at the first repeated or undefined type.
    pub fn supertypes_of(&self, name: &str) -> Vec<&TypeDef> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.to_string());
        let mut current = self.get(name);
        while let Some(def) = current {
            let Some(sup) = def.as_struct().and_then(|s| s.supertype.as_ref()) else {
                break;
            };
            let sup_name = sup.raw_name();
            if !seen.insert(sup_name.to_string()) {
                break;
            }
            current = self.get(sup_name);
            if let Some(sup_def) = current {
                chain.push(sup_def);
            }
        }
        chain
    }

    /// Declared and inherited fields of `name`, supertype fields first. Field
    /// types are as declared by each owner; no substitution is applied.
    pub fn fields_of(&self, name: &str) -> Vec<&FieldDef> {
        let mut owners: Vec<&TypeDef> = self.supertypes_of(name);
        owners.reverse();
        owners.extend(self.get(name));
        owners
            .into_iter()
            .filter_map(TypeDef::as_struct)
            .flat_map(|s| s.fields.iter())
            .collect()
    }

    /// True if a value of type `sub` can stand where `sup` is expected.
    pub fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.supertypes_of(sub).iter().any(|d| d.name == sup)
    }

    /// Names of types referenced by fields or supertypes that have no definition.
    pub fn undefined_references(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for def in self.types.values() {
            let Some(s) = def.as_struct() else { continue };
            let mut referenced = Vec::new();
            for f in &s.fields {
                collect_named(&f.ty, &mut referenced);
            }
            if let Some(sup) = &s.supertype {
                collect_named(sup, &mut referenced);
            }
            for name in referenced {
                if !self.contains(&name) && !missing.contains(&name) {
                    missing.push(name);
                }
            }
        }
        missing
    }
}

fn collect_named(ty: &TypeExpr, out: &mut Vec<String>) {
    match ty {
        TypeExpr::Named { name, args } => {
            out.push(name.clone());
            args.iter().for_each(|a| collect_named(a, out));
        }
        TypeExpr::List(inner)
        | TypeExpr::Set(inner)
        | TypeExpr::Array(inner)
        | TypeExpr::Optional(inner) => collect_named(inner, out),
        TypeExpr::Map(k, v) => {
            collect_named(k, out);
            collect_named(v, out);
        }
        TypeExpr::Primitive(_) | TypeExpr::Param(_) | TypeExpr::Unknown => {}
    }
}

// =============================================================================
// JSON schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct Schema {
    types: Vec<RawTypeDef>,
}

#[derive(Debug, Deserialize)]
struct RawTypeDef {
    name: String,
    #[serde(default)]
    params: Vec<TypeParamDef>,
    #[serde(default)]
    fields: Vec<FieldDef>,
    #[serde(default)]
    extends: Option<TypeExpr>,
    #[serde(default, rename = "abstract")]
    is_abstract: bool,
    #[serde(default)]
    record: bool,
    #[serde(default)]
    variants: Option<Vec<String>>,
}

impl RawTypeDef {
    fn into_def(self) -> Result<TypeDef> {
        if let Some(variants) = self.variants {
            if !self.fields.is_empty() {
                return Err(TypeError::InvalidDefinition {
                    type_name: self.name,
                    reason: "a type cannot declare both fields and variants".to_string(),
                });
            }
            return Ok(TypeDef::enumeration(self.name, variants));
        }
        Ok(TypeDef {
            name: self.name,
            params: self.params,
            kind: TypeKind::Struct(StructDef {
                fields: self.fields,
                supertype: self.extends,
                is_abstract: self.is_abstract,
                construction: if self.record {
                    Construction::Record
                } else {
                    Construction::Mutable
                },
            }),
        })
    }
}
