//! TypeResolver: generic parameter resolution across composition and
//! inheritance.
//!
//! ## Substitution
//!
//! A named type instantiated with arguments (`Pair<String, i32>`) binds its
//! declared parameters positionally. Inherited fields are resolved by carrying
//! the substitution map up the supertype chain: if `IntBox extends Box<i32>`,
//! the `Box` level sees `T = i32`.
//!
//! ## Unbound parameters
//!
//! At the root an unbound parameter is a configuration error. Deeper in the
//! graph a parameter that nothing fixes falls back to its bound when the bound
//! is concrete, and to [`TypeExpr::Unknown`] otherwise; unknown nodes are left
//! null.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use specimen_types::{TypeDef, TypeExpr, TypeModel};
use tracing::warn;

use crate::{Error, Result};

/// A type together with the substitutions that made it concrete.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeBinding {
    pub ty: TypeExpr,
    pub substitutions: BTreeMap<String, TypeExpr>,
}

impl TypeBinding {
    pub fn unbound(ty: TypeExpr) -> Self {
        Self {
            ty,
            substitutions: BTreeMap::new(),
        }
    }
}

/// A struct member with its type resolved in the context of a concrete owner.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name: String,
    pub ty: TypeExpr,
    /// Type that declares the field, which may be a supertype of the owner.
    pub declared_in: String,
    pub mutator: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TypeResolver {
    model: Arc<TypeModel>,
}

impl TypeResolver {
    pub fn new(model: Arc<TypeModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    pub fn model_arc(&self) -> &Arc<TypeModel> {
        &self.model
    }

    /// Resolve the type requested by a caller.
    ///
    /// `type_args` supplies the parameters of a generic root written without
    /// arguments. Every named type mentioned must exist.
    pub fn resolve_root(&self, root: &TypeExpr, type_args: &[TypeExpr]) -> Result<TypeBinding> {
        let root = match root {
            TypeExpr::Named { name, args } => {
                let def = self
                    .model
                    .get(name)
                    .ok_or_else(|| Error::UnknownType(name.clone()))?;
                let args = if args.is_empty() {
                    type_args.to_vec()
                } else {
                    args.clone()
                };
                if args.len() != def.params.len() {
                    return Err(Error::UnresolvedTypeParameters {
                        type_name: name.clone(),
                        params: def.param_names(),
                        expected: def.params.len(),
                        provided: args.len(),
                    });
                }
                TypeExpr::generic(name.clone(), args)
            }
            other => other.clone(),
        };
        self.check_root_concrete(&root, &root)?;
        Ok(self.bind(&root))
    }

    fn check_root_concrete(&self, root: &TypeExpr, ty: &TypeExpr) -> Result<()> {
        match ty {
            TypeExpr::Primitive(_) => Ok(()),
            TypeExpr::Param(p) => Err(Error::UnresolvedTypeParameters {
                type_name: root.to_string(),
                params: vec![p.clone()],
                expected: 1,
                provided: 0,
            }),
            TypeExpr::Unknown => Err(Error::UnknownType(root.to_string())),
            TypeExpr::Named { name, args } => {
                let def = self
                    .model
                    .get(name)
                    .ok_or_else(|| Error::UnknownType(name.clone()))?;
                if !args.is_empty() && args.len() != def.params.len() {
                    return Err(Error::UnresolvedTypeParameters {
                        type_name: name.clone(),
                        params: def.param_names(),
                        expected: def.params.len(),
                        provided: args.len(),
                    });
                }
                args.iter().try_for_each(|a| self.check_root_concrete(root, a))
            }
            TypeExpr::List(inner)
            | TypeExpr::Set(inner)
            | TypeExpr::Array(inner)
            | TypeExpr::Optional(inner) => self.check_root_concrete(root, inner),
            TypeExpr::Map(k, v) => {
                self.check_root_concrete(root, k)?;
                self.check_root_concrete(root, v)
            }
        }
    }

    /// Binding of a concrete type: its declared parameters mapped to arguments.
    pub fn bind(&self, ty: &TypeExpr) -> TypeBinding {
        let substitutions = match ty {
            TypeExpr::Named { name, args } => self
                .model
                .get(name)
                .map(|def| substitutions(def, args))
                .unwrap_or_default(),
            _ => BTreeMap::new(),
        };
        TypeBinding {
            ty: ty.clone(),
            substitutions,
        }
    }

    /// Declared and inherited fields of a concrete struct type, supertype
    /// fields first. A field redeclared by a subtype replaces the inherited
    /// one in place.
    pub fn fields_of(&self, ty: &TypeExpr) -> Vec<ResolvedField> {
        let TypeExpr::Named { name, args } = ty else {
            return Vec::new();
        };

        let mut levels: Vec<Vec<ResolvedField>> = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some((name.clone(), args.clone()));

        while let Some((name, args)) = current.take() {
            if !seen.insert(name.clone()) {
                break;
            }
            let Some(def) = self.model.get(&name) else {
                break;
            };
            let Some(s) = def.as_struct() else {
                break;
            };
            let subst = substitutions(def, &args);
            levels.push(
                s.fields
                    .iter()
                    .map(|f| ResolvedField {
                        name: f.name.clone(),
                        ty: self.close(&f.ty.substitute(&subst), def),
                        declared_in: def.name.clone(),
                        mutator: f.mutator.clone(),
                    })
                    .collect(),
            );
            current = match s.supertype.as_ref().map(|sup| sup.substitute(&subst)) {
                Some(TypeExpr::Named { name, args }) => Some((name, args)),
                _ => None,
            };
        }

        let mut fields: Vec<ResolvedField> = Vec::new();
        for field in levels.into_iter().rev().flatten() {
            match fields.iter().position(|f| f.name == field.name) {
                Some(pos) => fields[pos] = field,
                None => fields.push(field),
            }
        }
        fields
    }

    /// Replace what is still unresolved after substitution: leftover
    /// parameters fall back to a concrete bound or `Unknown`, and references to
    /// undefined types become `Unknown`.
    fn close(&self, ty: &TypeExpr, owner: &TypeDef) -> TypeExpr {
        match ty {
            TypeExpr::Param(p) => {
                let bound = owner
                    .params
                    .iter()
                    .find(|d| &d.name == p)
                    .and_then(|d| d.bound.clone())
                    .filter(|b| b.is_concrete() && self.all_defined(b));
                match bound {
                    Some(b) => b,
                    None => {
                        warn!(
                            type_name = %owner.name,
                            param = %p,
                            "type parameter left unresolved, member will be null"
                        );
                        TypeExpr::Unknown
                    }
                }
            }
            TypeExpr::Named { name, args } => {
                if !self.model.contains(name) {
                    warn!(type_name = %name, "reference to undefined type, member will be null");
                    return TypeExpr::Unknown;
                }
                TypeExpr::generic(
                    name.clone(),
                    args.iter().map(|a| self.close(a, owner)).collect(),
                )
            }
            TypeExpr::List(inner) => TypeExpr::list(self.close(inner, owner)),
            TypeExpr::Set(inner) => TypeExpr::set(self.close(inner, owner)),
            TypeExpr::Array(inner) => TypeExpr::array(self.close(inner, owner)),
            TypeExpr::Optional(inner) => TypeExpr::optional(self.close(inner, owner)),
            TypeExpr::Map(k, v) => TypeExpr::map(self.close(k, owner), self.close(v, owner)),
            TypeExpr::Primitive(_) | TypeExpr::Unknown => ty.clone(),
        }
    }

    fn all_defined(&self, ty: &TypeExpr) -> bool {
        match ty {
            TypeExpr::Named { name, args } => {
                self.model.contains(name) && args.iter().all(|a| self.all_defined(a))
            }
            TypeExpr::List(inner)
            | TypeExpr::Set(inner)
            | TypeExpr::Array(inner)
            | TypeExpr::Optional(inner) => self.all_defined(inner),
            TypeExpr::Map(k, v) => self.all_defined(k) && self.all_defined(v),
            _ => true,
        }
    }

    /// Concrete type for `subtype` standing in for `declared`.
    ///
    /// A generic subtype written without arguments has them inferred from the
    /// declared type through its supertype chain; parameters that cannot be
    /// inferred become `Unknown`.
    pub fn subtype(&self, declared: &TypeExpr, subtype: &TypeExpr) -> Result<TypeExpr> {
        let invalid = || Error::InvalidSubtype {
            from: declared.to_string(),
            to: subtype.to_string(),
        };
        let TypeExpr::Named {
            name: sub_name,
            args: sub_args,
        } = subtype
        else {
            return if subtype == declared {
                Ok(subtype.clone())
            } else {
                Err(invalid())
            };
        };
        let sub_def = self
            .model
            .get(sub_name)
            .ok_or_else(|| Error::UnknownType(sub_name.clone()))?;

        let declared_name = match declared {
            TypeExpr::Unknown => None,
            TypeExpr::Named { name, .. } => Some(name),
            _ => return Err(invalid()),
        };
        if let Some(declared_name) = declared_name {
            if !self.model.is_assignable(sub_name, declared_name) {
                return Err(invalid());
            }
        }
        if !sub_args.is_empty() || sub_def.params.is_empty() {
            return Ok(subtype.clone());
        }

        let params = sub_def.param_names();
        let mut inferred = BTreeMap::new();
        if let Some(declared_name) = declared_name {
            let mut expr = TypeExpr::generic(
                sub_name.clone(),
                params.iter().cloned().map(TypeExpr::Param).collect(),
            );
            let mut seen = HashSet::new();
            loop {
                if expr.raw_name() == declared_name {
                    unify(&expr, declared, &mut inferred);
                    break;
                }
                if !seen.insert(expr.raw_name().to_string()) {
                    break;
                }
                let TypeExpr::Named { name, args } = &expr else {
                    break;
                };
                let Some(def) = self.model.get(name) else {
                    break;
                };
                let Some(sup) = def.as_struct().and_then(|s| s.supertype.as_ref()) else {
                    break;
                };
                expr = sup.substitute(&substitutions(def, args));
            }
        }

        Ok(TypeExpr::generic(
            sub_name.clone(),
            params
                .iter()
                .map(|p| inferred.get(p).cloned().unwrap_or(TypeExpr::Unknown))
                .collect(),
        ))
    }
}

fn substitutions(def: &TypeDef, args: &[TypeExpr]) -> BTreeMap<String, TypeExpr> {
    def.params
        .iter()
        .zip(args)
        .map(|(p, a)| (p.name.clone(), a.clone()))
        .collect()
}

/// Bind parameters in `pattern` to the matching parts of `concrete`.
fn unify(pattern: &TypeExpr, concrete: &TypeExpr, out: &mut BTreeMap<String, TypeExpr>) {
    match (pattern, concrete) {
        (TypeExpr::Param(p), c) => {
            out.entry(p.clone()).or_insert_with(|| c.clone());
        }
        (TypeExpr::Named { name: a, args: xs }, TypeExpr::Named { name: b, args: ys }) if a == b => {
            xs.iter().zip(ys).for_each(|(x, y)| unify(x, y, out));
        }
        (TypeExpr::List(x), TypeExpr::List(y))
        | (TypeExpr::Set(x), TypeExpr::Set(y))
        | (TypeExpr::Array(x), TypeExpr::Array(y))
        | (TypeExpr::Optional(x), TypeExpr::Optional(y)) => unify(x, y, out),
        (TypeExpr::Map(xk, xv), TypeExpr::Map(yk, yv)) => {
            unify(xk, yk, out);
            unify(xv, yv, out);
        }
        _ => {}
    }
}
