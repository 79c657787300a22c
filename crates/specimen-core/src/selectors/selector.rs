//! Selector expressions and their matching rules.

use std::fmt;

use specimen_types::{parse_type_expr, TypeExpr, TypeModel};

use crate::node::{Member, Node};
use crate::{Error, Result};

/// Restriction on the depth of a matched node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthBound {
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
}

impl DepthBound {
    pub fn accepts(&self, depth: usize) -> bool {
        match *self {
            DepthBound::Exactly(d) => depth == d,
            DepthBound::AtLeast(d) => depth >= d,
            DepthBound::AtMost(d) => depth <= d,
        }
    }
}

/// A predicate over nodes. Selectors are plain values compared structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// The root node.
    Root,
    /// A struct field by name, optionally qualified by the type that owns it.
    Field { name: String, owner: Option<String> },
    /// The field reached by following these field names from the root.
    Path(Vec<String>),
    /// Nodes of a type. Bare names match assignable types unless `exact`;
    /// parameterized types must match exactly.
    Type { ty: TypeExpr, exact: bool },
    /// Any of the members.
    Group(Vec<Selector>),
    /// `target`, when some ancestor matches `scope`.
    Scoped {
        target: Box<Selector>,
        scope: Box<Selector>,
    },
    /// `target`, when the node depth satisfies `bound`.
    Depth {
        target: Box<Selector>,
        bound: DepthBound,
    },
}

impl Selector {
    /// Restrict matches to nodes below a node matching `scope`. Scopes nest.
    pub fn within(self, scope: Selector) -> Selector {
        Selector::Scoped {
            target: Box::new(self),
            scope: Box::new(scope),
        }
    }

    pub fn at_depth(self, depth: usize) -> Selector {
        self.with_depth(DepthBound::Exactly(depth))
    }

    pub fn at_least_depth(self, depth: usize) -> Selector {
        self.with_depth(DepthBound::AtLeast(depth))
    }

    pub fn at_most_depth(self, depth: usize) -> Selector {
        self.with_depth(DepthBound::AtMost(depth))
    }

    fn with_depth(self, bound: DepthBound) -> Selector {
        Selector::Depth {
            target: Box::new(self),
            bound,
        }
    }

    pub fn matches(&self, node: &Node, model: &TypeModel) -> bool {
        match self {
            Selector::Root => node.is_root(),
            Selector::Field { name, owner } => match node.member() {
                Member::Field {
                    name: field,
                    declared_in,
                    ..
                } => {
                    field == name
                        && owner.as_ref().map_or(true, |o| {
                            o == declared_in
                                || node.parent().is_some_and(|p| p.ty().raw_name() == o)
                        })
                }
                _ => false,
            },
            Selector::Path(segments) => {
                node.field_name().is_some() && node.field_path() == *segments
            }
            Selector::Type { ty, exact } => type_matches(ty, *exact, node.ty(), model),
            Selector::Group(items) => items.iter().any(|s| s.matches(node, model)),
            Selector::Scoped { target, scope } => {
                target.matches(node, model) && node.ancestors().any(|a| scope.matches(&a, model))
            }
            Selector::Depth { target, bound } => {
                bound.accepts(node.depth()) && target.matches(node, model)
            }
        }
    }

    /// Reject selectors that can never be meaningful.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidSelector(msg));
        match self {
            Selector::Root => Ok(()),
            Selector::Field { name, owner } => {
                if !is_member_name(name) {
                    return invalid(format!("'{name}' is not a valid field name"));
                }
                match owner {
                    Some(o) if parse_type_expr(o).is_err() => {
                        invalid(format!("'{o}' is not a valid type name"))
                    }
                    _ => Ok(()),
                }
            }
            Selector::Path(segments) => {
                if segments.is_empty() || !segments.iter().all(|s| is_member_name(s)) {
                    return invalid(format!("'{}' is not a valid field path", segments.join(".")));
                }
                Ok(())
            }
            Selector::Type { ty, .. } => match parse_type_expr(&ty.to_string()) {
                Ok(_) => Ok(()),
                Err(e) => invalid(e.to_string()),
            },
            Selector::Group(items) => {
                if items.is_empty() {
                    return invalid("empty selector group".to_string());
                }
                items.iter().try_for_each(Selector::validate)
            }
            Selector::Scoped { target, scope } => {
                target.validate()?;
                scope.validate()
            }
            Selector::Depth { target, .. } => target.validate(),
        }
    }
}

fn is_member_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

fn type_matches(selector: &TypeExpr, exact: bool, actual: &TypeExpr, model: &TypeModel) -> bool {
    let bare = match selector {
        TypeExpr::Named { args, .. } => args.is_empty(),
        TypeExpr::Primitive(_) => true,
        _ => false,
    };
    if !bare {
        return selector == actual;
    }
    let (wanted, have) = (selector.raw_name(), actual.raw_name());
    if wanted == have && !matches!(actual, TypeExpr::Param(_) | TypeExpr::Unknown) {
        return true;
    }
    !exact && model.is_assignable(have, wanted)
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Root => write!(f, "root()"),
            Selector::Field { name, owner: None } => write!(f, "field(\"{name}\")"),
            Selector::Field {
                name,
                owner: Some(owner),
            } => write!(f, "field_of(\"{owner}\", \"{name}\")"),
            Selector::Path(segments) => write!(f, "path(\"{}\")", segments.join(".")),
            Selector::Type { ty, exact: false } => write!(f, "types(\"{ty}\")"),
            Selector::Type { ty, exact: true } => write!(f, "exact_type(\"{ty}\")"),
            Selector::Group(items) => {
                write!(f, "any([")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "])")
            }
            Selector::Scoped { target, scope } => write!(f, "{target}.within({scope})"),
            Selector::Depth { target, bound } => match bound {
                DepthBound::Exactly(d) => write!(f, "{target}.at_depth({d})"),
                DepthBound::AtLeast(d) => write!(f, "{target}.at_least_depth({d})"),
                DepthBound::AtMost(d) => write!(f, "{target}.at_most_depth({d})"),
            },
        }
    }
}

/// Selector constructors.
pub mod select {
    use super::Selector;
    use specimen_types::{parse_type_expr, TypeExpr};

    pub fn root() -> Selector {
        Selector::Root
    }

    pub fn field(name: impl Into<String>) -> Selector {
        Selector::Field {
            name: name.into(),
            owner: None,
        }
    }

    /// A field of a specific type; matches the declaring type or the type of
    /// the owning node.
    pub fn field_of(owner: impl Into<String>, name: impl Into<String>) -> Selector {
        Selector::Field {
            name: name.into(),
            owner: Some(owner.into()),
        }
    }

    /// A dotted field path from the root, such as `"customer.address.city"`.
    pub fn path(path: &str) -> Selector {
        Selector::Path(path.split('.').map(|s| s.trim().to_string()).collect())
    }

    /// Nodes whose type is, or is assignable to, `ty`.
    pub fn types(ty: &str) -> Selector {
        Selector::Type {
            ty: type_or_raw(ty),
            exact: false,
        }
    }

    pub fn exact_type(ty: &str) -> Selector {
        Selector::Type {
            ty: type_or_raw(ty),
            exact: true,
        }
    }

    pub fn any(selectors: impl IntoIterator<Item = Selector>) -> Selector {
        Selector::Group(selectors.into_iter().collect())
    }

    // Unparseable names are kept verbatim so `validate` can report them.
    fn type_or_raw(ty: &str) -> TypeExpr {
        parse_type_expr(ty).unwrap_or_else(|_| TypeExpr::named(ty))
    }
}
