//! NodeGraph: the bounded tree of positions to populate.
//!
//! ## Structure
//!
//! A [`Node`] is one position in the object graph: the root, a struct field,
//! the element of a list, set, or array, a map key or value, or the value of an
//! `Option`. Container elements are a single structural child; how many
//! elements are realized is decided at generation time.
//!
//! Children are expanded lazily on first access and owned by their parent.
//! Parents are weak back-references used only for paths and scope matching,
//! so a node only knows its ancestors while the root `Arc` is alive. Keep the
//! root around for as long as any node below it is in use.
//!
//! ## Bounding
//!
//! Every node at or beyond the maximum depth is terminal. Under
//! [`CyclePolicy::Truncate`] a struct node whose type already appears on its
//! ancestor path (the root included) is terminal too, so the first occurrence
//! of a recursive type is populated and the repetition is left null. A
//! container whose element is terminal stays empty.
//!
//! Expansion only depends on the request, never on random draws, so a graph
//! can be shared by concurrent builds.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use specimen_types::{Construction, Primitive, TypeExpr, TypeKind};
use tracing::debug;

use crate::resolver::{TypeBinding, TypeResolver};
use crate::selectors::Selector;
use crate::settings::CyclePolicy;

/// The position a node occupies within its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Member {
    Root,
    Field {
        name: String,
        declared_in: String,
        mutator: Option<String>,
    },
    Element,
    ArrayElement,
    MapKey,
    MapValue,
    OptionValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Primitive(Primitive),
    Enum { variants: Vec<String> },
    Struct {
        is_abstract: bool,
        construction: Construction,
    },
    List,
    Set,
    Map,
    Array,
    Optional,
    Unknown,
}

impl NodeKind {
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeKind::List | NodeKind::Set | NodeKind::Map | NodeKind::Array
        )
    }
}

/// Why a node is not expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Cycle,
    Depth,
}

/// A subtype mapping applied while nodes are created.
#[derive(Debug, Clone)]
pub struct SubtypeRule {
    pub binding: usize,
    pub selector: Selector,
    pub target: TypeExpr,
}

pub struct Node {
    binding: TypeBinding,
    declared: TypeExpr,
    member: Member,
    kind: NodeKind,
    depth: usize,
    parent: Weak<Node>,
    terminal: Option<Terminal>,
    subtype_bindings: Vec<usize>,
    subtype_violation: Option<(String, String)>,
    children: OnceLock<Vec<Arc<Node>>>,
}

impl Node {
    /// Concrete type of the node, after any subtype mapping.
    pub fn ty(&self) -> &TypeExpr {
        &self.binding.ty
    }

    pub fn binding(&self) -> &TypeBinding {
        &self.binding
    }

    /// Type as declared by the parent, before subtype mapping.
    pub fn declared_ty(&self) -> &TypeExpr {
        &self.declared
    }

    pub fn member(&self) -> &Member {
        &self.member
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn terminal(&self) -> Option<Terminal> {
        self.terminal
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Indices of every subtype binding matching this node, in registration
    /// order. The last one set the node's type.
    pub fn subtype_bindings(&self) -> &[usize] {
        &self.subtype_bindings
    }

    /// `(declared, requested)` when a matching subtype binding named a type
    /// that is not assignable to the declared one.
    pub fn subtype_violation(&self) -> Option<(&str, &str)> {
        self.subtype_violation
            .as_ref()
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }

    pub fn parent(&self) -> Option<Arc<Node>> {
        self.parent.upgrade()
    }

    /// Ancestors from the immediate parent up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Arc<Node>> {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    pub fn is_root(&self) -> bool {
        matches!(self.member, Member::Root)
    }

    pub fn field_name(&self) -> Option<&str> {
        match &self.member {
            Member::Field { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Field names from the root down to this node, skipping container
    /// positions.
    pub fn field_path(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .ancestors()
            .filter_map(|n| n.field_name().map(str::to_string))
            .collect();
        names.reverse();
        names.extend(self.field_name().map(str::to_string));
        names
    }

    /// Human-readable location such as `Order.items[].sku`.
    pub fn path(&self) -> String {
        let mut chain: Vec<Arc<Node>> = self.ancestors().collect();
        chain.reverse();
        let mut out = String::new();
        for node in &chain {
            push_segment(&mut out, node);
        }
        push_segment(&mut out, self);
        out
    }

    /// A struct node repeating the type of `ancestor`.
    fn repeats(&self, ancestor: &Node) -> bool {
        matches!(self.kind, NodeKind::Struct { .. }) && self.binding.ty == ancestor.binding.ty
    }
}

fn push_segment(out: &mut String, node: &Node) {
    match &node.member {
        Member::Root => out.push_str(&node.binding.ty.to_string()),
        Member::Field { name, .. } => {
            out.push('.');
            out.push_str(name);
        }
        Member::Element | Member::ArrayElement => out.push_str("[]"),
        Member::MapKey => out.push_str("{key}"),
        Member::MapValue => out.push_str("{value}"),
        Member::OptionValue => out.push('?'),
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path())
            .field("ty", &self.binding.ty.to_string())
            .field("depth", &self.depth)
            .field("terminal", &self.terminal)
            .finish()
    }
}

pub struct NodeGraph {
    resolver: TypeResolver,
    max_depth: usize,
    cycle_policy: CyclePolicy,
    subtypes: Vec<SubtypeRule>,
}

impl NodeGraph {
    pub fn new(resolver: TypeResolver, max_depth: usize, cycle_policy: CyclePolicy) -> Self {
        Self {
            resolver,
            max_depth,
            cycle_policy,
            subtypes: Vec::new(),
        }
    }

    /// Subtype mappings, in registration order; the last match wins.
    pub fn with_subtypes(mut self, subtypes: Vec<SubtypeRule>) -> Self {
        self.subtypes = subtypes;
        self
    }

    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn root(&self, binding: TypeBinding) -> Arc<Node> {
        Arc::new(self.create(binding.ty, Member::Root, Weak::new(), 0))
    }

    /// Children of `node`, expanded on first access.
    pub fn children<'n>(&self, node: &'n Arc<Node>) -> &'n [Arc<Node>] {
        node.children.get_or_init(|| self.expand(node))
    }

    /// Visit `node` and every node below it depth-first.
    pub fn walk(&self, node: &Arc<Node>, visit: &mut dyn FnMut(&Node)) {
        visit(node);
        for child in self.children(node) {
            self.walk(child, visit);
        }
    }

    fn expand(&self, node: &Arc<Node>) -> Vec<Arc<Node>> {
        if node.is_terminal() {
            return Vec::new();
        }
        let parent = Arc::downgrade(node);
        let depth = node.depth + 1;
        let child = |ty: &TypeExpr, member: Member| {
            Arc::new(self.create(ty.clone(), member, parent.clone(), depth))
        };

        match (&node.kind, node.ty()) {
            (NodeKind::Struct { .. }, ty) => self
                .resolver
                .fields_of(ty)
                .into_iter()
                .map(|f| {
                    child(
                        &f.ty,
                        Member::Field {
                            name: f.name,
                            declared_in: f.declared_in,
                            mutator: f.mutator,
                        },
                    )
                })
                .collect(),
            (NodeKind::List | NodeKind::Set, TypeExpr::List(inner) | TypeExpr::Set(inner)) => {
                vec![child(inner, Member::Element)]
            }
            (NodeKind::Array, TypeExpr::Array(inner)) => vec![child(inner, Member::ArrayElement)],
            (NodeKind::Map, TypeExpr::Map(k, v)) => {
                vec![child(k, Member::MapKey), child(v, Member::MapValue)]
            }
            (NodeKind::Optional, TypeExpr::Optional(inner)) => {
                vec![child(inner, Member::OptionValue)]
            }
            _ => Vec::new(),
        }
    }

    fn create(&self, ty: TypeExpr, member: Member, parent: Weak<Node>, depth: usize) -> Node {
        let mut node = self.make(ty.clone(), ty, member, parent, depth);

        let matching: Vec<&SubtypeRule> = self
            .subtypes
            .iter()
            .filter(|r| r.selector.matches(&node, self.resolver.model()))
            .collect();
        let Some(rule) = matching.last() else {
            return node;
        };
        let indices = matching.iter().map(|r| r.binding).collect();
        match self.resolver.subtype(&node.declared, &rule.target) {
            Ok(sub) => {
                let mut mapped =
                    self.make(node.declared.clone(), sub, node.member, node.parent, depth);
                mapped.subtype_bindings = indices;
                mapped
            }
            Err(_) => {
                node.subtype_bindings = indices;
                node.subtype_violation =
                    Some((node.declared.to_string(), rule.target.to_string()));
                node
            }
        }
    }

    fn make(
        &self,
        declared: TypeExpr,
        ty: TypeExpr,
        member: Member,
        parent: Weak<Node>,
        depth: usize,
    ) -> Node {
        let mut node = Node {
            kind: self.kind_of(&ty),
            binding: self.resolver.bind(&ty),
            declared,
            member,
            depth,
            parent,
            terminal: None,
            subtype_bindings: Vec::new(),
            subtype_violation: None,
            children: OnceLock::new(),
        };
        node.terminal = if depth >= self.max_depth {
            Some(Terminal::Depth)
        } else if self.cycle_policy == CyclePolicy::Truncate
            && node.ancestors().any(|a| node.repeats(&a))
        {
            Some(Terminal::Cycle)
        } else {
            None
        };
        if let Some(reason) = node.terminal {
            debug!(path = %node.path(), ?reason, "node truncated");
        }
        node
    }

    fn kind_of(&self, ty: &TypeExpr) -> NodeKind {
        match ty {
            TypeExpr::Primitive(p) => NodeKind::Primitive(*p),
            TypeExpr::List(_) => NodeKind::List,
            TypeExpr::Set(_) => NodeKind::Set,
            TypeExpr::Map(_, _) => NodeKind::Map,
            TypeExpr::Array(_) => NodeKind::Array,
            TypeExpr::Optional(_) => NodeKind::Optional,
            TypeExpr::Named { name, .. } => match self.resolver.model().get(name) {
                Some(def) => match &def.kind {
                    TypeKind::Struct(s) => NodeKind::Struct {
                        is_abstract: s.is_abstract,
                        construction: s.construction,
                    },
                    TypeKind::Enum(e) => NodeKind::Enum {
                        variants: e.variants.clone(),
                    },
                },
                None => NodeKind::Unknown,
            },
            TypeExpr::Param(_) | TypeExpr::Unknown => NodeKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::select;
    use specimen_types::{parse_type_expr, TypeDef, TypeModel};

    fn ty(s: &str) -> TypeExpr {
        parse_type_expr(s).unwrap()
    }

    fn resolver() -> TypeResolver {
        let mut m = TypeModel::new();
        m.insert(
            TypeDef::structure("Link")
                .field("value", "i32")
                .field("next", "Link")
                .build()
                .unwrap(),
        )
        .unwrap();
        m.insert(
            TypeDef::structure("Tree")
                .field("children", "List<Tree>")
                .build()
                .unwrap(),
        )
        .unwrap();
        m.insert(TypeDef::structure("Shape").abstract_type().build().unwrap())
            .unwrap();
        m.insert(
            TypeDef::structure("Circle")
                .extends("Shape")
                .field("radius", "f64")
                .build()
                .unwrap(),
        )
        .unwrap();
        m.insert(
            TypeDef::structure("Drawing")
                .field("shape", "Shape")
                .field("tags", "Map<String, [u8]>")
                .build()
                .unwrap(),
        )
        .unwrap();
        TypeResolver::new(Arc::new(m))
    }

    fn root(graph: &NodeGraph, s: &str) -> Arc<Node> {
        let binding = graph.resolver().resolve_root(&ty(s), &[]).unwrap();
        graph.root(binding)
    }

    #[test]
    fn test_truncate_cuts_field_repeating_root_type() {
        let graph = NodeGraph::new(resolver(), 8, CyclePolicy::Truncate);
        let root = root(&graph, "Link");
        let value = graph.children(&root)[0].clone();
        assert!(!value.is_terminal());

        let next = graph.children(&root)[1].clone();
        assert_eq!(next.path(), "Link.next");
        assert_eq!(next.terminal(), Some(Terminal::Cycle));
        assert!(graph.children(&next).is_empty());
    }

    #[test]
    fn test_depth_bounded_follows_cycles_to_max_depth() {
        let graph = NodeGraph::new(resolver(), 3, CyclePolicy::DepthBounded);
        let root = root(&graph, "Link");
        let mut node = root.clone();
        for depth in 1..=3 {
            node = graph.children(&node)[1].clone();
            assert_eq!(node.depth(), depth);
        }
        assert_eq!(node.terminal(), Some(Terminal::Depth));
        assert_eq!(node.path(), "Link.next.next.next");
    }

    #[test]
    fn test_collection_of_self_is_truncated() {
        let graph = NodeGraph::new(resolver(), 8, CyclePolicy::Truncate);
        let root = root(&graph, "Tree");
        let children = graph.children(&root)[0].clone();
        assert!(!children.is_terminal());
        let element = graph.children(&children)[0].clone();
        assert_eq!(element.path(), "Tree.children[]");
        assert_eq!(element.terminal(), Some(Terminal::Cycle));
    }

    #[test]
    fn test_detached_node_loses_ancestors() {
        let graph = NodeGraph::new(resolver(), 8, CyclePolicy::Truncate);
        let root = root(&graph, "Drawing");
        let shape = graph.children(&root)[0].clone();
        assert_eq!(shape.path(), "Drawing.shape");
        drop(root);
        assert!(shape.parent().is_none());
        assert_eq!(shape.path(), ".shape");
    }

    #[test]
    fn test_map_and_array_children() {
        let graph = NodeGraph::new(resolver(), 8, CyclePolicy::Truncate);
        let root = root(&graph, "Drawing");
        let tags = graph.children(&root)[1].clone();
        let kids = graph.children(&tags);
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[0].path(), "Drawing.tags{key}");
        assert_eq!(kids[1].kind(), &NodeKind::Array);
        let byte = graph.children(&kids[1])[0].clone();
        assert_eq!(byte.path(), "Drawing.tags{value}[]");
        assert_eq!(byte.field_path(), vec!["tags".to_string()]);
    }

    #[test]
    fn test_subtype_rule_replaces_type() {
        let graph = NodeGraph::new(resolver(), 8, CyclePolicy::Truncate).with_subtypes(vec![
            SubtypeRule {
                binding: 0,
                selector: select::field("shape"),
                target: ty("Circle"),
            },
        ]);
        let root = root(&graph, "Drawing");
        let shape = graph.children(&root)[0].clone();
        assert_eq!(shape.ty(), &ty("Circle"));
        assert_eq!(shape.declared_ty(), &ty("Shape"));
        assert_eq!(shape.subtype_bindings(), &[0]);
        assert_eq!(graph.children(&shape)[0].path(), "Drawing.shape.radius");
    }

    #[test]
    fn test_invalid_subtype_is_recorded() {
        let graph = NodeGraph::new(resolver(), 8, CyclePolicy::Truncate).with_subtypes(vec![
            SubtypeRule {
                binding: 4,
                selector: select::field("shape"),
                target: ty("Tree"),
            },
        ]);
        let root = root(&graph, "Drawing");
        let shape = graph.children(&root)[0].clone();
        assert_eq!(shape.subtype_violation(), Some(("Shape", "Tree")));
        assert_eq!(shape.ty(), &ty("Shape"));
    }
}
