//! Entry points: [`Specimen`] and the reusable [`PopulationModel`].
//!
//! A `PopulationModel` holds everything derived from one request: merged
//! settings, the resolved root, the node graph, and the bindings. It is
//! read-only after construction and can be shared across threads; every
//! build gets its own random stream and usage bookkeeping.
//!
//! A binding counts as used when its selector matches a node reachable in the
//! graph (outside ignored subtrees and terminal nodes), so strict mode does
//! not depend on random draws such as a nullable parent rolling null.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use specimen_types::env_utils::seed_from_env;
use specimen_types::{Describe, TypeModel, Value};
use tracing::{debug, warn};

use crate::assignment::{DefaultInstantiator, Instantiator};
use crate::engine::{PopulationEngine, Traversal};
use crate::generators::{Generator, GeneratorRegistry};
use crate::node::{Node, NodeGraph};
use crate::random::{random_seed, RandomSource};
use crate::request::Request;
use crate::resolver::TypeResolver;
use crate::selectors::{SelectorEngine, UnusedSelectorReport, Usage};
use crate::settings::{CyclePolicy, Keys, Mode, Settings};
use crate::{Error, Result};

/// One populated root value with its reproduction data.
#[derive(Debug, Clone, Serialize)]
pub struct Population {
    pub value: Value,
    /// Seed that reproduces this value with the same request.
    pub seed: u64,
    /// Bindings that never matched. Always empty in strict mode, which fails
    /// instead.
    pub unused: UnusedSelectorReport,
}

pub struct PopulationModel {
    graph: NodeGraph,
    root: Arc<Node>,
    selectors: SelectorEngine,
    settings: Settings,
    registry: Arc<GeneratorRegistry>,
    instantiator: Arc<dyn Instantiator>,
    seed: Option<u64>,
    /// Bindings matching some reachable node.
    reachable: Usage,
}

impl PopulationModel {
    pub fn new(
        model: Arc<TypeModel>,
        request: &Request,
        registry: Arc<GeneratorRegistry>,
        instantiator: Arc<dyn Instantiator>,
    ) -> Result<Self> {
        let mut settings = Settings::defaults().merge(request.settings());
        if let Some(depth) = request.max_depth() {
            settings = settings
                .with(&Keys::MAX_DEPTH, depth)
                .with(&Keys::CYCLE_POLICY, CyclePolicy::DepthBounded);
        }
        let settings = settings.lock();
        let resolver = TypeResolver::new(model);
        let binding = resolver.resolve_root(request.root(), request.type_args())?;
        let selectors = SelectorEngine::new(request.bindings().to_vec());
        let graph = NodeGraph::new(
            resolver,
            settings.get(&Keys::MAX_DEPTH),
            settings.get(&Keys::CYCLE_POLICY),
        )
        .with_subtypes(selectors.subtype_rules());
        let root = graph.root(binding);
        let reachable = reachable_usage(&graph, &selectors, &root);

        Ok(Self {
            graph,
            root,
            selectors,
            settings,
            registry,
            instantiator,
            seed: request.seed().or_else(seed_from_env),
            reachable,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    /// Fixed seed of the model, if the request or `SPECIMEN_SEED` set one.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn create(&self) -> Result<Value> {
        Ok(self.populate()?.value)
    }

    pub fn populate(&self) -> Result<Population> {
        let seed = self.seed.unwrap_or_else(random_seed);
        let mut cx = Traversal::new(RandomSource::new(seed));
        let value = self.build_one(&mut cx)?;
        let unused = self.check_usage(&cx.usage)?;
        Ok(Population {
            value,
            seed,
            unused,
        })
    }

    /// `count` values drawn from one random stream, so the batch is
    /// reproducible as a whole. A binding counts as used if it matched in
    /// any of them.
    pub fn create_many(&self, count: usize) -> Result<Vec<Value>> {
        let seed = self.seed.unwrap_or_else(random_seed);
        let mut cx = Traversal::new(RandomSource::new(seed));
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            cx.reset_origins();
            values.push(self.build_one(&mut cx)?);
        }
        if count > 0 {
            self.check_usage(&cx.usage)?;
        }
        Ok(values)
    }

    fn build_one(&self, cx: &mut Traversal) -> Result<Value> {
        debug!(
            root = %self.root.ty(),
            seed = cx.random.seed(),
            max_depth = self.graph.max_depth(),
            "populating"
        );
        let engine = PopulationEngine::new(
            &self.graph,
            &self.selectors,
            &self.settings,
            &self.registry,
            self.instantiator.as_ref(),
        );
        Ok(engine.populate(&self.root, cx)?.into_value())
    }

    fn check_usage(&self, traversal: &Usage) -> Result<UnusedSelectorReport> {
        let mut usage = self.reachable.clone();
        usage.merge(traversal);
        let report = self.selectors.unused(&usage);
        if report.is_empty() {
            return Ok(report);
        }
        match self.settings.get(&Keys::MODE) {
            Mode::Strict => Err(Error::UnusedSelectors(report)),
            Mode::Lenient => {
                warn!(unused = report.len(), "ignoring unused selectors\n{report}");
                Ok(report)
            }
        }
    }
}

fn reachable_usage(graph: &NodeGraph, selectors: &SelectorEngine, root: &Arc<Node>) -> Usage {
    let model = graph.resolver().model();
    let mut usage = Usage::new();
    let mut pending = vec![root.clone()];
    while let Some(node) = pending.pop() {
        if node.is_terminal() {
            continue;
        }
        for &index in node.subtype_bindings() {
            usage.mark(index);
        }
        let applicable = selectors.resolve(&node, model);
        for binding in applicable.bindings.iter().chain(&applicable.origins) {
            usage.mark(binding.index());
        }
        if !applicable.has_ignore() {
            pending.extend(graph.children(&node).iter().cloned());
        }
    }
    usage
}

/// Facade tying a type model to generators and an instantiator.
///
/// ```
/// use std::sync::Arc;
/// use specimen_core::{Request, Specimen};
/// use specimen_core::selectors::select;
/// use specimen_types::{TypeDef, TypeModel, Value};
///
/// let mut model = TypeModel::new();
/// model
///     .insert(
///         TypeDef::structure("Point")
///             .field("x", "i32")
///             .field("y", "i32")
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// let specimen = Specimen::new(Arc::new(model));
/// let request = Request::builder("Point")
///     .set(select::field("x"), 3)
///     .build()
///     .unwrap();
/// let point = specimen.create(&request).unwrap();
/// assert_eq!(point.get("x"), Some(&Value::Int(3)));
/// ```
#[derive(Clone)]
pub struct Specimen {
    model: Arc<TypeModel>,
    registry: GeneratorRegistry,
    instantiator: Arc<dyn Instantiator>,
}

impl Specimen {
    pub fn new(model: Arc<TypeModel>) -> Self {
        Self {
            model,
            registry: GeneratorRegistry::new(),
            instantiator: Arc::new(DefaultInstantiator),
        }
    }

    /// A facade whose model holds everything `T` describes.
    pub fn for_type<T: Describe>() -> Result<Self> {
        let model = specimen_types::describe::model_of::<T>()?;
        Ok(Self::new(Arc::new(model)))
    }

    pub fn type_model(&self) -> &TypeModel {
        &self.model
    }

    /// Use `generator` for every node of `type_name` or of a subtype without
    /// a more specific registration.
    pub fn register_generator<G>(&mut self, type_name: &str, generator: G) -> &mut Self
    where
        G: Generator + 'static,
    {
        self.registry.register(type_name, Arc::new(generator));
        self
    }

    pub fn with_instantiator(mut self, instantiator: Arc<dyn Instantiator>) -> Self {
        self.instantiator = instantiator;
        self
    }

    /// Resolve `request` once for repeated builds.
    pub fn model(&self, request: &Request) -> Result<PopulationModel> {
        PopulationModel::new(
            self.model.clone(),
            request,
            Arc::new(self.registry.clone()),
            self.instantiator.clone(),
        )
    }

    pub fn create(&self, request: &Request) -> Result<Value> {
        self.model(request)?.create()
    }

    pub fn populate(&self, request: &Request) -> Result<Population> {
        self.model(request)?.populate()
    }

    /// Create a value and deserialize it into `T`.
    pub fn create_as<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        Ok(self.create(request)?.deserialize_into()?)
    }
}

impl std::fmt::Debug for Specimen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Specimen")
            .field("types", &self.model.len())
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::select;
    use specimen_types::TypeDef;

    fn specimen() -> Specimen {
        let mut m = TypeModel::new();
        m.insert(
            TypeDef::structure("Item")
                .field("id", "i32")
                .field("tags", "List<String>")
                .build()
                .unwrap(),
        )
        .unwrap();
        Specimen::new(Arc::new(m))
    }

    #[test]
    fn test_seeded_populations_match() {
        let specimen = specimen();
        let request = Request::builder("Item").with_seed(9).build().unwrap();
        let a = specimen.populate(&request).unwrap();
        let b = specimen.populate(&request).unwrap();
        assert_eq!(a.seed, 9);
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn test_strict_mode_fails_on_unused() {
        let specimen = specimen();
        let request = Request::builder("Item")
            .set(select::field("nope"), 1)
            .build()
            .unwrap();
        match specimen.create(&request) {
            Err(Error::UnusedSelectors(report)) => assert_eq!(report.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_lenient_mode_reports_unused() {
        let specimen = specimen();
        let request = Request::builder("Item")
            .ignore(select::field("nope"))
            .lenient()
            .build()
            .unwrap();
        let population = specimen.populate(&request).unwrap();
        assert_eq!(population.unused.len(), 1);
        assert!(population.value.get("id").is_some());
    }

    #[test]
    fn test_request_depth_wins_over_settings() {
        let specimen = specimen();
        let request = Request::builder("Item")
            .with_max_depth(4)
            .with_settings(&Settings::new().with(&Keys::MAX_DEPTH, 1))
            .build()
            .unwrap();
        let model = specimen.model(&request).unwrap();
        assert_eq!(model.graph().max_depth(), 4);
        assert_eq!(
            model.settings().get(&Keys::CYCLE_POLICY),
            crate::settings::CyclePolicy::DepthBounded
        );
    }

    #[test]
    fn test_usage_counts_reachable_nodes() {
        let specimen = specimen();
        let request = Request::builder("Item")
            .with_nullable(select::field("tags"))
            .set(select::types("String"), "x")
            .build()
            .unwrap();
        let model = specimen.model(&request).unwrap();
        assert!(model.reachable.is_used(0));
        assert!(model.reachable.is_used(1));
    }

    #[test]
    fn test_create_many_is_reproducible() {
        let specimen = specimen();
        let request = Request::builder("Item").with_seed(5).build().unwrap();
        let model = specimen.model(&request).unwrap();
        let first = model.create_many(4).unwrap();
        let second = model.create_many(4).unwrap();
        assert_eq!(first, second);
        assert_ne!(first[0], first[1]);
    }
}
