//! The configuration request: root type, ordered bindings, and settings.
//!
//! A [`RequestBuilder`] accumulates bindings in registration order and
//! validates everything in [`RequestBuilder::build`]. The resulting
//! [`Request`] is immutable and can be used for any number of builds.
//!
//! ```
//! use specimen_core::request::Request;
//! use specimen_core::selectors::select;
//!
//! let request = Request::builder("Order")
//!     .set(select::field("status"), "NEW")
//!     .ignore(select::field("internal_notes"))
//!     .with_seed(42)
//!     .build()
//!     .unwrap();
//! assert_eq!(request.seed(), Some(42));
//! ```

use std::panic::Location;
use std::sync::Arc;

use specimen_types::{parse_type_expr, Describe, TypeExpr, Value};

use crate::generators::GenOptions;
use crate::random::RandomSource;
use crate::selectors::{Action, Assignment, Selector, SelectorBinding};
use crate::settings::{AfterGenerate, CyclePolicy, Keys, Mode, Settings};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Request {
    root: TypeExpr,
    type_args: Vec<TypeExpr>,
    bindings: Vec<SelectorBinding>,
    settings: Settings,
    seed: Option<u64>,
    max_depth: Option<usize>,
}

impl Request {
    pub fn builder(root: &str) -> RequestBuilder {
        RequestBuilder::new(RootSpec::Raw(root.to_string()))
    }

    /// A request for a Rust type described with [`Describe`].
    pub fn of<T: Describe>() -> RequestBuilder {
        RequestBuilder::new(RootSpec::Typed(T::type_expr()))
    }

    pub fn root(&self) -> &TypeExpr {
        &self.root
    }

    pub fn type_args(&self) -> &[TypeExpr] {
        &self.type_args
    }

    pub fn bindings(&self) -> &[SelectorBinding] {
        &self.bindings
    }

    /// Settings overrides carried by the request, not yet merged with the
    /// defaults.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }
}

#[derive(Debug, Clone)]
enum RootSpec {
    Raw(String),
    Typed(TypeExpr),
}

pub struct RequestBuilder {
    root: RootSpec,
    type_args: Vec<String>,
    bindings: Vec<SelectorBinding>,
    settings: Settings,
    seed: Option<u64>,
    max_depth: Option<usize>,
    errors: Vec<Error>,
}

impl RequestBuilder {
    fn new(root: RootSpec) -> Self {
        Self {
            root,
            type_args: Vec::new(),
            bindings: Vec::new(),
            settings: Settings::new(),
            seed: None,
            max_depth: None,
            errors: Vec::new(),
        }
    }

    #[track_caller]
    fn bind(mut self, selector: Selector, action: Action) -> Self {
        self.bindings.push(SelectorBinding {
            index: self.bindings.len(),
            selector,
            action,
            location: Location::caller(),
        });
        self
    }

    /// Leave matching nodes out of the result entirely.
    #[track_caller]
    pub fn ignore(self, selector: Selector) -> Self {
        self.bind(selector, Action::Ignore)
    }

    /// Allow matching nodes to be null.
    #[track_caller]
    pub fn with_nullable(self, selector: Selector) -> Self {
        self.bind(selector, Action::Nullable)
    }

    #[track_caller]
    pub fn set(self, selector: Selector, value: impl Into<Value>) -> Self {
        self.bind(selector, Action::Set(value.into()))
    }

    /// Produce matching values with `supplier`. The engine leaves supplied
    /// values untouched.
    #[track_caller]
    pub fn supply<F>(self, selector: Selector, supplier: F) -> Self
    where
        F: Fn(&mut RandomSource) -> Value + Send + Sync + 'static,
    {
        self.supply_with_after(selector, AfterGenerate::DoNotModify, supplier)
    }

    /// Like [`supply`](Self::supply), letting the engine finish the value
    /// according to `after`.
    #[track_caller]
    pub fn supply_with_after<F>(self, selector: Selector, after: AfterGenerate, supplier: F) -> Self
    where
        F: Fn(&mut RandomSource) -> Value + Send + Sync + 'static,
    {
        self.bind(
            selector,
            Action::Supply {
                supplier: Arc::new(supplier),
                after,
            },
        )
    }

    /// Adjust ranges, sizes, and nullability for matching nodes.
    #[track_caller]
    pub fn generate(self, selector: Selector, options: GenOptions) -> Self {
        self.bind(selector, Action::Generate(options))
    }

    /// Populate matching nodes as `subtype`, which must be assignable to the
    /// declared type.
    #[track_caller]
    pub fn subtype(mut self, selector: Selector, subtype: &str) -> Self {
        match parse_type_expr(subtype) {
            Ok(ty) => self.bind(selector, Action::Subtype(ty)),
            Err(e) => {
                self.errors.push(e.into());
                self
            }
        }
    }

    /// Run `callback` with every finished value of a matching node.
    #[track_caller]
    pub fn on_complete<F>(self, selector: Selector, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.bind(selector, Action::OnComplete(Arc::new(callback)))
    }

    /// Regenerate matching values until `predicate` accepts one.
    #[track_caller]
    pub fn filter<F>(self, selector: Selector, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.bind(selector, Action::Filter(Arc::new(predicate)))
    }

    #[track_caller]
    pub fn assign(self, assignment: Assignment) -> Self {
        let destination = assignment.destination().clone();
        self.bind(destination, Action::Assign(assignment))
    }

    /// Layer `settings` over the overrides collected so far.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.settings = self.settings.merge(settings);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Bound the graph at `depth` and follow self-references until then,
    /// instead of cutting them at their first repetition.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self.settings = self
            .settings
            .with(&Keys::MAX_DEPTH, depth)
            .with(&Keys::CYCLE_POLICY, CyclePolicy::DepthBounded);
        self
    }

    /// Arguments for the root type's parameters, such as `["String", "i32"]`.
    pub fn with_type_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.type_args = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        self
    }

    /// Report unused selectors instead of failing.
    pub fn lenient(mut self) -> Self {
        self.settings = self.settings.with(&Keys::MODE, Mode::Lenient);
        self
    }

    pub fn build(self) -> Result<Request> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(error);
        }
        let root = match self.root {
            RootSpec::Raw(raw) => parse_type_expr(&raw)?,
            RootSpec::Typed(ty) => ty,
        };
        let type_args = self
            .type_args
            .iter()
            .map(|a| parse_type_expr(a))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for binding in &self.bindings {
            binding.selector.validate()?;
            match &binding.action {
                Action::Generate(options) => options.validate()?,
                Action::Assign(assignment) => assignment.origin().validate()?,
                _ => {}
            }
        }

        Ok(Request {
            root,
            type_args,
            bindings: self.bindings,
            settings: self.settings,
            seed: self.seed,
            max_depth: self.max_depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::select;

    #[test]
    fn test_bindings_keep_order_and_call_site() {
        let request = Request::builder("Order")
            .set(select::field("a"), 1)
            .ignore(select::field("b"))
            .build()
            .unwrap();
        let bindings = request.bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[1].index(), 1);
        assert!(bindings[0].location.file().ends_with("request.rs"));
        assert!(bindings[1].location.line() > bindings[0].location.line());
    }

    #[test]
    fn test_invalid_configuration_fails_build() {
        assert!(matches!(
            Request::builder("Order<").build(),
            Err(Error::Type(_))
        ));
        assert!(matches!(
            Request::builder("Order")
                .generate(select::field("n"), GenOptions::new().size(5, 1))
                .build(),
            Err(Error::InvalidRange { .. })
        ));
        assert!(matches!(
            Request::builder("Order").ignore(select::field("")).build(),
            Err(Error::InvalidSelector(_))
        ));
        assert!(Request::builder("Order")
            .subtype(select::field("x"), "List<")
            .build()
            .is_err());
    }

    #[test]
    fn test_max_depth_switches_cycle_policy() {
        let request = Request::builder("Node").with_max_depth(3).lenient().build().unwrap();
        assert_eq!(request.max_depth(), Some(3));
        assert_eq!(request.settings().get(&Keys::MAX_DEPTH), 3);
        assert_eq!(
            request.settings().get(&Keys::CYCLE_POLICY),
            CyclePolicy::DepthBounded
        );
        assert_eq!(request.settings().get(&Keys::MODE), Mode::Lenient);
    }

    #[test]
    fn test_typed_root() {
        let request = Request::of::<Vec<u8>>()
            .with_type_args(["i32"])
            .build()
            .unwrap();
        assert_eq!(request.root().to_string(), "List<u8>");
        assert_eq!(request.type_args().len(), 1);
    }
}
