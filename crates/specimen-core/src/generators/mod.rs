//! Value generators.
//!
//! - [`builtin`] - generators for primitives and enums, driven by settings and
//!   per-node [`GenOptions`]
//! - [`registry`] - user generators registered per type name
//!
//! A generator only sees the random stream and a read-only context. It never
//! recurses into the node graph; values it leaves incomplete can be finished
//! by the engine according to [`AfterGenerate`].

pub mod builtin;
pub mod options;
pub mod registry;

use specimen_types::{TypeExpr, TypeModel, Value};

use crate::random::RandomSource;
use crate::settings::{AfterGenerate, Settings};

pub use builtin::BuiltIn;
pub use options::GenOptions;
pub use registry::GeneratorRegistry;

/// Read-only inputs available to a generator.
#[derive(Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub settings: &'a Settings,
    pub options: Option<&'a GenOptions>,
    /// Concrete type of the node being generated.
    pub ty: &'a TypeExpr,
    pub model: &'a TypeModel,
}

/// Type-level defaults a generator contributes to the node's hints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorHints {
    pub nullable: Option<bool>,
    pub after_generate: Option<AfterGenerate>,
}

pub trait Generator: Send + Sync {
    fn generate(&self, random: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value;

    fn hints(&self) -> GeneratorHints {
        GeneratorHints::default()
    }
}

impl<F> Generator for F
where
    F: Fn(&mut RandomSource, &GeneratorContext<'_>) -> Value + Send + Sync,
{
    fn generate(&self, random: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value {
        self(random, ctx)
    }
}

/// Wraps a generator with explicit hints.
pub struct WithHints<G> {
    inner: G,
    hints: GeneratorHints,
}

impl<G: Generator> WithHints<G> {
    pub fn new(inner: G, hints: GeneratorHints) -> Self {
        Self { inner, hints }
    }
}

impl<G: Generator> Generator for WithHints<G> {
    fn generate(&self, random: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value {
        self.inner.generate(random, ctx)
    }

    fn hints(&self) -> GeneratorHints {
        self.hints
    }
}
