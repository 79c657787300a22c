//! User generators registered per type name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use specimen_types::{TypeExpr, TypeModel};

use super::Generator;

#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    by_type: HashMap<String, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `generator` for values of `type_name`, replacing any previous
    /// registration. The name is matched against the raw name of a node's
    /// type, so `"List"` covers every list.
    pub fn register(&mut self, type_name: impl Into<String>, generator: Arc<dyn Generator>) {
        self.by_type.insert(type_name.into(), generator);
    }

    /// Generator for the exact type, or for its nearest registered supertype.
    pub fn lookup(&self, ty: &TypeExpr, model: &TypeModel) -> Option<Arc<dyn Generator>> {
        let name = ty.raw_name();
        if let Some(g) = self.by_type.get(name) {
            return Some(g.clone());
        }
        model
            .supertypes_of(name)
            .into_iter()
            .find_map(|def| self.by_type.get(&def.name).cloned())
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.by_type.keys().collect();
        names.sort();
        f.debug_struct("GeneratorRegistry")
            .field("types", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::GeneratorContext;
    use crate::random::RandomSource;
    use crate::settings::Settings;
    use specimen_types::{TypeDef, Value};

    fn constant(s: &'static str) -> Arc<dyn Generator> {
        Arc::new(move |_: &mut RandomSource, _: &GeneratorContext<'_>| Value::from(s))
    }

    #[test]
    fn test_most_specific_registration_wins() {
        let mut model = TypeModel::new();
        model
            .insert(TypeDef::structure("Animal").build().unwrap())
            .unwrap()
            .insert(TypeDef::structure("Dog").extends("Animal").build().unwrap())
            .unwrap()
            .insert(TypeDef::structure("Puppy").extends("Dog").build().unwrap())
            .unwrap();

        let mut registry = GeneratorRegistry::new();
        registry.register("Animal", constant("animal"));
        registry.register("Dog", constant("dog"));

        let settings = Settings::new();
        let pick = |name: &str| {
            let ty = TypeExpr::named(name);
            let g = registry.lookup(&ty, &model)?;
            let ctx = GeneratorContext {
                settings: &settings,
                options: None,
                ty: &ty,
                model: &model,
            };
            Some(g.generate(&mut RandomSource::new(1), &ctx))
        };
        assert_eq!(pick("Puppy"), Some(Value::from("dog")));
        assert_eq!(pick("Animal"), Some(Value::from("animal")));
        assert_eq!(pick("Cat"), None);
    }
}
