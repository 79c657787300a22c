//! Report of bindings that never matched a node.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::binding::Category;

/// One binding that never fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedBinding {
    pub category: Category,
    /// Display form of the selector, e.g. `field("name")`.
    pub selector: String,
    /// Declaration site as `file:line:column`.
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedSelectorReport {
    pub unused: Vec<UnusedBinding>,
}

impl UnusedSelectorReport {
    pub fn is_empty(&self) -> bool {
        self.unused.is_empty()
    }

    pub fn len(&self) -> usize {
        self.unused.len()
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &UnusedBinding> {
        self.unused.iter().filter(move |u| u.category == category)
    }

    /// Categories that have at least one unused binding, in report order.
    pub fn categories(&self) -> Vec<Category> {
        let mut cats: Vec<Category> = self.unused.iter().map(|u| u.category).collect();
        cats.sort();
        cats.dedup();
        cats
    }
}

impl fmt::Display for UnusedSelectorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "found {} unused selector(s); remove them or fix the target:",
            self.len()
        )?;
        for category in self.categories() {
            writeln!(f, "  {category}:")?;
            for unused in self.by_category(category) {
                writeln!(f, "    {} declared at {}", unused.selector, unused.location)?;
            }
        }
        Ok(())
    }
}
