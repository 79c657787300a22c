//! Per-node generation options attached with `generate(selector, options)`.

use std::fmt::Display;

use crate::settings::AfterGenerate;
use crate::{Error, Result};

/// Overrides for the settings-derived parameters of one node. Unset knobs
/// fall back to [`Settings`](crate::settings::Settings).
///
/// ```
/// use specimen_core::generators::GenOptions;
///
/// let opts = GenOptions::new().int_range(18, 65).size(1, 3);
/// assert!(opts.validate().is_ok());
/// assert!(GenOptions::new().length(9, 2).validate().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenOptions {
    pub int_range: Option<(i64, i64)>,
    pub float_range: Option<(f64, f64)>,
    /// String length.
    pub length: Option<(usize, usize)>,
    /// Collection, map, or array size.
    pub size: Option<(usize, usize)>,
    pub nullable_elements: Option<bool>,
    pub nullable_keys: Option<bool>,
    pub nullable_values: Option<bool>,
    pub after_generate: Option<AfterGenerate>,
}

impl GenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int_range(mut self, min: i64, max: i64) -> Self {
        self.int_range = Some((min, max));
        self
    }

    pub fn float_range(mut self, min: f64, max: f64) -> Self {
        self.float_range = Some((min, max));
        self
    }

    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.length = Some((min, max));
        self
    }

    pub fn size(mut self, min: usize, max: usize) -> Self {
        self.size = Some((min, max));
        self
    }

    pub fn nullable_elements(mut self, nullable: bool) -> Self {
        self.nullable_elements = Some(nullable);
        self
    }

    pub fn nullable_keys(mut self, nullable: bool) -> Self {
        self.nullable_keys = Some(nullable);
        self
    }

    pub fn nullable_values(mut self, nullable: bool) -> Self {
        self.nullable_values = Some(nullable);
        self
    }

    pub fn after_generate(mut self, after: AfterGenerate) -> Self {
        self.after_generate = Some(after);
        self
    }

    /// Every range must satisfy `min <= max`.
    pub fn validate(&self) -> Result<()> {
        check("int_range", self.int_range)?;
        check("float_range", self.float_range)?;
        check("length", self.length)?;
        check("size", self.size)
    }
}

fn check<T: PartialOrd + Display>(what: &str, range: Option<(T, T)>) -> Result<()> {
    match range {
        Some((min, max)) if min > max => Err(Error::InvalidRange {
            what: what.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_offending_range() {
        let err = GenOptions::new()
            .size(1, 2)
            .float_range(5.0, 1.5)
            .validate()
            .unwrap_err();
        match err {
            Error::InvalidRange { what, min, max } => {
                assert_eq!(what, "float_range");
                assert_eq!(min, "5");
                assert_eq!(max, "1.5");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_equal_bounds_are_valid() {
        assert!(GenOptions::new().int_range(3, 3).length(0, 0).validate().is_ok());
    }
}
