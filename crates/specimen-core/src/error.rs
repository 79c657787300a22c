//! Error taxonomy for population builds.
//!
//! Configuration problems (unresolved root parameters, bad ranges, bad
//! selectors, bad subtypes) surface before any value is generated. Unused
//! selectors surface after a full traversal in strict mode. Assignment
//! mismatches and filter exhaustion abort the build with the offending path.
//! Construction failures are recovered by the engine and only reach callers
//! through [`Instantiator`](crate::assignment::Instantiator) implementations.

use specimen_types::TypeError;

use crate::selectors::UnusedSelectorReport;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "type '{type_name}' declares {expected} type parameter(s) [{}] but {provided} were supplied; \
         pass them with with_type_args",
        .params.join(", ")
    )]
    UnresolvedTypeParameters {
        type_name: String,
        params: Vec<String>,
        expected: usize,
        provided: usize,
    },

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("invalid range for {what}: min {min} is greater than max {max}")]
    InvalidRange {
        what: String,
        min: String,
        max: String,
    },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("'{to}' is not a subtype of '{from}'")]
    InvalidSubtype { from: String, to: String },

    #[error("settings are locked and cannot be modified")]
    SettingsLocked,

    #[error("{0}")]
    UnusedSelectors(UnusedSelectorReport),

    #[error("cannot assign {actual} to '{path}': expected {expected}")]
    Assignment {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("no mutator for '{path}' and missing mutators are configured to fail")]
    MissingMutator { path: String },

    #[error("filter at '{path}' rejected every value after {attempts} attempts")]
    FilterExhausted { path: String, attempts: usize },

    #[error("cannot construct '{type_name}' at '{path}': {reason}")]
    Construction {
        path: String,
        type_name: String,
        reason: String,
    },
}

impl Error {
    /// Configuration errors are raised before generation starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnresolvedTypeParameters { .. }
                | Error::UnknownType(_)
                | Error::Type(_)
                | Error::InvalidRange { .. }
                | Error::InvalidSelector(_)
                | Error::InvalidSubtype { .. }
                | Error::SettingsLocked
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
