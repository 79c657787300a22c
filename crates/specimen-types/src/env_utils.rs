//! Environment variable helpers.
//!
//! The only variable the engine itself reads is [`SEED_ENV`], which pins the
//! random seed of every build that does not specify one explicitly. This is
//! how a failing fixture is reproduced without touching the test code:
//!
//! ```text
//! SPECIMEN_SEED=1234 cargo test failing_test
//! ```

use std::str::FromStr;

/// Name of the variable holding a fallback seed.
pub const SEED_ENV: &str = "SPECIMEN_SEED";

/// Parse an environment variable into any `FromStr` type.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// True if the variable is set to "1", "true", "yes", or "on" (case-insensitive).
pub fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Seed taken from [`SEED_ENV`], if set to a valid `u64`.
pub fn seed_from_env() -> Option<u64> {
    env_var(SEED_ENV)
}
