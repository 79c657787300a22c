//! Typed, layered settings.
//!
//! ## Layers
//!
//! [`Settings::defaults`] is a process-wide table holding the default of every
//! key. It is built on first use, locked, and never mutated afterwards. A build
//! merges the request's overrides on top of it with [`Settings::merge`],
//! producing a new locked table owned by that build.
//!
//! ## Ranges
//!
//! Min/max pairs stay ordered: setting a minimum above the current maximum
//! raises the maximum to the new minimum plus half of it, and setting a maximum
//! below the current minimum lowers the minimum the same way.
//!
//! ## Example
//!
//! ```
//! use specimen_core::settings::{Keys, Settings};
//!
//! let settings = Settings::new()
//!     .with(&Keys::COLLECTION_MIN_SIZE, 10)
//!     .with(&Keys::STRING_NULLABLE, true);
//!
//! assert_eq!(settings.get(&Keys::COLLECTION_MIN_SIZE), 10);
//! assert_eq!(settings.get(&Keys::COLLECTION_MAX_SIZE), 15);
//! ```

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Whether unused selectors fail the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Strict,
    Lenient,
}

/// How produced values are written into their parent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentType {
    /// Write the member directly.
    Field,
    /// Write through the member's declared mutator.
    Method,
}

/// What method assignment does for a member that declares no mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnSetterMissing {
    Ignore,
    AssignField,
    Fail,
}

/// What the engine does with a value produced by a custom generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfterGenerate {
    /// Leave the value untouched.
    DoNotModify,
    /// Populate members that are still null.
    PopulateNulls,
    /// Overwrite every member.
    PopulateAll,
    /// Apply matching selectors inside the value, populate nothing else.
    ApplySelectors,
}

/// How self-referencing type graphs are bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Stop at the first repetition of a (type, member) position.
    Truncate,
    /// Follow back-references until the maximum depth.
    DepthBounded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Size(usize),
    Float(f64),
    Mode(Mode),
    AssignmentType(AssignmentType),
    OnSetterMissing(OnSetterMissing),
    AfterGenerate(AfterGenerate),
    CyclePolicy(CyclePolicy),
}

impl SettingValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Int(v) => Some(*v as f64),
            SettingValue::Size(v) => Some(*v as f64),
            SettingValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// `self` plus half of its magnitude, saturating.
    fn widened(&self) -> SettingValue {
        match self {
            SettingValue::Int(v) => SettingValue::Int(v.saturating_add(v.saturating_abs() / 2)),
            SettingValue::Size(v) => SettingValue::Size(v.saturating_add(v / 2)),
            SettingValue::Float(v) => SettingValue::Float(v + v.abs() / 2.0),
            other => other.clone(),
        }
    }

    /// `self` minus half of its magnitude, saturating.
    fn narrowed(&self) -> SettingValue {
        match self {
            SettingValue::Int(v) => SettingValue::Int(v.saturating_sub(v.saturating_abs() / 2)),
            SettingValue::Size(v) => SettingValue::Size(v - v / 2),
            SettingValue::Float(v) => SettingValue::Float(v - v.abs() / 2.0),
            other => other.clone(),
        }
    }
}

/// Rust types that can be stored under a [`Key`].
pub trait SettingType: Clone {
    fn into_setting(self) -> SettingValue;
    fn from_setting(value: &SettingValue) -> Option<Self>;
}

macro_rules! setting_type {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(impl SettingType for $t {
            fn into_setting(self) -> SettingValue {
                SettingValue::$variant(self)
            }

            fn from_setting(value: &SettingValue) -> Option<Self> {
                match value {
                    SettingValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        })*
    };
}

setting_type!(
    bool => Bool,
    i64 => Int,
    usize => Size,
    f64 => Float,
    Mode => Mode,
    AssignmentType => AssignmentType,
    OnSetterMissing => OnSetterMissing,
    AfterGenerate => AfterGenerate,
    CyclePolicy => CyclePolicy,
);

/// A typed settings key with its default.
#[derive(Debug, Clone, Copy)]
pub struct Key<T> {
    name: &'static str,
    default: T,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str, default: T) -> Self {
        Self { name, default }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }
}

/// Every known settings key.
pub struct Keys;

macro_rules! keys {
    ($($(#[$doc:meta])* $ident:ident: $t:ty = $name:literal => $default:expr;)*) => {
        impl Keys {
            $($(#[$doc])* pub const $ident: Key<$t> = Key::new($name, $default);)*
        }

        fn default_entries() -> Vec<(&'static str, SettingValue)> {
            vec![$(($name, <$t as SettingType>::into_setting($default)),)*]
        }
    };
}

keys! {
    /// Nodes at this depth or deeper are left null or empty.
    MAX_DEPTH: usize = "max.depth" => 8;
    MODE: Mode = "mode" => Mode::Strict;
    ASSIGNMENT_TYPE: AssignmentType = "assignment.type" => AssignmentType::Field;
    ON_SET_METHOD_NOT_FOUND: OnSetterMissing = "on.set.method.not.found" => OnSetterMissing::AssignField;
    /// Default for values produced by custom generators.
    AFTER_GENERATE: AfterGenerate = "after.generate" => AfterGenerate::ApplySelectors;
    CYCLE_POLICY: CyclePolicy = "cycle.policy" => CyclePolicy::Truncate;
    /// Cap on regenerations while a filter rejects values.
    MAX_GENERATION_ATTEMPTS: usize = "max.generation.attempts" => 1000;

    COLLECTION_MIN_SIZE: usize = "collection.min.size" => 2;
    COLLECTION_MAX_SIZE: usize = "collection.max.size" => 6;
    COLLECTION_NULLABLE: bool = "collection.nullable" => false;
    COLLECTION_ELEMENTS_NULLABLE: bool = "collection.elements.nullable" => false;

    MAP_MIN_SIZE: usize = "map.min.size" => 2;
    MAP_MAX_SIZE: usize = "map.max.size" => 6;
    MAP_NULLABLE: bool = "map.nullable" => false;
    MAP_KEYS_NULLABLE: bool = "map.keys.nullable" => false;
    MAP_VALUES_NULLABLE: bool = "map.values.nullable" => false;

    ARRAY_MIN_LENGTH: usize = "array.min.length" => 2;
    ARRAY_MAX_LENGTH: usize = "array.max.length" => 6;
    ARRAY_NULLABLE: bool = "array.nullable" => false;
    ARRAY_ELEMENTS_NULLABLE: bool = "array.elements.nullable" => false;

    STRING_MIN_LENGTH: usize = "string.min.length" => 3;
    STRING_MAX_LENGTH: usize = "string.max.length" => 10;
    STRING_NULLABLE: bool = "string.nullable" => false;
    /// Occasionally produce an empty string.
    STRING_ALLOW_EMPTY: bool = "string.allow.empty" => false;

    INTEGER_MIN: i64 = "integer.min" => 1;
    INTEGER_MAX: i64 = "integer.max" => 10000;
    INTEGER_NULLABLE: bool = "integer.nullable" => false;

    FLOAT_MIN: f64 = "float.min" => 1.0;
    FLOAT_MAX: f64 = "float.max" => 10000.0;
    FLOAT_NULLABLE: bool = "float.nullable" => false;

    BOOLEAN_NULLABLE: bool = "boolean.nullable" => false;
    CHARACTER_NULLABLE: bool = "character.nullable" => false;
    ENUM_NULLABLE: bool = "enum.nullable" => false;
    OPTION_NULLABLE: bool = "option.nullable" => false;
}

const RANGE_PAIRS: &[(&str, &str)] = &[
    ("collection.min.size", "collection.max.size"),
    ("map.min.size", "map.max.size"),
    ("array.min.length", "array.max.length"),
    ("string.min.length", "string.max.length"),
    ("integer.min", "integer.max"),
    ("float.min", "float.max"),
];

static DEFAULTS: OnceLock<Settings> = OnceLock::new();

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    values: BTreeMap<&'static str, SettingValue>,
    locked: bool,
}

impl Settings {
    /// An empty, unlocked overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide defaults, built once and locked.
    pub fn defaults() -> &'static Settings {
        DEFAULTS.get_or_init(|| Settings {
            values: default_entries().into_iter().collect(),
            locked: true,
        })
    }

    /// Value for `key`, falling back to its default.
    pub fn get<T: SettingType>(&self, key: &Key<T>) -> T {
        self.values
            .get(key.name)
            .and_then(T::from_setting)
            .unwrap_or_else(|| key.default.clone())
    }

    pub fn contains<T>(&self, key: &Key<T>) -> bool {
        self.values.contains_key(key.name)
    }

    /// Set a value in place. Fails on locked settings.
    pub fn set<T: SettingType>(&mut self, key: &Key<T>, value: T) -> Result<&mut Self> {
        if self.locked {
            return Err(Error::SettingsLocked);
        }
        self.put(key.name, value.into_setting());
        Ok(self)
    }

    /// Copy-on-write set: returns an unlocked copy carrying the new value.
    pub fn with<T: SettingType>(&self, key: &Key<T>, value: T) -> Settings {
        let mut copy = Settings {
            values: self.values.clone(),
            locked: false,
        };
        copy.put(key.name, value.into_setting());
        copy
    }

    /// Layer `overrides` on top of `self`, returning a new unlocked table.
    pub fn merge(&self, overrides: &Settings) -> Settings {
        let mut merged = Settings {
            values: self.values.clone(),
            locked: false,
        };
        for (name, value) in &overrides.values {
            merged.put(*name, value.clone());
        }
        merged
    }

    pub fn lock(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    fn put(&mut self, name: &'static str, value: SettingValue) {
        self.values.insert(name, value.clone());
        self.adjust_range(name, &value);
    }

    fn lookup(&self, name: &str) -> Option<SettingValue> {
        self.values
            .get(name)
            .or_else(|| Settings::defaults().values.get(name))
            .cloned()
    }

    fn adjust_range(&mut self, name: &str, value: &SettingValue) {
        let Some(new) = value.as_f64() else { return };
        for (min_key, max_key) in RANGE_PAIRS {
            if name == *min_key {
                let current_max = self.lookup(max_key).and_then(|v| v.as_f64());
                if current_max.is_some_and(|max| new > max) {
                    self.values.insert(*max_key, value.widened());
                }
            } else if name == *max_key {
                let current_min = self.lookup(min_key).and_then(|v| v.as_f64());
                if current_min.is_some_and(|min| new < min) {
                    self.values.insert(*min_key, value.narrowed());
                }
            }
        }
    }
}
