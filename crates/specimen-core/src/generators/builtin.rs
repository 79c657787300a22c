//! Built-in generators for primitives and enums.
//!
//! Ranges come from per-node [`GenOptions`](super::GenOptions) when present,
//! otherwise from settings, and are clamped to the bounds of the target type.

use chrono::{NaiveDate, NaiveDateTime};
use specimen_types::{Primitive, TypeExpr, TypeKind, Value};

use super::{Generator, GeneratorContext};
use crate::node::NodeKind;
use crate::random::RandomSource;
use crate::settings::Keys;

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
/// Generated dates fall within this many days after the epoch.
const DATE_SPAN_DAYS: i64 = 365 * 60;
const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltIn {
    Bool,
    Integer(Primitive),
    Float(Primitive),
    Char,
    String,
    Uuid,
    Date,
    DateTime,
    Enum,
}

impl BuiltIn {
    /// The built-in generator for a node kind, if any.
    pub fn for_kind(kind: &NodeKind) -> Option<BuiltIn> {
        let builtin = match kind {
            NodeKind::Primitive(p) => match p {
                Primitive::Bool => BuiltIn::Bool,
                Primitive::Char => BuiltIn::Char,
                Primitive::String => BuiltIn::String,
                Primitive::Uuid => BuiltIn::Uuid,
                Primitive::Date => BuiltIn::Date,
                Primitive::DateTime => BuiltIn::DateTime,
                p if p.is_float() => BuiltIn::Float(*p),
                p => BuiltIn::Integer(*p),
            },
            NodeKind::Enum { .. } => BuiltIn::Enum,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn id(&self) -> &'static str {
        match self {
            BuiltIn::Bool => "bool",
            BuiltIn::Integer(p) | BuiltIn::Float(p) => p.name(),
            BuiltIn::Char => "char",
            BuiltIn::String => "string",
            BuiltIn::Uuid => "uuid",
            BuiltIn::Date => "date",
            BuiltIn::DateTime => "date_time",
            BuiltIn::Enum => "enum",
        }
    }

    fn integer(p: Primitive, random: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value {
        let (min, max) = ctx.options.and_then(|o| o.int_range).unwrap_or((
            ctx.settings.get(&Keys::INTEGER_MIN),
            ctx.settings.get(&Keys::INTEGER_MAX),
        ));
        let (tmin, tmax) = p.integer_bounds().unwrap_or((i64::MIN as i128, i64::MAX as i128));
        let hi = (max as i128).clamp(tmin, tmax);
        let lo = (min as i128).clamp(tmin, hi);
        if p.is_unsigned_integer() {
            Value::UInt(random.uint_range(lo as u64, hi as u64))
        } else {
            Value::Int(random.int_range(lo as i64, hi as i64))
        }
    }

    fn float(p: Primitive, random: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value {
        let (mut min, mut max) = ctx.options.and_then(|o| o.float_range).unwrap_or((
            ctx.settings.get(&Keys::FLOAT_MIN),
            ctx.settings.get(&Keys::FLOAT_MAX),
        ));
        if p == Primitive::F32 {
            let bound = f32::MAX as f64;
            min = min.clamp(-bound, bound);
            max = max.clamp(-bound, bound);
            return Value::Float(random.float_range(min, max) as f32 as f64);
        }
        Value::Float(random.float_range(min, max))
    }

    fn string(random: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value {
        if ctx.settings.get(&Keys::STRING_ALLOW_EMPTY) && random.null_roll(true) {
            return Value::String(String::new());
        }
        let (min, max) = ctx.options.and_then(|o| o.length).unwrap_or((
            ctx.settings.get(&Keys::STRING_MIN_LENGTH),
            ctx.settings.get(&Keys::STRING_MAX_LENGTH),
        ));
        let len = random.usize_range(min, max);
        Value::String((0..len).map(|_| random.alphabetic()).collect())
    }

    fn date(random: &mut RandomSource) -> Option<NaiveDate> {
        let days = random.int_range(0, DATE_SPAN_DAYS) as i32;
        NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_DAYS_FROM_CE + days)
    }

    fn date_time(random: &mut RandomSource) -> Option<NaiveDateTime> {
        let date = Self::date(random)?;
        let secs = random.int_range(0, SECONDS_PER_DAY - 1) as u32;
        date.and_hms_opt(secs / 3600, (secs / 60) % 60, secs % 60)
    }

    fn enumeration(random: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value {
        let TypeExpr::Named { name, .. } = ctx.ty else {
            return Value::Null;
        };
        let variants = match ctx.model.get(name).map(|d| &d.kind) {
            Some(TypeKind::Enum(e)) => &e.variants,
            _ => return Value::Null,
        };
        match random.choose(variants) {
            Some(variant) => Value::Enum {
                type_name: name.clone(),
                variant: variant.clone(),
            },
            None => Value::Null,
        }
    }
}

impl Generator for BuiltIn {
    fn generate(&self, random: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value {
        match *self {
            BuiltIn::Bool => Value::Bool(random.coin()),
            BuiltIn::Integer(p) => Self::integer(p, random, ctx),
            BuiltIn::Float(p) => Self::float(p, random, ctx),
            BuiltIn::Char => Value::Char(random.alphabetic()),
            BuiltIn::String => Self::string(random, ctx),
            BuiltIn::Uuid => {
                let bytes = random.bytes::<16>();
                Value::Uuid(uuid::Builder::from_random_bytes(bytes).into_uuid())
            }
            BuiltIn::Date => Self::date(random).map_or(Value::Null, Value::Date),
            BuiltIn::DateTime => Self::date_time(random).map_or(Value::Null, Value::DateTime),
            BuiltIn::Enum => Self::enumeration(random, ctx),
        }
    }
}
