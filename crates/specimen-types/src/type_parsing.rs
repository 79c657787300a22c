//! Type string parsing utilities.
//!
//! Supports:
//! - Primitive types: `bool`, `i8`..`i64`, `u8`..`u64`, `f32`, `f64`, `char`,
//!   `String`, `Uuid`, `Date`, `DateTime`
//! - Containers: `List<T>` (`Vec<T>`), `Set<T>`, `Map<K, V>`, `Option<T>`, `[T]`
//! - Named types: `Person` or `Pair<String, List<i32>>`
//!
//! Bare identifiers parse as named types unless they appear in the list of
//! in-scope type parameters passed to [`parse_type_expr_in`].

use crate::type_expr::{Primitive, TypeExpr};
use crate::{Result, TypeError};

/// Parse a type string with no type parameters in scope.
///
/// # Examples
///
/// ```
/// use specimen_types::parse_type_expr;
///
/// let ty = parse_type_expr("Map<String, List<i32>>").unwrap();
/// assert_eq!(ty.to_string(), "Map<String, List<i32>>");
/// ```
pub fn parse_type_expr(type_str: &str) -> Result<TypeExpr> {
    parse_type_expr_in(type_str, &[])
}

/// Parse a type string, treating identifiers in `params` as type parameters.
pub fn parse_type_expr_in(type_str: &str, params: &[String]) -> Result<TypeExpr> {
    let type_str = type_str.trim();
    if type_str.is_empty() {
        return Err(parse_error(type_str, "empty type"));
    }

    // Array: [T]
    if let Some(inner) = type_str
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
    {
        return Ok(TypeExpr::array(parse_type_expr_in(inner, params)?));
    }

    let (base, args_str) = match type_str.find('<') {
        Some(angle_pos) => {
            if !type_str.ends_with('>') {
                return Err(parse_error(type_str, "unbalanced '<'"));
            }
            let base = type_str[..angle_pos].trim();
            let args = &type_str[angle_pos + 1..type_str.len() - 1];
            (base, Some(args))
        }
        None => (type_str, None),
    };

    if !is_identifier(base) {
        return Err(parse_error(type_str, "invalid type name"));
    }

    let args = match args_str {
        Some(args) => {
            let parts = split_type_params(args);
            if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
                return Err(parse_error(type_str, "empty type argument"));
            }
            parts
                .into_iter()
                .map(|p| parse_type_expr_in(p, params))
                .collect::<Result<Vec<_>>>()?
        }
        None => Vec::new(),
    };

    if args.is_empty() {
        if let Some(prim) = Primitive::from_name(base) {
            return Ok(TypeExpr::Primitive(prim));
        }
        if params.iter().any(|p| p == base) {
            return Ok(TypeExpr::Param(base.to_string()));
        }
        return Ok(TypeExpr::named(base));
    }

    let arg_count = args.len();
    let arity = |expected: usize| -> Result<()> {
        if arg_count != expected {
            return Err(parse_error(
                type_str,
                &format!("{} expects {} type argument(s)", base, expected),
            ));
        }
        Ok(())
    };

    let mut args = args;
    match base {
        "List" | "Vec" | "VecDeque" => {
            arity(1)?;
            Ok(TypeExpr::list(args.remove(0)))
        }
        "Set" | "HashSet" | "BTreeSet" => {
            arity(1)?;
            Ok(TypeExpr::set(args.remove(0)))
        }
        "Option" => {
            arity(1)?;
            Ok(TypeExpr::optional(args.remove(0)))
        }
        "Map" | "HashMap" | "BTreeMap" => {
            arity(2)?;
            let value = args.remove(1);
            let key = args.remove(0);
            Ok(TypeExpr::map(key, value))
        }
        _ => Ok(TypeExpr::generic(base, args)),
    }
}

/// Split type parameters respecting nested angle and square brackets.
///
/// Given "A, B<C, D>, E", returns ["A", "B<C, D>", "E"] by tracking bracket depth.
pub fn split_type_params(s: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => depth -= 1,
            ',' if depth == 0 => {
                result.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < s.len() {
        result.push(s[start..].trim());
    }

    result
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == ':' || c == '.')
}

fn parse_error(input: &str, reason: &str) -> TypeError {
    TypeError::Parse {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
