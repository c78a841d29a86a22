use std::cmp::Ordering;
use std::collections::BTreeMap;
use bson::Bson;

/// Errors raised by the numeric helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsonArithmeticError {
    LhsNotNumeric,
    RhsNotNumeric,
    Overflow,
}

/// Returns a short, user facing name for the type of a BSON value.
pub fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::String(_) => "string",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::Document(_) => "document",
        Bson::Array(_) => "array",
        Bson::DateTime(_) => "date",
        Bson::ObjectId(_) => "objectId",
        _ => "other",
    }
}

pub fn is_numeric(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

/// Adds `rhs` to an optional existing value, treating a missing value as `0`.
///
/// Integer additions keep integer types: an `Int32` sum that does not fit is widened
/// to `Int64`, an `Int64` sum that does not fit is an overflow. As soon as one side is
/// a `Double` the result is a `Double`.
pub fn add_numeric(lhs: Option<&Bson>, rhs: &Bson) -> Result<Bson, BsonArithmeticError> {
    if !is_numeric(rhs) {
        return Err(BsonArithmeticError::RhsNotNumeric);
    }
    let lhs = match lhs {
        None => return Ok(rhs.clone()),
        Some(v) if is_numeric(v) => v,
        Some(_) => return Err(BsonArithmeticError::LhsNotNumeric),
    };

    let sum = match (lhs, rhs) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(*a as i64 + *b as i64),
        },
        (Bson::Int32(a), Bson::Int64(b)) => {
            Bson::Int64((*a as i64).checked_add(*b).ok_or(BsonArithmeticError::Overflow)?)
        }
        (Bson::Int64(a), Bson::Int32(b)) => {
            Bson::Int64(a.checked_add(*b as i64).ok_or(BsonArithmeticError::Overflow)?)
        }
        (Bson::Int64(a), Bson::Int64(b)) => {
            Bson::Int64(a.checked_add(*b).ok_or(BsonArithmeticError::Overflow)?)
        }
        (a, b) => Bson::Double(to_f64(a) + to_f64(b)),
    };
    Ok(sum)
}

/// Compares two numeric values across the `Int32`, `Int64` and `Double` families.
/// Returns `None` if either side is not numeric or a `NaN` is involved.
pub fn compare_numeric(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => Some(x.cmp(y)),
        (Bson::Int64(x), Bson::Int64(y)) => Some(x.cmp(y)),
        (Bson::Int32(x), Bson::Int64(y)) => Some((*x as i64).cmp(y)),
        (Bson::Int64(x), Bson::Int32(y)) => Some(x.cmp(&(*y as i64))),
        (x, y) if is_numeric(x) && is_numeric(y) => to_f64(x).partial_cmp(&to_f64(y)),
        _ => None,
    }
}

/// Reads a numeric value as `i64`, truncating doubles.
pub fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(*v as i64),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.is_finite() => Some(*v as i64),
        _ => None,
    }
}

/// Reads a numeric value as `f64`.
pub fn as_f64(value: &Bson) -> Option<f64> {
    is_numeric(value).then(|| to_f64(value))
}

fn to_f64(value: &Bson) -> f64 {
    match value {
        Bson::Int32(v) => *v as f64,
        Bson::Int64(v) => *v as f64,
        Bson::Double(v) => *v,
        _ => f64::NAN,
    }
}

pub fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        // NaN == NaN for matching purposes
        (Bson::Double(x), Bson::Double(y)) if x.is_nan() && y.is_nan() => true,
        (Bson::Int32(x), Bson::Int32(y)) => x == y,
        (Bson::Int64(x), Bson::Int64(y)) => x == y,
        (Bson::Double(x), Bson::Double(y)) => x == y,

        // Mixed numeric types compare by value, without rounding
        (Bson::Int32(x), Bson::Int64(y)) | (Bson::Int64(y), Bson::Int32(x)) => *x as i64 == *y,
        (Bson::Int32(x), Bson::Double(y)) | (Bson::Double(y), Bson::Int32(x)) => *x as f64 == *y,
        (Bson::Int64(x), Bson::Double(y)) | (Bson::Double(y), Bson::Int64(x)) => long_eq_double(*x, *y),

        // Documents compare independently of key order
        (Bson::Document(a), Bson::Document(b)) => {
            let a_sorted: BTreeMap<_, _> = a.iter().collect();
            let b_sorted: BTreeMap<_, _> = b.iter().collect();
            a_sorted.len() == b_sorted.len()
                && a_sorted
                    .iter()
                    .zip(b_sorted.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && bson_eq(va, vb))
        }

        (Bson::Array(a), Bson::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| bson_eq(x, y))
        }

        _ => a == b,
    }
}

/// `i64` values above 2^53 are not exactly representable as `f64`: the double is
/// converted to an integer instead.
fn long_eq_double(long: i64, double: f64) -> bool {
    // 2^63, the first double outside of the i64 range
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    double.fract() == 0.0 && (-LIMIT..LIMIT).contains(&double) && double as i64 == long
}
