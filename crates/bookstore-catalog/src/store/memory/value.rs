//! BSON value access, ordering and arithmetic for the in-memory store

use std::cmp::Ordering;

use bson::{Bson, Document};

use super::EvalError;

/// Resolve a dotted field path against a document
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Position of a value's type in MongoDB's cross-type sort order
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 12,
        Bson::DbPointer(_) => 13,
        Bson::MaxKey => 14,
    }
}

/// Numeric view of a value; Decimal128 is not supported
pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        #[allow(clippy::cast_precision_loss)]
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

pub fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        _ => None,
    }
}

pub fn is_numeric(value: &Bson) -> bool {
    as_f64(value).is_some()
}

/// Total order over BSON values following MongoDB's comparison rules
pub fn compare(a: &Bson, b: &Bson) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }

    match (a, b) {
        (Bson::String(x), Bson::String(y)) | (Bson::Symbol(x), Bson::Symbol(y)) => x.cmp(y),
        (Bson::String(x), Bson::Symbol(y)) | (Bson::Symbol(x), Bson::String(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => (x.time, x.increment).cmp(&(y.time, y.increment)),
        (Bson::Binary(x), Bson::Binary(y)) => x.bytes.cmp(&y.bytes),
        (Bson::Document(x), Bson::Document(y)) => compare_documents(x, y),
        (Bson::Array(x), Bson::Array(y)) => compare_sequences(x.iter(), y.iter()),
        _ => match (as_i64(a), as_i64(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => match (as_f64(a), as_f64(b)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => Ordering::Equal,
            },
        },
    }
}

fn compare_sequences<'a>(
    mut left: impl Iterator<Item = &'a Bson>,
    mut right: impl Iterator<Item = &'a Bson>,
) -> Ordering {
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => match compare(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
        }
    }
}

fn compare_documents(a: &Document, b: &Document) -> Ordering {
    let mut left = a.iter();
    let mut right = b.iter();
    loop {
        match (left.next(), right.next()) {
            (Some((ka, va)), Some((kb, vb))) => {
                let ord = compare(va, vb).then_with(|| ka.cmp(kb));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
        }
    }
}

/// Equality as used by query filters: numbers compare by value across types
pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    type_rank(a) == type_rank(b) && compare(a, b) == Ordering::Equal
}

/// Ordering for range operators, which only compare values of the same type class
pub fn compare_same_class(a: &Bson, b: &Bson) -> Option<Ordering> {
    if type_rank(a) == type_rank(b) {
        Some(compare(a, b))
    } else {
        None
    }
}

/// Integer or floating value produced by arithmetic expressions
#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

fn number(value: &Bson, op: &'static str) -> Result<Option<Number>, EvalError> {
    match value {
        Bson::Null | Bson::Undefined => Ok(None),
        Bson::Int32(v) => Ok(Some(Number::Int(i64::from(*v)))),
        Bson::Int64(v) => Ok(Some(Number::Int(*v))),
        Bson::Double(v) => Ok(Some(Number::Float(*v))),
        other => Err(EvalError::BadArgument {
            op,
            reason: format!("expected a number, got {:?}", other.element_type()),
        }),
    }
}

/// Narrow integer results back to Int32 when both inputs were Int32
fn integer_result(value: i64, narrow: bool) -> Bson {
    match i32::try_from(value) {
        Ok(v) if narrow => Bson::Int32(v),
        _ => Bson::Int64(value),
    }
}

fn both_int32(a: &Bson, b: &Bson) -> bool {
    matches!((a, b), (Bson::Int32(_), Bson::Int32(_)))
}

#[allow(clippy::cast_precision_loss)]
fn to_float(n: Number) -> f64 {
    match n {
        Number::Int(v) => v as f64,
        Number::Float(v) => v,
    }
}

pub fn subtract(a: &Bson, b: &Bson) -> Result<Bson, EvalError> {
    let (Some(x), Some(y)) = (number(a, "$subtract")?, number(b, "$subtract")?) else {
        return Ok(Bson::Null);
    };
    Ok(match (x, y) {
        (Number::Int(x), Number::Int(y)) => match x.checked_sub(y) {
            Some(v) => integer_result(v, both_int32(a, b)),
            #[allow(clippy::cast_precision_loss)]
            None => Bson::Double(x as f64 - y as f64),
        },
        (x, y) => Bson::Double(to_float(x) - to_float(y)),
    })
}

pub fn modulo(a: &Bson, b: &Bson) -> Result<Bson, EvalError> {
    let (Some(x), Some(y)) = (number(a, "$mod")?, number(b, "$mod")?) else {
        return Ok(Bson::Null);
    };
    match (x, y) {
        (Number::Int(_), Number::Int(0)) => Err(EvalError::BadArgument {
            op: "$mod",
            reason: "cannot divide by zero".to_string(),
        }),
        (Number::Int(x), Number::Int(y)) => Ok(integer_result(x % y, both_int32(a, b))),
        (x, y) => {
            let divisor = to_float(y);
            if divisor == 0.0 {
                return Err(EvalError::BadArgument {
                    op: "$mod",
                    reason: "cannot divide by zero".to_string(),
                });
            }
            Ok(Bson::Double(to_float(x) % divisor))
        }
    }
}

/// Parse a sort specification into (field, descending) pairs
pub fn sort_keys(spec: &Document) -> Result<Vec<(String, bool)>, EvalError> {
    spec.iter()
        .map(|(field, direction)| match as_f64(direction) {
            Some(d) if d == 1.0 => Ok((field.clone(), false)),
            Some(d) if d == -1.0 => Ok((field.clone(), true)),
            _ => Err(EvalError::BadArgument {
                op: "$sort",
                reason: format!("sort direction for {} must be 1 or -1", field),
            }),
        })
        .collect()
}

/// Stable sort of documents; missing fields sort as null
pub fn sort_documents(docs: &mut [Document], spec: &Document) -> Result<(), EvalError> {
    let keys = sort_keys(spec)?;
    if keys.is_empty() {
        return Err(EvalError::BadArgument {
            op: "$sort",
            reason: "sort specification must not be empty".to_string(),
        });
    }

    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let left = lookup(a, field).unwrap_or(&Bson::Null);
            let right = lookup(b, field).unwrap_or(&Bson::Null);
            let ord = compare(left, right);
            let ord = if *descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}
