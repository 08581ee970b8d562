//! Query filter evaluation

use bson::{Bson, Document};

use super::value::{compare_same_class, lookup, values_equal};
use super::EvalError;

/// Whether `doc` satisfies every condition in `filter`
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, EvalError> {
    for (key, condition) in filter {
        let satisfied = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(EvalError::UnknownOperator(op.to_string()));
            }
            field => field_matches(lookup(doc, field), condition)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(op: &str, condition: &'a Bson) -> Result<Vec<&'a Document>, EvalError> {
    let Bson::Array(items) = condition else {
        return Err(EvalError::BadArgument {
            op: if op == "$and" { "$and" } else { "$or" },
            reason: "argument must be an array".to_string(),
        });
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(clause) => Ok(clause),
            _ => Err(EvalError::BadArgument {
                op: if op == "$and" { "$and" } else { "$or" },
                reason: "every clause must be a document".to_string(),
            }),
        })
        .collect()
}

/// An operator document is one whose keys all start with `$`
fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(d) if !d.is_empty() && d.keys().all(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> Result<bool, EvalError> {
    let Some(operators) = is_operator_document(condition) else {
        return Ok(equals(value, condition));
    };

    for (op, operand) in operators {
        let satisfied = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => range(value, operand, |o| o.is_gt()),
            "$gte" => range(value, operand, |o| o.is_ge()),
            "$lt" => range(value, operand, |o| o.is_lt()),
            "$lte" => range(value, operand, |o| o.is_le()),
            "$in" => members(op, operand)?.iter().any(|m| equals(value, m)),
            "$nin" => !members(op, operand)?.iter().any(|m| equals(value, m)),
            "$exists" => {
                let wanted = match operand {
                    Bson::Boolean(b) => *b,
                    other => super::value::as_f64(other).map_or(true, |n| n != 0.0),
                };
                value.is_some() == wanted
            }
            other => return Err(EvalError::UnknownOperator(other.to_string())),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn members<'a>(op: &str, operand: &'a Bson) -> Result<&'a Vec<Bson>, EvalError> {
    match operand {
        Bson::Array(items) => Ok(items),
        _ => Err(EvalError::BadArgument {
            op: if op == "$in" { "$in" } else { "$nin" },
            reason: "argument must be an array".to_string(),
        }),
    }
}

/// Equality with MongoDB's null semantics: `null` matches a missing field,
/// and an array field matches when any element is equal
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(actual) => values_equal(actual, expected),
    }
}

fn range(value: Option<&Bson>, bound: &Bson, accept: impl Fn(std::cmp::Ordering) -> bool) -> bool {
    match value {
        Some(actual) => compare_same_class(actual, bound).map_or(false, accept),
        None => false,
    }
}
