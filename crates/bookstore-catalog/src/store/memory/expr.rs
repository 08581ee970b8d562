//! Aggregation expressions and projections

use bson::{Bson, Document};

use super::value::{lookup, modulo, subtract};
use super::EvalError;

/// Evaluate an aggregation expression against `doc`
///
/// Field paths (`"$published_year"`) resolve to the field value or null,
/// operator documents are applied, plain documents and arrays are evaluated
/// element-wise and everything else is a literal.
pub fn evaluate(expr: &Bson, doc: &Document) -> Result<Bson, EvalError> {
    match expr {
        Bson::String(s) if s.starts_with("$$") => Err(EvalError::UnknownOperator(s.clone())),
        Bson::String(s) if s.starts_with('$') => {
            Ok(lookup(doc, &s[1..]).cloned().unwrap_or(Bson::Null))
        }
        Bson::Document(d) => match d.iter().next() {
            Some((op, args)) if op.starts_with('$') => {
                if d.len() != 1 {
                    return Err(EvalError::BadArgument {
                        op: "expression",
                        reason: "an operator expression must have exactly one key".to_string(),
                    });
                }
                apply_operator(op, args, doc)
            }
            _ => {
                let mut out = Document::new();
                for (key, value) in d {
                    out.insert(key.clone(), evaluate(value, doc)?);
                }
                Ok(Bson::Document(out))
            }
        },
        Bson::Array(items) => items
            .iter()
            .map(|item| evaluate(item, doc))
            .collect::<Result<Vec<_>, _>>()
            .map(Bson::Array),
        literal => Ok(literal.clone()),
    }
}

fn apply_operator(op: &str, args: &Bson, doc: &Document) -> Result<Bson, EvalError> {
    match op {
        "$literal" => Ok(args.clone()),
        "$subtract" => {
            let [a, b] = binary_args("$subtract", args, doc)?;
            subtract(&a, &b)
        }
        "$mod" => {
            let [a, b] = binary_args("$mod", args, doc)?;
            modulo(&a, &b)
        }
        other => Err(EvalError::UnknownOperator(other.to_string())),
    }
}

fn binary_args(op: &'static str, args: &Bson, doc: &Document) -> Result<[Bson; 2], EvalError> {
    match args {
        Bson::Array(items) if items.len() == 2 => {
            Ok([evaluate(&items[0], doc)?, evaluate(&items[1], doc)?])
        }
        _ => Err(EvalError::BadArgument {
            op,
            reason: "expects an array of two expressions".to_string(),
        }),
    }
}

enum FieldRule<'a> {
    Include,
    Exclude,
    Computed(&'a Bson),
}

fn classify(value: &Bson) -> FieldRule<'_> {
    match value {
        Bson::Boolean(true) => FieldRule::Include,
        Bson::Boolean(false) => FieldRule::Exclude,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => {
            if super::value::as_f64(value) == Some(0.0) {
                FieldRule::Exclude
            } else {
                FieldRule::Include
            }
        }
        other => FieldRule::Computed(other),
    }
}

/// Apply a projection document, as used by find and `$project`
///
/// Inclusion and computed fields produce a new document holding only those
/// fields (plus `_id` unless excluded). A projection of exclusions only
/// removes the named fields. Mixing inclusion and exclusion is only allowed
/// for `_id`.
pub fn project(doc: &Document, spec: &Document) -> Result<Document, EvalError> {
    let mut include_id = true;
    let mut shaping = false;
    let mut excluded = Vec::new();

    for (field, value) in spec {
        match classify(value) {
            FieldRule::Exclude if field == "_id" => include_id = false,
            FieldRule::Exclude => excluded.push(field.as_str()),
            FieldRule::Include | FieldRule::Computed(_) => shaping = true,
        }
    }

    if shaping && !excluded.is_empty() {
        return Err(EvalError::BadArgument {
            op: "projection",
            reason: format!("cannot exclude {} in an inclusion projection", excluded[0]),
        });
    }

    if !shaping {
        let mut out = doc.clone();
        for field in excluded {
            out.remove(field);
        }
        if !include_id {
            out.remove("_id");
        }
        return Ok(out);
    }

    let mut out = Document::new();
    if include_id && !spec.contains_key("_id") {
        if let Some(id) = doc.get("_id") {
            out.insert("_id", id.clone());
        }
    }
    for (field, value) in spec {
        match classify(value) {
            FieldRule::Include => {
                if let Some(v) = lookup(doc, field) {
                    out.insert(field.clone(), v.clone());
                }
            }
            FieldRule::Computed(expr) => {
                out.insert(field.clone(), evaluate(expr, doc)?);
            }
            FieldRule::Exclude => {}
        }
    }
    Ok(out)
}
