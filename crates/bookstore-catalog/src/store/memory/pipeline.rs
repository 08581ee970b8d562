//! Aggregation pipeline execution

use std::collections::HashMap;

use bson::{Bson, Document};

use super::expr::{evaluate, project};
use super::filter::matches;
use super::value::{as_f64, as_i64, compare, is_numeric, sort_documents};
use super::EvalError;

/// Run `pipeline` over `docs`, stage by stage
pub fn run(mut docs: Vec<Document>, pipeline: &[Document]) -> Result<Vec<Document>, EvalError> {
    for stage in pipeline {
        let mut entries = stage.iter();
        let (Some((name, spec)), None) = (entries.next(), entries.next()) else {
            return Err(EvalError::BadArgument {
                op: "pipeline",
                reason: "each stage must have exactly one field".to_string(),
            });
        };

        docs = match name.as_str() {
            "$match" => {
                let filter = stage_document("$match", spec)?;
                let mut kept = Vec::with_capacity(docs.len());
                for doc in docs {
                    if matches(&doc, filter)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$project" => {
                let spec = stage_document("$project", spec)?;
                docs.iter()
                    .map(|doc| project(doc, spec))
                    .collect::<Result<Vec<_>, _>>()?
            }
            "$group" => group(&docs, stage_document("$group", spec)?)?,
            "$sort" => {
                sort_documents(&mut docs, stage_document("$sort", spec)?)?;
                docs
            }
            "$limit" => {
                let n = stage_count("$limit", spec)?;
                if n == 0 {
                    return Err(EvalError::BadArgument {
                        op: "$limit",
                        reason: "the limit must be positive".to_string(),
                    });
                }
                docs.truncate(n);
                docs
            }
            "$skip" => {
                let n = stage_count("$skip", spec)?;
                docs.into_iter().skip(n).collect()
            }
            other => return Err(EvalError::UnknownStage(other.to_string())),
        };
    }
    Ok(docs)
}

fn stage_document<'a>(op: &'static str, spec: &'a Bson) -> Result<&'a Document, EvalError> {
    match spec {
        Bson::Document(d) => Ok(d),
        _ => Err(EvalError::BadArgument {
            op,
            reason: "specification must be a document".to_string(),
        }),
    }
}

fn stage_count(op: &'static str, spec: &Bson) -> Result<usize, EvalError> {
    as_i64(spec)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| EvalError::BadArgument {
            op,
            reason: "argument must be a non-negative integer".to_string(),
        })
}

/// Running state of one `$group` accumulator
enum Accumulator {
    Sum { total: Bson },
    Avg { sum: f64, count: u32 },
    Min(Option<Bson>),
    Max(Option<Bson>),
    Push(Vec<Bson>),
    First(Option<Bson>),
}

impl Accumulator {
    fn new(op: &str) -> Result<Self, EvalError> {
        Ok(match op {
            "$sum" => Accumulator::Sum {
                total: Bson::Int32(0),
            },
            "$avg" => Accumulator::Avg { sum: 0.0, count: 0 },
            "$min" => Accumulator::Min(None),
            "$max" => Accumulator::Max(None),
            "$push" => Accumulator::Push(Vec::new()),
            "$first" => Accumulator::First(None),
            other => return Err(EvalError::UnknownOperator(other.to_string())),
        })
    }

    fn add(&mut self, value: Bson) {
        match self {
            Accumulator::Sum { total } => {
                if is_numeric(&value) {
                    *total = add_numbers(total, &value);
                }
            }
            Accumulator::Avg { sum, count } => {
                if let Some(v) = as_f64(&value) {
                    *sum += v;
                    *count += 1;
                }
            }
            Accumulator::Min(current) => {
                if !matches!(value, Bson::Null)
                    && current.as_ref().map_or(true, |c| compare(&value, c).is_lt())
                {
                    *current = Some(value);
                }
            }
            Accumulator::Max(current) => {
                if !matches!(value, Bson::Null)
                    && current.as_ref().map_or(true, |c| compare(&value, c).is_gt())
                {
                    *current = Some(value);
                }
            }
            Accumulator::Push(values) => values.push(value),
            Accumulator::First(first) => {
                if first.is_none() {
                    *first = Some(value);
                }
            }
        }
    }

    fn finish(self) -> Bson {
        match self {
            Accumulator::Sum { total } => total,
            Accumulator::Avg { count: 0, .. } => Bson::Null,
            Accumulator::Avg { sum, count } => Bson::Double(sum / f64::from(count)),
            Accumulator::Min(v) | Accumulator::Max(v) | Accumulator::First(v) => {
                v.unwrap_or(Bson::Null)
            }
            Accumulator::Push(values) => Bson::Array(values),
        }
    }
}

/// Integer sums stay integral, widening Int32 to Int64 on overflow
fn add_numbers(total: &Bson, value: &Bson) -> Bson {
    match (total, value) {
        (Bson::Int32(a), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(v) => Bson::Int32(v),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        _ => match (as_i64(total), as_i64(value)) {
            (Some(a), Some(b)) => match a.checked_add(b) {
                Some(v) => Bson::Int64(v),
                #[allow(clippy::cast_precision_loss)]
                None => Bson::Double(a as f64 + b as f64),
            },
            _ => Bson::Double(as_f64(total).unwrap_or(0.0) + as_f64(value).unwrap_or(0.0)),
        },
    }
}

/// Key used to bucket group ids; numerically equal ids share a bucket
fn group_key(id: &Bson) -> String {
    match as_f64(id) {
        Some(n) => format!("n:{}", n),
        None => format!("{:?}", id),
    }
}

struct Group {
    id: Bson,
    accumulators: Vec<(String, Accumulator)>,
}

/// Groups are emitted in the order their first member was seen
fn group(docs: &[Document], spec: &Document) -> Result<Vec<Document>, EvalError> {
    let id_expr = spec.get("_id").ok_or_else(|| EvalError::BadArgument {
        op: "$group",
        reason: "a group specification must include an _id".to_string(),
    })?;

    let mut fields = Vec::new();
    for (name, acc) in spec.iter().filter(|(name, _)| name.as_str() != "_id") {
        let Bson::Document(acc) = acc else {
            return Err(EvalError::BadArgument {
                op: "$group",
                reason: format!("field {} must be an accumulator object", name),
            });
        };
        let mut entries = acc.iter();
        let (Some((op, expr)), None) = (entries.next(), entries.next()) else {
            return Err(EvalError::BadArgument {
                op: "$group",
                reason: format!("field {} must name exactly one accumulator", name),
            });
        };
        Accumulator::new(op)?;
        fields.push((name.clone(), op.clone(), expr));
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for doc in docs {
        let id = evaluate(id_expr, doc)?;
        let key = group_key(&id);
        let slot = match index.get(&key).copied() {
            Some(slot) => slot,
            None => {
                let accumulators = fields
                    .iter()
                    .map(|(name, op, _)| Ok((name.clone(), Accumulator::new(op)?)))
                    .collect::<Result<Vec<_>, EvalError>>()?;
                index.insert(key, groups.len());
                groups.push(Group { id, accumulators });
                groups.len() - 1
            }
        };

        for ((_, _, expr), (_, acc)) in fields.iter().zip(groups[slot].accumulators.iter_mut()) {
            acc.add(evaluate(expr, doc)?);
        }
    }

    Ok(groups
        .into_iter()
        .map(|g| {
            let mut out = Document::new();
            out.insert("_id", g.id);
            for (name, acc) in g.accumulators {
                out.insert(name, acc.finish());
            }
            out
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn books() -> Vec<Document> {
        vec![
            doc! { "title": "A", "author": "Lee", "genre": "Fiction", "price": 10.0, "published_year": 1960 },
            doc! { "title": "B", "author": "Orwell", "genre": "Dystopian", "price": 11.0, "published_year": 1949 },
            doc! { "title": "C", "author": "Lee", "genre": "Fiction", "price": 14.0, "published_year": 1961 },
            doc! { "title": "D", "author": "Austen", "genre": "Romance", "price": 9.0, "published_year": 1813 },
        ]
    }

    #[test]
    fn test_group_avg_and_count() {
        let pipeline = vec![
            doc! { "$group": { "_id": "$genre", "averagePrice": { "$avg": "$price" }, "totalBooks": { "$sum": 1 } } },
            doc! { "$sort": { "averagePrice": -1 } },
        ];
        let out = run(books(), &pipeline).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].get_str("_id").unwrap(), "Fiction");
        assert!((out[0].get_f64("averagePrice").unwrap() - 12.0).abs() < 1e-9);
        assert_eq!(out[0].get_i32("totalBooks").unwrap(), 2);
        assert_eq!(out[2].get_str("_id").unwrap(), "Romance");
    }

    #[test]
    fn test_group_push_by_decade() {
        let pipeline = vec![
            doc! { "$project": {
                "title": 1,
                "decade": { "$subtract": ["$published_year", { "$mod": ["$published_year", 10] }] },
            } },
            doc! { "$group": { "_id": "$decade", "bookCount": { "$sum": 1 }, "books": { "$push": "$title" } } },
            doc! { "$sort": { "_id": 1 } },
        ];
        let out = run(books(), &pipeline).unwrap();
        let decades: Vec<i32> = out.iter().map(|d| d.get_i32("_id").unwrap()).collect();
        assert_eq!(decades, vec![1810, 1940, 1960]);
        let sixties = out[2].get_array("books").unwrap();
        assert_eq!(sixties, &vec![Bson::String("A".into()), Bson::String("C".into())]);
    }

    #[test]
    fn test_match_limit_skip() {
        let pipeline = vec![
            doc! { "$match": { "price": { "$gt": 9.5 } } },
            doc! { "$skip": 1 },
            doc! { "$limit": 1 },
        ];
        let out = run(books(), &pipeline).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_str("title").unwrap(), "B");
    }

    #[test]
    fn test_min_max_first() {
        let pipeline = vec![doc! { "$group": {
            "_id": null,
            "cheapest": { "$min": "$price" },
            "dearest": { "$max": "$price" },
            "first": { "$first": "$title" },
        } }];
        let out = run(books(), &pipeline).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_f64("cheapest").unwrap(), 9.0);
        assert_eq!(out[0].get_f64("dearest").unwrap(), 14.0);
        assert_eq!(out[0].get_str("first").unwrap(), "A");
    }

    #[test]
    fn test_sum_of_doubles() {
        let pipeline = vec![doc! { "$group": { "_id": "$author", "spent": { "$sum": "$price" } } }];
        let out = run(books(), &pipeline).unwrap();
        assert_eq!(out[0].get_str("_id").unwrap(), "Lee");
        assert_eq!(out[0].get_f64("spent").unwrap(), 24.0);
    }

    #[test]
    fn test_unknown_stage_and_accumulator() {
        assert!(matches!(
            run(books(), &[doc! { "$lookup": {} }]),
            Err(EvalError::UnknownStage(_))
        ));
        assert!(matches!(
            run(books(), &[doc! { "$group": { "_id": "$genre", "x": { "$median": "$price" } } }]),
            Err(EvalError::UnknownOperator(_))
        ));
        assert!(run(books(), &[doc! { "$limit": 0 }]).is_err());
    }

    #[test]
    fn test_group_requires_id() {
        assert!(run(books(), &[doc! { "$group": { "n": { "$sum": 1 } } }]).is_err());
    }
}
