//! Evaluate a `Q` tree against a record list.
//!
//! Connectors work on sets, not on single records: AND narrows the input
//! child by child, OR unions what each child keeps from the same input, and
//! NOT keeps what the inner tree rejected. Output always preserves input order.

use std::sync::Arc;
use std::time::Instant;

use kubeset_core::{FieldValue, Record, RecordKey};
use rustc_hash::FxHashSet;

use crate::predicate::{Condition, Connector, Lookup, Q};

/// Walk a path through a record: first an attribute, then nested map keys or list indices.
pub fn resolve_path<S: AsRef<str>>(record: &Record, path: &[S]) -> FieldValue {
    let Some((head, rest)) = path.split_first() else {
        return FieldValue::Missing;
    };
    let mut current = record.attribute(head.as_ref());
    for seg in rest {
        match current.child(seg.as_ref()) {
            Some(next) => current = next.clone(),
            None => return FieldValue::Missing,
        }
    }
    current
}

fn exact(actual: &FieldValue, expected: &FieldValue) -> bool {
    match (actual, expected) {
        // subset: every expected entry must be present and equal
        (FieldValue::Map(a), FieldValue::Map(e)) => {
            e.iter().all(|(k, v)| a.get(k).map(|x| x.loose_eq(v)).unwrap_or(false))
        }
        _ => actual.loose_eq(expected),
    }
}

fn icontains(actual: &FieldValue, expected: &FieldValue) -> bool {
    let needle = expected.render().to_lowercase();
    match actual {
        FieldValue::Missing => false,
        FieldValue::Map(m) => m.values().any(|v| v.render().to_lowercase().contains(&needle)),
        other => other.render().to_lowercase().contains(&needle),
    }
}

fn within(actual: &FieldValue, expected: &FieldValue) -> bool {
    match expected {
        FieldValue::List(options) => options.iter().any(|o| actual.loose_eq(o)),
        single => actual.loose_eq(single),
    }
}

/// Whether one record satisfies one leaf condition.
pub fn matches(record: &Record, cond: &Condition) -> bool {
    let actual = resolve_path(record, &cond.path);
    let expected = &cond.value;
    match &cond.lookup {
        Lookup::Exact => exact(&actual, expected),
        Lookup::IContains => icontains(&actual, expected),
        _ if actual.is_missing() => false,
        Lookup::StartsWith => actual.render().starts_with(&expected.render()),
        Lookup::Gt => actual.compare(expected) == Some(std::cmp::Ordering::Greater),
        Lookup::Lt => actual.compare(expected) == Some(std::cmp::Ordering::Less),
        Lookup::In => within(&actual, expected),
        Lookup::Unknown(_) => false,
    }
}

fn keys(records: &[Arc<Record>]) -> FxHashSet<RecordKey> {
    records.iter().map(|r| r.identity()).collect()
}

fn eval(q: &Q, input: &[Arc<Record>]) -> Vec<Arc<Record>> {
    match q {
        Q::Leaf(cond) => input.iter().filter(|r| matches(r, cond)).cloned().collect(),
        Q::Node { connector, children, negated } => {
            let kept = match connector {
                _ if children.is_empty() => input.to_vec(),
                Connector::And => {
                    let mut current = input.to_vec();
                    for child in children {
                        current = eval(child, &current);
                    }
                    current
                }
                Connector::Or => {
                    let mut hit: FxHashSet<RecordKey> = FxHashSet::default();
                    for child in children {
                        hit.extend(eval(child, input).iter().map(|r| r.identity()));
                    }
                    let mut seen: FxHashSet<RecordKey> = FxHashSet::default();
                    input
                        .iter()
                        .filter(|r| {
                            let k = r.identity();
                            hit.contains(&k) && seen.insert(k)
                        })
                        .cloned()
                        .collect()
                }
            };
            if *negated {
                let rejected = keys(&kept);
                input.iter().filter(|r| !rejected.contains(&r.identity())).cloned().collect()
            } else {
                kept
            }
        }
    }
}

/// Records of `input` selected by `q`, in input order.
pub fn filter_records(q: &Q, input: &[Arc<Record>]) -> Vec<Arc<Record>> {
    let started = Instant::now();
    let out = eval(q, input);
    metrics::histogram!("search_filter_ms", started.elapsed().as_secs_f64() * 1000.0);
    tracing::debug!(predicate = %q, input = input.len(), kept = out.len(), "filter");
    out
}
