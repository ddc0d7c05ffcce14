//! Multi-key stable ordering.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use kubeset_core::{FieldValue, Record, Scalar};
use smallvec::SmallVec;

use crate::filter::resolve_path;
use crate::predicate::{Path, PATH_DELIMITER};

/// One parsed `order_by` key: `-name` sorts descending on `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub path: Path,
    pub descending: bool,
}

impl OrderKey {
    pub fn parse(spec: &str) -> OrderKey {
        let (descending, field) = match spec.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        OrderKey { path: field.split(PATH_DELIMITER).map(str::to_string).collect(), descending }
    }
}

fn rank(v: &FieldValue) -> u8 {
    match v {
        FieldValue::Scalar(Scalar::Bool(_)) => 0,
        FieldValue::Scalar(Scalar::Int(_)) | FieldValue::Scalar(Scalar::Float(_)) => 1,
        FieldValue::Scalar(Scalar::Timestamp(_)) => 2,
        FieldValue::Scalar(Scalar::Str(_)) | FieldValue::Missing => 3,
        FieldValue::List(_) => 4,
        FieldValue::Map(_) => 5,
    }
}

fn as_f64(s: &Scalar) -> f64 {
    match s {
        Scalar::Int(n) => *n as f64,
        Scalar::Float(x) => *x,
        _ => 0.0,
    }
}

/// Total order used for sorting. Values of different kinds fall back to a
/// fixed type rank; `Missing` sorts as the empty string.
pub fn sort_cmp(a: &FieldValue, b: &FieldValue) -> Ordering {
    use FieldValue::{List, Map, Missing, Scalar as S};
    let (ra, rb) = (rank(a), rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (S(Scalar::Int(x)), S(Scalar::Int(y))) => x.cmp(y),
        (S(x @ (Scalar::Int(_) | Scalar::Float(_))), S(y)) => as_f64(x).total_cmp(&as_f64(y)),
        (S(Scalar::Bool(x)), S(Scalar::Bool(y))) => x.cmp(y),
        (S(Scalar::Timestamp(x)), S(Scalar::Timestamp(y))) => x.cmp(y),
        (List(x), List(y)) => {
            for (p, q) in x.iter().zip(y.iter()) {
                match sort_cmp(p, q) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            x.len().cmp(&y.len())
        }
        (Map(_), Map(_)) => a.render().cmp(&b.render()),
        // strings and Missing share a rank
        _ => {
            let text = |v: &FieldValue| if let Missing = v { String::new() } else { v.render() };
            text(a).cmp(&text(b))
        }
    }
}

/// Sort in place by the given keys. Keys are applied last-to-first as stable
/// sorts, so earlier keys dominate and ties keep their prior order.
pub fn order_records<S: AsRef<str>>(records: &mut Vec<Arc<Record>>, fields: &[S]) {
    if fields.is_empty() {
        return;
    }
    let started = Instant::now();
    let keys: SmallVec<[OrderKey; 4]> = fields.iter().map(|f| OrderKey::parse(f.as_ref())).collect();
    for key in keys.iter().rev() {
        let mut keyed: Vec<(FieldValue, Arc<Record>)> =
            records.drain(..).map(|r| (resolve_path(&r, &key.path), r)).collect();
        keyed.sort_by(|(a, _), (b, _)| {
            let ord = sort_cmp(a, b);
            if key.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        records.extend(keyed.into_iter().map(|(_, r)| r));
    }
    metrics::histogram!("search_order_ms", started.elapsed().as_secs_f64() * 1000.0);
}
