//! Composable predicates (`Q`) over record attributes.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use kubeset_core::FieldValue;
use smallvec::SmallVec;
use tracing::warn;

/// Separator between path segments and before a trailing lookup name.
pub const PATH_DELIMITER: &str = "__";

pub type Path = SmallVec<[String; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Exact,
    IContains,
    StartsWith,
    Gt,
    Lt,
    In,
    /// Never matches.
    Unknown(String),
}

impl Lookup {
    /// Recognized lookup names only.
    pub fn parse(name: &str) -> Option<Lookup> {
        Some(match name {
            "exact" => Lookup::Exact,
            "icontains" => Lookup::IContains,
            "startswith" => Lookup::StartsWith,
            "gt" => Lookup::Gt,
            "lt" => Lookup::Lt,
            "in" => Lookup::In,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Lookup::Exact => "exact",
            Lookup::IContains => "icontains",
            Lookup::StartsWith => "startswith",
            Lookup::Gt => "gt",
            Lookup::Lt => "lt",
            Lookup::In => "in",
            Lookup::Unknown(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: Path,
    pub lookup: Lookup,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    Leaf(Condition),
    Node { connector: Connector, children: Vec<Q>, negated: bool },
}

impl Q {
    /// `Q::new("spec__replicas__gt", 2)`. The trailing segment is taken as the
    /// lookup only when it names one; otherwise the whole key is the path and
    /// the lookup is `exact`.
    pub fn new(key: &str, value: impl Into<FieldValue>) -> Q {
        let mut path: Path = key.split(PATH_DELIMITER).map(str::to_string).collect();
        let lookup = match path.last().and_then(|s| Lookup::parse(s)) {
            Some(l) if path.len() > 1 => {
                path.pop();
                l
            }
            _ => Lookup::Exact,
        };
        Q::Leaf(Condition { path, lookup, value: value.into() })
    }

    /// Explicit lookup name; an unrecognized one yields a predicate that matches nothing.
    pub fn with_lookup(path: &str, lookup: &str, value: impl Into<FieldValue>) -> Q {
        let lookup = Lookup::parse(lookup).unwrap_or_else(|| {
            warn!(%path, %lookup, "unknown lookup; predicate matches nothing");
            Lookup::Unknown(lookup.to_string())
        });
        let path: Path = path.split(PATH_DELIMITER).map(str::to_string).collect();
        Q::Leaf(Condition { path, lookup, value: value.into() })
    }

    /// AND of keyword pairs, like `filter(name="a", namespace="b")`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Q
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<FieldValue>,
    {
        Q::and(pairs.into_iter().map(|(k, v)| Q::new(k.as_ref(), v)))
    }

    pub fn and(children: impl IntoIterator<Item = Q>) -> Q {
        Q::Node { connector: Connector::And, children: children.into_iter().collect(), negated: false }
    }

    pub fn or(children: impl IntoIterator<Item = Q>) -> Q {
        Q::Node { connector: Connector::Or, children: children.into_iter().collect(), negated: false }
    }

    /// Empty conjunction; keeps every record.
    pub fn all() -> Q {
        Q::and(Vec::new())
    }

    fn combine(self, other: Q, connector: Connector) -> Q {
        match self {
            Q::Node { connector: c, mut children, negated: false } if c == connector => {
                children.push(other);
                Q::Node { connector, children, negated: false }
            }
            lhs => Q::Node { connector, children: vec![lhs, other], negated: false },
        }
    }
}

impl BitAnd for Q {
    type Output = Q;
    fn bitand(self, rhs: Q) -> Q {
        self.combine(rhs, Connector::And)
    }
}

impl BitOr for Q {
    type Output = Q;
    fn bitor(self, rhs: Q) -> Q {
        self.combine(rhs, Connector::Or)
    }
}

impl Not for Q {
    type Output = Q;
    fn not(self) -> Q {
        match self {
            Q::Node { connector, children, negated } => Q::Node { connector, children, negated: !negated },
            leaf => Q::Node { connector: Connector::And, children: vec![leaf], negated: true },
        }
    }
}

impl fmt::Display for Q {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Q::Leaf(c) => write!(f, "{}__{}={}", c.path.join(PATH_DELIMITER), c.lookup.as_str(), c.value.to_json()),
            Q::Node { connector, children, negated } => {
                if *negated {
                    f.write_str("NOT ")?;
                }
                let sep = match connector {
                    Connector::And => " AND ",
                    Connector::Or => " OR ",
                };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}
