//! kubeset search: in-RAM predicate and ordering engine over records.
//!
//! Everything here is synchronous and works on already-fetched
//! `Arc<Record>` lists; fetching belongs to the store.

#![forbid(unsafe_code)]

pub mod filter;
pub mod order;
pub mod predicate;

pub use filter::{filter_records, matches, resolve_path};
pub use order::{order_records, sort_cmp, OrderKey};
pub use predicate::{Condition, Connector, Lookup, Path, Q, PATH_DELIMITER};
