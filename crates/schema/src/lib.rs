//! kubeset schema: capability document cache, field synthesis and kind declaration.
//!
//! A kind is declared once from a [`KindDeclaration`]; its dynamic fields are
//! synthesized from the cluster's `/openapi/v2` document and memoized in a
//! [`KindRegistry`] keyed by `group/version/kind`.

#![forbid(unsafe_code)]

pub mod cache;
pub mod fields;
pub mod kind;

pub use cache::{schema_key, SchemaCache, DEFAULT_TTL};
pub use fields::{field_for_property, synthesize_fields};
pub use kind::{is_valid_group, Kind, KindDeclaration, KindRegistry};
