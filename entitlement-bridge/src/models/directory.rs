//! Directory records the bridge resolves from the registry.
//!
//! These are per-request projections of registry state; nothing here is
//! cached between events.

use serde::Serialize;

/// A CO person resolved by email plus external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    pub id: i64,
    pub email: String,
    pub external_identifier: String,
}

/// A CO group; `name` is the upstream resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
}
