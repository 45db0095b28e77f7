//! Directory data model.
//!
//! This module contains:
//! - Group identities and composite (set operation) metadata
//! - Subjects and direct group members
//! - Membership records as returned by the directory

mod types;
#[cfg(test)]
mod types_proptest;

pub use types::*;
