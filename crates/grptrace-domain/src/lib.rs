//! grptrace-domain: Core membership tracing logic
//!
//! This crate contains the part of grptrace with real algorithmic content:
//! - Directory data model (groups, subjects, membership records)
//! - The `DirectoryClient` trait the resolver consumes
//! - The membership trace resolver and its trace tree
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               grptrace-domain                │
//! ├─────────────────────────────────────────────┤
//! │  model/    - Groups, subjects, memberships  │
//! │  resolver/ - Membership trace resolution    │
//! │  error.rs  - Domain error taxonomy          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod model;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use resolver::{
    DirectoryClient, MembershipTracer, ResolverConfig, TraceGroup, TraceNode, TraceOptions,
    TraceResult,
};
