//! Membership trace resolver.
//!
//! The resolver walks the group directory to explain whether and how a
//! subject is a member of a target group.
//!
//! # Architecture Decisions
//!
//! - **Concurrent Branches**: INTERSECTION factors and the candidate groups
//!   of an effective membership are resolved concurrently with
//!   `futures::future::join` / `join_all`. UNION is resolved left first and
//!   short-circuits, so the right factor is only queried when needed.
//!
//! - **Cycle Detection**: One visited set per trace, shared by every branch
//!   through `Arc<DashSet>`. The check-and-mark is a single atomic insert,
//!   so racing siblings cannot both enter the same group.
//!
//! - **Depth Limiting**: Default depth 10, absolute ceiling 20. The depth
//!   bound alone guarantees termination.
//!
//! - **Failure Containment**: Lookups for sub-branches that fail are logged
//!   and contribute no sub-trace. Only the top-level lookup is fatal.
//!
//! - **Timeout and Cancellation**: The whole trace runs under a configurable
//!   timeout (default 30s) and an optional cancellation token. Branches are
//!   plain futures, so dropping the trace drops every outstanding lookup.

mod config;
mod context;
mod tracer;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::{ResolverConfig, ABSOLUTE_MAX_DEPTH, DEFAULT_MAX_DEPTH};
pub use tracer::MembershipTracer;
pub use traits::DirectoryClient;
pub use types::{TraceGroup, TraceNode, TraceOptions, TraceResult};
