//! grptrace-directory: Group directory backends
//!
//! This crate provides the [`DirectoryClient`](grptrace_domain::DirectoryClient)
//! implementations used by the membership trace resolver:
//! - In-memory directory for fixtures and testing
//! - Grouper Web Services REST client for production
//!
//! Both also implement [`DirectoryLookup`] for member listings and subject
//! lookups.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │             grptrace-directory               │
//! ├──────────────────────────────────────────────┤
//! │  memory.rs   - In-memory directory + fixture │
//! │  grouper/    - Grouper WS REST client        │
//! │  lookup.rs   - Member and subject lookups    │
//! │  error.rs    - Directory error types         │
//! └──────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod grouper;
pub mod lookup;
pub mod memory;

// Re-export commonly used types
pub use error::{DirectoryError, DirectoryResult};
pub use grouper::{GrouperClient, GrouperConfig};
pub use lookup::{DirectoryLookup, MemberFilter, SubjectKey, SubjectLookup};
pub use memory::{DirectoryFixture, MemoryDirectory};
