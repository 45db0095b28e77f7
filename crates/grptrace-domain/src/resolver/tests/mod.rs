//! Tests for the membership trace resolver.
//!
//! Organized by functionality:
//! - Top-level lookup (non-members, validation, failures)
//! - Immediate and unknown memberships
//! - Composite memberships (union, intersection, complement)
//! - Effective memberships (intermediate group discovery)
//! - Safety features (cycle detection, depth limiting, timeouts, cancellation)
