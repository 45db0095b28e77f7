//! Internal traversal context for the membership tracer.

use std::sync::Arc;

use dashmap::DashSet;

/// Internal context for one top-level trace.
///
/// The visited set is shared by every branch of the trace, including
/// siblings explored concurrently. Marking a group is a single atomic
/// insert, so two racing branches can never both claim the same group.
#[derive(Debug, Clone)]
pub(crate) struct TraversalContext {
    /// Current traversal depth.
    pub(crate) depth: u32,
    /// Depth bound for this trace.
    pub(crate) max_depth: u32,
    /// Group names already entered during this trace.
    visited: Arc<DashSet<String>>,
}

impl TraversalContext {
    pub(crate) fn new(max_depth: u32) -> Self {
        Self {
            depth: 0,
            max_depth,
            visited: Arc::new(DashSet::new()),
        }
    }

    pub(crate) fn increment_depth(&self) -> Self {
        Self {
            depth: self.depth + 1,
            max_depth: self.max_depth,
            visited: Arc::clone(&self.visited),
        }
    }

    pub(crate) fn depth_exceeded(&self) -> bool {
        self.depth >= self.max_depth
    }

    /// Marks `group_name` as visited. Returns false if it already was.
    pub(crate) fn mark_visited(&self, group_name: &str) -> bool {
        self.visited.insert(group_name.to_string())
    }
}
