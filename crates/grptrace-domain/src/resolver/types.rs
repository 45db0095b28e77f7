//! Types for the membership trace resolver.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::model::{CompositeOperator, Group};

/// Options for a single trace.
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    /// Disambiguates the subject across federated subject sources.
    pub subject_source_id: Option<String>,
    /// Requested depth bound. Missing or zero uses the resolver default;
    /// anything above the absolute ceiling is clamped.
    pub max_depth: Option<u32>,
    /// Cancels the trace and every outstanding branch when fired.
    pub cancellation: Option<CancellationToken>,
}

impl TraceOptions {
    /// Creates options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject source id.
    pub fn with_subject_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.subject_source_id = Some(source_id.into());
        self
    }

    /// Sets the requested depth bound.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Label of the group a trace node refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TraceGroup {
    /// Creates a label from a group name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
        }
    }

    /// Creates a label enriched with the directory's group metadata.
    pub fn from_metadata(name: &str, group: Option<&Group>) -> Self {
        Self {
            name: name.to_string(),
            display_name: group.and_then(|g| g.display_name.clone()),
            description: group.and_then(|g| g.description.clone()),
        }
    }
}

/// One node of a membership trace tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceNode {
    /// The subject is a direct member of `group`.
    Immediate { group: TraceGroup, depth: u32 },
    /// The subject reaches `group` through the intermediate groups in `via`.
    Effective {
        group: TraceGroup,
        depth: u32,
        via: Vec<TraceNode>,
    },
    /// Membership derives from `operator` applied to two factor groups.
    ///
    /// `via` holds the left factor for COMPLEMENT, the first satisfied
    /// factor for UNION and both factors for INTERSECTION.
    Composite {
        group: TraceGroup,
        depth: u32,
        operator: Option<CompositeOperator>,
        left_group: Option<String>,
        right_group: Option<String>,
        via: Vec<TraceNode>,
    },
    /// `group` was already entered during this trace; traversal pruned.
    CycleDetected { group: TraceGroup, depth: u32 },
    /// The depth bound was hit at `group`; traversal pruned.
    MaxDepthReached { group: TraceGroup, depth: u32 },
    /// The directory returned a membership type the resolver cannot expand.
    Unknown {
        group: TraceGroup,
        depth: u32,
        raw_type: String,
    },
}

impl TraceNode {
    /// Returns the group label of this node.
    pub fn group(&self) -> &TraceGroup {
        match self {
            TraceNode::Immediate { group, .. }
            | TraceNode::Effective { group, .. }
            | TraceNode::Composite { group, .. }
            | TraceNode::CycleDetected { group, .. }
            | TraceNode::MaxDepthReached { group, .. }
            | TraceNode::Unknown { group, .. } => group,
        }
    }

    /// Returns the name of the group this node refers to.
    pub fn group_name(&self) -> &str {
        &self.group().name
    }

    /// Returns the depth of this node in the trace.
    pub fn depth(&self) -> u32 {
        match self {
            TraceNode::Immediate { depth, .. }
            | TraceNode::Effective { depth, .. }
            | TraceNode::Composite { depth, .. }
            | TraceNode::CycleDetected { depth, .. }
            | TraceNode::MaxDepthReached { depth, .. }
            | TraceNode::Unknown { depth, .. } => *depth,
        }
    }

    /// Returns the sub-traces below this node (empty for terminal nodes).
    pub fn via(&self) -> &[TraceNode] {
        match self {
            TraceNode::Effective { via, .. } | TraceNode::Composite { via, .. } => via,
            _ => &[],
        }
    }

    /// Visits this node and all of its descendants in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a TraceNode)) {
        visit(self);
        for child in self.via() {
            child.walk(visit);
        }
    }
}

/// Result of tracing a subject's membership in a target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceResult {
    pub subject_id: String,
    pub subject_name: Option<String>,
    pub target_group_name: String,
    pub target_group_display_name: Option<String>,
    pub is_member: bool,
    /// Empty when the subject is not a member.
    pub paths: Vec<TraceNode>,
    /// Group names of every `CycleDetected` node in the tree.
    pub cycles: Vec<String>,
    /// True if any node in the tree is `MaxDepthReached`.
    pub max_depth_reached: bool,
}

impl TraceResult {
    /// Builds a negative result.
    pub(crate) fn not_member(
        subject_id: &str,
        subject_name: Option<String>,
        target_group_name: &str,
        target_group_display_name: Option<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            subject_name,
            target_group_name: target_group_name.to_string(),
            target_group_display_name,
            is_member: false,
            paths: Vec::new(),
            cycles: Vec::new(),
            max_depth_reached: false,
        }
    }

    /// Builds a positive result, deriving `cycles` and `max_depth_reached`
    /// from the tree.
    pub(crate) fn member(
        subject_id: &str,
        subject_name: Option<String>,
        target_group_name: &str,
        target_group_display_name: Option<String>,
        paths: Vec<TraceNode>,
    ) -> Self {
        let mut cycles = Vec::new();
        let mut max_depth_reached = false;
        for root in &paths {
            root.walk(&mut |node| match node {
                TraceNode::CycleDetected { group, .. } => cycles.push(group.name.clone()),
                TraceNode::MaxDepthReached { .. } => max_depth_reached = true,
                _ => {}
            });
        }

        Self {
            subject_id: subject_id.to_string(),
            subject_name,
            target_group_name: target_group_name.to_string(),
            target_group_display_name,
            is_member: true,
            paths,
            cycles,
            max_depth_reached,
        }
    }

    /// Returns the total number of nodes in the trace tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        for root in &self.paths {
            root.walk(&mut |_| count += 1);
        }
        count
    }
}
