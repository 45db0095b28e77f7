//! Membership trace resolver.
//!
//! Walks the membership graph from a target group down to the records that
//! explain why a subject belongs to it, producing a tree of [`TraceNode`]s.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::{join, join_all, try_join};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{DomainError, DomainResult};
use crate::model::{CompositeOperator, Group, GroupCompositeInfo, MembershipRecord, MembershipType};

use super::config::ResolverConfig;
use super::context::TraversalContext;
use super::traits::DirectoryClient;
use super::types::{TraceGroup, TraceNode, TraceOptions, TraceResult};

/// Type alias for boxed future to handle async recursion.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The subject being traced, threaded through every branch.
#[derive(Debug, Clone, Copy)]
struct TraceSubject<'a> {
    id: &'a str,
    source_id: Option<&'a str>,
}

/// Membership trace resolver.
///
/// Holds no state across calls: every [`trace`](Self::trace) allocates its
/// own visited set and discards it when the result is returned.
pub struct MembershipTracer<D: ?Sized> {
    directory: Arc<D>,
    config: ResolverConfig,
}

impl<D> MembershipTracer<D>
where
    D: DirectoryClient + ?Sized + 'static,
{
    /// Creates a new tracer with default configuration.
    pub fn new(directory: Arc<D>) -> Self {
        Self {
            directory,
            config: ResolverConfig::default(),
        }
    }

    /// Creates a new tracer with custom configuration.
    pub fn with_config(directory: Arc<D>, config: ResolverConfig) -> Self {
        Self { directory, config }
    }

    /// Returns the resolver configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Traces how `subject_id` is a member of `target_group_name`.
    ///
    /// A failure of the initial lookup propagates to the caller. Failures
    /// while resolving sub-branches are logged and leave a gap in the tree.
    /// The whole trace is bounded by the configured timeout and by the
    /// optional cancellation token in `options`.
    #[instrument(skip(self, options))]
    pub async fn trace(
        &self,
        subject_id: &str,
        target_group_name: &str,
        options: &TraceOptions,
    ) -> DomainResult<TraceResult> {
        self.validate(subject_id, target_group_name)?;

        let max_depth = self.config.effective_max_depth(options.max_depth);
        debug!(max_depth, "Starting membership trace");

        let bounded = async {
            match timeout(
                self.config.timeout,
                self.run_trace(subject_id, target_group_name, options, max_depth),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(DomainError::Timeout {
                    duration_ms: self.config.timeout_ms(),
                }),
            }
        };

        match options.cancellation.as_ref() {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(DomainError::Cancelled),
                    result = bounded => result,
                }
            }
            None => bounded.await,
        }
    }

    fn validate(&self, subject_id: &str, target_group_name: &str) -> DomainResult<()> {
        if subject_id.trim().is_empty() {
            return Err(DomainError::InvalidSubject {
                value: subject_id.to_string(),
            });
        }
        if target_group_name.trim().is_empty() {
            return Err(DomainError::InvalidGroupName {
                value: target_group_name.to_string(),
            });
        }
        Ok(())
    }

    async fn run_trace(
        &self,
        subject_id: &str,
        target_group_name: &str,
        options: &TraceOptions,
        max_depth: u32,
    ) -> DomainResult<TraceResult> {
        let subject = TraceSubject {
            id: subject_id,
            source_id: options.subject_source_id.as_deref(),
        };

        let details = self
            .directory
            .get_membership_details(subject.id, target_group_name, subject.source_id)
            .await?;

        let subject_name = details.subjects.first().and_then(|s| s.name.clone());
        let target_display_name = details.groups.first().and_then(|g| g.display_name.clone());

        let Some(record) = details.first_membership().cloned() else {
            return Ok(TraceResult::not_member(
                subject_id,
                subject_name,
                target_group_name,
                target_display_name,
            ));
        };
        let group = details.group_for(&record).cloned();

        let ctx = TraversalContext::new(max_depth);
        let paths = self
            .expand(subject, target_group_name.to_string(), record, group, ctx)
            .await?;

        Ok(TraceResult::member(
            subject_id,
            subject_name,
            target_group_name,
            target_display_name,
            paths,
        ))
    }

    /// Expands one membership record into trace nodes (boxed for recursion).
    fn expand<'a>(
        &'a self,
        subject: TraceSubject<'a>,
        group_name: String,
        record: MembershipRecord,
        group: Option<Group>,
        ctx: TraversalContext,
    ) -> BoxFuture<'a, DomainResult<Vec<TraceNode>>> {
        Box::pin(async move {
            let label = TraceGroup::from_metadata(&group_name, group.as_ref());

            // Depth is checked before the visited set so a pruned group stays
            // unmarked for shallower branches.
            if ctx.depth_exceeded() {
                info!(group_name = %group_name, depth = ctx.depth, "Max depth reached during trace");
                return Ok(vec![TraceNode::MaxDepthReached {
                    group: label,
                    depth: ctx.depth,
                }]);
            }

            if !ctx.mark_visited(&group_name) {
                info!(group_name = %group_name, depth = ctx.depth, "Cycle detected during trace");
                return Ok(vec![TraceNode::CycleDetected {
                    group: label,
                    depth: ctx.depth,
                }]);
            }

            let node = match record.membership_type {
                MembershipType::Immediate => TraceNode::Immediate {
                    group: label,
                    depth: ctx.depth,
                },
                MembershipType::Composite => {
                    let composite = group.and_then(|g| g.composite);
                    self.expand_composite(subject, label, composite, ctx).await
                }
                MembershipType::Effective => {
                    self.expand_effective(subject, &group_name, label, ctx)
                        .await?
                }
                MembershipType::Other(raw_type) => {
                    info!(
                        membership_type = %raw_type,
                        group_name = %group_name,
                        "Unknown membership type"
                    );
                    TraceNode::Unknown {
                        group: label,
                        depth: ctx.depth,
                        raw_type,
                    }
                }
            };

            Ok(vec![node])
        })
    }

    /// Resolves the factor groups of a composite membership.
    ///
    /// - INTERSECTION traces both factors concurrently.
    /// - UNION traces the left factor and only falls back to the right one
    ///   when the left yields nothing.
    /// - COMPLEMENT traces the left factor only; exclusion from the right
    ///   factor is taken from the directory's own classification.
    ///
    /// Missing operator or factor names produce a node with an empty `via`.
    async fn expand_composite(
        &self,
        subject: TraceSubject<'_>,
        group: TraceGroup,
        composite: Option<GroupCompositeInfo>,
        ctx: TraversalContext,
    ) -> TraceNode {
        let composite = composite.unwrap_or_default();
        let operator = composite.operator;
        let left_group = composite.left_name().map(str::to_string);
        let right_group = composite.right_name().map(str::to_string);

        debug!(
            group_name = %group.name,
            composite_type = ?operator,
            left_group = ?left_group,
            right_group = ?right_group,
            "Processing composite membership"
        );

        let child_ctx = ctx.increment_depth();
        let via = match (operator, left_group.as_deref(), right_group.as_deref()) {
            (Some(CompositeOperator::Intersection), Some(left), Some(right)) => {
                let (left_paths, right_paths) = join(
                    self.trace_to_group(subject, left.to_string(), child_ctx.clone()),
                    self.trace_to_group(subject, right.to_string(), child_ctx),
                )
                .await;
                left_paths.into_iter().chain(right_paths).collect()
            }
            (Some(CompositeOperator::Union), Some(left), right) => {
                let left_paths = self
                    .trace_to_group(subject, left.to_string(), child_ctx.clone())
                    .await;
                if !left_paths.is_empty() {
                    left_paths
                } else if let Some(right) = right {
                    self.trace_to_group(subject, right.to_string(), child_ctx)
                        .await
                } else {
                    Vec::new()
                }
            }
            (Some(CompositeOperator::Complement), Some(left), _) => {
                self.trace_to_group(subject, left.to_string(), child_ctx)
                    .await
            }
            _ => {
                warn!(
                    group_name = %group.name,
                    "Composite metadata incomplete, no factor groups traced"
                );
                Vec::new()
            }
        };

        TraceNode::Composite {
            group,
            depth: ctx.depth,
            operator,
            left_group,
            right_group,
            via,
        }
    }

    /// Reconstructs an effective membership through intermediate groups.
    ///
    /// Candidates are the group-typed direct members of `group_name` that the
    /// subject is itself a member of (by any recognized membership type).
    async fn expand_effective(
        &self,
        subject: TraceSubject<'_>,
        group_name: &str,
        group: TraceGroup,
        ctx: TraversalContext,
    ) -> DomainResult<TraceNode> {
        debug!(group_name = %group_name, "Processing effective membership");

        let (subject_memberships, group_members) = try_join(
            self.directory
                .get_subject_direct_memberships(subject.id, subject.source_id),
            self.directory.get_group_direct_members(group_name),
        )
        .await?;

        // uuid -> name of every group the subject belongs to
        let subject_groups: HashMap<&str, &str> = subject_memberships
            .iter()
            .filter(|m| m.membership_type.is_known() && !m.group_name.is_empty())
            .filter_map(|m| {
                m.group_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .map(|id| (id, m.group_name.as_str()))
            })
            .collect();

        let mut seen = HashSet::new();
        let candidates: Vec<String> = group_members
            .iter()
            .filter(|member| member.is_group())
            .filter_map(|member| subject_groups.get(member.id.as_str()).copied())
            .filter(|name| seen.insert(*name))
            .map(str::to_string)
            .collect();

        if candidates.is_empty() {
            info!(
                group_name = %group_name,
                subject_id = %subject.id,
                "No intermediate groups found for effective membership"
            );
            return Ok(TraceNode::Effective {
                group,
                depth: ctx.depth,
                via: Vec::new(),
            });
        }

        let child_ctx = ctx.increment_depth();
        let traces = join_all(
            candidates
                .into_iter()
                .map(|name| self.trace_to_group(subject, name, child_ctx.clone())),
        )
        .await;

        Ok(TraceNode::Effective {
            group,
            depth: ctx.depth,
            via: traces.into_iter().flatten().collect(),
        })
    }

    /// Traces the subject against one sub-branch group.
    ///
    /// Never fails: a non-member yields no nodes, and lookup failures are
    /// logged and contained so one bad branch cannot abort the whole trace.
    async fn trace_to_group(
        &self,
        subject: TraceSubject<'_>,
        group_name: String,
        ctx: TraversalContext,
    ) -> Vec<TraceNode> {
        let details = match self
            .directory
            .get_membership_details(subject.id, &group_name, subject.source_id)
            .await
        {
            Ok(details) => details,
            Err(e) => {
                let err = DomainError::branch(&group_name, &e);
                warn!(error = %err, "Error tracing to group");
                return Vec::new();
            }
        };

        let Some(record) = details.first_membership().cloned() else {
            return Vec::new();
        };
        let group = details.group_for(&record).cloned();

        match self
            .expand(subject, group_name.clone(), record, group, ctx)
            .await
        {
            Ok(nodes) => nodes,
            Err(e) => {
                let err = DomainError::branch(&group_name, &e);
                warn!(error = %err, "Error tracing to group");
                Vec::new()
            }
        }
    }
}
