//! Traits for directory operations needed by the resolver.

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::{GroupMember, MembershipDetails, MembershipRecord};

/// Read-only access to a group directory.
///
/// Every operation is one network round trip in production adapters.
/// Failures should be reported as [`crate::DomainError::DirectoryUnavailable`].
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Looks up the subject's membership in one group.
    ///
    /// Returns zero or one membership record plus the resolved group
    /// metadata, including composite factor information when applicable.
    async fn get_membership_details(
        &self,
        subject_id: &str,
        group_name: &str,
        subject_source_id: Option<&str>,
    ) -> DomainResult<MembershipDetails>;

    /// Lists all of the subject's group memberships (immediate, effective
    /// and composite), each tagged with group uuid and name.
    async fn get_subject_direct_memberships(
        &self,
        subject_id: &str,
        subject_source_id: Option<&str>,
    ) -> DomainResult<Vec<MembershipRecord>>;

    /// Lists the direct members of a group. Group-typed members carry the
    /// group source marker and the member group's uuid as id.
    async fn get_group_direct_members(&self, group_name: &str) -> DomainResult<Vec<GroupMember>>;
}
