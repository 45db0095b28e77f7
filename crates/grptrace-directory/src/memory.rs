//! In-memory group directory for fixtures and testing.
//!
//! Membership is computed on read, the way Grouper classifies it:
//!
//! - **Immediate**: the subject was added to the group directly
//! - **Composite**: the group is composite and its operator is satisfied by
//!   the subject's membership in the two factor groups
//! - **Effective**: the subject is a member (of any kind) of a nested group
//!
//! Evaluation tracks the groups on the current path, so nesting cycles
//! terminate instead of recursing forever.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use grptrace_domain::model::{
    CompositeOperator, Group, GroupCompositeInfo, GroupMember, MembershipDetails,
    MembershipRecord, MembershipType, Subject, GROUP_SOURCE_ID,
};
use grptrace_domain::{DirectoryClient, DomainResult};

use crate::error::{DirectoryError, DirectoryResult};
use crate::lookup::{DirectoryLookup, MemberFilter, SubjectKey, SubjectLookup};

/// In-memory implementation of [`DirectoryClient`].
///
/// Uses DashMap for thread-safe concurrent access. Guards are never held
/// across recursive evaluation; every lookup clones what it needs first.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    /// Groups keyed by name.
    groups: DashMap<String, Group>,
    names_by_uuid: DashMap<String, String>,
    /// Registered subjects keyed by subject id.
    subjects: DashMap<String, Subject>,
    /// Group name -> subject ids added directly, in insertion order.
    direct_subjects: DashMap<String, Vec<String>>,
    /// Group name -> names of nested member groups, in insertion order.
    child_groups: DashMap<String, Vec<String>>,
    next_uuid: AtomicU64,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from a parsed fixture.
    pub fn from_fixture(fixture: &DirectoryFixture) -> DirectoryResult<Self> {
        let directory = Self::new();

        for subject in &fixture.subjects {
            let mut registered = Subject::new(&subject.id);
            registered.source_id = subject.source_id.clone();
            registered.name = subject.name.clone();
            registered.identifier = subject.identifier.clone();
            directory.add_subject(registered);
        }

        // Groups first so every reference below resolves
        for entry in &fixture.groups {
            let mut group = Group::new(&entry.name);
            group.uuid = entry.uuid.clone();
            group.display_name = entry.display_name.clone();
            group.description = entry.description.clone();
            directory.add_group(group);
        }

        for entry in &fixture.groups {
            if let Some(composite) = &entry.composite {
                directory
                    .add_composite_group(
                        &entry.name,
                        composite.operator,
                        &composite.left,
                        &composite.right,
                    )
                    .map_err(|e| fixture_error(&entry.name, e))?;
            }
            for subject_id in &entry.members {
                directory
                    .add_member(&entry.name, subject_id)
                    .map_err(|e| fixture_error(&entry.name, e))?;
            }
            for child in &entry.groups {
                directory
                    .add_group_member(&entry.name, child)
                    .map_err(|e| fixture_error(&entry.name, e))?;
            }
        }

        debug!(
            groups = fixture.groups.len(),
            subjects = directory.subjects.len(),
            "Loaded directory fixture"
        );
        Ok(directory)
    }

    /// Reads a YAML or JSON fixture file and builds a directory from it.
    pub fn load(path: impl AsRef<Path>) -> DirectoryResult<Self> {
        Self::from_fixture(&DirectoryFixture::from_path(path)?)
    }

    /// Adds or replaces a group. A missing uuid is generated.
    ///
    /// Returns the stored group.
    pub fn add_group(&self, group: Group) -> Group {
        let mut group = group;
        if group.uuid.as_deref().map_or(true, str::is_empty) {
            let n = self.next_uuid.fetch_add(1, Ordering::Relaxed) + 1;
            group.uuid = Some(format!("mem-{n:08x}"));
        }

        if let Some(previous) = self.groups.insert(group.name.clone(), group.clone()) {
            if let Some(old_uuid) = previous.uuid.filter(|u| Some(u) != group.uuid.as_ref()) {
                self.names_by_uuid.remove(&old_uuid);
            }
        }
        if let Some(uuid) = &group.uuid {
            self.names_by_uuid.insert(uuid.clone(), group.name.clone());
        }
        group
    }

    /// Makes `name` a composite group over two existing factor groups.
    ///
    /// An existing plain group keeps its uuid and labels; a missing one is
    /// created.
    pub fn add_composite_group(
        &self,
        name: &str,
        operator: CompositeOperator,
        left: &str,
        right: &str,
    ) -> DirectoryResult<Group> {
        let left_group = self.require_group(left)?;
        let right_group = self.require_group(right)?;
        if self.has_direct_members(name) {
            return Err(DirectoryError::CompositeMembership {
                group_name: name.to_string(),
            });
        }

        let group = self
            .groups
            .get(name)
            .map(|g| g.value().clone())
            .unwrap_or_else(|| Group::new(name))
            .with_composite(GroupCompositeInfo::new(
                operator,
                left_group.identity(),
                right_group.identity(),
            ));
        Ok(self.add_group(group))
    }

    /// Registers subject metadata (name, source id).
    pub fn add_subject(&self, subject: Subject) {
        self.subjects.insert(subject.id.clone(), subject);
    }

    /// Adds a subject as an immediate member of a group.
    ///
    /// Unregistered subjects are registered without a name.
    pub fn add_member(&self, group_name: &str, subject_id: &str) -> DirectoryResult<()> {
        self.require_plain_group(group_name)?;
        self.subjects
            .entry(subject_id.to_string())
            .or_insert_with(|| Subject::new(subject_id));

        let mut members = self.direct_subjects.entry(group_name.to_string()).or_default();
        if !members.iter().any(|id| id == subject_id) {
            members.push(subject_id.to_string());
        }
        Ok(())
    }

    /// Nests `member_group` inside `group_name`.
    pub fn add_group_member(&self, group_name: &str, member_group: &str) -> DirectoryResult<()> {
        self.require_plain_group(group_name)?;
        self.require_group(member_group)?;

        let mut children = self.child_groups.entry(group_name.to_string()).or_default();
        if !children.iter().any(|c| c == member_group) {
            children.push(member_group.to_string());
        }
        Ok(())
    }

    /// Returns the classification of `subject_id` in `group_name`, if any.
    ///
    /// A subject that qualifies several ways gets the most direct type:
    /// immediate, then composite, then effective.
    pub fn membership_type(&self, subject_id: &str, group_name: &str) -> Option<MembershipType> {
        if self.is_direct(subject_id, group_name) {
            return Some(MembershipType::Immediate);
        }

        let mut path = HashSet::from([group_name.to_string()]);
        if self.satisfies_composite(subject_id, group_name, &mut path) {
            return Some(MembershipType::Composite);
        }
        self.children(group_name)
            .iter()
            .any(|child| self.is_member(subject_id, child, &mut path))
            .then_some(MembershipType::Effective)
    }

    fn require_group(&self, name: &str) -> DirectoryResult<Group> {
        self.groups
            .get(name)
            .map(|g| g.value().clone())
            .ok_or_else(|| DirectoryError::GroupNotFound {
                group_name: name.to_string(),
            })
    }

    fn require_plain_group(&self, name: &str) -> DirectoryResult<()> {
        if self.require_group(name)?.composite.is_some() {
            return Err(DirectoryError::CompositeMembership {
                group_name: name.to_string(),
            });
        }
        Ok(())
    }

    fn has_direct_members(&self, name: &str) -> bool {
        self.direct_subjects.get(name).map_or(false, |m| !m.is_empty())
            || self.child_groups.get(name).map_or(false, |c| !c.is_empty())
    }

    fn is_direct(&self, subject_id: &str, group_name: &str) -> bool {
        self.direct_subjects
            .get(group_name)
            .map_or(false, |ids| ids.iter().any(|id| id == subject_id))
    }

    fn children(&self, group_name: &str) -> Vec<String> {
        self.child_groups
            .get(group_name)
            .map(|c| c.value().clone())
            .unwrap_or_default()
    }

    /// Membership of any kind. `path` holds the groups being evaluated above
    /// this one; revisiting one of them counts as not a member.
    fn is_member(&self, subject_id: &str, group_name: &str, path: &mut HashSet<String>) -> bool {
        if !path.insert(group_name.to_string()) {
            return false;
        }

        let member = self.is_direct(subject_id, group_name)
            || self.satisfies_composite(subject_id, group_name, path)
            || self
                .children(group_name)
                .iter()
                .any(|child| self.is_member(subject_id, child, path));

        path.remove(group_name);
        member
    }

    fn satisfies_composite(
        &self,
        subject_id: &str,
        group_name: &str,
        path: &mut HashSet<String>,
    ) -> bool {
        let Some(composite) = self.groups.get(group_name).and_then(|g| g.composite.clone()) else {
            return false;
        };
        let (Some(operator), Some(left), Some(right)) = (
            composite.operator,
            composite.left_name(),
            composite.right_name(),
        ) else {
            return false;
        };

        match operator {
            CompositeOperator::Union => {
                self.is_member(subject_id, left, path) || self.is_member(subject_id, right, path)
            }
            CompositeOperator::Intersection => {
                self.is_member(subject_id, left, path) && self.is_member(subject_id, right, path)
            }
            CompositeOperator::Complement => {
                self.is_member(subject_id, left, path) && !self.is_member(subject_id, right, path)
            }
        }
    }

    /// Registered subject matching the requested source, if any.
    fn subject_for(&self, subject_id: &str, source_id: Option<&str>) -> Option<Subject> {
        let subject = self.subjects.get(subject_id)?.value().clone();
        from_source(&subject, source_id).then_some(subject)
    }

    /// Registered subjects ordered by id.
    fn sorted_subjects(&self) -> Vec<Subject> {
        let mut subjects: Vec<Subject> = self.subjects.iter().map(|s| s.value().clone()).collect();
        subjects.sort_by(|a, b| a.id.cmp(&b.id));
        subjects
    }

    /// Groups nested in `group_name`: direct children are immediate members,
    /// anything deeper is effective. Each group is reported once, at the
    /// shallowest level it appears.
    fn member_groups(&self, group_name: &str) -> Vec<(Group, MembershipType)> {
        let mut seen = HashSet::from([group_name.to_string()]);
        let mut found = Vec::new();
        let mut frontier = self.children(group_name);
        let mut membership_type = MembershipType::Immediate;

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for name in frontier {
                if !seen.insert(name.clone()) {
                    continue;
                }
                if let Some(group) = self.groups.get(&name).map(|g| g.value().clone()) {
                    found.push((group, membership_type.clone()));
                }
                next.extend(self.children(&name));
            }
            frontier = next;
            membership_type = MembershipType::Effective;
        }
        found
    }

    fn record_for(&self, subject_id: &str, group: &Group) -> Option<MembershipRecord> {
        let membership_type = self.membership_type(subject_id, &group.name)?;
        let mut record = MembershipRecord::new(&group.name, membership_type);
        record.group_id = group.uuid.clone();
        Some(record)
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    #[instrument(skip(self))]
    async fn get_membership_details(
        &self,
        subject_id: &str,
        group_name: &str,
        subject_source_id: Option<&str>,
    ) -> DomainResult<MembershipDetails> {
        let group = self.require_group(group_name)?;
        let subject = self.subject_for(subject_id, subject_source_id);

        let memberships = match subject {
            Some(_) => self.record_for(subject_id, &group).into_iter().collect(),
            None => Vec::new(),
        };

        Ok(MembershipDetails {
            memberships,
            subjects: subject.into_iter().collect(),
            groups: vec![group],
        })
    }

    #[instrument(skip(self))]
    async fn get_subject_direct_memberships(
        &self,
        subject_id: &str,
        subject_source_id: Option<&str>,
    ) -> DomainResult<Vec<MembershipRecord>> {
        if self.subject_for(subject_id, subject_source_id).is_none() {
            return Ok(Vec::new());
        }

        let mut groups: Vec<Group> = self.groups.iter().map(|g| g.value().clone()).collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(groups
            .iter()
            .filter_map(|group| self.record_for(subject_id, group))
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_group_direct_members(&self, group_name: &str) -> DomainResult<Vec<GroupMember>> {
        self.require_group(group_name)?;

        let subject_ids = self
            .direct_subjects
            .get(group_name)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();
        let mut members: Vec<GroupMember> = subject_ids
            .into_iter()
            .map(|id| {
                let source_id = self.subjects.get(&id).and_then(|s| s.source_id.clone());
                GroupMember::subject(id, source_id)
            })
            .collect();

        members.extend(self.children(group_name).iter().filter_map(|child| {
            self.groups
                .get(child)
                .and_then(|g| g.uuid.clone())
                .map(GroupMember::group)
        }));

        Ok(members)
    }
}

#[async_trait]
impl DirectoryLookup for MemoryDirectory {
    #[instrument(skip(self))]
    async fn list_members(
        &self,
        group_name: &str,
        filter: MemberFilter,
    ) -> DirectoryResult<Vec<Subject>> {
        self.require_group(group_name)?;

        let mut members: Vec<Subject> = self
            .sorted_subjects()
            .into_iter()
            .filter(|subject| {
                self.membership_type(&subject.id, group_name)
                    .map_or(false, |t| filter.admits(&t))
            })
            .collect();

        members.extend(
            self.member_groups(group_name)
                .into_iter()
                .filter(|(_, membership_type)| filter.admits(membership_type))
                .map(|(group, _)| group_as_subject(group)),
        );

        debug!(members = members.len(), "Listed group members");
        Ok(members)
    }

    #[instrument(skip(self))]
    async fn find_subjects(&self, lookup: &SubjectLookup) -> DirectoryResult<Vec<Subject>> {
        let candidates: Vec<Subject> = match &lookup.key {
            SubjectKey::Id(id) => self
                .subjects
                .get(id)
                .map(|s| s.value().clone())
                .into_iter()
                .collect(),
            SubjectKey::Identifier(identifier) => self
                .sorted_subjects()
                .into_iter()
                .filter(|s| s.identifier.as_deref() == Some(identifier.as_str()))
                .collect(),
        };

        Ok(candidates
            .into_iter()
            .filter(|s| from_source(s, lookup.source_id.as_deref()))
            .collect())
    }
}

/// A subject without a source matches any requested source.
fn from_source(subject: &Subject, source_id: Option<&str>) -> bool {
    match (source_id, subject.source_id.as_deref()) {
        (Some(requested), Some(actual)) => requested == actual,
        _ => true,
    }
}

/// A nested group as the directory lists it among members.
fn group_as_subject(group: Group) -> Subject {
    let mut subject = Subject::new(group.uuid.unwrap_or_else(|| group.name.clone()));
    subject.source_id = Some(GROUP_SOURCE_ID.to_string());
    subject.name = Some(group.name);
    subject
}

fn fixture_error(group_name: &str, err: DirectoryError) -> DirectoryError {
    DirectoryError::Fixture {
        message: format!("group {group_name}: {err}"),
    }
}

/// Serialized directory contents.
///
/// ```yaml
/// subjects:
///   - id: jdoe
///     source_id: ldap
///     name: Jane Doe
/// groups:
///   - name: org:staff
///     members: [jdoe]
///   - name: org:apps:users
///     groups: [org:staff]
///   - name: org:apps:admins
///     composite: { operator: intersection, left: org:staff, right: org:apps:users }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryFixture {
    pub subjects: Vec<FixtureSubject>,
    pub groups: Vec<FixtureGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureSubject {
    pub id: String,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Login name or other identifier for identifier lookups.
    #[serde(default)]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureGroup {
    pub name: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Subject ids added directly.
    #[serde(default)]
    pub members: Vec<String>,
    /// Names of nested member groups.
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub composite: Option<FixtureComposite>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureComposite {
    pub operator: CompositeOperator,
    pub left: String,
    pub right: String,
}

impl DirectoryFixture {
    /// Parses a fixture from YAML (JSON is accepted as well).
    pub fn from_yaml_str(content: &str) -> DirectoryResult<Self> {
        serde_yaml::from_str(content).map_err(|e| DirectoryError::Fixture {
            message: e.to_string(),
        })
    }

    /// Reads and parses a fixture file.
    pub fn from_path(path: impl AsRef<Path>) -> DirectoryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DirectoryError::Fixture {
            message: format!("{}: {e}", path.display()),
        })?;
        serde_yaml::from_str(&content).map_err(|e| DirectoryError::Fixture {
            message: format!("{}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grptrace_domain::DomainError;

    fn directory_with(groups: &[&str]) -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        for name in groups {
            directory.add_group(Group::new(*name));
        }
        directory
    }

    #[test]
    fn test_add_group_generates_unique_uuids() {
        let directory = directory_with(&["org:a", "org:b"]);
        let a = directory.require_group("org:a").unwrap();
        let b = directory.require_group("org:b").unwrap();

        assert!(a.uuid.is_some());
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn test_add_group_keeps_given_uuid() {
        let directory = MemoryDirectory::new();
        let group = directory.add_group(Group::new("org:a").with_uuid("fixed"));

        assert_eq!(group.uuid.as_deref(), Some("fixed"));
        assert_eq!(
            directory.names_by_uuid.get("fixed").map(|n| n.clone()),
            Some("org:a".to_string())
        );
    }

    #[test]
    fn test_classifies_immediate_and_effective() {
        let directory = directory_with(&["org:inner", "org:outer"]);
        directory.add_member("org:inner", "jdoe").unwrap();
        directory.add_group_member("org:outer", "org:inner").unwrap();

        assert_eq!(
            directory.membership_type("jdoe", "org:inner"),
            Some(MembershipType::Immediate)
        );
        assert_eq!(
            directory.membership_type("jdoe", "org:outer"),
            Some(MembershipType::Effective)
        );
        assert_eq!(directory.membership_type("other", "org:outer"), None);
    }

    #[test]
    fn test_immediate_wins_over_effective() {
        let directory = directory_with(&["org:inner", "org:outer"]);
        directory.add_member("org:inner", "jdoe").unwrap();
        directory.add_member("org:outer", "jdoe").unwrap();
        directory.add_group_member("org:outer", "org:inner").unwrap();

        assert_eq!(
            directory.membership_type("jdoe", "org:outer"),
            Some(MembershipType::Immediate)
        );
    }

    #[test]
    fn test_composite_operators() {
        let directory = directory_with(&["org:l", "org:r"]);
        directory.add_member("org:l", "left_only").unwrap();
        directory.add_member("org:l", "both").unwrap();
        directory.add_member("org:r", "both").unwrap();
        directory.add_member("org:r", "right_only").unwrap();
        directory
            .add_composite_group("org:u", CompositeOperator::Union, "org:l", "org:r")
            .unwrap();
        directory
            .add_composite_group("org:i", CompositeOperator::Intersection, "org:l", "org:r")
            .unwrap();
        directory
            .add_composite_group("org:c", CompositeOperator::Complement, "org:l", "org:r")
            .unwrap();

        let composite = Some(MembershipType::Composite);
        assert_eq!(directory.membership_type("right_only", "org:u"), composite);
        assert_eq!(directory.membership_type("both", "org:i"), composite);
        assert_eq!(directory.membership_type("left_only", "org:i"), None);
        assert_eq!(directory.membership_type("left_only", "org:c"), composite);
        assert_eq!(directory.membership_type("both", "org:c"), None);
    }

    #[test]
    fn test_nesting_cycle_terminates() {
        let directory = directory_with(&["org:a", "org:b", "org:c"]);
        directory.add_group_member("org:a", "org:b").unwrap();
        directory.add_group_member("org:b", "org:a").unwrap();
        directory.add_group_member("org:b", "org:c").unwrap();
        directory.add_member("org:c", "jdoe").unwrap();

        assert_eq!(directory.membership_type("nobody", "org:a"), None);
        assert_eq!(
            directory.membership_type("jdoe", "org:a"),
            Some(MembershipType::Effective)
        );
    }

    #[test]
    fn test_composite_rejects_direct_members() {
        let directory = directory_with(&["org:l", "org:r", "org:x"]);
        directory
            .add_composite_group("org:u", CompositeOperator::Union, "org:l", "org:r")
            .unwrap();

        assert!(matches!(
            directory.add_member("org:u", "jdoe"),
            Err(DirectoryError::CompositeMembership { .. })
        ));
        assert!(matches!(
            directory.add_group_member("org:u", "org:x"),
            Err(DirectoryError::CompositeMembership { .. })
        ));

        directory.add_member("org:x", "jdoe").unwrap();
        assert!(matches!(
            directory.add_composite_group("org:x", CompositeOperator::Union, "org:l", "org:r"),
            Err(DirectoryError::CompositeMembership { .. })
        ));
    }

    #[test]
    fn test_references_to_unknown_groups_fail() {
        let directory = directory_with(&["org:a"]);

        assert!(matches!(
            directory.add_member("org:missing", "jdoe"),
            Err(DirectoryError::GroupNotFound { .. })
        ));
        assert!(matches!(
            directory.add_group_member("org:a", "org:missing"),
            Err(DirectoryError::GroupNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_membership_details_include_metadata() {
        let directory = MemoryDirectory::new();
        directory.add_group(Group::new("org:a").with_display_name("Team A"));
        let mut subject = Subject::new("jdoe").with_name("Jane Doe");
        subject.source_id = Some("ldap".to_string());
        directory.add_subject(subject);
        directory.add_member("org:a", "jdoe").unwrap();

        let details = directory
            .get_membership_details("jdoe", "org:a", None)
            .await
            .unwrap();

        let record = details.first_membership().unwrap();
        assert_eq!(record.membership_type, MembershipType::Immediate);
        assert_eq!(
            record.group_id,
            directory.require_group("org:a").unwrap().uuid
        );
        assert_eq!(details.subjects[0].name.as_deref(), Some("Jane Doe"));
        assert_eq!(details.groups[0].display_name.as_deref(), Some("Team A"));
    }

    #[tokio::test]
    async fn test_source_id_mismatch_hides_subject() {
        let directory = directory_with(&["org:a"]);
        let mut subject = Subject::new("jdoe");
        subject.source_id = Some("ldap".to_string());
        directory.add_subject(subject);
        directory.add_member("org:a", "jdoe").unwrap();

        let details = directory
            .get_membership_details("jdoe", "org:a", Some("jdbc"))
            .await
            .unwrap();
        assert!(details.memberships.is_empty());
        assert!(details.subjects.is_empty());

        let memberships = directory
            .get_subject_direct_memberships("jdoe", Some("ldap"))
            .await
            .unwrap();
        assert_eq!(memberships.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_group_lookup_is_an_error() {
        let directory = MemoryDirectory::new();

        let err = directory
            .get_membership_details("jdoe", "org:missing", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DirectoryUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_subject_memberships_cover_every_kind() {
        let directory = directory_with(&["org:inner", "org:outer", "org:other"]);
        directory.add_member("org:inner", "jdoe").unwrap();
        directory.add_group_member("org:outer", "org:inner").unwrap();
        directory
            .add_composite_group("org:comp", CompositeOperator::Union, "org:inner", "org:other")
            .unwrap();

        let memberships = directory
            .get_subject_direct_memberships("jdoe", None)
            .await
            .unwrap();

        let summary: Vec<(&str, &MembershipType)> = memberships
            .iter()
            .map(|m| (m.group_name.as_str(), &m.membership_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("org:comp", &MembershipType::Composite),
                ("org:inner", &MembershipType::Immediate),
                ("org:outer", &MembershipType::Effective),
            ]
        );
        assert!(memberships.iter().all(|m| m.group_id.is_some()));
    }

    #[tokio::test]
    async fn test_group_direct_members_lists_subjects_and_groups() {
        let directory = directory_with(&["org:inner", "org:outer"]);
        directory.add_member("org:outer", "jdoe").unwrap();
        directory.add_group_member("org:outer", "org:inner").unwrap();

        let members = directory
            .get_group_direct_members("org:outer")
            .await
            .unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, "jdoe");
        assert!(!members[0].is_group());
        assert!(members[1].is_group());
        assert_eq!(
            Some(members[1].id.clone()),
            directory.require_group("org:inner").unwrap().uuid
        );
    }

    /// org:all <- org:eng <- org:platform, with subjects at every level.
    fn nested_directory() -> MemoryDirectory {
        let directory = directory_with(&["org:all", "org:eng", "org:platform"]);
        directory.add_subject(Subject {
            id: "jdoe".to_string(),
            source_id: Some("ldap".to_string()),
            name: Some("Jane Doe".to_string()),
            identifier: Some("jdoe@example.edu".to_string()),
        });
        directory.add_member("org:all", "amy").unwrap();
        directory.add_member("org:eng", "jdoe").unwrap();
        directory.add_member("org:platform", "zed").unwrap();
        directory.add_group_member("org:all", "org:eng").unwrap();
        directory.add_group_member("org:eng", "org:platform").unwrap();
        directory
    }

    fn ids(subjects: &[Subject]) -> Vec<&str> {
        subjects.iter().map(|s| s.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_members_all_includes_nested_subjects_and_groups() {
        let directory = nested_directory();
        let eng_uuid = directory.require_group("org:eng").unwrap().uuid.unwrap();
        let platform_uuid = directory.require_group("org:platform").unwrap().uuid.unwrap();

        let members = directory
            .list_members("org:all", MemberFilter::All)
            .await
            .unwrap();

        assert_eq!(
            ids(&members),
            vec!["amy", "jdoe", "zed", eng_uuid.as_str(), platform_uuid.as_str()]
        );
        assert_eq!(members[1].name.as_deref(), Some("Jane Doe"));
        assert_eq!(members[3].source_id.as_deref(), Some(GROUP_SOURCE_ID));
        assert_eq!(members[3].name.as_deref(), Some("org:eng"));
    }

    #[tokio::test]
    async fn test_list_members_applies_filter() {
        let directory = nested_directory();
        let eng_uuid = directory.require_group("org:eng").unwrap().uuid.unwrap();
        let platform_uuid = directory.require_group("org:platform").unwrap().uuid.unwrap();

        let immediate = directory
            .list_members("org:all", MemberFilter::Immediate)
            .await
            .unwrap();
        assert_eq!(ids(&immediate), vec!["amy", eng_uuid.as_str()]);

        let effective = directory
            .list_members("org:all", MemberFilter::NonImmediate)
            .await
            .unwrap();
        assert_eq!(ids(&effective), vec!["jdoe", "zed", platform_uuid.as_str()]);
    }

    #[tokio::test]
    async fn test_list_members_of_composite_group() {
        let directory = directory_with(&["org:l", "org:r"]);
        directory.add_member("org:l", "both").unwrap();
        directory.add_member("org:l", "left_only").unwrap();
        directory.add_member("org:r", "both").unwrap();
        directory
            .add_composite_group("org:c", CompositeOperator::Complement, "org:l", "org:r")
            .unwrap();

        let members = directory
            .list_members("org:c", MemberFilter::Composite)
            .await
            .unwrap();

        assert_eq!(ids(&members), vec!["left_only"]);
    }

    #[tokio::test]
    async fn test_list_members_survives_nesting_cycle() {
        let directory = directory_with(&["org:a", "org:b"]);
        directory.add_group_member("org:a", "org:b").unwrap();
        directory.add_group_member("org:b", "org:a").unwrap();
        directory.add_member("org:b", "jdoe").unwrap();

        let members = directory
            .list_members("org:a", MemberFilter::All)
            .await
            .unwrap();

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, "jdoe");
        assert_eq!(members[1].name.as_deref(), Some("org:b"));
    }

    #[tokio::test]
    async fn test_list_members_of_unknown_group_fails() {
        let directory = MemoryDirectory::new();

        let err = directory
            .list_members("org:missing", MemberFilter::All)
            .await
            .unwrap_err();

        assert!(matches!(err, DirectoryError::GroupNotFound { group_name } if group_name == "org:missing"));
    }

    #[tokio::test]
    async fn test_find_subjects_by_id_and_identifier() {
        let directory = nested_directory();

        let by_id = directory
            .find_subjects(&SubjectLookup::by_id("jdoe"))
            .await
            .unwrap();
        assert_eq!(ids(&by_id), vec!["jdoe"]);

        let by_identifier = directory
            .find_subjects(&SubjectLookup::by_identifier("jdoe@example.edu"))
            .await
            .unwrap();
        assert_eq!(by_identifier, by_id);

        let missing = directory
            .find_subjects(&SubjectLookup::by_id("nobody"))
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_find_subjects_respects_source() {
        let directory = nested_directory();

        let wrong_source = directory
            .find_subjects(&SubjectLookup::by_id("jdoe").with_source("kerberos"))
            .await
            .unwrap();
        assert!(wrong_source.is_empty());

        let right_source = directory
            .find_subjects(&SubjectLookup::by_id("jdoe").with_source("ldap"))
            .await
            .unwrap();
        assert_eq!(right_source.len(), 1);

        // Subjects registered without a source match any source
        let sourceless = directory
            .find_subjects(&SubjectLookup::by_id("amy").with_source("ldap"))
            .await
            .unwrap();
        assert_eq!(ids(&sourceless), vec!["amy"]);
    }

    #[test]
    fn test_fixture_round_trip_from_yaml() {
        let yaml = r#"
subjects:
  - id: jdoe
    source_id: ldap
    name: Jane Doe
    identifier: jdoe@example.edu
groups:
  - name: org:staff
    members: [jdoe]
  - name: org:contractors
  - name: org:apps:users
    display_name: App Users
    groups: [org:staff]
  - name: org:apps:admins
    composite:
      operator: union
      left: org:staff
      right: org:contractors
"#;
        let fixture = DirectoryFixture::from_yaml_str(yaml).unwrap();
        let directory = MemoryDirectory::from_fixture(&fixture).unwrap();

        assert_eq!(
            directory.membership_type("jdoe", "org:apps:users"),
            Some(MembershipType::Effective)
        );
        assert_eq!(
            directory.membership_type("jdoe", "org:apps:admins"),
            Some(MembershipType::Composite)
        );
        let admins = directory.require_group("org:apps:admins").unwrap();
        let composite = admins.composite.unwrap();
        assert_eq!(composite.operator, Some(CompositeOperator::Union));
        assert_eq!(composite.left_name(), Some("org:staff"));
        assert_eq!(
            directory.subject_for("jdoe", None).and_then(|s| s.identifier),
            Some("jdoe@example.edu".to_string())
        );
    }

    #[test]
    fn test_fixture_with_dangling_reference_fails() {
        let yaml = r#"
groups:
  - name: org:a
    groups: [org:nowhere]
"#;
        let fixture = DirectoryFixture::from_yaml_str(yaml).unwrap();
        let err = MemoryDirectory::from_fixture(&fixture).unwrap_err();

        match err {
            DirectoryError::Fixture { message } => {
                assert!(message.contains("org:a"));
                assert!(message.contains("org:nowhere"));
            }
            other => panic!("Expected Fixture error, got {other:?}"),
        }
    }

    #[test]
    fn test_fixture_rejects_unknown_fields() {
        let yaml = "groups:\n  - name: org:a\n    owners: [x]\n";
        assert!(DirectoryFixture::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_fixture_accepts_json() {
        let json = r#"{"groups": [{"name": "org:a", "members": ["jdoe"]}]}"#;
        let fixture = DirectoryFixture::from_yaml_str(json).unwrap();
        assert_eq!(fixture.groups[0].members, vec!["jdoe".to_string()]);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = MemoryDirectory::load("/nonexistent/fixture.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/fixture.yaml"));
    }
}
