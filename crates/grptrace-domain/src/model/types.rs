//! Core type definitions for the group directory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Source id the directory uses for members that are themselves groups.
pub const GROUP_SOURCE_ID: &str = "g:gsa";

/// Stable identity of a group.
///
/// `name` is the colon-delimited path (e.g., "org:apps:admins") and may change
/// on rename; `uuid` is the durable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub name: String,
}

impl GroupIdentity {
    /// Creates an identity from a name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            uuid: None,
            name: name.into(),
        }
    }

    /// Creates an identity with both uuid and name.
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            name: name.into(),
        }
    }
}

/// Set operation combining the two factor groups of a composite group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompositeOperator {
    #[serde(alias = "union")]
    Union,
    #[serde(alias = "intersection")]
    Intersection,
    #[serde(alias = "complement")]
    Complement,
}

impl CompositeOperator {
    /// Returns the directory's spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeOperator::Union => "UNION",
            CompositeOperator::Intersection => "INTERSECTION",
            CompositeOperator::Complement => "COMPLEMENT",
        }
    }
}

impl fmt::Display for CompositeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompositeOperator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "UNION" => Ok(CompositeOperator::Union),
            "INTERSECTION" => Ok(CompositeOperator::Intersection),
            "COMPLEMENT" => Ok(CompositeOperator::Complement),
            _ => Err(format!("unknown composite type: {value}")),
        }
    }
}

/// Composite metadata attached to a derived group.
///
/// Every field is optional because the directory may report a composite
/// membership while omitting parts of the factor information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCompositeInfo {
    pub operator: Option<CompositeOperator>,
    pub left_group: Option<GroupIdentity>,
    pub right_group: Option<GroupIdentity>,
}

impl GroupCompositeInfo {
    /// Creates fully populated composite metadata.
    pub fn new(operator: CompositeOperator, left: GroupIdentity, right: GroupIdentity) -> Self {
        Self {
            operator: Some(operator),
            left_group: Some(left),
            right_group: Some(right),
        }
    }

    /// Name of the left (first) factor group, if known.
    pub fn left_name(&self) -> Option<&str> {
        self.left_group.as_ref().map(|g| g.name.as_str())
    }

    /// Name of the right (second) factor group, if known.
    pub fn right_name(&self) -> Option<&str> {
        self.right_group.as_ref().map(|g| g.name.as_str())
    }
}

/// Group metadata as resolved by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub composite: Option<GroupCompositeInfo>,
}

impl Group {
    /// Creates a plain (non-composite) group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: None,
            name: name.into(),
            display_name: None,
            description: None,
            composite: None,
        }
    }

    /// Sets the group's uuid.
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    /// Sets the group's display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the group's description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches composite metadata.
    pub fn with_composite(mut self, composite: GroupCompositeInfo) -> Self {
        self.composite = Some(composite);
        self
    }

    /// Returns the group's identity.
    pub fn identity(&self) -> GroupIdentity {
        GroupIdentity {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
        }
    }
}

/// A subject (person, service account, ...) known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Login name or other alternate identifier, when the source has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_id: None,
            name: None,
            identifier: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A direct member of a group: either a subject or another group.
///
/// For group members, `id` is the member group's uuid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: String,
    #[serde(default)]
    pub source_id: Option<String>,
}

impl GroupMember {
    /// Creates a subject-typed member.
    pub fn subject(id: impl Into<String>, source_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            source_id,
        }
    }

    /// Creates a group-typed member referencing the group's uuid.
    pub fn group(uuid: impl Into<String>) -> Self {
        Self {
            id: uuid.into(),
            source_id: Some(GROUP_SOURCE_ID.to_string()),
        }
    }

    /// Returns true if this member is itself a group.
    pub fn is_group(&self) -> bool {
        self.source_id.as_deref() == Some(GROUP_SOURCE_ID)
    }
}

/// How a subject is a member of a group, as classified by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MembershipType {
    /// Direct, explicitly added member.
    Immediate,
    /// Member through one or more intermediate groups.
    Effective,
    /// Member through a composite (set operation) group.
    Composite,
    /// A classification the resolver does not recognize. Keeps the raw value.
    Other(String),
}

impl MembershipType {
    /// Returns the lower-case spelling of the type.
    pub fn as_str(&self) -> &str {
        match self {
            MembershipType::Immediate => "immediate",
            MembershipType::Effective => "effective",
            MembershipType::Composite => "composite",
            MembershipType::Other(raw) => raw,
        }
    }

    /// Returns true for the three types the resolver knows how to expand.
    pub fn is_known(&self) -> bool {
        !matches!(self, MembershipType::Other(_))
    }
}

impl FromStr for MembershipType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value.trim().to_ascii_lowercase().as_str() {
            "immediate" => MembershipType::Immediate,
            "effective" => MembershipType::Effective,
            "composite" => MembershipType::Composite,
            _ => MembershipType::Other(value.to_string()),
        })
    }
}

impl From<String> for MembershipType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(parsed) => parsed,
            Err(never) => match never {},
        }
    }
}

impl From<MembershipType> for String {
    fn from(value: MembershipType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relates a subject to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
    /// Uuid of the group, when the directory reports it.
    #[serde(default)]
    pub group_id: Option<String>,
    pub group_name: String,
    pub membership_type: MembershipType,
}

impl MembershipRecord {
    pub fn new(group_name: impl Into<String>, membership_type: MembershipType) -> Self {
        Self {
            group_id: None,
            group_name: group_name.into(),
            membership_type,
        }
    }

    /// Sets the group uuid on the record.
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// Answer to a membership lookup for one (subject, group) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDetails {
    /// Zero or one record for the pair.
    #[serde(default)]
    pub memberships: Vec<MembershipRecord>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl MembershipDetails {
    /// Returns the first membership record, if any.
    pub fn first_membership(&self) -> Option<&MembershipRecord> {
        self.memberships.first()
    }

    /// Finds the group metadata a record refers to.
    ///
    /// Matches on uuid first, then falls back to the group name.
    pub fn group_for(&self, record: &MembershipRecord) -> Option<&Group> {
        if let Some(group_id) = record.group_id.as_deref() {
            if let Some(group) = self
                .groups
                .iter()
                .find(|g| g.uuid.as_deref() == Some(group_id))
            {
                return Some(group);
            }
        }
        self.groups.iter().find(|g| g.name == record.group_name)
    }
}
