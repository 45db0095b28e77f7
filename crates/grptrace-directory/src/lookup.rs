//! Read-only directory lookups outside the trace.
//!
//! Listing a group's members and resolving subjects are the two browsing
//! operations the `grptrace` command offers next to `trace`. They are kept
//! off [`grptrace_domain::DirectoryClient`], which only carries what the
//! resolver needs.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use grptrace_domain::model::{MembershipType, Subject};

use crate::error::DirectoryResult;

/// Which memberships a member listing includes (Grouper's `memberFilter`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum MemberFilter {
    #[default]
    All,
    Immediate,
    Effective,
    Composite,
    /// Everything except immediate memberships.
    NonImmediate,
}

impl MemberFilter {
    /// Returns the directory's spelling of the filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberFilter::All => "All",
            MemberFilter::Immediate => "Immediate",
            MemberFilter::Effective => "Effective",
            MemberFilter::Composite => "Composite",
            MemberFilter::NonImmediate => "NonImmediate",
        }
    }

    /// Whether a membership of the given type passes the filter.
    pub fn admits(&self, membership_type: &MembershipType) -> bool {
        match self {
            MemberFilter::All => true,
            MemberFilter::Immediate => *membership_type == MembershipType::Immediate,
            MemberFilter::Effective => *membership_type == MembershipType::Effective,
            MemberFilter::Composite => *membership_type == MembershipType::Composite,
            MemberFilter::NonImmediate => *membership_type != MembershipType::Immediate,
        }
    }
}

impl fmt::Display for MemberFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "all" => Ok(MemberFilter::All),
            "immediate" => Ok(MemberFilter::Immediate),
            "effective" => Ok(MemberFilter::Effective),
            "composite" => Ok(MemberFilter::Composite),
            "nonimmediate" => Ok(MemberFilter::NonImmediate),
            _ => Err(format!(
                "unknown member filter '{value}' (expected all, immediate, effective, composite or non-immediate)"
            )),
        }
    }
}

/// How a subject is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectKey {
    /// The source's stable subject id.
    Id(String),
    /// A login name or other identifier the source resolves to a subject.
    Identifier(String),
}

/// A subject lookup, optionally restricted to one subject source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectLookup {
    pub key: SubjectKey,
    pub source_id: Option<String>,
}

impl SubjectLookup {
    pub fn by_id(subject_id: impl Into<String>) -> Self {
        Self {
            key: SubjectKey::Id(subject_id.into()),
            source_id: None,
        }
    }

    pub fn by_identifier(identifier: impl Into<String>) -> Self {
        Self {
            key: SubjectKey::Identifier(identifier.into()),
            source_id: None,
        }
    }

    /// Restricts the lookup to one subject source.
    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// The id or identifier being looked up.
    pub fn value(&self) -> &str {
        match &self.key {
            SubjectKey::Id(value) | SubjectKey::Identifier(value) => value,
        }
    }
}

/// Browsing operations over a group directory.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    /// Members of `group_name` passing `filter`.
    ///
    /// Group-typed members are returned as subjects of the group source
    /// (`g:gsa`) whose id is the group uuid and whose name is the group name.
    /// Fails with `GroupNotFound` for an unknown group.
    async fn list_members(
        &self,
        group_name: &str,
        filter: MemberFilter,
    ) -> DirectoryResult<Vec<Subject>>;

    /// Every subject matching the lookup. Empty when nothing matches.
    async fn find_subjects(&self, lookup: &SubjectLookup) -> DirectoryResult<Vec<Subject>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_filter_parsing() {
        assert_eq!("all".parse::<MemberFilter>(), Ok(MemberFilter::All));
        assert_eq!("Immediate".parse::<MemberFilter>(), Ok(MemberFilter::Immediate));
        assert_eq!(
            "non-immediate".parse::<MemberFilter>(),
            Ok(MemberFilter::NonImmediate)
        );
        assert_eq!(
            "NonImmediate".parse::<MemberFilter>(),
            Ok(MemberFilter::NonImmediate)
        );
        assert!("direct".parse::<MemberFilter>().is_err());
    }

    #[test]
    fn test_member_filter_display_round_trips_directory_spelling() {
        assert_eq!(MemberFilter::NonImmediate.to_string(), "NonImmediate");
        assert_eq!(MemberFilter::default(), MemberFilter::All);
    }

    #[test]
    fn test_member_filter_admits() {
        let immediate = MembershipType::Immediate;
        let effective = MembershipType::Effective;
        let composite = MembershipType::Composite;

        assert!(MemberFilter::All.admits(&immediate));
        assert!(MemberFilter::Immediate.admits(&immediate));
        assert!(!MemberFilter::Immediate.admits(&effective));
        assert!(MemberFilter::Effective.admits(&effective));
        assert!(!MemberFilter::Effective.admits(&composite));
        assert!(MemberFilter::Composite.admits(&composite));
        assert!(MemberFilter::NonImmediate.admits(&effective));
        assert!(MemberFilter::NonImmediate.admits(&composite));
        assert!(!MemberFilter::NonImmediate.admits(&immediate));
    }

    #[test]
    fn test_subject_lookup_builders() {
        let lookup = SubjectLookup::by_identifier("jdoe@example.edu").with_source("ldap");

        assert_eq!(
            lookup.key,
            SubjectKey::Identifier("jdoe@example.edu".to_string())
        );
        assert_eq!(lookup.source_id.as_deref(), Some("ldap"));
        assert_eq!(lookup.value(), "jdoe@example.edu");
        assert_eq!(SubjectLookup::by_id("jdoe").value(), "jdoe");
    }
}
