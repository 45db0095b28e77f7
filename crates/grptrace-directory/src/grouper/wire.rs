//! Grouper Web Services JSON wire format.
//!
//! Only the fields grptrace reads are modelled. Grouper encodes booleans
//! as `"T"`/`"F"` strings and omits empty arrays, so every collection here
//! defaults to empty.

use serde::{Deserialize, Serialize};

use grptrace_domain::model::{
    Group, GroupCompositeInfo, GroupIdentity, GroupMember, MembershipDetails, MembershipRecord,
    Subject,
};

use crate::lookup::{MemberFilter, SubjectKey, SubjectLookup};

pub(crate) const TRUE_FLAG: &str = "T";
pub(crate) const FALSE_FLAG: &str = "F";
const GROUP_NOT_FOUND: &str = "GROUP_NOT_FOUND";

/// Returns true for Grouper's `"T"` flag.
pub(crate) fn is_true(flag: Option<&str>) -> bool {
    flag.map_or(false, |f| f.eq_ignore_ascii_case(TRUE_FLAG))
}

// ============================================================
// Requests
// ============================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsSubjectLookup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_source_id: Option<String>,
}

impl WsSubjectLookup {
    pub fn by_id(subject_id: &str, subject_source_id: Option<&str>) -> Self {
        Self {
            subject_id: Some(subject_id.to_string()),
            subject_identifier: None,
            subject_source_id: subject_source_id.map(str::to_string),
        }
    }
}

impl From<&SubjectLookup> for WsSubjectLookup {
    fn from(lookup: &SubjectLookup) -> Self {
        let (subject_id, subject_identifier) = match &lookup.key {
            SubjectKey::Id(id) => (Some(id.clone()), None),
            SubjectKey::Identifier(identifier) => (None, Some(identifier.clone())),
        };
        Self {
            subject_id,
            subject_identifier,
            subject_source_id: lookup.source_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsGroupLookup {
    pub group_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsRestGetMembershipsRequest {
    pub ws_subject_lookups: Vec<WsSubjectLookup>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ws_group_lookups: Vec<WsGroupLookup>,
    pub include_group_detail: &'static str,
    pub include_subject_detail: &'static str,
}

impl WsRestGetMembershipsRequest {
    pub fn new(subject_id: &str, subject_source_id: Option<&str>, group_name: Option<&str>) -> Self {
        Self {
            ws_subject_lookups: vec![WsSubjectLookup::by_id(subject_id, subject_source_id)],
            ws_group_lookups: group_name
                .map(|name| WsGroupLookup {
                    group_name: name.to_string(),
                })
                .into_iter()
                .collect(),
            include_group_detail: TRUE_FLAG,
            include_subject_detail: TRUE_FLAG,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetMembershipsEnvelope {
    #[serde(rename = "WsRestGetMembershipsRequest")]
    pub request: WsRestGetMembershipsRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsRestGetMembersRequest {
    pub ws_group_lookups: Vec<WsGroupLookup>,
    pub member_filter: &'static str,
    pub include_subject_detail: &'static str,
}

impl WsRestGetMembersRequest {
    /// Members passing `filter`, with subject names.
    pub fn new(group_name: &str, filter: MemberFilter) -> Self {
        Self {
            ws_group_lookups: vec![WsGroupLookup {
                group_name: group_name.to_string(),
            }],
            member_filter: filter.as_str(),
            include_subject_detail: TRUE_FLAG,
        }
    }

    /// Direct members only, ids and sources without detail.
    pub fn immediate(group_name: &str) -> Self {
        Self {
            include_subject_detail: FALSE_FLAG,
            ..Self::new(group_name, MemberFilter::Immediate)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetMembersEnvelope {
    #[serde(rename = "WsRestGetMembersRequest")]
    pub request: WsRestGetMembersRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsRestGetSubjectsRequest {
    pub ws_subject_lookups: Vec<WsSubjectLookup>,
    pub include_subject_detail: &'static str,
}

impl WsRestGetSubjectsRequest {
    pub fn new(lookup: &SubjectLookup) -> Self {
        Self {
            ws_subject_lookups: vec![WsSubjectLookup::from(lookup)],
            include_subject_detail: TRUE_FLAG,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetSubjectsEnvelope {
    #[serde(rename = "WsRestGetSubjectsRequest")]
    pub request: WsRestGetSubjectsRequest,
}

// ============================================================
// Responses
// ============================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GetMembershipsResponse {
    #[serde(rename = "WsGetMembershipsResults")]
    pub results: WsGetMembershipsResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsGetMembershipsResults {
    pub ws_memberships: Vec<WsMembership>,
    pub ws_groups: Vec<WsGroup>,
    pub ws_subjects: Vec<WsSubject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsMembership {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub membership_type: Option<String>,
    pub subject_id: Option<String>,
    pub subject_source_id: Option<String>,
    pub enabled: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsGroup {
    pub uuid: Option<String>,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub detail: Option<WsGroupDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsGroupDetail {
    pub has_composite: Option<String>,
    pub composite_type: Option<String>,
    pub left_group: Option<Box<WsGroup>>,
    pub right_group: Option<Box<WsGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsSubject {
    pub id: String,
    pub source_id: Option<String>,
    pub name: Option<String>,
    /// Identifier the subject was looked up by, if any.
    pub identifier_lookup: Option<String>,
    pub success: Option<String>,
    pub result_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetMembersResponse {
    #[serde(rename = "WsGetMembersResults")]
    pub results: WsGetMembersResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsGetMembersResults {
    pub results: Vec<WsGetMembersResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsGetMembersResult {
    pub result_metadata: Option<WsResultMetadata>,
    pub ws_group: Option<WsGroup>,
    pub ws_subjects: Vec<WsSubject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsResultMetadata {
    pub success: Option<String>,
    pub result_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetSubjectsResponse {
    #[serde(rename = "WsGetSubjectsResults")]
    pub results: WsGetSubjectsResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WsGetSubjectsResults {
    pub ws_subjects: Vec<WsSubject>,
}

// ============================================================
// Conversions
// ============================================================

impl WsMembership {
    /// Grouper keeps disabled memberships around; they grant nothing.
    fn is_enabled(&self) -> bool {
        self.enabled.as_deref() != Some(FALSE_FLAG)
    }

    /// Records without a group name carry nothing the tracer can follow.
    pub fn into_record(self) -> Option<MembershipRecord> {
        let group_name = self.group_name.filter(|n| !n.is_empty())?;
        let mut record =
            MembershipRecord::new(group_name, self.membership_type.unwrap_or_default().into());
        record.group_id = self.group_id.filter(|id| !id.is_empty());
        Some(record)
    }
}

impl WsGroup {
    pub fn identity(&self) -> GroupIdentity {
        GroupIdentity {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
        }
    }

    pub fn into_group(self) -> Group {
        let composite = self.detail.and_then(WsGroupDetail::into_composite);
        Group {
            uuid: self.uuid,
            name: self.name,
            display_name: self.display_name,
            description: self.description,
            composite,
        }
    }
}

impl WsGroupDetail {
    /// `None` unless `hasComposite` is set. An unparseable `compositeType`
    /// keeps the factors but leaves the operator unknown.
    pub fn into_composite(self) -> Option<GroupCompositeInfo> {
        if !is_true(self.has_composite.as_deref()) {
            return None;
        }
        Some(GroupCompositeInfo {
            operator: self.composite_type.and_then(|t| t.parse().ok()),
            left_group: self.left_group.map(|g| g.identity()),
            right_group: self.right_group.map(|g| g.identity()),
        })
    }
}

impl WsSubject {
    fn resolved(&self) -> bool {
        self.success.as_deref() != Some(FALSE_FLAG) && !self.id.is_empty()
    }

    pub fn into_subject(self) -> Subject {
        Subject {
            id: self.id,
            source_id: self.source_id,
            name: self.name,
            identifier: self.identifier_lookup.filter(|i| !i.is_empty()),
        }
    }

    pub fn into_member(self) -> GroupMember {
        GroupMember::subject(self.id, self.source_id)
    }
}

impl WsGetMembershipsResults {
    /// Answer for a single (subject, group) lookup.
    pub fn into_details(self) -> MembershipDetails {
        MembershipDetails {
            memberships: self
                .ws_memberships
                .into_iter()
                .filter(WsMembership::is_enabled)
                .filter_map(WsMembership::into_record)
                .collect(),
            subjects: self
                .ws_subjects
                .into_iter()
                .filter(WsSubject::resolved)
                .map(WsSubject::into_subject)
                .collect(),
            groups: self.ws_groups.into_iter().map(WsGroup::into_group).collect(),
        }
    }

    /// Every membership of the subject, skipping disabled ones.
    pub fn into_records(self) -> Vec<MembershipRecord> {
        self.ws_memberships
            .into_iter()
            .filter(WsMembership::is_enabled)
            .filter_map(WsMembership::into_record)
            .collect()
    }
}

impl WsGetMembersResults {
    /// Resolved subjects of the first (only) looked-up group.
    fn first_group_subjects(self) -> impl Iterator<Item = WsSubject> {
        self.results
            .into_iter()
            .next()
            .map(|result| result.ws_subjects)
            .unwrap_or_default()
            .into_iter()
            .filter(WsSubject::resolved)
    }

    /// True when the directory rejected the group lookup as unknown.
    pub fn group_not_found(&self) -> bool {
        self.results
            .first()
            .and_then(|r| r.result_metadata.as_ref())
            .map_or(false, |m| m.result_code.as_deref() == Some(GROUP_NOT_FOUND))
    }

    /// Members of the looked-up group as the tracer sees them.
    pub fn into_members(self) -> Vec<GroupMember> {
        self.first_group_subjects()
            .map(WsSubject::into_member)
            .collect()
    }

    /// Members of the looked-up group with their subject detail.
    pub fn into_subjects(self) -> Vec<Subject> {
        self.first_group_subjects()
            .map(WsSubject::into_subject)
            .collect()
    }
}

impl WsGetSubjectsResults {
    /// Subjects the lookup resolved. `SUBJECT_NOT_FOUND` entries are dropped.
    pub fn into_subjects(self) -> Vec<Subject> {
        self.ws_subjects
            .into_iter()
            .filter(WsSubject::resolved)
            .map(WsSubject::into_subject)
            .collect()
    }
}
