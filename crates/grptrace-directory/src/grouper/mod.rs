//! Grouper Web Services REST client.
//!
//! Talks to the JSON flavour of the Grouper WS API (`.../servicesRest/json/v4_0_000`):
//!
//! - `POST {base}/memberships` (`WsRestGetMembershipsRequest`) for the
//!   membership of a subject in one group, or in every group
//! - `POST {base}/groups` (`WsRestGetMembersRequest`) for the members of a
//!   group, `memberFilter=Immediate` while tracing
//! - `POST {base}/subjects` (`WsRestGetSubjectsRequest`) to resolve a subject
//!   by id or identifier
//!
//! Requests are sent once; there are no retries. Any failure surfaces as a
//! [`DirectoryError`] and reaches the tracer as `DirectoryUnavailable`.

mod wire;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use grptrace_domain::model::{GroupMember, MembershipDetails, MembershipRecord, Subject};
use grptrace_domain::{DirectoryClient, DomainResult};

use crate::error::{DirectoryError, DirectoryResult};
use crate::lookup::{DirectoryLookup, MemberFilter, SubjectLookup};

pub use wire::{
    WsGetMembersResults, WsGetMembershipsResults, WsGetSubjectsResults, WsGroup, WsGroupDetail,
    WsMembership, WsSubject,
};
use wire::{
    GetMembersEnvelope, GetMembersResponse, GetMembershipsEnvelope, GetMembershipsResponse,
    GetSubjectsEnvelope, GetSubjectsResponse, WsRestGetMembersRequest,
    WsRestGetMembershipsRequest, WsRestGetSubjectsRequest,
};

const ACT_AS_SUBJECT_ID: &str = "x-grouper-actassubjectid";
const ACT_AS_SUBJECT_SOURCE_ID: &str = "x-grouper-actassubjectsourceid";
const ACT_AS_SUBJECT_IDENTIFIER: &str = "x-grouper-actassubjectidentifier";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a Grouper WS endpoint.
#[derive(Debug, Clone)]
pub struct GrouperConfig {
    /// Base URL including the version path, without trailing slash.
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Subject to act as (`X-Grouper-actAsSubjectId`).
    pub act_as_subject_id: Option<String>,
    pub act_as_subject_source_id: Option<String>,
    pub act_as_subject_identifier: Option<String>,
    pub request_timeout: Duration,
}

impl GrouperConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            act_as_subject_id: None,
            act_as_subject_source_id: None,
            act_as_subject_identifier: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets HTTP basic auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Grouper WS implementation of [`DirectoryClient`].
#[derive(Debug, Clone)]
pub struct GrouperClient {
    http: reqwest::Client,
    config: GrouperConfig,
}

impl GrouperClient {
    /// Creates a client. Fails on an empty base URL or act-as values that
    /// are not valid header values.
    pub fn new(config: GrouperConfig) -> DirectoryResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(DirectoryError::InvalidConfig {
                message: "Grouper base URL is required".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(act_as_headers(&config)?)
            .build()?;

        Ok(Self { http, config })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &GrouperConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> DirectoryResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(self.endpoint(path)).json(body);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(status, &text);
            warn!(status = status.as_u16(), message = %message, path, "Grouper API request failed");
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| DirectoryError::InvalidResponse {
            message: format!("{path}: {e}"),
        })
    }

    /// Memberships of a subject, in `group_name` only when given.
    #[instrument(skip(self))]
    pub async fn get_memberships(
        &self,
        subject_id: &str,
        subject_source_id: Option<&str>,
        group_name: Option<&str>,
    ) -> DirectoryResult<WsGetMembershipsResults> {
        let body = GetMembershipsEnvelope {
            request: WsRestGetMembershipsRequest::new(subject_id, subject_source_id, group_name),
        };
        let response: GetMembershipsResponse = self.post("memberships", &body).await?;
        debug!(
            memberships = response.results.ws_memberships.len(),
            "Fetched memberships"
        );
        Ok(response.results)
    }

    /// Members of a group passing `filter`, with subject detail.
    #[instrument(skip(self))]
    pub async fn get_members(
        &self,
        group_name: &str,
        filter: MemberFilter,
    ) -> DirectoryResult<WsGetMembersResults> {
        self.fetch_members(WsRestGetMembersRequest::new(group_name, filter))
            .await
    }

    async fn fetch_members(
        &self,
        request: WsRestGetMembersRequest,
    ) -> DirectoryResult<WsGetMembersResults> {
        let body = GetMembersEnvelope { request };
        let response: GetMembersResponse = self.post("groups", &body).await?;
        Ok(response.results)
    }

    /// Subjects matching a lookup by id or identifier.
    #[instrument(skip(self))]
    pub async fn get_subjects(
        &self,
        lookup: &SubjectLookup,
    ) -> DirectoryResult<WsGetSubjectsResults> {
        let body = GetSubjectsEnvelope {
            request: WsRestGetSubjectsRequest::new(lookup),
        };
        let response: GetSubjectsResponse = self.post("subjects", &body).await?;
        debug!(
            subjects = response.results.ws_subjects.len(),
            "Fetched subjects"
        );
        Ok(response.results)
    }
}

#[async_trait]
impl DirectoryClient for GrouperClient {
    async fn get_membership_details(
        &self,
        subject_id: &str,
        group_name: &str,
        subject_source_id: Option<&str>,
    ) -> DomainResult<MembershipDetails> {
        let results = self
            .get_memberships(subject_id, subject_source_id, Some(group_name))
            .await?;
        Ok(results.into_details())
    }

    async fn get_subject_direct_memberships(
        &self,
        subject_id: &str,
        subject_source_id: Option<&str>,
    ) -> DomainResult<Vec<MembershipRecord>> {
        let results = self
            .get_memberships(subject_id, subject_source_id, None)
            .await?;
        Ok(results.into_records())
    }

    async fn get_group_direct_members(&self, group_name: &str) -> DomainResult<Vec<GroupMember>> {
        let results = self
            .fetch_members(WsRestGetMembersRequest::immediate(group_name))
            .await?;
        Ok(results.into_members())
    }
}

#[async_trait]
impl DirectoryLookup for GrouperClient {
    async fn list_members(
        &self,
        group_name: &str,
        filter: MemberFilter,
    ) -> DirectoryResult<Vec<Subject>> {
        let results = self.get_members(group_name, filter).await?;
        if results.group_not_found() {
            return Err(DirectoryError::GroupNotFound {
                group_name: group_name.to_string(),
            });
        }
        Ok(results.into_subjects())
    }

    async fn find_subjects(&self, lookup: &SubjectLookup) -> DirectoryResult<Vec<Subject>> {
        Ok(self.get_subjects(lookup).await?.into_subjects())
    }
}

/// Builds the act-as headers sent with every request.
fn act_as_headers(config: &GrouperConfig) -> DirectoryResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let pairs = [
        (ACT_AS_SUBJECT_ID, &config.act_as_subject_id),
        (ACT_AS_SUBJECT_SOURCE_ID, &config.act_as_subject_source_id),
        (ACT_AS_SUBJECT_IDENTIFIER, &config.act_as_subject_identifier),
    ];

    for (name, value) in pairs {
        let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };
        let value = HeaderValue::from_str(value).map_err(|e| DirectoryError::InvalidConfig {
            message: format!("{name}: {e}"),
        })?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

/// Extracts a readable message from a failed response.
///
/// JSON bodies contribute their `error` or `message` field; any other
/// non-empty body is used verbatim.
fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || format!("Grouper API error: {status}");

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => ["error", "message"]
            .iter()
            .find_map(|key| {
                json.get(key)
                    .and_then(|v| v.as_str())
                    .filter(|m| !m.is_empty())
            })
            .map(str::to_string)
            .unwrap_or_else(fallback),
        Err(_) if !body.trim().is_empty() => body.to_string(),
        Err(_) => fallback(),
    }
}
