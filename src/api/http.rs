//! HTTPS implementation of [`VpcApi`] and [`TagApi`] over `reqwest`.
//!
//! Requests authenticate with an IAM bearer token exchanged from an API key.
//! The token is cached and refreshed shortly before it expires.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::types::{
    CodeEngineFunction, FloatingIp, ImageExportJob, InstanceGroupManager, NetworkAcl,
    NetworkAclPatch, NetworkAclPrototype, NetworkAclRule, NetworkAclRulePrototype, Page, TagKind,
};
use super::{ApiError, ApiFuture, TagApi, VpcApi};
use crate::pagination::next_start_token;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const API_VERSION: &str = "2024-04-30";
const API_GENERATION: &str = "2";
const MERGE_PATCH: &str = "application/merge-patch+json";
const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Default IAM token endpoint.
pub const DEFAULT_IAM_ENDPOINT: &str = "https://iam.cloud.ibm.com/identity/token";
/// Default global tagging endpoint.
pub const DEFAULT_TAGGING_ENDPOINT: &str = "https://tags.global-search-tagging.cloud.ibm.com/v3";

/// Base URLs used by the HTTP clients.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Endpoints {
    /// VPC API base, for example `https://us-south.iaas.cloud.ibm.com/v1`.
    pub vpc: String,
    /// Code Engine API base, for example
    /// `https://api.us-south.codeengine.cloud.ibm.com/v2`.
    pub code_engine: String,
    /// Global tagging API base.
    pub tagging: String,
    /// IAM token exchange URL.
    pub iam: String,
}

impl Endpoints {
    /// Public endpoints for `region`.
    #[must_use]
    pub fn for_region(region: &str) -> Self {
        Self {
            vpc: format!("https://{region}.iaas.cloud.ibm.com/v1"),
            code_engine: format!("https://api.{region}.codeengine.cloud.ibm.com/v2"),
            tagging: String::from(DEFAULT_TAGGING_ENDPOINT),
            iam: String::from(DEFAULT_IAM_ENDPOINT),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Deserialize)]
struct ErrorItem {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Exchanges an API key for bearer tokens and caches the result.
struct IamAuthenticator {
    api_key: String,
    token_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl IamAuthenticator {
    async fn bearer(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at
        {
            return Ok(token.value.clone());
        }

        tracing::debug!(url = %self.token_url, "requesting IAM token");
        let response = http
            .post(&self.token_url)
            .form(&[
                ("grant_type", IAM_GRANT_TYPE),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|err| ApiError::transport(format!("IAM token request failed: {err}")))?;
        let fresh: TokenResponse = decode(response).await?;
        let value = fresh.access_token.clone();
        *cached = Some(CachedToken {
            value: fresh.access_token,
            expires_at: Instant::now() + Duration::from_secs(fresh.expires_in),
        });
        Ok(value)
    }
}

/// Shared HTTP client and credentials.
#[derive(Clone)]
struct Transport {
    http: reqwest::Client,
    auth: Arc<IamAuthenticator>,
    endpoints: Endpoints,
}

impl Transport {
    fn new(api_key: &str, endpoints: Endpoints) -> Result<Self, ApiError> {
        if api_key.trim().is_empty() {
            return Err(ApiError::transport("an API key is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|err| ApiError::transport(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            auth: Arc::new(IamAuthenticator {
                api_key: api_key.to_owned(),
                token_url: endpoints.iam.clone(),
                cached: Mutex::new(None),
            }),
            endpoints,
        })
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, ApiError> {
        let token = self.auth.bearer(&self.http).await?;
        tracing::debug!(%method, %url, "sending request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }
}

fn build_url(base: &str, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = Url::parse(base)
        .map_err(|err| ApiError::transport(format!("invalid endpoint '{base}': {err}")))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::transport(format!("endpoint '{base}' cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn vpc_url(base: &str, segments: &[&str], start: Option<&str>) -> Result<Url, ApiError> {
    let mut url = build_url(base, segments)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("version", API_VERSION)
            .append_pair("generation", API_GENERATION);
        if let Some(cursor) = start.filter(|cursor| !cursor.is_empty()) {
            query.append_pair("start", cursor);
        }
    }
    Ok(url)
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .map(|item| item.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_owned();
            if text.is_empty() {
                status.to_string()
            } else {
                text
            }
        })
}

async fn checked_body(response: reqwest::Response) -> Result<Vec<u8>, ApiError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| ApiError::transport(err.to_string()))?;
    if status.is_success() {
        return Ok(body.to_vec());
    }
    Err(ApiError::status(status.as_u16(), error_message(status, &body)))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let body = checked_body(response).await?;
    serde_json::from_slice(&body)
        .map_err(|err| ApiError::transport(format!("failed to decode response: {err}")))
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|err| ApiError::transport(err.to_string()))?;
    decode(response).await
}

async fn send_empty(request: RequestBuilder) -> Result<(), ApiError> {
    let response = request
        .send()
        .await
        .map_err(|err| ApiError::transport(err.to_string()))?;
    checked_body(response).await.map(drop)
}

#[derive(Deserialize)]
struct NextLink {
    href: String,
}

#[derive(Deserialize)]
struct RuleCollection {
    #[serde(default)]
    rules: Vec<NetworkAclRule>,
    #[serde(default)]
    next: Option<NextLink>,
}

#[derive(Deserialize)]
struct ManagerCollection {
    #[serde(default)]
    managers: Vec<InstanceGroupManager>,
    #[serde(default)]
    next: Option<NextLink>,
}

fn into_page<T>(items: Vec<T>, next: Option<NextLink>) -> Page<T> {
    Page {
        items,
        next: next.and_then(|link| next_start_token(&link.href)),
    }
}

/// [`VpcApi`] over HTTPS.
#[derive(Clone)]
pub struct HttpVpcClient {
    transport: Transport,
}

impl HttpVpcClient {
    /// Builds a client authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the key is blank or the HTTP client cannot
    /// be constructed.
    pub fn new(api_key: &str, endpoints: Endpoints) -> Result<Self, ApiError> {
        Ok(Self {
            transport: Transport::new(api_key, endpoints)?,
        })
    }

    /// Returns a tagging client sharing this client's credentials.
    #[must_use]
    pub fn tag_client(&self) -> HttpTagClient {
        HttpTagClient {
            transport: self.transport.clone(),
        }
    }

    fn url(&self, segments: &[&str], start: Option<&str>) -> Result<Url, ApiError> {
        vpc_url(&self.transport.endpoints.vpc, segments, start)
    }

    fn nic_floating_ip_url(
        &self,
        server_id: &str,
        nic_id: &str,
        floating_ip_id: &str,
    ) -> Result<Url, ApiError> {
        self.url(
            &[
                "bare_metal_servers",
                server_id,
                "network_interfaces",
                nic_id,
                "floating_ips",
                floating_ip_id,
            ],
            None,
        )
    }
}

impl VpcApi for HttpVpcClient {
    fn get_network_acl<'a>(&'a self, id: &'a str) -> ApiFuture<'a, NetworkAcl> {
        Box::pin(async move {
            let url = self.url(&["network_acls", id], None)?;
            send_json(self.transport.request(Method::GET, url).await?).await
        })
    }

    fn create_network_acl<'a>(
        &'a self,
        prototype: &'a NetworkAclPrototype,
    ) -> ApiFuture<'a, NetworkAcl> {
        Box::pin(async move {
            let url = self.url(&["network_acls"], None)?;
            let request = self.transport.request(Method::POST, url).await?;
            send_json(request.json(prototype)).await
        })
    }

    fn update_network_acl<'a>(
        &'a self,
        id: &'a str,
        patch: &'a NetworkAclPatch,
    ) -> ApiFuture<'a, NetworkAcl> {
        Box::pin(async move {
            let url = self.url(&["network_acls", id], None)?;
            let body = serde_json::to_vec(patch)
                .map_err(|err| ApiError::transport(format!("failed to encode patch: {err}")))?;
            let request = self.transport.request(Method::PATCH, url).await?;
            send_json(request.header(CONTENT_TYPE, MERGE_PATCH).body(body)).await
        })
    }

    fn delete_network_acl<'a>(&'a self, id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.url(&["network_acls", id], None)?;
            send_empty(self.transport.request(Method::DELETE, url).await?).await
        })
    }

    fn list_network_acl_rules<'a>(
        &'a self,
        acl_id: &'a str,
        start: Option<&'a str>,
    ) -> ApiFuture<'a, Page<NetworkAclRule>> {
        Box::pin(async move {
            let url = self.url(&["network_acls", acl_id, "rules"], start)?;
            let collection: RuleCollection =
                send_json(self.transport.request(Method::GET, url).await?).await?;
            Ok(into_page(collection.rules, collection.next))
        })
    }

    fn create_network_acl_rule<'a>(
        &'a self,
        acl_id: &'a str,
        prototype: &'a NetworkAclRulePrototype,
    ) -> ApiFuture<'a, NetworkAclRule> {
        Box::pin(async move {
            let url = self.url(&["network_acls", acl_id, "rules"], None)?;
            let request = self.transport.request(Method::POST, url).await?;
            send_json(request.json(prototype)).await
        })
    }

    fn delete_network_acl_rule<'a>(
        &'a self,
        acl_id: &'a str,
        rule_id: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.url(&["network_acls", acl_id, "rules", rule_id], None)?;
            send_empty(self.transport.request(Method::DELETE, url).await?).await
        })
    }

    fn list_instance_group_managers<'a>(
        &'a self,
        instance_group_id: &'a str,
        start: Option<&'a str>,
    ) -> ApiFuture<'a, Page<InstanceGroupManager>> {
        Box::pin(async move {
            let url = self.url(&["instance_groups", instance_group_id, "managers"], start)?;
            let collection: ManagerCollection =
                send_json(self.transport.request(Method::GET, url).await?).await?;
            Ok(into_page(collection.managers, collection.next))
        })
    }

    fn get_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, FloatingIp> {
        Box::pin(async move {
            let url = self.nic_floating_ip_url(server_id, nic_id, floating_ip_id)?;
            send_json(self.transport.request(Method::GET, url).await?).await
        })
    }

    fn add_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, FloatingIp> {
        Box::pin(async move {
            let url = self.nic_floating_ip_url(server_id, nic_id, floating_ip_id)?;
            send_json(self.transport.request(Method::PUT, url).await?).await
        })
    }

    fn remove_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let url = self.nic_floating_ip_url(server_id, nic_id, floating_ip_id)?;
            send_empty(self.transport.request(Method::DELETE, url).await?).await
        })
    }

    fn get_image_export_job<'a>(
        &'a self,
        image_id: &'a str,
        job_id: &'a str,
    ) -> ApiFuture<'a, ImageExportJob> {
        Box::pin(async move {
            let url = self.url(&["images", image_id, "export_jobs", job_id], None)?;
            send_json(self.transport.request(Method::GET, url).await?).await
        })
    }

    fn get_code_engine_function<'a>(
        &'a self,
        project_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, CodeEngineFunction> {
        Box::pin(async move {
            let url = build_url(
                &self.transport.endpoints.code_engine,
                &["projects", project_id, "functions", name],
            )?;
            send_json(self.transport.request(Method::GET, url).await?).await
        })
    }
}

#[derive(Deserialize)]
struct TagItem {
    name: String,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    items: Vec<TagItem>,
}

#[derive(Serialize)]
struct TaggedResource<'a> {
    resource_id: &'a str,
}

#[derive(Serialize)]
struct TagUpdate<'a> {
    resources: [TaggedResource<'a>; 1],
    tag_names: &'a [String],
}

/// [`TagApi`] over HTTPS.
#[derive(Clone)]
pub struct HttpTagClient {
    transport: Transport,
}

impl HttpTagClient {
    /// Builds a tagging client authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the key is blank or the HTTP client cannot
    /// be constructed.
    pub fn new(api_key: &str, endpoints: Endpoints) -> Result<Self, ApiError> {
        Ok(Self {
            transport: Transport::new(api_key, endpoints)?,
        })
    }

    async fn update(
        &self,
        action: &str,
        crn: &str,
        tags: &[String],
        kind: TagKind,
    ) -> Result<(), ApiError> {
        let mut url = build_url(&self.transport.endpoints.tagging, &["tags", action])?;
        url.query_pairs_mut().append_pair("tag_type", kind.as_str());
        let body = TagUpdate {
            resources: [TaggedResource { resource_id: crn }],
            tag_names: tags,
        };
        let request = self.transport.request(Method::POST, url).await?;
        send_empty(request.json(&body)).await
    }
}

impl TagApi for HttpTagClient {
    fn get_tags<'a>(&'a self, crn: &'a str, kind: TagKind) -> ApiFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut url = build_url(&self.transport.endpoints.tagging, &["tags"])?;
            url.query_pairs_mut()
                .append_pair("attached_to", crn)
                .append_pair("tag_type", kind.as_str());
            let list: TagList = send_json(self.transport.request(Method::GET, url).await?).await?;
            Ok(list.items.into_iter().map(|item| item.name).collect())
        })
    }

    fn attach_tags<'a>(
        &'a self,
        crn: &'a str,
        tags: &'a [String],
        kind: TagKind,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move { self.update("attach", crn, tags, kind).await })
    }

    fn detach_tags<'a>(
        &'a self,
        crn: &'a str,
        tags: &'a [String],
        kind: TagKind,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move { self.update("detach", crn, tags, kind).await })
    }
}
