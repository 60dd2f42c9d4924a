//! Remote API seam consumed by resources and data sources.
//!
//! [`VpcApi`] and [`TagApi`] describe the calls the provider makes; the
//! [`http`] module implements them over HTTPS and `test_support` provides an
//! in-memory double.

pub mod http;
pub mod types;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use http::{Endpoints, HttpTagClient, HttpVpcClient};
pub use types::{
    CodeEngineFunction, FloatingIp, ImageExportJob, InstanceGroupManager,
    InstanceGroupManagerKind, NetworkAcl, NetworkAclPatch, NetworkAclPrototype, NetworkAclRule,
    NetworkAclRulePrototype, Page, RuleAction, RuleDirection, RuleProtocol, TagKind,
};

const NOT_FOUND: u16 = 404;

/// Failure reported by a remote call.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status code, absent when the request never produced a response.
    pub status: Option<u16>,
    /// Message extracted from the response body or transport error.
    pub message: String,
}

impl ApiError {
    /// Builds an error carrying an HTTP status.
    #[must_use]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Builds a 404 error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(NOT_FOUND, message)
    }

    /// Builds an error for a request that never produced a response.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Returns `true` when the remote object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(NOT_FOUND)
    }
}

/// Future returned by remote calls.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Calls against the VPC and Code Engine management APIs.
pub trait VpcApi: Send + Sync {
    /// Fetches a network ACL.
    fn get_network_acl<'a>(&'a self, id: &'a str) -> ApiFuture<'a, NetworkAcl>;

    /// Creates a network ACL. The server populates default rules.
    fn create_network_acl<'a>(
        &'a self,
        prototype: &'a NetworkAclPrototype,
    ) -> ApiFuture<'a, NetworkAcl>;

    /// Applies a merge patch to a network ACL.
    fn update_network_acl<'a>(
        &'a self,
        id: &'a str,
        patch: &'a NetworkAclPatch,
    ) -> ApiFuture<'a, NetworkAcl>;

    /// Deletes a network ACL.
    fn delete_network_acl<'a>(&'a self, id: &'a str) -> ApiFuture<'a, ()>;

    /// Lists one page of rules of a network ACL.
    fn list_network_acl_rules<'a>(
        &'a self,
        acl_id: &'a str,
        start: Option<&'a str>,
    ) -> ApiFuture<'a, Page<NetworkAclRule>>;

    /// Creates a rule on a network ACL.
    fn create_network_acl_rule<'a>(
        &'a self,
        acl_id: &'a str,
        prototype: &'a NetworkAclRulePrototype,
    ) -> ApiFuture<'a, NetworkAclRule>;

    /// Deletes a rule from a network ACL.
    fn delete_network_acl_rule<'a>(&'a self, acl_id: &'a str, rule_id: &'a str)
    -> ApiFuture<'a, ()>;

    /// Lists one page of managers of an instance group.
    fn list_instance_group_managers<'a>(
        &'a self,
        instance_group_id: &'a str,
        start: Option<&'a str>,
    ) -> ApiFuture<'a, Page<InstanceGroupManager>>;

    /// Fetches a floating IP bound to a bare metal server network interface.
    fn get_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, FloatingIp>;

    /// Binds a floating IP to a bare metal server network interface.
    fn add_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, FloatingIp>;

    /// Unbinds a floating IP from a bare metal server network interface.
    fn remove_bare_metal_nic_floating_ip<'a>(
        &'a self,
        server_id: &'a str,
        nic_id: &'a str,
        floating_ip_id: &'a str,
    ) -> ApiFuture<'a, ()>;

    /// Fetches an image export job.
    fn get_image_export_job<'a>(
        &'a self,
        image_id: &'a str,
        job_id: &'a str,
    ) -> ApiFuture<'a, ImageExportJob>;

    /// Fetches a Code Engine function by project and name.
    fn get_code_engine_function<'a>(
        &'a self,
        project_id: &'a str,
        name: &'a str,
    ) -> ApiFuture<'a, CodeEngineFunction>;
}

/// Calls against the global tagging API, keyed by CRN.
pub trait TagApi: Send + Sync {
    /// Returns the tags of `kind` attached to `crn`.
    fn get_tags<'a>(&'a self, crn: &'a str, kind: TagKind) -> ApiFuture<'a, Vec<String>>;

    /// Attaches tags to `crn`.
    fn attach_tags<'a>(
        &'a self,
        crn: &'a str,
        tags: &'a [String],
        kind: TagKind,
    ) -> ApiFuture<'a, ()>;

    /// Detaches tags from `crn`.
    fn detach_tags<'a>(
        &'a self,
        crn: &'a str,
        tags: &'a [String],
        kind: TagKind,
    ) -> ApiFuture<'a, ()>;
}
