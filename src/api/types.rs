//! Wire models for the VPC, Code Engine, and global tagging APIs.
//!
//! Variant-shaped payloads (network ACL rule protocols and instance group
//! manager kinds) are decoded once here into tagged enums, so resource code
//! never inspects raw JSON to decide which fields are present.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One page of a cursor-paginated listing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<T> {
    /// Items on this page in server order.
    pub items: Vec<T>,
    /// Cursor for the following page, or `None` when this is the last page.
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// Builds a terminal page with no continuation cursor.
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Reference to another provider object by identifier.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Reference {
    /// Unique identifier of the referenced object.
    pub id: String,
    /// Display name, when the API includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// CRN of the referenced object, when the API includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crn: Option<String>,
}

/// Identity-only reference used in request bodies.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identity {
    /// Identifier of the referenced object.
    pub id: String,
}

impl Identity {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Zone reference returned on floating IPs.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ZoneReference {
    /// Zone name, for example `us-south-1`.
    pub name: String,
}

/// Action taken when a network ACL rule matches.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Let matching traffic through.
    Allow,
    /// Drop matching traffic.
    Deny,
}

impl RuleAction {
    /// Returns the API label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(format!("invalid action '{other}', valid values are allow|deny")),
        }
    }
}

/// Traffic direction a network ACL rule applies to.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
    /// Traffic entering the subnet.
    Inbound,
    /// Traffic leaving the subnet.
    Outbound,
}

impl RuleDirection {
    /// Returns the API label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl fmt::Display for RuleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            _ => Err(format!(
                "invalid direction '{value}', valid values are inbound|outbound"
            )),
        }
    }
}

/// TCP or UDP port bounds of a rule.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PortRange {
    /// Inclusive lower bound of the destination port range.
    #[serde(default)]
    pub destination_port_min: u16,
    /// Inclusive upper bound of the destination port range.
    #[serde(default)]
    pub destination_port_max: u16,
    /// Inclusive lower bound of the source port range.
    #[serde(default)]
    pub source_port_min: u16,
    /// Inclusive upper bound of the source port range.
    #[serde(default)]
    pub source_port_max: u16,
}

/// Protocol-specific part of a rule, discriminated by the `protocol` field.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum RuleProtocol {
    /// Matches every protocol.
    All,
    /// ICMP, optionally narrowed by type and code.
    Icmp {
        /// ICMP message type; absent matches every type.
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        icmp_type: Option<u8>,
        /// ICMP message code; absent matches every code.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<u8>,
    },
    /// TCP with port bounds.
    Tcp(PortRange),
    /// UDP with port bounds.
    Udp(PortRange),
}

/// Rule as returned by the network ACL and rule listing endpoints.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkAclRule {
    /// Rule identifier.
    pub id: String,
    /// User-defined rule name.
    pub name: String,
    /// Allow or deny.
    pub action: RuleAction,
    /// Inbound or outbound.
    pub direction: RuleDirection,
    /// IP version the rule applies to (`ipv4`).
    #[serde(default)]
    pub ip_version: String,
    /// Source IP address or CIDR block.
    pub source: String,
    /// Destination IP address or CIDR block.
    pub destination: String,
    /// Protocol and its parameters.
    #[serde(flatten)]
    pub protocol: RuleProtocol,
}

/// Request body for creating a single network ACL rule.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkAclRulePrototype {
    /// Rule name.
    pub name: String,
    /// Allow or deny.
    pub action: RuleAction,
    /// Inbound or outbound.
    pub direction: RuleDirection,
    /// Source IP address or CIDR block.
    pub source: String,
    /// Destination IP address or CIDR block.
    pub destination: String,
    /// Rule to insert this one in front of; absent appends at the end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Identity>,
    /// Protocol and its parameters.
    #[serde(flatten)]
    pub protocol: RuleProtocol,
}

/// Network ACL as returned by the API.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkAcl {
    /// ACL identifier.
    pub id: String,
    /// ACL name.
    pub name: String,
    /// Cloud resource name used for tagging.
    pub crn: String,
    /// VPC owning the ACL.
    pub vpc: Reference,
    /// Resource group of the ACL.
    #[serde(default)]
    pub resource_group: Option<Reference>,
    /// Ordered rules.
    #[serde(default)]
    pub rules: Vec<NetworkAclRule>,
    /// Subnets the ACL is attached to.
    #[serde(default)]
    pub subnets: Vec<Reference>,
}

/// Request body for creating a network ACL.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkAclPrototype {
    /// Optional ACL name; the server generates one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// VPC to create the ACL in.
    pub vpc: Identity,
    /// Optional resource group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<Identity>,
}

/// Merge-patch body for updating a network ACL.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkAclPatch {
    /// New ACL name.
    pub name: String,
}

/// Reference to a scheduled action on an instance group manager.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ManagerActionReference {
    /// Action identifier.
    pub id: String,
    /// Action name.
    #[serde(default)]
    pub name: String,
    /// Resource type label (`instance_group_manager_action`).
    #[serde(default)]
    pub resource_type: String,
}

/// Kind-specific part of an instance group manager.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "manager_type", rename_all = "lowercase")]
pub enum InstanceGroupManagerKind {
    /// Metric-driven autoscaling manager.
    Autoscale {
        /// Seconds of metrics aggregated before evaluation.
        #[serde(default)]
        aggregation_window: u32,
        /// Seconds to pause scaling after a scale action.
        #[serde(default)]
        cooldown: u32,
        /// Upper bound on group membership.
        #[serde(default)]
        max_membership_count: u32,
        /// Lower bound on group membership.
        #[serde(default)]
        min_membership_count: u32,
        /// Policies attached to the manager.
        #[serde(default)]
        policies: Vec<Reference>,
    },
    /// Manager driven by scheduled actions.
    Scheduled {
        /// Actions attached to the manager.
        #[serde(default)]
        actions: Vec<ManagerActionReference>,
    },
}

/// Instance group manager as returned by the listing endpoint.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceGroupManager {
    /// Manager identifier.
    pub id: String,
    /// Manager name.
    pub name: String,
    /// Kind-specific attributes.
    #[serde(flatten)]
    pub kind: InstanceGroupManagerKind,
}

/// Floating IP bound to a bare metal server network interface.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FloatingIp {
    /// Floating IP identifier.
    pub id: String,
    /// Floating IP name.
    pub name: String,
    /// Public address.
    pub address: String,
    /// Cloud resource name.
    pub crn: String,
    /// Lifecycle status (`available`, `pending`, `deleting`, `failed`).
    pub status: String,
    /// Zone of the floating IP.
    pub zone: ZoneReference,
    /// Network interface the address is bound to.
    #[serde(default)]
    pub target: Option<Reference>,
}

/// Reason attached to an image export job status.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct StatusReason {
    /// Snake-case reason code.
    #[serde(default)]
    pub code: String,
    /// Human-readable explanation.
    #[serde(default)]
    pub message: String,
    /// Link to documentation about the reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_info: Option<String>,
}

/// Cloud Object Storage bucket reference.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct BucketReference {
    /// Bucket CRN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crn: Option<String>,
    /// Bucket name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Cloud Object Storage object reference.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ObjectReference {
    /// Object name.
    #[serde(default)]
    pub name: String,
}

/// Image export job as returned by the API.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ImageExportJob {
    /// Job identifier.
    pub id: String,
    /// Job name.
    pub name: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Completion timestamp, absent while the job runs.
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Start timestamp, absent until the job starts.
    #[serde(default)]
    pub started_at: Option<String>,
    /// Base64 wrapped data key, absent for unencrypted images.
    #[serde(default)]
    pub encrypted_data_key: Option<String>,
    /// Export format (`qcow2`, `vhd`).
    pub format: String,
    /// Canonical URL of the job.
    pub href: String,
    /// Resource type label.
    pub resource_type: String,
    /// Job status.
    pub status: String,
    /// Reasons for the current status.
    #[serde(default)]
    pub status_reasons: Vec<StatusReason>,
    /// Target bucket.
    #[serde(default)]
    pub storage_bucket: Option<BucketReference>,
    /// Cloud Object Storage location of the exported image.
    #[serde(default)]
    pub storage_href: String,
    /// Exported object.
    #[serde(default)]
    pub storage_object: Option<ObjectReference>,
}

/// Environment variable attached to a Code Engine function.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EnvVar {
    /// Key inside the referenced secret or config map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Variable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Prefix applied to every key of a referenced map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Name of the referenced secret or config map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Variable kind (`literal`, `config_map_full_reference`, …).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Literal value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Detailed status of a Code Engine function.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FunctionStatus {
    /// Reason for the current status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Code Engine function as returned by the API.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CodeEngineFunction {
    /// Identifier of the function.
    #[serde(default)]
    pub id: Option<String>,
    /// Function name.
    pub name: String,
    /// Whether `code_reference` holds binary code.
    #[serde(default)]
    pub code_binary: bool,
    /// Entry point of the function code.
    #[serde(default)]
    pub code_main: Option<String>,
    /// Inline code or image reference.
    #[serde(default)]
    pub code_reference: String,
    /// Secret used to pull the code bundle.
    #[serde(default)]
    pub code_secret: Option<String>,
    /// Variables injected by the platform.
    #[serde(default)]
    pub computed_env_variables: Vec<EnvVar>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Public endpoint.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Private endpoint.
    #[serde(default)]
    pub endpoint_internal: Option<String>,
    /// Version tag used for optimistic concurrency.
    #[serde(default)]
    pub entity_tag: String,
    /// Canonical URL.
    #[serde(default)]
    pub href: Option<String>,
    /// Domain mapping visibility.
    #[serde(default)]
    pub managed_domain_mappings: String,
    /// Region of the project.
    #[serde(default)]
    pub region: Option<String>,
    /// Resource type label.
    #[serde(default)]
    pub resource_type: Option<String>,
    /// User-defined variables.
    #[serde(default)]
    pub run_env_variables: Vec<EnvVar>,
    /// Managed runtime (`nodejs-20`, `python-3.11`).
    #[serde(default)]
    pub runtime: String,
    /// Concurrent requests per instance.
    #[serde(default)]
    pub scale_concurrency: i64,
    /// vCPU limit per instance.
    #[serde(default)]
    pub scale_cpu_limit: String,
    /// Seconds an idle instance is kept.
    #[serde(default)]
    pub scale_down_delay: i64,
    /// Maximum execution time in seconds.
    #[serde(default)]
    pub scale_max_execution_time: i64,
    /// Memory limit per instance.
    #[serde(default)]
    pub scale_memory_limit: String,
    /// Overall status.
    #[serde(default)]
    pub status: Option<String>,
    /// Detailed status.
    #[serde(default)]
    pub status_details: FunctionStatus,
}

/// Category of global tags.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TagKind {
    /// Free-form user tags.
    User,
    /// `key:value` access management tags.
    Access,
}

impl TagKind {
    /// Returns the `tag_type` query value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Access => "access",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
