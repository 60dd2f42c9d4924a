//! `ibm_is_network_acl`: a network ACL with an ordered list of inline rules.
//!
//! The server seeds every new ACL with default allow-all rules. Creation
//! removes them and installs the configured rules in order, so an empty rule
//! list yields an ACL that denies everything. Rule updates are applied the
//! same way: clear, then recreate.

pub mod rules;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::api::types::Identity;
use crate::api::{NetworkAcl, NetworkAclPatch, NetworkAclPrototype, NetworkAclRulePrototype, TagKind};
use crate::context::ProviderContext;
use crate::error::{Operation, ProviderError, Scope};
use crate::resources::validation;
use crate::resources::{ProviderFuture, Resource};
use crate::tags;

pub use rules::{IcmpSpec, PortSpec, RuleSpec, RuleState};

/// Resource type name.
pub const RESOURCE: &str = "ibm_is_network_acl";

/// User configuration of a network ACL.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkAclConfig {
    /// ACL name; generated by the server when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// VPC to create the ACL in.
    pub vpc: String,
    /// Resource group ID; the account default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    /// User tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Access management tags.
    #[serde(default)]
    pub access_tags: Vec<String>,
    /// Ordered inline rules.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl NetworkAclConfig {
    /// Validates every field and builds the rule creation requests.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<Vec<NetworkAclRulePrototype>, String> {
        if self.vpc.trim().is_empty() {
            return Err(String::from("vpc is required"));
        }
        if let Some(name) = &self.name {
            validation::resource_name("name", name)?;
        }
        for tag in &self.tags {
            validation::user_tag(tag)?;
        }
        for tag in &self.access_tags {
            validation::access_tag(tag)?;
        }
        rules::to_prototypes(&self.rules)
    }
}

/// State of a network ACL.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NetworkAclState {
    /// ACL identifier.
    pub id: String,
    /// ACL name.
    pub name: String,
    /// VPC ID.
    pub vpc: String,
    /// Resource group ID.
    pub resource_group: Option<String>,
    /// Resource group name.
    pub resource_group_name: Option<String>,
    /// Cloud resource name.
    pub crn: String,
    /// User tags.
    pub tags: Vec<String>,
    /// Access management tags.
    pub access_tags: Vec<String>,
    /// Rules in evaluation order.
    pub rules: Vec<RuleState>,
    /// Console page listing network ACLs.
    pub resource_controller_url: String,
    /// Name shown in the console.
    pub resource_name: String,
}

/// Lifecycle of `ibm_is_network_acl`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NetworkAclResource;

fn same_set(left: &[String], right: &[String]) -> bool {
    left.iter().collect::<BTreeSet<_>>() == right.iter().collect::<BTreeSet<_>>()
}

async fn read_acl(
    ctx: &ProviderContext,
    id: &str,
    scope: Scope,
) -> Result<Option<NetworkAclState>, ProviderError> {
    let api = ctx.vpc(scope)?;
    let acl = match api.get_network_acl(id).await {
        Ok(acl) => acl,
        Err(err) if err.is_not_found() => {
            tracing::debug!(%id, "network ACL not found");
            return Ok(None);
        }
        Err(err) => return Err(scope.remote("get_network_acl", err)),
    };
    let tag_api = ctx.tags(scope)?;
    let user_tags = tags::read_tags(tag_api, id, &acl.crn, TagKind::User).await;
    let access_tags = tags::read_tags(tag_api, id, &acl.crn, TagKind::Access).await;
    Ok(Some(state_from(ctx, acl, user_tags, access_tags)))
}

fn state_from(
    ctx: &ProviderContext,
    acl: NetworkAcl,
    user_tags: Vec<String>,
    access_tags: Vec<String>,
) -> NetworkAclState {
    let subnets = acl.subnets.len();
    let (resource_group, resource_group_name) = acl
        .resource_group
        .map_or((None, None), |group| (Some(group.id), group.name));
    NetworkAclState {
        rules: acl
            .rules
            .iter()
            .map(|rule| RuleState::from_api(rule, subnets))
            .collect(),
        resource_controller_url: format!("{}/vpc-ext/network/acl", ctx.console_url()),
        resource_name: acl.name.clone(),
        id: acl.id,
        name: acl.name,
        vpc: acl.vpc.id,
        resource_group,
        resource_group_name,
        crn: acl.crn,
        tags: user_tags,
        access_tags,
    }
}

impl Resource for NetworkAclResource {
    type Config = NetworkAclConfig;
    type State = NetworkAclState;

    const NAME: &'static str = RESOURCE;

    fn create<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        config: &'a NetworkAclConfig,
    ) -> ProviderFuture<'a, NetworkAclState> {
        Box::pin(async move {
            let scope = Scope::new(RESOURCE, Operation::Create);
            let prototypes = config.validate().map_err(|msg| scope.validation(msg))?;
            let api = ctx.vpc(scope)?;

            let prototype = NetworkAclPrototype {
                name: config.name.clone(),
                vpc: Identity::new(config.vpc.as_str()),
                resource_group: config.resource_group.as_deref().map(Identity::new),
            };
            let acl = api
                .create_network_acl(&prototype)
                .await
                .map_err(|err| scope.remote("create_network_acl", err))?;
            tracing::info!(id = %acl.id, "network ACL created");

            rules::clear_rules(api, &acl.id, scope).await?;
            rules::create_rules(api, &acl.id, &prototypes, scope).await?;

            let tag_api = ctx.tags(scope)?;
            if !config.tags.is_empty() || !ctx.env_tags().is_empty() {
                tags::update_tags_or_warn(
                    tag_api,
                    &acl.id,
                    &acl.crn,
                    &[],
                    &config.tags,
                    TagKind::User,
                    ctx.env_tags(),
                )
                .await;
            }
            if !config.access_tags.is_empty() {
                tags::update_tags_or_warn(
                    tag_api,
                    &acl.id,
                    &acl.crn,
                    &[],
                    &config.access_tags,
                    TagKind::Access,
                    &[],
                )
                .await;
            }

            read_acl(ctx, &acl.id, scope).await?.ok_or_else(|| {
                scope.remote(
                    "get_network_acl",
                    crate::api::ApiError::not_found(format!(
                        "network ACL {} disappeared after creation",
                        acl.id
                    )),
                )
            })
        })
    }

    fn read<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        id: &'a str,
    ) -> ProviderFuture<'a, Option<NetworkAclState>> {
        Box::pin(async move { read_acl(ctx, id, Scope::new(RESOURCE, Operation::Read)).await })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        prior: &'a NetworkAclState,
        config: &'a NetworkAclConfig,
    ) -> ProviderFuture<'a, Option<NetworkAclState>> {
        Box::pin(async move {
            let scope = Scope::new(RESOURCE, Operation::Update);
            let prototypes = config.validate().map_err(|msg| scope.validation(msg))?;
            let api = ctx.vpc(scope)?;
            let id = prior.id.as_str();

            if let Some(name) = config.name.as_ref().filter(|name| **name != prior.name) {
                let patch = NetworkAclPatch { name: name.clone() };
                api.update_network_acl(id, &patch)
                    .await
                    .map_err(|err| scope.remote("update_network_acl", err))?;
                tracing::info!(%id, %name, "network ACL renamed");
            }

            let tag_api = ctx.tags(scope)?;
            let desired_tags = tags::with_env_tags(&config.tags, ctx.env_tags());
            if !same_set(&prior.tags, &desired_tags) {
                tags::update_tags_or_warn(
                    tag_api,
                    id,
                    &prior.crn,
                    &prior.tags,
                    &config.tags,
                    TagKind::User,
                    ctx.env_tags(),
                )
                .await;
            }
            if !same_set(&prior.access_tags, &config.access_tags) {
                tags::update_tags_or_warn(
                    tag_api,
                    id,
                    &prior.crn,
                    &prior.access_tags,
                    &config.access_tags,
                    TagKind::Access,
                    &[],
                )
                .await;
            }

            if !rules::rules_match(&prior.rules, &prototypes) {
                rules::clear_rules(api, id, scope).await?;
                rules::create_rules(api, id, &prototypes, scope).await?;
            }

            read_acl(ctx, id, scope).await
        })
    }

    fn delete<'a>(&'a self, ctx: &'a ProviderContext, id: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let scope = Scope::new(RESOURCE, Operation::Delete);
            let api = ctx.vpc(scope)?;
            match api.get_network_acl(id).await {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    tracing::debug!(%id, "network ACL already gone");
                    return Ok(());
                }
                Err(err) => return Err(scope.remote("get_network_acl", err)),
            }
            api.delete_network_acl(id)
                .await
                .map_err(|err| scope.remote("delete_network_acl", err))?;
            tracing::info!(%id, "network ACL deleted");
            Ok(())
        })
    }

    fn exists<'a>(&'a self, ctx: &'a ProviderContext, id: &'a str) -> ProviderFuture<'a, bool> {
        Box::pin(async move {
            let scope = Scope::new(RESOURCE, Operation::Exists);
            match ctx.vpc(scope)?.get_network_acl(id).await {
                Ok(_) => Ok(true),
                Err(err) if err.is_not_found() => Ok(false),
                Err(err) => Err(scope.remote("get_network_acl", err)),
            }
        })
    }
}
