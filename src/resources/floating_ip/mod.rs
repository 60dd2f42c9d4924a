//! `ibm_is_bare_metal_server_network_interface_floating_ip`: binds an
//! existing floating IP to a bare metal server network interface.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{FloatingIp, VpcApi};
use crate::context::ProviderContext;
use crate::error::{Operation, ProviderError, Scope};
use crate::id::{NicFloatingIpId, trailing_segment};
use crate::poll::{Observation, WaitSpec, wait_for_state};
use crate::resources::{ProviderFuture, Resource};

/// Resource type name.
pub const RESOURCE: &str = "ibm_is_bare_metal_server_network_interface_floating_ip";

const GET_CALL: &str = "get_bare_metal_nic_floating_ip";

const PENDING: &str = "pending";
const AVAILABLE: &str = "available";
const FAILED: &str = "failed";
const DELETING: &str = "deleting";
const DELETED: &str = "deleted";

/// User configuration of a floating IP binding.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FloatingIpConfig {
    /// Bare metal server ID.
    pub bare_metal_server: String,
    /// Network interface ID, or a `server/interface` pair.
    pub network_interface: String,
    /// Floating IP ID.
    pub floating_ip: String,
}

impl FloatingIpConfig {
    /// Checks that every identifier is present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first empty field.
    pub fn validate(&self) -> Result<(), String> {
        [
            ("bare_metal_server", self.bare_metal_server.as_str()),
            ("network_interface", self.network_interface_id()),
            ("floating_ip", self.floating_ip.as_str()),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map_or(Ok(()), |(field, _)| Err(format!("{field} is required")))
    }

    /// Network interface ID with any server prefix removed.
    #[must_use]
    pub fn network_interface_id(&self) -> &str {
        trailing_segment(&self.network_interface)
    }
}

/// State of a floating IP binding.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FloatingIpState {
    /// Composite `server/interface/floating_ip` identifier.
    pub id: String,
    /// Bare metal server ID.
    pub bare_metal_server: String,
    /// Network interface ID.
    pub network_interface: String,
    /// Floating IP ID.
    pub floating_ip: String,
    /// Floating IP name.
    pub name: String,
    /// Public address.
    pub address: String,
    /// Lifecycle status.
    pub status: String,
    /// Zone name.
    pub zone: String,
    /// Cloud resource name.
    pub crn: String,
    /// ID of the object the floating IP is bound to.
    pub target: Option<String>,
}

impl FloatingIpState {
    fn from_api(id: &NicFloatingIpId, floating_ip: FloatingIp) -> Self {
        Self {
            id: id.to_string(),
            bare_metal_server: id.server.clone(),
            network_interface: id.nic.clone(),
            floating_ip: floating_ip.id,
            name: floating_ip.name,
            address: floating_ip.address,
            status: floating_ip.status,
            zone: floating_ip.zone.name,
            crn: floating_ip.crn,
            target: floating_ip.target.map(|target| target.id),
        }
    }
}

/// Lifecycle of a floating IP bound to a bare metal server interface.
#[derive(Clone, Copy, Debug, Default)]
pub struct NicFloatingIpResource;

async fn bind(
    ctx: &ProviderContext,
    scope: Scope,
    server: &str,
    nic: &str,
    floating_ip: &str,
    timeout: Duration,
) -> Result<FloatingIpState, ProviderError> {
    let api = ctx.vpc(scope)?;
    let mut bound = api
        .add_bare_metal_nic_floating_ip(server, nic, floating_ip)
        .await
        .map_err(|err| scope.remote("add_bare_metal_nic_floating_ip", err))?;
    let id = NicFloatingIpId {
        server: server.to_owned(),
        nic: nic.to_owned(),
        floating_ip: bound.id.clone(),
    };
    tracing::info!(%id, status = %bound.status, "floating IP bound");

    if bound.status == PENDING {
        bound.status = wait_available(ctx, api, scope, &id, timeout).await?;
        if bound.status == FAILED {
            tracing::warn!(%id, "floating IP binding failed");
        }
    }
    Ok(FloatingIpState::from_api(&id, bound))
}

async fn wait_available(
    ctx: &ProviderContext,
    api: &dyn VpcApi,
    scope: Scope,
    id: &NicFloatingIpId,
    timeout: Duration,
) -> Result<String, ProviderError> {
    let spec = WaitSpec {
        pending: &[PENDING],
        target: &[AVAILABLE, FAILED],
        gone: None,
        interval: ctx.poll_interval(),
        timeout,
    };
    let (server, nic, floating_ip) = (id.server.as_str(), id.nic.as_str(), id.floating_ip.as_str());
    let mut last_status = None;
    let outcome = wait_for_state(spec, ctx.cancellation(), &mut last_status, move || async move {
        api.get_bare_metal_nic_floating_ip(server, nic, floating_ip)
            .await
            .map(|found| Observation::status(binding_label(&found.status)))
    })
    .await;
    outcome.map_err(|err| scope.poll(GET_CALL, &id.to_string(), last_status, err))
}

/// Collapses every non-terminal binding status (`pci_pending` and the like)
/// into `pending`.
fn binding_label(status: &str) -> &str {
    if status == AVAILABLE || status == FAILED {
        status
    } else {
        PENDING
    }
}

async fn wait_removed(
    ctx: &ProviderContext,
    api: &dyn VpcApi,
    scope: Scope,
    id: &NicFloatingIpId,
) -> Result<String, ProviderError> {
    let spec = WaitSpec {
        pending: &[AVAILABLE, DELETING, PENDING],
        target: &[DELETED, FAILED],
        gone: Some(DELETED),
        interval: ctx.poll_interval(),
        timeout: ctx.timeouts().delete,
    };
    let (server, nic, floating_ip) = (id.server.as_str(), id.nic.as_str(), id.floating_ip.as_str());
    let mut last_status = None;
    let outcome = wait_for_state(spec, ctx.cancellation(), &mut last_status, move || async move {
        match api.get_bare_metal_nic_floating_ip(server, nic, floating_ip).await {
            Ok(_) => Ok(Observation::status(DELETING)),
            Err(err) if err.is_not_found() => Ok(Observation::Gone),
            Err(err) => Err(err),
        }
    })
    .await;
    outcome.map_err(|err| scope.poll(GET_CALL, &id.to_string(), last_status, err))
}

async fn read_binding(
    ctx: &ProviderContext,
    id: &str,
    scope: Scope,
) -> Result<Option<FloatingIpState>, ProviderError> {
    let parsed = NicFloatingIpId::parse(id).map_err(|err| scope.invalid_id(&err))?;
    let api = ctx.vpc(scope)?;
    match api
        .get_bare_metal_nic_floating_ip(&parsed.server, &parsed.nic, &parsed.floating_ip)
        .await
    {
        Ok(found) => Ok(Some(FloatingIpState::from_api(&parsed, found))),
        Err(err) if err.is_not_found() => {
            tracing::debug!(%id, "floating IP binding not found");
            Ok(None)
        }
        Err(err) => Err(scope.remote(GET_CALL, err)),
    }
}

impl Resource for NicFloatingIpResource {
    type Config = FloatingIpConfig;
    type State = FloatingIpState;

    const NAME: &'static str = RESOURCE;

    fn create<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        config: &'a FloatingIpConfig,
    ) -> ProviderFuture<'a, FloatingIpState> {
        Box::pin(async move {
            let scope = Scope::new(RESOURCE, Operation::Create);
            config.validate().map_err(|msg| scope.validation(msg))?;
            bind(
                ctx,
                scope,
                &config.bare_metal_server,
                config.network_interface_id(),
                &config.floating_ip,
                ctx.timeouts().create,
            )
            .await
        })
    }

    fn read<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        id: &'a str,
    ) -> ProviderFuture<'a, Option<FloatingIpState>> {
        Box::pin(async move { read_binding(ctx, id, Scope::new(RESOURCE, Operation::Read)).await })
    }

    fn update<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        prior: &'a FloatingIpState,
        config: &'a FloatingIpConfig,
    ) -> ProviderFuture<'a, Option<FloatingIpState>> {
        Box::pin(async move {
            let scope = Scope::new(RESOURCE, Operation::Update);
            if config.floating_ip == prior.floating_ip {
                return read_binding(ctx, &prior.id, scope).await;
            }
            config.validate().map_err(|msg| scope.validation(msg))?;
            let current = NicFloatingIpId::parse(&prior.id).map_err(|err| scope.invalid_id(&err))?;
            let state = bind(
                ctx,
                scope,
                &current.server,
                &current.nic,
                &config.floating_ip,
                ctx.timeouts().update,
            )
            .await?;
            Ok(Some(state))
        })
    }

    fn delete<'a>(&'a self, ctx: &'a ProviderContext, id: &'a str) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let scope = Scope::new(RESOURCE, Operation::Delete);
            let parsed = NicFloatingIpId::parse(id).map_err(|err| scope.invalid_id(&err))?;
            let api = ctx.vpc(scope)?;

            match api
                .get_bare_metal_nic_floating_ip(&parsed.server, &parsed.nic, &parsed.floating_ip)
                .await
            {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    tracing::debug!(%id, "floating IP binding already gone");
                    return Ok(());
                }
                Err(err) => return Err(scope.remote(GET_CALL, err)),
            }

            api.remove_bare_metal_nic_floating_ip(&parsed.server, &parsed.nic, &parsed.floating_ip)
                .await
                .map_err(|err| scope.remote("remove_bare_metal_nic_floating_ip", err))?;
            let status = wait_removed(ctx, api, scope, &parsed).await?;
            tracing::info!(%id, %status, "floating IP unbound");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests;
