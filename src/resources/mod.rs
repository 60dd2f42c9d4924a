//! Managed resources and their lifecycle.
//!
//! Each resource maps a user configuration onto remote calls and returns a
//! typed state snapshot. Reads that find nothing return `Ok(None)` so hosts
//! can drop the resource from their state without treating it as an error.

pub mod floating_ip;
pub mod network_acl;
pub mod validation;

use std::future::Future;
use std::pin::Pin;

use crate::context::ProviderContext;
use crate::error::ProviderError;

pub use floating_ip::{FloatingIpConfig, FloatingIpState, NicFloatingIpResource};
pub use network_acl::{NetworkAclConfig, NetworkAclResource, NetworkAclState};

/// Future returned by provider operations.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Lifecycle of a managed resource.
pub trait Resource: Send + Sync {
    /// User-supplied configuration.
    type Config: Send + Sync;
    /// State reported after each operation.
    type State: Send + Sync;

    /// Resource type name used in diagnostics.
    const NAME: &'static str;

    /// Creates the remote object and returns its state.
    fn create<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        config: &'a Self::Config,
    ) -> ProviderFuture<'a, Self::State>;

    /// Reads the object, returning `None` when it no longer exists.
    fn read<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        id: &'a str,
    ) -> ProviderFuture<'a, Option<Self::State>>;

    /// Moves the object from `prior` towards `config` and returns the state
    /// read back afterwards.
    fn update<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        prior: &'a Self::State,
        config: &'a Self::Config,
    ) -> ProviderFuture<'a, Option<Self::State>>;

    /// Deletes the object. Deleting an object that is already gone succeeds.
    fn delete<'a>(&'a self, ctx: &'a ProviderContext, id: &'a str) -> ProviderFuture<'a, ()>;

    /// Reports whether the object exists.
    fn exists<'a>(&'a self, ctx: &'a ProviderContext, id: &'a str) -> ProviderFuture<'a, bool> {
        Box::pin(async move { Ok(self.read(ctx, id).await?.is_some()) })
    }
}
