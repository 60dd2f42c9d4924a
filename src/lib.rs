//! Core library for the `ibmvpc` provider.
//!
//! The crate manages IBM Cloud VPC network ACLs and bare metal server
//! floating IP bindings, and exposes read-only data sources for instance
//! group managers, image export jobs, and Code Engine functions. Remote
//! calls go through the [`api::VpcApi`] and [`api::TagApi`] seams; the
//! [`pagination`] and [`poll`] modules hold the generic listing and
//! status-wait loops the lifecycles are built on.

pub mod api;
pub mod config;
pub mod context;
pub mod data_sources;
pub mod error;
pub mod id;
pub mod pagination;
pub mod poll;
pub mod resources;
pub mod tags;
pub mod test_support;

pub use api::{ApiError, HttpTagClient, HttpVpcClient, TagApi, VpcApi};
pub use config::{ConfigError, ProviderConfig};
pub use context::{ProviderContext, Timeouts};
pub use data_sources::{
    CodeEngineFunctionDataSource, DataSource, ImageExportJobDataSource,
    InstanceGroupManagersDataSource,
};
pub use error::{Operation, ProviderError};
pub use id::{IdError, NicFloatingIpId, PairId};
pub use poll::{Observation, PollError, WaitSpec, wait_for_state};
pub use resources::{NetworkAclResource, NicFloatingIpResource, Resource};
