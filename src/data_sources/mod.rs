//! Read-only data sources.
//!
//! Unlike resources, a data source that finds nothing is an error: the
//! caller asked for a specific object and there is no state to clear.

pub mod code_engine_function;
pub mod image_export_job;
pub mod instance_group_managers;

use serde::Serialize;

use crate::context::ProviderContext;
use crate::resources::ProviderFuture;

pub use code_engine_function::{CodeEngineFunctionDataSource, FunctionQuery, FunctionState};
pub use image_export_job::{ExportJobQuery, ExportJobState, ImageExportJobDataSource};
pub use instance_group_managers::{
    InstanceGroupManagersDataSource, ManagerAction, ManagerDetails, ManagerEntry, ManagersQuery,
    ManagersState,
};

/// A lookup keyed by user-supplied arguments.
pub trait DataSource: Send + Sync {
    /// Lookup arguments.
    type Query: Send + Sync;
    /// Result of the lookup.
    type State: Send + Sync + Serialize;

    /// Data source type name used in diagnostics.
    const NAME: &'static str;

    /// Performs the lookup.
    fn read<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        query: &'a Self::Query,
    ) -> ProviderFuture<'a, Self::State>;
}

fn required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}
