//! `ibm_is_instance_group_managers`: every manager of an instance group.

use serde::Serialize;

use super::{DataSource, required};
use crate::api::{InstanceGroupManager, InstanceGroupManagerKind};
use crate::context::ProviderContext;
use crate::error::{Operation, Scope};
use crate::id::PairId;
use crate::pagination::collect_pages;
use crate::resources::ProviderFuture;

/// Data source type name.
pub const DATA_SOURCE: &str = "ibm_is_instance_group_managers";

/// Lookup arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManagersQuery {
    /// Instance group ID.
    pub instance_group: String,
}

/// Scheduled action attached to a manager.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ManagerAction {
    /// Action ID.
    pub instance_group_manager_action: String,
    /// Action name.
    pub instance_group_manager_action_name: String,
    /// Resource type label.
    pub resource_type: String,
}

/// `manager_type` and the attributes reported for that kind.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "manager_type", rename_all = "lowercase")]
pub enum ManagerDetails {
    /// Metric-driven autoscaling manager.
    Autoscale {
        /// Seconds of metrics aggregated before evaluation.
        aggregation_window: u32,
        /// Seconds to pause scaling after a scale action.
        cooldown: u32,
        /// Upper bound on group membership.
        max_membership_count: u32,
        /// Lower bound on group membership.
        min_membership_count: u32,
        /// Policy IDs.
        policies: Vec<String>,
    },
    /// Manager driven by scheduled actions.
    Scheduled {
        /// Attached actions.
        actions: Vec<ManagerAction>,
    },
}

impl ManagerDetails {
    /// Returns the `manager_type` label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Autoscale { .. } => "autoscale",
            Self::Scheduled { .. } => "scheduled",
        }
    }
}

impl From<InstanceGroupManagerKind> for ManagerDetails {
    fn from(kind: InstanceGroupManagerKind) -> Self {
        match kind {
            InstanceGroupManagerKind::Autoscale {
                aggregation_window,
                cooldown,
                max_membership_count,
                min_membership_count,
                policies,
            } => Self::Autoscale {
                aggregation_window,
                cooldown,
                max_membership_count,
                min_membership_count,
                policies: policies.into_iter().map(|policy| policy.id).collect(),
            },
            InstanceGroupManagerKind::Scheduled { actions } => Self::Scheduled {
                actions: actions
                    .into_iter()
                    .map(|action| ManagerAction {
                        instance_group_manager_action: action.id,
                        instance_group_manager_action_name: action.name,
                        resource_type: action.resource_type,
                    })
                    .collect(),
            },
        }
    }
}

/// One manager of the group.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ManagerEntry {
    /// Composite `instance_group/manager` identifier.
    pub id: String,
    /// Manager ID.
    pub manager_id: String,
    /// Manager name.
    pub name: String,
    /// Kind-specific attributes, flattened next to the common ones.
    #[serde(flatten)]
    pub details: ManagerDetails,
}

impl ManagerEntry {
    fn new(instance_group: &str, manager: InstanceGroupManager) -> Self {
        Self {
            id: PairId::new(instance_group, manager.id.as_str()).to_string(),
            manager_id: manager.id,
            name: manager.name,
            details: manager.kind.into(),
        }
    }
}

/// Result of the lookup.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ManagersState {
    /// Random identifier, fresh on every read.
    pub id: String,
    /// Instance group ID.
    pub instance_group: String,
    /// Managers in server order.
    pub managers: Vec<ManagerEntry>,
}

/// Lists instance group managers.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstanceGroupManagersDataSource;

impl DataSource for InstanceGroupManagersDataSource {
    type Query = ManagersQuery;
    type State = ManagersState;

    const NAME: &'static str = DATA_SOURCE;

    fn read<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        query: &'a ManagersQuery,
    ) -> ProviderFuture<'a, ManagersState> {
        Box::pin(async move {
            let scope = Scope::new(DATA_SOURCE, Operation::Read);
            required("instance_group", &query.instance_group)
                .map_err(|msg| scope.validation(msg))?;
            let api = ctx.vpc(scope)?;
            let group = query.instance_group.as_str();

            let managers = collect_pages(|start| async move {
                api.list_instance_group_managers(group, start.as_deref()).await
            })
            .await
            .map_err(|err| scope.remote("list_instance_group_managers", err))?;
            tracing::debug!(%group, count = managers.len(), "listed instance group managers");

            Ok(ManagersState {
                id: uuid::Uuid::new_v4().to_string(),
                instance_group: query.instance_group.clone(),
                managers: managers
                    .into_iter()
                    .map(|manager| ManagerEntry::new(group, manager))
                    .collect(),
            })
        })
    }
}
