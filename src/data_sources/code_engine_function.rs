//! `ibm_code_engine_function`: a function in a Code Engine project.

use serde::Serialize;

use super::{DataSource, required};
use crate::api::CodeEngineFunction;
use crate::api::types::{EnvVar, FunctionStatus};
use crate::context::ProviderContext;
use crate::error::{Operation, Scope};
use crate::id::PairId;
use crate::resources::ProviderFuture;

/// Data source type name.
pub const DATA_SOURCE: &str = "ibm_code_engine_function";

/// Lookup arguments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FunctionQuery {
    /// Code Engine project ID.
    pub project_id: String,
    /// Function name.
    pub name: String,
}

/// Result of the lookup.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FunctionState {
    /// Composite `project/name` identifier.
    pub id: String,
    /// Project ID.
    pub project_id: String,
    /// Function ID.
    pub function_id: Option<String>,
    /// Function name.
    pub name: String,
    /// Whether `code_reference` holds binary code.
    pub code_binary: bool,
    /// Entry point.
    pub code_main: Option<String>,
    /// Inline code or image reference.
    pub code_reference: String,
    /// Pull secret.
    pub code_secret: Option<String>,
    /// Variables injected by the platform.
    pub computed_env_variables: Vec<EnvVar>,
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Public endpoint.
    pub endpoint: Option<String>,
    /// Private endpoint.
    pub endpoint_internal: Option<String>,
    /// Version tag.
    pub entity_tag: String,
    /// Canonical URL.
    pub href: Option<String>,
    /// Domain mapping visibility.
    pub managed_domain_mappings: String,
    /// Region.
    pub region: Option<String>,
    /// Resource type label.
    pub resource_type: Option<String>,
    /// User-defined variables.
    pub run_env_variables: Vec<EnvVar>,
    /// Managed runtime.
    pub runtime: String,
    /// Concurrent requests per instance.
    pub scale_concurrency: i64,
    /// vCPU limit.
    pub scale_cpu_limit: String,
    /// Idle keep-alive in seconds.
    pub scale_down_delay: i64,
    /// Maximum execution time in seconds.
    pub scale_max_execution_time: i64,
    /// Memory limit.
    pub scale_memory_limit: String,
    /// Overall status.
    pub status: Option<String>,
    /// Detailed status.
    pub status_details: FunctionStatus,
}

impl FunctionState {
    fn new(project_id: &str, function: CodeEngineFunction) -> Self {
        Self {
            id: PairId::new(project_id, function.name.as_str()).to_string(),
            project_id: project_id.to_owned(),
            function_id: function.id,
            name: function.name,
            code_binary: function.code_binary,
            code_main: function.code_main,
            code_reference: function.code_reference,
            code_secret: function.code_secret,
            computed_env_variables: function.computed_env_variables,
            created_at: function.created_at,
            endpoint: function.endpoint,
            endpoint_internal: function.endpoint_internal,
            entity_tag: function.entity_tag,
            href: function.href,
            managed_domain_mappings: function.managed_domain_mappings,
            region: function.region,
            resource_type: function.resource_type,
            run_env_variables: function.run_env_variables,
            runtime: function.runtime,
            scale_concurrency: function.scale_concurrency,
            scale_cpu_limit: function.scale_cpu_limit,
            scale_down_delay: function.scale_down_delay,
            scale_max_execution_time: function.scale_max_execution_time,
            scale_memory_limit: function.scale_memory_limit,
            status: function.status,
            status_details: function.status_details,
        }
    }
}

/// Looks up a Code Engine function.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodeEngineFunctionDataSource;

impl DataSource for CodeEngineFunctionDataSource {
    type Query = FunctionQuery;
    type State = FunctionState;

    const NAME: &'static str = DATA_SOURCE;

    fn read<'a>(
        &'a self,
        ctx: &'a ProviderContext,
        query: &'a FunctionQuery,
    ) -> ProviderFuture<'a, FunctionState> {
        Box::pin(async move {
            let scope = Scope::new(DATA_SOURCE, Operation::Read);
            required("project_id", &query.project_id)
                .and_then(|()| required("name", &query.name))
                .map_err(|msg| scope.validation(msg))?;
            let function = ctx
                .vpc(scope)?
                .get_code_engine_function(&query.project_id, &query.name)
                .await
                .map_err(|err| scope.remote("get_code_engine_function", err))?;
            Ok(FunctionState::new(&query.project_id, function))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::{FakeTagApi, FakeVpcApi};

    fn function() -> CodeEngineFunction {
        CodeEngineFunction {
            id: Some(String::from("fn-uuid")),
            name: String::from("thumbnail"),
            code_reference: String::from("data:text/plain;base64,YWJj"),
            runtime: String::from("nodejs-20"),
            scale_concurrency: 1,
            scale_cpu_limit: String::from("0.5"),
            scale_max_execution_time: 60,
            scale_memory_limit: String::from("2G"),
            run_env_variables: vec![EnvVar {
                name: Some(String::from("MODE")),
                kind: String::from("literal"),
                value: Some(String::from("fast")),
                ..EnvVar::default()
            }],
            status: Some(String::from("ready")),
            ..CodeEngineFunction::default()
        }
    }

    #[tokio::test]
    async fn function_is_reported_with_composite_id() {
        let vpc = Arc::new(FakeVpcApi::new());
        vpc.insert_function("proj-1", function());
        let ctx = ProviderContext::new(vpc.clone(), Arc::new(FakeTagApi::default()));

        let state = CodeEngineFunctionDataSource
            .read(
                &ctx,
                &FunctionQuery {
                    project_id: String::from("proj-1"),
                    name: String::from("thumbnail"),
                },
            )
            .await
            .expect("read succeeds");

        assert_eq!(state.id, "proj-1/thumbnail");
        assert_eq!(state.function_id.as_deref(), Some("fn-uuid"));
        assert_eq!(state.runtime, "nodejs-20");
        assert_eq!(state.run_env_variables.len(), 1);
        assert_eq!(vpc.calls_to("get_code_engine_function"), ["get_code_engine_function proj-1/thumbnail"]);
    }

    #[test]
    fn env_var_kind_serialises_as_type() {
        let state = FunctionState::new("proj-1", function());
        let json = serde_json::to_value(&state).expect("serialises");
        assert_eq!(json["run_env_variables"][0]["type"], "literal");
        assert!(json["run_env_variables"][0].get("key").is_none());
    }
}
