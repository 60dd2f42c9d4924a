//! Binary entry point for the `ibmvpc` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use ibmvpc::data_sources::{ExportJobQuery, FunctionQuery, ManagersQuery};
use ibmvpc::{
    CodeEngineFunctionDataSource, ConfigError, DataSource, ImageExportJobDataSource,
    InstanceGroupManagersDataSource, NetworkAclResource, NicFloatingIpResource, ProviderConfig,
    ProviderContext, ProviderError, Resource,
};

mod cli;

use cli::{Cli, DataCommand, ShowCommand};

const LOG_ENV: &str = "IBMVPC_LOG";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = ProviderConfig::load_without_cli_args()?;
    config.validate()?;
    let ctx = ProviderContext::from_config(&config);

    match cli {
        Cli::Data(command) => run_data(&ctx, command).await,
        Cli::Show(command) => run_show(&ctx, command).await,
    }
}

async fn run_data(ctx: &ProviderContext, command: DataCommand) -> Result<(), CliError> {
    match command {
        DataCommand::InstanceGroupManagers { instance_group } => {
            let query = ManagersQuery { instance_group };
            print_json(&InstanceGroupManagersDataSource.read(ctx, &query).await?)
        }
        DataCommand::ImageExportJob {
            image,
            image_export_job,
        } => {
            let query = ExportJobQuery {
                image,
                image_export_job,
            };
            print_json(&ImageExportJobDataSource.read(ctx, &query).await?)
        }
        DataCommand::CodeEngineFunction { project_id, name } => {
            let query = FunctionQuery { project_id, name };
            print_json(&CodeEngineFunctionDataSource.read(ctx, &query).await?)
        }
    }
}

async fn run_show(ctx: &ProviderContext, command: ShowCommand) -> Result<(), CliError> {
    match command {
        ShowCommand::NetworkAcl { id } => {
            let state = NetworkAclResource.read(ctx, &id).await?;
            print_found(NetworkAclResource::NAME, id, state)
        }
        ShowCommand::FloatingIp { id } => {
            let state = NicFloatingIpResource.read(ctx, &id).await?;
            print_found(NicFloatingIpResource::NAME, id, state)
        }
    }
}

fn print_found<T: Serialize>(
    kind: &'static str,
    id: String,
    state: Option<T>,
) -> Result<(), CliError> {
    state.map_or(Err(CliError::NotFound { kind, id }), |found| print_json(&found))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    write_json(io::stdout(), value)
}

fn write_json<T: Serialize>(mut target: impl Write, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut target, value)?;
    writeln!(target)?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_json_appends_newline() {
        let mut buf = Vec::new();
        write_json(&mut buf, &serde_json::json!({ "id": "acl-1" })).expect("write succeeds");
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(rendered.ends_with("}\n"), "rendered: {rendered}");
        assert!(rendered.contains("\"id\": \"acl-1\""));
    }

    #[test]
    fn missing_resource_is_reported_by_kind_and_id() {
        let err = print_found::<()>("ibm_is_network_acl", String::from("acl-9"), None)
            .expect_err("missing state is an error");
        let mut buf = Vec::new();
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).expect("utf8");
        assert_eq!(rendered, "ibm_is_network_acl acl-9 not found\n");
    }

    #[test]
    fn data_subcommand_parses_job_flag() {
        let cli = Cli::try_parse_from([
            "ibmvpc",
            "data",
            "image-export-job",
            "--image",
            "img-1",
            "--job",
            "job-1",
        ])
        .expect("arguments parse");
        assert!(matches!(
            cli,
            Cli::Data(DataCommand::ImageExportJob { ref image, ref image_export_job })
                if image == "img-1" && image_export_job == "job-1"
        ));
    }
}
