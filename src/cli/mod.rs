//! Command-line interface definitions for the `ibmvpc` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, Subcommand};

/// Top-level CLI for the `ibmvpc` binary.
#[derive(Debug, Parser)]
#[command(
    name = "ibmvpc",
    about = "Inspect IBM Cloud VPC network ACLs, floating IP bindings, and data sources",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Read a data source and print it as JSON.
    #[command(subcommand)]
    Data(DataCommand),
    /// Read a managed resource by ID and print its state as JSON.
    #[command(subcommand)]
    Show(ShowCommand),
}

/// Data sources available under `ibmvpc data`.
#[derive(Debug, Subcommand)]
pub(crate) enum DataCommand {
    /// List the managers of an instance group.
    InstanceGroupManagers {
        /// Instance group ID.
        #[arg(long, value_name = "ID")]
        instance_group: String,
    },
    /// Show an image export job.
    ImageExportJob {
        /// Image ID.
        #[arg(long, value_name = "ID")]
        image: String,
        /// Export job ID.
        #[arg(long = "job", value_name = "ID")]
        image_export_job: String,
    },
    /// Show a Code Engine function.
    CodeEngineFunction {
        /// Code Engine project ID.
        #[arg(long, value_name = "ID")]
        project_id: String,
        /// Function name.
        #[arg(long)]
        name: String,
    },
}

/// Resources available under `ibmvpc show`.
#[derive(Debug, Subcommand)]
pub(crate) enum ShowCommand {
    /// Show a network ACL.
    NetworkAcl {
        /// Network ACL ID.
        id: String,
    },
    /// Show a floating IP bound to a bare metal server interface.
    FloatingIp {
        /// Binding ID in the form `server/interface/floating_ip`.
        id: String,
    },
}
