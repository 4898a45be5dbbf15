use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use hostshift::logging;
use hostshift::setup::{self, Overrides};
use hostshift::{HostshiftError, HostshiftResult};
use hostshift_core::input::load_entries;
use hostshift_core::report::{
    collect_host_rows, collect_vm_rows, render_host_rows, render_planning_summary, render_vm_rows,
    PlanningSummary,
};

#[derive(Parser)]
#[command(name = "hostshift-status")]
#[command(about = "Report VM and host state for migration planning (read-only)", long_about = None)]
#[command(version)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .multiple(true)
        .args(["vm_list", "hosts", "all_hosts"])
))]
struct Cli {
    /// File listing VMs to report on
    #[arg(long, value_name = "FILE")]
    vm_list: Option<PathBuf>,

    /// File listing hosts to report on
    #[arg(long, value_name = "FILE", conflicts_with = "all_hosts")]
    hosts: Option<PathBuf>,

    /// Report every compute host known to the control plane
    #[arg(long)]
    all_hosts: bool,

    /// Print a migration planning summary for the listed VMs
    #[arg(long, requires = "vm_list")]
    summary: bool,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match setup::load_config(cli.config.as_deref(), &Overrides::default()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };
    logging::init_console(&config.logging.level, cli.verbose);

    match report(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(1)
        }
    }
}

async fn report(cli: &Cli, config: &hostshift_core::HostshiftConfig) -> HostshiftResult<()> {
    let vms = match &cli.vm_list {
        Some(path) => Some(load_entries(path).await?),
        None => None,
    };
    let hosts = match &cli.hosts {
        Some(path) => Some(load_entries(path).await?),
        None => None,
    };

    let control_plane = setup::control_plane(config);
    control_plane.check_dependencies().await?;
    if !control_plane.verify_credentials().await? {
        return Err(HostshiftError::authentication(
            "control plane rejected the configured credentials",
        ));
    }

    if let Some(vms) = &vms {
        let rows = collect_vm_rows(control_plane.as_ref(), vms).await;
        println!("{}", render_vm_rows(&rows));

        if cli.summary {
            println!("{}", render_planning_summary(&PlanningSummary::from_rows(&rows)));
        }
    }

    if hosts.is_some() || cli.all_hosts {
        let rows = collect_host_rows(control_plane.as_ref(), hosts.as_deref()).await?;
        println!("{}", render_host_rows(&rows));
    }

    Ok(())
}
