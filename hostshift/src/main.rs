use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use hostshift::logging::RunLog;
use hostshift::setup::{self, Overrides};
use hostshift::HostshiftResult;
use hostshift_core::input::load_entries;

#[derive(Parser)]
#[command(name = "hostshift")]
#[command(about = "Sequentially migrate VMs onto the least-loaded compute hosts", long_about = None)]
#[command(version)]
struct Cli {
    /// File listing VM IDs or names, one per line
    #[arg(value_name = "VM_LIST_FILE")]
    vm_list: PathBuf,

    /// File listing candidate target hosts, one per line
    #[arg(value_name = "HOSTS_FILE")]
    hosts: PathBuf,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log what would be migrated without contacting the control plane
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Total migration attempts per VM [default: 3]
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Seconds to wait for a single migration attempt [default: 600]
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Directory for the run and error logs [default: ./logs]
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = Overrides {
        max_retries: cli.max_retries,
        timeout_secs: cli.timeout,
        log_dir: cli.log_dir.clone(),
    };
    let config = match setup::load_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let log = match RunLog::init(&config.logging, cli.verbose) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(1);
        }
    };

    let code = match run(&cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            1
        }
    };

    info!("Run log: {}", log.run_log_path().display());
    drop(log);
    ExitCode::from(code)
}

async fn run(cli: &Cli, config: &hostshift_core::HostshiftConfig) -> HostshiftResult<u8> {
    info!(
        dry_run = cli.dry_run,
        max_retries = config.migration.max_retries,
        timeout_secs = config.migration.timeout.as_secs(),
        strategy = %config.balancing.strategy,
        "Starting hostshift"
    );

    let vms = load_entries(&cli.vm_list).await?;
    let hosts = load_entries(&cli.hosts).await?;
    info!("Loaded {} VMs and {} target hosts", vms.len(), hosts.len());

    let orchestrator = setup::orchestrator(config, cli.dry_run)?;
    let summary = orchestrator.run(&vms, &hosts).await?;

    println!("{}", summary);
    Ok(summary.exit_code())
}
