use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ce_view::condor::cli::DEFAULT_CONDOR_CONFIG;
use ce_view::condor::{Condor, CondorCli, ScheddLocator, ALL_JOBS};
use ce_view::config::{Settings, DEFAULT_LISTEN_ADDR};
use ce_view::jobs::{tally_stream, PilotCounts, Tally, Totals, VoCounts};
use ce_view::runtime::resolve_locator;
use ce_view::shutdown::install_shutdown_handler;
use ce_view::web::render::{pilot_rows, unix_time, TotalsBody};
use ce_view::web::{run_web, AppState};

#[derive(Parser, Debug)]
#[command(name = "ce-view")]
#[command(version)]
#[command(about = "Read-only monitoring front end for an HTCondor-CE")]
#[command(propagate_version = true)]
struct Args {
    #[command(flatten)]
    scheduler: SchedulerArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the JSON, HTML and graph views over HTTP
    Serve(ServeArgs),

    /// Print one job summary and exit
    Summary {
        /// Which grouping to print
        #[arg(value_enum)]
        view: SummaryView,

        /// Output format
        #[arg(long, short = 'o', default_value = "table")]
        output: OutputFormat,
    },
}

// =============================================================================
// Arguments
// =============================================================================

#[derive(clap::Args, Debug)]
struct SchedulerArgs {
    /// Collector used to locate the schedd (default: HTCONDORCE_WEBAPP_POOL)
    #[arg(long, env = "CE_VIEW_POOL", global = true)]
    pool: Option<String>,

    /// Schedd name within the pool (default: HTCONDORCE_WEBAPP_NAME)
    #[arg(long, env = "CE_VIEW_NAME", global = true)]
    name: Option<String>,

    /// Configuration file for the scheduler tools
    #[arg(long, env = "CONDOR_CONFIG", default_value = DEFAULT_CONDOR_CONFIG, global = true)]
    condor_config: PathBuf,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "CE_VIEW_LISTEN", default_value = DEFAULT_LISTEN_ADDR)]
    listen: SocketAddr,

    /// Page template directory (default: HTCONDORCE_WEBAPP_TEMPLATES)
    #[arg(long, env = "CE_VIEW_TEMPLATES")]
    templates: Option<PathBuf>,

    /// Graph history directory (default: HTCONDORCE_WEBAPP_SPOOL)
    #[arg(long, env = "CE_VIEW_SPOOL")]
    spool: Option<PathBuf>,
}

#[derive(Debug, Clone, ValueEnum)]
enum SummaryView {
    Totals,
    Pilots,
    Vos,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl SchedulerArgs {
    fn settings(&self) -> Settings {
        Settings {
            pool: self.pool.clone(),
            name: self.name.clone(),
            condor_config: self.condor_config.clone(),
            ..Settings::default()
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn run_server(
    scheduler: SchedulerArgs,
    args: ServeArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings {
        listen_addr: args.listen,
        template_dir: args.templates,
        spool_dir: args.spool,
        ..scheduler.settings()
    };

    tracing::info!(
        listen_addr = %settings.listen_addr,
        pool = ?settings.pool,
        name = ?settings.name,
        condor_config = %settings.condor_config.display(),
        "Starting ce-view"
    );

    let condor = Arc::new(CondorCli::new(settings.condor_config.clone()));
    let addr = settings.listen_addr;
    let state = AppState::new(settings, condor);
    let shutdown = install_shutdown_handler();

    run_web(addr, state, shutdown).await?;
    Ok(())
}

async fn query<T: Tally>(
    condor: &CondorCli,
    locator: &ScheddLocator,
) -> Result<T, Box<dyn std::error::Error>> {
    let ads = condor.query_jobs(locator, ALL_JOBS, T::PROJECTION).await?;
    Ok(tally_stream(ads).await?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn handle_summary(
    scheduler: SchedulerArgs,
    view: SummaryView,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = scheduler.settings();
    let condor = CondorCli::new(settings.condor_config.clone());
    let locator = resolve_locator(&settings, &condor).await;

    match view {
        SummaryView::Totals => {
            let totals: Totals = query(&condor, &locator).await?;
            match output {
                OutputFormat::Json => {
                    print_json(&TotalsBody::new(&totals, unix_time()))?;
                }
                OutputFormat::Table => {
                    println!("Job Totals ({})", locator);
                    println!("{}", "=".repeat(40));
                    println!("Running: {}", totals.counts.running);
                    println!("Idle:    {}", totals.counts.idle);
                    println!("Held:    {}", totals.counts.held);
                    println!("Other:   {}", totals.counts.other());
                    println!("Jobs:    {}", totals.counts.jobs);
                }
            }
        }
        SummaryView::Pilots => {
            let pilots: PilotCounts = query(&condor, &locator).await?;
            match output {
                OutputFormat::Json => print_json(&pilot_rows(&pilots))?,
                OutputFormat::Table => {
                    if pilots.is_empty() {
                        println!("No jobs found.");
                        return Ok(());
                    }
                    println!(
                        "{:<10} {:<20} {:>8} {:>8} {:>8} {:>8}  DN",
                        "VO", "VOMS", "RUNNING", "IDLE", "HELD", "JOBS"
                    );
                    println!("{}", "-".repeat(90));
                    for (key, counts) in pilots.iter() {
                        println!(
                            "{:<10} {:<20} {:>8} {:>8} {:>8} {:>8}  {}",
                            key.vo, key.voms, counts.running, counts.idle, counts.held, counts.jobs, key.dn
                        );
                    }
                }
            }
        }
        SummaryView::Vos => {
            let vos: VoCounts = query(&condor, &locator).await?;
            match output {
                OutputFormat::Json => print_json(&vos)?,
                OutputFormat::Table => {
                    if vos.is_empty() {
                        println!("No jobs found.");
                        return Ok(());
                    }
                    println!(
                        "{:<20} {:>8} {:>8} {:>8} {:>8}",
                        "VO", "RUNNING", "IDLE", "HELD", "JOBS"
                    );
                    println!("{}", "-".repeat(56));
                    for (vo, counts) in vos.iter() {
                        println!(
                            "{:<20} {:>8} {:>8} {:>8} {:>8}",
                            vo, counts.running, counts.idle, counts.held, counts.jobs
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Commands::Serve(serve_args) => {
            run_server(args.scheduler, serve_args).await?;
        }
        Commands::Summary { view, output } => {
            handle_summary(args.scheduler, view, output).await?;
        }
    }

    Ok(())
}
