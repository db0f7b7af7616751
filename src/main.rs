use app::App;
use clap::{Parser, Subcommand};
use config::AppConfig;
use data::{collector::SystemCollector, engine::SampleEngine, snapshot::Snapshot, DataManager};
use speedtest::cli_probe::SpeedtestCliProbe;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod action;
mod app;
mod components;
mod config;
mod data;
mod error;
mod report;
mod speedtest;
mod theme;
mod tui;
mod utils;

/// How long shutdown waits for a speed test worker to notice cancellation.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(
    name = "hostpulse",
    version,
    about = "Host health dashboard with an on-demand speed test"
)]
struct Cli {
    /// Sampling interval in milliseconds (minimum 100)
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Path whose filesystem usage is reported
    #[arg(long, global = true)]
    disk_path: Option<PathBuf>,

    /// Upper bound for a whole speed test, in seconds
    #[arg(long, global = true)]
    speedtest_timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive terminal dashboard (default)
    Dashboard,
    /// Print one snapshot per interval
    Watch {
        /// Stop after this many snapshots
        #[arg(long)]
        count: Option<u64>,

        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Run a single speed test and print the result
    Speedtest {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Dashboard);

    // Log lines would tear the alternate screen, so the dashboard stays quiet
    // unless RUST_LOG asks otherwise.
    let default_filter = match command {
        Commands::Dashboard => "off",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = AppConfig::load();
    if let Some(interval_ms) = cli.interval_ms {
        config.interval_ms = interval_ms;
    }
    if let Some(disk_path) = cli.disk_path {
        config.disk_path = disk_path;
    }
    if let Some(timeout) = cli.speedtest_timeout {
        config.speedtest.timeout_secs = timeout;
    }
    let config = config.normalized();

    let rt = tokio::runtime::Runtime::new()?;
    let mut speed_test_passed = true;
    let outcome = match command {
        Commands::Dashboard => {
            std::panic::set_hook(Box::new(|panic_info| {
                tui::restore_terminal();
                eprintln!("{}", panic_info);
            }));

            let runner = SpeedtestCliProbe::runner(config.speedtest.program.clone());
            rt.block_on(async {
                let mut app = App::new(config, runner)?;
                app.run().await
            })
        }
        Commands::Watch { count, json } => rt.block_on(watch(config, count, json)),
        Commands::Speedtest { json } => match rt.block_on(speed_test(config, json)) {
            Ok(passed) => {
                speed_test_passed = passed;
                Ok(())
            }
            Err(err) => Err(err),
        },
    };

    // Cancelled workers kill their child and return within one poll; never
    // wait on one longer than the grace period.
    rt.shutdown_timeout(SHUTDOWN_GRACE);
    outcome?;

    if !speed_test_passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Writes one line to stdout. `Ok(false)` means the reader went away
/// (`hostpulse watch | head -1`), which ends output cleanly.
fn emit(out: &mut impl Write, line: &str) -> io::Result<bool> {
    match writeln!(out, "{}", line).and_then(|_| out.flush()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(false),
        Err(err) => Err(err),
    }
}

async fn watch(
    config: AppConfig,
    count: Option<u64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Snapshot>();
    let engine = SampleEngine::new(SystemCollector::new(), config.disk_path.clone());
    let mut data_manager = DataManager::new(engine, config.interval_ms);
    let sampler = tokio::spawn(async move {
        data_manager.start_polling(tx, count).await;
    });

    loop {
        tokio::select! {
            snapshot = rx.recv() => {
                let Some(snapshot) = snapshot else { break };
                let line = if json {
                    report::snapshot_json(&snapshot)?
                } else {
                    report::snapshot_line(&snapshot)
                };
                if !emit(&mut io::stdout().lock(), &line)? {
                    log::debug!("stdout closed, stopping");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted");
                break;
            }
        }
    }

    sampler.abort();
    Ok(())
}

/// Returns whether the speed test succeeded.
async fn speed_test(config: AppConfig, json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let runner = Arc::new(SpeedtestCliProbe::runner(config.speedtest.program.clone()));
    let limit = Duration::from_secs(config.speedtest.timeout_secs);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if !json {
        emit(&mut io::stdout().lock(), "Running speed test...")?;
    }
    let result = speedtest::run_bounded(runner, limit, cancel).await;
    interrupt.abort();

    let line = if json {
        report::speed_test_json(&result).to_string()
    } else {
        utils::format_speed_test(&result)
    };
    emit(&mut io::stdout().lock(), &line)?;
    Ok(result.is_ok())
}
