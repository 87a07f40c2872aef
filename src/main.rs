use boxwatch::config::{self, SupervisorEnv};
use boxwatch::engine::WatchdogEngine;
use boxwatch::supervisor::SupervisorClient;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Watchdog for the home-automation appliance: stops the Wi-Fi repeater after
/// startup, restarts Home Assistant on release changes, and reboots the device
/// after a long internet outage.
#[derive(Parser, Debug)]
#[command(name = "boxwatch", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "boxwatch.toml")]
    config: PathBuf,

    /// Run a single check cycle and exit
    #[arg(long)]
    once: bool,

    /// Validate config and environment, print resolved settings, don't run
    #[arg(long)]
    dry_run: bool,

    /// Debug logging (monitor state on every cycle)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "boxwatch=debug"
    } else {
        "boxwatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "watchdog failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(&cli.config)?;
    let env = SupervisorEnv::from_env()?;

    if cli.dry_run {
        println!("boxwatch v{}", env!("CARGO_PKG_VERSION"));
        println!("Config file: {}", cli.config.display());
        println!("Supervisor: {} (app {} / {})", env.address, env.app_id, env.app_name);
        println!("{config:#?}");
        return Ok(());
    }

    let client = SupervisorClient::new(&env, config.http.timeout())?;
    let mut engine = WatchdogEngine::new(&config, &env, client, chrono::Utc::now());

    if cli.once {
        engine.tick().await;
    } else {
        engine.run(config.engine.interval()).await;
    }
    Ok(())
}
