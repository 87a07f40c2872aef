mod config;
mod indicator;
mod log_tailer;
mod status_loop;

use boxwatch::ping::{HostTarget, Pinger};
use clap::Parser;
use indicator::Indicators;
use log_tailer::LogCursor;
use status_loop::StatusLoop;
use std::path::PathBuf;
use std::process::ExitCode;

/// Status LEDs: hub reachability, internet reachability, and new errors in
/// the Home Assistant log.
#[derive(Parser, Debug)]
#[command(name = "boxwatch-leds", version, about)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "boxwatch-leds.toml")]
    config: PathBuf,

    /// Log indicator changes instead of driving GPIO lines
    #[arg(long)]
    no_gpio: bool,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Print resolved settings and exit
    #[arg(long)]
    dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "boxwatch_leds=debug,boxwatch=debug"
    } else {
        "boxwatch_leds=info,boxwatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let cfg = config::load_config(&cli.config);

    if cli.dry_run {
        println!("boxwatch-leds v{}", env!("CARGO_PKG_VERSION"));
        println!("Config file: {}", cli.config.display());
        match toml::to_string_pretty(&cfg) {
            Ok(text) => println!("{text}"),
            Err(e) => println!("{cfg:#?} ({e})"),
        }
        return ExitCode::SUCCESS;
    }

    let indicators = if cli.no_gpio {
        Indicators::logging()
    } else {
        match Indicators::gpio(
            &cfg.gpio.chip,
            cfg.gpio.primary_pin,
            cfg.gpio.secondary_pin,
            cfg.error_pin(),
        ) {
            Ok(indicators) => indicators,
            Err(e) => {
                tracing::error!(error = %e, "GPIO unavailable");
                return ExitCode::FAILURE;
            }
        }
    };

    let mut status = StatusLoop::new(
        Pinger::new(cfg.poll.ping_command.clone(), cfg.ping_timeout()),
        HostTarget::new("home-assistant", cfg.hosts.primary.clone()),
        HostTarget::new("internet", cfg.hosts.secondary.clone()),
        cfg.error_log().map(LogCursor::new),
        indicators,
    );

    if cli.once {
        let report = status.tick().await;
        tracing::info!(
            primary = report.primary.reachable,
            secondary = report.secondary.reachable,
            new_error = ?report.new_error,
            error_led = ?status.indicators().state(indicator::Channel::Error),
            "cycle complete"
        );
    } else {
        status.run(cfg.interval()).await;
    }
    ExitCode::SUCCESS
}
