//! `roverhub-cli` – the `roverhub` binary.
//!
//! Boots the on-robot coordination hub:
//!
//! 1. Loads `~/.roverhub/config.toml` (written with defaults on first run).
//! 2. Probes the planning backend and reports online/offline.
//! 3. Opens the motor-controller serial link and waits for the operator's
//!    device on the radio WebSocket port.
//! 4. Runs the [`Hub`] until a fatal fault or Ctrl-C.

mod config;

use std::sync::Arc;

use colored::Colorize;
use tracing::{error, info};

use roverhub_backend::PlannerClient;
use roverhub_core::Hub;
use roverhub_hal::{ConsoleBuzzer, StillCamera};
use roverhub_link::{SerialMotorLink, WsRadioLink};
use roverhub_types::HubError;

#[tokio::main]
async fn main() {
    init_tracing();
    print_banner();

    let cfg = load_or_init_config();

    if let Err(e) = run(cfg).await {
        error!(error = %e, "roverhub terminated");
        std::process::exit(1);
    }
    println!("{}", "  ✓ roverhub exited.".green());
}

async fn run(cfg: config::Config) -> Result<(), HubError> {
    // ── Backend probe ─────────────────────────────────────────────────────
    let planner = PlannerClient::new(&cfg.api_url, cfg.api_timeout())
        .map_err(|e| HubError::Backend(e.to_string()))?;
    print!("  Probing backend at {} … ", cfg.api_url.dimmed());
    if planner.check_alive().await {
        println!("{}", "online".green());
    } else {
        println!("{}", "offline".yellow());
        println!(
            "  {}",
            "Path planning and image recognition will fail until it is up.".dimmed()
        );
    }

    // ── Links ─────────────────────────────────────────────────────────────
    let motor = SerialMotorLink::open(&cfg.serial_port, cfg.baud_rate)?;

    let radio = WsRadioLink::bind(([0, 0, 0, 0], cfg.radio_port).into()).await?;
    println!(
        "  Waiting for the operator's device on port {} …",
        cfg.radio_port.to_string().bold()
    );
    radio.accept().await?;
    println!("{}", "  ✓ Operator connected.".green());

    // ── Hub ───────────────────────────────────────────────────────────────
    let camera = StillCamera::new(&cfg.capture_program, &cfg.capture_output);
    let hub = Hub::new(
        cfg.core(),
        Arc::new(radio),
        Arc::new(motor),
        Arc::new(planner),
        Arc::new(camera),
        Arc::new(ConsoleBuzzer),
    );

    tokio::select! {
        result = hub.run() => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!(error = %e, "ctrl-c handler failed");
            }
            println!();
            println!("{}", "  Ctrl-C received – shutting down.".yellow().bold());
            info!("operator shutdown");
            Ok(())
        }
    }
}

fn init_tracing() {
    // RUST_LOG controls the filter (defaults to "info"). Set
    // ROVERHUB_LOG_FORMAT=json for newline-delimited JSON logs suitable
    // for log aggregators. User-facing output stays on println for UX.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ROVERHUB_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }
}

fn load_or_init_config() -> config::Config {
    match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  No config found – wrote defaults to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Could not write default config".yellow(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   ___                   _  _      _    "#.bold().cyan());
    println!("{}", r#"  | _ \_____ _____ _ _  | || |_  _| |__ "#.bold().cyan());
    println!("{}", r#"  |   / _ \ V / -_) '_| | __ | || | '_ \"#.bold().cyan());
    println!("{}", r#"  |_|_\___/\_/\___|_|   |_||_|\_,_|_.__/"#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "RoverHub".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  On-robot command coordination hub");
    println!();
}
