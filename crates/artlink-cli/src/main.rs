//! artlink CLI - relay Art-Net DMX data to an Enttec DMX USB Pro
//!
//! Listens for ArtDMX datagrams on UDP, filters them by target universe,
//! and writes each matching payload to the serial interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use artlink_bridge::{ArtNetListener, EnttecPro, Relay, RelayEvent};
use artlink_core::{parse_target, TargetUniverse, ARTNET_PORT};

/// artlink - Art-Net to Enttec DMX USB Pro relay
#[derive(Parser)]
#[command(name = "artlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay
    Run {
        /// Serial device of the Enttec interface
        #[arg(short, long, default_value = "/dev/tty.usbserial")]
        serial: String,

        /// Bind address for the Art-Net listener
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,

        /// UDP port to listen on
        #[arg(short = 'P', long, default_value_t = ARTNET_PORT)]
        port: u16,

        /// Target universe, decimal (invalid or out-of-range falls back to 0)
        #[arg(short, long, default_value = "0")]
        universe: String,
    },

    /// List serial ports that could be DMX interfaces
    Ports,

    /// Show version and protocol info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    // Ctrl+C and UI-close requests land on the same channel
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl+c");
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(()).await;
    });

    match cli.command {
        Commands::Run {
            serial,
            bind,
            port,
            universe,
        } => {
            run_relay(&serial, &bind, port, &universe, &mut shutdown_rx).await?;
        }

        Commands::Ports => {
            list_ports()?;
        }

        Commands::Info => {
            print_info();
        }
    }

    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

async fn run_relay(
    serial: &str,
    bind: &str,
    port: u16,
    universe: &str,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> Result<()> {
    let target = TargetUniverse::new(parse_target(universe));
    println!(
        "{} Relaying universe {} to {}",
        "artlink".cyan().bold(),
        target.get(),
        serial.yellow()
    );

    let sink = EnttecPro::new(serial);

    // Bind failure kills receiving only; the process stays up so a front
    // end driving it keeps its status surface
    let listener = match ArtNetListener::bind(&format!("{}:{}", bind, port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Art-Net reception error: {}", e);
            println!("{} {}", "ERROR".red().bold(), e);
            shutdown_rx.recv().await;
            info!("Shutting down without listener");
            return Ok(());
        }
    };

    let mut relay = Relay::new(listener, sink.clone(), target);
    let stats = relay.stats();
    let status = relay.status();
    let mut events = relay.events();

    // One-shot device probe feeds the status line; never refreshed
    if sink.probe() {
        status.set_device(format!("Device connected: {}", sink.port_name()));
        println!("{} {}", "OK".green().bold(), status.device());
    } else {
        status.set_device("Device not connected");
        println!("{} {}", "WARN".yellow().bold(), status.device());
    }

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                RelayEvent::Listening { addr } => {
                    println!("{} Listening on {}", "OK".green().bold(), addr);
                }
                RelayEvent::Forwarded {
                    from,
                    universe,
                    channels,
                } => {
                    println!(
                        "{} {} universe {} ({} channels)",
                        "DMX".cyan(),
                        from,
                        universe,
                        channels
                    );
                }
                RelayEvent::SendFailed(reason) => {
                    println!("{} {}", "SEND".red().bold(), reason);
                }
                RelayEvent::Stopped => break,
            }
        }
    });

    relay.run(shutdown_rx).await?;

    info!("Shutting down application");
    let summary = serde_json::json!({
        "stats": stats.snapshot(),
        "status": status.snapshot(),
    });
    println!("{}", summary);
    info!("Cleanup complete");

    Ok(())
}

fn list_ports() -> Result<()> {
    let ports = EnttecPro::list_ports()?;
    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
    } else {
        for port in ports {
            println!("{}", port);
        }
    }
    Ok(())
}

fn print_info() {
    println!("{}", "artlink - Art-Net to Enttec DMX USB Pro relay".cyan().bold());
    println!();
    println!("Version:    {}", env!("CARGO_PKG_VERSION"));
    println!("Platform:   {}", std::env::consts::OS);
    println!("Arch:       {}", std::env::consts::ARCH);
    println!();
    println!("{}", "Wiring:".green());
    println!("  - Listens for ArtDMX on UDP port {} (all interfaces)", ARTNET_PORT);
    println!("  - Forwards one target universe, 512 channels max");
    println!("  - Serial output: Enttec 'Send DMX Packet' frames at 57600 baud");
    println!();
    println!("{}", "Examples:".green());
    println!("  artlink run --universe 5                 # relay universe 5");
    println!("  artlink run --serial /dev/ttyUSB0        # pick the device");
    println!("  artlink ports                            # list candidates");
}
