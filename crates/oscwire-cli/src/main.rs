//! oscwire CLI
//!
//! Command-line tool for watching, sending and bridging OSC traffic.

mod args;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use oscwire_client::{EventData, EventKind, Osc};
use oscwire_core::{timetag, Bundle, Message, Packet, Timetag};
use oscwire_transport::{
    BridgePlugin, Endpoint, Notifier, Plugin, TransportEvent, UdpPlugin, WsClientPlugin,
    WsServerPlugin,
};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "oscwire")]
#[command(author, version, about = "Open Sound Control over UDP and WebSocket", long_about = None)]
struct Cli {
    /// Config file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// UDP datagrams
    Udp,
    /// WebSocket client
    Ws,
    /// WebSocket server
    WsServer,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every packet arriving on a transport
    Monitor {
        #[arg(short, long, value_enum, default_value_t = TransportKind::Udp)]
        transport: TransportKind,

        /// Print packets as JSON
        #[arg(long)]
        json: bool,
    },

    /// Listen on literal addresses; incoming address patterns are matched against them
    Listen {
        /// Addresses to register, e.g. /synth/1/cutoff
        #[arg(required = true)]
        addresses: Vec<String>,

        #[arg(short, long, value_enum, default_value_t = TransportKind::Udp)]
        transport: TransportKind,

        /// Print messages as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send one message
    Send {
        /// Destination address or address pattern
        address: String,

        /// Arguments; untagged or `tag:value` (i, f, s, b, h, d, t)
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,

        #[arg(short, long, value_enum, default_value_t = TransportKind::Udp)]
        transport: TransportKind,

        /// UDP destination as host:port
        #[arg(long)]
        to: Option<String>,

        /// Wrap the message in a bundle timed this many milliseconds ahead
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Forward between UDP and WebSocket clients
    Bridge {
        /// Print forwarded packets as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a hex-encoded packet and print it
    Decode {
        /// Packet bytes in hex, e.g. 2f610000 2c690000 00000001
        hex: Vec<String>,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Monitor { transport, json } => match transport {
            TransportKind::Udp => monitor(UdpPlugin::with_config(config.udp), json).await,
            TransportKind::Ws => monitor(WsClientPlugin::with_config(config.websocket), json).await,
            TransportKind::WsServer => {
                monitor(WsServerPlugin::with_config(config.server), json).await
            }
        },
        Commands::Listen {
            addresses,
            transport,
            json,
        } => {
            let options = config.osc.clone();
            match transport {
                TransportKind::Udp => {
                    let osc = Osc::with_options(UdpPlugin::with_config(config.udp), options);
                    listen(osc, &addresses, json).await
                }
                TransportKind::Ws => {
                    let osc = Osc::with_options(WsClientPlugin::with_config(config.websocket), options);
                    listen(osc, &addresses, json).await
                }
                TransportKind::WsServer => {
                    let osc = Osc::with_options(WsServerPlugin::with_config(config.server), options);
                    listen(osc, &addresses, json).await
                }
            }
        }
        Commands::Send {
            address,
            args,
            transport,
            to,
            delay_ms,
        } => {
            let packet = build_packet(&address, &args, delay_ms)?;
            match transport {
                TransportKind::Udp => {
                    let target = to.as_deref().map(parse_endpoint).transpose()?;
                    let osc = Osc::new(UdpPlugin::with_config(config.udp));
                    // ephemeral local port so a running listener keeps its own
                    osc.open(Some(Endpoint::new("0.0.0.0", 0))).await?;
                    let result = osc.send(packet, target).await;
                    osc.close().await?;
                    result?;
                }
                TransportKind::Ws => {
                    let osc = Osc::new(WsClientPlugin::with_config(config.websocket));
                    osc.open(None).await?;
                    let result = osc.send(packet, None).await;
                    osc.close().await?;
                    result?;
                }
                TransportKind::WsServer => {
                    bail!("send needs a udp or ws transport; a server has no peer to send to yet")
                }
            }
            println!("{} {}", "Sent".green().bold(), address);
            Ok(())
        }
        Commands::Bridge { json } => monitor(BridgePlugin::with_config(config.bridge), json).await,
        Commands::Decode { hex, json } => {
            let bytes = args::parse_hex(&hex.concat())?;
            let packet = Packet::decode(&bytes).context("Failed to decode packet")?;
            print_packet(&packet, json)
        }
    }
}

/// Open `plugin` and print everything it reports until Ctrl+C
async fn monitor<P: Plugin + 'static>(plugin: P, json: bool) -> Result<()> {
    plugin.register_notify(Notifier::new(move |event| match event {
        TransportEvent::Connected => println!("{}", "Connected".green().bold()),
        TransportEvent::Disconnected { reason } => match reason {
            Some(reason) => println!("{} ({})", "Disconnected".yellow().bold(), reason),
            None => println!("{}", "Disconnected".yellow().bold()),
        },
        TransportEvent::Data(data) => match Packet::decode(&data) {
            Ok(packet) => {
                if let Err(e) = print_packet(&packet, json) {
                    error!("Failed to print packet: {}", e);
                }
            }
            Err(e) => eprintln!("{} {} ({} bytes)", "Malformed".red().bold(), e, data.len()),
        },
        TransportEvent::Error(e) => eprintln!("{} {}", "Error".red().bold(), e),
    }));

    plugin.open(None).await?;
    println!("{} Press Ctrl+C to stop", "Monitoring.".cyan().bold());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    info!("Shutting down...");
    plugin.close().await?;
    Ok(())
}

/// Register `addresses` on `osc` and print deliveries until Ctrl+C or the
/// transport closes
async fn listen<P: Plugin + 'static>(osc: Osc<P>, addresses: &[String], json: bool) -> Result<()> {
    for address in addresses {
        osc.on(address.as_str(), move |data: &EventData| {
            if let Some(message) = data.as_message() {
                if let Err(e) = print_packet(&Packet::Message(message.clone()), json) {
                    error!("Failed to print message: {}", e);
                }
            }
        })
        .with_context(|| format!("Cannot listen on '{}'", address))?;
    }

    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();

    osc.on(EventKind::Open, |_| println!("{}", "Open".green().bold()))?;
    osc.on(EventKind::Error, |data: &EventData| {
        if let EventData::Error(e) = data {
            eprintln!("{} {}", "Error".red().bold(), e);
        }
    })?;
    osc.on(EventKind::Close, move |_| {
        println!("{}", "Closed".yellow().bold());
        let _ = shutdown_tx.send(());
    })?;

    osc.open(None).await?;
    println!(
        "{} {} Press Ctrl+C to stop",
        "Listening on".cyan().bold(),
        addresses.join(", ")
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            info!("Shutting down...");
            osc.close().await?;
        }
        _ = shutdown_rx.recv() => {
            info!("Transport closed");
        }
    }

    Ok(())
}

fn build_packet(address: &str, raw_args: &[String], delay_ms: Option<u64>) -> Result<Packet> {
    let arguments = raw_args
        .iter()
        .map(|raw| args::parse_argument(raw))
        .collect::<Result<Vec<_>>>()?;
    let message = Message::new(address, arguments);

    Ok(match delay_ms {
        Some(delay) => {
            let delay = i64::try_from(delay).context("Delay out of range")?;
            let at = Timetag::from_millis(timetag::now_millis() + delay);
            Packet::from(Bundle::with_elements([message], Some(at)))
        }
        None => Packet::from(message),
    })
}

fn parse_endpoint(text: &str) -> Result<Endpoint> {
    let (host, port) = text
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("Expected host:port, got '{}'", text))?;
    let port = port
        .parse()
        .with_context(|| format!("Invalid port in '{}'", text))?;
    Ok(Endpoint::new(host, port))
}

fn print_packet(packet: &Packet, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(packet)?);
        return Ok(());
    }

    for line in output::format_packet(packet) {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];
        match trimmed.split_once(' ') {
            Some((head, rest)) => println!("{}{} {}", indent, head.cyan().bold(), rest),
            None => println!("{}{}", indent, trimmed.cyan().bold()),
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
