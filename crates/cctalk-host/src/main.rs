//! Interactive ccTalk host.
//!
//! Thin presentation layer over `cctalk-core`: argument parsing, port
//! selection and a small command loop. All protocol behavior lives in
//! the core crate.

mod repl;

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use cctalk_core::protocol::{
    self, ChecksumMode, Session, SessionConfig, TransportConfig,
};

#[derive(Parser)]
#[command(name = "cctalk-host")]
#[command(about = "Interactive ccTalk host for bill validators and coin acceptors", long_about = None)]
struct Cli {
    /// Serial port (e.g. /dev/ttyUSB0 or COM3); prompts from a scan when omitted
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// Device type; selects the default bus address and trailer mode
    #[arg(long, value_enum, default_value = "bill-validator")]
    device: DeviceKind,

    /// Trailer mode override (crc16 or checksum8)
    #[arg(long)]
    checksum: Option<String>,

    /// Device bus address override
    #[arg(long)]
    address: Option<u8>,

    /// Whole-reply timeout in milliseconds
    #[arg(long, default_value = "1000", value_name = "MS")]
    reply_timeout: u64,

    /// Inter-byte echo timeout in milliseconds
    #[arg(long, default_value = "200", value_name = "MS")]
    echo_timeout: u64,

    /// Extra attempts after a timeout or line error
    #[arg(long, default_value = "2")]
    retries: u32,

    /// Print responses as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Kind of cash-handling peripheral on the other end of the line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceKind {
    BillValidator,
    CoinAcceptor,
}

impl DeviceKind {
    fn default_address(self) -> u8 {
        match self {
            DeviceKind::BillValidator => protocol::BILL_VALIDATOR_ADDRESS,
            DeviceKind::CoinAcceptor => protocol::COIN_ACCEPTOR_ADDRESS,
        }
    }

    /// Bill validators use the CRC trailer; coin acceptors usually run
    /// the simple additive checksum
    fn default_mode(self) -> ChecksumMode {
        match self {
            DeviceKind::BillValidator => ChecksumMode::Crc16,
            DeviceKind::CoinAcceptor => ChecksumMode::Checksum8,
        }
    }
}

fn parse_checksum_mode(mode: &str) -> Result<ChecksumMode> {
    match mode.to_lowercase().as_str() {
        "crc16" | "crc" => Ok(ChecksumMode::Crc16),
        "checksum8" | "checksum" => Ok(ChecksumMode::Checksum8),
        other => bail!("Invalid checksum mode: {other}. Must be 'crc16' or 'checksum8'"),
    }
}

/// Scan for ports and let the user pick one, as when no --port was given
fn select_port() -> Result<String> {
    let ports = protocol::list_ports();
    if ports.is_empty() {
        bail!("No serial ports found");
    }

    println!("Available serial ports:");
    for (idx, port) in ports.iter().enumerate() {
        match (&port.manufacturer, &port.product) {
            (_, Some(product)) => println!("  [{idx}] {} ({product})", port.name),
            (Some(manufacturer), None) => println!("  [{idx}] {} ({manufacturer})", port.name),
            _ => println!("  [{idx}] {}", port.name),
        }
    }

    let stdin = std::io::stdin();
    loop {
        print!("Select port number: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            bail!("No port selected");
        }
        match line.trim().parse::<usize>() {
            Ok(idx) if idx < ports.len() => return Ok(ports[idx].name.clone()),
            _ => println!(
                "Invalid selection. Enter a number between 0 and {}",
                ports.len() - 1
            ),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mode = match &cli.checksum {
        Some(mode) => parse_checksum_mode(mode)?,
        None => cli.device.default_mode(),
    };

    let port_name = match cli.port.clone() {
        Some(port) => port,
        None => select_port()?,
    };

    let config = SessionConfig {
        destination: cli.address.unwrap_or_else(|| cli.device.default_address()),
        source: protocol::HOST_ADDRESS,
        mode,
        transport: TransportConfig {
            echo_timeout: Duration::from_millis(cli.echo_timeout),
            reply_timeout: Duration::from_millis(cli.reply_timeout),
            retry_limit: cli.retries,
        },
    };

    println!(
        "Connecting to {} at {} baud (address {}, {:?} trailer)",
        port_name, cli.baud, config.destination, mode
    );
    let session = Session::open(&port_name, Some(cli.baud), config)
        .with_context(|| format!("Failed to open {port_name}"))?;
    println!("Connected. Type 'help' for available commands.\n");

    repl::run(Arc::new(Mutex::new(session)), cli.json)
}
