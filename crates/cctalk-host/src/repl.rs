//! Interactive command loop.
//!
//! Dispatches typed lines either to the shell commands (help, list,
//! poll, stop, quit) or, when the line starts with a number, straight to
//! the engine as `<header> [data..]` in decimal.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use cctalk_core::events::EventReport;
use cctalk_core::poll::{PollUpdate, PollingEngine};
use cctalk_core::protocol::{commands, Packet, Session};

/// Run the command loop until quit or end of input
pub fn run(session: Arc<Mutex<Session>>, json: bool) -> Result<()> {
    let mut poller = PollingEngine::new(Arc::clone(&session));
    let stdin = std::io::stdin();

    loop {
        let prompt = if poller.is_running() {
            "(polling) > "
        } else {
            "> "
        };
        print!("{prompt}");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        match command.to_lowercase().as_str() {
            "quit" | "exit" | "q" => break,
            "help" => print_help(),
            "list" => print_headers(),
            "poll" => {
                let period = parts
                    .next()
                    .and_then(|arg| arg.parse::<u64>().ok())
                    .unwrap_or(1000);
                start_polling(&mut poller, Duration::from_millis(period), json);
            }
            "stop" => {
                if poller.is_running() {
                    poller.stop();
                    println!("Polling stopped.");
                } else {
                    println!("No active polling to stop.");
                }
            }
            "cmd" => send_from_parts(&session, parts, json),
            _ if command.parse::<u8>().is_ok() => {
                send_from_parts(&session, line.split_whitespace(), json)
            }
            other => {
                println!("Unknown command: {other}");
                println!("Type 'help' for available commands.");
            }
        }
    }

    poller.stop();
    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  help              - Show this help message");
    println!("  list              - List known header codes");
    println!("  <header> [data]   - Send a command; decimal, space-separated");
    println!("                        Example: 254");
    println!("                        Example: 154 1");
    println!("  poll [period]     - Poll buffered events every period ms (default 1000)");
    println!("  stop              - Stop polling");
    println!("  quit, exit        - Exit the program");
}

fn print_headers() {
    println!("Header codes:");
    for info in commands::HEADER_TABLE {
        println!("  {:3} (0x{:02X}): {}", info.code, info.code, info.name);
    }
}

/// Parse `<header> [data..]` decimal arguments and run the command
fn send_from_parts<'a>(
    session: &Arc<Mutex<Session>>,
    mut parts: impl Iterator<Item = &'a str>,
    json: bool,
) {
    let Some(header) = parts.next().and_then(|arg| arg.parse::<u8>().ok()) else {
        println!("Error: header must be a decimal number 0-255");
        return;
    };
    let mut data = Vec::new();
    for arg in parts {
        match arg.parse::<u8>() {
            Ok(byte) => data.push(byte),
            Err(_) => {
                println!("Error: invalid data byte '{arg}'");
                return;
            }
        }
    }

    let result = match session.lock() {
        Ok(mut session) => session.command(header, &data),
        Err(_) => {
            warn!("session mutex poisoned");
            return;
        }
    };
    match result {
        Ok(packet) => print_response(header, &data, &packet, json),
        Err(e) => println!("Error: {e}"),
    }
}

fn print_response(header: u8, sent: &[u8], packet: &Packet, json: bool) {
    if json {
        match serde_json::to_string(packet) {
            Ok(text) => println!("{text}"),
            Err(e) => println!("Error: {e}"),
        }
        return;
    }

    print!(
        "Req: {header} {sent:?}, Resp: {} {:?}",
        packet.header, packet.data
    );
    if header == commands::READ_BUFFERED_BILL_EVENTS {
        println!();
        match EventReport::decode(&packet.data) {
            Ok(report) => print_report(&report),
            Err(e) => println!("Error: {e}"),
        }
    } else if let Some(text) = printable_ascii(&packet.data) {
        println!("  {text}");
    } else {
        println!();
    }
}

fn print_report(report: &EventReport) {
    println!("Counter: {}", report.counter);
    for event in &report.events {
        println!("  {}: {}", event.category(), event.description());
    }
}

/// Render the payload as text when every byte is printable ASCII (or NUL
/// padding), the way identity replies usually are
fn printable_ascii(data: &[u8]) -> Option<String> {
    if data.is_empty() || !data.iter().all(|b| *b == 0 || (32..=126).contains(b)) {
        return None;
    }
    Some(
        data.iter()
            .filter(|b| **b != 0)
            .map(|b| *b as char)
            .collect(),
    )
}

fn start_polling(poller: &mut PollingEngine, period: Duration, json: bool) {
    let subscriber = Box::new(move |update: PollUpdate| match update {
        PollUpdate::Events(report) => {
            if json {
                match serde_json::to_string(&report) {
                    Ok(text) => println!("{text}"),
                    Err(e) => println!("Error: {e}"),
                }
            } else {
                println!();
                print_report(&report);
                print!("(polling) > ");
                let _ = std::io::stdout().flush();
            }
        }
        PollUpdate::Warning(message) => {
            eprintln!("Polling warning: {message}");
        }
    });

    match poller.start(period, subscriber) {
        Ok(()) => println!(
            "Polling started (period: {}ms). Type 'stop' to stop.",
            period.as_millis()
        ),
        Err(e) => println!("Error: {e}"),
    }
}
