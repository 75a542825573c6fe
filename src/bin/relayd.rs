//! Notification relay daemon
//!
//! Serves the event-ingestion socket and the control socket until
//! interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use notify_relay::{ControlServer, EventListener, ForwardingBridge, RelayConfig, SourceStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Use --help for usage information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config_path
}

fn print_help() {
    println!(
        r#"notify-relayd - notification filtering and forwarding daemon

USAGE:
    notify-relayd [OPTIONS]

OPTIONS:
    -h, --help              Show this help message
    -c, --config <PATH>     Path to configuration file

SOCKETS:
    Events:  one JSON notification per line from the host environment
    Control: JSON request/response for allow-list management
             (see notify-relay-ctl)

Accepted notifications are forwarded to the consumer application's
socket; when the consumer is not running its binary is relaunched with
the payload attached."#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match parse_args() {
        Some(path) => RelayConfig::load_from_path(path),
        None => RelayConfig::load(),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("Starting notify-relay daemon...");
    println!("Event socket:   {:?}", config.sockets.event_socket);
    println!("Control socket: {:?}", config.sockets.control_socket);
    println!("Consumer:       {:?}", config.consumer.socket);
    println!("Press Ctrl+C to stop");

    let store = Arc::new(SourceStore::open(&config.general.allow_list_path)?);
    let bridge = Arc::new(ForwardingBridge::new(
        config.consumer.socket.clone(),
        config.consumer.binary.clone(),
    ));

    let events = EventListener::new(
        config.sockets.event_socket.clone(),
        Arc::clone(&store),
        Arc::clone(&bridge),
    );
    let control = ControlServer::new(config.sockets.control_socket.clone(), Arc::clone(&store));

    tokio::select! {
        result = events.run() => {
            if let Err(e) = result {
                eprintln!("Event listener error: {}", e);
            }
        }
        result = control.run() => {
            if let Err(e) = result {
                eprintln!("Control server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    // Clean up socket files
    for socket in [&config.sockets.event_socket, &config.sockets.control_socket] {
        if socket.exists() {
            std::fs::remove_file(socket)?;
        }
    }

    Ok(())
}
