//! Control CLI for the notification relay.
//!
//! Drives the daemon's control socket: manage the allow-list, toggle
//! per-source flags, or open the system notification settings.

use std::path::PathBuf;

use notify_relay::{ControlClient, ControlRequest, RelayConfig};

struct CtlArgs {
    socket: PathBuf,
    request: ControlRequest,
}

fn parse_args() -> CtlArgs {
    let args: Vec<String> = std::env::args().collect();

    let mut socket: Option<PathBuf> = None;
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--socket" => {
                i += 1;
                if i < args.len() {
                    socket = Some(PathBuf::from(&args[i]));
                }
            }
            arg => positional.push(arg),
        }
        i += 1;
    }

    let request = match positional.as_slice() {
        ["add", id] => ControlRequest::add_source(id),
        ["remove", id] => ControlRequest::remove_source(id),
        ["list"] => ControlRequest::list_sources(),
        ["enable", id] => ControlRequest::set_enabled(id, true),
        ["disable", id] => ControlRequest::set_enabled(id, false),
        ["status", id] => ControlRequest::is_enabled(id),
        ["open-settings"] => ControlRequest::open_system_settings(),
        _ => {
            eprintln!("Missing or unknown command.");
            eprintln!("Use --help for usage information.");
            std::process::exit(1);
        }
    };

    CtlArgs {
        socket: socket.unwrap_or_else(|| RelayConfig::load().sockets.control_socket),
        request,
    }
}

fn print_help() {
    println!(
        r#"notify-relay-ctl - manage the notification relay allow-list

USAGE:
    notify-relay-ctl [--socket PATH] <COMMAND>

COMMANDS:
    add <source-id>       Register a source (e.g. kz.kaspi.mobile)
    remove <source-id>    Unregister a source and clear its flag
    list                  List registered sources
    enable <source-id>    Enable forwarding for a source
    disable <source-id>   Disable forwarding for a source
    status <source-id>    Show whether a source is enabled
    open-settings         Open the system notification settings

OPTIONS:
    -h, --help            Show this help message
    --socket <PATH>       Control socket path (default: from config)

EXAMPLES:
    notify-relay-ctl add kz.kaspi.mobile
    notify-relay-ctl enable kz.kaspi.mobile
    notify-relay-ctl list"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = parse_args();
    let client = ControlClient::new(&args.socket);

    let response = client.call(&args.request).await?;

    if response.is_ok() {
        match response.result {
            Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
            None => println!("ok"),
        }
        Ok(())
    } else {
        eprintln!(
            "Error ({:?}): {}",
            response.code,
            response.message.as_deref().unwrap_or("unknown")
        );
        std::process::exit(1);
    }
}
