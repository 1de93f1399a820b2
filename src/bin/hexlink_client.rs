//! Hexlink Client Binary
//!
//! Satu panggilan RPC ke server, lalu cetak reply-nya.
//!
//! Usage:
//!   cargo run --release --bin hexlink_client -- svc/echo '{"text":"hi"}'

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use serde_json::Value;
use tracing::{error, info, warn};

use hexlink::config::ChannelConfig;
use hexlink::logging;
use hexlink::rpc::{Reply, RpcClient, RpcEvent};

#[derive(Parser, Debug)]
#[command(name = "hexlink_client", about = "Call one Hexlink RPC route")]
struct Args {
    /// Route to call, e.g. svc/echo
    uri: String,

    /// Arguments as a JSON object
    #[arg(default_value = "{}")]
    args: String,

    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:9999")]
    server: SocketAddr,

    /// Give up after this many seconds
    #[arg(short, long, default_value_t = 5)]
    timeout_secs: u64,

    /// Send every packet uncompressed
    #[arg(long)]
    no_compression: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn print_reply(reply: &Reply) {
    println!("📨 Reply to #{} ({:.2?})", reply.request_id, reply.elapsed);
    println!("   Status:  {}", reply.status_code);
    match reply.json() {
        Ok(value) => println!("   Payload: {value}"),
        Err(_) => println!("   Payload: {}", reply.text()),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    let call_args: Value = match serde_json::from_str(&args.args) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) => {
            error!("Arguments must be a JSON object");
            return ExitCode::from(2);
        }
        Err(e) => {
            error!(error = %e, "Arguments are not valid JSON");
            return ExitCode::from(2);
        }
    };

    let mut config = ChannelConfig::default();
    config.compression.enabled = !args.no_compression;

    let mut client = match RpcClient::connect(args.server, config) {
        Ok(client) => client,
        Err(e) => {
            error!(server = %args.server, error = %e, "Failed to connect");
            return ExitCode::FAILURE;
        }
    };

    let request_id = match client.call(&args.uri, &call_args) {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Call rejected");
            return ExitCode::FAILURE;
        }
    };
    info!(request_id, uri = %args.uri, "Call sent");

    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    while Instant::now() < deadline {
        let events = match client.poll(Some(Duration::from_millis(50))) {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "Poll failed");
                return ExitCode::FAILURE;
            }
        };
        for event in events {
            match event {
                RpcEvent::Reply(reply) if reply.request_id == request_id => {
                    print_reply(&reply);
                    return if reply.is_success() {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::FAILURE
                    };
                }
                RpcEvent::Disconnected { reason, .. } => {
                    error!(?reason, "Connection lost before reply");
                    return ExitCode::FAILURE;
                }
                RpcEvent::Notification(envelope) => {
                    info!(uri = ?envelope.uri, "Notification");
                }
                RpcEvent::Connected | RpcEvent::Reply(_) => {}
            }
        }
    }

    warn!(timeout_secs = args.timeout_secs, "No reply before timeout");
    ExitCode::FAILURE
}
