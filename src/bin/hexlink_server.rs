//! Hexlink Server Binary
//!
//! RPC server demo dengan service bawaan:
//! - `svc/echo`  mengembalikan argumen `text`
//! - `svc/ping`  liveness check
//! - `svc/time`  waktu server (unix millis)
//!
//! Usage:
//!   cargo run --release --bin hexlink_server -- [OPTIONS]

use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use serde_json::{json, Value};
use tracing::{error, info};

use hexlink::config::ServerConfig;
use hexlink::network::ServerEvent;
use hexlink::rpc::{HandlerError, Router, RpcServer, Service, Signature};
use hexlink::{logging, RouterError};

#[derive(Parser, Debug)]
#[command(name = "hexlink_server", about = "Hexlink RPC server")]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:9999")]
    bind: SocketAddr,

    /// Refuse connections beyond this many
    #[arg(long, default_value_t = 1024)]
    max_connections: usize,

    /// Send every packet uncompressed
    #[arg(long)]
    no_compression: bool,

    /// Seconds without outbound traffic before a heartbeat (0 disables)
    #[arg(long, default_value_t = 5)]
    heartbeat_secs: u64,

    /// Seconds without inbound traffic before a peer is dropped (0 disables)
    #[arg(long, default_value_t = 0)]
    idle_timeout_secs: u64,

    /// Seconds between stats reports
    #[arg(long, default_value_t = 10)]
    stats_secs: u64,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig {
            bind_addr: self.bind,
            max_connections: self.max_connections,
            ..ServerConfig::default()
        };
        config.channel.compression.enabled = !self.no_compression;
        config.channel.heartbeat_interval = non_zero_secs(self.heartbeat_secs);
        config.channel.idle_timeout = non_zero_secs(self.idle_timeout_secs);
        config
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

struct BuiltinService;

impl Service for BuiltinService {
    fn register(&self, router: &mut Router) -> Result<(), RouterError> {
        router.register_fn("svc/echo", Signature::new().required("text"), |_, args| {
            Ok(json!({ "text": args["text"] }))
        })?;
        router.register_fn("svc/ping", Signature::new(), |request, _| {
            Ok(json!({ "pong": true, "connection": request.connection_id() }))
        })?;
        router.register_fn("svc/time", Signature::new(), |_, _| {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|e| HandlerError::new(e.to_string()))?;
            Ok(Value::from(now.as_millis() as u64))
        })
    }
}

fn print_stats(server: &RpcServer, uptime: Duration) {
    let stats = server.server().stats();
    let secs = uptime.as_secs_f64().max(f64::EPSILON);

    println!("\n📊 Server Stats (uptime: {:.1}s)", uptime.as_secs_f64());
    println!(
        "   Envelopes IN:  {} ({:.1}/sec)",
        stats.envelopes_received,
        stats.envelopes_received as f64 / secs
    );
    println!(
        "   Envelopes OUT: {} ({:.1}/sec)",
        stats.envelopes_queued,
        stats.envelopes_queued as f64 / secs
    );
    println!("   Bytes in:      {} KB", stats.bytes_received / 1024);
    println!("   Bytes out:     {} KB", stats.bytes_sent / 1024);
    println!(
        "   Connections:   {} active / {} total",
        stats.connections_active, stats.connections_total
    );
    if stats.connections_rejected > 0 {
        println!("   Rejected:      {} ⚠️", stats.connections_rejected);
    }
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut server = match RpcServer::bind(args.server_config()) {
        Ok(server) => server,
        Err(e) => {
            error!(addr = %args.bind, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    if let Err(e) = server.add_service(&BuiltinService) {
        error!(error = %e, "Failed to register services");
        std::process::exit(1);
    }

    let started = Instant::now();
    let stats_interval = Duration::from_secs(args.stats_secs.max(1));
    let mut last_stats = Instant::now();

    loop {
        match server.poll(Some(Duration::from_millis(50))) {
            Ok(events) => {
                for event in events {
                    if let ServerEvent::Connected { id, addr } = event {
                        info!(id, %addr, "Session started");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Poll failed");
                break;
            }
        }

        if last_stats.elapsed() >= stats_interval {
            print_stats(&server, started.elapsed());
            last_stats = Instant::now();
        }
    }

    server.server_mut().shutdown();
}
