use wakeboard::registry::Registry;
use wakeboard::wake;
use wakeboard::wol;

use clap::Parser;
use lazy_static::lazy_static;
use log::{error, info, warn};
use prometheus::{register_int_counter_vec, IntCounterVec};
use rouille::{post_input, router, try_or_400, Request, Response};
use serde::Serialize;
use serde_json::json;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use wake::{WakeConfig, WakeError};
use wol::noop::LogOnlySender;
use wol::{PacketSender, UdpSender};

lazy_static! {
    static ref WAKE_ATTEMPTS: IntCounterVec = register_int_counter_vec!(
        "wakeboard_wake_attempts_total",
        "Wake attempts handled, by outcome.",
        &["outcome"]
    )
    .unwrap();
}

struct AppState {
    registry: RwLock<Arc<Registry>>,
    sender: Box<dyn PacketSender>,
    wake_config: WakeConfig,
    devices_file: PathBuf,
}

impl AppState {
    fn registry(&self) -> Arc<Registry> {
        self.registry.read().unwrap().clone()
    }
}

#[derive(Serialize)]
struct DeviceInfo {
    key: String,
    name: String,
}

#[derive(Serialize)]
struct DevicesResponse {
    devices: Vec<DeviceInfo>,
}

fn index() -> Response {
    Response::html(include_str!("index.html"))
}

fn list_devices(state: &AppState) -> Response {
    let registry = state.registry();
    let devices = registry
        .iter()
        .map(|e| DeviceInfo {
            key: e.key.clone(),
            name: if e.display_name.is_empty() {
                e.key.clone()
            } else {
                e.display_name.clone()
            },
        })
        .collect();
    Response::json(&DevicesResponse { devices })
}

fn handle_wake(state: &AppState, request: &Request) -> Response {
    let input = try_or_400!(post_input!(request, { device: String }));
    let registry = state.registry();
    match wake::wake(
        &registry,
        state.sender.as_ref(),
        &state.wake_config,
        &input.device,
    ) {
        Ok(receipt) => {
            WAKE_ATTEMPTS.with_label_values(&["sent"]).inc();
            Response::json(&json!({
                "result": "sent",
                "message": format!(
                    "magic packet for {} handed to the network stack via {}; \
                     wake-on-lan sends no acknowledgement",
                    receipt.display_name, receipt.destination
                ),
            }))
        }
        Err(err) => {
            let (outcome, status) = match &err {
                WakeError::UnknownDevice { .. } => ("unknown_device", 404),
                WakeError::InvalidAddress { .. } => ("invalid_address", 500),
                WakeError::Network { .. } => ("network_error", 502),
            };
            WAKE_ATTEMPTS.with_label_values(&[outcome]).inc();
            Response::json(&json!({
                "result": outcome,
                "message": err.to_string(),
            }))
            .with_status_code(status)
        }
    }
}

fn handle_reload(state: &AppState) -> Response {
    match Registry::load(&state.devices_file) {
        Ok(reloaded) => {
            let count = reloaded.len();
            *state.registry.write().unwrap() = Arc::new(reloaded);
            info!(
                "reloaded {} devices from {}",
                count,
                state.devices_file.display()
            );
            Response::json(&json!({ "result": "reloaded", "devices": count }))
        }
        Err(err) => {
            error!("reload failed, keeping the previous registry: {}", err);
            Response::json(&json!({
                "result": "reload_failed",
                "message": err.to_string(),
            }))
            .with_status_code(500)
        }
    }
}

fn varz() -> Response {
    let metrics = prometheus::gather();
    let encoder = prometheus::TextEncoder::new();
    match encoder.encode_to_string(&metrics) {
        Ok(text) => Response::text(text),
        Err(e) => Response::text(format!("{}", e)).with_status_code(500),
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    http_addr: String,

    /// File listing wakeable devices, one per line as
    /// key,display name,hardware address[,broadcast].
    #[arg(long, env = "WAKEBOARD_DEVICES", default_value = "devices.csv")]
    devices_file: PathBuf,

    /// Broadcast address for devices without one of their own.
    #[arg(long, default_value = "255.255.255.255")]
    broadcast_addr: Ipv4Addr,

    /// UDP port wake packets are sent to.
    #[arg(long, default_value_t = wol::WOL_PORT)]
    wol_port: u16,

    /// How long a send may block before giving up, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    send_timeout_ms: u64,

    /// If true, log wakes instead of sending them.
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("INFO"))
        .format_timestamp(Some(env_logger::fmt::TimestampPrecision::Millis))
        .init();

    let registry = Registry::load(&args.devices_file)?;
    if registry.is_empty() {
        warn!("{} lists no devices", args.devices_file.display());
    }
    info!(
        "loaded {} devices from {}",
        registry.len(),
        args.devices_file.display()
    );

    let sender: Box<dyn PacketSender> = if args.log_only {
        info!("log-only mode, wake packets will not actually be sent");
        Box::new(LogOnlySender {})
    } else {
        Box::new(UdpSender::new(Duration::from_millis(args.send_timeout_ms)))
    };

    let state = Arc::new(AppState {
        registry: RwLock::new(Arc::new(registry)),
        sender,
        wake_config: WakeConfig {
            default_broadcast: args.broadcast_addr,
            port: args.wol_port,
        },
        devices_file: args.devices_file,
    });

    info!("Starting server...");
    rouille::start_server(args.http_addr, move |request| {
        let response = router!(request,
            (GET) (/) => { index() },
            (GET) (/devices) => { list_devices(&state) },
            (GET) (/varz) => { varz() },
            (POST) (/wake) => { handle_wake(&state, request) },
            (POST) (/reload) => { handle_reload(&state) },
            _ => Response::empty_404()
        );
        info!(
            "{request} {status}",
            request = request.raw_url(),
            status = response.status_code,
        );
        response
    });
}
