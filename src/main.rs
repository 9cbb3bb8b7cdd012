use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use vnetd::capture::{Capture, PacketSocket};
use vnetd::config::{self, Config, Mode};
use vnetd::dataplane::{ArpCache, FrameHandler, PortId, PortTable, RouteTable, Router, Switch};
use vnetd::protocol::ethernet::MAX_FRAME_SIZE;
use vnetd::protocol::MacAddr;
use vnetd::telemetry::{init_logging, Metrics};
use vnetd::{Error, Result};

#[derive(Parser)]
#[command(name = "vnetd")]
#[command(about = "An IPv4 router and learning switch data plane")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the data plane daemon
    Run {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Validate the configuration and static tables without binding sockets
    Check {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run { config }) => cmd_run(&config),
        Some(Commands::Check { config }) => cmd_check(&config),
        None => cmd_run(&PathBuf::from("config.toml")),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn cmd_run(config_path: &PathBuf) -> Result<()> {
    let cfg = config::load(config_path)?;
    init_logging(Some(&cfg.log));
    info!("Loaded {}", config_path.display());

    let ports = Arc::new(build_ports(&cfg)?);
    let metrics = Arc::new(Metrics::new());
    for port in ports.iter() {
        metrics.register_port(port.id);
    }

    let handler: Arc<dyn FrameHandler> = match cfg.mode {
        Mode::Router => {
            let router_cfg = cfg
                .router
                .as_ref()
                .ok_or_else(|| Error::Config("router mode requires a [router] section".into()))?;
            let routes = RouteTable::load(&router_cfg.route_table, &ports)?;
            let arp = ArpCache::load(&router_cfg.arp_cache)?;
            info!(
                routes = routes.len(),
                arp_entries = arp.len(),
                "router tables loaded"
            );
            Arc::new(Router::new(ports.clone(), routes, arp, metrics.clone()))
        }
        Mode::Switch => {
            info!("learning switch mode");
            Arc::new(Switch::new(ports.clone(), metrics.clone()))
        }
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        // Bind every port before processing any traffic
        let mut sockets = Vec::new();
        for port in ports.iter() {
            info!("Binding to interface {}...", port.name);
            let socket = PacketSocket::bind(&port.name).map_err(|e| {
                Error::Config(format!(
                    "failed to bind to {}: {}. Run with root privileges.",
                    port.name, e
                ))
            })?;
            sockets.push((port.id, port.name.clone(), socket));
        }

        let mut senders: HashMap<PortId, mpsc::Sender<Vec<u8>>> = HashMap::new();
        let mut receivers = Vec::new();
        for (id, _, _) in &sockets {
            let (tx, rx) = mpsc::channel(256);
            senders.insert(*id, tx);
            receivers.push(rx);
        }

        info!("Started, processing frames on {} ports", sockets.len());

        let mut tasks = Vec::new();
        for ((id, name, socket), outbound) in sockets.into_iter().zip(receivers) {
            let handler = handler.clone();
            let senders = senders.clone();
            tasks.push(tokio::spawn(port_loop(
                id, name, socket, outbound, handler, senders,
            )));
        }

        for task in tasks {
            let _ = task.await;
        }
        Ok(())
    })
}

/// One task per port: receive frames into the handler, transmit frames
/// other ports hand us over the channel.
async fn port_loop(
    id: PortId,
    name: String,
    mut socket: PacketSocket,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    handler: Arc<dyn FrameHandler>,
    senders: HashMap<PortId, mpsc::Sender<Vec<u8>>>,
) {
    let mut buf = vec![0u8; MAX_FRAME_SIZE];

    loop {
        tokio::select! {
            result = socket.recv(&mut buf) => match result {
                Ok(len) => {
                    for (out_port, frame) in handler.handle_frame(&buf[..len], id) {
                        match senders.get(&out_port) {
                            // try_send so a stalled peer cannot block this
                            // port; the frame is dropped instead
                            Some(tx) => {
                                if let Err(e) = tx.try_send(frame) {
                                    warn!(port = out_port, "output queue full: {}", e);
                                }
                            }
                            None => warn!(port = out_port, "no such output port"),
                        }
                    }
                }
                Err(e) => error!(port = %name, "receive error: {}", e),
            },
            Some(frame) = outbound.recv() => {
                if let Err(e) = socket.send(&frame).await {
                    warn!(port = %name, "send failed: {}", e);
                }
            }
        }
    }
}

fn cmd_check(config_path: &PathBuf) -> Result<()> {
    println!("[INFO] Validating {}...", config_path.display());

    let cfg = config::load(config_path)?;
    let ports = build_ports(&cfg)?;
    println!("[INFO] {} interfaces configured", ports.len());

    if cfg.mode == Mode::Router {
        let router_cfg = cfg
            .router
            .as_ref()
            .ok_or_else(|| Error::Config("router mode requires a [router] section".into()))?;
        let routes = RouteTable::load(&router_cfg.route_table, &ports)?;
        let arp = ArpCache::load(&router_cfg.arp_cache)?;
        println!(
            "[INFO] {} routes, {} ARP entries",
            routes.len(),
            arp.len()
        );
    }

    println!("[INFO] Configuration is valid");
    Ok(())
}

fn build_ports(cfg: &Config) -> Result<PortTable> {
    let mut ports = PortTable::new();

    for (name, iface) in &cfg.interfaces {
        let mac = match &iface.mac {
            Some(s) => s
                .parse()
                .map_err(|_| Error::Config(format!("bad MAC on interface {}: {}", name, s)))?,
            None => interface_mac(name)?,
        };
        let ip = match &iface.address {
            Some(s) => Some(s.parse().map_err(|_| {
                Error::Config(format!("bad address on interface {}: {}", name, s))
            })?),
            None => None,
        };
        ports.add(name, mac, ip);
    }

    Ok(ports)
}

/// Read the MAC from /sys/class/net/{name}/address. A missing or unreadable
/// interface is startup-fatal; the router must never emit frames with a
/// zero source MAC.
fn interface_mac(name: &str) -> Result<MacAddr> {
    let path = format!("/sys/class/net/{}/address", name);
    let content = std::fs::read_to_string(&path).map_err(|_| Error::InterfaceNotFound {
        name: name.to_string(),
    })?;
    content.trim().parse().map_err(|_| Error::InterfaceNotFound {
        name: name.to_string(),
    })
}
