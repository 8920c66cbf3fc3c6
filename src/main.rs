//! Busylight: simulation entry point.
//!
//! Runs the status controller on simulated hardware and drives it from
//! stdin.  Peer notifications go out over real TCP, so two instances (or
//! one instance and a `--remote` display) can talk to each other.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  ConsoleStrip   SimInputPin   SimOutputPin               │
//! │  (LedStrip)     (button)      (buzzer)                   │
//! │  TcpTransport   LogEventSink  JsonConfigFile             │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ──────────────      │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │  StatusController                               │      │
//! │  │  FSM · LightAnimator · Buzzer · PeerRegistry    │      │
//! │  └────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage:
//!
//! ```text
//! busylight [config.json]      controller, commands on stdin
//! busylight --remote [port]    print notifications received on `port`
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use log::{LevelFilter, info, warn};

use busylight::adapters::config_file::JsonConfigFile;
use busylight::adapters::log_sink::{LogEventSink, install_console_logger};
use busylight::adapters::peer_listener::PeerListener;
use busylight::adapters::sim::{ConsoleStrip, SimInputPin, SimOutputPin};
use busylight::adapters::tcp_transport::TcpTransport;
use busylight::app::ports::{ConfigPort, EdgeSource, StripLayout};
use busylight::peers::DEFAULT_PEER_PORT;
use busylight::{BusyLightConfig, Hardware, PeerAddr, StatusController};

const DEFAULT_CONFIG_PATH: &str = "busylight.json";

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("--remote") => {
            let port = match args.next() {
                Some(p) => p.parse().with_context(|| format!("invalid port '{p}'"))?,
                None => DEFAULT_PEER_PORT,
            };
            run_remote_display(port)
        }
        Some("--help" | "-h") => {
            println!("usage: busylight [config.json] | busylight --remote [port]");
            Ok(())
        }
        Some(path) => run_light(path),
        None => run_light(DEFAULT_CONFIG_PATH),
    }
}

fn init_logging(level: LevelFilter) -> Result<()> {
    install_console_logger(level).map_err(|e| anyhow!("installing console logger: {e}"))
}

// ── Controller mode ───────────────────────────────────────────

fn run_light(config_path: &str) -> Result<()> {
    let config = JsonConfigFile::new(config_path)
        .load()
        .with_context(|| format!("loading {config_path}"))?;
    init_logging(config.log_filter().unwrap_or(LevelFilter::Info))?;

    let strip = Arc::new(Mutex::new(ConsoleStrip::new(StripLayout::from_config(&config))));
    let button = SimInputPin::new();
    let buzzer = SimOutputPin::new();

    info!(
        "pins: leds={} button={} buzzer={}",
        config.pin_leds, config.pin_button, config.pin_buzzer
    );

    let controller = StatusController::new(
        &config,
        Hardware {
            strip,
            button: button.clone(),
            buzzer,
        },
        Arc::new(TcpTransport::new(config.peer_send_timeout())),
        Arc::new(LogEventSink::new()),
    )?;

    let edges = controller.clone();
    button.subscribe(Box::new(move |raw| edges.button_edge(raw)));

    println!("busylight ready; type 'help' for commands");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_command(&line, &config) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(cmd)) => execute(&controller, &button, cmd)?,
            Ok(None) => {}
            Err(msg) => println!("{msg}"),
        }
    }

    // Drop the handler's controller handle before shutting down.
    button.subscribe(Box::new(|_| {}));
    controller.shutdown()?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Trigger(String),
    Bell,
    Press,
    Release,
    Add(PeerAddr),
    Del(PeerAddr),
    Activate(PeerAddr),
    Deactivate(PeerAddr),
    Sweep,
    Status,
    Help,
    Quit,
}

const HELP: &str = "\
none | call | video | request | coffee   fire a trigger
bell                                     press the bell (debounced path bypassed)
press | release                          drive the raw button line
add | del | activate | deactivate <ip[:port]>
sweep                                    drop expired remotes
status                                   print state and remotes as JSON
quit";

fn parse_command(line: &str, config: &BusyLightConfig) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let mut peer = || -> Result<PeerAddr, String> {
        let arg = words.next().ok_or_else(|| format!("'{verb}' needs <ip[:port]>"))?;
        PeerAddr::parse(arg, config.peer_port).map_err(|e| e.to_string())
    };
    let cmd = match verb.to_ascii_lowercase().as_str() {
        "none" | "call" | "video" | "request" | "coffee" => Command::Trigger(verb.to_string()),
        "bell" => Command::Bell,
        "press" => Command::Press,
        "release" => Command::Release,
        "add" => Command::Add(peer()?),
        "del" => Command::Del(peer()?),
        "activate" => Command::Activate(peer()?),
        "deactivate" => Command::Deactivate(peer()?),
        "sweep" => Command::Sweep,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(cmd))
}

fn execute(controller: &StatusController, button: &SimInputPin, cmd: Command) -> Result<()> {
    match cmd {
        Command::Trigger(name) => {
            if controller.set_state(&name) {
                println!("ok: {}", controller.get_state());
            } else {
                println!("refused: '{}' not allowed from '{}'", name, controller.get_state());
            }
        }
        Command::Bell => controller.on_bell_button(),
        Command::Press => button.set_level(true),
        Command::Release => button.set_level(false),
        Command::Add(peer) => controller.add_or_update_remote(peer),
        Command::Del(peer) => {
            if !controller.delete_remote(&peer) {
                println!("{peer} not registered");
            }
        }
        Command::Activate(peer) => {
            if !controller.activate_remote(&peer) {
                println!("{peer} not registered");
            }
        }
        Command::Deactivate(peer) => {
            if !controller.deactivate_remote(&peer) {
                println!("{peer} not registered");
            }
        }
        Command::Sweep => println!("{} expired", controller.sweep_expired_remotes()),
        Command::Status => println!("{}", serde_json::to_string(&controller.status())?),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

// ── Remote display mode ───────────────────────────────────────

fn run_remote_display(port: u16) -> Result<()> {
    init_logging(LevelFilter::Info)?;
    if port == 0 {
        bail!("port must be > 0");
    }
    let listener = PeerListener::bind(
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
        Duration::from_secs(1),
    )
    .with_context(|| format!("binding port {port}"))?;
    info!("remote display listening on {}", listener.local_addr()?);

    loop {
        match listener.accept_one() {
            Ok((from, n)) => println!("{} -> {} (remotes: {:?})", from.ip(), n.state, n.remotes),
            Err(e) => warn!("accept failed: {}", e),
        }
    }
}
