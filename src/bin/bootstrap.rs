//! `jtrade-bootstrap`: supervisor process (spec §6.2). Reads the JSON config,
//! allocates one eventfd-class wakeup counter per `(location, destination)`
//! pair the engines will need, publishes them via the `FDS` environment
//! variable (or, when descriptor inheritance isn't available, a `SCM_RIGHTS`
//! fallback socket), forks/execs the three engine processes, and joins them.

use std::io;
use std::os::fd::RawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::process::{Child, Command};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jtrade_core::bootstrap::{send_fd_set, wakeup_keys, write_fallback_file, Config};

#[derive(Parser)]
#[command(name = "jtrade-bootstrap")]
struct Cli {
    /// Main JSON configuration file (spec §6.2).
    #[arg(long, env = "JTRADE_CFG")]
    cfg: PathBuf,

    /// Path to the `jtrade` engine binary; defaults to a sibling of this one.
    #[arg(long)]
    engine_bin: Option<PathBuf>,

    /// Use the `SCM_RIGHTS` fallback socket instead of `FDS` env inheritance
    /// (spec §6.2: "if the descriptors cannot be inherited").
    #[arg(long)]
    fallback_socket: bool,
}

const ROLES: [&str; 3] = ["md", "td", "cp"];

fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.cfg).with_context(|| format!("loading config {}", cli.cfg.display()))?;
    cfg.validate().context("invalid configuration")?;

    let keys = wakeup_keys(&cfg);
    info!(count = keys.len(), "allocated wakeup descriptor keys");

    let engine_bin = cli.engine_bin.clone().unwrap_or_else(default_engine_bin);

    let children = if cli.fallback_socket {
        spawn_via_fallback_socket(&engine_bin, &cli.cfg, &cfg, &keys)?
    } else {
        spawn_via_env(&engine_bin, &cli.cfg, &keys)?
    };

    let mut exit_code = 0;
    for (role, mut child) in children {
        match child.wait() {
            Ok(status) => {
                let code = status.code().unwrap_or(1);
                info!(role, code, "engine process exited");
                if code != 0 {
                    exit_code = code;
                }
            }
            Err(e) => {
                error!(role, error = %e, "failed to wait on engine process");
                exit_code = 1;
            }
        }
    }
    std::process::exit(exit_code);
}

fn default_engine_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("jtrade-bootstrap"));
    path.set_file_name("jtrade");
    path
}

/// Create one eventfd-class counter per key without `FD_CLOEXEC`, so the
/// descriptor survives into the exec'd child at the same fd number (spec
/// §6.2: "publishes ... to the environment variable FDS").
fn allocate_inheritable_counters(keys: &[String]) -> io::Result<Vec<RawFd>> {
    keys.iter()
        .map(|_| {
            let fd = unsafe { libc::eventfd(0, 0) };
            if fd < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(fd)
            }
        })
        .collect()
}

fn encode_fds_env(keys: &[String], fds: &[RawFd]) -> String {
    keys.iter()
        .zip(fds)
        .map(|(name, fd)| format!("{name}:{fd}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn spawn_via_env(engine_bin: &PathBuf, cfg_path: &PathBuf, keys: &[String]) -> Result<Vec<(&'static str, Child)>> {
    let fds = allocate_inheritable_counters(keys).context("allocating wakeup counters")?;
    let fds_env = encode_fds_env(keys, &fds);

    let mut children = Vec::new();
    for role in ROLES {
        let child = Command::new(engine_bin)
            .arg("--role")
            .arg(role)
            .arg("--cfg")
            .arg(cfg_path)
            .env("FDS", &fds_env)
            .spawn()
            .with_context(|| format!("spawning {role} engine"))?;
        info!(role, pid = child.id(), "spawned engine process");
        children.push((role, child));
    }
    Ok(children)
}

/// Spawn engines without descriptor inheritance: bind a Unix socket, write
/// the fallback file every engine's `FdsMap::from_fallback_file` reads (at
/// `cfg.system.fds_fallback_path`), and serve one connection per engine with
/// the full ordered fd set over `SCM_RIGHTS` (spec §6.2).
fn spawn_via_fallback_socket(engine_bin: &PathBuf, cfg_path: &PathBuf, cfg: &Config, keys: &[String]) -> Result<Vec<(&'static str, Child)>> {
    let fallback_path = cfg
        .system
        .fds_fallback_path
        .clone()
        .context("fallback socket mode requires system.fds_fallback_path in the config")?;

    let fds = allocate_inheritable_counters(keys).context("allocating wakeup counters")?;

    let socket_path = std::env::temp_dir().join(format!("jtrade-fds-{}.sock", std::process::id()));
    let _ = std::fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path).context("binding descriptor fallback socket")?;
    write_fallback_file(&fallback_path, &socket_path, keys).context("writing descriptor fallback file")?;

    let served = std::thread::spawn({
        let fds = fds.clone();
        move || -> io::Result<()> {
            for stream in listener.incoming().take(ROLES.len()) {
                let stream: UnixStream = stream?;
                send_fd_set(&stream, &fds)?;
            }
            Ok(())
        }
    });

    let mut children = Vec::new();
    for role in ROLES {
        let child = Command::new(engine_bin)
            .arg("--role")
            .arg(role)
            .arg("--cfg")
            .arg(cfg_path)
            .env_remove("FDS")
            .spawn()
            .with_context(|| format!("spawning {role} engine"))?;
        info!(role, pid = child.id(), "spawned engine process");
        children.push((role, child));
    }

    if let Err(e) = served.join().unwrap_or_else(|_| bail_thread_panicked()) {
        warn!(error = %e, "fallback descriptor server ended with an error");
    }
    Ok(children)
}

fn bail_thread_panicked() -> io::Result<()> {
    Err(io::Error::new(io::ErrorKind::Other, "fallback descriptor server thread panicked"))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_env("JTRADE_LOG").unwrap_or_else(|_| "jtrade_bootstrap=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
