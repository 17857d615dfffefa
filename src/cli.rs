use anyhow::{Result, anyhow};
use pico_args::Arguments;
use std::{env, path::PathBuf, process::Command};

use crate::config::AppConfig;
use crate::ipc::{self, FeedSource};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            if let Some(t) = topic {
                print_subcmd_help(&t);
            } else {
                print_help();
            }
            Ok(())
        }

        Some("serve") => {
            let mut cfg = load_config(&mut pargs)?;
            if let Some(port) = pargs.opt_value_from_str::<_, u16>("--port")? {
                cfg.server.port = port;
            }
            let source = if pargs.contains("--stdin") {
                FeedSource::Stdin
            } else {
                FeedSource::Socket(ipc::socket_path(&cfg)?)
            };
            ipc::run_daemon(cfg, source)
        }

        Some("start") => {
            let config: Option<PathBuf> = pargs.opt_value_from_str("--config")?;
            let exe = env::current_exe()?;
            let mut cmd = Command::new(exe);
            cmd.arg("serve");
            if let Some(p) = config {
                cmd.arg("--config").arg(p);
            }
            let child = cmd.spawn()?;
            println!("gesturecast: started daemon (pid={})", child.id());
            Ok(())
        }

        Some("feed") => {
            let cfg = load_config(&mut pargs)?;
            let fps: Option<f64> = pargs.opt_value_from_str("--fps")?;
            let file: PathBuf = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturecast feed <file.ndjson> [--fps <n>]"))?;
            let sent = ipc::feed_file(&cfg, &file, fps)?;
            println!("ok: fed {sent} observation(s)");
            Ok(())
        }

        Some("config") => {
            let cfg = load_config(&mut pargs)?;
            print!("{}", cfg.to_toml()?);
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn load_config(pargs: &mut Arguments) -> Result<AppConfig> {
    let path: Option<PathBuf> = pargs.opt_value_from_str("--config")?;
    match path {
        Some(p) => AppConfig::load(&p),
        None => AppConfig::load_or_install_default(),
    }
}

fn print_help() {
    println!(
        r#"gesturecast: hand-gesture event broadcaster

USAGE:
  gesturecast help [command]                     Show general or command-specific help
  gesturecast serve [--stdin] [--port <n>]       Run the daemon in the foreground
  gesturecast start                              Start the daemon in the background
  gesturecast feed <file> [--fps <n>]            Stream an NDJSON recording into the daemon
  gesturecast config                             Print the effective configuration

All commands accept --config <path>.

TIPS:
  - Config: ~/.config/gesturecast/config.toml
  - Oracle feed socket: ~/.local/run/gesturecast.sock
  - Subscribers: ws://<host>:8000/ws, counters at http://<host>:8000/status
  - Verbose logs: RUST_LOG=debug gesturecast serve
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "serve" => println!(
            "usage: gesturecast serve [--config <path>] [--stdin] [--port <n>]\nRuns the WebSocket server and the frame pipeline. Observations are read from the feed socket, or from stdin with --stdin."
        ),
        "start" => println!(
            "usage: gesturecast start [--config <path>]\nSpawns `gesturecast serve` in the background."
        ),
        "feed" => println!(
            "usage: gesturecast feed <file> [--fps <n>] [--config <path>]\nSends one observation per line to the running daemon, paced at <n> lines per second when --fps is given."
        ),
        "config" => println!(
            "usage: gesturecast config [--config <path>]\nPrints the configuration after defaults are applied."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}
