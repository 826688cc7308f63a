//! vspaces: save and restore window arrangements into numbered slots.

use std::{path::PathBuf, process::exit, sync::Arc};

use clap::{Parser, Subcommand};
use mac_winctl::{DisplayId, ops::WinOps};
use vspaces_engine::{Engine, EngineCfg, SlotId};

#[derive(Parser)]
#[command(name = "vspaces", about, version)]
struct Cli {
    #[command(flatten)]
    log: logging::LogArgs,

    /// Store file (defaults to ~/.vspaces.ron)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Treat a slot as one arrangement spanning all displays
    #[arg(long)]
    shared: bool,

    /// Target display id (defaults to the primary display)
    #[arg(long)]
    display: Option<DisplayId>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Capture the current arrangement into a slot
    Save {
        /// Slot number
        slot: SlotId,
    },
    /// Re-apply the arrangement stored in a slot
    Restore {
        /// Slot number
        slot: SlotId,
    },
    /// Remove the arrangement stored in a slot
    Clear {
        /// Slot number
        slot: SlotId,
    },
    /// Set or clear a slot's label
    Rename {
        /// Slot number
        slot: SlotId,
        /// New label; omit to clear
        name: Option<String>,
    },
    /// List stored arrangements
    List,
    /// Track focus changes and auto-activate matching slots
    Watch,
}

#[cfg(target_os = "macos")]
fn platform_ops() -> Arc<dyn WinOps> {
    mac_winctl::ops::real_ops()
}

#[cfg(not(target_os = "macos"))]
fn platform_ops() -> Arc<dyn WinOps> {
    eprintln!("vspaces: the window platform is only available on macOS");
    exit(2)
}

fn default_store_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".vspaces.ron"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.log.init();

    let ops = platform_ops();
    let cfg = EngineCfg {
        store_path: cli.store.clone().or_else(default_store_path),
        shared: cli.shared,
        ..EngineCfg::default()
    };
    let engine = match Engine::spawn(ops, cfg) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("vspaces: {e}");
            exit(1);
        }
    };

    if let Err(e) = run(&engine, cli.cmd, cli.display).await {
        eprintln!("vspaces: {e}");
        exit(1);
    }
}

async fn run(engine: &Engine, cmd: Cmd, display: Option<DisplayId>) -> vspaces_engine::Result<()> {
    match cmd {
        Cmd::Save { slot } => {
            let n = engine.save(slot, display).await?;
            if n == 0 {
                println!("nothing visible; slot {slot} left unchanged");
            } else {
                println!("saved {n} windows to slot {slot}");
            }
        }
        Cmd::Restore { slot } => {
            let report = engine.restore(slot, display).await?;
            if report.skipped == 0 {
                println!("restored slot {slot}: {} windows", report.matched);
            } else {
                println!(
                    "restored slot {slot}: {} windows ({} not found)",
                    report.matched, report.skipped
                );
            }
        }
        Cmd::Clear { slot } => {
            engine.clear(slot, display).await?;
            println!("cleared slot {slot}");
        }
        Cmd::Rename { slot, name } => {
            if engine.rename(slot, display, name.clone()).await? {
                match name {
                    Some(name) => println!("slot {slot} renamed to \"{name}\""),
                    None => println!("slot {slot} label cleared"),
                }
            } else {
                println!("slot {slot} is empty");
            }
        }
        Cmd::List => {
            let spaces = engine.spaces().await?;
            if spaces.is_empty() {
                println!("no saved arrangements");
            }
            for space in spaces {
                let name = space.name.as_deref().unwrap_or("-");
                println!(
                    "slot {} display {} {:>2} windows  {}",
                    space.slot,
                    space.display,
                    space.windows.len(),
                    name
                );
            }
        }
        Cmd::Watch => watch(engine).await,
    }
    Ok(())
}

/// Print engine events and feed platform focus notifications into it. Parks
/// the main thread in the platform run loop; the engine runs on the tokio
/// workers.
#[cfg(target_os = "macos")]
async fn watch(engine: &Engine) {
    use tokio::sync::{broadcast::error::RecvError, mpsc};

    let (tx, rx) = mpsc::unbounded_channel();
    mac_winctl::set_focus_sink(tx);
    engine.attach_focus_events(rx);

    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ev) => {
                    println!(
                        "{:?} slot {} display {} [{}]",
                        ev.action,
                        ev.slot,
                        ev.display,
                        ev.apps.join(", ")
                    );
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("watching; ctrl-c to stop");
    mac_winctl::install_focus_observer();
    mac_winctl::pump_focus_events();
}

#[cfg(not(target_os = "macos"))]
async fn watch(_engine: &Engine) {
    // platform_ops() already refused to start on this platform.
    unreachable!("watch requires the macOS platform")
}
