use std::io::BufReader;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tagwm::actor::reactor::{self, Event, Reactor, RunState};
use tagwm::common::config::{Config, config_file};
use tagwm::common::log;
use tagwm::sys::bridge::{StdioBridge, spawn_event_reader};
use tagwm::sys::process::{ProcFs, ProcessLauncher, reexec};
use tagwm::sys::signal::{block_restart_signal, spawn_restart_listener};
use tracing::{error, info, warn};

#[derive(Parser)]
struct Cli {
    /// Check whether the configuration file is valid without starting the
    /// window manager.
    #[arg(long)]
    validate: bool,

    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() {
    sigpipe::reset();
    let opt = Cli::parse();
    log::init_logging();
    install_panic_hook();

    let config_path = opt.config.unwrap_or_else(config_file);

    if opt.validate {
        let config = match Config::read(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to read {}: {e:#}", config_path.display());
                process::exit(1);
            }
        };
        let issues = config.validate();
        if issues.is_empty() {
            println!("Config validation passed");
        } else {
            for issue in issues {
                eprintln!("{}", issue);
            }
            process::exit(1);
        }
        return;
    }

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load {}: {e:#}", config_path.display());
            process::exit(1);
        }
    };
    for issue in config.validate() {
        warn!("Config: {issue}");
    }

    // Blocked before any thread starts so that only the listener sees SIGHUP.
    let restart_signals = match block_restart_signal() {
        Ok(set) => set,
        Err(e) => {
            error!("Failed to block SIGHUP: {e}");
            process::exit(1);
        }
    };

    let (events_tx, events_rx) = tagwm::actor::channel::<reactor::Event>();

    let restart_tx = events_tx.clone();
    spawn_restart_listener(restart_signals, move || restart_tx.send(Event::Restart));

    let quit_tx = events_tx.clone();
    if let Err(e) = ctrlc::set_handler(move || quit_tx.send(Event::Quit)) {
        error!("Error setting Ctrl+C handler: {e}");
    }

    if let Err(e) = spawn_event_reader(BufReader::new(std::io::stdin()), events_tx) {
        error!("Failed to start the bridge reader: {e}");
        process::exit(1);
    }

    let mut reactor = Reactor::new(
        config,
        Box::new(StdioBridge::stdout()),
        Box::new(ProcessLauncher),
        Box::new(ProcFs),
    );
    reactor.start();
    match reactor.run(events_rx) {
        RunState::Restart => {
            info!("Restarting");
            reexec()
        }
        _ => info!("Exiting"),
    }
}

#[cfg(panic = "unwind")]
fn install_panic_hook() {
    // Abort on panic instead of leaving the control loop dead while the
    // reader thread keeps the process alive.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        original_hook(info);
        std::process::abort();
    }));
}

#[cfg(not(panic = "unwind"))]
fn install_panic_hook() {}
