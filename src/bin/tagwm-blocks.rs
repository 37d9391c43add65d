use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tagwm::actor::blocks::{Scheduler, ShellRunner, sink_for};
use tagwm::common::config::{Config, SinkSettings, config_file};
use tagwm::common::log;
use tagwm::sys::process::ExecCmd;
use tagwm::sys::signal::{PidFile, pid_file_path};
use tracing::warn;

#[derive(Parser)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run every block once, print the status line and exit.
    #[arg(long)]
    once: bool,

    /// Publish the status through this command instead of the configured
    /// sink; `{}` is replaced by the status line.
    #[arg(long, value_name = "CMD")]
    sink_command: Option<String>,
}

fn main() -> anyhow::Result<()> {
    sigpipe::reset();
    let opt = Cli::parse();
    log::init_logging();

    let config_path = opt.config.unwrap_or_else(config_file);
    let mut settings = Config::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?
        .blocks;
    for issue in settings.validate() {
        warn!("Config: {issue}");
    }
    if let Some(command) = opt.sink_command {
        settings.sink = SinkSettings::Command(ExecCmd::String(command));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building the runtime")?;
    runtime.block_on(async move {
        let scheduler = Scheduler::new(&settings, ShellRunner, sink_for(&settings.sink));
        if opt.once {
            scheduler.run_once().await;
            return Ok(());
        }
        let pid_path = pid_file_path();
        let _pid_file = PidFile::create(&pid_path)
            .with_context(|| format!("writing {}", pid_path.display()))?;
        let cancel = scheduler.cancellation();
        ctrlc::set_handler(move || cancel.cancel()).context("setting the signal handler")?;
        scheduler.run().await;
        Ok(())
    })
}
