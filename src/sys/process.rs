use std::borrow::Cow;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::common::util::parse_command;

/// A command line, written either as one string or as an argument array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ExecCmd {
    String(String),
    Array(Vec<String>),
}

/// Replaced by the selected monitor index in spawned arguments.
pub const MONITOR_PLACEHOLDER: &str = "{monitor}";

impl ExecCmd {
    pub fn as_array(&self) -> Cow<'_, [String]> {
        match self {
            ExecCmd::Array(vec) => Cow::Borrowed(vec),
            ExecCmd::String(s) => parse_command(s).into(),
        }
    }

    pub fn with_monitor(&self, monitor: usize) -> Vec<String> {
        let index = monitor.to_string();
        self.as_array().iter().map(|arg| arg.replace(MONITOR_PLACEHOLDER, &index)).collect()
    }
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("Empty argument list passed to spawn")]
    EmptyCommand,
    #[error("Failed to spawn {program:?}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fire-and-forget process launch.
pub trait Launcher {
    fn spawn(&self, argv: &[String]) -> Result<(), SpawnError>;
}

/// Starts children in their own session with stdout closed, so nothing they
/// print reaches the bridge. A detached thread reaps each child.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn spawn(&self, argv: &[String]) -> Result<(), SpawnError> {
        let [program, args @ ..] = argv else {
            return Err(SpawnError::EmptyCommand);
        };
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).stdout(Stdio::null());
        // SAFETY: setsid is async-signal-safe and touches no parent state.
        unsafe {
            command.pre_exec(|| {
                let _ = nix::unistd::setsid();
                Ok(())
            });
        }
        let mut child = command.spawn().map_err(|source| SpawnError::Io {
            program: program.clone(),
            source,
        })?;
        debug!(pid = child.id(), ?program, "Spawned");
        let program = program.clone();
        std::thread::spawn(move || match child.wait() {
            Ok(status) if status.success() => trace!(?program, "Child exited"),
            Ok(status) => warn!(?program, %status, "Child exited unsuccessfully"),
            Err(e) => error!(?program, "Failed to wait for child: {e}"),
        });
        Ok(())
    }
}

/// Process ancestry, used to decide whether a terminal spawned a window.
pub trait ProcessTree {
    fn parent(&self, pid: u32) -> Option<u32>;

    /// `pid` followed by its parents, nearest first.
    fn ancestry(&self, pid: u32) -> Vec<u32> {
        let mut chain = vec![pid];
        let mut current = pid;
        // Bounded so a malformed table cannot loop forever.
        for _ in 0..256 {
            match self.parent(current) {
                Some(parent) if parent != 0 && parent != current => {
                    chain.push(parent);
                    current = parent;
                }
                _ => break,
            }
        }
        chain
    }
}

/// Reads parents from `/proc/<pid>/stat`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcFs;

impl ProcessTree for ProcFs {
    fn parent(&self, pid: u32) -> Option<u32> {
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
        parse_stat_ppid(&stat)
    }
}

/// The command name is parenthesised and may itself contain spaces or
/// parentheses, so fields are counted from the last `)`.
fn parse_stat_ppid(stat: &str) -> Option<u32> {
    let (_, rest) = stat.rsplit_once(')')?;
    rest.split_ascii_whitespace().nth(1)?.parse().ok()
}

/// Replaces the current process image with a fresh copy of itself, keeping
/// the arguments. Tried twice; exits with status 1 if both attempts fail.
pub fn reexec() -> ! {
    let args: Vec<_> = std::env::args_os().skip(1).collect();
    match std::env::current_exe() {
        Ok(exe) => {
            for attempt in 1..=2 {
                let err = Command::new(&exe).args(&args).exec();
                error!(attempt, ?exe, "Failed to re-exec: {err}");
            }
        }
        Err(e) => error!("Cannot locate the current executable: {e}"),
    }
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parent_pid_from_stat() {
        let stat = "4242 (st) S 4100 4242 4100 0 -1 4194560 1020 0 0 0";
        assert_eq!(parse_stat_ppid(stat), Some(4100));
        let tricky = "77 (my (weird) cmd) R 12 77 77 0";
        assert_eq!(parse_stat_ppid(tricky), Some(12));
        assert_eq!(parse_stat_ppid("garbage"), None);
    }

    #[test]
    fn own_process_descends_from_parent() {
        if !std::path::Path::new("/proc/self/stat").exists() {
            return;
        }
        let me = std::process::id();
        let ppid = ProcFs.parent(me);
        assert!(ppid.is_some());
        let chain = ProcFs.ancestry(me);
        assert_eq!(chain[0], me);
        assert_eq!(chain.get(1).copied(), ppid);
    }

    #[test]
    fn exec_cmd_forms() {
        let s = ExecCmd::String("dmenu_run -m {monitor} -p 'run: '".into());
        assert_eq!(s.with_monitor(1), vec!["dmenu_run", "-m", "1", "-p", "run: "]);
        let a = ExecCmd::Array(vec!["st".into()]);
        assert_eq!(a.as_array().as_ref(), ["st".to_string()]);
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(matches!(ProcessLauncher.spawn(&[]), Err(SpawnError::EmptyCommand)));
    }
}
