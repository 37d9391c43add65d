//! Signal-based IPC between the window manager and the block scheduler.

use std::path::{Path, PathBuf};

use nix::sys::signal::{SigSet, Signal};
use thiserror::Error;
use tracing::{debug, warn};

pub const PID_FILE_NAME: &str = "tagwm-blocks.pid";

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Block signal {0} is outside the real-time range")]
    OutOfRange(u8),
    #[error("Scheduler is not running (no pid file at {0:?})")]
    NotRunning(PathBuf),
    #[error("Failed to signal pid {pid}: {source}")]
    Kill {
        pid: i32,
        #[source]
        source: nix::Error,
    },
}

/// Where the scheduler records its pid: the user runtime directory, or the
/// temp directory when there is none.
pub fn pid_file_path() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(std::env::temp_dir).join(PID_FILE_NAME)
}

pub fn read_pid_file(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok().filter(|pid: &i32| *pid > 0)
}

/// Records the current pid at a path for as long as it lives.
#[derive(Debug)]
pub struct PidFile(PathBuf);

impl PidFile {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        std::fs::write(path, format!("{}\n", std::process::id()))?;
        debug!(?path, "Wrote pid file");
        Ok(Self(path.to_owned()))
    }

    pub fn path(&self) -> &Path { &self.0 }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            warn!(path = ?self.0, "Failed to remove pid file: {e}");
        }
    }
}

/// The real-time signal number for block signal `n` (`SIGRTMIN + n`).
pub fn block_signal_number(n: u8) -> Result<i32, SignalError> {
    let signo = nix::libc::SIGRTMIN() + i32::from(n);
    if n == 0 || signo > nix::libc::SIGRTMAX() {
        return Err(SignalError::OutOfRange(n));
    }
    Ok(signo)
}

/// Asks the scheduler at `pid` to refresh every block bound to signal `n`.
pub fn signal_block(pid: i32, n: u8) -> Result<(), SignalError> {
    let signo = block_signal_number(n)?;
    // SAFETY: kill has no memory-safety preconditions.
    let rc = unsafe { nix::libc::kill(pid, signo) };
    if rc != 0 {
        return Err(SignalError::Kill {
            pid,
            source: nix::Error::last(),
        });
    }
    debug!(pid, signal = n, "Signalled block scheduler");
    Ok(())
}

/// Signals the scheduler whose pid is recorded at `pid_file`. Used for
/// status-text clicks.
pub fn signal_scheduler(pid_file: &Path, n: u8) -> Result<(), SignalError> {
    let pid = read_pid_file(pid_file).ok_or_else(|| SignalError::NotRunning(pid_file.to_owned()))?;
    signal_block(pid, n)
}

/// Blocks SIGHUP in the calling thread and returns the set for a waiting
/// thread. Must run before any other thread is spawned so every thread
/// inherits the mask.
pub fn block_restart_signal() -> nix::Result<SigSet> {
    let mut set = SigSet::empty();
    set.add(Signal::SIGHUP);
    set.thread_block()?;
    Ok(set)
}

/// Waits for SIGHUP on a dedicated thread, calling `on_hup` each time.
pub fn spawn_restart_listener(set: SigSet, on_hup: impl Fn() + Send + 'static) {
    std::thread::spawn(move || {
        loop {
            match set.wait() {
                Ok(Signal::SIGHUP) => on_hup(),
                Ok(other) => debug!(?other, "Ignoring signal"),
                Err(e) => {
                    warn!("Signal wait failed: {e}");
                    return;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_signals_map_into_the_real_time_range() {
        assert_eq!(block_signal_number(1).unwrap(), nix::libc::SIGRTMIN() + 1);
        assert!(matches!(block_signal_number(0), Err(SignalError::OutOfRange(0))));
        assert!(block_signal_number(200).is_err());
    }

    #[test]
    fn pid_file_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PID_FILE_NAME);
        assert_eq!(read_pid_file(&path), None);
        std::fs::write(&path, "1234\n").unwrap();
        assert_eq!(read_pid_file(&path), Some(1234));
        std::fs::write(&path, "nope").unwrap();
        assert_eq!(read_pid_file(&path), None);
        assert!(matches!(signal_scheduler(&path, 1), Err(SignalError::NotRunning(_))));
    }

    #[test]
    fn pid_file_lives_as_long_as_the_guard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PID_FILE_NAME);
        let guard = PidFile::create(&path).unwrap();
        assert_eq!(guard.path(), path);
        assert_eq!(read_pid_file(&path), Some(std::process::id() as i32));
        drop(guard);
        assert!(!path.exists());
    }
}
