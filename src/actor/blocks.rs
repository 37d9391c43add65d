//! The status-bar block scheduler.
//!
//! Every block owns a task that refreshes it once at startup, then on its
//! interval and whenever its real-time signal arrives. After each refresh the
//! joined status line is handed to a [`StatusSink`], unless it is unchanged.

use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_stream::wrappers::SignalStream;
use tokio_stream::{StreamExt, StreamMap};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::common::config::{BlockConfig, BlockSettings, SinkSettings};
use crate::sys::process::ExecCmd;
use crate::sys::signal::block_signal_number;

/// Replaced by the status line in sink command arguments.
pub const STATUS_PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub command: String,
    /// `None` for blocks that only refresh at startup and on signal.
    pub interval: Option<Duration>,
    /// 0 means the block has no signal.
    pub signal: u8,
    pub output: String,
    pub last_run: Option<Instant>,
}

impl Block {
    pub fn new(config: &BlockConfig) -> Self {
        Block {
            command: config.command.clone(),
            interval: (config.interval > 0).then(|| Duration::from_secs(config.interval)),
            signal: config.signal,
            output: String::new(),
            last_run: None,
        }
    }
}

/// Produces block output.
pub trait BlockRunner: Send + Sync + 'static {
    /// The raw output of `command`, or `None` when it failed.
    fn run(&self, command: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Runs block commands through `sh -c`. A non-zero exit counts as failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl BlockRunner for ShellRunner {
    async fn run(&self, command: &str) -> Option<String> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                debug!(command, status = %output.status, "Block command failed");
                None
            }
            Err(e) => {
                warn!(command, "Failed to run block command: {e}");
                None
            }
        }
    }
}

/// Where the joined status line goes.
pub trait StatusSink: Send + Sync + 'static {
    fn publish(&self, status: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl StatusSink for StdoutSink {
    fn publish(&self, status: &str) {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{status}").and_then(|()| out.flush()) {
            warn!("Failed to write status: {e}");
        }
    }
}

/// Runs a command per update, e.g. `xsetroot -name {}`. Without a
/// placeholder the status is appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandSink {
    command: ExecCmd,
}

impl CommandSink {
    pub fn new(command: ExecCmd) -> Self { Self { command } }

    fn argv(&self, status: &str) -> Vec<String> {
        let template = self.command.as_array();
        let mut argv: Vec<String> =
            template.iter().map(|arg| arg.replace(STATUS_PLACEHOLDER, status)).collect();
        if !template.iter().any(|arg| arg.contains(STATUS_PLACEHOLDER)) {
            argv.push(status.to_string());
        }
        argv
    }
}

impl StatusSink for CommandSink {
    fn publish(&self, status: &str) {
        let argv = self.argv(status);
        let [program, args @ ..] = argv.as_slice() else {
            warn!("Status sink command is empty");
            return;
        };
        // The runtime reaps children dropped without waiting.
        match tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
        {
            Ok(child) => trace!(pid = child.id(), ?program, "Published status"),
            Err(e) => warn!(?program, "Failed to run status sink: {e}"),
        }
    }
}

pub fn sink_for(settings: &SinkSettings) -> Box<dyn StatusSink> {
    match settings {
        SinkSettings::Stdout => Box::new(StdoutSink),
        SinkSettings::Command(command) => Box::new(CommandSink::new(command.clone())),
    }
}

/// Keeps the first line of `raw`, cut to `max_len` characters.
fn clean_output(raw: &str, max_len: usize) -> String {
    let line = raw.lines().next().unwrap_or_default().trim_end();
    line.chars().take(max_len).collect()
}

/// Empty outputs leave no trace, not even a doubled delimiter.
fn join_outputs<'a>(outputs: impl IntoIterator<Item = &'a str>, delimiter: &str) -> String {
    outputs.into_iter().filter(|o| !o.is_empty()).collect::<Vec<_>>().join(delimiter)
}

struct Shared<R> {
    blocks: Mutex<Vec<Block>>,
    /// One per block. A stored permit is a refresh already queued, so
    /// signals arriving faster than the block runs coalesce.
    triggers: Vec<Notify>,
    delimiter: String,
    max_output_len: usize,
    published: Mutex<Option<String>>,
    runner: R,
    sink: Box<dyn StatusSink>,
}

impl<R: BlockRunner> Shared<R> {
    fn command(&self, index: usize) -> Option<String> {
        self.blocks.lock().get(index).map(|b| b.command.clone())
    }

    async fn refresh(&self, index: usize) {
        let Some(command) = self.command(index) else {
            return;
        };
        let output = self
            .runner
            .run(&command)
            .await
            .map(|raw| clean_output(&raw, self.max_output_len))
            .unwrap_or_default();
        if let Some(block) = self.blocks.lock().get_mut(index) {
            trace!(index, %output, "Block refreshed");
            block.output = output;
            block.last_run = Some(Instant::now());
        }
    }

    fn status(&self) -> String {
        let blocks = self.blocks.lock();
        join_outputs(blocks.iter().map(|b| b.output.as_str()), &self.delimiter)
    }

    fn publish(&self) {
        let status = self.status();
        let mut published = self.published.lock();
        if published.as_deref() == Some(status.as_str()) {
            return;
        }
        self.sink.publish(&status);
        *published = Some(status);
    }
}

pub struct Scheduler<R> {
    shared: Arc<Shared<R>>,
    cancel: CancellationToken,
}

impl<R: BlockRunner> Scheduler<R> {
    pub fn new(settings: &BlockSettings, runner: R, sink: Box<dyn StatusSink>) -> Self {
        let blocks: Vec<Block> = settings.entries.iter().map(Block::new).collect();
        let triggers = blocks.iter().map(|_| Notify::new()).collect();
        let shared = Shared {
            blocks: Mutex::new(blocks),
            triggers,
            delimiter: settings.delimiter.clone(),
            max_output_len: settings.max_output_len,
            published: Mutex::new(None),
            runner,
            sink,
        };
        Scheduler {
            shared: Arc::new(shared),
            cancel: CancellationToken::new(),
        }
    }

    /// Cancelling the token stops every block task and [`Scheduler::run`].
    pub fn cancellation(&self) -> CancellationToken { self.cancel.clone() }

    pub fn status(&self) -> String { self.shared.status() }

    pub fn blocks(&self) -> Vec<Block> { self.shared.blocks.lock().clone() }

    /// Queues a refresh of every block bound to `signal` and returns how many
    /// there were.
    pub fn trigger(&self, signal: u8) -> usize {
        if signal == 0 {
            return 0;
        }
        let blocks = self.shared.blocks.lock();
        let mut triggered = 0;
        for (block, notify) in blocks.iter().zip(&self.shared.triggers) {
            if block.signal == signal {
                notify.notify_one();
                triggered += 1;
            }
        }
        trace!(signal, triggered, "Triggered blocks");
        triggered
    }

    /// Runs every block once in order and publishes the result.
    pub async fn run_once(&self) {
        for index in 0..self.shared.triggers.len() {
            self.shared.refresh(index).await;
        }
        self.shared.publish();
    }

    /// Starts one task per block.
    pub fn spawn_blocks(&self) -> JoinSet<()> {
        let mut tasks = JoinSet::new();
        for index in 0..self.shared.triggers.len() {
            let shared = self.shared.clone();
            let cancel = self.cancel.clone();
            tasks.spawn(run_block(shared, index, cancel));
        }
        tasks
    }

    /// Runs the blocks and routes `SIGRTMIN + n` to them until cancelled.
    pub async fn run(self) {
        let mut signals = StreamMap::new();
        for n in self.signals() {
            let stream = block_signal_number(n)
                .map_err(std::io::Error::other)
                .and_then(|signo| signal(SignalKind::from_raw(signo)));
            match stream {
                Ok(stream) => {
                    signals.insert(n, SignalStream::new(stream));
                }
                Err(e) => warn!(signal = n, "Cannot listen for block signal: {e}"),
            }
        }
        info!(blocks = self.shared.triggers.len(), signals = signals.len(), "Scheduler started");

        let mut tasks = self.spawn_blocks();
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                Some((n, ())) = signals.next() => {
                    self.trigger(n);
                }
            }
        }
        while tasks.join_next().await.is_some() {}
        info!("Scheduler stopped");
    }

    fn signals(&self) -> Vec<u8> {
        let mut signals: Vec<u8> =
            self.shared.blocks.lock().iter().map(|b| b.signal).filter(|&s| s > 0).collect();
        signals.sort_unstable();
        signals.dedup();
        signals
    }
}

async fn run_block<R: BlockRunner>(shared: Arc<Shared<R>>, index: usize, cancel: CancellationToken) {
    let period = shared.blocks.lock().get(index).and_then(|b| b.interval);
    let mut ticker = period.map(|period| {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });
    // The first tick completes at once; it stands for the startup run.
    if let Some(ticker) = ticker.as_mut() {
        ticker.tick().await;
    }
    shared.refresh(index).await;
    shared.publish();
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = shared.triggers[index].notified() => {}
            _ = next_tick(&mut ticker) => {}
        }
        shared.refresh(index).await;
        shared.publish();
    }
    trace!(index, "Block task finished");
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::time;

    use super::*;
    use crate::common::collections::HashMap;

    /// Echoes the command with its run count; `fail` always fails.
    #[derive(Clone, Default)]
    struct CountingRunner(Arc<Mutex<HashMap<String, usize>>>);

    impl CountingRunner {
        fn runs(&self, command: &str) -> usize { self.0.lock().get(command).copied().unwrap_or(0) }
    }

    impl BlockRunner for CountingRunner {
        async fn run(&self, command: &str) -> Option<String> {
            let mut runs = self.0.lock();
            let n = runs.entry(command.to_string()).or_default();
            *n += 1;
            (command != "fail").then(|| format!("{command}{n}\n"))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl RecordingSink {
        fn last(&self) -> Option<String> { self.0.lock().last().cloned() }
    }

    impl StatusSink for RecordingSink {
        fn publish(&self, status: &str) { self.0.lock().push(status.to_string()); }
    }

    fn settings(blocks: &[(&str, u64, u8)]) -> BlockSettings {
        BlockSettings {
            delimiter: " | ".to_string(),
            entries: blocks
                .iter()
                .map(|&(command, interval, signal)| BlockConfig {
                    command: command.to_string(),
                    interval,
                    signal,
                })
                .collect(),
            ..Default::default()
        }
    }

    /// Lets every ready task run before the paused clock moves on.
    async fn settle() { time::sleep(Duration::from_millis(1)).await; }

    fn scheduler(
        blocks: &[(&str, u64, u8)],
    ) -> (Scheduler<CountingRunner>, CountingRunner, RecordingSink) {
        let runner = CountingRunner::default();
        let sink = RecordingSink::default();
        let scheduler = Scheduler::new(&settings(blocks), runner.clone(), Box::new(sink.clone()));
        (scheduler, runner, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn interval_and_signal_blocks() {
        let (scheduler, runner, sink) = scheduler(&[("a", 10, 0), ("b", 0, 2)]);
        let _tasks = scheduler.spawn_blocks();
        settle().await;
        assert_eq!(scheduler.status(), "a1 | b1");
        assert_eq!(sink.last().as_deref(), Some("a1 | b1"));

        time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(runner.runs("a"), 1);

        time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(scheduler.status(), "a2 | b1");
        assert_eq!(runner.runs("b"), 1);

        assert_eq!(scheduler.trigger(2), 1);
        settle().await;
        assert_eq!(scheduler.status(), "a2 | b2");
        assert_eq!(runner.runs("a"), 2);

        time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(sink.last().as_deref(), Some("a3 | b2"));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_signals_coalesce() {
        let (scheduler, runner, _sink) = scheduler(&[("b", 0, 2)]);
        let _tasks = scheduler.spawn_blocks();
        settle().await;
        // The first wakes the waiting task, the second queues one more
        // refresh and the third is absorbed.
        for _ in 0..3 {
            scheduler.trigger(2);
        }
        settle().await;
        assert_eq!(runner.runs("b"), 3);
        settle().await;
        assert_eq!(runner.runs("b"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_signals_trigger_nothing() {
        let (scheduler, runner, _sink) = scheduler(&[("a", 0, 1), ("b", 0, 1), ("c", 0, 3)]);
        let _tasks = scheduler.spawn_blocks();
        settle().await;
        assert_eq!(scheduler.trigger(7), 0);
        assert_eq!(scheduler.trigger(0), 0);
        assert_eq!(scheduler.trigger(1), 2);
        settle().await;
        assert_eq!((runner.runs("a"), runner.runs("b"), runner.runs("c")), (2, 2, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_and_empty_blocks_are_skipped() {
        let (scheduler, _runner, sink) = scheduler(&[("a", 0, 1), ("fail", 0, 0), ("c", 0, 0)]);
        scheduler.run_once().await;
        assert_eq!(scheduler.status(), "a1 | c1");
        assert_eq!(*sink.0.lock(), ["a1 | c1"]);
        let blocks = scheduler.blocks();
        assert_eq!(blocks[1].output, "");
        assert!(blocks.iter().all(|b| b.last_run.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_status_is_not_republished() {
        let (scheduler, _runner, sink) = scheduler(&[("fail", 1, 0)]);
        let _tasks = scheduler.spawn_blocks();
        settle().await;
        time::advance(Duration::from_secs(3)).await;
        settle().await;
        assert_eq!(*sink.0.lock(), [""]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_every_task() {
        let (scheduler, _runner, _sink) = scheduler(&[("a", 1, 0), ("b", 0, 4)]);
        let mut tasks = scheduler.spawn_blocks();
        settle().await;
        scheduler.cancellation().cancel();
        let mut finished = 0;
        while let Some(result) = tasks.join_next().await {
            assert!(result.is_ok());
            finished += 1;
        }
        assert_eq!(finished, 2);
    }

    #[test]
    fn output_is_one_line_cut_to_length() {
        assert_eq!(clean_output("75%\nignored\n", 50), "75%");
        assert_eq!(clean_output("a long block output  ", 6), "a long");
        assert_eq!(clean_output("héllo", 2), "hé");
        assert_eq!(clean_output("", 5), "");
    }

    #[test]
    fn joining_drops_empty_outputs() {
        assert_eq!(join_outputs(["a", "", "c"], "  "), "a  c");
        assert_eq!(join_outputs(["", ""], "  "), "");
    }

    #[test]
    fn sink_command_substitutes_the_status() {
        let sink = CommandSink::new(ExecCmd::String("xsetroot -name {}".into()));
        assert_eq!(sink.argv("vol 40%"), ["xsetroot", "-name", "vol 40%"]);
        let appended = CommandSink::new(ExecCmd::Array(vec!["notify".into()]));
        assert_eq!(appended.argv("x"), ["notify", "x"]);
    }
}
