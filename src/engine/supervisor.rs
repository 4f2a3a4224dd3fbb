//! Supervised execution of an external transcoding process
//!
//! A [`ProcessSupervisor`] describes one run (command plus expected output
//! duration). Starting it hands the process to a dedicated tokio task and
//! returns a [`RunHandle`] through which the caller receives progress events,
//! the single terminal [`RunOutcome`], and can request cancellation.
//!
//! The run task is the only owner of the OS process: nothing else signals or
//! reaps it.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::engine::progress::{parse_progress_line, RunObserver};

/// Message prefix for a process that exited with a nonzero status.
pub const PROCESS_FAILED: &str = "external process failed";

/// Number of diagnostic (stderr) lines kept for failure messages.
const DIAGNOSTIC_TAIL_LINES: usize = 8;

/// Upper bound for draining the diagnostic stream after the process exited.
const DIAGNOSTIC_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Final result of a run. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited with status zero
    Completed,
    /// The process could not be launched, exited nonzero, or its output
    /// could not be read
    Failed { message: String },
    /// The caller requested cancellation before the run finished
    Canceled,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::Failed { message } => write!(f, "failed: {}", message),
            RunOutcome::Canceled => write!(f, "canceled"),
        }
    }
}

/// Notification delivered to the subscriber of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// Completion estimate in `0..=100`
    Progress(u8),
    /// Terminal outcome; always the last event of a run
    Finished(RunOutcome),
}

/// Observable state of a started run.
///
/// A configured but not yet started [`ProcessSupervisor`] is the idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Completed,
    Failed,
    Canceled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Running)
    }
}

impl From<&RunOutcome> for RunState {
    fn from(outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::Failed { .. } => RunState::Failed,
            RunOutcome::Canceled => RunState::Canceled,
        }
    }
}

/// Per-run cancellation request, shared between the caller and the run task.
///
/// Setting it is idempotent and can never be undone. The run task polls the
/// flag at every line boundary; the notifier only wakes a pending read.
#[derive(Clone, Default)]
pub struct CancellationFlag {
    inner: Arc<CancelState>,
}

#[derive(Default)]
struct CancelState {
    requested: AtomicBool,
    wake: Notify,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread, any number of times.
    pub fn cancel(&self) {
        if !self.inner.requested.swap(true, Ordering::SeqCst) {
            self.inner.wake.notify_one();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested.
    async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.wake.notified().await;
    }
}

impl fmt::Debug for CancellationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationFlag")
            .field("requested", &self.is_cancelled())
            .finish()
    }
}

/// One external process run, ready to start
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    command: Vec<String>,
    total_duration: f64,
    capture_diagnostics: bool,
}

impl ProcessSupervisor {
    /// Describe a run of `command` (executable followed by its arguments)
    /// whose progress is measured against `total_duration` seconds.
    /// A non-positive duration disables progress events.
    pub fn new(command: Vec<String>, total_duration: f64) -> Self {
        Self {
            command,
            total_duration,
            capture_diagnostics: false,
        }
    }

    /// Keep the tail of the process's stderr and append its last line to
    /// failure messages. When disabled, stderr is discarded.
    pub fn with_diagnostics(mut self, capture: bool) -> Self {
        self.capture_diagnostics = capture;
        self
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Launch the process and begin consuming its output on a background task.
    ///
    /// Never fails: a process that cannot be launched yields a handle whose
    /// only event is [`RunOutcome::Failed`]. Must be called from within a
    /// tokio runtime.
    pub fn start(self) -> RunHandle {
        let (events, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationFlag::new();

        match self.spawn() {
            Ok(mut child) => {
                info!(
                    pid = ?child.id(),
                    program = %self.command[0],
                    total_duration = self.total_duration,
                    "started external process"
                );
                let stdout = child.stdout.take();
                let diagnostics = child.stderr.take().map(DiagnosticTail::collect);
                tokio::spawn(run_loop(
                    child,
                    stdout,
                    self.total_duration,
                    cancel.clone(),
                    diagnostics,
                    events,
                ));
            }
            Err(e) => {
                let message = match self.command.first() {
                    Some(program) => format!("failed to launch {}: {}", program, e),
                    None => format!("failed to launch: {}", e),
                };
                warn!(%message, "external process could not be started");
                let _ = events.send(RunEvent::Finished(RunOutcome::Failed { message }));
            }
        }

        RunHandle {
            command: self.command,
            total_duration: self.total_duration,
            events: receiver,
            cancel,
            state: RunState::Running,
            outcome: None,
        }
    }

    fn spawn(&self) -> io::Result<Child> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if self.capture_diagnostics {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        // Own process group: terminal signals reach us, not the child, so the
        // caller must turn them into a cancel. A supervisor killed outright
        // (SIGKILL) leaves the child running.
        #[cfg(unix)]
        command.process_group(0);

        command.spawn()
    }
}

/// Caller side of a started run
pub struct RunHandle {
    command: Vec<String>,
    total_duration: f64,
    events: mpsc::UnboundedReceiver<RunEvent>,
    cancel: CancellationFlag,
    state: RunState,
    outcome: Option<RunOutcome>,
}

impl RunHandle {
    /// Request cancellation of the run. Idempotent; a no-op once the run
    /// has finished.
    pub fn cancel(&self) {
        if self.state.is_terminal() {
            debug!("cancel requested after terminal outcome, ignoring");
            return;
        }
        self.cancel.cancel();
    }

    /// A clonable flag for cancelling from another task or thread.
    pub fn canceller(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The terminal outcome, once it has been received
    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// Next notification of the run, in emission order.
    ///
    /// Yields zero or more [`RunEvent::Progress`], then exactly one
    /// [`RunEvent::Finished`], then `None` forever.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        if self.state.is_terminal() {
            return None;
        }

        let event = match self.events.recv().await {
            Some(event) => event,
            // The run task went away without reporting; still end the run once.
            None if self.cancel.is_cancelled() => RunEvent::Finished(RunOutcome::Canceled),
            None => RunEvent::Finished(RunOutcome::Failed {
                message: "supervisor task ended without an outcome".to_string(),
            }),
        };

        if let RunEvent::Finished(outcome) = &event {
            self.state = RunState::from(outcome);
            self.outcome = Some(outcome.clone());
        }
        Some(event)
    }

    /// Consume the run, discarding progress, and return its outcome.
    pub async fn wait(self) -> RunOutcome {
        struct Ignore;
        impl RunObserver for Ignore {
            fn on_progress(&self, _percent: u8) {}
            fn on_complete(&self) {}
            fn on_error(&self, _message: &str) {}
            fn on_cancel(&self) {}
        }
        self.drive(&Ignore).await
    }

    /// Dispatch every remaining notification to `observer` and return the
    /// outcome.
    ///
    /// A handle whose outcome was already taken through [`next_event`]
    /// returns it without notifying `observer`.
    ///
    /// [`next_event`]: RunHandle::next_event
    pub async fn drive(mut self, observer: &dyn RunObserver) -> RunOutcome {
        if let Some(outcome) = self.outcome.clone() {
            return outcome;
        }
        observer.on_start(&self.command, self.total_duration);

        let outcome = loop {
            match self.next_event().await {
                Some(RunEvent::Progress(percent)) => observer.on_progress(percent),
                Some(RunEvent::Finished(outcome)) => break outcome,
                None => {
                    break self.outcome.clone().unwrap_or(RunOutcome::Failed {
                        message: "run already finished".to_string(),
                    })
                }
            }
        };

        match &outcome {
            RunOutcome::Completed => observer.on_complete(),
            RunOutcome::Failed { message } => observer.on_error(message),
            RunOutcome::Canceled => observer.on_cancel(),
        }
        outcome
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        // Nobody is listening any more; don't leave the process running.
        if !self.state.is_terminal() {
            self.cancel.cancel();
        }
    }
}

/// How the read loop ended
enum Termination {
    Canceled,
    Exited(ExitStatus),
}

async fn run_loop<R>(
    mut child: Child,
    stdout: Option<R>,
    total_duration: f64,
    cancel: CancellationFlag,
    mut diagnostics: Option<DiagnosticTail>,
    events: mpsc::UnboundedSender<RunEvent>,
) where
    R: AsyncRead + Unpin,
{
    let outcome = match read_progress(&mut child, stdout, total_duration, &cancel, &events).await
    {
        Ok(Termination::Canceled) => RunOutcome::Canceled,
        // A cancel that landed between the last read and exit still wins.
        Ok(Termination::Exited(_)) if cancel.is_cancelled() => RunOutcome::Canceled,
        Ok(Termination::Exited(status)) if status.success() => RunOutcome::Completed,
        Ok(Termination::Exited(status)) => {
            let mut message = format!("{} ({})", PROCESS_FAILED, status);
            if let Some(line) = match diagnostics.as_mut() {
                Some(tail) => tail.last_line().await,
                None => None,
            } {
                message.push_str(": ");
                message.push_str(&line);
            }
            RunOutcome::Failed { message }
        }
        Err(e) => {
            stop(&mut child).await;
            if cancel.is_cancelled() {
                debug!(error = %e, "fault after cancellation, reporting cancel");
                RunOutcome::Canceled
            } else {
                warn!(error = %e, "fault while supervising external process");
                RunOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    };

    info!(%outcome, "external process finished");
    let _ = events.send(RunEvent::Finished(outcome));
}

async fn read_progress<R>(
    child: &mut Child,
    stdout: Option<R>,
    total_duration: f64,
    cancel: &CancellationFlag,
    events: &mpsc::UnboundedSender<RunEvent>,
) -> io::Result<Termination>
where
    R: AsyncRead + Unpin,
{
    let stdout = stdout
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "process stdout was not captured"))?;
    // Raw segments: a line that is not UTF-8 is just another non-progress line.
    let mut lines = BufReader::new(stdout).split(b'\n');

    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => return cancel_run(child).await,
            line = lines.next_segment() => line?,
        };

        // Checked before every line; buffered output is dropped once canceled.
        if cancel.is_cancelled() {
            return cancel_run(child).await;
        }

        let Some(line) = line else { break };
        let line = String::from_utf8_lossy(&line);
        if let Some(percent) = parse_progress_line(&line, total_duration) {
            trace!(percent, "progress");
            let _ = events.send(RunEvent::Progress(percent));
        }
    }

    // Output closed; the process may still be running.
    let status = tokio::select! {
        biased;
        () = cancel.cancelled() => return cancel_run(child).await,
        status = child.wait() => status?,
    };
    Ok(Termination::Exited(status))
}

async fn cancel_run(child: &mut Child) -> io::Result<Termination> {
    debug!(pid = ?child.id(), "cancellation observed, terminating external process");
    terminate(child);
    child.wait().await?;
    Ok(Termination::Canceled)
}

/// Terminate and reap after a fault, ignoring further errors.
async fn stop(child: &mut Child) {
    if let Ok(None) = child.try_wait() {
        terminate(child);
    }
    if let Err(e) = child.wait().await {
        debug!(error = %e, "could not reap external process");
    }
}

/// Send a single terminate request (SIGTERM to the child's process group).
#[cfg(unix)]
fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else { return };
    // SAFETY: kill(2) has no memory-safety preconditions.
    let result = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGTERM) };
    if result != 0 {
        debug!(pid, error = %io::Error::last_os_error(), "terminate request failed");
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "terminate request failed");
    }
}

/// Background collector of the last few stderr lines
struct DiagnosticTail {
    lines: Arc<Mutex<VecDeque<String>>>,
    task: JoinHandle<()>,
}

impl DiagnosticTail {
    fn collect(stderr: ChildStderr) -> Self {
        let lines = Arc::new(Mutex::new(VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES)));
        let sink = Arc::clone(&lines);
        let task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if let Ok(mut tail) = sink.lock() {
                    if tail.len() == DIAGNOSTIC_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
        });
        Self { lines, task }
    }

    /// Last non-empty diagnostic line, after the stream has been drained.
    async fn last_line(&mut self) -> Option<String> {
        if tokio::time::timeout(DIAGNOSTIC_DRAIN_TIMEOUT, &mut self.task)
            .await
            .is_err()
        {
            debug!("diagnostic stream still open, using what was read");
        }
        self.lines.lock().ok()?.back().cloned()
    }
}

impl Drop for DiagnosticTail {
    fn drop(&mut self) {
        self.task.abort();
    }
}
