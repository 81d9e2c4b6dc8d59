//! Supervisor that runs the real downloader executable.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use super::args::build_args;
use super::config::DownloaderConfig;
use super::diagnostics::StderrTail;
use super::error::SupervisorError;
use super::progress::{PercentProgressParser, ProgressParser};
use super::traits::Supervisor;
use super::types::{LaunchRequest, SupervisorEvent, SupervisorEventKind};
use crate::paths::{augmented_search_path, locate_downloader, locate_merge_tool};

/// How long shutdown waits for processes to exit after signalling them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Output lines buffered between the pipe readers and the monitor.
const OUTPUT_LINE_BUFFER: usize = 64;

struct LiveProcess {
    /// Unique per `start` call, so a monitor only ever clears its own entry.
    launch: u64,
    terminate: Option<oneshot::Sender<()>>,
}

type LiveMap = Arc<Mutex<HashMap<String, LiveProcess>>>;

/// Runs one downloader process per job and streams its output.
pub struct ProcessSupervisor {
    config: DownloaderConfig,
    parser: Arc<dyn ProgressParser>,
    live: LiveMap,
    next_launch: AtomicU64,
}

impl ProcessSupervisor {
    pub fn new(config: DownloaderConfig) -> Self {
        Self {
            config,
            parser: Arc::new(PercentProgressParser),
            live: Arc::new(Mutex::new(HashMap::new())),
            next_launch: AtomicU64::new(0),
        }
    }

    /// Replace the stdout progress parser.
    pub fn with_parser(mut self, parser: Arc<dyn ProgressParser>) -> Self {
        self.parser = parser;
        self
    }

    fn spawn_child(&self, request: &LaunchRequest) -> Result<Child, SupervisorError> {
        let search_path = augmented_search_path(&self.config);
        let binary = locate_downloader(&self.config, &search_path);
        let merge_tool = locate_merge_tool(&self.config, &binary, &search_path);
        let args = build_args(&self.config, request, merge_tool.as_deref());

        info!(
            job_id = %request.job_id,
            attempt = request.attempt,
            binary = %binary.display(),
            "Starting downloader"
        );
        debug!(job_id = %request.job_id, ?args, "Downloader arguments");

        Command::new(&binary)
            .args(&args)
            .env("PATH", &search_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SupervisorError::BinaryNotFound { path: binary }
                } else {
                    SupervisorError::Spawn(e)
                }
            })
    }
}

#[async_trait]
impl Supervisor for ProcessSupervisor {
    fn name(&self) -> &str {
        "process"
    }

    async fn start(
        &self,
        request: LaunchRequest,
        events: mpsc::Sender<SupervisorEvent>,
    ) -> Result<(), SupervisorError> {
        let mut child = self.spawn_child(&request)?;

        let missing_pipe = || {
            SupervisorError::Spawn(std::io::Error::other("downloader output was not captured"))
        };
        let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
        let stderr = child.stderr.take().ok_or_else(missing_pipe)?;

        let launch = self.next_launch.fetch_add(1, Ordering::Relaxed);
        let (terminate_tx, terminate_rx) = oneshot::channel();
        {
            let mut live = self.live.lock().await;
            let previous = live.insert(
                request.job_id.clone(),
                LiveProcess {
                    launch,
                    terminate: Some(terminate_tx),
                },
            );
            // An older attempt still winding down must not keep running alongside.
            if let Some(mut previous) = previous {
                if let Some(tx) = previous.terminate.take() {
                    let _ = tx.send(());
                }
            }
        }

        let monitor = ProcessMonitor {
            request,
            launch,
            events,
            parser: Arc::clone(&self.parser),
            progress_interval: Duration::from_millis(self.config.progress_interval_ms),
            live: Arc::clone(&self.live),
        };
        tokio::spawn(monitor.run(child, stdout, stderr, terminate_rx));

        Ok(())
    }

    async fn cancel(&self, job_id: &str) -> bool {
        let mut live = self.live.lock().await;
        match live.get_mut(job_id) {
            Some(process) => {
                if let Some(tx) = process.terminate.take() {
                    info!(job_id, "Requesting downloader termination");
                    let _ = tx.send(());
                }
                true
            }
            None => {
                debug!(job_id, "No running process to cancel");
                false
            }
        }
    }

    async fn running(&self) -> usize {
        self.live.lock().await.len()
    }

    async fn shutdown(&self) {
        {
            let mut live = self.live.lock().await;
            for process in live.values_mut() {
                if let Some(tx) = process.terminate.take() {
                    let _ = tx.send(());
                }
            }
        }

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while self.running().await > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let remaining = self.running().await;
        if remaining > 0 {
            warn!(remaining, "Downloader processes still running after shutdown grace period");
        }
    }
}

/// Per-process task: reads output, reports progress, reports the outcome.
struct ProcessMonitor {
    request: LaunchRequest,
    launch: u64,
    events: mpsc::Sender<SupervisorEvent>,
    parser: Arc<dyn ProgressParser>,
    progress_interval: Duration,
    live: LiveMap,
}

impl ProcessMonitor {
    async fn run(
        self,
        mut child: Child,
        stdout: impl AsyncRead + Unpin + Send + 'static,
        stderr: impl AsyncRead + Unpin + Send + 'static,
        mut terminate_rx: oneshot::Receiver<()>,
    ) {
        let job_id = self.request.job_id.clone();
        let (lines_tx, mut lines) = mpsc::channel(OUTPUT_LINE_BUFFER);
        tokio::spawn(forward_lines(stdout, OutputStream::Stdout, lines_tx.clone()));
        tokio::spawn(forward_lines(stderr, OutputStream::Stderr, lines_tx));

        let mut output_open = true;
        let mut terminate_seen = false;
        let mut tail = StderrTail::new();
        let mut last_progress: Option<Instant> = None;

        let exit = loop {
            tokio::select! {
                line = lines.recv(), if output_open => match line {
                    Some((OutputStream::Stdout, line)) => {
                        if let Some(update) = self.parser.parse(&line) {
                            let due = last_progress
                                .is_none_or(|at| at.elapsed() >= self.progress_interval);
                            if due || update.progress >= 100.0 {
                                last_progress = Some(Instant::now());
                                let event = SupervisorEvent {
                                    job_id: job_id.clone(),
                                    attempt: self.request.attempt,
                                    kind: SupervisorEventKind::Progress {
                                        progress: update.progress,
                                        speed: update.speed,
                                        eta: update.eta,
                                    },
                                };
                                let _ = self.events.send(event).await;
                            }
                        }
                    }
                    Some((OutputStream::Stderr, line)) => {
                        debug!(job_id = %job_id, stderr = %line);
                        tail.push(line);
                    }
                    // Both pipes reached EOF or failed.
                    None => output_open = false,
                },
                signal = &mut terminate_rx, if !terminate_seen => {
                    terminate_seen = true;
                    if signal.is_ok() {
                        request_termination(&mut child);
                    }
                },
                status = child.wait(), if !output_open || terminate_seen => {
                    break status;
                }
            }
        };

        let event = match exit {
            Ok(status) if status.success() => {
                info!(job_id = %job_id, "Downloader finished");
                SupervisorEvent::completed(&self.request)
            }
            Ok(status) => {
                warn!(job_id = %job_id, code = ?status.code(), "Downloader failed");
                SupervisorEvent::failed(&self.request, tail.failure_message(status.code()))
            }
            Err(e) => {
                warn!(job_id = %job_id, "Failed to wait for downloader: {}", e);
                SupervisorEvent::failed(
                    &self.request,
                    format!("Failed to wait for downloader: {}", e),
                )
            }
        };

        {
            let mut live = self.live.lock().await;
            if live
                .get(&job_id)
                .is_some_and(|process| process.launch == self.launch)
            {
                live.remove(&job_id);
            }
        }

        let _ = self.events.send(event).await;
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

/// Read one pipe to EOF, forwarding each line decoded lossily.
///
/// Undecodable bytes never stop the read, so the child can't block on a
/// full pipe. An I/O error ends the task and closes the pipe.
async fn forward_lines(
    reader: impl AsyncRead + Unpin,
    stream: OutputStream,
    lines: mpsc::Sender<(OutputStream, String)>,
) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if lines.send((stream, line)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(?stream, "Stopped reading downloader output: {}", e);
                break;
            }
        }
    }
}

/// Ask the process to exit: SIGTERM on Unix, the platform kill elsewhere.
fn request_termination(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: `pid` is our own child and has not been reaped yet, since
            // `child.id()` returns None after the exit status is collected.
            let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
            if rc == 0 {
                return;
            }
        }
    }

    if let Err(e) = child.start_kill() {
        debug!("Process already gone: {}", e);
    }
}
