use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::command::TranscodeCommand;
use crate::error::{CompressorError, Result};
use super::return_code::{return_code, RETURN_CODE_CANCEL};
use super::statistics::{handle_progress_line, ProgressLine, Statistics};

/// Put in front of every command so progress arrives on stdout.
const PROGRESS_ARGS: [&str; 8] = [
    "-hide_banner",
    "-nostats",
    "-loglevel", "warning",
    "-progress", "pipe:1",
    "-y",
    "-nostdin",
];

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Messages sent from the worker running a job to whoever consumes the
/// engine's channel.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    Statistics(Statistics),
    Complete { execution_id: u64, return_code: i32 },
}

/// Asynchronous transcoding backend.
pub trait Engine {
    /// Starts the command and returns its execution id. Statistics and the
    /// completion are delivered as `EngineEvent`s.
    fn execute_async(&self, command: &TranscodeCommand) -> Result<u64>;

    fn cancel(&self, execution_id: u64);
}

pub struct FFmpegEngine {
    binary: PathBuf,
    events: Sender<EngineEvent>,
    stop: Arc<AtomicBool>,
    next_id: AtomicU64,
    running: Arc<Mutex<HashMap<u64, Arc<AtomicBool>>>>,
}

impl FFmpegEngine {
    /// `events` receives statistics for every job this engine runs. `stop`
    /// cancels the running jobs, e.g. from a signal handler; it is cleared
    /// whenever a new job is submitted.
    pub fn new(binary: PathBuf, events: Sender<EngineEvent>, stop: Arc<AtomicBool>) -> Self {
        FFmpegEngine {
            binary,
            events,
            stop,
            next_id: AtomicU64::new(1),
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Engine for FFmpegEngine {
    fn execute_async(&self, command: &TranscodeCommand) -> Result<u64> {
        let execution_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        // only a stop raised while this job runs applies to it
        self.stop.store(false, Ordering::SeqCst);
        let mut child = Command::new(&self.binary)
            .args(PROGRESS_ARGS)
            .args(command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(CompressorError::Spawn)?;
        debug!("spawned ffmpeg process {} for execution {}", child.id(), execution_id);

        let cancel = Arc::new(AtomicBool::new(false));
        if let Ok(mut running) = self.running.lock() {
            running.insert(execution_id, Arc::clone(&cancel));
        }

        let job = Job {
            execution_id,
            events: self.events.clone(),
            stop: Arc::clone(&self.stop),
            cancel,
            running: Arc::clone(&self.running),
        };
        let stderr = child.stderr.take();
        let spawned = thread::Builder::new()
            .name(format!("ffmpeg-{}", execution_id))
            .spawn(move || job.run(child, stderr));
        if let Err(err) = spawned {
            if let Ok(mut running) = self.running.lock() {
                running.remove(&execution_id);
            }
            return Err(CompressorError::Spawn(err));
        }

        Ok(execution_id)
    }

    fn cancel(&self, execution_id: u64) {
        let flag = match self.running.lock() {
            Ok(running) => running.get(&execution_id).cloned(),
            Err(_) => None,
        };
        match flag {
            Some(flag) => {
                info!("cancelling execution {}", execution_id);
                flag.store(true, Ordering::SeqCst);
            },
            None => debug!("execution {} is not running", execution_id),
        }
    }
}

struct Job {
    execution_id: u64,
    events: Sender<EngineEvent>,
    stop: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    running: Arc<Mutex<HashMap<u64, Arc<AtomicBool>>>>,
}

impl Job {
    fn run(self, mut child: Child, stderr: Option<ChildStderr>) {
        let stderr_thread = stderr.map(|stream| thread::spawn(move || log_stderr(stream)));
        let stdout_thread = child.stdout.take().map(|stdout| {
            let execution_id = self.execution_id;
            let events = self.events.clone();
            thread::spawn(move || forward_statistics(execution_id, stdout, events))
        });

        let code = self.wait_or_kill(&mut child);

        if let Some(handle) = stdout_thread {
            let _ = handle.join();
        }
        if let Some(handle) = stderr_thread {
            let _ = handle.join();
        }
        if let Ok(mut running) = self.running.lock() {
            running.remove(&self.execution_id);
        }
        let _ = self.events.send(EngineEvent::Complete {
            execution_id: self.execution_id,
            return_code: code,
        });
    }

    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst) || self.cancel.load(Ordering::SeqCst)
    }

    /// Polls the child and the stop flags until one of them ends the job.
    fn wait_or_kill(&self, child: &mut Child) -> i32 {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return return_code(status),
                Ok(None) => (),
                Err(err) => {
                    error!("There was an error waiting for the ffmpeg process: {}", err);
                    return 1;
                },
            }

            if self.should_stop() {
                match child.kill() {
                    Ok(()) => info!("killed ffmpeg process ({})", child.id()),
                    Err(err) => warn!("error killing ffmpeg process ({}) {err:?}", child.id()),
                }
                let _ = child.wait();
                return RETURN_CODE_CANCEL;
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn forward_statistics(execution_id: u64, stdout: ChildStdout, events: Sender<EngineEvent>) {
    let mut stats = Statistics::new(execution_id);
    for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
        match handle_progress_line(&line, &mut stats) {
            ProgressLine::Continue => (),
            ProgressLine::Render | ProgressLine::End => {
                let _ = events.send(EngineEvent::Statistics(stats.clone()));
            },
        }
    }
}

fn log_stderr(stderr: ChildStderr) {
    for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
        warn!(target: "ffmpeg", "{}", line);
    }
}
