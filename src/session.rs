use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::codecs::Codec;
use crate::command::TranscodeCommand;
use crate::dialog::{ConsoleNotifier, KdamDialog, Notifier, ProgressDialog, INITIAL_TEXT};
use crate::error::{CompressorError, Result};
use crate::ffmpeg::engine::{Engine, EngineEvent};
use crate::ffmpeg::probe::{DurationProbe, FFprobe};
use crate::ffmpeg::return_code::Outcome;
use crate::ffmpeg::statistics::Statistics;
use crate::progress::ProgressTracker;
use crate::storage::{LocalMediaStore, MediaStore, OutputRecord, reference_path};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JobState {
    Idle,
    DurationProbed,
    Running(u64),
}

#[derive(Debug)]
pub struct TranscodeJob {
    pub source: String,
    pub destination: PathBuf,
    pub codec: Codec,
    pub execution_id: u64,
    tracker: ProgressTracker,
}

impl TranscodeJob {
    pub fn total_duration_ms(&self) -> i64 {
        self.tracker.total_duration_ms()
    }
}

type DialogFactory = Box<dyn Fn() -> Box<dyn ProgressDialog>>;

pub struct CompressSession {
    engine: Box<dyn Engine>,
    events: Receiver<EngineEvent>,
    output_dir: PathBuf,
    codec: Codec,
    store: Box<dyn MediaStore>,
    prober: Box<dyn DurationProbe>,
    notifier: Box<dyn Notifier>,
    new_dialog: DialogFactory,
    dialog: Box<dyn ProgressDialog>,
    state: JobState,
    job: Option<TranscodeJob>,
}

impl CompressSession {
    /// `events` must be the receiving end of the channel `engine` reports to.
    pub fn new(engine: Box<dyn Engine>, events: Receiver<EngineEvent>, output_dir: PathBuf) -> Self {
        let new_dialog: DialogFactory = Box::new(|| -> Box<dyn ProgressDialog> { Box::new(KdamDialog::new(INITIAL_TEXT)) });
        CompressSession {
            engine,
            events,
            store: Box::new(LocalMediaStore::new(&output_dir)),
            output_dir,
            codec: Codec::default(),
            prober: Box::new(FFprobe::new()),
            notifier: Box::new(ConsoleNotifier),
            dialog: new_dialog(),
            new_dialog,
            state: JobState::Idle,
            job: None,
        }
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn store(mut self, store: Box<dyn MediaStore>) -> Self {
        self.store = store;
        self
    }

    pub fn prober(mut self, prober: Box<dyn DurationProbe>) -> Self {
        self.prober = prober;
        self
    }

    pub fn notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn dialogs(mut self, new_dialog: DialogFactory) -> Self {
        self.dialog = new_dialog();
        self.new_dialog = new_dialog;
        self
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn job(&self) -> Option<&TranscodeJob> {
        self.job.as_ref()
    }

    pub fn compose_command(&self, reference: &str, filename: &str) -> TranscodeCommand {
        let source = self.store.resolve(reference);
        TranscodeCommand::compose(source.as_deref(), &self.output_dir.join(filename), &self.codec.profile())
    }

    /// Starts compressing `reference` into `<output dir>/<filename>.<ext>`.
    ///
    /// Returns the execution id, or `None` when the source has no usable
    /// duration and nothing was started.
    pub fn compress(&mut self, reference: &str, filename: &str) -> Result<Option<u64>> {
        if let JobState::Running(execution_id) = self.state {
            return Err(CompressorError::JobInFlight(execution_id));
        }
        info!("Compress Video is started");
        self.dialog.show();

        let source = self.store.resolve(reference);
        let probe_path = source.clone().unwrap_or_else(|| reference_path(reference));
        let duration_ms = match self.prober.duration_ms(&probe_path) {
            Ok(ms) => ms,
            Err(err) => {
                warn!("Unable to probe duration of {:?}: {}", probe_path, err);
                0
            },
        };
        if duration_ms <= 0 {
            self.notifier.toast("Duration is zero");
            self.recreate_dialog();
            self.state = JobState::Idle;
            return Ok(None);
        }
        self.state = JobState::DurationProbed;
        debug!("Duration Video {}", duration_ms);
        if source.is_none() {
            warn!("{:?} did not resolve to a file path", reference);
        }

        if let Err(err) = fs::create_dir_all(&self.output_dir) {
            error!("Unable to create {:?}: {}", self.output_dir, err);
        }

        let command = TranscodeCommand::compose(source.as_deref(), &self.output_dir.join(filename), &self.codec.profile());
        info!("{}", command.as_str());

        let record = OutputRecord::for_destination(command.destination(), self.codec.label(), Utc::now().timestamp_millis());
        if let Err(err) = self.store.register(&record) {
            error!("Unable to register {:?}: {}", record.data, err);
        }

        let execution_id = match self.engine.execute_async(&command) {
            Ok(id) => id,
            Err(err) => {
                self.recreate_dialog();
                self.state = JobState::Idle;
                return Err(err);
            },
        };
        info!("End Compress, executionId : {}", execution_id);

        self.job = Some(TranscodeJob {
            source: String::from(reference),
            destination: command.destination().to_path_buf(),
            codec: self.codec.clone(),
            execution_id,
            tracker: ProgressTracker::new(duration_ms),
        });
        self.state = JobState::Running(execution_id);
        Ok(Some(execution_id))
    }

    pub fn cancel(&self) {
        if let JobState::Running(execution_id) = self.state {
            self.engine.cancel(execution_id);
        }
    }

    /// Feeds one engine event through the state machine. Returns the outcome
    /// once the running job terminates.
    pub fn handle_event(&mut self, event: EngineEvent) -> Option<Outcome> {
        match event {
            EngineEvent::Statistics(stats) => {
                self.handle_statistics(&stats);
                None
            },
            EngineEvent::Complete { execution_id, return_code } => {
                if self.state != JobState::Running(execution_id) {
                    debug!("ignoring completion of execution {}", execution_id);
                    return None;
                }
                Some(self.handle_complete(return_code))
            },
        }
    }

    /// Blocks until the running job terminates. `None` if no job is running
    /// or the engine went away.
    pub fn wait_for_outcome(&mut self) -> Option<Outcome> {
        if !matches!(self.state, JobState::Running(_)) {
            return None;
        }
        while let Ok(event) = self.events.recv() {
            if let Some(outcome) = self.handle_event(event) {
                return Some(outcome);
            }
        }
        error!("engine channel closed before the job completed");
        self.recreate_dialog();
        self.state = JobState::Idle;
        self.job = None;
        None
    }

    fn handle_statistics(&mut self, stats: &Statistics) {
        let Some(job) = self.job.as_mut() else { return };
        if job.execution_id != stats.execution_id {
            return;
        }
        debug!("TimeInMillis: {}", stats.time_ms);
        if let Some(update) = job.tracker.sample(stats.time_ms) {
            self.dialog.update(&update, stats);
        }
    }

    fn handle_complete(&mut self, return_code: i32) -> Outcome {
        self.recreate_dialog();
        let outcome = Outcome::from_return_code(return_code);
        match outcome {
            Outcome::Success => {
                self.notifier.toast("Success compress");
                info!("Execution complete successfully");
            },
            Outcome::Cancelled => info!("Execution cancelled by user"),
            Outcome::Other(code) => warn!("Execution failed with returnCode {}", code),
        }
        self.state = JobState::Idle;
        self.job = None;
        outcome
    }

    fn recreate_dialog(&mut self) {
        self.dialog.dismiss();
        self.dialog = (self.new_dialog)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;
    use std::sync::mpsc::{self, Sender};
    use crate::progress::ProgressUpdate;

    type Log = Rc<RefCell<Vec<String>>>;

    struct FakeEngine {
        log: Log,
        fail: bool,
    }

    impl Engine for FakeEngine {
        fn execute_async(&self, command: &TranscodeCommand) -> Result<u64> {
            if self.fail {
                return Err(CompressorError::Spawn(std::io::Error::other("no ffmpeg")));
            }
            self.log.borrow_mut().push(format!("execute {}", command.as_str()));
            Ok(7)
        }

        fn cancel(&self, execution_id: u64) {
            self.log.borrow_mut().push(format!("cancel {}", execution_id));
        }
    }

    struct FakeProbe(i64);

    impl DurationProbe for FakeProbe {
        fn duration_ms(&self, _path: &Path) -> Result<i64> {
            Ok(self.0)
        }
    }

    struct FakeStore {
        log: Log,
    }

    impl MediaStore for FakeStore {
        fn resolve(&self, reference: &str) -> Option<PathBuf> {
            match reference {
                "content://missing" => None,
                _ => Some(reference_path(reference)),
            }
        }

        fn register(&self, record: &OutputRecord) -> Result<()> {
            self.log.borrow_mut().push(format!("register {}", record.display_name));
            Ok(())
        }
    }

    struct FakeDialog {
        id: usize,
        log: Log,
    }

    impl ProgressDialog for FakeDialog {
        fn show(&mut self) {
            self.log.borrow_mut().push(format!("dialog{} show", self.id));
        }

        fn update(&mut self, update: &ProgressUpdate, _statistics: &Statistics) {
            self.log.borrow_mut().push(format!("dialog{} {}", self.id, update.text));
        }

        fn dismiss(&mut self) {
            self.log.borrow_mut().push(format!("dialog{} dismiss", self.id));
        }
    }

    struct FakeNotifier {
        log: Log,
    }

    impl Notifier for FakeNotifier {
        fn toast(&self, msg: &str) {
            self.log.borrow_mut().push(format!("toast {}", msg));
        }
    }

    fn new_session(duration_ms: i64, codec: Codec, fail: bool) -> (CompressSession, Sender<EngineEvent>, Log) {
        let log: Log = Rc::new(RefCell::new(vec![]));
        let (tx, rx) = mpsc::channel();
        let created = Rc::new(RefCell::new(0));
        let dialog_log = Rc::clone(&log);
        let dialogs: DialogFactory = Box::new(move || -> Box<dyn ProgressDialog> {
            *created.borrow_mut() += 1;
            Box::new(FakeDialog { id: *created.borrow(), log: Rc::clone(&dialog_log) })
        });
        let session = CompressSession::new(
                Box::new(FakeEngine { log: Rc::clone(&log), fail }),
                rx,
                PathBuf::from("/dev/null/videos"))
            .codec(codec)
            .store(Box::new(FakeStore { log: Rc::clone(&log) }))
            .prober(Box::new(FakeProbe(duration_ms)))
            .notifier(Box::new(FakeNotifier { log: Rc::clone(&log) }))
            .dialogs(dialogs);
        (session, tx, log)
    }

    fn stats(execution_id: u64, time_ms: i64) -> EngineEvent {
        EngineEvent::Statistics(Statistics {
            execution_id,
            time_ms,
            ..Default::default()
        })
    }

    #[test]
    fn test_zero_duration_aborts() {
        for duration in [0, -5] {
            let (mut session, _tx, log) = new_session(duration, Codec::Vp9, false);
            assert_eq!(session.compress("/a.mp4", "out").unwrap(), None);
            assert_eq!(session.state(), JobState::Idle);
            assert!(session.job().is_none());
            assert_eq!(*log.borrow(), vec![
                "dialog1 show",
                "toast Duration is zero",
                "dialog1 dismiss",
            ]);
        }
    }

    #[test]
    fn test_compress_starts_job() {
        let (mut session, _tx, log) = new_session(9000, Codec::Vp9, false);
        assert_eq!(session.compress("/a.mp4", "out").unwrap(), Some(7));
        assert_eq!(session.state(), JobState::Running(7));
        let job = session.job().unwrap();
        assert_eq!(job.total_duration_ms(), 9000);
        assert_eq!(job.destination, PathBuf::from("/dev/null/videos/out.webm"));
        assert_eq!(*log.borrow(), vec![
            "dialog1 show",
            "register out.webm",
            "execute -i /a.mp4 -vsync 2 -async 1 -b:v 2M  -c:v libvpx-vp9 /dev/null/videos/out.webm",
        ]);
    }

    #[test]
    fn test_unresolved_source_propagates_null() {
        let (mut session, _tx, log) = new_session(9000, Codec::X264, false);
        assert_eq!(session.compress("content://missing", "out").unwrap(), Some(7));
        assert!(log.borrow().iter().any(|l| l.starts_with("execute -i null -vsync 2")));
    }

    #[test]
    fn test_second_job_rejected_while_running() {
        let (mut session, _tx, _log) = new_session(9000, Codec::X264, false);
        session.compress("/a.mp4", "one").unwrap();
        assert!(matches!(session.compress("/b.mp4", "two"), Err(CompressorError::JobInFlight(7))));
        assert_eq!(session.state(), JobState::Running(7));
    }

    #[test]
    fn test_progress_and_success() {
        let (mut session, tx, log) = new_session(9000, Codec::X264, false);
        session.compress("/a.mp4", "out").unwrap();
        log.borrow_mut().clear();

        tx.send(stats(7, 0)).unwrap();
        tx.send(stats(7, 4500)).unwrap();
        tx.send(stats(99, 4600)).unwrap();
        tx.send(stats(7, 9500)).unwrap();
        tx.send(EngineEvent::Complete { execution_id: 7, return_code: 0 }).unwrap();

        assert_eq!(session.wait_for_outcome(), Some(Outcome::Success));
        assert_eq!(session.state(), JobState::Idle);
        assert!(session.job().is_none());
        assert_eq!(*log.borrow(), vec![
            "dialog1 Encoding video : % 50.",
            "dialog1 Encoding video : % 106.",
            "dialog1 dismiss",
            "toast Success compress",
        ]);
    }

    #[test]
    fn test_terminal_outcomes_recreate_dialog() {
        for (code, expected) in [(0, Outcome::Success), (255, Outcome::Cancelled), (1, Outcome::Other(1))] {
            let (mut session, _tx, log) = new_session(9000, Codec::X264, false);
            session.compress("/a.mp4", "out").unwrap();
            assert_eq!(session.handle_event(EngineEvent::Complete { execution_id: 7, return_code: code }), Some(expected));
            session.compress("/a.mp4", "again").unwrap();
            let log = log.borrow();
            assert!(log.contains(&String::from("dialog1 dismiss")));
            assert!(log.contains(&String::from("dialog2 show")));
            assert_eq!(log.iter().any(|l| l == "toast Success compress"), expected == Outcome::Success);
        }
    }

    #[test]
    fn test_stale_completion_ignored() {
        let (mut session, _tx, _log) = new_session(9000, Codec::X264, false);
        session.compress("/a.mp4", "out").unwrap();
        assert_eq!(session.handle_event(EngineEvent::Complete { execution_id: 3, return_code: 0 }), None);
        assert_eq!(session.state(), JobState::Running(7));
    }

    #[test]
    fn test_engine_failure_returns_to_idle() {
        let (mut session, _tx, log) = new_session(9000, Codec::X264, true);
        assert!(matches!(session.compress("/a.mp4", "out"), Err(CompressorError::Spawn(_))));
        assert_eq!(session.state(), JobState::Idle);
        assert_eq!(log.borrow().last().map(String::as_str), Some("dialog1 dismiss"));
    }

    #[test]
    fn test_cancel_forwards_running_id() {
        let (mut session, _tx, log) = new_session(9000, Codec::X264, false);
        session.cancel();
        session.compress("/a.mp4", "out").unwrap();
        session.cancel();
        assert_eq!(log.borrow().last().map(String::as_str), Some("cancel 7"));
        assert_eq!(log.borrow().iter().filter(|l| l.starts_with("cancel")).count(), 1);
    }

    #[test]
    fn test_closed_channel_ends_wait() {
        let (mut session, tx, _log) = new_session(9000, Codec::X264, false);
        assert_eq!(session.wait_for_outcome(), None);
        session.compress("/a.mp4", "out").unwrap();
        drop(tx);
        assert_eq!(session.wait_for_outcome(), None);
        assert_eq!(session.state(), JobState::Idle);
    }

    #[test]
    fn test_compose_command() {
        let (session, _tx, _log) = new_session(9000, Codec::Theora, false);
        assert_eq!(
            session.compose_command("file:///a.mp4", "out").as_str(),
            "-i /a.mp4 -vsync 2 -async 1 -qscale:v 7  -c:v libtheora /dev/null/videos/out.ogv"
        );
    }
}
