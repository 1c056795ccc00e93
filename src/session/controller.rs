use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::config::SessionSettings;
use crate::core::time::{format_utc, Clock, SystemClock};
use crate::exam::descriptor::{ExamDescriptor, ExamTiming};
use crate::exam::phase::{compute_phase, exam_window, Phase, TimeRemaining};
use crate::schemas::submission::SaveProgressRequest;
use crate::services::exam_api::ExamApi;
use crate::session::answers::{AnswerCollector, Attachment, AttachmentMeta};
use crate::session::gate::{SubmissionGate, SubmitResolution, SubmitTrigger};
use crate::session::notify::{NoticeSender, SessionNotice};
use crate::session::state::SessionState;

pub(crate) type StartResolution = anyhow::Result<OffsetDateTime>;

// Refreshed on every tick and after every accepted mutation.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub remaining: Option<TimeRemaining>,
    pub selected_answers: BTreeMap<String, String>,
    pub attachments: Vec<AttachmentMeta>,
    pub submission_in_flight: bool,
}

#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Submit,
    SelectAnswer { question_id: String, choice: String },
    Attach(Attachment),
    RemoveAttachment { id: String },
    Shutdown,
}

// Ticks, learner actions and I/O resolutions all funnel through one task,
// so no two mutations ever interleave mid-statement.
pub(crate) struct SessionController {
    descriptor: ExamDescriptor,
    learner_id: String,
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
    api: Arc<dyn ExamApi>,
    state: SessionState,
    answers: AnswerCollector,
    gate: SubmissionGate,
    notices: NoticeSender,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    starts_tx: mpsc::UnboundedSender<StartResolution>,
    last_phase: Phase,
    ticking: bool,
    start_in_flight: bool,
    ticks_since_save: u32,
    answers_dirty: bool,
    stopped: bool,
}

pub(crate) struct SessionChannels {
    pub(crate) submits: mpsc::UnboundedReceiver<SubmitResolution>,
    pub(crate) starts: mpsc::UnboundedReceiver<StartResolution>,
    pub(crate) snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionController {
    pub(crate) fn new(
        descriptor: ExamDescriptor,
        learner_id: String,
        api: Arc<dyn ExamApi>,
        settings: SessionSettings,
        clock: Arc<dyn Clock>,
        notices: NoticeSender,
    ) -> (Self, SessionChannels) {
        let (submits_tx, submits) = mpsc::unbounded_channel();
        let (starts_tx, starts) = mpsc::unbounded_channel();

        let state = SessionState::for_descriptor(&descriptor);
        let answers = AnswerCollector::new(settings.max_attachments);
        let gate = SubmissionGate::new(api.clone(), submits_tx);

        let now = clock.now_utc();
        let initial_phase = compute_phase(&descriptor, &state, now);
        let initial = SessionSnapshot {
            phase: initial_phase,
            remaining: remaining_for(&descriptor, &state, initial_phase, now),
            selected_answers: BTreeMap::new(),
            attachments: Vec::new(),
            submission_in_flight: false,
        };
        let (snapshot_tx, snapshots) = watch::channel(initial);

        let controller = Self {
            descriptor,
            learner_id,
            settings,
            clock,
            api,
            state,
            answers,
            gate,
            notices,
            snapshot_tx,
            starts_tx,
            last_phase: initial_phase,
            ticking: !(initial_phase.is_terminal() || initial_phase == Phase::Ended),
            start_in_flight: false,
            ticks_since_save: 0,
            answers_dirty: false,
            stopped: false,
        };

        (controller, SessionChannels { submits, starts, snapshots })
    }

    pub(crate) fn spawn(
        descriptor: ExamDescriptor,
        learner_id: String,
        api: Arc<dyn ExamApi>,
        settings: SessionSettings,
        clock: Arc<dyn Clock>,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionNotice>) {
        let (notices, notices_rx) = NoticeSender::channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (controller, channels) =
            Self::new(descriptor, learner_id, api, settings, clock, notices);

        let snapshots = channels.snapshots.clone();
        let task = tokio::spawn(controller.run(commands_rx, channels));

        (SessionHandle { commands: commands_tx, snapshots, task }, notices_rx)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut channels: SessionChannels,
    ) {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.stopped {
            tokio::select! {
                _ = ticker.tick(), if self.ticking => {
                    let now = self.clock.now_utc();
                    self.handle_tick(now);
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    // Handle dropped without an explicit shutdown: same teardown.
                    None => break,
                },
                Some(resolution) = channels.submits.recv() => {
                    self.handle_submit_resolution(resolution);
                }
                Some(resolution) = channels.starts.recv() => {
                    self.handle_start_resolution(resolution);
                }
            }
        }

        tracing::debug!(exam_id = %self.descriptor.id, "Session loop stopped");
    }

    pub(crate) fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start => self.handle_start(),
            Command::Submit => {
                let now = self.clock.now_utc();
                let phase = self.observe_phase(now);
                if !matches!(phase, Phase::Active | Phase::GracePeriod | Phase::Ended) {
                    tracing::debug!(
                        exam_id = %self.descriptor.id,
                        phase = ?phase,
                        "Ignoring submit outside the submittable window"
                    );
                    return;
                }
                if self.gate.trigger(
                    &self.descriptor,
                    &self.learner_id,
                    &mut self.state,
                    &self.answers,
                    SubmitTrigger::Manual,
                ) {
                    self.publish();
                }
            }
            Command::SelectAnswer { question_id, choice } => {
                if self.answers.select(&question_id, &choice) {
                    self.answers_dirty = true;
                    self.publish();
                }
            }
            Command::Attach(attachment) => {
                if self.answers.attach(attachment) {
                    self.publish();
                }
            }
            Command::RemoveAttachment { id } => {
                if self.answers.remove_attachment(&id) {
                    self.publish();
                }
            }
            Command::Shutdown => {
                self.stopped = true;
            }
        }
    }

    fn handle_start(&mut self) {
        if !matches!(self.descriptor.timing, ExamTiming::Anytime) {
            return;
        }

        let now = self.clock.now_utc();
        let phase = self.observe_phase(now);
        // Double clicks and repeat taps land here; only the first one flies.
        if phase.is_terminal() || self.state.effective_start().is_some() || self.start_in_flight {
            return;
        }

        self.start_in_flight = true;
        let api = self.api.clone();
        let exam_id = self.descriptor.id.clone();
        let starts = self.starts_tx.clone();
        tokio::spawn(async move {
            let result = api.start_exam(&exam_id).await;
            let _ = starts.send(result);
        });
    }

    pub(crate) fn handle_start_resolution(&mut self, resolution: StartResolution) {
        self.start_in_flight = false;
        match resolution {
            Ok(started_at) => {
                // The server's timestamp is the one that sticks, so a page
                // reload rebuilds the identical deadline.
                if self.state.begin(started_at) {
                    metrics::counter!("exam_sessions_started_total").increment(1);
                    tracing::info!(
                        exam_id = %self.descriptor.id,
                        started_at = %format_utc(started_at),
                        "Exam started"
                    );
                    self.ticking = true;
                }
                self.publish();
            }
            Err(err) => {
                tracing::warn!(exam_id = %self.descriptor.id, error = %err, "Failed to start exam");
                self.notices.emit(SessionNotice::StartFailed { detail: err.to_string() });
            }
        }
    }

    // One evaluation of the state machine. All I/O it causes is spawned,
    // never awaited; the tick itself completes within the quantum.
    pub(crate) fn handle_tick(&mut self, now: OffsetDateTime) {
        let phase = self.observe_phase(now);

        if phase == Phase::GracePeriod && !self.state.grace_notice_emitted() {
            self.state.mark_grace_notice_emitted();
            self.notices.emit(SessionNotice::GracePeriodStarted);
        }

        if matches!(phase, Phase::Active | Phase::GracePeriod) && !self.state.warning_emitted() {
            if let Some(window) = exam_window(&self.descriptor, &self.state) {
                let deadline =
                    if phase == Phase::Active { window.end } else { window.grace_end };
                if (deadline - now).whole_seconds()
                    <= i64::from(self.settings.warning_threshold_seconds)
                {
                    self.state.mark_warning_emitted();
                    metrics::counter!("exam_session_warnings_total").increment(1);
                    self.notices.emit(SessionNotice::OneMinuteLeft);
                }
            }
        }

        if matches!(phase, Phase::Active | Phase::GracePeriod) {
            self.maybe_auto_save();
        }

        if phase == Phase::Ended && self.ticking {
            // First arrival at the deadline; the ticker stops here, so the
            // auto path runs at most once per session run.
            self.ticking = false;
            if !self.answers.is_empty() {
                self.gate.trigger(
                    &self.descriptor,
                    &self.learner_id,
                    &mut self.state,
                    &self.answers,
                    SubmitTrigger::Auto,
                );
            }
        }

        if phase.is_terminal() {
            self.ticking = false;
        }

        self.publish_phase(phase, now);
    }

    pub(crate) fn handle_submit_resolution(&mut self, resolution: SubmitResolution) {
        match resolution.result {
            Ok(ack) => {
                self.state.finish_submission(true);
                self.answers.lock();
                self.ticking = false;
                metrics::counter!(
                    "exam_session_submissions_total",
                    "trigger" => resolution.trigger.as_str(),
                    "outcome" => "accepted"
                )
                .increment(1);
                tracing::info!(
                    exam_id = %self.descriptor.id,
                    submission_id = %ack.submission_id,
                    trigger = resolution.trigger.as_str(),
                    "Submission accepted"
                );
                self.notices.emit(SessionNotice::SubmissionAccepted);
            }
            Err(err) => {
                self.state.finish_submission(false);
                metrics::counter!(
                    "exam_session_submissions_total",
                    "trigger" => resolution.trigger.as_str(),
                    "outcome" => "failed"
                )
                .increment(1);
                tracing::error!(
                    exam_id = %self.descriptor.id,
                    trigger = resolution.trigger.as_str(),
                    error = %err,
                    "Submission failed"
                );
                // No automatic retry for the auto path; every learner hits
                // this deadline at the same instant. Manual retry stays open.
                self.notices.emit(SessionNotice::SubmissionFailed {
                    trigger: resolution.trigger,
                    detail: err.to_string(),
                });
            }
        }
        self.publish();
    }

    // The published phase never regresses if the wall clock steps
    // backwards. Terminal phases pass through from anywhere.
    fn observe_phase(&mut self, now: OffsetDateTime) -> Phase {
        let computed = compute_phase(&self.descriptor, &self.state, now);
        let phase = if !computed.is_terminal()
            && !self.last_phase.is_terminal()
            && computed.rank() < self.last_phase.rank()
        {
            self.last_phase
        } else {
            computed
        };
        self.last_phase = phase;
        phase
    }

    fn maybe_auto_save(&mut self) {
        self.ticks_since_save += 1;
        if !self.answers_dirty || self.ticks_since_save < self.settings.auto_save_interval_seconds {
            return;
        }

        self.ticks_since_save = 0;
        self.answers_dirty = false;

        let request = SaveProgressRequest {
            exam_id: self.descriptor.id.clone(),
            learner_id: self.learner_id.clone(),
            answers: self.answers.selections().clone(),
        };
        let api = self.api.clone();
        tokio::spawn(async move {
            match api.save_progress(request).await {
                Ok(()) => {
                    metrics::counter!("exam_session_autosaves_total").increment(1);
                }
                Err(err) => {
                    // The next selection re-marks the state dirty.
                    tracing::warn!(error = %err, "Auto-save failed");
                }
            }
        });
    }

    fn publish(&mut self) {
        let now = self.clock.now_utc();
        let phase = self.observe_phase(now);
        self.publish_phase(phase, now);
    }

    fn publish_phase(&mut self, phase: Phase, now: OffsetDateTime) {
        let snapshot = SessionSnapshot {
            phase,
            remaining: remaining_for(&self.descriptor, &self.state, phase, now),
            selected_answers: self.answers.selections().clone(),
            attachments: self.answers.attachment_metas(),
            submission_in_flight: self.state.submission_in_flight(),
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}

fn remaining_for(
    descriptor: &ExamDescriptor,
    state: &SessionState,
    phase: Phase,
    now: OffsetDateTime,
) -> Option<TimeRemaining> {
    match phase {
        Phase::NotStarted => {
            Some(TimeRemaining::from_seconds(i64::from(descriptor.duration_seconds)))
        }
        Phase::Upcoming => {
            exam_window(descriptor, state).map(|window| TimeRemaining::until(window.start, now))
        }
        Phase::Active => {
            exam_window(descriptor, state).map(|window| TimeRemaining::until(window.end, now))
        }
        Phase::GracePeriod => {
            exam_window(descriptor, state).map(|window| TimeRemaining::until(window.grace_end, now))
        }
        Phase::Ended | Phase::Cancelled | Phase::Submitted => None,
    }
}

pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn start(&self) {
        let _ = self.commands.send(Command::Start);
    }

    pub fn submit(&self) {
        let _ = self.commands.send(Command::Submit);
    }

    pub fn select_answer(&self, question_id: &str, choice: &str) {
        let _ = self.commands.send(Command::SelectAnswer {
            question_id: question_id.to_string(),
            choice: choice.to_string(),
        });
    }

    pub fn attach(&self, attachment: Attachment) {
        let _ = self.commands.send(Command::Attach(attachment));
    }

    pub fn remove_attachment(&self, id: &str) {
        let _ = self.commands.send(Command::RemoveAttachment { id: id.to_string() });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if self.task.await.is_err() {
            tracing::warn!("Session task panicked before shutdown");
        }
    }
}

pub struct SessionManager {
    api: Arc<dyn ExamApi>,
    settings: SessionSettings,
    clock: Arc<dyn Clock>,
    current: Option<SessionHandle>,
}

impl SessionManager {
    pub fn new(api: Arc<dyn ExamApi>, settings: SessionSettings) -> Self {
        Self::with_clock(api, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        api: Arc<dyn ExamApi>,
        settings: SessionSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { api, settings, clock, current: None }
    }

    pub async fn attach(
        &mut self,
        descriptor: ExamDescriptor,
        learner_id: &str,
    ) -> mpsc::UnboundedReceiver<SessionNotice> {
        // The old loop is torn down before the new one spawns; intervals
        // are recreated, never stacked.
        if let Some(previous) = self.current.take() {
            previous.shutdown().await;
        }

        let (handle, notices) = SessionController::spawn(
            descriptor,
            learner_id.to_string(),
            self.api.clone(),
            self.settings.clone(),
            self.clock.clone(),
        );
        self.current = Some(handle);
        notices
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.current.as_ref()
    }

    pub async fn detach(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.shutdown().await;
        }
    }
}
