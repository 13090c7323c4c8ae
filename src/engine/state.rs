use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::session::{PollSession, StatusView, render_result, with_cancel_marker};
use super::timer::MIN_PERIOD;
use crate::client::{Intent, JobInput, JobRequest, JobStatus, TransportError};

/// The phases of a job's polling lifecycle.
///
/// Each job flows through: IDLE → SUBMITTING → POLLING → {SUCCEEDED | FAILED | CANCELED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
    Canceled,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed | Phase::Canceled)
    }

    /// A job is live while its create request or polls are outstanding.
    pub fn is_active(self) -> bool {
        matches!(self, Phase::Submitting | Phase::Polling)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "IDLE"),
            Phase::Submitting => write!(f, "SUBMITTING"),
            Phase::Polling => write!(f, "POLLING"),
            Phase::Succeeded => write!(f, "SUCCEEDED"),
            Phase::Failed => write!(f, "FAILED"),
            Phase::Canceled => write!(f, "CANCELED"),
        }
    }
}

/// What to do when a tick fires while an earlier poll is still outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Poll anyway; the last response to arrive wins.
    #[default]
    Allow,
    /// Skip the tick.
    Skip,
}

/// Side effects requested by a transition, executed by the driver in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Perform one exchange; the response comes back tagged with `epoch`.
    Send { epoch: u64, request: JobRequest },
    /// Start the repeating poll timer, replacing any existing one.
    StartTimer(Duration),
    StopTimer,
}

/// Drives a single job slot through the polling lifecycle.
///
/// Transitions never perform I/O; they return the [`Effect`]s to run. Each
/// submission opens a new epoch, and responses from older epochs are dropped.
#[derive(Debug)]
pub struct PollMachine {
    phase: Phase,
    session: Option<PollSession>,
    view: StatusView,
    interval: Duration,
    overlap: OverlapPolicy,
    epoch: u64,
    ticks: u64,
    final_status: Option<JobStatus>,
}

impl PollMachine {
    /// An `interval` below [`MIN_PERIOD`] is raised to it.
    pub fn new(interval: Duration, overlap: OverlapPolicy) -> Self {
        Self {
            phase: Phase::Idle,
            session: None,
            view: StatusView::default(),
            interval: interval.max(MIN_PERIOD),
            overlap,
            epoch: 0,
            ticks: 0,
            final_status: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn view(&self) -> &StatusView {
        &self.view
    }

    pub fn session(&self) -> Option<&PollSession> {
        self.session.as_ref()
    }

    pub fn is_timer_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(PollSession::is_timer_running)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks that issued a poll in the current epoch.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Last known status of the most recently finished session.
    pub fn final_status(&self) -> Option<&JobStatus> {
        self.final_status.as_ref()
    }

    pub fn submit(&mut self, input: JobInput) -> Vec<Effect> {
        if self.phase.is_active() {
            warn!(phase = %self.phase, "submit ignored, a job is already in flight");
            return Vec::new();
        }

        self.epoch += 1;
        self.ticks = 0;
        self.final_status = None;

        let session = PollSession::new(input, self.interval);
        info!(
            session_id = %session.session_id(),
            payload = session.input().payload(),
            "submitting job"
        );

        let request = session.input().request(Intent::Create, None);
        self.view = StatusView {
            phase: Phase::Submitting,
            result: format!("Requested '{}'", session.input().payload()),
            progress_percent: 0,
            in_progress: true,
            last_error: String::new(),
        };
        self.phase = Phase::Submitting;
        self.session = Some(session);

        vec![Effect::Send {
            epoch: self.epoch,
            request,
        }]
    }

    pub fn tick(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Polling {
            debug!(phase = %self.phase, "tick ignored");
            return Vec::new();
        }
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        if self.overlap == OverlapPolicy::Skip && session.polls_in_flight() > 0 {
            debug!(
                in_flight = session.polls_in_flight(),
                "tick skipped, poll still outstanding"
            );
            return Vec::new();
        }

        self.ticks += 1;
        session.poll_sent();
        debug!(
            session_id = %session.session_id(),
            request_id = session.request_id().unwrap_or(""),
            tick = self.ticks,
            "polling job status"
        );

        vec![Effect::Send {
            epoch: self.epoch,
            request: session.input().request(Intent::Poll, session.request_id()),
        }]
    }

    /// Stops the timer and emits the cancel request. No-op unless a job is live.
    pub fn cancel(&mut self) -> Vec<Effect> {
        if !self.phase.is_active() {
            debug!(phase = %self.phase, "cancel ignored");
            return Vec::new();
        }
        let Some(session) = self.session.take() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        if session.is_timer_running() {
            effects.push(Effect::StopTimer);
        }

        info!(
            session_id = %session.session_id(),
            request_id = session.request_id().unwrap_or(""),
            "canceling job"
        );

        let request = session.input().request(Intent::Cancel, session.request_id());
        self.phase = Phase::Canceled;
        self.view.phase = Phase::Canceled;
        self.view.in_progress = false;
        self.view.result = with_cancel_marker(&self.view.result);
        self.final_status = Some(session.last_status().clone());

        effects.push(Effect::Send {
            epoch: self.epoch,
            request,
        });
        effects
    }

    pub fn on_response(
        &mut self,
        epoch: u64,
        intent: Intent,
        result: Result<JobStatus, TransportError>,
    ) -> Vec<Effect> {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "dropping response from an earlier job");
            return Vec::new();
        }

        if intent == Intent::Poll
            && let Some(session) = self.session.as_mut()
        {
            session.poll_returned();
        }

        match (self.phase, intent) {
            (Phase::Submitting, Intent::Create) => self.on_created(result),
            (Phase::Polling, Intent::Poll) => self.on_polled(result),
            (Phase::Canceled, Intent::Cancel) => {
                self.on_cancel_acknowledged(result);
                Vec::new()
            }
            (phase, intent) => {
                debug!(%phase, %intent, "dropping late response");
                Vec::new()
            }
        }
    }

    fn on_created(&mut self, result: Result<JobStatus, TransportError>) -> Vec<Effect> {
        let status = match result {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "create request failed");
                self.view.last_error = err.to_string();
                return self.finish(Phase::Failed);
            }
        };

        if let Some(terminal) = self.absorb(status) {
            return self.finish(terminal);
        }

        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        session.set_timer_running(true);
        self.phase = Phase::Polling;
        self.view.phase = Phase::Polling;

        info!(
            session_id = %session.session_id(),
            request_id = session.request_id().unwrap_or(""),
            interval_ms = session.interval().as_millis() as u64,
            "job accepted, polling"
        );

        vec![Effect::StartTimer(session.interval())]
    }

    fn on_polled(&mut self, result: Result<JobStatus, TransportError>) -> Vec<Effect> {
        match result {
            Ok(status) => match self.absorb(status) {
                Some(terminal) => self.finish(terminal),
                None => Vec::new(),
            },
            Err(err) => {
                // The timer keeps running; the next tick is the retry.
                warn!(error = %err, "poll failed");
                self.view.last_error = err.to_string();
                Vec::new()
            }
        }
    }

    fn on_cancel_acknowledged(&mut self, result: Result<JobStatus, TransportError>) {
        match result {
            Ok(status) if status.is_empty() => debug!("empty cancel acknowledgement"),
            Ok(status) => {
                self.view.result = with_cancel_marker(&render_result(&status));
                self.view.progress_percent = status.progress_percent();
                self.view.last_error = status.error.clone();
                self.final_status = Some(status);
            }
            Err(err) => {
                warn!(error = %err, "cancel request failed");
                self.view.last_error = err.to_string();
            }
        }
    }

    /// Folds a status into the session and returns the terminal phase it implies.
    ///
    /// An error or a cancellation outranks `progress`.
    fn absorb(&mut self, status: JobStatus) -> Option<Phase> {
        let session = self.session.as_mut()?;
        if status.is_empty() {
            debug!("empty status, nothing to fold");
            return None;
        }

        if session.adopt_request_id(&status.request_id) {
            debug!(
                request_id = %status.request_id,
                created_at = ?status.created_at_time(),
                "request id assigned"
            );
        }

        self.view.result = render_result(&status);
        self.view.progress_percent = status.progress_percent();
        self.view.last_error = status.error.clone();

        let terminal = if status.is_failed() {
            Some(Phase::Failed)
        } else if status.canceled {
            Some(Phase::Canceled)
        } else if status.is_complete() {
            Some(Phase::Succeeded)
        } else {
            None
        };

        session.fold(status);
        terminal
    }

    fn finish(&mut self, phase: Phase) -> Vec<Effect> {
        self.phase = phase;
        self.view.phase = phase;
        self.view.in_progress = false;

        let mut effects = Vec::new();
        if let Some(session) = self.session.take() {
            if session.is_timer_running() {
                effects.push(Effect::StopTimer);
            }
            info!(
                session_id = %session.session_id(),
                %phase,
                ticks = self.ticks,
                created_at = ?session.last_status().created_at_time(),
                "job finished"
            );
            self.final_status = Some(session.last_status().clone());
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(500);

    /// Runs machine effects against a fake timer and records sent requests.
    struct Sim {
        machine: PollMachine,
        active_timers: usize,
        timers_started: usize,
        sent: Vec<(u64, JobRequest)>,
    }

    impl Sim {
        fn new() -> Self {
            Self::with_overlap(OverlapPolicy::Allow)
        }

        fn with_overlap(overlap: OverlapPolicy) -> Self {
            Self {
                machine: PollMachine::new(INTERVAL, overlap),
                active_timers: 0,
                timers_started: 0,
                sent: Vec::new(),
            }
        }

        fn apply(&mut self, effects: Vec<Effect>) {
            for effect in effects {
                match effect {
                    Effect::StartTimer(period) => {
                        assert_eq!(period, INTERVAL);
                        self.active_timers = 1;
                        self.timers_started += 1;
                    }
                    Effect::StopTimer => {
                        assert_eq!(self.active_timers, 1, "stopped a timer that was not running");
                        self.active_timers = 0;
                    }
                    Effect::Send { epoch, request } => self.sent.push((epoch, request)),
                }
            }
            assert!(self.active_timers <= 1);
            assert_eq!(self.active_timers == 1, self.machine.is_timer_running());
        }

        fn submit(&mut self, payload: &str) {
            let effects = self.machine.submit(JobInput::new(payload));
            self.apply(effects);
        }

        fn respond(&mut self, intent: Intent, result: Result<JobStatus, TransportError>) {
            let epoch = self.machine.epoch();
            let effects = self.machine.on_response(epoch, intent, result);
            self.apply(effects);
        }

        fn tick(&mut self) {
            // A stopped timer never delivers ticks.
            if self.active_timers == 0 {
                return;
            }
            let effects = self.machine.tick();
            self.apply(effects);
        }

        fn cancel(&mut self) {
            let effects = self.machine.cancel();
            self.apply(effects);
        }

        fn sent_with(&self, intent: Intent) -> Vec<&JobRequest> {
            self.sent
                .iter()
                .map(|(_, r)| r)
                .filter(|r| r.intent == intent)
                .collect()
        }
    }

    fn status(request_id: &str, progress: u32, value: &str) -> JobStatus {
        JobStatus {
            request_id: request_id.into(),
            progress,
            value: value.into(),
            ..Default::default()
        }
    }

    #[test]
    fn scenario_a_polls_until_complete() {
        let mut sim = Sim::new();
        sim.submit("hello");
        assert_eq!(sim.machine.phase(), Phase::Submitting);
        assert_eq!(sim.sent_with(Intent::Create).len(), 1);

        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        assert_eq!(sim.machine.phase(), Phase::Polling);
        assert_eq!(sim.active_timers, 1);

        sim.tick();
        sim.respond(Intent::Poll, Ok(status("r1", 50, "partial")));
        assert_eq!(sim.machine.view().result, "partial");
        assert_eq!(sim.machine.view().progress_percent, 50);

        sim.tick();
        sim.respond(Intent::Poll, Ok(status("r1", 100, "final")));

        assert_eq!(sim.machine.phase(), Phase::Succeeded);
        assert_eq!(sim.machine.view().result, "final");
        assert!(!sim.machine.view().in_progress);
        assert_eq!(sim.machine.ticks(), 2);
        assert_eq!(sim.active_timers, 0);

        sim.tick();
        assert_eq!(sim.sent_with(Intent::Poll).len(), 2);
    }

    #[test]
    fn scenario_b_job_error_is_terminal() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(
            Intent::Poll,
            Ok(JobStatus {
                request_id: "r1".into(),
                value: "partial".into(),
                error: "model unavailable".into(),
                ..Default::default()
            }),
        );

        assert_eq!(sim.machine.phase(), Phase::Failed);
        assert_eq!(sim.machine.view().result, "partial (model unavailable)");
        assert_eq!(sim.machine.view().last_error, "model unavailable");
        assert_eq!(sim.active_timers, 0);
    }

    #[test]
    fn scenario_c_cancel_drops_late_poll_response() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(Intent::Poll, Ok(status("r1", 30, "partial")));

        // A second poll is in flight when the caller cancels.
        sim.tick();
        sim.cancel();
        assert_eq!(sim.active_timers, 0);
        assert_eq!(sim.machine.phase(), Phase::Canceled);

        let cancels = sim.sent_with(Intent::Cancel);
        assert_eq!(cancels.len(), 1);
        assert_eq!(cancels[0].request_id.as_deref(), Some("r1"));
        assert_eq!(cancels[0].payload, "hello");

        sim.respond(Intent::Poll, Ok(status("r1", 90, "resurrected")));
        assert_eq!(sim.machine.phase(), Phase::Canceled);
        assert_eq!(sim.machine.view().result, "partial - canceled!");
        assert_eq!(sim.machine.final_status().unwrap().value, "partial");
    }

    #[test]
    fn scenario_d_create_transport_failure() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(
            Intent::Create,
            Err(TransportError::Message("connection refused".into())),
        );

        assert_eq!(sim.machine.phase(), Phase::Failed);
        assert_eq!(sim.machine.view().last_error, "connection refused");
        assert_eq!(sim.timers_started, 0);
        assert!(sim.machine.session().is_none());
    }

    #[test]
    fn cancel_twice_sends_one_request() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.cancel();
        sim.cancel();
        assert_eq!(sim.sent_with(Intent::Cancel).len(), 1);
        assert_eq!(sim.machine.phase(), Phase::Canceled);
    }

    #[test]
    fn cancel_while_submitting_sends_raw_input() {
        let mut sim = Sim::new();
        sim.submit("https://example.com/cat.jpg");
        sim.cancel();

        let cancels = sim.sent_with(Intent::Cancel);
        assert_eq!(cancels.len(), 1);
        assert_eq!(cancels[0].request_id, None);
        assert_eq!(cancels[0].payload, "https://example.com/cat.jpg");

        // The create response arrives after the cancel and must not start polling.
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        assert_eq!(sim.machine.phase(), Phase::Canceled);
        assert_eq!(sim.timers_started, 0);
    }

    #[test]
    fn cancel_is_noop_when_idle_or_terminal() {
        let mut sim = Sim::new();
        sim.cancel();
        assert_eq!(sim.machine.phase(), Phase::Idle);

        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 100, "done")));
        assert_eq!(sim.machine.phase(), Phase::Succeeded);
        sim.cancel();
        assert_eq!(sim.machine.phase(), Phase::Succeeded);
        assert!(sim.sent_with(Intent::Cancel).is_empty());
    }

    #[test]
    fn cancel_acknowledgement_is_folded_for_display() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(Intent::Poll, Ok(status("r1", 20, "half")));
        sim.cancel();

        sim.respond(
            Intent::Cancel,
            Ok(JobStatus {
                request_id: "r1".into(),
                value: "half done".into(),
                progress: 40,
                canceled: true,
                ..Default::default()
            }),
        );
        assert_eq!(sim.machine.phase(), Phase::Canceled);
        assert_eq!(sim.machine.view().result, "half done - canceled!");
        assert_eq!(sim.machine.view().progress_percent, 40);
    }

    #[test]
    fn cancel_acknowledgement_error_is_surfaced() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.cancel();
        sim.respond(
            Intent::Cancel,
            Ok(JobStatus {
                request_id: "r1".into(),
                error: "queue delete failed".into(),
                ..Default::default()
            }),
        );
        assert_eq!(sim.machine.phase(), Phase::Canceled);
        assert_eq!(sim.machine.view().last_error, "queue delete failed");
        assert_eq!(
            sim.machine.view().result,
            "queue delete failed - canceled!"
        );
    }

    #[test]
    fn failed_cancel_request_still_ends_canceled() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.cancel();
        sim.respond(Intent::Cancel, Err(TransportError::Server));
        assert_eq!(sim.machine.phase(), Phase::Canceled);
        assert_eq!(sim.machine.view().last_error, "Server error");
    }

    #[test]
    fn poll_transport_error_keeps_polling() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(
            Intent::Poll,
            Err(TransportError::Status {
                status: 502,
                reason: "Bad Gateway".into(),
            }),
        );

        assert_eq!(sim.machine.phase(), Phase::Polling);
        assert_eq!(sim.active_timers, 1);
        assert_eq!(sim.machine.view().last_error, "502 - Bad Gateway");

        sim.tick();
        sim.respond(Intent::Poll, Ok(status("r1", 60, "better")));
        assert!(sim.machine.view().last_error.is_empty());
        assert_eq!(sim.sent_with(Intent::Poll).len(), 2);
    }

    #[test]
    fn polls_carry_the_first_request_id() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(Intent::Poll, Ok(status("r2", 10, "x")));
        sim.tick();

        for poll in sim.sent_with(Intent::Poll) {
            assert_eq!(poll.request_id.as_deref(), Some("r1"));
        }
    }

    #[test]
    fn missing_request_id_is_adopted_later() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("", 0, "queued")));
        assert_eq!(sim.machine.phase(), Phase::Polling);

        sim.tick();
        sim.respond(Intent::Poll, Ok(status("r7", 10, "x")));
        sim.tick();

        let polls = sim.sent_with(Intent::Poll);
        assert_eq!(polls[0].request_id, None);
        assert_eq!(polls[1].request_id.as_deref(), Some("r7"));
    }

    #[test]
    fn overlapping_polls_last_response_wins() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.tick();
        assert_eq!(sim.machine.session().unwrap().polls_in_flight(), 2);

        // Responses arrive out of order; there is no sequencing.
        sim.respond(Intent::Poll, Ok(status("r1", 40, "newer")));
        sim.respond(Intent::Poll, Ok(status("r1", 20, "older")));

        let session = sim.machine.session().unwrap();
        assert_eq!(session.last_status().value, "older");
        assert_eq!(session.polls_in_flight(), 0);
        assert_eq!(sim.machine.view().result, "older");
    }

    #[test]
    fn skip_policy_suppresses_overlapping_ticks() {
        let mut sim = Sim::with_overlap(OverlapPolicy::Skip);
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.tick();
        assert_eq!(sim.sent_with(Intent::Poll).len(), 1);
        assert_eq!(sim.machine.ticks(), 1);

        sim.respond(Intent::Poll, Ok(status("r1", 10, "x")));
        sim.tick();
        assert_eq!(sim.sent_with(Intent::Poll).len(), 2);
    }

    #[test]
    fn folding_is_replacement() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(
            Intent::Poll,
            Ok(JobStatus {
                bucket: "word-predict".into(),
                key: "k1".into(),
                request_id: "r1".into(),
                value: "r1 content".into(),
                progress: 70,
                ..Default::default()
            }),
        );
        sim.tick();
        let r2 = status("r1", 30, "r2 content");
        sim.respond(Intent::Poll, Ok(r2.clone()));
        assert_eq!(sim.machine.session().unwrap().last_status(), &r2);
    }

    #[test]
    fn empty_status_is_not_folded() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(Intent::Poll, Ok(status("r1", 40, "partial")));
        sim.tick();
        sim.respond(Intent::Poll, Ok(JobStatus::default()));

        assert_eq!(sim.machine.phase(), Phase::Polling);
        assert_eq!(sim.machine.view().result, "partial");
        assert_eq!(sim.machine.session().unwrap().last_status().progress, 40);
    }

    #[test]
    fn terminal_create_response_never_starts_timer() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(
            Intent::Create,
            Ok(JobStatus {
                request_id: "r1".into(),
                error: "queue full".into(),
                ..Default::default()
            }),
        );
        assert_eq!(sim.machine.phase(), Phase::Failed);
        assert_eq!(sim.timers_started, 0);
        assert_eq!(sim.machine.view().result, "queue full");
    }

    #[test]
    fn backend_cancellation_appends_marker() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(
            Intent::Poll,
            Ok(JobStatus {
                request_id: "r1".into(),
                value: "partial".into(),
                canceled: true,
                progress: 30,
                ..Default::default()
            }),
        );
        assert_eq!(sim.machine.phase(), Phase::Canceled);
        assert_eq!(sim.machine.view().result, "partial - canceled!");
        assert_eq!(sim.active_timers, 0);
    }

    #[test]
    fn error_outranks_full_progress() {
        let mut sim = Sim::new();
        sim.submit("hello");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.respond(
            Intent::Poll,
            Ok(JobStatus {
                request_id: "r1".into(),
                progress: 100,
                error: "corrupt output".into(),
                ..Default::default()
            }),
        );
        assert_eq!(sim.machine.phase(), Phase::Failed);
    }

    #[test]
    fn no_polls_after_any_terminal_status() {
        let terminals = [
            status("r1", 100, "done"),
            JobStatus {
                request_id: "r1".into(),
                error: "boom".into(),
                ..Default::default()
            },
            JobStatus {
                request_id: "r1".into(),
                canceled: true,
                ..Default::default()
            },
        ];

        for terminal in terminals {
            let mut sim = Sim::new();
            sim.submit("hello");
            sim.respond(Intent::Create, Ok(status("r1", 0, "")));
            sim.tick();
            sim.respond(Intent::Poll, Ok(terminal));
            assert!(sim.machine.phase().is_terminal());
            assert_eq!(sim.active_timers, 0);

            // Even a tick already queued by the runtime does nothing.
            let effects = sim.machine.tick();
            assert!(effects.is_empty());
            assert_eq!(sim.sent_with(Intent::Poll).len(), 1);
        }
    }

    #[test]
    fn submit_while_live_is_ignored() {
        let mut sim = Sim::new();
        sim.submit("first");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.submit("second");
        assert_eq!(sim.sent_with(Intent::Create).len(), 1);
        assert_eq!(sim.machine.session().unwrap().input().payload(), "first");
    }

    #[test]
    fn resubmit_after_terminal_drops_old_responses() {
        let mut sim = Sim::new();
        sim.submit("first");
        sim.respond(Intent::Create, Ok(status("r1", 0, "")));
        sim.tick();
        sim.cancel();
        let old_epoch = sim.machine.epoch();

        sim.submit("second");
        assert_eq!(sim.machine.phase(), Phase::Submitting);
        assert_eq!(sim.machine.view().result, "Requested 'second'");

        let effects = sim
            .machine
            .on_response(old_epoch, Intent::Poll, Ok(status("r1", 100, "stale")));
        assert!(effects.is_empty());
        assert_eq!(sim.machine.phase(), Phase::Submitting);
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Idle.to_string(), "IDLE");
        assert_eq!(Phase::Polling.to_string(), "POLLING");
        assert_eq!(Phase::Canceled.to_string(), "CANCELED");
        assert!(Phase::Failed.is_terminal());
        assert!(Phase::Submitting.is_active());
        assert!(!Phase::Idle.is_active());
    }

    #[test]
    fn zero_interval_is_raised_to_minimum_period() {
        let mut machine = PollMachine::new(Duration::ZERO, OverlapPolicy::Allow);
        assert_eq!(machine.interval(), MIN_PERIOD);

        machine.submit(JobInput::new("hello"));
        let effects = machine.on_response(machine.epoch(), Intent::Create, Ok(status("r1", 0, "")));
        assert!(effects.contains(&Effect::StartTimer(MIN_PERIOD)));
        assert_eq!(machine.phase(), Phase::Polling);
    }
}
