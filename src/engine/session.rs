use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use super::state::Phase;
use crate::client::{JobInput, JobStatus};

/// Appended to the displayed result once a job is canceled.
pub const CANCELED_MARKER: &str = " - canceled!";

/// Shown before anything has been submitted.
pub const NOTHING_YET: &str = "Nothing to show yet...";

/// Engine-internal state of one live job.
///
/// Created on submit and dropped exactly once, on a terminal status or on
/// explicit cancellation.
#[derive(Debug, Clone)]
pub struct PollSession {
    session_id: Uuid,
    input: JobInput,
    request_id: Option<String>,
    timer_running: bool,
    last_status: JobStatus,
    interval: Duration,
    polls_in_flight: usize,
}

impl PollSession {
    pub fn new(input: JobInput, interval: Duration) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            input,
            request_id: None,
            timer_running: false,
            last_status: JobStatus::default(),
            interval,
            polls_in_flight: 0,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn input(&self) -> &JobInput {
        &self.input
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn last_status(&self) -> &JobStatus {
        &self.last_status
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn polls_in_flight(&self) -> usize {
        self.polls_in_flight
    }

    /// Records the first non-empty id; later ids never replace it.
    pub(crate) fn adopt_request_id(&mut self, id: &str) -> bool {
        if self.request_id.is_some() || id.is_empty() {
            return false;
        }
        self.request_id = Some(id.to_string());
        true
    }

    /// Replaces the last known status. No merging.
    pub(crate) fn fold(&mut self, status: JobStatus) {
        self.last_status = status;
    }

    pub(crate) fn set_timer_running(&mut self, running: bool) {
        self.timer_running = running;
    }

    pub(crate) fn poll_sent(&mut self) {
        self.polls_in_flight += 1;
    }

    pub(crate) fn poll_returned(&mut self) {
        self.polls_in_flight = self.polls_in_flight.saturating_sub(1);
    }
}

/// Read-only projection rendered by the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub phase: Phase,
    pub result: String,
    pub progress_percent: u8,
    pub in_progress: bool,
    pub last_error: String,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            result: NOTHING_YET.to_string(),
            progress_percent: 0,
            in_progress: false,
            last_error: String::new(),
        }
    }
}

/// Display text for a status: the value, the error, or `"<value> (<error>)"`,
/// with the cancel marker when the backend acknowledged a cancellation.
pub fn render_result(status: &JobStatus) -> String {
    let mut result = match (status.value.is_empty(), status.error.is_empty()) {
        (_, true) => status.value.clone(),
        (true, false) => status.error.clone(),
        (false, false) => format!("{} ({})", status.value, status.error),
    };
    if status.canceled {
        result.push_str(CANCELED_MARKER);
    }
    result
}

pub(crate) fn with_cancel_marker(result: &str) -> String {
    if result.ends_with(CANCELED_MARKER) {
        result.to_string()
    } else {
        format!("{result}{CANCELED_MARKER}")
    }
}
