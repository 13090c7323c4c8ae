use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::session::StatusView;
use super::state::{Effect, OverlapPolicy, PollMachine};
use super::timer::IntervalTimer;
use crate::client::{Intent, JobClient, JobInput, JobRequest, JobStatus, Transport, TransportError};

const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Tuning for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub interval: Duration,
    pub overlap: OverlapPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            overlap: OverlapPolicy::default(),
        }
    }
}

enum Event {
    Submit(JobInput, oneshot::Sender<()>),
    Cancel(oneshot::Sender<()>),
    Tick(u64),
    Response {
        epoch: u64,
        intent: Intent,
        result: Result<JobStatus, TransportError>,
    },
    Shutdown,
}

/// Handle to a running polling engine.
///
/// The engine is a single task that owns the state machine; timer ticks and
/// network completions are delivered to it as messages, so all state changes
/// happen on one thread of control. Dropping the handle cancels a live job.
pub struct PollingEngine {
    events: mpsc::UnboundedSender<Event>,
    status: watch::Receiver<StatusView>,
    task: JoinHandle<()>,
}

impl PollingEngine {
    pub fn spawn<T>(client: JobClient<T>, options: EngineOptions) -> Self
    where
        T: Transport + 'static,
    {
        let (events, inbox) = mpsc::unbounded_channel();
        let machine = PollMachine::new(options.interval, options.overlap);
        let (publisher, status) = watch::channel(machine.view().clone());

        let actor = Actor {
            machine,
            client: Arc::new(client),
            events: events.clone(),
            timer: IntervalTimer::new(),
            publisher,
        };
        let task = tokio::spawn(actor.run(inbox));

        Self {
            events,
            status,
            task,
        }
    }

    /// Starts a job. Returns once the create request has been dispatched.
    pub async fn submit(&self, input: JobInput) {
        let (ack, done) = oneshot::channel();
        if self.events.send(Event::Submit(input, ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Cancels the live job, if any.
    ///
    /// The poll timer is stopped before this returns; the cancel request itself
    /// completes later and its response only affects the displayed result.
    pub async fn cancel(&self) {
        let (ack, done) = oneshot::channel();
        if self.events.send(Event::Cancel(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Current snapshot of the observable status.
    pub fn status(&self) -> StatusView {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.status.clone()
    }

    /// Resolves with the first published view in a terminal phase.
    pub async fn wait_terminal(&self) -> StatusView {
        let mut status = self.status.clone();
        let terminal = status
            .wait_for(|view| view.phase.is_terminal())
            .await
            .map(|view| view.clone());
        // The engine task is gone; its last view is final.
        terminal.unwrap_or_else(|_| status.borrow().clone())
    }
}

impl Drop for PollingEngine {
    fn drop(&mut self) {
        if self.events.send(Event::Shutdown).is_err() {
            self.task.abort();
        }
    }
}

struct Actor<T> {
    machine: PollMachine,
    client: Arc<JobClient<T>>,
    events: mpsc::UnboundedSender<Event>,
    timer: IntervalTimer,
    publisher: watch::Sender<StatusView>,
}

impl<T: Transport + 'static> Actor<T> {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = inbox.recv().await {
            match event {
                Event::Submit(input, ack) => {
                    let effects = self.machine.submit(input);
                    self.execute(effects);
                    self.publish();
                    let _ = ack.send(());
                }
                Event::Cancel(ack) => {
                    let effects = self.machine.cancel();
                    self.execute(effects);
                    self.publish();
                    let _ = ack.send(());
                }
                Event::Tick(generation) => {
                    if !self.timer.is_current(generation) {
                        debug!(generation, "dropping tick from a stopped timer");
                        continue;
                    }
                    let effects = self.machine.tick();
                    self.execute(effects);
                }
                Event::Response {
                    epoch,
                    intent,
                    result,
                } => {
                    let effects = self.machine.on_response(epoch, intent, result);
                    self.execute(effects);
                }
                Event::Shutdown => {
                    // Caller walked away: best-effort cancel, then stop.
                    let effects = self.machine.cancel();
                    self.execute(effects);
                    self.timer.stop();
                    self.publish();
                    break;
                }
            }
            self.publish();
        }
        debug!("polling engine stopped");
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTimer(period) => {
                    let events = self.events.clone();
                    self.timer.start(period, move |generation| {
                        events.send(Event::Tick(generation)).is_ok()
                    });
                }
                Effect::StopTimer => self.timer.stop(),
                Effect::Send { epoch, request } => self.dispatch(epoch, request),
            }
        }
    }

    /// Runs one exchange off the actor; the result comes back as an event.
    fn dispatch(&self, epoch: u64, request: JobRequest) {
        let client = Arc::clone(&self.client);
        let events = self.events.clone();
        tokio::spawn(async move {
            let intent = request.intent;
            let result = client.send(&request).await;
            if events
                .send(Event::Response {
                    epoch,
                    intent,
                    result,
                })
                .is_err()
            {
                debug!(%intent, "engine gone, response discarded");
            }
        });
    }

    fn publish(&self) {
        let view = self.machine.view();
        self.publisher.send_if_modified(|current| {
            if current == view {
                return false;
            }
            *current = view.clone();
            true
        });
        if view.phase.is_terminal() && self.timer.is_running() {
            warn!(phase = %view.phase, "timer still running in a terminal phase");
        }
    }
}
