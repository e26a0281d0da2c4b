use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::clicks::match_click;
use super::consent::ConsentState;
use super::event::{EventData, TrackedEvent};
use super::scroll::{FrameThrottle, ScrollMilestones};
use super::session::SessionState;
use super::time::PageClock;
use crate::config::TrackerConfig;
use crate::env::{PageEnvironment, PageSignal};
use crate::error::TrackerError;
use crate::services::ingest::IngestClient;

/// Everything that can move the tracker forward.
#[derive(Debug)]
pub enum TrackerInput {
    Page(PageSignal),
    Heartbeat,
    FormSubmit {
        form_type: String,
        extra: Map<String, Value>,
    },
    SessionResolved(Result<String, TrackerError>),
}

/// Transmissions requested by a step. Executed by the driver, never by `step`.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Fire-and-forget request.
    Record(TrackedEvent),
    /// Teardown-surviving delivery; the driver waits for it.
    Beacon(TrackedEvent),
}

impl Dispatch {
    pub fn event(&self) -> &TrackedEvent {
        match self {
            Dispatch::Record(event) | Dispatch::Beacon(event) => event,
        }
    }
}

/// Commands reaching the driver from outside the page signal stream.
#[derive(Debug)]
enum Command {
    FormSubmit {
        form_type: String,
        extra: Map<String, Value>,
    },
    SessionResolved(Result<String, TrackerError>),
}

impl Command {
    fn into_input(self) -> TrackerInput {
        match self {
            Command::FormSubmit { form_type, extra } => TrackerInput::FormSubmit { form_type, extra },
            Command::SessionResolved(result) => TrackerInput::SessionResolved(result),
        }
    }
}

/// Telemetry state for one page view.
pub struct Tracker {
    env: Arc<dyn PageEnvironment>,
    consent_key: String,
    clock: PageClock,
    session: SessionState,
    milestones: ScrollMilestones,
    throttle: FrameThrottle,
    heartbeat_every: Duration,
    beacon_timeout: Duration,
    unloaded: bool,
}

impl Tracker {
    /// Builds the state machine. Reads storage, touches nothing else.
    pub fn new(env: Arc<dyn PageEnvironment>, config: &TrackerConfig, loaded_at: Instant) -> Self {
        let session = SessionState::resume(config.session_key.clone(), env.tab_storage());
        Self {
            env,
            consent_key: config.consent_key.clone(),
            clock: PageClock::new(loaded_at),
            session,
            milestones: ScrollMilestones::new(),
            throttle: FrameThrottle::default(),
            heartbeat_every: config.heartbeat_interval,
            beacon_timeout: config.beacon_timeout,
            unloaded: false,
        }
    }

    pub fn consent(&self) -> ConsentState {
        ConsentState::read(self.env.durable_storage(), &self.consent_key)
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.best_known(self.env.tab_storage())
    }

    /// Whether a create-session request is still needed for this tab.
    pub fn needs_session(&self) -> bool {
        self.session.in_memory().is_none()
    }

    pub fn scroll_depths(&self) -> &[u8] {
        self.milestones.reported()
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded
    }

    /// Advance the state machine by one input observed at `now`.
    pub fn step(&mut self, input: TrackerInput, now: Instant) -> Vec<Dispatch> {
        if self.unloaded {
            debug!("Ignoring input after unload: {:?}", input);
            return Vec::new();
        }

        let mut out = Vec::new();
        match input {
            TrackerInput::Page(PageSignal::Scroll) => {
                if self.throttle.request() {
                    self.env.request_animation_frame();
                }
            }
            TrackerInput::Page(PageSignal::AnimationFrame) => {
                if self.throttle.take() {
                    self.check_scroll(&mut out);
                }
            }
            TrackerInput::Page(PageSignal::Click(element)) => {
                let matched = match_click(&element, &self.env.location());
                for data in matched.into_events() {
                    out.extend(self.track(data).map(Dispatch::Record));
                }
            }
            TrackerInput::Page(PageSignal::Unload) => {
                self.unloaded = true;
                let data = EventData::PageLeave {
                    seconds: self.clock.elapsed_secs(now),
                    scroll_depths: self.milestones.reported().to_vec(),
                };
                out.extend(self.track(data).map(Dispatch::Beacon));
            }
            TrackerInput::Heartbeat => {
                let data = EventData::Heartbeat {
                    seconds: self.clock.elapsed_secs(now),
                };
                out.extend(self.track(data).map(Dispatch::Record));
            }
            TrackerInput::FormSubmit { form_type, extra } => {
                let data = EventData::form_submit(form_type, extra);
                out.extend(self.track(data).map(Dispatch::Record));
            }
            TrackerInput::SessionResolved(Ok(id)) => {
                self.session.store(id, self.env.tab_storage());
            }
            TrackerInput::SessionResolved(Err(e)) => {
                warn!("Analytics session not started: {}", e);
            }
        }
        out
    }

    fn check_scroll(&mut self, out: &mut Vec<Dispatch>) {
        let Some(percent) = self.env.scroll_metrics().percent() else {
            return;
        };
        for depth in self.milestones.advance(percent) {
            out.extend(self.track(EventData::ScrollDepth { depth }).map(Dispatch::Record));
        }
    }

    /// Build a report if consent still holds. Checked on every call, never cached.
    fn track(&self, data: EventData) -> Option<TrackedEvent> {
        if !self.consent().is_accepted() {
            debug!("No analytics consent, dropping {}", data.kind());
            return None;
        }
        Some(TrackedEvent::new(data, self.env.path(), self.session_id()))
    }

    /// Driver loop. Owns the tracker until unload or teardown.
    async fn run<C: IngestClient>(
        mut self,
        mut signals: mpsc::UnboundedReceiver<PageSignal>,
        mut commands: mpsc::UnboundedReceiver<Command>,
        client: C,
        cancel: CancellationToken,
    ) {
        let mut heartbeat = interval_at(
            self.clock.loaded_at() + self.heartbeat_every,
            self.heartbeat_every,
        );
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Tracker active on {}", self.env.path());

        loop {
            let input = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Tracker torn down");
                    break;
                }
                signal = signals.recv() => {
                    // A closed stream means the page is gone.
                    TrackerInput::Page(signal.unwrap_or(PageSignal::Unload))
                }
                Some(cmd) = commands.recv() => cmd.into_input(),
                _ = heartbeat.tick() => TrackerInput::Heartbeat,
            };

            for dispatch in self.step(input, Instant::now()) {
                match dispatch {
                    Dispatch::Record(event) => {
                        let kind = event.kind;
                        let request = client.record_event(event);
                        tokio::spawn(async move {
                            if let Err(e) = request.await {
                                warn!("Analytics {} not recorded: {}", kind, e);
                            }
                        });
                    }
                    Dispatch::Beacon(event) => {
                        let kind = event.kind;
                        let delivered = timeout(self.beacon_timeout, client.send_beacon(event))
                            .await
                            .unwrap_or_else(|_| Err(TrackerError::BeaconTimeout(self.beacon_timeout)));
                        if let Err(e) = delivered {
                            warn!("Analytics {} beacon lost: {}", kind, e);
                        }
                    }
                }
            }

            if self.unloaded {
                info!("Tracker finished after unload");
                break;
            }
        }
    }
}

/// Control surface for page code around a running tracker.
pub struct TrackerHandle {
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TrackerHandle {
    /// Report a form submission. Gated on consent like every other report.
    pub fn track_form_submit(&self, form_type: impl Into<String>, extra: Map<String, Value>) {
        let cmd = Command::FormSubmit {
            form_type: form_type.into(),
            extra,
        };
        if self.commands.send(cmd).is_err() {
            debug!("Tracker already stopped, form submission not reported");
        }
    }

    /// Stop the heartbeat and the driver without sending page_leave.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Wait for the driver to exit (after unload or shutdown).
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            warn!("Tracker task ended abnormally: {}", e);
        }
    }
}

/// Page-ready entry point.
///
/// Without consent nothing happens and `None` is returned: no request, no
/// subscription, no timer. Otherwise the session request goes out first and
/// the driver is spawned on the current runtime.
pub fn start<C: IngestClient>(
    env: Arc<dyn PageEnvironment>,
    client: C,
    config: &TrackerConfig,
) -> Option<TrackerHandle> {
    let tracker = Tracker::new(env.clone(), config, Instant::now());
    if !tracker.consent().is_accepted() {
        debug!("Analytics consent not given, tracker stays inert");
        return None;
    }

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    if tracker.needs_session() {
        let request = client.create_session();
        let tx = cmd_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Command::SessionResolved(request.await));
        });
    } else {
        debug!("Reusing tab session {:?}", tracker.session_id());
    }

    let signals = env.subscribe();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(tracker.run(signals, cmd_rx, client, cancel.clone()));

    Some(TrackerHandle {
        commands: cmd_tx,
        cancel,
        task,
    })
}
