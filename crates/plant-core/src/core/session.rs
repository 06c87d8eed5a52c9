//! Telemetry Session
//!
//! Owns the live connection to the device currently on screen and the
//! snapshot of its latest readings.
//!
//! ```text
//! Idle ──open──► Connecting ──ok──► Live ──drop──► Reconnecting{n} ──ok──► Live
//!                    │                                   │
//!                    └──fail──► Reconnecting{1}          └──n > max──► Closed
//! any ──close──► Closed ──open──► Connecting
//! ```
//!
//! A background task drives the connection. Every open bumps a generation
//! counter and the task tags its writes with the generation it was started
//! for, so updates from a previous session never reach the snapshot.

use super::policy::ReconnectPolicy;
use super::transport::{TelemetryStream, TelemetryTransport};
use crate::models::{ServerAddress, TelemetrySnapshot, TelemetryUpdate};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

/// How long `close` waits for the driver to release its connection.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

const EVENT_CAPACITY: usize = 256;

/// Connection state of a telemetry session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Connecting,
    Live,
    Reconnecting { attempt: u32 },
    Closed,
}

/// Notification published to session subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged { state: SessionState },
    Updated { snapshot: TelemetrySnapshot },
    /// Reconnects exhausted; the session is now closed.
    ConnectionFailed { address: String, attempts: u32 },
}

struct Inner {
    generation: u64,
    state: SessionState,
    snapshot: TelemetrySnapshot,
}

struct Shared {
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn change_state(&self, inner: &mut Inner, state: SessionState) {
        if inner.state != state {
            inner.state = state;
            self.publish(SessionEvent::StateChanged { state });
        }
    }

    /// Start a new generation with an empty snapshot.
    fn begin(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.snapshot = TelemetrySnapshot::default();
        self.change_state(&mut inner, SessionState::Connecting);
        inner.generation
    }

    /// Orphan the running driver so none of its writes land.
    fn detach(&self) {
        self.lock().generation += 1;
    }

    fn set_state(&self, generation: u64, state: SessionState) {
        let mut inner = self.lock();
        if inner.generation == generation {
            self.change_state(&mut inner, state);
        }
    }

    fn apply(&self, generation: u64, update: &TelemetryUpdate) {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!("dropping update from a stale session");
            return;
        }
        if inner.snapshot.merge(update) {
            let snapshot = inner.snapshot.clone();
            self.publish(SessionEvent::Updated { snapshot });
        }
    }

    fn fail(&self, generation: u64, address: &ServerAddress, attempts: u32) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        self.publish(SessionEvent::ConnectionFailed {
            address: address.to_string(),
            attempts,
        });
        self.change_state(&mut inner, SessionState::Closed);
    }

    fn mark_closed(&self) {
        let mut inner = self.lock();
        self.change_state(&mut inner, SessionState::Closed);
    }
}

struct ActiveSession {
    address: ServerAddress,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Live telemetry for one device at a time
pub struct TelemetrySession {
    transport: Arc<dyn TelemetryTransport>,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    active: Option<ActiveSession>,
}

impl TelemetrySession {
    pub fn new(transport: Arc<dyn TelemetryTransport>, policy: ReconnectPolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            policy,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    state: SessionState::Idle,
                    snapshot: TelemetrySnapshot::default(),
                }),
                events,
            }),
            active: None,
        }
    }

    /// Start streaming telemetry from `address`.
    ///
    /// Opening the address that is already being streamed does nothing. Any
    /// other open session is closed first. The snapshot starts empty.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open(&mut self, address: ServerAddress) {
        if let Some(active) = &self.active {
            let running = !active.task.is_finished() && self.state() != SessionState::Closed;
            if active.address == address && running {
                tracing::debug!(%address, "telemetry already open");
                return;
            }
        }

        self.close().await;

        let generation = self.shared.begin();
        let (shutdown, shutdown_rx) = oneshot::channel();

        tracing::info!(%address, generation, "opening telemetry session");
        let task = tokio::spawn(drive(
            self.transport.clone(),
            self.policy.clone(),
            self.shared.clone(),
            address.clone(),
            generation,
            shutdown_rx,
        ));

        self.active = Some(ActiveSession {
            address,
            shutdown: Some(shutdown),
            task,
        });
    }

    /// Stop streaming, release the connection and move to `Closed`.
    /// Idempotent, and valid on a session that was never opened.
    ///
    /// No update is applied to the snapshot once this returns.
    pub async fn close(&mut self) {
        let Some(mut active) = self.active.take() else {
            self.shared.mark_closed();
            return;
        };

        self.shared.detach();
        if let Some(shutdown) = active.shutdown.take() {
            let _ = shutdown.send(());
        }
        if tokio::time::timeout(CLOSE_GRACE, &mut active.task).await.is_err() {
            tracing::warn!(address = %active.address, "telemetry driver did not stop, aborting");
            active.task.abort();
            // Wait for the cancelled driver to drop its stream.
            let _ = (&mut active.task).await;
        }

        tracing::info!(address = %active.address, "telemetry session closed");
        self.shared.mark_closed();
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// Copy of the latest readings.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.shared.lock().snapshot.clone()
    }

    /// Address of the open (or last failed) session.
    pub fn address(&self) -> Option<&ServerAddress> {
        self.active.as_ref().map(|active| &active.address)
    }

    /// Whether a driver task is still running.
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .map(|active| !active.task.is_finished())
            .unwrap_or(false)
    }

    /// Fill the stream locator from another source, such as a health check.
    ///
    /// Ignored when no session is open or the last one has failed.
    pub fn seed_stream_locator(&self, locator: &str) -> bool {
        if self.active.is_none() || self.state() == SessionState::Closed || locator.is_empty() {
            return false;
        }
        let generation = self.shared.lock().generation;
        self.shared.apply(generation, &TelemetryUpdate::stream(locator));
        true
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for TelemetrySession {
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            self.shared.detach();
            if let Some(shutdown) = active.shutdown.take() {
                let _ = shutdown.send(());
            }
            active.task.abort();
        }
    }
}

/// Connection loop for one session generation.
async fn drive(
    transport: Arc<dyn TelemetryTransport>,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    address: ServerAddress,
    generation: u64,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut attempt: u32 = 0;

    loop {
        let connected = tokio::select! {
            _ = &mut shutdown => return,
            result = transport.connect(&address) => result,
        };

        match connected {
            Ok(mut stream) => {
                attempt = 0;
                shared.set_state(generation, SessionState::Live);

                if stream_until_end(&mut *stream, &shared, generation, &mut shutdown).await {
                    stream.close().await;
                    return;
                }
                stream.close().await;
                tracing::warn!(%address, "telemetry stream lost");
            }
            Err(e) => {
                tracing::warn!(%address, attempt, error = %e, "telemetry connect failed");
            }
        }

        attempt += 1;
        if !policy.allows(attempt) {
            let attempts = attempt;
            tracing::error!(%address, attempts, "giving up on telemetry");
            shared.fail(generation, &address, attempts);
            return;
        }

        shared.set_state(generation, SessionState::Reconnecting { attempt });
        let delay = policy.delay_for(attempt);
        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Pump updates into the snapshot. Returns `true` when shut down.
async fn stream_until_end(
    stream: &mut dyn TelemetryStream,
    shared: &Shared,
    generation: u64,
    shutdown: &mut oneshot::Receiver<()>,
) -> bool {
    loop {
        tokio::select! {
            _ = &mut *shutdown => return true,
            item = stream.next_update() => match item {
                Some(Ok(update)) => shared.apply(generation, &update),
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "telemetry stream failed");
                    return false;
                }
                None => return false,
            },
        }
    }
}
