// ── Watch session ──
//
// Owns one streaming connection to the controller's event feed: connect,
// read, decode, invalidate, and on failure back off and reconnect. Every
// start/stop bumps a generation under the gate's write lock; the worker
// re-checks its generation under the read lock before each state change
// and each dispatch batch, so nothing from a superseded worker is
// observable once `stop()` returns.

mod state;

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;

use ferrywatch_api::Transport;

use crate::backoff::{Backoff, ReconnectConfig};
use crate::cache::Invalidator;
use crate::decode::Decoder;
use crate::error::SessionError;
use crate::invalidation::InvalidationMapper;
use crate::model::Notification;
use crate::relations::RelationTable;
use crate::scope::SubscriptionScope;

use self::state::Counters;
pub use self::state::{SessionState, SessionStats};

const NOTIFICATION_CHANNEL_SIZE: usize = 256;

// ── SessionConfig ────────────────────────────────────────────────────

/// Everything a session needs besides its transport and cache.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Event feed URL without scope parameters, e.g.
    /// `ws://controller:8080/v1/resources/events`.
    pub endpoint: Url,
    pub reconnect: ReconnectConfig,
    pub relations: RelationTable,
}

impl SessionConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            reconnect: ReconnectConfig::default(),
            relations: RelationTable::standard(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_relations(mut self, relations: RelationTable) -> Self {
        self.relations = relations;
        self
    }
}

// ── Gate ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

struct Gate {
    generation: u64,
    lifecycle: Lifecycle,
    scope: Option<SubscriptionScope>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    gate: RwLock<Gate>,
    state: watch::Sender<SessionState>,
    connected: watch::Sender<bool>,
    notify_tx: broadcast::Sender<Arc<Notification>>,
    counters: Counters,
    decoder: Decoder,
    mapper: InvalidationMapper,
    cache: Arc<dyn Invalidator>,
}

impl Shared {
    fn read_gate(&self) -> RwLockReadGuard<'_, Gate> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_gate(&self) -> RwLockWriteGuard<'_, Gate> {
        self.gate.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Callers hold the gate (read or write).
    fn publish(&self, state: SessionState) {
        self.state.send_replace(state);
        let open = state.is_open();
        self.connected.send_if_modified(|connected| {
            let changed = *connected != open;
            *connected = open;
            changed
        });
    }

    /// Publish `state` unless `generation` has been superseded.
    fn transition(&self, generation: u64, state: SessionState) -> bool {
        let gate = self.read_gate();
        if gate.generation != generation {
            return false;
        }
        self.publish(state);
        true
    }

    /// Reconnect budget spent: close for good.
    fn give_up(&self, generation: u64) {
        let mut gate = self.write_gate();
        if gate.generation != generation {
            return;
        }
        gate.generation = gate.generation.wrapping_add(1);
        gate.lifecycle = Lifecycle::Stopped;
        gate.cancel = None;
        // Detach rather than abort: this runs on the task itself.
        gate.task = None;
        self.publish(SessionState::Closed);
    }
}

// ── WatchSession ─────────────────────────────────────────────────────

/// A live subscription to the controller's resource event feed.
///
/// Each decoded notification is mapped to cache keys and pushed into the
/// [`Invalidator`]. A session is started once; after [`stop`](Self::stop)
/// (or after exhausting its reconnect budget) open a new one. Dropping the
/// session stops it.
pub struct WatchSession<T: Transport> {
    shared: Arc<Shared>,
    transport: Arc<T>,
    endpoint: Url,
    reconnect: ReconnectConfig,
}

impl<T: Transport> WatchSession<T> {
    pub fn new(config: SessionConfig, transport: T, cache: Arc<dyn Invalidator>) -> Self {
        let relations = Arc::new(config.relations);
        let (state, _) = watch::channel(SessionState::Closed);
        let (connected, _) = watch::channel(false);
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);

        Self {
            shared: Arc::new(Shared {
                gate: RwLock::new(Gate {
                    generation: 0,
                    lifecycle: Lifecycle::Idle,
                    scope: None,
                    cancel: None,
                    task: None,
                }),
                state,
                connected,
                notify_tx,
                counters: Counters::default(),
                decoder: Decoder::new(Arc::clone(&relations)),
                mapper: InvalidationMapper::new(relations),
                cache,
            }),
            transport: Arc::new(transport),
            endpoint: config.endpoint,
            reconnect: config.reconnect,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn relations(&self) -> &RelationTable {
        self.shared.mapper.relations()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the connection task on the current tokio runtime.
    ///
    /// Returns as soon as the task is spawned; connection failures show up
    /// on [`state`](Self::state) and [`connected`](Self::connected).
    pub fn start(&self, scope: SubscriptionScope) -> Result<(), SessionError> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        if !matches!(self.endpoint.scheme(), "ws" | "wss" | "http" | "https") {
            return Err(SessionError::InvalidEndpoint {
                url: self.endpoint.to_string(),
            });
        }

        let mut gate = self.shared.write_gate();
        match gate.lifecycle {
            Lifecycle::Idle => {}
            Lifecycle::Running => return Err(SessionError::AlreadyStarted),
            Lifecycle::Stopped => return Err(SessionError::StartAfterStop),
        }

        gate.generation = gate.generation.wrapping_add(1);
        let generation = gate.generation;
        let cancel = CancellationToken::new();
        let url = scope.to_url(&self.endpoint);

        info!(url = %url, generation, "starting watch session");
        self.shared.publish(SessionState::Connecting { attempt: 0 });

        let worker = Worker {
            shared: Arc::clone(&self.shared),
            transport: Arc::clone(&self.transport),
            url,
            scope: scope.clone(),
            backoff: Backoff::new(self.reconnect.clone()),
            generation,
        };
        let span = info_span!("watch_session", generation);
        gate.task = Some(runtime.spawn(worker.run(cancel.clone()).instrument(span)));
        gate.lifecycle = Lifecycle::Running;
        gate.scope = Some(scope);
        gate.cancel = Some(cancel);
        Ok(())
    }

    /// Close the session from any state. Idempotent.
    ///
    /// Cancels an in-flight connect or pending backoff timer and releases
    /// the transport. A session that was never started can no longer be.
    ///
    /// Must not be called from inside [`Invalidator::invalidate`] on this
    /// session's cache: dispatch holds the gate while invalidating.
    pub fn stop(&self) {
        let mut gate = self.shared.write_gate();
        if gate.lifecycle == Lifecycle::Stopped {
            return;
        }
        let was_running = gate.lifecycle == Lifecycle::Running;

        gate.generation = gate.generation.wrapping_add(1);
        gate.lifecycle = Lifecycle::Stopped;
        if let Some(cancel) = gate.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = gate.task.take() {
            task.abort();
        }
        self.shared.publish(SessionState::Closed);
        drop(gate);

        if was_running {
            info!("watch session stopped");
        }
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn current_state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// `true` exactly while the session is [`Open`](SessionState::Open).
    pub fn connected(&self) -> watch::Receiver<bool> {
        self.shared.connected.subscribe()
    }

    /// Decoded notifications, after their keys have been invalidated.
    ///
    /// Slow consumers receive [`broadcast::error::RecvError::Lagged`].
    pub fn notifications(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.shared.notify_tx.subscribe()
    }

    pub fn stats(&self) -> SessionStats {
        self.shared.counters.snapshot()
    }

    /// The scope the session was started with.
    pub fn scope(&self) -> Option<SubscriptionScope> {
        self.shared.read_gate().scope.clone()
    }
}

impl<T: Transport> Drop for WatchSession<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Connection task ──────────────────────────────────────────────────

/// How a single connection ended.
enum Disconnect {
    /// Server closed the stream.
    Closed,
    Failed(ferrywatch_api::Error),
    /// A newer start/stop took over.
    Superseded,
}

struct Worker<T> {
    shared: Arc<Shared>,
    transport: Arc<T>,
    url: Url,
    scope: SubscriptionScope,
    backoff: Backoff,
    generation: u64,
}

impl<T: Transport> Worker<T> {
    /// Main loop: connect → read → on drop, backoff → reconnect.
    async fn run(mut self, cancel: CancellationToken) {
        loop {
            let disconnect = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                disconnect = self.connect_and_read() => disconnect,
            };

            match disconnect {
                Disconnect::Superseded => break,
                Disconnect::Closed => info!("event stream closed by server"),
                Disconnect::Failed(e) => {
                    warn!(error = %e, attempt = self.backoff.attempt(), "event stream error");
                }
            }

            let Some(delay) = self.backoff.next_delay() else {
                error!(
                    max_retries = self.backoff.attempt(),
                    "event stream reconnection limit reached, giving up"
                );
                self.shared.give_up(self.generation);
                break;
            };

            let attempt = self.backoff.attempt();
            if !self
                .shared
                .transition(self.generation, SessionState::Connecting { attempt })
            {
                break;
            }
            Counters::bump(&self.shared.counters.reconnects);
            info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before reconnect"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        debug!("watch loop exiting");
    }

    /// One connection: open, then read frames until it drops.
    async fn connect_and_read(&mut self) -> Disconnect {
        debug!(url = %self.url, "connecting to event stream");

        let mut frames = match self.transport.connect(&self.url).await {
            Ok(frames) => frames,
            Err(e) => return Disconnect::Failed(e),
        };

        if !self.shared.transition(self.generation, SessionState::Open) {
            return Disconnect::Superseded;
        }
        self.backoff.reset();
        info!("event stream connected");

        loop {
            match frames.next().await {
                Some(Ok(frame)) => {
                    if !self.handle_frame(&frame) {
                        return Disconnect::Superseded;
                    }
                }
                Some(Err(e)) => return Disconnect::Failed(e),
                None => return Disconnect::Closed,
            }
        }
    }

    /// Decode, filter, dispatch. `false` once superseded.
    fn handle_frame(&self, frame: &[u8]) -> bool {
        let counters = &self.shared.counters;
        Counters::bump(&counters.frames_received);

        let notification = match self.shared.decoder.decode(frame) {
            Ok(notification) => notification,
            Err(e) => {
                Counters::bump(&counters.frames_dropped);
                warn!(error = %e, "dropping event frame");
                return true;
            }
        };

        if !self.scope.matches(&notification) {
            Counters::bump(&counters.frames_dropped);
            debug!(
                action = %notification.action,
                kind = %notification.resource.kind,
                id = %notification.resource.id,
                "event outside subscription scope"
            );
            return true;
        }

        self.dispatch(notification)
    }

    fn dispatch(&self, notification: Notification) -> bool {
        let keys = self.shared.mapper.keys_for(&notification);
        let counters = &self.shared.counters;

        let gate = self.shared.read_gate();
        if gate.generation != self.generation {
            return false;
        }

        debug!(
            action = %notification.action,
            kind = %notification.resource.kind,
            id = %notification.resource.id,
            keys = keys.len(),
            "dispatching notification"
        );
        for key in &keys {
            match self.shared.cache.invalidate(key) {
                Ok(()) => Counters::bump(&counters.keys_invalidated),
                Err(e) => {
                    Counters::bump(&counters.invalidate_failures);
                    warn!(key = %key, error = %e, "cache invalidation failed");
                }
            }
        }
        Counters::bump(&counters.notifications_dispatched);

        // No subscribers is fine.
        let _ = self.shared.notify_tx.send(Arc::new(notification));
        drop(gate);
        true
    }
}
