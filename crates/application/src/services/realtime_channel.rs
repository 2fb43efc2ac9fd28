//! Realtime push channel
//!
//! A supervisor task owns the connection lifecycle:
//! `Disconnected -> Connecting -> Connected -> Disconnected`. Failed connects
//! are retried with exponential backoff until `max_attempts` consecutive
//! failures, after which the channel gives up for good and reports it once.
//!
//! Frames sent while disconnected are queued and flushed in order as soon as
//! a connection is up. The queue is bounded; when full the oldest frame goes. Inbound frames are dispatched to handlers registered
//! for their type; frames nobody listens for are dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use domain::{GeoLocation, PlaceResult, PlaceSource, SearchFilters};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::simulated_results::SimulatedResults;
use crate::ports::{ChannelConnection, ChannelFrame, ChannelTransport};

/// Outbound search request frame type
pub const SEARCH_REQUEST: &str = "search_request";

/// Inbound search response frame type
pub const SEARCH_RESULTS: &str = "search_results";

/// Realtime channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket endpoint; the channel stays offline when unset
    #[serde(default)]
    pub url: Option<String>,

    /// Delay before the first reconnect in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for a single reconnect delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Consecutive failed connects before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How long `search` waits for a `search_results` frame
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Artificial delay of the simulated fallback
    #[serde(default = "default_simulation_delay_ms")]
    pub simulation_delay_ms: u64,

    /// Frames kept while disconnected
    #[serde(default = "default_max_queued_frames")]
    pub max_queued_frames: usize,
}

const fn default_base_delay_ms() -> u64 {
    1000
}

const fn default_max_delay_ms() -> u64 {
    30_000
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_response_timeout_ms() -> u64 {
    3000
}

const fn default_simulation_delay_ms() -> u64 {
    500
}

const fn default_max_queued_frames() -> usize {
    256
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: None,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            response_timeout_ms: default_response_timeout_ms(),
            simulation_delay_ms: default_simulation_delay_ms(),
            max_queued_frames: default_max_queued_frames(),
        }
    }
}

impl RealtimeConfig {
    /// Fast backoff and no artificial simulation delay
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            url: None,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            response_timeout_ms: 200,
            simulation_delay_ms: 0,
            ..Self::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".to_string());
        }
        if self.base_delay_ms == 0 {
            return Err("base_delay_ms must be greater than 0".to_string());
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err("max_delay_ms must not be below base_delay_ms".to_string());
        }
        if self.max_queued_frames == 0 {
            return Err("max_queued_frames must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Backoff before reconnect attempt `attempt` (0-based): `base * 2^attempt`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.min(32));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    #[must_use]
    pub const fn simulation_delay(&self) -> Duration {
        Duration::from_millis(self.simulation_delay_ms)
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    /// A reconnect is due after `delay`
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Terminal: no further attempts will be made
    ReconnectExhausted { attempts: u32 },
}

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Default)]
struct Outbound {
    queue: VecDeque<ChannelFrame>,
    live: Option<mpsc::UnboundedSender<ChannelFrame>>,
}

impl Outbound {
    /// Drop the oldest frames beyond `limit`
    fn trim(&mut self, limit: usize) {
        let excess = self.queue.len().saturating_sub(limit);
        if excess > 0 {
            self.queue.drain(..excess);
            warn!(dropped = excess, "Realtime queue full, dropped oldest frames");
        }
    }
}

struct Shared {
    transport: Arc<dyn ChannelTransport>,
    config: RealtimeConfig,
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Outbound>,
    handlers: RwLock<HashMap<String, Vec<Handler>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
    events: broadcast::Sender<ChannelEvent>,
    exhausted: AtomicBool,
    connect_attempts: AtomicU32,
    request_seq: AtomicU64,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        self.state.send_replace(next);
    }

    fn emit(&self, event: ChannelEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn enqueue(&self, frame: ChannelFrame) {
        let mut outbound = self.outbound.lock();
        let frame = match outbound.live.as_ref() {
            Some(tx) => match tx.send(frame) {
                Ok(()) => return,
                Err(mpsc::error::SendError(frame)) => frame,
            },
            None => frame,
        };
        outbound.live = None;
        outbound.queue.push_back(frame);
        outbound.trim(self.config.max_queued_frames);
    }

    /// Remove a search request nobody waits for anymore
    fn forget_request(&self, request_id: &str) {
        self.outbound.lock().queue.retain(|frame| {
            frame.kind != SEARCH_REQUEST
                || frame.payload.get("request_id").and_then(Value::as_str) != Some(request_id)
        });
    }

    fn detach(&self) {
        self.outbound.lock().live = None;
    }

    fn dispatch(&self, frame: &ChannelFrame) {
        if frame.kind == SEARCH_RESULTS {
            let waiter = frame
                .payload
                .get("request_id")
                .and_then(Value::as_str)
                .and_then(|id| self.pending.lock().remove(id));
            if let Some(waiter) = waiter {
                let _ = waiter.send(frame.payload.clone());
            }
        }

        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(&frame.kind)
            .cloned()
            .unwrap_or_default();
        if handlers.is_empty() {
            debug!(kind = %frame.kind, "No handler for frame");
        }
        for handler in handlers {
            handler(&frame.payload);
        }
    }

    async fn supervise(self: Arc<Self>) {
        let mut failures: u32 = 0;
        loop {
            self.set_state(ConnectionState::Connecting);
            let attempt = self.connect_attempts.fetch_add(1, Ordering::SeqCst) + 1;

            match self.transport.connect().await {
                Ok(connection) => {
                    failures = 0;
                    self.run_connection(connection).await;
                },
                Err(error) => {
                    failures += 1;
                    self.set_state(ConnectionState::Disconnected);
                    warn!(attempt, failures, %error, "Realtime connect failed");
                    if failures >= self.config.max_attempts {
                        self.exhausted.store(true, Ordering::SeqCst);
                        warn!(failures, "Realtime reconnect attempts exhausted");
                        self.emit(ChannelEvent::ReconnectExhausted { attempts: failures });
                        return;
                    }
                },
            }

            let delay = self.config.delay_for_attempt(failures.saturating_sub(1));
            debug!(?delay, failures, "Scheduling realtime reconnect");
            self.emit(ChannelEvent::ReconnectScheduled {
                attempt: failures + 1,
                delay,
            });
            tokio::time::sleep(delay).await;
        }
    }

    async fn run_connection(&self, connection: ChannelConnection) {
        let ChannelConnection {
            mut sender,
            mut receiver,
        } = connection;
        let (tx, mut rx) = mpsc::unbounded_channel();

        {
            let mut outbound = self.outbound.lock();
            let flushed = outbound.queue.len();
            for frame in outbound.queue.drain(..) {
                let _ = tx.send(frame);
            }
            outbound.live = Some(tx);
            debug!(flushed, "Flushed queued realtime frames");
        }

        self.set_state(ConnectionState::Connected);
        self.emit(ChannelEvent::Connected);
        info!("Realtime channel connected");

        let mut unsent = Vec::new();
        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    let Some(frame) = outgoing else { break };
                    if let Err(error) = sender.send(frame.clone()).await {
                        warn!(%error, "Realtime send failed");
                        unsent.push(frame);
                        break;
                    }
                },
                incoming = receiver.recv() => match incoming {
                    Some(Ok(frame)) => self.dispatch(&frame),
                    Some(Err(error)) => warn!(%error, "Dropping malformed realtime frame"),
                    None => break,
                },
            }
        }

        {
            let mut outbound = self.outbound.lock();
            outbound.live = None;
            while let Ok(frame) = rx.try_recv() {
                unsent.push(frame);
            }
            for frame in unsent.into_iter().rev() {
                outbound.queue.push_front(frame);
            }
            outbound.trim(self.config.max_queued_frames);
        }

        sender.close().await;
        self.set_state(ConnectionState::Disconnected);
        self.emit(ChannelEvent::Disconnected);
        info!("Realtime channel closed");
    }
}

/// Push channel with reconnect and simulated fallback
pub struct RealtimeChannel {
    shared: Arc<Shared>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    simulator: SimulatedResults,
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("state", &self.state())
            .field("exhausted", &self.is_exhausted())
            .field("queued", &self.queued_len())
            .finish_non_exhaustive()
    }
}

impl RealtimeChannel {
    pub fn new(transport: Arc<dyn ChannelTransport>, config: RealtimeConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(64);
        let simulator = SimulatedResults::new(config.simulation_delay());
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                state,
                outbound: Mutex::new(Outbound::default()),
                handlers: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                events,
                exhausted: AtomicBool::new(false),
                connect_attempts: AtomicU32::new(0),
                request_seq: AtomicU64::new(0),
            }),
            supervisor: Mutex::new(None),
            simulator,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.shared.events.subscribe()
    }

    /// True once reconnects were given up
    pub fn is_exhausted(&self) -> bool {
        self.shared.exhausted.load(Ordering::SeqCst)
    }

    /// Connection attempts made so far
    pub fn connect_attempts(&self) -> u32 {
        self.shared.connect_attempts.load(Ordering::SeqCst)
    }

    /// Frames waiting for a connection
    pub fn queued_len(&self) -> usize {
        self.shared.outbound.lock().queue.len()
    }

    /// Start the connection supervisor
    ///
    /// No-op while a supervisor is already running. Calling it after the
    /// attempts were exhausted starts a fresh series.
    pub fn connect(&self) {
        let mut supervisor = self.supervisor.lock();
        if supervisor.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        self.shared.exhausted.store(false, Ordering::SeqCst);
        *supervisor = Some(tokio::spawn(Arc::clone(&self.shared).supervise()));
    }

    /// Stop the supervisor, cancelling any pending reconnect
    pub fn disconnect(&self) {
        if let Some(handle) = self.supervisor.lock().take() {
            handle.abort();
        }
        self.shared.detach();
        let was_connected = self.state() == ConnectionState::Connected;
        self.shared.set_state(ConnectionState::Disconnected);
        if was_connected {
            self.shared.emit(ChannelEvent::Disconnected);
        }
    }

    /// Whether a supervisor task is alive
    pub fn is_supervising(&self) -> bool {
        self.supervisor
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Send a frame now, or queue it until connected
    pub fn send(&self, frame: ChannelFrame) {
        self.shared.enqueue(frame);
    }

    /// Register a handler for a frame type
    pub fn on<F>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.shared
            .handlers
            .write()
            .entry(kind.into())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Search over the channel, or locally simulated when it is not connected
    #[instrument(skip(self, filters))]
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        origin: GeoLocation,
    ) -> Vec<PlaceResult> {
        if self.state() == ConnectionState::Connected {
            if let Some(results) = self.remote_search(query, filters, &origin).await {
                return results;
            }
        }
        debug!("Realtime channel unavailable, using simulated results");
        self.simulator.search(query, filters, &origin).await
    }

    async fn remote_search(
        &self,
        query: &str,
        filters: &SearchFilters,
        origin: &GeoLocation,
    ) -> Option<Vec<PlaceResult>> {
        let seq = self.shared.request_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let request_id = format!("req-{seq}");
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(request_id.clone(), tx);

        self.send(ChannelFrame::new(
            SEARCH_REQUEST,
            json!({
                "request_id": request_id,
                "query": query,
                "filters": filters,
                "origin": origin,
            }),
        ));

        let response = tokio::time::timeout(self.shared.config.response_timeout(), rx).await;
        self.shared.pending.lock().remove(&request_id);
        self.shared.forget_request(&request_id);

        let Ok(Ok(payload)) = response else {
            warn!(%request_id, "Realtime search got no answer");
            return None;
        };
        let results = payload.get("results").cloned().unwrap_or_default();
        match serde_json::from_value::<Vec<PlaceResult>>(results) {
            Ok(results) => Some(
                results
                    .into_iter()
                    .map(|r| r.with_source(PlaceSource::Realtime))
                    .collect(),
            ),
            Err(error) => {
                warn!(%error, "Malformed realtime search results");
                None
            },
        }
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.supervisor.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;
    use crate::ports::{FrameReceiver, FrameSender};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct PipeSender(mpsc::UnboundedSender<ChannelFrame>);

    #[async_trait]
    impl FrameSender for PipeSender {
        async fn send(&mut self, frame: ChannelFrame) -> Result<(), ChannelError> {
            self.0.send(frame).map_err(|_| ChannelError::Closed)
        }

        async fn close(&mut self) {}
    }

    struct PipeReceiver(mpsc::UnboundedReceiver<Result<ChannelFrame, ChannelError>>);

    #[async_trait]
    impl FrameReceiver for PipeReceiver {
        async fn recv(&mut self) -> Option<Result<ChannelFrame, ChannelError>> {
            self.0.recv().await
        }
    }

    /// Server side of an in-memory connection
    struct ServerEnd {
        from_client: mpsc::UnboundedReceiver<ChannelFrame>,
        to_client: mpsc::UnboundedSender<Result<ChannelFrame, ChannelError>>,
    }

    fn pipe() -> (ChannelConnection, ServerEnd) {
        let (client_tx, from_client) = mpsc::unbounded_channel();
        let (to_client, client_rx) = mpsc::unbounded_channel();
        (
            ChannelConnection {
                sender: Box::new(PipeSender(client_tx)),
                receiver: Box::new(PipeReceiver(client_rx)),
            },
            ServerEnd {
                from_client,
                to_client,
            },
        )
    }

    /// Hands out prepared connections, then refuses
    #[derive(Default)]
    struct ScriptedTransport {
        connections: Mutex<VecDeque<ChannelConnection>>,
        calls: AtomicUsize,
    }

    impl std::fmt::Debug for ScriptedTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ScriptedTransport").finish_non_exhaustive()
        }
    }

    impl ScriptedTransport {
        fn with_connections(count: usize) -> (Arc<Self>, Vec<ServerEnd>) {
            let transport = Self::default();
            let mut servers = Vec::new();
            for _ in 0..count {
                let (connection, server) = pipe();
                transport.connections.lock().push_back(connection);
                servers.push(server);
            }
            (Arc::new(transport), servers)
        }
    }

    #[async_trait]
    impl ChannelTransport for ScriptedTransport {
        async fn connect(&self) -> Result<ChannelConnection, ChannelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.connections
                .lock()
                .pop_front()
                .ok_or_else(|| ChannelError::ConnectFailed("refused".to_string()))
        }
    }

    fn config() -> RealtimeConfig {
        RealtimeConfig {
            base_delay_ms: 100,
            ..Default::default()
        }
    }

    async fn wait_for_state(channel: &RealtimeChannel, wanted: ConnectionState) {
        let mut state = channel.watch_state();
        state.wait_for(|s| *s == wanted).await.unwrap();
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RealtimeConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(8000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(30_000));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_millis(30_000));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_five_failures_and_simulates() {
        let (transport, _) = ScriptedTransport::with_connections(0);
        let channel = RealtimeChannel::new(Arc::clone(&transport) as _, config());
        let mut events = channel.events();

        channel.connect();
        loop {
            if let ChannelEvent::ReconnectExhausted { attempts } = events.recv().await.unwrap() {
                assert_eq!(attempts, 5);
                break;
            }
        }

        assert_eq!(channel.state(), ConnectionState::Disconnected);
        assert!(channel.is_exhausted());
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 5);
        assert_eq!(channel.connect_attempts(), 5);

        let results = channel
            .search("pizza", &SearchFilters::default(), GeoLocation::paris())
            .await;
        assert!(!results.is_empty());
        assert!(results.iter().all(PlaceResult::is_simulated));
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_delays_grow_exponentially() {
        let (transport, _) = ScriptedTransport::with_connections(0);
        let channel = RealtimeChannel::new(transport, config());
        let mut events = channel.events();
        channel.connect();

        let mut delays = Vec::new();
        while let Ok(event) = events.recv().await {
            match event {
                ChannelEvent::ReconnectScheduled { delay, .. } => delays.push(delay),
                ChannelEvent::ReconnectExhausted { .. } => break,
                _ => {},
            }
        }
        let millis: Vec<u128> = delays.iter().map(Duration::as_millis).collect();
        assert_eq!(millis, vec![100, 200, 400, 800]);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_frames_flush_in_order_on_connect() {
        let (transport, mut servers) = ScriptedTransport::with_connections(1);
        let channel = RealtimeChannel::new(transport, config());

        channel.send(ChannelFrame::new("a", Value::Null));
        channel.send(ChannelFrame::new("b", Value::Null));
        assert_eq!(channel.queued_len(), 2);

        channel.connect();
        wait_for_state(&channel, ConnectionState::Connected).await;
        channel.send(ChannelFrame::new("c", Value::Null));

        let server = &mut servers[0];
        let mut kinds = Vec::new();
        for _ in 0..3 {
            kinds.push(server.from_client.recv().await.unwrap().kind);
        }
        assert_eq!(kinds, vec!["a", "b", "c"]);
        assert_eq!(channel.queued_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_drops_oldest_frames() {
        let (transport, mut servers) = ScriptedTransport::with_connections(1);
        let channel = RealtimeChannel::new(
            transport,
            RealtimeConfig {
                max_queued_frames: 2,
                ..config()
            },
        );

        for kind in ["a", "b", "c"] {
            channel.send(ChannelFrame::new(kind, Value::Null));
        }
        assert_eq!(channel.queued_len(), 2);

        channel.connect();
        wait_for_state(&channel, ConnectionState::Connected).await;
        let server = &mut servers[0];
        assert_eq!(server.from_client.recv().await.unwrap().kind, "b");
        assert_eq!(server.from_client.recv().await.unwrap().kind, "c");
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_search_is_not_replayed() {
        let (transport, mut servers) = ScriptedTransport::with_connections(1);
        let channel = RealtimeChannel::new(transport, config());
        channel.connect();
        wait_for_state(&channel, ConnectionState::Connected).await;

        // The server stops reading, so the request bounces back into the queue
        let server = servers.remove(0);
        drop(server.from_client);
        channel.send(ChannelFrame::new("note", Value::Null));

        let results = channel
            .search("pizza", &SearchFilters::default(), GeoLocation::paris())
            .await;

        assert!(results.iter().all(PlaceResult::is_simulated));
        let queued = channel.shared.outbound.lock().queue.clone();
        assert!(queued.iter().all(|frame| frame.kind != SEARCH_REQUEST));
        assert!(queued.iter().any(|frame| frame.kind == "note"));
        drop(server.to_client);
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_by_type_and_ignores_unknown_and_malformed() {
        let (transport, servers) = ScriptedTransport::with_connections(1);
        let channel = RealtimeChannel::new(transport, config());
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        channel.on("results_update", move |payload| {
            let _ = seen_tx.send(payload.clone());
        });

        channel.connect();
        wait_for_state(&channel, ConnectionState::Connected).await;

        let server = &servers[0];
        server
            .to_client
            .send(Ok(ChannelFrame::new("nobody_listens", json!({}))))
            .unwrap();
        server
            .to_client
            .send(Err(ChannelError::Protocol("not json".to_string())))
            .unwrap();
        server
            .to_client
            .send(Ok(ChannelFrame::new("results_update", json!({"n": 1}))))
            .unwrap();

        assert_eq!(seen_rx.recv().await.unwrap(), json!({"n": 1}));
        assert_eq!(channel.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn remote_search_uses_channel_when_connected() {
        let (transport, mut servers) = ScriptedTransport::with_connections(1);
        let channel = RealtimeChannel::new(transport, config());
        channel.connect();
        wait_for_state(&channel, ConnectionState::Connected).await;

        let mut server = servers.remove(0);
        tokio::spawn(async move {
            let request = server.from_client.recv().await.unwrap();
            assert_eq!(request.kind, SEARCH_REQUEST);
            let id = request.payload["request_id"].clone();
            let place = PlaceResult::new(
                "rt-1",
                "Live Place",
                GeoLocation::paris(),
                "restaurants",
                PlaceSource::Primary,
            );
            let reply = ChannelFrame::new(SEARCH_RESULTS, json!({"request_id": id, "results": [place]}));
            server.to_client.send(Ok(reply)).unwrap();
            // keep the connection open
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        let results = channel
            .search("live", &SearchFilters::default(), GeoLocation::paris())
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, PlaceSource::Realtime);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_remote_search_falls_back_to_simulation() {
        let (transport, _servers) = ScriptedTransport::with_connections(1);
        let channel = RealtimeChannel::new(transport, config());
        channel.connect();
        wait_for_state(&channel, ConnectionState::Connected).await;

        let results = channel
            .search("quiet", &SearchFilters::default(), GeoLocation::paris())
            .await;
        assert!(results.iter().all(PlaceResult::is_simulated));
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let (transport, _) = ScriptedTransport::with_connections(0);
        let channel = RealtimeChannel::new(Arc::clone(&transport) as _, config());
        let mut events = channel.events();
        channel.connect();

        loop {
            if matches!(events.recv().await.unwrap(), ChannelEvent::ReconnectScheduled { .. }) {
                break;
            }
        }
        channel.disconnect();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(!channel.is_supervising());
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_server_close() {
        let (transport, mut servers) = ScriptedTransport::with_connections(2);
        let channel = RealtimeChannel::new(Arc::clone(&transport) as _, config());
        let mut events = channel.events();
        channel.connect();
        wait_for_state(&channel, ConnectionState::Connected).await;

        // Closing the server's sending side ends the client's receive stream
        drop(servers.remove(0));

        let mut connected = 0;
        while connected < 2 {
            if events.recv().await.unwrap() == ChannelEvent::Connected {
                connected += 1;
            }
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(channel.state(), ConnectionState::Connected);
    }

    #[test]
    fn config_validation() {
        assert!(RealtimeConfig::default().validate().is_ok());
        assert!(RealtimeConfig::for_testing().validate().is_ok());
        let inverted = RealtimeConfig {
            base_delay_ms: 5_000,
            max_delay_ms: 1_000,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
        let no_queue = RealtimeConfig {
            max_queued_frames: 0,
            ..Default::default()
        };
        assert!(no_queue.validate().is_err());
    }
}
