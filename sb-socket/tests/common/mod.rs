//! Shared test utilities for realtime integration tests.
//!
//! `MockTransport` hands every accepted handshake to the test as a
//! `MockPeer`, which plays the backend side of the socket.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc as wire;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use sb_core::error::{SbError, SbResult};
use sb_socket::{
    ClientOptions, CloseInfo, Connection, Endpoint, Event, EventType, Listener, RealtimeClient,
    Transport, Variant, WireMessage,
};

pub const SERVER: &str = "http://localhost:8000";

/// In-memory transport. Handshakes succeed unless refusals are queued.
pub struct MockTransport {
    peers: mpsc::UnboundedSender<MockPeer>,
    refusals: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
}

/// Test-side view of a `MockTransport`.
pub struct MockHandle {
    peers: mpsc::UnboundedReceiver<MockPeer>,
    refusals: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
}

/// Backend end of one accepted connection.
pub struct MockPeer {
    pub url: String,
    to_client: wire::UnboundedSender<SbResult<WireMessage>>,
    from_client: wire::UnboundedReceiver<WireMessage>,
}

pub fn mock_transport() -> (MockTransport, MockHandle) {
    let (peers_tx, peers_rx) = mpsc::unbounded_channel();
    let refusals = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(Mutex::new(Vec::new()));
    (
        MockTransport {
            peers: peers_tx,
            refusals: refusals.clone(),
            calls: calls.clone(),
        },
        MockHandle {
            peers: peers_rx,
            refusals,
            calls,
        },
    )
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> SbResult<Connection> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(SbError::Socket("connection refused".into()));
        }

        let (to_client, client_rx) = wire::unbounded();
        let (client_tx, from_client) = wire::unbounded();
        let _ = self.peers.send(MockPeer {
            url: url.to_string(),
            to_client,
            from_client,
        });

        let sink = client_tx.sink_map_err(|e| SbError::Socket(e.to_string()));
        Ok(Connection::new(Box::pin(sink), Box::pin(client_rx)))
    }
}

impl MockHandle {
    /// Wait for the client's next successful handshake.
    pub async fn next_peer(&mut self) -> MockPeer {
        tokio::time::timeout(Duration::from_secs(600), self.peers.recv())
            .await
            .expect("no connection attempt within timeout")
            .expect("transport dropped")
    }

    /// Refuse the next `n` handshakes.
    pub fn refuse_next(&self, n: usize) {
        self.refusals.store(n, Ordering::SeqCst);
    }

    /// Number of handshakes attempted so far, refused or not.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Instants at which handshakes were attempted.
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

impl MockPeer {
    pub fn send_text(&self, text: &str) {
        self.to_client
            .unbounded_send(Ok(WireMessage::Text(text.to_string())))
            .expect("client stream closed");
    }

    pub fn close(&self, code: u16, reason: &str) {
        let _ = self
            .to_client
            .unbounded_send(Ok(WireMessage::Close(Some(CloseInfo::new(code, reason)))));
    }

    pub fn fail(&self, message: &str) {
        let _ = self
            .to_client
            .unbounded_send(Err(SbError::Socket(message.to_string())));
    }

    /// Next frame the client wrote, waiting briefly for it.
    pub async fn recv(&mut self) -> Option<WireMessage> {
        tokio::time::timeout(Duration::from_secs(5), self.from_client.next())
            .await
            .ok()
            .flatten()
    }

    /// Drain everything the client has written so far.
    pub fn drain(&mut self) -> Vec<WireMessage> {
        let mut out = Vec::new();
        while let Ok(Some(msg)) = self.from_client.try_next() {
            out.push(msg);
        }
        out
    }

    /// Text frames written so far, parsed as JSON.
    pub fn drain_json(&mut self) -> Vec<serde_json::Value> {
        self.drain()
            .into_iter()
            .filter_map(|msg| match msg {
                WireMessage::Text(text) => serde_json::from_str(&text).ok(),
                WireMessage::Close(_) => None,
            })
            .collect()
    }
}

pub fn widget_client(transport: MockTransport, options: ClientOptions) -> RealtimeClient<MockTransport> {
    RealtimeClient::with_transport(Endpoint::new(Variant::Widget, SERVER, None), transport, options)
}

pub fn admin_client(transport: MockTransport, options: ClientOptions) -> RealtimeClient<MockTransport> {
    RealtimeClient::with_transport(Endpoint::new(Variant::Admin, SERVER, None), transport, options)
}

/// Listener that appends every event it sees.
pub fn recorder() -> (Listener, Arc<Mutex<Vec<Event>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let listener: Listener = Arc::new(move |event: &Event| sink.lock().unwrap().push(event.clone()));
    (listener, seen)
}

/// Register a recorder on `client` for `event_type`.
pub fn record(client: &RealtimeClient<MockTransport>, event_type: EventType) -> Arc<Mutex<Vec<Event>>> {
    let (listener, seen) = recorder();
    client.on(event_type, listener);
    seen
}

/// Let spawned tasks run until they are all idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
