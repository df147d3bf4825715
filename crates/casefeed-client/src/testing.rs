//! Scripted in-memory transport for tests.
//!
//! Available under `cfg(test)` and the `test-util` feature.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use casefeed_core::{ControlFrame, TransportError};

use crate::transport::{Connection, Transport};

/// What the next `open` call does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    Accept,
    Refuse,
    /// Never completes; exercises the connect timeout.
    Hang,
}

/// One recorded `open` call.
#[derive(Clone, Debug)]
pub struct OpenAttempt {
    pub at: Instant,
    pub url: String,
}

enum Signal {
    Frame(String),
    Fail(TransportError),
    Close,
}

struct MockState {
    script: VecDeque<OpenOutcome>,
    default_outcome: OpenOutcome,
    opens: Vec<OpenAttempt>,
    sent: Vec<String>,
    closes: usize,
    fail_sends: bool,
    next_conn: u64,
    live: Option<(u64, mpsc::UnboundedSender<Signal>)>,
}

/// Cloneable handle; every clone shares the same script and recordings.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Accepts every connection unless scripted otherwise.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                script: VecDeque::new(),
                default_outcome: OpenOutcome::Accept,
                opens: Vec::new(),
                sent: Vec::new(),
                closes: 0,
                fail_sends: false,
                next_conn: 0,
                live: None,
            })),
        }
    }

    /// Queue outcomes for the next `open` calls, in order.
    pub fn script(&self, outcomes: impl IntoIterator<Item = OpenOutcome>) {
        self.state.lock().script.extend(outcomes);
    }

    /// Outcome once the script is exhausted.
    pub fn set_default(&self, outcome: OpenOutcome) {
        self.state.lock().default_outcome = outcome;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    pub fn opens(&self) -> Vec<OpenAttempt> {
        self.state.lock().opens.clone()
    }

    /// Raw outbound text frames, across all connections.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Outbound frames decoded back into control frames.
    pub fn sent_frames(&self) -> Vec<ControlFrame> {
        self.sent()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// Local `close()` calls observed.
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().live.is_some()
    }

    /// Deliver an inbound text frame on the live connection.
    pub fn push_frame(&self, text: impl Into<String>) -> bool {
        self.signal(Signal::Frame(text.into()))
    }

    /// Make the live connection report a transport error.
    pub fn fail_connection(&self, error: TransportError) -> bool {
        self.signal(Signal::Fail(error))
    }

    /// Simulate the server closing the live connection.
    pub fn drop_connection(&self) -> bool {
        let live = self.state.lock().live.take();
        match live {
            Some((_, tx)) => tx.send(Signal::Close).is_ok(),
            None => false,
        }
    }

    fn signal(&self, signal: Signal) -> bool {
        let state = self.state.lock();
        match &state.live {
            Some((_, tx)) => tx.send(signal).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let outcome = {
            let mut state = self.state.lock();
            state.opens.push(OpenAttempt {
                at: Instant::now(),
                url: url.to_string(),
            });
            let fallback = state.default_outcome;
            state.script.pop_front().unwrap_or(fallback)
        };

        match outcome {
            OpenOutcome::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                let id = {
                    let mut state = self.state.lock();
                    state.next_conn += 1;
                    let id = state.next_conn;
                    state.live = Some((id, tx));
                    id
                };
                Ok(Box::new(MockConnection {
                    id,
                    signals: rx,
                    state: Arc::clone(&self.state),
                }))
            }
            OpenOutcome::Refuse => Err(TransportError::ConnectFailed(
                "connection refused (scripted)".into(),
            )),
            OpenOutcome::Hang => std::future::pending().await,
        }
    }
}

struct MockConnection {
    id: u64,
    signals: mpsc::UnboundedReceiver<Signal>,
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn release(&self) {
        let mut state = self.state.lock();
        if state.live.as_ref().is_some_and(|(id, _)| *id == self.id) {
            state.live = None;
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_sends {
            return Err(TransportError::SendFailed("send refused (scripted)".into()));
        }
        state.sent.push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        match self.signals.recv().await {
            Some(Signal::Frame(text)) => Some(Ok(text)),
            Some(Signal::Fail(e)) => Some(Err(e)),
            Some(Signal::Close) | None => None,
        }
    }

    async fn close(&mut self) {
        self.state.lock().closes += 1;
        self.release();
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.release();
    }
}
