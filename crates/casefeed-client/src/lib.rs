//! # casefeed-client
//!
//! Resilient real-time event client: one logical WebSocket connection with a
//! four-state lifecycle, topic subscriptions that survive reconnects, a
//! keepalive ping while connected, and exponential-backoff reconnection.
//!
//! ```no_run
//! # async fn demo() {
//! use casefeed_client::{ClientConfig, EventClient};
//!
//! let client = EventClient::websocket(ClientConfig::default());
//! client.subscribe("cases");
//! client.connect(None);
//! let mut events = client.events();
//! while let Ok(event) = events.recv().await {
//!     println!("{} {}", event.event_type, event.id);
//! }
//! # }
//! ```

pub mod connection;
pub mod keepalive;
pub mod subscriptions;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use connection::{ClientConfig, ClientError, ClientStatus, EventClient};
pub use transport::{Connection, Transport, WsTransport};
