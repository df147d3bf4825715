pub mod codec;
pub mod errors;
pub mod frames;
pub mod ids;
pub mod notification;
pub mod retry;
pub mod security;
pub mod state;

pub use errors::{CodecError, DecodeError, TransportError};
pub use frames::{ControlAction, ControlFrame, InboundEvent};
pub use ids::{NotificationId, Topic};
pub use notification::{NotificationRecord, Severity};
pub use retry::ReconnectPolicy;
pub use security::AuthToken;
pub use state::ConnectionState;
