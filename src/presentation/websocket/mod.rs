//! WebSocket Gateway
//!
//! Real-time fan-out: per-connection sessions, the presence registry, the
//! broadcast dispatcher, chat delivery and presence announcements.

pub mod announcer;
pub mod connection;
pub mod delivery;
pub mod dispatcher;
pub mod gateway;
pub mod handler;
pub mod messages;
pub mod presence;
pub mod session;

pub use connection::{ChannelConnection, Connection, ConnectionError, WsConnection};
pub use dispatcher::{BroadcastJob, Dispatcher};
pub use gateway::{Delivery, FanOut, Gateway, GatewayStats};
pub use handler::ws_handler;
pub use messages::{ConnectionStatusMessage, InboundMessage, OutboundFrame, PresenceChange};
pub use presence::{PresenceRegistry, Removal};
pub use session::{run_session, SessionOutcome, SessionPhase, SessionState};
