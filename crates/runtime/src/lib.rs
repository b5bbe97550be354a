//! hubrun runtime - hub connection, transport and local hub lifecycle
//!
//! This crate provides the low-level plumbing between the hubrun client and a
//! hub:
//!
//! - **Transport**: JSON text frames over a WebSocket
//! - **Connection**: request/response correlation, agent notifications and
//!   per-batch event streams
//! - **Hub server**: launching and supervising a local hub process
//!
//! ```text
//! ┌─────────────┐
//! │   hubrun    │  Negotiation, waiting, orchestration
//! └──────┬──────┘
//! ┌──────▼──────────┐
//! │ hubrun-runtime  │  This crate
//! │  ┌───────────┐  │
//! │  │ Conn      │  │  Correlation and routing
//! │  └───────────┘  │
//! │  ┌───────────┐  │
//! │  │ Transport │  │  WebSocket frames
//! │  └───────────┘  │
//! │  ┌───────────┐  │
//! │  │ HubServer │  │  Process management
//! │  └───────────┘  │
//! └─────────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod hub_server;
pub mod transport;

pub use connection::{BatchReceiver, HubConnection, NotificationReceiver};
pub use error::{Error, Result};
pub use hub_server::{HubServer, HubServerOptions, ensure_port_available};
pub use transport::{TransportReceiver, TransportSender, WebSocketTransport, normalize_hub_url};
