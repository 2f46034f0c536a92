//! Common types shared by channel implementations

pub mod config;
pub mod error;
pub mod event;

pub use config::ClientConfig;
pub use error::{TransportError, TransportResult};
pub use event::{ConnectionEvent, ConnectionState};
