//! # ccTalk Core Library
//!
//! Host-side engine for the ccTalk serial protocol spoken by cash-handling
//! peripherals (bill validators, coin acceptors).
//!
//! This library provides:
//! - Packet framing with either of the two ccTalk integrity trailers
//!   (CRC-16/XMODEM or 8-bit additive checksum)
//! - An echo-aware transaction state machine with bounded retries
//! - Decoding of buffered bill event responses into typed events
//! - A background polling engine that reports only counter advances
//!
//! All terminal output and rendering belongs to the caller; the engine
//! returns typed results and raises typed errors.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cctalk_core::protocol::{Session, SessionConfig};
//!
//! let mut session = Session::open("/dev/ttyUSB0", None, SessionConfig::default())?;
//! let reply = session.command(254, &[])?; // simple poll
//! println!("device answered header {}", reply.header);
//! ```

#![warn(missing_docs)]

pub mod events;
pub mod poll;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::events::{BillEvent, EventReport};
    pub use crate::poll::{PollUpdate, PollingEngine};
    pub use crate::protocol::{
        ChecksumMode, Packet, ProtocolError, Session, SessionConfig, TransportConfig,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
