//! ccTalk Serial Protocol
//!
//! Implements host-side ccTalk framing and the request/response exchange.
//!
//! Every byte the host transmits comes back on the shared line before the
//! addressed device answers, so the transaction layer strips and checks
//! the echo before it starts collecting the real reply.

pub mod checksum;
pub mod commands;
mod error;
mod packet;
pub mod serial;
mod session;
mod transport;

pub use checksum::ChecksumMode;
pub use error::ProtocolError;
pub use packet::{build_request, parse_response, Packet};
pub use serial::{list_ports, PortInfo, SerialLink, SerialPortLink};
pub use session::{Session, SessionConfig};
pub use transport::{Transport, TransportConfig};

/// Address of the host on the ccTalk bus
pub const HOST_ADDRESS: u8 = 1;

/// Conventional bus address of a bill validator
pub const BILL_VALIDATOR_ADDRESS: u8 = 40;

/// Conventional bus address of a coin acceptor
pub const COIN_ACCEPTOR_ADDRESS: u8 = 2;

/// Baud rate mandated by the ccTalk specification
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default inter-byte silence allowed while the line echo is read back
pub const DEFAULT_ECHO_TIMEOUT_MS: u64 = 200;

/// Default window for the device's reply after the echo
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 1000;

/// Default number of extra attempts after a transport-level failure
pub const DEFAULT_RETRY_LIMIT: u32 = 2;

/// Longest data payload a single-byte length field may describe
pub const MAX_DATA_LEN: usize = 252;
