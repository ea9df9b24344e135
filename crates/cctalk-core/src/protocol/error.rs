//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to a ccTalk device
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("No reply from device within the timeout window")]
    Timeout,

    #[error("Line echo did not match the transmitted bytes")]
    LineError,

    #[error("Checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch {
        /// Trailer recomputed from the received bytes
        expected: u16,
        /// Trailer carried by the packet
        actual: u16,
    },

    #[error("Malformed packet: {0}")]
    MalformedPacket(&'static str),

    #[error("Data payload too long: {0} bytes")]
    DataTooLong(usize),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Polling is already running")]
    PollingActive,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the transport may safely resend the whole request.
    ///
    /// Only failures where no reply bytes arrived qualify; a received but
    /// corrupt reply means the device may already have acted on the
    /// command, and non-idempotent commands must not be replayed on an
    /// ambiguous outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProtocolError::Timeout | ProtocolError::LineError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ProtocolError::Timeout.is_retryable());
        assert!(ProtocolError::LineError.is_retryable());
        assert!(!ProtocolError::ChecksumMismatch {
            expected: 0x1234,
            actual: 0x4321
        }
        .is_retryable());
        assert!(!ProtocolError::MalformedPacket("length field inconsistent").is_retryable());
    }

    #[test]
    fn display_is_not_empty() {
        let err = ProtocolError::Timeout;
        assert!(!err.to_string().is_empty());
        let err = ProtocolError::ChecksumMismatch {
            expected: 0x5474,
            actual: 0x5475,
        };
        assert!(err.to_string().contains("0x5474"));
    }
}
