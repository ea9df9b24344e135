//! Echo-aware serial transactions
//!
//! ccTalk runs on a single shared data line, so every byte the host
//! transmits is reflected back before the addressed device answers. One
//! transaction walks SENDING, AWAITING_ECHO and AWAITING_REPLY in order:
//! send the request, read back exactly that many bytes and compare them,
//! then collect a structurally complete reply (length byte plus the
//! trailer's net one extra byte, identical overhead in both modes).
//!
//! Timeouts and echo mismatches are retried as whole transactions up to
//! a small bound. A reply that arrived but failed its integrity or
//! structure check is never resent from here: the device may already
//! have acted on it, and commands such as route-bill are not idempotent.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{
    ProtocolError, SerialLink, DEFAULT_ECHO_TIMEOUT_MS, DEFAULT_REPLY_TIMEOUT_MS,
    DEFAULT_RETRY_LIMIT,
};

/// Fixed bytes before the data payload plus the trailer's net one byte
const WIRE_OVERHEAD: usize = 5;

/// Timeouts and retry policy for one port
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Inter-byte silence allowed while the echo arrives
    pub echo_timeout: Duration,
    /// Window for the complete reply after the echo
    pub reply_timeout: Duration,
    /// Extra attempts after a timeout or line error
    pub retry_limit: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            echo_timeout: Duration::from_millis(DEFAULT_ECHO_TIMEOUT_MS),
            reply_timeout: Duration::from_millis(DEFAULT_REPLY_TIMEOUT_MS),
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }
}

/// Exclusive owner of a serial line, one transaction at a time
pub struct Transport {
    link: Box<dyn SerialLink>,
    config: TransportConfig,
}

impl Transport {
    /// Wrap an open line with the given policy
    pub fn new(link: Box<dyn SerialLink>, config: TransportConfig) -> Self {
        Self { link, config }
    }

    /// Run one request/response exchange and return the raw reply bytes.
    ///
    /// Transport-level failures (no echo, wrong echo, no reply) are
    /// retried up to the configured bound; everything else surfaces
    /// immediately. The port remains usable after any failure.
    pub fn transact(&mut self, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut attempt = 0u32;
        loop {
            match self.exchange(request) {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < self.config.retry_limit => {
                    attempt += 1;
                    warn!(attempt, error = %e, "transaction failed, resending");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        self.link.discard_buffers()?;
        self.link.write_all(request)?;
        debug!(len = request.len(), "request sent, awaiting echo");
        self.read_echo(request)?;
        self.read_reply()
    }

    /// AWAITING_ECHO: accumulate exactly `request.len()` bytes and
    /// compare. A short or absent echo is a timeout; different bytes
    /// mean cross-talk or a cabling fault and are a line error.
    fn read_echo(&mut self, request: &[u8]) -> Result<(), ProtocolError> {
        let mut echo = vec![0u8; request.len()];
        let mut got = 0;
        while got < echo.len() {
            match self.link.read_timeout(&mut echo[got..], self.config.echo_timeout) {
                Ok(0) => return Err(ProtocolError::Timeout),
                Ok(n) => got += n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(ProtocolError::Timeout)
                }
                Err(e) => return Err(ProtocolError::Io(e)),
            }
        }
        if echo != request {
            debug!(sent = ?request, echoed = ?echo, "echo mismatch");
            return Err(ProtocolError::LineError);
        }
        debug!("echo verified, awaiting reply");
        Ok(())
    }

    /// AWAITING_REPLY: read the two leading bytes to learn the length
    /// field, then consume the rest of the structurally complete packet.
    fn read_reply(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let deadline = Instant::now() + self.config.reply_timeout;
        let mut reply = Vec::with_capacity(16);
        self.read_until(&mut reply, 2, deadline)?;
        let expected = reply[1] as usize + WIRE_OVERHEAD;
        self.read_until(&mut reply, expected, deadline)?;
        debug!(len = reply.len(), "reply complete");
        Ok(reply)
    }

    fn read_until(
        &mut self,
        buf: &mut Vec<u8>,
        target: usize,
        deadline: Instant,
    ) -> Result<(), ProtocolError> {
        let mut chunk = [0u8; 64];
        while buf.len() < target {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(ProtocolError::Timeout)?;
            let want = (target - buf.len()).min(chunk.len());
            match self.link.read_timeout(&mut chunk[..want], remaining) {
                Ok(0) => return Err(ProtocolError::Timeout),
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(ProtocolError::Timeout)
                }
                Err(e) => return Err(ProtocolError::Io(e)),
            }
        }
        Ok(())
    }
}
