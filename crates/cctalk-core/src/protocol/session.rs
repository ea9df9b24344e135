//! Session management
//!
//! A [`Session`] pairs an open transport with the addressing and trailer
//! mode fixed at connect time, and exposes the generic command entry
//! point every caller (interactive shell or poller) goes through.

use tracing::debug;

use super::{
    build_request, commands, packet, ChecksumMode, Packet, ProtocolError, SerialLink,
    SerialPortLink, Transport, TransportConfig, BILL_VALIDATOR_ADDRESS, HOST_ADDRESS,
};
use crate::events::EventReport;

/// Addressing and trailer mode for one device, fixed per session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bus address of the device
    pub destination: u8,
    /// Bus address of this host
    pub source: u8,
    /// Integrity trailer scheme
    pub mode: ChecksumMode,
    /// Transaction timing and retry policy
    pub transport: TransportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            destination: BILL_VALIDATOR_ADDRESS,
            source: HOST_ADDRESS,
            mode: ChecksumMode::Crc16,
            transport: TransportConfig::default(),
        }
    }
}

/// A connected ccTalk device
pub struct Session {
    transport: Transport,
    config: SessionConfig,
}

impl Session {
    /// Open the named serial port and bind it to a session
    pub fn open(
        port_name: &str,
        baud_rate: Option<u32>,
        config: SessionConfig,
    ) -> Result<Self, ProtocolError> {
        let link = SerialPortLink::open(port_name, baud_rate)?;
        Ok(Self::with_link(Box::new(link), config))
    }

    /// Bind an already open line to a session
    pub fn with_link(link: Box<dyn SerialLink>, config: SessionConfig) -> Self {
        let transport = Transport::new(link, config.transport.clone());
        Self { transport, config }
    }

    /// Trailer mode in force for this session
    pub fn mode(&self) -> ChecksumMode {
        self.config.mode
    }

    /// Bus address of the device this session talks to
    pub fn destination(&self) -> u8 {
        self.config.destination
    }

    /// Send one command and return the parsed reply
    pub fn command(&mut self, header: u8, data: &[u8]) -> Result<Packet, ProtocolError> {
        let request = build_request(
            self.config.destination,
            self.config.source,
            header,
            data,
            self.config.mode,
        )?;
        debug!(header, data_len = data.len(), "sending command");
        let raw = self.transport.transact(&request)?;
        packet::parse_response(&raw, self.config.mode)
    }

    /// Drain the device's buffered event queue and decode the reply
    pub fn read_buffered_events(&mut self) -> Result<EventReport, ProtocolError> {
        let reply = self.command(commands::READ_BUFFERED_BILL_EVENTS, &[])?;
        EventReport::decode(&reply.data)
    }
}

#[cfg(test)]
mod tests {
    use super::super::serial::testing::ScriptedLink;
    use super::*;
    use crate::events::BillEvent;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn fast_session(link: ScriptedLink) -> Session {
        Session::with_link(
            Box::new(link),
            SessionConfig {
                transport: TransportConfig {
                    echo_timeout: Duration::from_millis(5),
                    reply_timeout: Duration::from_millis(5),
                    retry_limit: 0,
                },
                ..SessionConfig::default()
            },
        )
    }

    #[test]
    fn command_round_trip() {
        // Device answers a simple poll with a bare ACK
        let reply = build_request(1, 40, 0, &[], ChecksumMode::Crc16).unwrap();
        let link = ScriptedLink::echoing(ScriptedLink::reply(&reply));
        let mut session = fast_session(link);

        let packet = session.command(commands::SIMPLE_POLL, &[]).unwrap();
        assert!(packet.is_ack());
    }

    #[test]
    fn read_buffered_events_decodes_reply() {
        let payload = [20u8, 0, 0, 0, 0, 0, 1, 2, 1, 0, 1];
        let reply = build_request(1, 40, 0, &payload, ChecksumMode::Crc16).unwrap();
        let link = ScriptedLink::echoing(ScriptedLink::reply(&reply));
        let mut session = fast_session(link);

        let report = session.read_buffered_events().unwrap();
        assert_eq!(report.counter, 20);
        assert_eq!(report.events[3], BillEvent::PendingCredit { bill_type: 2 });
    }

    #[test]
    fn corrupt_reply_surfaces_checksum_mismatch() {
        let mut reply = build_request(1, 40, 0, &[1, 2, 3], ChecksumMode::Crc16).unwrap();
        let last = reply.len() - 1;
        reply[last] ^= 0x01;
        let link = ScriptedLink::echoing(ScriptedLink::reply(&reply));
        let mut session = fast_session(link);

        let err = session.command(242, &[]).unwrap_err();
        assert!(matches!(err, ProtocolError::ChecksumMismatch { .. }));
    }

    #[test]
    fn checksum8_session_round_trip() {
        let reply = build_request(1, 2, 0, &[3, 3, 6], ChecksumMode::Checksum8).unwrap();
        let link = ScriptedLink::echoing(ScriptedLink::reply(&reply));
        let mut session = Session::with_link(
            Box::new(link),
            SessionConfig {
                destination: 2,
                mode: ChecksumMode::Checksum8,
                transport: TransportConfig {
                    echo_timeout: Duration::from_millis(5),
                    reply_timeout: Duration::from_millis(5),
                    retry_limit: 0,
                },
                ..SessionConfig::default()
            },
        );

        let packet = session.command(229, &[]).unwrap();
        assert_eq!(packet.source, 2);
        assert_eq!(packet.data, vec![3, 3, 6]);
    }
}
