//! Packet framing
//!
//! ccTalk wire format: `[destination, length, source, header, data..]`
//! plus the session's integrity trailer, where `length` counts the data
//! bytes only. In CRC mode the source slot is consumed by the CRC low
//! byte and the source address rides implicitly (the host is always
//! address 1); replies are correlated to requests by transaction order,
//! not by header echo, since a ccTalk reply carries header 0.

use serde::Serialize;

use super::{checksum, ChecksumMode, ProtocolError, HOST_ADDRESS, MAX_DATA_LEN};

/// Header byte carried by every well-formed ccTalk reply
pub const REPLY_HEADER: u8 = 0;

/// A parsed ccTalk packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    /// Address the packet is directed to
    pub destination: u8,
    /// Address the packet came from. In CRC mode the wire slot holds the
    /// CRC low byte instead, and this field is the implicit constant
    /// [`HOST_ADDRESS`].
    pub source: u8,
    /// Command (request) or reply marker (always 0 in replies)
    pub header: u8,
    /// Payload bytes; the wire length field equals `data.len()`
    pub data: Vec<u8>,
}

impl Packet {
    /// Whether this packet is an ACK-style reply with no payload
    pub fn is_ack(&self) -> bool {
        self.header == REPLY_HEADER && self.data.is_empty()
    }
}

/// Lay out a request packet and add the trailer for `mode`.
///
/// In CRC mode the `source` argument is not transmitted; the CRC low
/// byte occupies its slot.
pub fn build_request(
    destination: u8,
    source: u8,
    header: u8,
    data: &[u8],
    mode: ChecksumMode,
) -> Result<Vec<u8>, ProtocolError> {
    if data.len() > MAX_DATA_LEN {
        return Err(ProtocolError::DataTooLong(data.len()));
    }
    let wire = match mode {
        ChecksumMode::Crc16 => {
            let mut frame = Vec::with_capacity(data.len() + 3);
            frame.push(destination);
            frame.push(data.len() as u8);
            frame.push(header);
            frame.extend_from_slice(data);
            checksum::append_crc(&frame)
        }
        ChecksumMode::Checksum8 => {
            let mut frame = Vec::with_capacity(data.len() + 4);
            frame.push(destination);
            frame.push(data.len() as u8);
            frame.push(source);
            frame.push(header);
            frame.extend_from_slice(data);
            checksum::append_checksum8(&frame)
        }
    };
    Ok(wire)
}

/// Verify the trailer of a received packet and parse the frame.
///
/// The length field must agree with the number of remaining data bytes;
/// anything else is a [`ProtocolError::MalformedPacket`].
pub fn parse_response(raw: &[u8], mode: ChecksumMode) -> Result<Packet, ProtocolError> {
    let frame = checksum::verify_and_strip(raw, mode)?;
    match mode {
        ChecksumMode::Crc16 => {
            // frame = [dest, len, header, data..]
            if frame.len() < 3 {
                return Err(ProtocolError::MalformedPacket(
                    "CRC frame shorter than its fixed fields",
                ));
            }
            let data = frame[3..].to_vec();
            if data.len() != frame[1] as usize {
                return Err(ProtocolError::MalformedPacket(
                    "length field disagrees with data length",
                ));
            }
            Ok(Packet {
                destination: frame[0],
                source: HOST_ADDRESS,
                header: frame[2],
                data,
            })
        }
        ChecksumMode::Checksum8 => {
            // frame = [dest, len, src, header, data..]
            if frame.len() < 4 {
                return Err(ProtocolError::MalformedPacket(
                    "frame shorter than its fixed fields",
                ));
            }
            let data = frame[4..].to_vec();
            if data.len() != frame[1] as usize {
                return Err(ProtocolError::MalformedPacket(
                    "length field disagrees with data length",
                ));
            }
            Ok(Packet {
                destination: frame[0],
                source: frame[2],
                header: frame[3],
                data,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn build_request_crc_layout() {
        // Matches the hand-computed frame [1, 2, 116, 0, 31, 0, 84]
        let wire = build_request(1, 1, 0, &[31, 0], ChecksumMode::Crc16).unwrap();
        assert_eq!(wire, vec![1, 2, 116, 0, 31, 0, 84]);
    }

    #[test]
    fn build_request_checksum_layout() {
        let wire = build_request(2, 1, 254, &[], ChecksumMode::Checksum8).unwrap();
        assert_eq!(&wire[..4], &[2, 0, 1, 254]);
        assert_eq!(wire.len(), 5);
        let sum = wire.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, 0);
    }

    #[test]
    fn parse_round_trip_crc() {
        let wire = build_request(40, 1, 159, &[7, 8, 9], ChecksumMode::Crc16).unwrap();
        let packet = parse_response(&wire, ChecksumMode::Crc16).unwrap();
        assert_eq!(packet.destination, 40);
        assert_eq!(packet.source, HOST_ADDRESS);
        assert_eq!(packet.header, 159);
        assert_eq!(packet.data, vec![7, 8, 9]);
    }

    #[test]
    fn parse_round_trip_checksum() {
        let wire = build_request(2, 1, 231, &[255, 255], ChecksumMode::Checksum8).unwrap();
        let packet = parse_response(&wire, ChecksumMode::Checksum8).unwrap();
        assert_eq!(packet.destination, 2);
        assert_eq!(packet.source, 1);
        assert_eq!(packet.header, 231);
        assert_eq!(packet.data, vec![255, 255]);
    }

    #[test]
    fn inconsistent_length_field_is_malformed() {
        // Claim 3 data bytes but carry 2
        let frame = vec![1u8, 3, 0, 10, 20];
        let wire = checksum::append_crc(&frame);
        let err = parse_response(&wire, ChecksumMode::Crc16).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPacket(_)));
    }

    #[test]
    fn corrupt_trailer_is_checksum_mismatch() {
        let mut wire = build_request(1, 1, 0, &[78, 65, 75], ChecksumMode::Crc16).unwrap();
        let last = wire.len() - 1;
        wire[last] = wire[last].wrapping_add(1);
        let err = parse_response(&wire, ChecksumMode::Crc16).unwrap_err();
        assert!(matches!(err, ProtocolError::ChecksumMismatch { .. }));
    }

    #[test]
    fn oversized_data_is_rejected() {
        let data = vec![0u8; MAX_DATA_LEN + 1];
        let err = build_request(40, 1, 255, &data, ChecksumMode::Crc16).unwrap_err();
        assert!(matches!(err, ProtocolError::DataTooLong(_)));
    }

    #[test]
    fn ack_reply() {
        let wire = build_request(1, 40, REPLY_HEADER, &[], ChecksumMode::Crc16).unwrap();
        let packet = parse_response(&wire, ChecksumMode::Crc16).unwrap();
        assert!(packet.is_ack());
    }
}
