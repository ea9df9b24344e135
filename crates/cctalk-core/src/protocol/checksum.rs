//! Packet trailer schemes
//!
//! A ccTalk session uses one of two integrity trailers, fixed for the
//! lifetime of the connection. In CRC mode the CRC-16/XMODEM low byte
//! takes over the source-address slot (index 2) and the high byte trails
//! the packet, so the frame under the CRC never contains a source byte.
//! In checksum mode a single additive byte is appended, chosen so the
//! whole packet sums to zero mod 256.
//!
//! The additive scheme cannot detect every corruption: two byte errors
//! that cancel mod 256 (or a swap of two bytes) leave the sum unchanged.

use crc::{Crc, CRC_16_XMODEM};
use serde::{Deserialize, Serialize};

use super::ProtocolError;

/// CRC-16/XMODEM: polynomial 0x1021, initial value 0, no reflection,
/// no final xor.
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Index of the source-address slot within a frame
pub(crate) const SOURCE_SLOT: usize = 2;

/// Integrity trailer scheme in force for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumMode {
    /// CRC-16/XMODEM split across the source slot and the final byte
    Crc16,
    /// Single sum-to-zero byte appended to the packet
    Checksum8,
}

impl ChecksumMode {
    /// Shortest wire packet this mode can produce
    pub fn min_packet_len(&self) -> usize {
        match self {
            ChecksumMode::Crc16 => 5,
            ChecksumMode::Checksum8 => 4,
        }
    }
}

/// XMODEM CRC-16 over `bytes`. Empty input yields 0x0000.
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}

/// Sum-to-zero additive checksum over `bytes`
pub fn checksum8(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0u8.wrapping_sub(sum)
}

/// Add the CRC trailer to a bare `[dest, len, header, data..]` frame.
///
/// The low byte is inserted at the source slot and the high byte
/// appended, per the ccTalk CRC layout. The frame must carry at least
/// the destination and length bytes.
pub fn append_crc(frame: &[u8]) -> Vec<u8> {
    let crc = crc16(frame);
    let mut out = frame.to_vec();
    out.insert(SOURCE_SLOT, (crc & 0x00FF) as u8);
    out.push((crc >> 8) as u8);
    out
}

/// Append the additive checksum byte to a `[dest, len, src, header, data..]` frame
pub fn append_checksum8(frame: &[u8]) -> Vec<u8> {
    let mut out = frame.to_vec();
    out.push(checksum8(frame));
    out
}

/// Verify the trailer of a received packet and strip it.
///
/// Returns the bare frame in the mode's shape: without the source slot
/// in CRC mode (`[dest, len, header, data..]`), with it in checksum mode
/// (`[dest, len, src, header, data..]`). A mismatch is reported as
/// [`ProtocolError::ChecksumMismatch`]; it is never retried at this
/// layer because the bytes were definitely received, just corrupted.
pub fn verify_and_strip(raw: &[u8], mode: ChecksumMode) -> Result<Vec<u8>, ProtocolError> {
    if raw.len() < mode.min_packet_len() {
        return Err(ProtocolError::MalformedPacket(
            "packet shorter than the trailer minimum",
        ));
    }
    match mode {
        ChecksumMode::Crc16 => {
            let low = raw[SOURCE_SLOT];
            let high = raw[raw.len() - 1];
            let mut frame = Vec::with_capacity(raw.len() - 2);
            frame.extend_from_slice(&raw[..SOURCE_SLOT]);
            frame.extend_from_slice(&raw[SOURCE_SLOT + 1..raw.len() - 1]);

            let expected = crc16(&frame);
            let actual = u16::from(high) << 8 | u16::from(low);
            if expected != actual {
                return Err(ProtocolError::ChecksumMismatch { expected, actual });
            }
            Ok(frame)
        }
        ChecksumMode::Checksum8 => {
            let (frame, trailer) = raw.split_at(raw.len() - 1);
            let expected = checksum8(frame);
            let actual = trailer[0];
            if expected != actual {
                return Err(ProtocolError::ChecksumMismatch {
                    expected: expected.into(),
                    actual: actual.into(),
                });
            }
            Ok(frame.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn crc16_empty_input_is_zero() {
        assert_eq!(crc16(&[]), 0x0000);
    }

    #[test]
    fn crc16_check_value() {
        // Standard CRC-16/XMODEM check input
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn append_crc_known_vector() {
        // Request-comms-revision style frame from the device manual:
        // dest=1, len=2, header=0, data=[31, 0] carries CRC 0x5474
        let framed = append_crc(&[1, 2, 0, 31, 0]);
        assert_eq!(framed, vec![1, 2, 116, 0, 31, 0, 84]);
    }

    #[test]
    fn crc_round_trip() {
        let frame = vec![40, 3, 159, 1, 2, 3];
        let framed = append_crc(&frame);
        let stripped = verify_and_strip(&framed, ChecksumMode::Crc16).unwrap();
        assert_eq!(stripped, frame);
    }

    #[test]
    fn crc_round_trip_empty_data() {
        let frame = vec![40, 0, 254];
        let framed = append_crc(&frame);
        assert_eq!(framed.len(), 5);
        let stripped = verify_and_strip(&framed, ChecksumMode::Crc16).unwrap();
        assert_eq!(stripped, frame);
    }

    #[test]
    fn checksum8_round_trip() {
        let frame = vec![2, 1, 1, 254, 0x7F];
        let framed = append_checksum8(&frame);
        let stripped = verify_and_strip(&framed, ChecksumMode::Checksum8).unwrap();
        assert_eq!(stripped, frame);
    }

    #[test]
    fn checksum8_sums_to_zero() {
        let framed = append_checksum8(&[2, 0, 1, 254]);
        let sum = framed.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        assert_eq!(sum, 0);
    }

    #[test]
    fn crc_detects_any_single_bit_flip() {
        let framed = append_crc(&[40, 2, 159, 10, 20]);
        for byte in 0..framed.len() {
            for bit in 0..8 {
                let mut corrupted = framed.clone();
                corrupted[byte] ^= 1 << bit;
                assert!(
                    verify_and_strip(&corrupted, ChecksumMode::Crc16).is_err(),
                    "flip of byte {byte} bit {bit} went undetected"
                );
            }
        }
    }

    #[test]
    fn checksum8_detects_any_single_bit_flip() {
        let framed = append_checksum8(&[40, 2, 1, 159, 10, 20]);
        for byte in 0..framed.len() {
            for bit in 0..8 {
                let mut corrupted = framed.clone();
                corrupted[byte] ^= 1 << bit;
                assert!(
                    verify_and_strip(&corrupted, ChecksumMode::Checksum8).is_err(),
                    "flip of byte {byte} bit {bit} went undetected"
                );
            }
        }
    }

    #[test]
    fn short_packets_are_malformed_not_mismatched() {
        let err = verify_and_strip(&[1, 0, 2, 3], ChecksumMode::Crc16).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPacket(_)));
        let err = verify_and_strip(&[1, 0], ChecksumMode::Checksum8).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPacket(_)));
    }
}
