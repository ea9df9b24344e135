//! Buffered bill event decoding
//!
//! A read-buffered-bill-events reply carries a rolling counter and five
//! result pairs `(A, B)`, newest first. A zero `A` byte marks a status
//! class event whose meaning is the `B` byte; a non-zero `A` byte is a
//! 1-based bill type index with `B` selecting cashbox credit or escrow.
//!
//! The counter, not the pair bytes, is the authoritative "did something
//! happen" signal: a device keeps reporting the same pairs until newer
//! events displace them, but the counter only moves when one occurred.

use serde::Serialize;

use crate::protocol::ProtocolError;

/// Number of result pairs in a buffered event reply
pub const EVENT_SLOTS: usize = 5;

/// Exact payload length of a buffered event reply
pub const EVENT_PAYLOAD_LEN: usize = 1 + EVENT_SLOTS * 2;

/// One decoded buffered event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BillEvent {
    /// Bill validated and committed to the cashbox or stacker
    Credit {
        /// 1-based bill type index
        bill_type: u8,
    },
    /// Bill validated and held in escrow awaiting routing
    PendingCredit {
        /// 1-based bill type index
        bill_type: u8,
    },
    /// Informational device state change
    Status {
        /// Code into the status table
        code: u8,
    },
    /// Bill refused and returned
    Reject {
        /// Code into the status table
        code: u8,
    },
    /// Unrecoverable device condition
    FatalError {
        /// Code into the status table
        code: u8,
    },
    /// Manipulation attempt detected
    FraudAttempt {
        /// Code into the status table
        code: u8,
    },
    /// Pair outside the documented tables
    Unknown {
        /// Raw A byte
        result_a: u8,
        /// Raw B byte
        result_b: u8,
    },
}

impl BillEvent {
    /// Decode one raw result pair
    pub fn from_pair(result_a: u8, result_b: u8) -> Self {
        match (result_a, result_b) {
            (0, code) => match code {
                0 | 1 | 4 | 5 | 10 | 11 | 12 | 14 | 20 | 21 => BillEvent::Status { code },
                2 | 3 => BillEvent::Reject { code },
                6 | 7 | 13 | 15 | 16 | 19 => BillEvent::FatalError { code },
                8 | 9 | 17 | 18 => BillEvent::FraudAttempt { code },
                _ => BillEvent::Unknown {
                    result_a,
                    result_b,
                },
            },
            (bill_type, 0) => BillEvent::Credit { bill_type },
            (bill_type, 1) => BillEvent::PendingCredit { bill_type },
            _ => BillEvent::Unknown {
                result_a,
                result_b,
            },
        }
    }

    /// Severity/category label for rendering
    pub fn category(&self) -> &'static str {
        match self {
            BillEvent::Credit { .. } => "Credit",
            BillEvent::PendingCredit { .. } => "Pending Credit",
            BillEvent::Status { .. } => "Status",
            BillEvent::Reject { .. } => "Reject",
            BillEvent::FatalError { .. } => "Fatal Error",
            BillEvent::FraudAttempt { .. } => "Fraud Attempt",
            BillEvent::Unknown { .. } => "Unknown",
        }
    }

    /// Human-readable description from the static event table
    pub fn description(&self) -> String {
        match self {
            BillEvent::Credit { bill_type } => {
                format!("Bill type {bill_type} validated correctly and sent to cashbox/stacker")
            }
            BillEvent::PendingCredit { bill_type } => {
                format!("Bill type {bill_type} validated correctly and held in escrow")
            }
            BillEvent::Status { code }
            | BillEvent::Reject { code }
            | BillEvent::FatalError { code }
            | BillEvent::FraudAttempt { code } => status_description(*code)
                .unwrap_or("Unknown event")
                .to_string(),
            BillEvent::Unknown { result_a, result_b } => {
                format!("Unknown event (A={result_a}, B={result_b})")
            }
        }
    }

    /// Whether this event reports an unrecoverable device condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, BillEvent::FatalError { .. })
    }
}

/// Decoded reply to a read-buffered-bill-events command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventReport {
    /// Rolling event counter, mod 256; advances once per device event
    pub counter: u8,
    /// The five result pairs, newest first
    pub events: Vec<BillEvent>,
}

impl EventReport {
    /// Decode the fixed 11-byte buffered event payload
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < EVENT_PAYLOAD_LEN {
            return Err(ProtocolError::MalformedPacket(
                "buffered event payload shorter than 11 bytes",
            ));
        }
        let counter = payload[0];
        let events = (0..EVENT_SLOTS)
            .map(|slot| {
                let idx = 1 + slot * 2;
                BillEvent::from_pair(payload[idx], payload[idx + 1])
            })
            .collect();
        Ok(Self { counter, events })
    }

    /// Whether any slot carries a fatal error event
    pub fn has_fatal(&self) -> bool {
        self.events.iter().any(BillEvent::is_fatal)
    }
}

/// Description table for the zero-category event codes, from the device
/// documentation. Read-only and process-wide.
pub fn status_description(code: u8) -> Option<&'static str> {
    Some(match code {
        0 => "Master inhibit active",
        1 => "Bill returned from escrow",
        2 => "Invalid bill (due to validation fail)",
        3 => "Invalid bill (due to transport problem)",
        4 => "Inhibited bill (on serial)",
        5 => "Inhibited bill (on DIP switches)",
        6 => "Bill jammed in transport (unsafe mode)",
        7 => "Bill jammed in stacker",
        8 => "Bill pulled backwards",
        9 => "Bill tamper",
        10 => "Stacker OK",
        11 => "Stacker removed",
        12 => "Stacker inserted",
        13 => "Stacker faulty",
        14 => "Stacker full",
        15 => "Stacker jammed",
        16 => "Bill jammed in transport (safe mode)",
        17 => "Opto fraud detected",
        18 => "String fraud detected",
        19 => "Anti-string mechanism faulty",
        20 => "Barcode detected",
        21 => "Unknown bill type stacked",
        _ => return None,
    })
}
