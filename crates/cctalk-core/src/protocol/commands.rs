//! ccTalk header codes
//!
//! The engine treats every command as an opaque header plus payload and
//! special-cases only [`READ_BUFFERED_BILL_EVENTS`]; this table exists
//! for the interactive shell's help text.

/// Read buffered bill events; the one header whose reply the engine
/// decodes beyond generic framing
pub const READ_BUFFERED_BILL_EVENTS: u8 = 159;

/// Simple poll, the ccTalk liveness check
pub const SIMPLE_POLL: u8 = 254;

/// Static metadata for one header code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    /// ccTalk header code
    pub code: u8,
    /// Function name from the device documentation
    pub name: &'static str,
}

/// Header codes this host knows by name (Alberici BillyOne set)
pub const HEADER_TABLE: &[HeaderInfo] = &[
    HeaderInfo { code: 1, name: "Reset device" },
    HeaderInfo { code: 4, name: "Request comms revision" },
    HeaderInfo { code: 152, name: "Request inhibit status" },
    HeaderInfo { code: 154, name: "Route bill" },
    HeaderInfo { code: 156, name: "Request country scaling factor" },
    HeaderInfo { code: 159, name: "Read buffered bill events" },
    HeaderInfo { code: 192, name: "Request build code" },
    HeaderInfo { code: 194, name: "Request database version" },
    HeaderInfo { code: 197, name: "Calculate ROM checksum" },
    HeaderInfo { code: 213, name: "Request option flags" },
    HeaderInfo { code: 225, name: "Request accept counter" },
    HeaderInfo { code: 226, name: "Request insertion counter" },
    HeaderInfo { code: 227, name: "Request master inhibit status" },
    HeaderInfo { code: 228, name: "Modify master inhibit status" },
    HeaderInfo { code: 230, name: "Request inhibit status" },
    HeaderInfo { code: 231, name: "Modify inhibit status" },
    HeaderInfo { code: 232, name: "Perform self-check" },
    HeaderInfo { code: 241, name: "Request software revision" },
    HeaderInfo { code: 242, name: "Request serial number" },
    HeaderInfo { code: 244, name: "Request product code" },
    HeaderInfo { code: 245, name: "Request equipment category id" },
    HeaderInfo { code: 246, name: "Request manufacturer id" },
    HeaderInfo { code: 249, name: "Request polling priority" },
    HeaderInfo { code: 254, name: "Simple poll" },
];

/// Look up the documented name of a header code
pub fn header_name(code: u8) -> Option<&'static str> {
    HEADER_TABLE
        .iter()
        .find(|info| info.code == code)
        .map(|info| info.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_by_code() {
        assert!(HEADER_TABLE.windows(2).all(|w| w[0].code <= w[1].code));
    }

    #[test]
    fn known_and_unknown_lookups() {
        assert_eq!(header_name(254), Some("Simple poll"));
        assert_eq!(header_name(READ_BUFFERED_BILL_EVENTS), Some("Read buffered bill events"));
        assert_eq!(header_name(0), None);
    }
}
