//! Serial line access
//!
//! Low-level port handling plus the small trait the transport is written
//! against, so the transaction state machine can be driven by a scripted
//! line in tests.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// Byte-level operations the transport needs from a line
pub trait SerialLink: Send {
    /// Write the whole buffer; a partial write is an error
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`. Elapsing
    /// with no data is reported as `ErrorKind::TimedOut`.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;

    /// Drop anything pending in the driver buffers
    fn discard_buffers(&mut self) -> std::io::Result<()>;
}

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub name: String,
    /// Manufacturer name, if the driver reports one
    pub manufacturer: Option<String>,
    /// Product name, if the driver reports one
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (usb.manufacturer, usb.product),
            _ => (None, None),
        };
        Self {
            name: info.port_name,
            manufacturer,
            product,
        }
    }
}

/// List available serial ports in a deterministic order
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    ports
}

/// Real serial line wrapping the `serialport` crate
pub struct SerialPortLink {
    port: Box<dyn SerialPort>,
}

impl SerialPortLink {
    /// Open and configure a port for ccTalk traffic (8N1, no flow control)
    pub fn open(name: &str, baud_rate: Option<u32>) -> Result<Self, ProtocolError> {
        let port = serialport::new(name, baud_rate.unwrap_or(DEFAULT_BAUD_RATE))
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| ProtocolError::Serial(e.to_string()))?;
        Ok(Self { port })
    }
}

impl SerialLink for SerialPortLink {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        self.port.read(buf)
    }

    fn discard_buffers(&mut self) -> std::io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedLink;
    use super::*;

    #[test]
    fn scripted_link_echoes_writes() {
        let mut link = ScriptedLink::echoing(ScriptedLink::reply(&[9, 9]));
        link.write_all(&[1, 2, 3]).unwrap();
        let mut buf = [0u8; 5];
        let n = link.read_timeout(&mut buf, Duration::from_millis(1)).unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3, 9, 9]);
        assert_eq!(link.writes, vec![1, 2, 3]);
    }

    #[test]
    fn scripted_link_times_out_when_exhausted() {
        let mut link = ScriptedLink::silent(vec![]);
        let mut buf = [0u8; 1];
        let err = link
            .read_timeout(&mut buf, Duration::from_millis(1))
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn list_ports_does_not_panic() {
        let _ = list_ports();
    }
}
