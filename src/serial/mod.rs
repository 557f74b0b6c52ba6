use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};

/// Max complete lines drained per poll. The device firmware can emit a
/// burst of status lines per physical event; only the newest matters.
const BURST_LINES: usize = 14;

/// One line-oriented ASCII peripheral connection.
///
/// The implementor exclusively owns the underlying transport and its
/// receive buffer; callers only ever see fully-decoded lines. During an
/// approval wait the checkout task must be the sole writer.
pub trait DeviceLink: Send {
    /// Sends `text` with a trailing newline. No acknowledgment is awaited.
    fn write_command(&mut self, text: &str) -> Result<()>;

    /// Non-blocking poll. Drains up to a burst of buffered complete lines
    /// and returns only the last one (latest status wins); `None` when no
    /// line is currently buffered. Never waits for data.
    fn poll_line(&mut self) -> Result<Option<String>>;
}

/// Receive-side reassembly: raw bytes in, newest complete line out.
/// Incomplete trailing bytes stay buffered until their newline arrives.
#[derive(Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Drains up to [`BURST_LINES`] complete lines, returning the last.
    pub fn take_latest_line(&mut self) -> Option<String> {
        let mut latest = None;

        for _ in 0..BURST_LINES {
            let Some(pos) = self.pending.iter().position(|&b| b == b'\n') else {
                break;
            };
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            latest = Some(line);
        }

        latest
    }
}

/// [`DeviceLink`] over one exclusively-owned serial port.
pub struct SerialDeviceLink {
    port: Box<dyn serialport::SerialPort>,
    buffer: LineBuffer,
}

impl SerialDeviceLink {
    /// Opens the port at the configured baud rate. The short read timeout
    /// only bounds the drain of bytes the device already reported as
    /// buffered; `poll_line` itself never waits for new data.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(50))
            .flow_control(serialport::FlowControl::None)
            .open()
            .with_context(|| format!("failed to open serial port {port_name}"))?;

        Ok(Self {
            port,
            buffer: LineBuffer::new(),
        })
    }
}

impl DeviceLink for SerialDeviceLink {
    fn write_command(&mut self, text: &str) -> Result<()> {
        self.port
            .write_all(format!("{text}\n").as_bytes())
            .context("serial write failed")?;
        self.port.flush().context("serial flush failed")?;
        Ok(())
    }

    fn poll_line(&mut self) -> Result<Option<String>> {
        let available = self.port.bytes_to_read().context("serial status failed")? as usize;

        if available > 0 {
            let mut chunk = vec![0u8; available];
            let n = self.port.read(&mut chunk).context("serial read failed")?;
            self.buffer.push_bytes(&chunk[..n]);
        }

        Ok(self.buffer.take_latest_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_returns_only_the_last_line() {
        let mut buffer = LineBuffer::new();
        buffer.push_bytes(b"ready\nweight 410\nAPPROVED\n");
        assert_eq!(buffer.take_latest_line().as_deref(), Some("APPROVED"));
        assert_eq!(buffer.take_latest_line(), None);
    }

    #[test]
    fn drain_is_capped_at_fourteen_lines_per_poll() {
        let mut buffer = LineBuffer::new();
        for i in 0..16 {
            buffer.push_bytes(format!("status {i}\n").as_bytes());
        }

        assert_eq!(buffer.take_latest_line().as_deref(), Some("status 13"));
        // The overflow lines survive to the next poll.
        assert_eq!(buffer.take_latest_line().as_deref(), Some("status 15"));
    }

    #[test]
    fn partial_line_waits_for_its_newline() {
        let mut buffer = LineBuffer::new();
        buffer.push_bytes(b"DEN");
        assert_eq!(buffer.take_latest_line(), None);

        buffer.push_bytes(b"IED\n");
        assert_eq!(buffer.take_latest_line().as_deref(), Some("DENIED"));
    }

    #[test]
    fn carriage_returns_are_trimmed() {
        let mut buffer = LineBuffer::new();
        buffer.push_bytes(b"  APPROVED \r\n");
        assert_eq!(buffer.take_latest_line().as_deref(), Some("APPROVED"));
    }

    #[test]
    fn empty_buffer_polls_nothing() {
        let mut buffer = LineBuffer::new();
        assert_eq!(buffer.take_latest_line(), None);
    }
}
