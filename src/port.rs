//! The serial line between us and the terminal adapter.
//!
//! Everything above this module talks in terms of whole response lines;
//! `Port` is the seam where that abstraction meets an actual byte stream,
//! so the rest of the crate can be driven against a recorded transcript in
//! tests instead of real hardware.
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use crate::errors::GsmError;

/// A source and sink for AT command lines.
///
/// Implementations are free to be as dumb as a line-buffered read/write
/// pair; timing out a `read_line` that never completes is the only part
/// that takes any care.
pub trait Port {
    /// Write `line` followed by a carriage return. Terminal adapters speak
    /// CR-terminated lines by convention (07.07 §5.1), not CRLF.
    fn write_line(&mut self, line: &str) -> Result<(), GsmError>;
    /// Write a raw byte sequence with no line ending appended, for the
    /// Ctrl-Z/ESC-terminated text-mode SMS body and PDU payload.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), GsmError>;
    /// Block for up to `timeout` waiting for a complete line (terminated by
    /// `\r\n`, blank lines discarded). Returns `None` on timeout.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, GsmError>;
    /// Block for up to `timeout` for the `"> "` prompt a TA emits (after
    /// `\r\n`) once it's ready to receive a PDU or text-mode SMS body.
    /// Returns `false` on timeout. Unlike `read_line`, the prompt has no
    /// trailing `\n`, so it can't be read as an ordinary line.
    fn wait_for_prompt(&mut self, timeout: Duration) -> Result<bool, GsmError>;
    /// Downcasting hook so tests driving a `MeTa`/`AtEngine` through
    /// `Box<dyn Port>` can reach back into a `MockPort` to inspect what was
    /// written, without widening the trait's main contract.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// A [`Port`] backed by a real serial device, via the `serialport` crate.
pub struct SerialPort {
    inner: Box<dyn serialport::SerialPort>,
    buf: Vec<u8>,
}
impl SerialPort {
    /// Open `path` (e.g. `/dev/ttyUSB0`) at `baud_rate`, 8N1, no flow
    /// control, with a conservative default read timeout that gets
    /// overridden per-call by `read_line`.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, GsmError> {
        let inner = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()?;
        Ok(SerialPort { inner, buf: vec![] })
    }
}
impl Port for SerialPort {
    fn write_line(&mut self, line: &str) -> Result<(), GsmError> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\r")?;
        self.inner.flush()?;
        Ok(())
    }
    fn write_raw(&mut self, data: &[u8]) -> Result<(), GsmError> {
        self.inner.write_all(data)?;
        self.inner.flush()?;
        Ok(())
    }
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, GsmError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop(); // '\n'
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                let s = String::from_utf8_lossy(&line).into_owned();
                if s.trim().is_empty() {
                    continue;
                }
                return Ok(Some(s));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.inner.set_timeout(remaining.min(Duration::from_millis(50)))?;
            let mut chunk = [0u8; 256];
            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
    fn wait_for_prompt(&mut self, timeout: Duration) -> Result<bool, GsmError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(pos) = self.buf.windows(2).position(|w| w == b"> ") {
                self.buf.drain(..pos + 2);
                return Ok(true);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(false);
            }
            self.inner.set_timeout(remaining.min(Duration::from_millis(50)))?;
            let mut chunk = [0u8; 256];
            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// A [`Port`] backed by an in-memory transcript, for exercising the engine
/// and façade without hardware.
#[cfg(any(test, feature = "test-support"))]
pub struct MockPort {
    /// Lines to hand back in order, one per `read_line` call.
    pub to_read: std::collections::VecDeque<String>,
    /// Everything that's been written, in order (CR stripped).
    pub written: Vec<String>,
    /// Raw bytes written via `write_raw`, in order.
    pub written_raw: Vec<Vec<u8>>,
    /// Queued answers for `wait_for_prompt`; defaults to `true` (prompt
    /// seen immediately) when empty, so tests that don't care about PDU
    /// prompting don't need to set this up.
    pub prompts: std::collections::VecDeque<bool>,
}
#[cfg(any(test, feature = "test-support"))]
impl MockPort {
    pub fn new() -> Self {
        MockPort {
            to_read: std::collections::VecDeque::new(),
            written: vec![],
            written_raw: vec![],
            prompts: std::collections::VecDeque::new(),
        }
    }
    /// Queue up a line (or several, newline-separated) to be returned by
    /// future `read_line` calls.
    pub fn push_response(&mut self, line: &str) {
        self.to_read.push_back(line.to_string());
    }
    /// Queue up an answer for the next `wait_for_prompt` call, for tests
    /// that exercise PDU-mode sends where the prompt never arrives.
    pub fn push_prompt(&mut self, seen: bool) {
        self.prompts.push_back(seen);
    }
}
#[cfg(any(test, feature = "test-support"))]
impl Port for MockPort {
    fn write_line(&mut self, line: &str) -> Result<(), GsmError> {
        self.written.push(line.to_string());
        Ok(())
    }
    fn write_raw(&mut self, data: &[u8]) -> Result<(), GsmError> {
        self.written_raw.push(data.to_vec());
        Ok(())
    }
    fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>, GsmError> {
        Ok(self.to_read.pop_front())
    }
    fn wait_for_prompt(&mut self, _timeout: Duration) -> Result<bool, GsmError> {
        Ok(self.prompts.pop_front().unwrap_or(true))
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mock_port_round_trip() {
        let mut p = MockPort::new();
        p.push_response("OK");
        p.write_line("AT").unwrap();
        assert_eq!(p.written, vec!["AT".to_string()]);
        assert_eq!(p.read_line(Duration::from_millis(1)).unwrap(), Some("OK".to_string()));
        assert_eq!(p.read_line(Duration::from_millis(1)).unwrap(), None);
    }
}
