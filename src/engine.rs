//! Drives the request/response exchange with the terminal adapter.
//!
//! The shape of this is a synchronous cousin of gsmlib's `MeTa`/future-based
//! dispatch loop: issue one command at a time, read lines back until a
//! result code closes out the exchange, and hand any line that doesn't
//! belong to the in-flight command off to the event sink as a URC. Only one
//! command can be in flight at once - there is no pipelining, matching how
//! every terminal adapter we've seen actually behaves.
use std::time::Duration;
use log::{debug, trace, warn};

use crate::at::{AtCommand, AtResponse, AtResponsePacket, AtResultCode, AtValue};
use crate::errors::GsmError;
use crate::event::{EventSink, NullEventSink};
use crate::parse;
use crate::port::Port;

/// Information-response URCs whose PDU arrives on the line following the
/// header, rather than inline (`+CMT:`/`+CBM:`/`+CDS:`). The two lines must
/// be read and coupled into one response before being handed to the event
/// sink.
const PDU_URC_PARAMS: &[&str] = &["+CMT", "+CBM", "+CDS"];

/// Synchronous AT command engine: owns the port, and knows how to tell a
/// command's own response apart from an unsolicited one.
pub struct AtEngine {
    port: Box<dyn Port>,
    default_timeout: Duration,
    event_sink: Box<dyn EventSink>,
}
impl AtEngine {
    pub fn new(port: Box<dyn Port>, default_timeout: Duration) -> Self {
        AtEngine {
            port,
            default_timeout,
            event_sink: Box::new(NullEventSink),
        }
    }
    /// Install a handler for unsolicited responses. Replaces whatever
    /// handler (if any) was previously installed.
    pub fn set_event_sink(&mut self, sink: Box<dyn EventSink>) {
        self.event_sink = sink;
    }
    pub fn port_mut(&mut self) -> &mut dyn Port {
        &mut *self.port
    }

    /// Issue `cmd` and wait up to the configured default timeout for its
    /// response.
    pub fn chat(&mut self, cmd: AtCommand) -> Result<AtResponsePacket, GsmError> {
        self.chat_timeout(cmd, self.default_timeout)
    }

    /// Issue `cmd` and wait up to `timeout` for its response.
    pub fn chat_timeout(&mut self, cmd: AtCommand, timeout: Duration) -> Result<AtResponsePacket, GsmError> {
        let expected = cmd.expected();
        let line = cmd.to_string();
        debug!("-> {}", line);
        self.port.write_line(&line)?;
        self.collect_response(&line, &expected, timeout)
    }

    /// Issue `cmd` (e.g. `AT+CMGS=<len>`/`AT+CMGW=<len>`), wait for the `"> "`
    /// prompt the TA emits once it's ready for the PDU body, then write
    /// `pdu_hex` terminated by Ctrl-Z and wait for the result as `chat`
    /// would. A prompt that never arrives is a `TimeoutError`, same as any
    /// other stalled exchange - we never fall back to writing the body
    /// blind.
    pub fn send_pdu(&mut self, cmd: AtCommand, pdu_hex: &str, timeout: Duration) -> Result<AtResponsePacket, GsmError> {
        let expected = cmd.expected();
        let line = cmd.to_string();
        debug!("-> {}", line);
        self.port.write_line(&line)?;
        if !self.port.wait_for_prompt(timeout)? {
            return Err(GsmError::TimeoutError);
        }
        trace!("<- > ");
        let mut body = pdu_hex.as_bytes().to_vec();
        body.push(0x1A);
        debug!("-> {} <Ctrl-Z>", pdu_hex);
        self.port.write_raw(&body)?;
        self.collect_response(&line, &expected, timeout)
    }

    fn collect_response(&mut self, sent: &str, expected: &[String], timeout: Duration) -> Result<AtResponsePacket, GsmError> {
        let mut responses = vec![];
        let mut echo_pending = true;
        loop {
            let line = self.port.read_line(timeout)?.ok_or(GsmError::TimeoutError)?;
            trace!("<- {}", line);
            if echo_pending {
                echo_pending = false;
                if line.trim() == sent {
                    trace!("discarding echo of our own command");
                    continue;
                }
            }
            let parsed = match parse::parse_response_line(line.as_bytes()) {
                Ok((rest, resp)) if rest.is_empty() => resp,
                _ => AtResponse::Unknown(line),
            };
            match parsed {
                AtResponse::ResultCode(code) => {
                    return Ok(AtResponsePacket { responses, status: code });
                }
                AtResponse::InformationResponse { ref param, .. } if expected.iter().any(|e| e == param) => {
                    responses.push(parsed);
                }
                AtResponse::InformationResponse { .. } => {
                    warn!("unsolicited response while awaiting {:?}: {:?}", expected, parsed);
                    let other = self.couple_pdu_urc(parsed, timeout)?;
                    self.event_sink.dispatch(&other);
                }
                // Anything else (a bare line with no recognised header) can't
                // carry a param to decide "ours or a URC's" by, so it's always
                // folded into the in-flight command's response - this is how
                // a `+CMGL:` listing's raw PDU continuation line arrives.
                other => {
                    responses.push(other);
                }
            }
        }
    }

    /// If `resp` is a `+CMT`/`+CBM`/`+CDS` header, read the PDU line that
    /// follows and fold it into the response before it's dispatched.
    fn couple_pdu_urc(&mut self, resp: AtResponse, timeout: Duration) -> Result<AtResponse, GsmError> {
        if let AtResponse::InformationResponse { param, .. } = &resp {
            if PDU_URC_PARAMS.contains(&param.as_str()) {
                let param = param.clone();
                let pdu_line = self.port.read_line(timeout)?.ok_or(GsmError::TimeoutError)?;
                return Ok(AtResponse::InformationResponse {
                    param,
                    response: AtValue::Unknown(pdu_line.trim().to_string()),
                });
            }
        }
        Ok(resp)
    }

    /// Drain and dispatch any unsolicited lines sitting on the port, for up
    /// to `timeout`. Call this periodically while otherwise idle; there's
    /// no background thread doing it for you.
    pub fn poll(&mut self, timeout: Duration) -> Result<(), GsmError> {
        while let Some(line) = self.port.read_line(timeout)? {
            let parsed = match parse::parse_response_line(line.as_bytes()) {
                Ok((rest, resp)) if rest.is_empty() => resp,
                _ => AtResponse::Unknown(line),
            };
            let parsed = self.couple_pdu_urc(parsed, timeout)?;
            self.event_sink.dispatch(&parsed);
        }
        Ok(())
    }
}

impl From<AtResultCode> for GsmError {
    fn from(c: AtResultCode) -> GsmError {
        GsmError::ChatError(c)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::port::MockPort;
    use crate::at::AtValue;
    use std::time::Duration;

    fn engine_with(port: MockPort) -> AtEngine {
        AtEngine::new(Box::new(port), Duration::from_millis(50))
    }

    #[test]
    fn simple_ok() {
        let mut port = MockPort::new();
        port.push_response("OK");
        let mut engine = engine_with(port);
        let pkt = engine.chat(AtCommand::Execute { command: "Z".into() }).unwrap();
        assert!(pkt.status.is_ok());
    }

    #[test]
    fn information_response_collected() {
        let mut port = MockPort::new();
        port.push_response("+CSQ: 20,99");
        port.push_response("OK");
        let mut engine = engine_with(port);
        let pkt = engine.chat(AtCommand::Read { param: "+CSQ".into() }).unwrap();
        let val = pkt.extract_named_response("+CSQ").unwrap();
        let arr = val.get_array().unwrap();
        assert_eq!(arr[0], AtValue::Integer(20));
    }

    #[test]
    fn urc_interleaved_is_not_mistaken_for_response() {
        let mut port = MockPort::new();
        port.push_response("+CMTI: \"SM\",3");
        port.push_response("OK");
        let mut engine = engine_with(port);
        let pkt = engine.chat(AtCommand::Execute { command: "Z".into() }).unwrap();
        assert!(pkt.status.is_ok());
        assert!(pkt.responses.is_empty());
    }

    #[test]
    fn cmt_urc_couples_following_pdu_line() {
        use crate::event::EventSink;
        use crate::pdu::DeliverPdu;
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Capture(Rc<RefCell<Vec<u8>>>);
        impl EventSink for Capture {
            fn on_sms(&mut self, msg: &DeliverPdu) {
                self.0.borrow_mut().extend_from_slice(&msg.as_bytes());
            }
        }

        let mut port = MockPort::new();
        port.push_response("+CMT: ,24");
        port.push_response("000002912100100000000000000000");
        port.push_response("OK");
        let mut engine = engine_with(port);
        let captured = Rc::new(RefCell::new(Vec::new()));
        engine.set_event_sink(Box::new(Capture(captured.clone())));
        let pkt = engine.chat(AtCommand::Execute { command: "Z".into() }).unwrap();
        assert!(pkt.status.is_ok());
        assert_eq!(*captured.borrow(), crate::pdu::HexData::decode("000002912100100000000000000000").unwrap());
    }

    #[test]
    fn bare_pdu_continuation_line_is_collected_not_dispatched() {
        use crate::event::EventSink;
        use crate::pdu::DeliverPdu;
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Capture(Rc<RefCell<u32>>);
        impl EventSink for Capture {
            fn on_sms(&mut self, _msg: &DeliverPdu) {
                *self.0.borrow_mut() += 1;
            }
        }

        let mut port = MockPort::new();
        port.push_response("+CMGL: 0,1,,24");
        port.push_response("07911234567890F1");
        port.push_response("OK");
        let mut engine = engine_with(port);
        let dispatched = Rc::new(RefCell::new(0));
        engine.set_event_sink(Box::new(Capture(dispatched.clone())));
        let pkt = engine
            .chat(AtCommand::Equals { param: "+CMGL".into(), value: AtValue::Integer(4) })
            .unwrap();
        assert!(pkt.status.is_ok());
        assert_eq!(pkt.responses.len(), 2);
        assert!(matches!(pkt.responses[1], AtResponse::Unknown(ref s) if s == "07911234567890F1"));
        assert_eq!(*dispatched.borrow(), 0);
    }

    #[test]
    fn own_command_echo_is_discarded() {
        let mut port = MockPort::new();
        port.push_response("ATZ");
        port.push_response("OK");
        let mut engine = engine_with(port);
        let pkt = engine.chat(AtCommand::Execute { command: "Z".into() }).unwrap();
        assert!(pkt.status.is_ok());
        assert!(pkt.responses.is_empty());
    }

    #[test]
    fn timeout_with_no_response() {
        let port = MockPort::new();
        let mut engine = engine_with(port);
        let err = engine.chat(AtCommand::Execute { command: "Z".into() }).unwrap_err();
        assert!(matches!(err, GsmError::TimeoutError));
    }

    #[test]
    fn error_result_propagates() {
        let mut port = MockPort::new();
        port.push_response("ERROR");
        let mut engine = engine_with(port);
        let err = engine.chat(AtCommand::Execute { command: "Z".into() }).unwrap_err();
        match err {
            GsmError::ChatError(AtResultCode::Error) => {}
            _ => panic!("wrong kind of error"),
        }
    }

    #[test]
    fn send_pdu_waits_for_prompt_then_streams_body() {
        use crate::at::AtValue;

        let mut port = MockPort::new();
        port.push_prompt(true);
        port.push_response("+CMGS: 42");
        port.push_response("OK");
        let mut engine = engine_with(port);
        let cmd = AtCommand::Equals { param: "+CMGS".into(), value: AtValue::Integer(7) };
        let pkt = engine.send_pdu(cmd, "0011000B917...", Duration::from_millis(50)).unwrap();
        assert!(pkt.status.is_ok());
        let val = pkt.extract_named_response("+CMGS").unwrap();
        assert_eq!(*val.get_integer().unwrap(), 42);
    }

    #[test]
    fn send_pdu_times_out_if_prompt_never_arrives() {
        use crate::at::AtValue;

        let mut port = MockPort::new();
        port.push_prompt(false);
        let mut engine = engine_with(port);
        let cmd = AtCommand::Equals { param: "+CMGS".into(), value: AtValue::Integer(7) };
        let err = engine.send_pdu(cmd, "0011000B917...", Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, GsmError::TimeoutError));
    }
}
