//! Unsolicited result codes (URCs) delivered outside of any command/response
//! exchange: incoming calls, new-message indications, and the like.
use std::convert::TryFrom;

use crate::at::AtResponse;
use crate::pdu::{DeliverPdu, StatusReportPdu};

/// A notification the device sent us without being asked.
#[derive(Debug, Clone)]
pub enum Event {
    /// `+CMTI: <mem>,<index>` - a new SMS has arrived and been stored.
    SmsIndication { memory: String, index: u32 },
    /// `+CMT: ...` - a new SMS has been delivered directly, PDU included.
    Sms { pdu: Vec<u8> },
    /// `+CBM: ...` - a cell broadcast message.
    CellBroadcast { pdu: Vec<u8> },
    /// `+CDSI: <mem>,<index>` - a status report has arrived and been stored.
    StatusReportIndication { memory: String, index: u32 },
    /// `+CDS: ...` - a status report has been delivered directly, PDU included.
    StatusReport { pdu: Vec<u8> },
    /// `RING` or a vendor-specific equivalent - an incoming call.
    IncomingCall,
    /// Any other unsolicited line this crate doesn't have a typed variant
    /// for yet.
    Other(AtResponse),
}

/// Receiver for [`Event`]s. All methods have a no-op default, so
/// implementors only need to override what they care about.
///
/// Handlers are invoked synchronously, on the same thread and stack as
/// whichever [`crate::engine::AtEngine`] method noticed the URC - generally
/// from inside a `chat()` call, or from `poll()`. A handler has no `&mut
/// AtEngine` available to it; issuing further AT commands from inside a
/// handler isn't supported; queue work for later instead.
pub trait EventSink {
    /// `index` is already converted to the library's 0-based convention -
    /// see `SmsStore::get`/`insert`/`erase`. Pass it straight through.
    fn on_sms_indication(&mut self, _memory: &str, _index: u32) {}
    fn on_sms(&mut self, _message: &DeliverPdu) {}
    fn on_cell_broadcast(&mut self, _pdu: &[u8]) {}
    fn on_status_report_indication(&mut self, _memory: &str, _index: u32) {}
    fn on_status_report(&mut self, _message: &StatusReportPdu) {}
    fn on_call(&mut self) {}
    fn on_other(&mut self, _resp: &AtResponse) {}

    /// Called for every unsolicited response; the default dispatches to the
    /// typed methods above based on the named response's parameter. Most
    /// implementations won't need to override this.
    fn dispatch(&mut self, resp: &AtResponse) {
        match resp {
            AtResponse::InformationResponse { param, response } if param == "+CMTI" => {
                if let Ok(list) = response.get_array() {
                    if let (Some(mem), Some(idx)) = (list.get(0), list.get(1)) {
                        if let (Ok(mem), Ok(idx)) = (mem.get_unknown().or_else(|_| mem.get_string()), idx.get_integer()) {
                            if let Some(zero_based) = idx.checked_sub(1) {
                                self.on_sms_indication(mem, zero_based);
                                return;
                            }
                        }
                    }
                }
                self.on_other(resp);
            }
            AtResponse::InformationResponse { param, response } if param == "+CMT" => {
                if let Ok(s) = response.get_unknown() {
                    if let Ok(bytes) = crate::pdu::HexData::decode(s) {
                        if let Ok(msg) = DeliverPdu::try_from(&bytes[..]) {
                            self.on_sms(&msg);
                            return;
                        }
                    }
                }
                self.on_other(resp);
            }
            AtResponse::InformationResponse { param, response } if param == "+CBM" => {
                if let Ok(s) = response.get_unknown() {
                    if let Ok(pdu) = crate::pdu::HexData::decode(s) {
                        self.on_cell_broadcast(&pdu);
                        return;
                    }
                }
                self.on_other(resp);
            }
            AtResponse::InformationResponse { param, response } if param == "+CDSI" => {
                if let Ok(list) = response.get_array() {
                    if let (Some(mem), Some(idx)) = (list.get(0), list.get(1)) {
                        if let (Ok(mem), Ok(idx)) = (mem.get_unknown().or_else(|_| mem.get_string()), idx.get_integer()) {
                            if let Some(zero_based) = idx.checked_sub(1) {
                                self.on_status_report_indication(mem, zero_based);
                                return;
                            }
                        }
                    }
                }
                self.on_other(resp);
            }
            AtResponse::InformationResponse { param, response } if param == "+CDS" => {
                if let Ok(s) = response.get_unknown() {
                    if let Ok(bytes) = crate::pdu::HexData::decode(s) {
                        if let Ok(msg) = StatusReportPdu::try_from(&bytes[..]) {
                            self.on_status_report(&msg);
                            return;
                        }
                    }
                }
                self.on_other(resp);
            }
            AtResponse::ResultCode(crate::at::AtResultCode::Ring) => self.on_call(),
            _ => self.on_other(resp),
        }
    }
}

/// An [`EventSink`] that discards everything. Used as the default when no
/// caller-supplied sink has been installed.
pub struct NullEventSink;
impl EventSink for NullEventSink {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::at::AtValue;

    #[derive(Default)]
    struct Capture {
        sms_indication: Option<(String, u32)>,
        status_report_indication: Option<(String, u32)>,
        sms: Option<Vec<u8>>,
        other: bool,
    }
    impl EventSink for Capture {
        fn on_sms_indication(&mut self, memory: &str, index: u32) {
            self.sms_indication = Some((memory.to_string(), index));
        }
        fn on_status_report_indication(&mut self, memory: &str, index: u32) {
            self.status_report_indication = Some((memory.to_string(), index));
        }
        fn on_sms(&mut self, message: &DeliverPdu) {
            self.sms = Some(message.as_bytes());
        }
        fn on_other(&mut self, _resp: &AtResponse) {
            self.other = true;
        }
    }

    #[test]
    fn cmti_dispatch_converts_wire_index_to_zero_based() {
        let resp = AtResponse::InformationResponse {
            param: "+CMTI".into(),
            response: AtValue::Array(vec![AtValue::String("SM".into()), AtValue::Integer(3)]),
        };
        let mut sink = Capture::default();
        sink.dispatch(&resp);
        assert_eq!(sink.sms_indication, Some(("SM".to_string(), 2)));
    }

    #[test]
    fn cdsi_dispatch_converts_wire_index_to_zero_based() {
        let resp = AtResponse::InformationResponse {
            param: "+CDSI".into(),
            response: AtValue::Array(vec![AtValue::String("SM".into()), AtValue::Integer(1)]),
        };
        let mut sink = Capture::default();
        sink.dispatch(&resp);
        assert_eq!(sink.status_report_indication, Some(("SM".to_string(), 0)));
    }

    #[test]
    fn cmti_with_zero_wire_index_is_not_dispatched() {
        // The wire index is 1-based; 0 isn't a valid slot, so this is
        // malformed input rather than slot 0.
        let resp = AtResponse::InformationResponse {
            param: "+CMTI".into(),
            response: AtValue::Array(vec![AtValue::String("SM".into()), AtValue::Integer(0)]),
        };
        let mut sink = Capture::default();
        sink.dispatch(&resp);
        assert_eq!(sink.sms_indication, None);
        assert!(sink.other);
    }

    #[test]
    fn cmt_dispatch_decodes_to_deliver_pdu_before_calling_on_sms() {
        let hex = "000002912100100000000000000000";
        let resp = AtResponse::InformationResponse { param: "+CMT".into(), response: AtValue::Unknown(hex.into()) };
        let mut sink = Capture::default();
        sink.dispatch(&resp);
        assert_eq!(sink.sms, Some(crate::pdu::HexData::decode(hex).unwrap()));
    }
}
