//! The `MeTa` façade: bundles one port, one [`AtEngine`], a discovered
//! [`Capabilities`] record, and caches of open SMS stores.
//!
//! Ported from `gsmlib::MeTa` (`gsm_me_ta.cc`) - this is the type
//! application code actually constructs and calls. Everything below it
//! (`AtEngine`, `Port`, `Parser`) is implementation detail a caller
//! shouldn't need to reach for directly.
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use log::debug;

use crate::at::{AtCommand, AtResponsePacket, AtValue};
use crate::capabilities::Capabilities;
use crate::config::ModemConfig;
use crate::engine::AtEngine;
use crate::errors::GsmError;
use crate::event::EventSink;
use crate::parser::Parser;
use crate::pdu::{AckPdu, HexData, Pdu, PduAddress};
use crate::port::Port;
use crate::sms_store::SmsStore;

/// Identifying information queried from the device at open time
/// (`AT+CGMI`/`+CGMM`/`+CGMR`/`+CGSN`).
#[derive(Debug, Clone, Default)]
pub struct MeInfo {
    pub manufacturer: String,
    pub model: String,
    pub revision: String,
    pub serial_number: String,
}

/// Current registration/routing state of unsolicited SMS delivery, as
/// reported by `AT+CNMI?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmsRouting {
    pub sms_routed: bool,
    pub cb_routed: bool,
    pub status_reports_routed: bool,
}

/// One entry of a `+COPS=?` operator list.
#[derive(Debug, Clone, Default)]
pub struct OperatorInfo {
    pub status: Option<i64>,
    pub long_name: String,
    pub short_name: String,
    pub numeric_name: String,
}

/// A `+CCFC` call-forwarding query result for one service class.
#[derive(Debug, Clone, Default)]
pub struct ForwardInfo {
    pub active: bool,
    pub number: String,
    /// `(value, type-of-subaddress)`, GSM 07.07 §7.11's `<subaddr>`/`<satype>`.
    pub subaddress: Option<(String, u8)>,
    pub time: Option<i64>,
}

/// Known manufacturer/model pairs that need the "no SCA prefix" workaround
/// on `+CMGW`/`+CMGS`, ported from `gsmlib::MeTa::init`.
const BROKEN_SCA_PREFIX_DEVICES: &[(&str, &str)] = &[
    ("ERICSSON", "1100801"),
    ("ERICSSON", "1140801"),
];

/// The façade type applications build around: one serial line, one AT
/// engine, and everything `MeTa::open` discovers about what's on the other
/// end of it.
pub struct MeTa {
    engine: AtEngine,
    config: ModemConfig,
    capabilities: Capabilities,
    info: MeInfo,
    current_sms_store: Option<String>,
    stores: HashMap<String, Rc<SmsStore>>,
}
impl MeTa {
    /// Open `port` and run the same discovery sequence `gsmlib::MeTa::init`
    /// does: enable extended errors (allowed to fail), force PDU mode
    /// (required), read identification, and apply known-device quirks.
    pub fn open(port: Box<dyn Port>, config: ModemConfig) -> Result<MeTa, GsmError> {
        let mut engine = AtEngine::new(port, config.default_timeout);
        if !config.init_string.is_empty() {
            engine.chat(AtCommand::Text {
                text: config.init_string.clone(),
                expected: vec![],
            })?;
        }

        // Allowed to fail: some TAs don't support extended error reporting.
        let _ = engine.chat(AtCommand::Equals { param: "+CMEE".into(), value: AtValue::Integer(1) });
        // Required: this crate only ever speaks PDU mode.
        engine.chat(AtCommand::Equals { param: "+CMGF".into(), value: AtValue::Integer(0) })?;

        let info = MeInfo {
            manufacturer: read_info_field(&mut engine, "+CGMI")?,
            model: read_info_field(&mut engine, "+CGMM")?,
            revision: read_info_field(&mut engine, "+CGMR")?,
            serial_number: read_info_field(&mut engine, "+CGSN")?,
        };

        let mut capabilities = Capabilities::default();
        let known_broken = BROKEN_SCA_PREFIX_DEVICES
            .iter()
            .any(|&(man, model)| info.manufacturer == man && info.model == model);
        if known_broken || config.force_no_sca_prefix {
            debug!("device {}/{} needs the no-SCA-prefix workaround", info.manufacturer, info.model);
            capabilities.has_sms_sca_prefix = false;
        }

        Ok(MeTa {
            engine,
            config,
            capabilities,
            info,
            current_sms_store: None,
            stores: HashMap::new(),
        })
    }

    pub fn info(&self) -> &MeInfo {
        &self.info
    }
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
    pub fn config(&self) -> &ModemConfig {
        &self.config
    }
    pub fn engine_mut(&mut self) -> &mut AtEngine {
        &mut self.engine
    }
    /// Install (or replace) the handler that receives unsolicited
    /// indications noticed by `chat`/`poll`.
    pub fn set_event_handler(&mut self, handler: Box<dyn EventSink>) {
        self.engine.set_event_sink(handler);
    }
    /// Passive readiness check, delegated straight to the port.
    pub fn wait_event(&mut self, timeout: Duration) -> Result<(), GsmError> {
        self.engine.poll(timeout)
    }

    /// Select `name` (`"SM"`, `"ME"`, `"MT"`, ...) as the current SMS
    /// store. Re-issues `+CPMS` only when the name differs from the last
    /// call, or `need_result_code` forces a fresh round-trip; on a skipped
    /// call, returns `None`. On a call that hits the wire, returns the raw
    /// `+CPMS` response text (comma-separated integers, parseable with
    /// [`Parser`]).
    pub fn set_sms_store(&mut self, name: &str, need_result_code: bool) -> Result<Option<String>, GsmError> {
        let arity = self.cpms_arity()?;
        if !need_result_code && self.current_sms_store.as_deref() == Some(name) {
            return Ok(None);
        }
        let value = AtValue::Array(vec![AtValue::String(name.to_string()); arity]);
        let pkt = self.engine.chat(AtCommand::Equals { param: "+CPMS".into(), value })?;
        self.current_sms_store = Some(name.to_string());
        let resp = pkt.extract_named_response("+CPMS")?;
        Ok(Some(resp.to_string()))
    }

    fn cpms_arity(&mut self) -> Result<usize, GsmError> {
        if let Some(n) = self.capabilities.cpms_param_count {
            return Ok(n);
        }
        let pkt = self.engine.chat(AtCommand::Test { param: "+CPMS".into() })?;
        let val = pkt.extract_named_response("+CPMS")?;
        let n = match val {
            AtValue::Array(items) => items.len(),
            _ => 1,
        };
        self.capabilities.cpms_param_count = Some(n);
        Ok(n)
    }

    /// Get (opening and caching if necessary) a handle onto the named SMS
    /// store. Capacity is discovered from a forced `+CPMS` round-trip the
    /// first time a given name is opened.
    pub fn get_sms_store(&mut self, name: &str) -> Result<Rc<SmsStore>, GsmError> {
        if let Some(store) = self.stores.get(name) {
            return Ok(store.clone());
        }
        let resp = self
            .set_sms_store(name, true)?
            .ok_or_else(|| GsmError::OtherError("+CPMS returned no result".into()))?;
        let mut p = Parser::new(&resp);
        let _used = p.parse_int(false)?;
        p.parse_comma(false)?;
        let total = p.parse_int(false)?;
        let store = Rc::new(SmsStore::new(name.to_string(), total.max(0) as usize));
        self.stores.insert(name.to_string(), store.clone());
        Ok(store)
    }

    /// `AT+CSMS=<level>`. Some devices don't support service-level
    /// selection at all; per `gsmlib`, that failure is swallowed.
    pub fn set_message_service(&mut self, level: u32) -> Result<(), GsmError> {
        match self.engine.chat(AtCommand::Equals { param: "+CSMS".into(), value: AtValue::Integer(level) }) {
            Ok(_) => Ok(()),
            Err(GsmError::ChatError(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
    pub fn get_message_service(&mut self) -> Result<u32, GsmError> {
        let pkt = self.engine.chat(AtCommand::Read { param: "+CSMS".into() })?;
        let val = pkt.extract_named_response("+CSMS")?;
        let s = val.to_string();
        let mut p = Parser::new(&s);
        Ok(p.parse_int(false)? as u32)
    }

    /// Current SMS/CB/status-report routing, as reported by `AT+CNMI?`.
    pub fn get_sms_routing_to_ta(&mut self) -> Result<SmsRouting, GsmError> {
        let pkt = self.engine.chat(AtCommand::Read { param: "+CNMI".into() })?;
        let val = pkt.extract_named_response("+CNMI")?;
        let s = val.to_string();
        let mut p = Parser::new(&s);
        let _mode = p.parse_int(false)?;
        let mut sms_mode = 0;
        let mut cb_mode = 0;
        let mut stat_mode = 0;
        if p.parse_comma(true)? {
            sms_mode = p.parse_int(true)?;
            if p.parse_comma(true)? {
                cb_mode = p.parse_int(true)?;
                if p.parse_comma(true)? {
                    stat_mode = p.parse_int(true)?;
                }
            }
        }
        Ok(SmsRouting {
            sms_routed: sms_mode == 2 || sms_mode == 3,
            cb_routed: cb_mode == 2 || cb_mode == 3,
            status_reports_routed: stat_mode == 1,
        })
    }

    /// Negotiate and apply the best available `+CNMI` combination for the
    /// requested routing, preferring direct delivery over a store-and-notify
    /// indication where the device offers both; ported from
    /// `gsmlib::MeTa::setSMSRoutingToTA`.
    pub fn set_sms_routing_to_ta(
        &mut self,
        sms: bool,
        cb: bool,
        stat: bool,
        only_indication: bool,
    ) -> Result<(), GsmError> {
        let pkt = self.engine.chat(AtCommand::Test { param: "+CNMI".into() })?;
        let val = pkt.extract_named_response("+CNMI")?;
        let canonical = val.to_string();
        let mut p = Parser::new(&canonical);
        let modes = p.parse_int_list(false, false)?;
        let mts = if p.parse_comma(true)? { p.parse_int_list(false, false)? } else { vec![true] };
        let bms = if p.parse_comma(true)? { p.parse_int_list(false, false)? } else { vec![true] };
        let dss = if p.parse_comma(true)? { p.parse_int_list(false, false)? } else { vec![true] };
        let bfrs = if p.parse_comma(true)? { Some(p.parse_int_list(false, false)?) } else { None };

        let mode = select(&modes, &[2, 1, 0, 3])
            .ok_or_else(|| GsmError::CapabilityError("no supported +CNMI mode".into()))?;
        let mt = if sms {
            let prefs: &[usize] = if only_indication { &[1] } else { &[2, 3] };
            select(&mts, prefs).ok_or_else(|| GsmError::CapabilityError("cannot route SMS messages to TE".into()))?
        } else {
            0
        };
        let bm = if cb {
            let prefs: &[usize] = if only_indication { &[1, 2] } else { &[2, 3] };
            select(&bms, prefs)
                .ok_or_else(|| GsmError::CapabilityError("cannot route cell broadcast messages to TE".into()))?
        } else {
            0
        };
        let ds = if stat {
            let prefs: &[usize] = if only_indication { &[2] } else { &[1, 2] };
            select(&dss, prefs)
                .ok_or_else(|| GsmError::CapabilityError("cannot route status report messages to TE".into()))?
        } else {
            0
        };

        let mut value = vec![
            AtValue::Integer(mode as u32),
            AtValue::Integer(mt as u32),
            AtValue::Integer(bm as u32),
            AtValue::Integer(ds as u32),
        ];
        if let Some(bfrs) = bfrs {
            let bfr = select(&bfrs, &[1, 0]).unwrap_or(0);
            value.push(AtValue::Integer(bfr as u32));
        }
        self.engine.chat(AtCommand::Equals { param: "+CNMI".into(), value: AtValue::Array(value) })?;
        Ok(())
    }

    /// Send `pdu` via `AT+CMGS`, returning the TP-Message-Reference and, if
    /// the device emitted one, the decoded acknowledgement PDU.
    pub fn send_sms(&mut self, pdu: &Pdu) -> Result<(u32, Option<AckPdu>), GsmError> {
        let (bytes, tpdu_len) = pdu.as_bytes();
        let cmd = AtCommand::Equals { param: "+CMGS".into(), value: AtValue::Integer(tpdu_len as u32) };
        let pdu_hex = HexData(&bytes).to_string();
        let pkt = self.engine.send_pdu(cmd, &pdu_hex, self.config.default_timeout)?;
        let val = pkt.extract_named_response("+CMGS")?;
        let arr = match val {
            AtValue::Array(a) => a.clone(),
            other => vec![other.clone()],
        };
        let message_reference = *arr
            .get(0)
            .ok_or_else(|| GsmError::ParameterError("+CMGS: missing message reference".into()))?
            .get_integer()?;
        let ack = match arr.get(1) {
            Some(v) => {
                let hex = match v.get_unknown() {
                    Ok(s) => s.clone(),
                    Err(_) => v.get_string()?.clone(),
                };
                let mut raw = HexData::decode(&hex)?;
                if !self.capabilities.has_sms_sca_prefix {
                    let mut prefixed = vec![0u8];
                    prefixed.extend(raw);
                    raw = prefixed;
                }
                Some(AckPdu::try_from_bytes(&raw)?)
            }
            None => None,
        };
        Ok((message_reference, ack))
    }

    /// `AT+COPS=?` - the list of operators the device can see, plus their
    /// long/short/numeric names. Ported from
    /// `gsmlib::MeTa::getAvailableOPInfo`, which tolerates three different
    /// response shapes devices actually send (bracketed quadruplets,
    /// several lines of them, or bracket-less quadruplets with trailing
    /// junk on some Nokia firmwares).
    pub fn get_available_op_info(&mut self) -> Result<Vec<OperatorInfo>, GsmError> {
        let pkt = self.engine.chat(AtCommand::Test { param: "+COPS".into() })?;
        let val = pkt.extract_named_response("+COPS")?;
        let canonical = val.to_string();
        let mut p = Parser::new(&canonical);
        let mut result = vec![];
        loop {
            if p.at_eof() || p.parse_comma(true)? {
                break;
            }
            let expect_close = p.parse_char('(', true)?;
            let status = p.parse_int(true)?;
            p.parse_comma(false)?;
            let long_name = p.parse_string(true, false)?;
            p.parse_comma(false)?;
            let short_name = p.parse_string(true, false)?;
            p.parse_comma(false)?;
            let numeric_name = p.parse_string(true, false)?;
            if expect_close {
                p.parse_char(')', false)?;
            }
            p.parse_comma(true)?;
            result.push(OperatorInfo {
                status: if status < 0 { None } else { Some(status) },
                long_name,
                short_name,
                numeric_name,
            });
            if !expect_close {
                break;
            }
        }
        Ok(result)
    }

    /// `AT+CSCA?` - the SMSC address currently configured on the device.
    pub fn get_sca(&mut self) -> Result<PduAddress, GsmError> {
        let pkt = self.engine.chat(AtCommand::Read { param: "+CSCA".into() })?;
        let val = pkt.extract_named_response("+CSCA")?;
        let s = val.to_string();
        let mut p = Parser::new(&s);
        let number = p.parse_string(false, false)?;
        number.parse()
    }
    /// `AT+CSCA=` - set the SMSC address the device should route via.
    pub fn set_sca(&mut self, addr: &PduAddress) -> Result<(), GsmError> {
        self.engine.chat(AtCommand::Equals {
            param: "+CSCA".into(),
            value: AtValue::String(addr.to_string()),
        })?;
        Ok(())
    }

    /// `AT+CLIP=` - enable/disable caller-line-identification presentation.
    pub fn set_clip_presentation(&mut self, enable: bool) -> Result<(), GsmError> {
        self.engine.chat(AtCommand::Equals {
            param: "+CLIP".into(),
            value: AtValue::Integer(if enable { 1 } else { 0 }),
        })?;
        Ok(())
    }
    /// `AT+CLIP?` - whether CLIP presentation is currently enabled.
    pub fn get_clip_presentation(&mut self) -> Result<bool, GsmError> {
        let pkt = self.engine.chat(AtCommand::Read { param: "+CLIP".into() })?;
        let val = pkt.extract_named_response("+CLIP")?;
        let s = val.to_string();
        let mut p = Parser::new(&s);
        Ok(p.parse_int(false)? == 1)
    }

    /// `AT+CBC` - battery charge status (0 = powered by AC, 1 = charging,
    /// 2 = discharging) and charge percentage.
    pub fn get_battery_charge(&mut self) -> Result<(u32, u32), GsmError> {
        let pkt = self.engine.chat(AtCommand::Execute { command: "+CBC".into() })?;
        let val = pkt.extract_named_response("+CBC")?;
        let s = val.to_string();
        let mut p = Parser::new(&s);
        let status = p.parse_int(false)? as u32;
        p.parse_comma(false)?;
        let charge = p.parse_int(false)? as u32;
        Ok((status, charge))
    }

    /// `AT+CPWD=` - change a facility's password (`AT+CLCK`'s `<fac>`).
    pub fn set_password(&mut self, facility: &str, old_password: &str, new_password: &str) -> Result<(), GsmError> {
        self.engine.chat(AtCommand::Equals {
            param: "+CPWD".into(),
            value: AtValue::Array(vec![
                AtValue::String(facility.to_string()),
                AtValue::String(old_password.to_string()),
                AtValue::String(new_password.to_string()),
            ]),
        })?;
        Ok(())
    }
    /// `AT+CLCK=` - lock or unlock a facility (e.g. `"SC"` for the SIM
    /// PIN), optionally with a password.
    pub fn set_facility_lock(&mut self, facility: &str, lock: bool, password: Option<&str>) -> Result<(), GsmError> {
        let mut items = vec![
            AtValue::String(facility.to_string()),
            AtValue::Integer(if lock { 1 } else { 0 }),
        ];
        if let Some(pw) = password {
            items.push(AtValue::String(pw.to_string()));
        }
        self.engine.chat(AtCommand::Equals { param: "+CLCK".into(), value: AtValue::Array(items) })?;
        Ok(())
    }

    /// `AT+CCFC=<reason>,<mode>,...` - set up (or cancel) call forwarding.
    /// `subaddress` is `(value, type-of-subaddress)`, encoded in full
    /// rather than dropped (see `DESIGN.md`'s note on this Open Question).
    pub fn set_call_forwarding(
        &mut self,
        reason: u8,
        mode: u8,
        number: Option<&PduAddress>,
        class: Option<u8>,
        subaddress: Option<(&str, u8)>,
        forward_time: Option<u8>,
    ) -> Result<(), GsmError> {
        if let Some(t) = forward_time {
            if t > 30 {
                return Err(GsmError::ParameterError("call forward time must be in the range 0..30".into()));
            }
        }
        let mut items = vec![AtValue::Integer(reason as u32), AtValue::Integer(mode as u32)];
        if let Some(number) = number {
            items.push(AtValue::String(number.to_string()));
            items.push(AtValue::Integer(u8::from(number.type_addr) as u32));
            items.push(match class {
                Some(c) => AtValue::Integer(c as u32),
                None => AtValue::Empty,
            });
            if let Some((sub, satype)) = subaddress {
                items.push(AtValue::String(sub.to_string()));
                items.push(AtValue::Integer(satype as u32));
            }
            if let Some(t) = forward_time {
                if subaddress.is_none() {
                    items.push(AtValue::Empty);
                    items.push(AtValue::Empty);
                }
                items.push(AtValue::Integer(t as u32));
            }
        }
        self.engine.chat(AtCommand::Equals { param: "+CCFC".into(), value: AtValue::Array(items) })?;
        Ok(())
    }

    /// `AT+CCFC=<reason>,2` - query current call-forwarding state for
    /// voice/fax/data. Ported from `gsmlib::MeTa::getCallForwardInfo`.
    pub fn get_call_forward_info(&mut self, reason: u8) -> Result<(ForwardInfo, ForwardInfo, ForwardInfo), GsmError> {
        let pkt = self.engine.chat(AtCommand::Equals {
            param: "+CCFC".into(),
            value: AtValue::Array(vec![AtValue::Integer(reason as u32), AtValue::Integer(2)]),
        })?;
        let mut voice = ForwardInfo::default();
        let mut fax = ForwardInfo::default();
        let mut data = ForwardInfo::default();
        for resp in &pkt.responses {
            if let crate::at::AtResponse::InformationResponse { param, response } = resp {
                if param != "+CCFC" {
                    continue;
                }
                let s = response.to_string();
                let mut p = Parser::new(&s);
                let status = p.parse_int(false)?;
                p.parse_comma(false)?;
                let class = p.parse_int(false)?;
                let mut number = String::new();
                let mut subaddress = None;
                let mut time = None;
                if p.parse_comma(true)? {
                    number = p.parse_string(false, false)?;
                    p.parse_comma(false)?;
                    let number_type = p.parse_int(false)?;
                    if number_type == 145 {
                        number = format!("+{}", number);
                    }
                    if p.parse_comma(true)? {
                        let sub = p.parse_string(true, false)?;
                        p.parse_comma(false)?;
                        let satype = p.parse_int(true)?;
                        subaddress = Some((sub, satype.max(0) as u8));
                        if p.parse_comma(true)? {
                            time = Some(p.parse_int(false)?);
                        }
                    }
                }
                let info = ForwardInfo { active: status == 1, number, subaddress, time };
                match class {
                    1 => voice = info,
                    2 => data = info,
                    4 => fax = info,
                    _ => {}
                }
            }
        }
        Ok((voice, fax, data))
    }
}

fn read_info_field(engine: &mut AtEngine, param: &str) -> Result<String, GsmError> {
    // Some TAs just return OK and no info line; that's not an error, it
    // just leaves the field empty.
    let pkt: AtResponsePacket = engine.chat(AtCommand::Execute { command: param.to_string() })?;
    match pkt.extract_named_response_opt(param)? {
        Some(val) => Ok(val.to_string()),
        None => Ok(String::new()),
    }
}

fn select(bitmap: &[bool], prefs: &[usize]) -> Option<usize> {
    prefs.iter().copied().find(|&i| bitmap.get(i).copied().unwrap_or(false))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::port::MockPort;

    fn meta_with(port: MockPort) -> MeTa {
        let mut port = port;
        port.push_response("OK"); // +CMEE=1
        port.push_response("OK"); // +CMGF=0
        port.push_response("+CGMI: \"FAKE\"");
        port.push_response("OK");
        port.push_response("+CGMM: \"MODEM\"");
        port.push_response("OK");
        port.push_response("+CGMR: \"1.0\"");
        port.push_response("OK");
        port.push_response("+CGSN: \"1234567890\"");
        port.push_response("OK");
        MeTa::open(Box::new(port), ModemConfig::default()).unwrap()
    }

    #[test]
    fn open_populates_info() {
        let meta = meta_with(MockPort::new());
        assert_eq!(meta.info().manufacturer, "FAKE");
        assert_eq!(meta.info().model, "MODEM");
    }

    #[test]
    fn set_sms_store_is_lazy() {
        let mut meta = meta_with(MockPort::new());
        assert!(meta.capabilities().cpms_param_count.is_none());

        fn push(meta: &mut MeTa, lines: &[&str]) {
            let mock = meta.engine_mut().port_mut().as_any_mut().downcast_mut::<MockPort>().unwrap();
            for l in lines {
                mock.push_response(l);
            }
        }

        // +CPMS=? arity discovery, then the first +CPMS=<name> round-trip.
        push(&mut meta, &["+CPMS: (\"SM\",\"ME\"),(\"SM\",\"ME\"),(\"SM\",\"ME\")", "OK"]);
        push(&mut meta, &["+CPMS: 1,20,1,20,1,20", "OK"]);
        assert!(meta.set_sms_store("SM", false).unwrap().is_some());
        assert_eq!(meta.capabilities().cpms_param_count, Some(3));

        // Same name again: no wire round-trip queued, so this would fail on
        // a timeout if the façade re-issued +CPMS.
        assert_eq!(meta.set_sms_store("SM", false).unwrap(), None);

        // A different name: exactly one more +CPMS round-trip.
        push(&mut meta, &["+CPMS: 0,20,1,20,1,20", "OK"]);
        assert!(meta.set_sms_store("ME", false).unwrap().is_some());

        let mock = meta.engine_mut().port_mut().as_any_mut().downcast_mut::<MockPort>().unwrap();
        let cpms_sets: Vec<_> = mock.written.iter().filter(|l| l.starts_with("AT+CPMS=")).collect();
        assert_eq!(cpms_sets, vec!["AT+CPMS=\"SM\",\"SM\",\"SM\"", "AT+CPMS=\"ME\",\"ME\",\"ME\""]);
    }

    #[test]
    fn cnmi_negotiation_matches_spec_scenario() {
        let mut port = MockPort::new();
        port.push_response("OK");
        port.push_response("OK");
        port.push_response("+CGMI: \"FAKE\"");
        port.push_response("OK");
        port.push_response("+CGMM: \"MODEM\"");
        port.push_response("OK");
        port.push_response("+CGMR: \"1.0\"");
        port.push_response("OK");
        port.push_response("+CGSN: \"1234567890\"");
        port.push_response("OK");
        port.push_response("+CNMI: (0-3),(0-2),(0,2),(0-2),(0,1)");
        port.push_response("OK");
        port.push_response("OK");
        let mut meta = MeTa::open(Box::new(port), ModemConfig::default()).unwrap();
        meta.set_sms_routing_to_ta(true, true, true, true).unwrap();
        let mock = meta
            .engine_mut()
            .port_mut()
            .as_any_mut()
            .downcast_mut::<MockPort>()
            .unwrap();
        assert_eq!(mock.written.last(), Some(&"AT+CNMI=2,1,2,2,1".to_string()));
    }
}
