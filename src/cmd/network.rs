//! Functions for dealing with registration on a GSM network (signal quality, PIN, etc.)
use failure_derive::Fail;
use num_derive::FromPrimitive;

use crate::at::AtCommand;
use crate::errors::GsmError;
use crate::meta::MeTa;
use crate::util::GsmFromPrimitive;

/// The current registration state of the modem (from `AT+CREG`).
///
/// Modems have to be 'registered' (i.e. connected to) a given cellular network to be able to do
/// anything useful (text, call, etc.). Therefore, checking the registration state can be useful to
/// figure out why your modem isn't working.
#[repr(u8)]
#[derive(Fail, Debug, FromPrimitive, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RegistrationState {
    /// Not registered, and not searching for a new operator at present.
    #[fail(display = "Not registered; not searching for a new operator")]
    NotRegisteredAndDisabled = 0,
    /// Registered, and on our 'home' network (i.e. not roaming)
    #[fail(display = "Registered; on home network")]
    RegisteredHome = 1,
    /// Not registered, and searching for a new operator.
    #[fail(display = "Not registered; searching for a new operator")]
    NotRegisteredSearching = 2,
    /// Registration denied.
    #[fail(display = "Registration denied")]
    RegistrationDenied = 3,
    /// Registration state unknown.
    #[fail(display = "Unknown registration state")]
    Unknown = 4,
    /// Registered, and on a 'roaming' network.
    #[fail(display = "Registered; roaming")]
    RegisteredRoaming = 5,
}
impl RegistrationState {
    /// If the `RegistrationState` is either `RegisteredHome` or `RegisteredRoaming`, returns
    /// `true`. Otherwise, returns `false`.
    pub fn is_registered(&self) -> bool {
        use self::RegistrationState::*;

        matches!(*self, RegisteredHome | RegisteredRoaming)
    }
}
/// The current modem operation mode (from `AT+CFUN`).
///
/// Not all state transitions are necessarily allowed by a given device - in
/// particular, some devices refuse to go from offline back to online without
/// a restart.
#[repr(u8)]
#[derive(Fail, Debug, FromPrimitive, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModemOperationMode {
    /// Minimum functionality possible.
    ///
    /// In this mode, RF is disabled, but the SIM card is still powered.
    #[fail(display = "Minimum functionality; disable RF but keep SIM power")]
    MinimumFunctionality = 0,
    /// Online mode.
    #[fail(display = "Online mode")]
    OnlineMode = 1,
    /// Offline mode.
    #[fail(display = "Offline mode")]
    OfflineMode = 4,
    /// FTM mode.
    #[fail(display = "FTM mode")]
    FtmMode = 5,
    /// Restart the modem.
    #[fail(display = "Restart modem")]
    Restart = 6,
    /// Disable RF.
    #[fail(display = "Disable RF")]
    DisableRf = 7,
}
/// The PIN state of the modem (from `AT+CPIN`).
///
/// If the SIM is locked with a PIN, it must be entered before the device
/// will do anything useful.
#[derive(Fail, Debug, Copy, Clone, PartialEq, Eq)]
pub enum PinState {
    /// Ready - no password pending.
    #[fail(display = "Ready; no passwords required")]
    Ready,
    /// Waiting for a SIM PIN to be entered.
    #[fail(display = "SIM PIN required")]
    SimPin,
    /// Waiting for a SIM PUK to be given (i.e. the SIM PIN is blocked)
    #[fail(display = "SIM PUK required")]
    SimPuk,
    /// Waiting for a SIM PIN2 to be entered.
    #[fail(display = "SIM PIN2 required")]
    SimPin2,
    /// Waiting for a SIM PUK2 to be given (i.e. the SIM PIN2 is blocked)
    #[fail(display = "SIM PUK2 required")]
    SimPuk2,
}
impl PinState {
    pub(crate) fn from_string(st: &str) -> Result<Self, GsmError> {
        let r = match st {
            "READY" => PinState::Ready,
            "SIM PIN" => PinState::SimPin,
            "SIM PUK" => PinState::SimPuk,
            "SIM PIN2" => PinState::SimPin2,
            "SIM PUK2" => PinState::SimPuk2,
            oth => return Err(GsmError::ParameterError(format!("unrecognized +CPIN state {:?}", oth))),
        };
        Ok(r)
    }
}

/// Get the device's current registration state (`AT+CREG`).
pub fn get_registration(meta: &mut MeTa) -> Result<RegistrationState, GsmError> {
    let pkt = meta.engine_mut().chat(AtCommand::Read { param: "+CREG".into() })?;
    let reg = pkt
        .extract_named_response("+CREG")?
        .get_array()?
        .get(1)
        .ok_or_else(|| GsmError::ParameterError("+CREG: missing status field".into()))?
        .get_integer()?;
    RegistrationState::from_integer(*reg)
}
/// Get the device's current operation mode (`AT+CFUN`).
pub fn get_operation_mode(meta: &mut MeTa) -> Result<ModemOperationMode, GsmError> {
    let pkt = meta.engine_mut().chat(AtCommand::Read { param: "+CFUN".into() })?;
    let rpl = pkt.extract_named_response("+CFUN")?.get_integer()?;
    ModemOperationMode::from_integer(*rpl)
}
/// Set the device's operation mode (`AT+CFUN=`).
pub fn set_operation_mode(meta: &mut MeTa, mode: ModemOperationMode) -> Result<(), GsmError> {
    meta.engine_mut().chat(AtCommand::Equals {
        param: "+CFUN".into(),
        value: crate::at::AtValue::Integer(mode as u32),
    })?;
    Ok(())
}
/// Get the device's current PIN state (`AT+CPIN`).
pub fn get_pin_state(meta: &mut MeTa) -> Result<PinState, GsmError> {
    let pkt = meta.engine_mut().chat(AtCommand::Read { param: "+CPIN".into() })?;
    let rpl = pkt.extract_named_response("+CPIN")?.get_unknown()?;
    PinState::from_string(rpl)
}
/// Input `pin`, to unlock a locked SIM.
pub fn input_pin(meta: &mut MeTa, pin: &str) -> Result<(), GsmError> {
    let pkt = meta.engine_mut().chat(AtCommand::Equals {
        param: "+CPIN".into(),
        value: crate::at::AtValue::String(pin.to_string()),
    })?;
    pkt.assert_ok()
}
/// Signal quality, as returned by the device (`AT+CSQ`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SignalQuality {
    /// Received Signal Strength Indication (RSSI) value.
    ///
    /// - 0 -> less than or equal to -113 dBm
    /// - 1 -> -111 dBm
    /// - 2-30 -> -109 to -53 dBm
    /// - 31 -> greater than or equal to -51 dBm
    /// - 99 -> unknown or undetectable.
    pub rssi: u32,
    /// Channel bit error rate, in percent. Permanently 99 (unsupported) on
    /// some devices.
    pub ber: u32,
}
/// Get the device's current signal quality (`AT+CSQ`).
pub fn get_signal_quality(meta: &mut MeTa) -> Result<SignalQuality, GsmError> {
    let pkt = meta.engine_mut().chat(AtCommand::Execute { command: "+CSQ".into() })?;
    let rpl = pkt.extract_named_response("+CSQ")?.get_array()?;
    let rssi = rpl
        .get(0)
        .ok_or_else(|| GsmError::ParameterError("+CSQ: missing rssi field".into()))?
        .get_integer()?;
    let ber = rpl
        .get(1)
        .ok_or_else(|| GsmError::ParameterError("+CSQ: missing ber field".into()))?
        .get_integer()?;
    Ok(SignalQuality { rssi: *rssi, ber: *ber })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ModemConfig;
    use crate::port::MockPort;

    fn meta_with(mut port: MockPort) -> MeTa {
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
        MeTa::open(Box::new(port), ModemConfig::default()).unwrap()
    }

    #[test]
    fn signal_quality_parses() {
        let mut port = MockPort::new();
        port.push_response("+CSQ: 20,99");
        port.push_response("OK");
        let mut meta = meta_with(port);
        let sq = get_signal_quality(&mut meta).unwrap();
        assert_eq!(sq, SignalQuality { rssi: 20, ber: 99 });
    }

    #[test]
    fn pin_state_from_string() {
        assert_eq!(PinState::from_string("READY").unwrap(), PinState::Ready);
        assert_eq!(PinState::from_string("SIM PIN").unwrap(), PinState::SimPin);
        assert!(PinState::from_string("bogus").is_err());
    }
}
