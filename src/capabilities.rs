//! Device quirks discovered (or assumed) at `MeTa::open` time.
//!
//! Ported from `gsmlib::Capabilities` - terminal adapters disagree on
//! details the 07.05/07.07 spec leaves as "implementation defined", and
//! probing for them up front means the rest of the library doesn't have to
//! special-case individual devices.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Whether `+CMGW`/`+CMGS` expect the SMSC address octet prefixed onto
    /// the PDU (`true`, the common case) or omit it entirely (some older
    /// Ericsson firmwares, and anything with [`ModemConfig::force_no_sca_prefix`](crate::config::ModemConfig::force_no_sca_prefix) set).
    pub has_sms_sca_prefix: bool,
    /// Number of parameters `+CPMS` takes, as discovered from `+CPMS=?`.
    /// `None` until the first call that needs to know (`MeTa::set_sms_store`).
    pub cpms_param_count: Option<usize>,
}
impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            has_sms_sca_prefix: true,
            cpms_param_count: None,
        }
    }
}
