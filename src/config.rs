//! Caller-supplied configuration for opening a [`crate::meta::MeTa`].
use std::time::Duration;

/// Tunables that gsmlib used to keep as process-global state (a debug flag,
/// an environment variable). Threading them through explicitly instead
/// means two `MeTa`s in the same process can talk to different devices
/// with different quirks.
#[derive(Debug, Clone)]
pub struct ModemConfig {
    /// Baud rate to open the serial device at.
    pub baud_rate: u32,
    /// How long to wait for a response to an ordinary command.
    pub default_timeout: Duration,
    /// String sent to the device immediately after opening, before
    /// `init()` runs its own setup commands (`ATZ`, say). Empty by default.
    pub init_string: String,
    /// Force the "no SCA prefix in `+CMGW`/`+CMGS`" workaround on, without
    /// relying on autodetection via `AT+CGMI`/`AT+CGMM`.
    ///
    /// gsmlib versions this as the `GSMLIB_SH888_FIX` environment variable;
    /// some Ericsson firmwares need it and don't self-identify cleanly.
    pub force_no_sca_prefix: bool,
}
impl Default for ModemConfig {
    fn default() -> Self {
        ModemConfig {
            baud_rate: 9600,
            default_timeout: Duration::from_secs(5),
            init_string: String::new(),
            force_no_sca_prefix: false,
        }
    }
}
