//! Error handling.
use std::io;
use crate::at::AtResultCode;
use crate::error_codes::CmsError;
use crate::parser::ParseError;
use failure::Fail;

/// Error `enum` for errors raised by this library.
///
/// Exhaustive matching is NOT guaranteed by the library API (!).
#[derive(Fail, Debug)]
pub enum GsmError {
    /// A parameter supplied by the caller was invalid for the command being
    /// issued (wrong type, out of range, or otherwise rejected before the
    /// command was ever sent to the device).
    #[fail(display = "invalid parameter: {}", _0)]
    ParameterError(String),
    /// The underlying serial line misbehaved: a write or read failed, or
    /// the port could not be configured.
    #[fail(display = "port error: {}", _0)]
    PortError(#[cause] io::Error),
    /// No response (or an incomplete response) arrived before the
    /// configured timeout expired.
    #[fail(display = "timed out waiting for a response")]
    TimeoutError,
    /// The device rejected a command outright, returning `ERROR`, a
    /// `+CME ERROR`, or a `+CMS ERROR`.
    #[fail(display = "command failed: {}", _0)]
    ChatError(#[cause] AtResultCode),
    /// The response parser couldn't make sense of a line from the device.
    #[fail(display = "malformed response: {}", _0)]
    ParserError(#[cause] ParseError),
    /// A PDU (as read from the device, or as constructed by the caller)
    /// was malformed.
    #[fail(display = "malformed PDU: {}", _0)]
    PduError(String),
    /// The attached device lacks a capability the caller asked this
    /// library to use.
    #[fail(display = "unsupported by this device: {}", _0)]
    CapabilityError(String),
    /// A local operating-system call (opening the serial device, say)
    /// failed outside the context of an established chat session.
    #[fail(display = "OS error: {}", _0)]
    OsError(String),
    /// Catch-all for conditions that don't fit any of the above.
    #[fail(display = "{}", _0)]
    OtherError(String),
    /// This shouldn't be shown, and is designed to stop you matching on this `enum` exhaustively.
    /// If you do that, yo' code gonna break!
    #[fail(display = "[this should never be shown]")]
    #[doc(hidden)]
    __Nonexhaustive,
}
impl From<io::Error> for GsmError {
    fn from(e: io::Error) -> GsmError {
        GsmError::PortError(e)
    }
}
impl From<ParseError> for GsmError {
    fn from(e: ParseError) -> GsmError {
        GsmError::ParserError(e)
    }
}
impl From<CmsError> for GsmError {
    fn from(e: CmsError) -> GsmError {
        GsmError::ChatError(AtResultCode::CmsError(e))
    }
}
impl From<::serialport::Error> for GsmError {
    fn from(e: ::serialport::Error) -> GsmError {
        GsmError::OsError(e.to_string())
    }
}
/// Bog-standard result type alias.
pub type GsmResult<T> = Result<T, GsmError>;
