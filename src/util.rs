//! Miscellaneous small helpers shared across modules.
use num::FromPrimitive;
use crate::errors::GsmError;
use crate::at::AtValue;

/// Convenience wrapper around `num::FromPrimitive` that turns a failed
/// conversion into a [`GsmError::ParameterError`] instead of an `Option`.
pub trait GsmFromPrimitive where Self: Sized {
    fn from_integer(i: u32) -> Result<Self, GsmError>;
}
impl<T> GsmFromPrimitive for T where T: FromPrimitive {
    fn from_integer(i: u32) -> Result<T, GsmError> {
        if let Some(s) = T::from_u32(i) {
            Ok(s)
        }
        else {
            Err(GsmError::ParameterError(format!("value {} out of range", AtValue::Integer(i))))
        }
    }
}
