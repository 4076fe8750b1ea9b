//! Typed façade functions layered on top of [`crate::meta::MeTa`].
//!
//! Each function here issues one AT command via `MeTa::engine_mut()` and
//! parses the response into a typed result, so callers don't need the 07.07
//! spec open in another window for the common cases.
pub mod network;
pub mod sms;
