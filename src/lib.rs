//! Drives a GSM terminal adapter (a mobile handset or modem attached over a
//! serial link) so host software can send and receive SMS, cell broadcast
//! and status-report messages, per ETSI GSM 07.05 and 07.07.
//!
//! The three layers are:
//!
//! - [`port`]/[`engine`] — a full-duplex, line-oriented AT chat that
//!   multiplexes synchronous command/response exchanges with asynchronous
//!   unsolicited indications arriving on the same line.
//! - [`parse`]/[`parser`] — parsing 07.07 response lines, from the generic
//!   value grammar up to the stateful mini-grammar used by capability
//!   queries like `+CNMI=?`.
//! - [`pdu`]/[`gsm_encoding`] — encoding and decoding of SMS-SUBMIT,
//!   SMS-DELIVER, SMS-STATUS-REPORT and SMS-SUBMIT-REPORT PDUs.
//!
//! [`meta::MeTa`] is the façade that ties these together: one serial port,
//! one [`engine::AtEngine`], a [`capabilities::Capabilities`] record
//! discovered at open time, and a cache of [`sms_store::SmsStore`] handles.
#[macro_use] extern crate log;
extern crate failure;
#[macro_use] extern crate failure_derive;
#[macro_use] extern crate nom;
extern crate encoding;
#[macro_use] extern crate derive_is_enum_variant;
extern crate num;
#[macro_use] extern crate num_derive;
extern crate rand;
extern crate serialport;

pub mod error_codes;
pub mod errors;
pub mod gsm_encoding;
pub mod at;
pub mod pdu;
pub mod parse;
pub mod parser;
pub mod port;
pub mod config;
pub mod capabilities;
pub mod event;
pub mod engine;
pub mod meta;
pub mod sms_store;
pub mod cmd;
pub mod util;

pub use errors::{GsmError, GsmResult};
pub use meta::MeTa;
