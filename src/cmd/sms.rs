//! Listing, notifying on, and deleting SMS messages that live in the
//! device's own memory store, independent of any particular [`SmsStore`]
//! handle.
//!
//! This module only speaks PDU mode - see [`crate::pdu`] for the wire
//! format. `MeTa::open` already forces the device into PDU mode, so nothing
//! here needs to touch `+CMGF` itself.
use std::convert::TryFrom;

use crate::at::{AtCommand, AtResponse, AtValue};
use crate::errors::GsmError;
use crate::meta::MeTa;
use crate::pdu::{DeliverPdu, HexData, PduDirection, SmsMessage};
use crate::sms_store::MessageStatus;
use crate::util::GsmFromPrimitive;

/// Controls whether to notify the TE about new messages (`AT+CNMI`'s
/// `<mode>`). Direct, unnegotiated access to the same parameter
/// [`MeTa::set_sms_routing_to_ta`] negotiates against device capabilities -
/// use that unless a specific combination is already known to be supported.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NewMessageNotification {
    /// Buffer new message indications in the ME, overwriting old indications if necessary.
    BufferInMe = 0,
    /// Send SMS-DELIVER indications to the TE, discarding them if they cannot be sent
    /// (for example, when in online data mode).
    SendDirectlyOrDiscard = 1,
    /// Send SMS-DELIVER indications to the TE, buffering them and sending them later if they
    /// cannot be sent.
    SendDirectlyOrBuffer = 2,
}
/// Controls how new messages are saved, and how indications are sent to the TE (`AT+CNMI`'s `<mt>`).
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NewMessageStorage {
    /// Do not route any SMS-DELIVER indications to the TE.
    RouteNothing = 0,
    /// Store SMS-DELIVER indications on the MT, and send a `+CMTI: <mem>,<index>` URC.
    StoreAndNotify = 1,
    /// Directly forward the SMS-DELIVER indication, as a `+CMT:
    /// [<reserved>],<length><CR><LF><pdu>` URC.
    SendDirectly = 2,
    /// Store SMS-DELIVER indications on the MT, but don't notify the TE.
    StoreAndDiscardNotification = 3,
}
/// Controls which messages to delete (`AT+CMGD`'s `<delflag>`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeletionOptions {
    /// Delete the message stored at the index specified.
    Indexed(u32),
    /// Delete all read messages, keeping unread, sent, and unsent ones.
    DeleteRead,
    /// Delete all read and sent messages, keeping unread and unsent ones.
    DeleteReadAndSent,
    /// Delete all read, sent, and unsent messages, keeping unread ones.
    DeleteReadAndOutgoing,
    /// Delete all messages.
    DeleteAll,
}
/// One entry of an `AT+CMGL` listing.
#[derive(Debug, Clone)]
pub struct ListedMessage {
    /// The message's index in the device's memory (pass to `del_sms_pdu` to remove it).
    pub index: u32,
    /// Stored status (read, unread, sent, unsent).
    pub status: MessageStatus,
    /// The message's raw SMS PDU bytes.
    pub raw_pdu: Vec<u8>,
    /// The decoded message.
    pub message: SmsMessage,
}

/// Set a direct, unnegotiated `AT+CNMI=<mode>,<mt>` combination.
pub fn set_new_message_indications(
    meta: &mut MeTa,
    mode: NewMessageNotification,
    mt: NewMessageStorage,
) -> Result<(), GsmError> {
    meta.engine_mut().chat(AtCommand::Equals {
        param: "+CNMI".into(),
        value: AtValue::Array(vec![AtValue::Integer(mode as u32), AtValue::Integer(mt as u32)]),
    })?;
    Ok(())
}
/// Delete one or more messages from the device's message store (`AT+CMGD`).
pub fn del_sms_pdu(meta: &mut MeTa, del: DeletionOptions) -> Result<(), GsmError> {
    use self::DeletionOptions::*;

    let (index, delflag) = match del {
        Indexed(i) => (i, 0),
        DeleteRead => (0, 1),
        DeleteReadAndSent => (0, 2),
        DeleteReadAndOutgoing => (0, 3),
        DeleteAll => (0, 4),
    };
    meta.engine_mut().chat(AtCommand::Equals {
        param: "+CMGD".into(),
        value: AtValue::Array(vec![AtValue::Integer(index), AtValue::Integer(delflag)]),
    })?;
    Ok(())
}
/// List messages matching `status` from the device's message store
/// (`AT+CMGL`). `status = MessageStatus::All` lists everything.
pub fn list_sms_pdu(meta: &mut MeTa, status: MessageStatus) -> Result<Vec<ListedMessage>, GsmError> {
    let pkt = meta.engine_mut().chat(AtCommand::Equals {
        param: "+CMGL".into(),
        value: AtValue::Integer(status as u32),
    })?;
    let mut cur = None;
    let mut ret = vec![];
    for resp in pkt.responses {
        match resp {
            AtResponse::InformationResponse { param, response } => {
                if param != "+CMGL" {
                    continue;
                }
                let list = response.get_array()?;
                let index = list
                    .get(0)
                    .ok_or_else(|| GsmError::ParameterError("+CMGL: missing index".into()))?
                    .get_integer()?;
                let stat = list
                    .get(1)
                    .ok_or_else(|| GsmError::ParameterError("+CMGL: missing status".into()))?
                    .get_integer()?;
                let stat = MessageStatus::from_integer(*stat)?;
                cur = Some((*index, stat));
            }
            AtResponse::Unknown(ref st) => {
                if !st.trim().is_empty() {
                    let (index, status) = cur
                        .take()
                        .ok_or_else(|| GsmError::ParameterError("+CMGL: pdu line with no preceding header".into()))?;
                    let raw_pdu = HexData::decode(st.trim())?;
                    let direction = if status == MessageStatus::StoredUnsent || status == MessageStatus::StoredSent {
                        PduDirection::Sent
                    } else {
                        PduDirection::Received
                    };
                    let message = SmsMessage::from_bytes(&raw_pdu, direction)?;
                    ret.push(ListedMessage { index, status, raw_pdu, message });
                }
            }
            _ => {}
        }
    }
    Ok(ret)
}

/// Decode a single hex-encoded SMS-DELIVER PDU, as seen in a `+CMT` URC body.
pub fn decode_deliver_pdu(hex: &str) -> Result<DeliverPdu, GsmError> {
    let bytes = HexData::decode(hex)?;
    DeliverPdu::try_from(&bytes[..])
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
    fn deletion_options_map_to_cmgd_flags() {
        let mut port = MockPort::new();
        port.push_response("OK");
        let mut meta = meta_with(port);
        del_sms_pdu(&mut meta, DeletionOptions::DeleteAll).unwrap();
    }
}
