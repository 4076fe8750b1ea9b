//! A random-access view of the SMS messages held in the device's own
//! memory, backed by `+CMGR`/`+CMGW`/`+CMGD`/`+CMSS`.
//!
//! Ported from `gsmlib::SMSStore`/`SMSStoreEntry`. The authoritative state
//! lives on the device; this is a write-through cache over it, not a
//! general-purpose container - see [`SmsStore`]'s method docs for exactly
//! what's cached and what always round-trips to the wire.
use std::cell::RefCell;

use num_derive::FromPrimitive;

use crate::at::{AtCommand, AtValue};
use crate::errors::GsmError;
use crate::meta::MeTa;
use crate::parser::Parser;
use crate::pdu::{AckPdu, HexData, Pdu, PduDirection, SmsMessage};
use crate::util::GsmFromPrimitive;

/// Memory status of a slot, as reported by `+CMGL`/`+CMGR`'s leading field.
#[repr(u8)]
#[derive(Debug, FromPrimitive, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageStatus {
    ReceivedUnread = 0,
    ReceivedRead = 1,
    StoredUnsent = 2,
    StoredSent = 3,
    /// Used only as a listing filter (`+CMGL=4`, "all"); never an actual
    /// slot status.
    All = 4,
}

/// A message read back from a store slot.
#[derive(Debug, Clone)]
pub struct SmsStoreEntry {
    pub status: MessageStatus,
    pub message: SmsMessage,
    pub raw_pdu: Vec<u8>,
}

struct CacheSlot {
    entry: Option<SmsStoreEntry>,
    cached: bool,
}

/// A handle onto one of the device's named memory stores (`"SM"`, `"ME"`,
/// `"MT"`, ...), as returned by [`MeTa::get_sms_store`].
///
/// Every method here takes `&mut MeTa` - the store doesn't own the engine,
/// it borrows it for the duration of the call, per the façade owning the
/// port outright. `MeTa` hands these out from a cache keyed by name, so
/// repeated calls to `get_sms_store` with the same name return handles over
/// the same slot bookkeeping.
pub struct SmsStore {
    name: String,
    capacity: usize,
    cache: RefCell<Vec<CacheSlot>>,
}
impl SmsStore {
    pub(crate) fn new(name: String, capacity: usize) -> SmsStore {
        let mut cache = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            cache.push(CacheSlot { entry: None, cached: false });
        }
        SmsStore { name, capacity, cache: RefCell::new(cache) }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Capacity discovered when this store was opened. Fixed for the
    /// store's lifetime - use `len` to see how many slots are occupied
    /// right now.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Force a fresh `+CPMS` round-trip and return the number of occupied
    /// slots. Unlike `capacity`, this always hits the wire.
    pub fn len(&self, meta: &mut MeTa) -> Result<usize, GsmError> {
        let resp = meta.set_sms_store(&self.name, true)?;
        let s = resp.ok_or_else(|| GsmError::OtherError("+CPMS returned no result".into()))?;
        let mut p = Parser::new(&s);
        let used = p.parse_int(false)?;
        Ok(used as usize)
    }

    /// Read slot `index` (0-based). Returns `Ok(None)` for an empty slot.
    /// Uses the cache if this handle has already read the slot and nothing
    /// has since invalidated it.
    pub fn get(&self, meta: &mut MeTa, index: usize) -> Result<Option<SmsStoreEntry>, GsmError> {
        if index >= self.capacity {
            return Err(GsmError::ParameterError(format!("slot {} out of range (capacity {})", index, self.capacity)));
        }
        if self.cache.borrow()[index].cached {
            return Ok(self.cache.borrow()[index].entry.clone());
        }
        meta.set_sms_store(&self.name, false)?;
        let pkt = meta.engine_mut().chat(AtCommand::Equals {
            param: "+CMGR".into(),
            value: AtValue::Integer(index as u32 + 1),
        })?;
        let entry = match pkt.extract_named_response_opt("+CMGR")? {
            None => None,
            Some(val) => {
                let list = val.get_array()?;
                let status_int = list.get(0).ok_or_else(|| GsmError::ParameterError("+CMGR: missing status".into()))?.get_integer()?;
                let status = MessageStatus::from_integer(*status_int)?;
                let hex = list.iter().find_map(|v| v.get_unknown().ok().cloned()).ok_or_else(|| GsmError::ParameterError("+CMGR: missing pdu".into()))?;
                let mut raw_pdu = HexData::decode(&hex)?;
                if !meta.capabilities().has_sms_sca_prefix {
                    let mut prefixed = vec![0u8];
                    prefixed.extend(raw_pdu);
                    raw_pdu = prefixed;
                }
                let direction = if status == MessageStatus::StoredUnsent || status == MessageStatus::StoredSent {
                    PduDirection::Sent
                } else {
                    PduDirection::Received
                };
                let message = SmsMessage::from_bytes(&raw_pdu, direction)?;
                Some(SmsStoreEntry { status, message, raw_pdu })
            }
        };
        self.cache.borrow_mut()[index] = CacheSlot { entry: entry.clone(), cached: true };
        Ok(entry)
    }

    /// Write `pdu` to the first slot the device chooses, returning that
    /// slot's (0-based) index. The cache entry for that slot is invalidated
    /// rather than populated from `pdu` directly - a later `get` always
    /// re-reads and re-decodes whatever the device actually stored.
    pub fn insert(&self, meta: &mut MeTa, pdu: &Pdu) -> Result<usize, GsmError> {
        meta.set_sms_store(&self.name, false)?;
        let (bytes, tpdu_len) = pdu.as_bytes();
        let cmd = AtCommand::Equals { param: "+CMGW".into(), value: AtValue::Integer(tpdu_len as u32) };
        let pdu_hex = HexData(&bytes).to_string();
        let pkt = meta.engine_mut().send_pdu(cmd, &pdu_hex, meta.config().default_timeout)?;
        let index = pkt.extract_named_response("+CMGW")?.get_integer()?;
        let index = (*index as usize).saturating_sub(1);
        if index < self.capacity {
            self.cache.borrow_mut()[index] = CacheSlot { entry: None, cached: false };
        }
        Ok(index)
    }

    /// Delete the message at `index`. On success, clears the slot's cache.
    pub fn erase(&self, meta: &mut MeTa, index: usize) -> Result<(), GsmError> {
        if index >= self.capacity {
            return Err(GsmError::ParameterError(format!("slot {} out of range (capacity {})", index, self.capacity)));
        }
        meta.set_sms_store(&self.name, false)?;
        meta.engine_mut().chat(AtCommand::Equals {
            param: "+CMGD".into(),
            value: AtValue::Integer(index as u32 + 1),
        })?;
        self.cache.borrow_mut()[index] = CacheSlot { entry: None, cached: false };
        Ok(())
    }

    /// Issue `AT+CMSS` for the message stored at `index`, returning the
    /// TP-Message-Reference and, if the device returned one, the decoded
    /// acknowledgement PDU (SUBMIT-REPORT/DELIVER-REPORT).
    pub fn send(&self, meta: &mut MeTa, index: usize) -> Result<(u32, Option<AckPdu>), GsmError> {
        if index >= self.capacity {
            return Err(GsmError::ParameterError(format!("slot {} out of range (capacity {})", index, self.capacity)));
        }
        meta.set_sms_store(&self.name, false)?;
        let pkt = meta.engine_mut().chat(AtCommand::Equals {
            param: "+CMSS".into(),
            value: AtValue::Integer(index as u32 + 1),
        })?;
        let val = pkt.extract_named_response("+CMSS")?;
        let arr = match val {
            AtValue::Array(a) => a.clone(),
            other => vec![other.clone()],
        };
        let message_reference = *arr.get(0).ok_or_else(|| GsmError::ParameterError("+CMSS: missing message reference".into()))?.get_integer()?;
        let ack = match arr.get(1) {
            Some(v) => {
                let hex = match v.get_unknown() {
                    Ok(s) => s.clone(),
                    Err(_) => v.get_string()?.clone(),
                };
                let mut bytes = HexData::decode(&hex)?;
                if !meta.capabilities().has_sms_sca_prefix {
                    let mut prefixed = vec![0u8];
                    prefixed.extend(bytes);
                    bytes = prefixed;
                }
                Some(AckPdu::try_from_bytes(&bytes)?)
            }
            None => None,
        };
        Ok((message_reference, ack))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_store_has_empty_cache() {
        let store = SmsStore::new("SM".into(), 10);
        assert_eq!(store.capacity(), 10);
        assert_eq!(store.cache.borrow().len(), 10);
        assert!(store.cache.borrow().iter().all(|s| !s.cached));
    }
}
