//! SMS PDU (Protocol Data Unit) encoding and decoding, per GSM 03.40.
//!
//! A PDU is the wire format used for `AT+CMGS`, `AT+CMGR`, `AT+CMGL`, and
//! `AT+CMGW` in PDU mode. This module builds and parses the handful of TPDU
//! shapes a terminal adapter actually exchanges with a TE: SMS-SUBMIT (us to
//! network), SMS-DELIVER (network to us), SMS-STATUS-REPORT (delivery
//! receipts), SMS-COMMAND (rare), and the SUBMIT/DELIVER acknowledgement
//! PDUs returned after `AT+CMSS`.
//!
//! Which TPDU shape a raw buffer holds can't be told from the bytes alone:
//! the 2-bit Message Type Indicator means different things depending on
//! whether the PDU travelled MO (mobile-originated, i.e. the direction
//! `AT+CMGS`/`AT+CMGW` send it) or MT (mobile-terminated, the direction
//! `AT+CMGR`/`AT+CMGL` read it back). Callers pick the right `TryFrom`
//! target (`Pdu`, `DeliverPdu`, ...) based on where the bytes came from.
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use crate::errors::GsmError;
use crate::gsm_encoding::GsmMessageData;

macro_rules! pdu_fail {
    ($($arg:tt)*) => {
        return Err(GsmError::PduError(format!($($arg)*)))
    }
}

/// Hex-encodes (or decodes) the octets of a PDU, as sent on the wire
/// between `AT+CMGS=<len>` and the terminating Ctrl-Z.
pub struct HexData<'a>(pub &'a [u8]);
impl<'a> fmt::Display for HexData<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}
impl<'a> HexData<'a> {
    /// Decode a hex string (as received from the modem, or typed by a user)
    /// into raw bytes.
    pub fn decode(s: &str) -> Result<Vec<u8>, GsmError> {
        let s = s.trim();
        if s.len() % 2 != 0 {
            pdu_fail!("hex string has odd length");
        }
        let mut ret = Vec::with_capacity(s.len() / 2);
        let bytes = s.as_bytes();
        for chunk in bytes.chunks(2) {
            let hi = (chunk[0] as char).to_digit(16).ok_or_else(|| GsmError::PduError(format!("invalid hex digit '{}'", chunk[0] as char)))?;
            let lo = (chunk[1] as char).to_digit(16).ok_or_else(|| GsmError::PduError(format!("invalid hex digit '{}'", chunk[1] as char)))?;
            ret.push(((hi << 4) | lo) as u8);
        }
        Ok(ret)
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeOfNumber {
    Unknown = 0b0_000_0000,
    International = 0b0_001_0000,
    National = 0b0_010_0000,
    NetworkSpecific = 0b0_011_0000,
    SubscriberNumber = 0b0_100_0000,
    Alphanumeric = 0b0_101_0000,
    Abbreviated = 0b0_110_0000,
    Reserved = 0b0_111_0000
}
impl TypeOfNumber {
    fn from_u8(b: u8) -> Self {
        match b & 0b0_111_0000 {
            0b0_000_0000 => TypeOfNumber::Unknown,
            0b0_001_0000 => TypeOfNumber::International,
            0b0_010_0000 => TypeOfNumber::National,
            0b0_011_0000 => TypeOfNumber::NetworkSpecific,
            0b0_100_0000 => TypeOfNumber::SubscriberNumber,
            0b0_101_0000 => TypeOfNumber::Alphanumeric,
            0b0_110_0000 => TypeOfNumber::Abbreviated,
            _ => TypeOfNumber::Reserved
        }
    }
}
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumberingPlanIdentification {
    NetworkDetermined = 0b0_000_0000,
    IsdnTelephone = 0b0_000_0001,
    Data = 0b0_000_0011,
    Telex = 0b0_000_0100,
    National = 0b0_000_1000,
    Private = 0b0_000_1001,
    Ermes = 0b0_000_1010,
    Reserved = 0b0_000_1111,
}
impl NumberingPlanIdentification {
    fn from_u8(b: u8) -> Self {
        match b & 0b0_000_1111 {
            0b0000 => NumberingPlanIdentification::NetworkDetermined,
            0b0001 => NumberingPlanIdentification::IsdnTelephone,
            0b0011 => NumberingPlanIdentification::Data,
            0b0100 => NumberingPlanIdentification::Telex,
            0b1000 => NumberingPlanIdentification::National,
            0b1001 => NumberingPlanIdentification::Private,
            0b1010 => NumberingPlanIdentification::Ermes,
            _ => NumberingPlanIdentification::Reserved
        }
    }
}
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AddressType {
    pub type_of_number: TypeOfNumber,
    pub numbering_plan_identification: NumberingPlanIdentification
}
impl Default for AddressType {
    fn default() -> Self {
        AddressType {
            type_of_number: TypeOfNumber::International,
            numbering_plan_identification: NumberingPlanIdentification::IsdnTelephone
        }
    }
}
impl From<AddressType> for u8 {
    fn from(a: AddressType) -> u8 {
        0b1_000_0000 | (a.type_of_number as u8) | (a.numbering_plan_identification as u8)
    }
}
impl From<u8> for AddressType {
    fn from(b: u8) -> Self {
        AddressType {
            type_of_number: TypeOfNumber::from_u8(b),
            numbering_plan_identification: NumberingPlanIdentification::from_u8(b)
        }
    }
}

/// A phone number, as a sequence of decimal digits (semi-octets on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(pub Vec<u8>);
impl PhoneNumber {
    /// Pack digits two-per-byte, nibble-swapped, padding an odd final digit
    /// with `0xF`.
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut ret = vec![];
        let mut cur = 0u8;
        for (i, b) in self.0.iter().enumerate() {
            let b = *b;
            if i % 2 == 0 {
                cur = b;
            } else {
                cur |= b << 4;
                ret.push(cur);
                cur = 0;
            }
        }
        if self.0.len() % 2 != 0 {
            cur |= 0b1111_0000;
            ret.push(cur);
        }
        ret
    }
    /// Unpack `ndigits` semi-octets from `bytes`.
    pub fn from_bytes(bytes: &[u8], ndigits: usize) -> PhoneNumber {
        let mut digits = Vec::with_capacity(ndigits);
        for b in bytes {
            digits.push(b & 0x0F);
            if digits.len() < ndigits {
                digits.push((b >> 4) & 0x0F);
            }
        }
        digits.truncate(ndigits);
        PhoneNumber(digits)
    }
}
impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for d in &self.0 {
            match d {
                0..=9 => write!(f, "{}", d)?,
                10 => write!(f, "*")?,
                11 => write!(f, "#")?,
                12 => write!(f, "a")?,
                13 => write!(f, "b")?,
                14 => write!(f, "c")?,
                _ => write!(f, "")?,
            }
        }
        Ok(())
    }
}
fn digit_value(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        '*' => Some(10),
        '#' => Some(11),
        'a' | 'A' => Some(12),
        'b' | 'B' => Some(13),
        'c' | 'C' => Some(14),
        _ => None
    }
}

/// An address (phone number or SMSC) as it appears in a PDU: a type/plan
/// octet plus either packed digits, or (for a `TypeOfNumber::Alphanumeric`
/// sender ID) GSM-7-packed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduAddress {
    pub type_addr: AddressType,
    pub number: PhoneNumber,
    /// Decoded text, set only when `type_addr.type_of_number ==
    /// Alphanumeric` (e.g. a sender ID like `"MYBANK"`). `number` is
    /// meaningless in that case.
    pub alphanumeric: Option<String>,
}
impl PduAddress {
    /// Build an alphanumeric address (a sender ID), GSM-7 encoded. Used for
    /// originating addresses the network didn't attach a real number to.
    pub fn alphanumeric(text: &str) -> PduAddress {
        PduAddress {
            type_addr: AddressType { type_of_number: TypeOfNumber::Alphanumeric, numbering_plan_identification: NumberingPlanIdentification::NetworkDetermined },
            number: PhoneNumber(vec![]),
            alphanumeric: Some(text.to_string()),
        }
    }
    /// Serialize to wire format. `octet_length` controls whether the
    /// leading length octet counts address *octets including the type byte*
    /// (used for the SMSC address, GSM 03.40 §9.1.2.3) or address
    /// *semi-octets* (used everywhere else, §9.1.2.5) - for a numeric
    /// address that's digits; for an alphanumeric one it's the packed GSM-7
    /// data's nibble count.
    pub fn as_bytes(&self, octet_length: bool) -> Vec<u8> {
        if let Some(text) = &self.alphanumeric {
            let septets = crate::gsm_encoding::try_gsm_encode_string(text).unwrap_or_default();
            let packed = crate::gsm_encoding::encode_sms_7bit(&septets, 0);
            let mut ret = vec![self.type_addr.into()];
            ret.extend(packed);
            let nibbles = (septets.len() * 7 + 3) / 4;
            let len = if octet_length { ret.len() as u8 } else { nibbles as u8 };
            ret.insert(0, len);
            return ret;
        }
        let mut ret = vec![];
        ret.push(self.type_addr.into());
        ret.extend(self.number.as_bytes());
        let len = if octet_length {
            ret.len() as u8
        } else {
            self.number.0.len() as u8
        };
        ret.insert(0, len);
        ret
    }
    /// Parse an address out of `bytes`, returning the address and the
    /// number of bytes consumed (including the leading length octet).
    pub fn parse(bytes: &[u8], octet_length: bool) -> Result<(PduAddress, usize), GsmError> {
        if bytes.is_empty() {
            pdu_fail!("address: buffer too short for length octet");
        }
        let len = bytes[0] as usize;
        if len == 0 {
            return Ok((PduAddress { type_addr: AddressType::default(), number: PhoneNumber(vec![]), alphanumeric: None }, 1));
        }
        if bytes.len() < 2 {
            pdu_fail!("address: buffer too short for type octet");
        }
        let type_addr = AddressType::from(bytes[1]);
        let nsemioctets = if octet_length { (len - 1) * 2 } else { len };
        let nbytes = (nsemioctets + 1) / 2;
        if bytes.len() < 2 + nbytes {
            pdu_fail!("address: buffer too short for {} semi-octets", nsemioctets);
        }
        if type_addr.type_of_number == TypeOfNumber::Alphanumeric {
            let max_chars = nsemioctets * 4 / 7;
            let septets = crate::gsm_encoding::decode_sms_7bit(&bytes[2..2 + nbytes], 0, max_chars);
            let text = crate::gsm_encoding::gsm_decode_string(&septets);
            return Ok((PduAddress { type_addr, number: PhoneNumber(vec![]), alphanumeric: Some(text) }, 2 + nbytes));
        }
        let number = PhoneNumber::from_bytes(&bytes[2..2 + nbytes], nsemioctets);
        Ok((PduAddress { type_addr, number, alphanumeric: None }, 2 + nbytes))
    }
}
impl fmt::Display for PduAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(text) = &self.alphanumeric {
            return write!(f, "{}", text);
        }
        if self.type_addr.type_of_number == TypeOfNumber::International {
            write!(f, "+")?;
        }
        write!(f, "{}", self.number)
    }
}
impl FromStr for PduAddress {
    type Err = GsmError;
    fn from_str(s: &str) -> Result<Self, GsmError> {
        let (international, rest) = if let Some(r) = s.strip_prefix('+') {
            (true, r)
        } else {
            (false, s)
        };
        let mut digits = vec![];
        for c in rest.chars() {
            match digit_value(c) {
                Some(d) => digits.push(d),
                None => pdu_fail!("invalid character {:?} in phone number", c)
            }
        }
        if digits.is_empty() {
            pdu_fail!("empty phone number");
        }
        let type_of_number = if international { TypeOfNumber::International } else { TypeOfNumber::Unknown };
        Ok(PduAddress {
            type_addr: AddressType { type_of_number, numbering_plan_identification: NumberingPlanIdentification::IsdnTelephone },
            number: PhoneNumber(digits),
            alphanumeric: None,
        })
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageType {
    SmsDeliver = 0b000000_00,
    SmsSubmit = 0b000000_01,
    SmsCommandOrStatusReport = 0b000000_10,
    Reserved = 0b000000_11
}
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum VpFieldValidity {
    Invalid = 0b0000_00_00,
    Enhanced = 0b0000_01_00,
    Relative = 0b0000_10_00,
    Absolute = 0b0000_11_00,
}
impl VpFieldValidity {
    fn from_u8(b: u8) -> Self {
        match b & 0b0000_11_00 {
            0b0000_01_00 => VpFieldValidity::Enhanced,
            0b0000_10_00 => VpFieldValidity::Relative,
            0b0000_11_00 => VpFieldValidity::Absolute,
            _ => VpFieldValidity::Invalid
        }
    }
}
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageClass {
    Silent = 0b000000_00,
    StoreToNv = 0b000000_01,
    StoreToSim = 0b000000_10,
    StoreToTe = 0b000000_11
}
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageEncoding {
    Gsm7Bit = 0b0000_00_00,
    EightBit = 0b0000_01_00,
    Ucs2 = 0b0000_10_00,
    Reserved = 0b0000_11_00,
}
impl MessageEncoding {
    fn from_u8(b: u8) -> Self {
        match b & 0b0000_11_00 {
            0b0000_00_00 => MessageEncoding::Gsm7Bit,
            0b0000_01_00 => MessageEncoding::EightBit,
            0b0000_10_00 => MessageEncoding::Ucs2,
            _ => MessageEncoding::Reserved
        }
    }
}
/// A Data Coding Scheme octet, in its simple (non-message-waiting-indicator)
/// form, per GSM 03.38 §4.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SimplisticDataCodingScheme {
    pub class: MessageClass,
    pub encoding: MessageEncoding
}
impl SimplisticDataCodingScheme {
    pub fn as_u8(self) -> u8 {
        0b0001_0000 | (self.class as u8) | (self.encoding as u8)
    }
    pub fn from_u8(b: u8) -> Self {
        SimplisticDataCodingScheme {
            class: match b & 0b11 {
                0 => MessageClass::Silent,
                1 => MessageClass::StoreToNv,
                2 => MessageClass::StoreToSim,
                _ => MessageClass::StoreToTe,
            },
            encoding: MessageEncoding::from_u8(b)
        }
    }
}
impl Default for SimplisticDataCodingScheme {
    fn default() -> Self {
        SimplisticDataCodingScheme { class: MessageClass::Silent, encoding: MessageEncoding::Gsm7Bit }
    }
}

/// A GSM 03.40 timestamp: six nibble-swapped BCD fields plus a signed,
/// quarter-hour timezone offset.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Offset from GMT, in quarter-hours (can be negative).
    pub timezone_quarters: i8,
}
fn decode_swapped(b: u8) -> u8 {
    let tens = b & 0x0F;
    let units = (b >> 4) & 0x0F;
    tens * 10 + units
}
fn encode_swapped(v: u8) -> u8 {
    let tens = v / 10;
    let units = v % 10;
    tens | (units << 4)
}
impl Timestamp {
    pub const LEN: usize = 7;
    pub fn from_bytes(b: &[u8]) -> Result<Timestamp, GsmError> {
        if b.len() < Timestamp::LEN {
            pdu_fail!("timestamp: buffer too short");
        }
        let sign_and_tens = b[6] & 0x0F;
        let sign = if sign_and_tens & 0x08 != 0 { -1i8 } else { 1 };
        let tz_tens = (sign_and_tens & 0x07) as i8;
        let tz_units = ((b[6] >> 4) & 0x0F) as i8;
        Ok(Timestamp {
            year: decode_swapped(b[0]),
            month: decode_swapped(b[1]),
            day: decode_swapped(b[2]),
            hour: decode_swapped(b[3]),
            minute: decode_swapped(b[4]),
            second: decode_swapped(b[5]),
            timezone_quarters: sign * (tz_tens * 10 + tz_units),
        })
    }
    pub fn as_bytes(&self) -> [u8; 7] {
        let tz_abs = self.timezone_quarters.unsigned_abs();
        let tz_tens = tz_abs / 10;
        let tz_units = tz_abs % 10;
        let mut sign_and_tens = tz_tens;
        if self.timezone_quarters < 0 {
            sign_and_tens |= 0x08;
        }
        [
            encode_swapped(self.year),
            encode_swapped(self.month),
            encode_swapped(self.day),
            encode_swapped(self.hour),
            encode_swapped(self.minute),
            encode_swapped(self.second),
            sign_and_tens | (tz_units << 4),
        ]
    }
}

fn read_user_data(bytes: &[u8], udhi: bool, dcs: SimplisticDataCodingScheme, udl: u8) -> GsmMessageData {
    GsmMessageData {
        encoding: dcs.encoding,
        udh: udhi,
        bytes: bytes.to_vec(),
        user_data_len: udl,
    }
}

/// An SMS-SUBMIT TPDU: a message sent from us to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    /// SMSC address to route via. `None` tells the device to use whatever
    /// it has configured (`AT+CSCA`).
    pub sca: Option<PduAddress>,
    pub reject_duplicates: bool,
    pub vpf: VpFieldValidity,
    pub request_status_report: bool,
    pub message_id: u8,
    pub destination: PduAddress,
    pub protocol_id: u8,
    pub dcs: SimplisticDataCodingScheme,
    pub validity_period: Option<u8>,
    pub user_data: GsmMessageData,
}
impl Pdu {
    /// Build the simplest possible SMS-SUBMIT: no validity period, no
    /// status report request, message reference `0` (left for the device
    /// to assign).
    pub fn make_simple_message(destination: PduAddress, user_data: GsmMessageData) -> Pdu {
        let encoding = *user_data.encoding();
        Pdu {
            sca: None,
            reject_duplicates: false,
            vpf: VpFieldValidity::Invalid,
            request_status_report: false,
            message_id: 0,
            destination,
            protocol_id: 0,
            dcs: SimplisticDataCodingScheme { class: MessageClass::Silent, encoding },
            validity_period: None,
            user_data,
        }
    }
    fn first_octet(&self) -> u8 {
        let mut ret = MessageType::SmsSubmit as u8;
        ret |= self.vpf as u8;
        if self.reject_duplicates {
            ret |= 0b0000_0100;
        }
        if self.request_status_report {
            ret |= 0b0010_0000;
        }
        if self.user_data.udh {
            ret |= 0b0100_0000;
        }
        ret
    }
    /// Serialize to wire format, returning the full buffer and the TPDU
    /// length as reported to `AT+CMGS` (i.e. excluding the SCA prefix).
    pub fn as_bytes(&self) -> (Vec<u8>, usize) {
        let mut ret = vec![];
        let sca_bytes = match &self.sca {
            Some(a) => a.as_bytes(true),
            None => vec![0u8],
        };
        let scalen = sca_bytes.len();
        ret.extend(sca_bytes);
        ret.push(self.first_octet());
        ret.push(self.message_id);
        ret.extend(self.destination.as_bytes(false));
        ret.push(self.protocol_id);
        ret.push(self.dcs.as_u8());
        if self.vpf != VpFieldValidity::Invalid {
            ret.push(self.validity_period.unwrap_or(0));
        }
        ret.push(self.user_data.user_data_len());
        ret.extend(self.user_data.as_bytes());
        let tpdu_len = ret.len() - scalen;
        (ret, tpdu_len)
    }
}
impl<'a> TryFrom<&'a [u8]> for Pdu {
    type Error = GsmError;
    fn try_from(b: &'a [u8]) -> Result<Self, GsmError> {
        let (sca, mut off) = PduAddress::parse(b, true)?;
        let sca = if sca.number.0.is_empty() { None } else { Some(sca) };
        if b.len() <= off {
            pdu_fail!("submit pdu: missing first octet");
        }
        let fo = b[off];
        off += 1;
        let mti = fo & 0b11;
        if mti != MessageType::SmsSubmit as u8 {
            pdu_fail!("not an SMS-SUBMIT pdu (mti={})", mti);
        }
        let reject_duplicates = fo & 0b0000_0100 != 0;
        let vpf = VpFieldValidity::from_u8(fo);
        let request_status_report = fo & 0b0010_0000 != 0;
        let udhi = fo & 0b0100_0000 != 0;
        if b.len() <= off {
            pdu_fail!("submit pdu: missing message reference");
        }
        let message_id = b[off];
        off += 1;
        let (destination, consumed) = PduAddress::parse(&b[off..], false)?;
        off += consumed;
        if b.len() < off + 2 {
            pdu_fail!("submit pdu: missing pid/dcs");
        }
        let protocol_id = b[off];
        let dcs = SimplisticDataCodingScheme::from_u8(b[off + 1]);
        off += 2;
        let validity_period = match vpf {
            VpFieldValidity::Invalid => None,
            VpFieldValidity::Relative => {
                if b.len() <= off {
                    pdu_fail!("submit pdu: missing relative validity period");
                }
                let v = b[off];
                off += 1;
                Some(v)
            }
            VpFieldValidity::Absolute | VpFieldValidity::Enhanced => {
                if b.len() < off + 7 {
                    pdu_fail!("submit pdu: missing absolute/enhanced validity period");
                }
                off += 7;
                None
            }
        };
        if b.len() <= off {
            pdu_fail!("submit pdu: missing user data length");
        }
        let udl = b[off];
        off += 1;
        let user_data = read_user_data(&b[off..], udhi, dcs, udl);
        Ok(Pdu {
            sca,
            reject_duplicates,
            vpf,
            request_status_report,
            message_id,
            destination,
            protocol_id,
            dcs,
            validity_period,
            user_data,
        })
    }
}

/// An SMS-DELIVER TPDU: a message handed to us by the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverPdu {
    pub more_messages_to_send: bool,
    pub status_report_indication: bool,
    pub originating_address: PduAddress,
    pub protocol_id: u8,
    pub dcs: SimplisticDataCodingScheme,
    pub scts: Timestamp,
    pub user_data: GsmMessageData,
}
impl DeliverPdu {
    pub fn get_message_data(&self) -> &GsmMessageData {
        &self.user_data
    }
    /// Serialize to wire format, with a zero-length SCA prefix (GSM 03.40
    /// §9.1.2.3's "let the device use whatever it has configured" case) -
    /// `TryFrom<&[u8]>` always expects a leading SCA, so the decode side
    /// stays symmetric with `Pdu`/`StatusReportPdu`/`CommandPdu`/`AckPdu`.
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut ret = vec![0u8];
        let mut fo = MessageType::SmsDeliver as u8;
        if !self.more_messages_to_send {
            fo |= 0b0000_0100;
        }
        if self.status_report_indication {
            fo |= 0b0010_0000;
        }
        if self.user_data.udh {
            fo |= 0b0100_0000;
        }
        ret.push(fo);
        ret.extend(self.originating_address.as_bytes(false));
        ret.push(self.protocol_id);
        ret.push(self.dcs.as_u8());
        ret.extend(self.scts.as_bytes());
        ret.push(self.user_data.user_data_len());
        ret.extend(self.user_data.as_bytes());
        ret
    }
}
impl<'a> TryFrom<&'a [u8]> for DeliverPdu {
    type Error = GsmError;
    fn try_from(b: &'a [u8]) -> Result<Self, GsmError> {
        let (_sca, mut off) = PduAddress::parse(b, true)?;
        if b.len() <= off {
            pdu_fail!("deliver pdu: missing first octet");
        }
        let fo = b[off];
        off += 1;
        let mti = fo & 0b11;
        if mti != MessageType::SmsDeliver as u8 {
            pdu_fail!("not an SMS-DELIVER pdu (mti={})", mti);
        }
        let more_messages_to_send = fo & 0b0000_0100 == 0;
        let status_report_indication = fo & 0b0010_0000 != 0;
        let udhi = fo & 0b0100_0000 != 0;
        let (originating_address, consumed) = PduAddress::parse(&b[off..], false)?;
        off += consumed;
        if b.len() < off + 2 {
            pdu_fail!("deliver pdu: missing pid/dcs");
        }
        let protocol_id = b[off];
        let dcs = SimplisticDataCodingScheme::from_u8(b[off + 1]);
        off += 2;
        if b.len() < off + Timestamp::LEN {
            pdu_fail!("deliver pdu: missing timestamp");
        }
        let scts = Timestamp::from_bytes(&b[off..])?;
        off += Timestamp::LEN;
        if b.len() <= off {
            pdu_fail!("deliver pdu: missing user data length");
        }
        let udl = b[off];
        off += 1;
        let user_data = read_user_data(&b[off..], udhi, dcs, udl);
        Ok(DeliverPdu {
            more_messages_to_send,
            status_report_indication,
            originating_address,
            protocol_id,
            dcs,
            scts,
            user_data,
        })
    }
}

/// Delivery status byte of an SMS-STATUS-REPORT, GSM 03.40 §9.2.3.15.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeliveryStatus(pub u8);
impl DeliveryStatus {
    /// Final, successful delivery.
    pub fn is_success(&self) -> bool {
        self.0 <= 0x02
    }
    /// Still somewhere in the pipeline; the network may send further
    /// status reports for the same message reference.
    pub fn is_still_trying(&self) -> bool {
        (0x20..=0x25).contains(&self.0) || (0x40..=0x45).contains(&self.0)
    }
    /// Permanent failure; no further reports will arrive.
    pub fn is_permanent_failure(&self) -> bool {
        !self.is_success() && !self.is_still_trying()
    }
}

/// An SMS-STATUS-REPORT TPDU: a delivery receipt for a previously sent
/// SMS-SUBMIT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReportPdu {
    pub more_messages_to_send: bool,
    /// Message reference of the SMS-SUBMIT this report refers to.
    pub message_id: u8,
    pub recipient_address: PduAddress,
    pub scts: Timestamp,
    pub discharge_time: Timestamp,
    pub status: DeliveryStatus,
}
impl StatusReportPdu {
    /// Serialize to wire format, with a zero-length SCA prefix (see
    /// `DeliverPdu::as_bytes`).
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut ret = vec![0u8];
        let mut fo = MessageType::SmsCommandOrStatusReport as u8;
        if !self.more_messages_to_send {
            fo |= 0b0000_0100;
        }
        ret.push(fo);
        ret.push(self.message_id);
        ret.extend(self.recipient_address.as_bytes(false));
        ret.extend(self.scts.as_bytes());
        ret.extend(self.discharge_time.as_bytes());
        ret.push(self.status.0);
        ret
    }
}
impl<'a> TryFrom<&'a [u8]> for StatusReportPdu {
    type Error = GsmError;
    fn try_from(b: &'a [u8]) -> Result<Self, GsmError> {
        let (_sca, mut off) = PduAddress::parse(b, true)?;
        if b.len() <= off {
            pdu_fail!("status-report pdu: missing first octet");
        }
        let fo = b[off];
        off += 1;
        let mti = fo & 0b11;
        if mti != MessageType::SmsCommandOrStatusReport as u8 {
            pdu_fail!("not an SMS-STATUS-REPORT pdu (mti={})", mti);
        }
        let more_messages_to_send = fo & 0b0000_0100 == 0;
        if b.len() <= off {
            pdu_fail!("status-report pdu: missing message reference");
        }
        let message_id = b[off];
        off += 1;
        let (recipient_address, consumed) = PduAddress::parse(&b[off..], false)?;
        off += consumed;
        if b.len() < off + Timestamp::LEN * 2 + 1 {
            pdu_fail!("status-report pdu: truncated");
        }
        let scts = Timestamp::from_bytes(&b[off..])?;
        off += Timestamp::LEN;
        let discharge_time = Timestamp::from_bytes(&b[off..])?;
        off += Timestamp::LEN;
        let status = DeliveryStatus(b[off]);
        Ok(StatusReportPdu {
            more_messages_to_send,
            message_id,
            recipient_address,
            scts,
            discharge_time,
            status,
        })
    }
}

/// An SMS-COMMAND TPDU: a rarely used MO command addressed to the SC
/// itself (GSM 03.40 §9.2.2.4), e.g. to cancel a previously queued status
/// report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPdu {
    pub message_id: u8,
    pub protocol_id: u8,
    pub command_type: u8,
    pub message_number: u8,
    pub destination: PduAddress,
    pub command_data: Vec<u8>,
}
impl CommandPdu {
    /// Serialize to wire format, with a zero-length SCA prefix (see
    /// `DeliverPdu::as_bytes`). The first octet's only meaningful bits for
    /// SMS-COMMAND are the MTI, so that's all this sets.
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut ret = vec![0u8];
        ret.push(MessageType::SmsCommandOrStatusReport as u8);
        ret.push(self.message_id);
        ret.push(self.protocol_id);
        ret.push(self.command_type);
        ret.push(self.message_number);
        ret.extend(self.destination.as_bytes(false));
        ret.push(self.command_data.len() as u8);
        ret.extend(&self.command_data);
        ret
    }
}
impl<'a> TryFrom<&'a [u8]> for CommandPdu {
    type Error = GsmError;
    fn try_from(b: &'a [u8]) -> Result<Self, GsmError> {
        let (_sca, mut off) = PduAddress::parse(b, true)?;
        if b.len() <= off {
            pdu_fail!("command pdu: missing first octet");
        }
        let fo = b[off];
        off += 1;
        let mti = fo & 0b11;
        if mti != MessageType::SmsCommandOrStatusReport as u8 {
            pdu_fail!("not an SMS-COMMAND pdu (mti={})", mti);
        }
        if b.len() < off + 3 {
            pdu_fail!("command pdu: missing header fields");
        }
        let message_id = b[off];
        let protocol_id = b[off + 1];
        let command_type = b[off + 2];
        off += 3;
        if b.len() <= off {
            pdu_fail!("command pdu: missing message number");
        }
        let message_number = b[off];
        off += 1;
        let (destination, consumed) = PduAddress::parse(&b[off..], false)?;
        off += consumed;
        if b.len() <= off {
            pdu_fail!("command pdu: missing command data length");
        }
        let cdl = b[off] as usize;
        off += 1;
        if b.len() < off + cdl {
            pdu_fail!("command pdu: truncated command data");
        }
        let command_data = b[off..off + cdl].to_vec();
        Ok(CommandPdu {
            message_id,
            protocol_id,
            command_type,
            message_number,
            destination,
            command_data,
        })
    }
}

/// An acknowledgement PDU, returned by the device after `AT+CMSS` (i.e. an
/// SMS-SUBMIT-REPORT or SMS-DELIVER-REPORT sent by the SC back to us).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckPdu {
    pub failure_cause: Option<u8>,
    pub protocol_id: Option<u8>,
    pub dcs: Option<SimplisticDataCodingScheme>,
    pub scts: Option<Timestamp>,
    pub user_data: Option<GsmMessageData>,
}
impl AckPdu {
    /// Convenience wrapper over the `TryFrom` impl, for call sites that
    /// don't otherwise need `std::convert::TryFrom` in scope.
    pub fn try_from_bytes(b: &[u8]) -> Result<AckPdu, GsmError> {
        AckPdu::try_from(b)
    }
    /// Serialize to wire format, with a zero-length SCA prefix (see
    /// `DeliverPdu::as_bytes`). `failure_cause` has no defined wire
    /// encoding in this TPDU shape - `TryFrom` never sets it either - so it
    /// isn't round-tripped.
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut ret = vec![0u8];
        let udhi = self.user_data.as_ref().map(|u| u.udh).unwrap_or(false);
        ret.push(if udhi { 0b0100_0000 } else { 0 });
        let mut pi = 0u8;
        if self.scts.is_some() {
            pi |= 0b1000;
        }
        if self.protocol_id.is_some() {
            pi |= 0b001;
        }
        if self.dcs.is_some() {
            pi |= 0b010;
        }
        if self.user_data.is_some() {
            pi |= 0b100;
        }
        ret.push(pi);
        if let Some(scts) = &self.scts {
            ret.extend(scts.as_bytes());
        }
        if let Some(pid) = self.protocol_id {
            ret.push(pid);
        }
        if let Some(dcs) = self.dcs {
            ret.push(dcs.as_u8());
        }
        if let Some(ud) = &self.user_data {
            ret.push(ud.user_data_len());
            ret.extend(ud.as_bytes());
        }
        ret
    }
}
impl<'a> TryFrom<&'a [u8]> for AckPdu {
    type Error = GsmError;
    fn try_from(b: &'a [u8]) -> Result<Self, GsmError> {
        // Like every other TPDU shape, an ack carries a (possibly
        // zero-length) SCA prefix; callers on a device without
        // `Capabilities::has_sms_sca_prefix` must prepend a `00` byte
        // before calling this, same as `Pdu`/`DeliverPdu`.
        let (_sca, mut off) = PduAddress::parse(b, true)?;
        if b.len() <= off {
            pdu_fail!("ack pdu: missing first octet");
        }
        let fo = b[off];
        let udhi = fo & 0b0100_0000 != 0;
        off += 1;
        if b.len() <= off {
            pdu_fail!("ack pdu: missing parameter indicator");
        }
        let pi = b[off];
        off += 1;
        let has_pid = pi & 0b001 != 0;
        let has_dcs = pi & 0b010 != 0;
        let has_ud = pi & 0b100 != 0;
        let has_scts = pi & 0b1000 != 0;
        let scts = if has_scts {
            if b.len() < off + Timestamp::LEN {
                pdu_fail!("ack pdu: truncated scts");
            }
            let t = Timestamp::from_bytes(&b[off..])?;
            off += Timestamp::LEN;
            Some(t)
        } else {
            None
        };
        let protocol_id = if has_pid {
            if b.len() <= off {
                pdu_fail!("ack pdu: missing pid");
            }
            let v = b[off];
            off += 1;
            Some(v)
        } else {
            None
        };
        let dcs = if has_dcs {
            if b.len() <= off {
                pdu_fail!("ack pdu: missing dcs");
            }
            let v = SimplisticDataCodingScheme::from_u8(b[off]);
            off += 1;
            Some(v)
        } else {
            None
        };
        let user_data = if has_ud {
            if b.len() <= off {
                pdu_fail!("ack pdu: missing user data length");
            }
            let udl = b[off];
            off += 1;
            Some(read_user_data(&b[off..], udhi, dcs.unwrap_or_default(), udl))
        } else {
            None
        };
        Ok(AckPdu { failure_cause: None, protocol_id, dcs, scts, user_data })
    }
}

/// Any decoded SMS TPDU, tagged by which concrete shape it turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsMessage {
    Submit(Pdu),
    Deliver(DeliverPdu),
    StatusReport(StatusReportPdu),
    Command(CommandPdu),
}
/// Which direction a raw PDU buffer travelled in, needed to disambiguate
/// the MTI field (see the module documentation).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PduDirection {
    /// Read back from the device's own outbox (`AT+CMGR`/`AT+CMGL` on a
    /// `StoredUnsent`/`StoredSent` slot): SMS-SUBMIT or SMS-COMMAND.
    Sent,
    /// Received from the network (any other storage status): SMS-DELIVER or
    /// SMS-STATUS-REPORT.
    Received,
}
impl SmsMessage {
    pub fn from_bytes(b: &[u8], direction: PduDirection) -> Result<SmsMessage, GsmError> {
        let (_sca, off) = PduAddress::parse(b, true)?;
        if b.len() <= off {
            pdu_fail!("pdu: missing first octet");
        }
        let mti = b[off] & 0b11;
        match (direction, mti) {
            (PduDirection::Sent, m) if m == MessageType::SmsSubmit as u8 => Ok(SmsMessage::Submit(Pdu::try_from(b)?)),
            (PduDirection::Sent, m) if m == MessageType::SmsCommandOrStatusReport as u8 => Ok(SmsMessage::Command(CommandPdu::try_from(b)?)),
            (PduDirection::Received, m) if m == MessageType::SmsDeliver as u8 => Ok(SmsMessage::Deliver(DeliverPdu::try_from(b)?)),
            (PduDirection::Received, m) if m == MessageType::SmsCommandOrStatusReport as u8 => Ok(SmsMessage::StatusReport(StatusReportPdu::try_from(b)?)),
            (_, m) => pdu_fail!("unexpected message type indicator {} for direction {:?}", m, direction),
        }
    }
    /// Serialize back to wire format, dispatching to the concrete variant's
    /// own encoder.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            SmsMessage::Submit(p) => p.as_bytes().0,
            SmsMessage::Deliver(p) => p.as_bytes(),
            SmsMessage::StatusReport(p) => p.as_bytes(),
            SmsMessage::Command(p) => p.as_bytes(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn address_roundtrip() {
        let addr: PduAddress = "+447700900123".parse().unwrap();
        assert_eq!(addr.to_string(), "+447700900123");
        let bytes = addr.as_bytes(false);
        let (back, consumed) = PduAddress::parse(&bytes, false).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(back, addr);
    }

    #[test]
    fn simple_submit_roundtrip() {
        let dest: PduAddress = "+447700900123".parse().unwrap();
        let data = GsmMessageData::encode_message("hello");
        assert_eq!(data.len(), 1);
        let pdu = Pdu::make_simple_message(dest, data.into_iter().next().unwrap());
        let (bytes, tpdu_len) = pdu.as_bytes();
        assert!(tpdu_len < bytes.len());
        let back = Pdu::try_from(&bytes[..]).unwrap();
        assert_eq!(back, pdu);
        let decoded = back.user_data.decode_message().unwrap();
        assert_eq!(decoded.text, "hello");
    }

    #[test]
    fn timestamp_roundtrip() {
        let ts = Timestamp { year: 23, month: 1, day: 15, hour: 9, minute: 30, second: 0, timezone_quarters: 4 };
        let bytes = ts.as_bytes();
        let back = Timestamp::from_bytes(&bytes).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn timestamp_negative_timezone_roundtrip() {
        let ts = Timestamp { year: 23, month: 1, day: 15, hour: 9, minute: 30, second: 0, timezone_quarters: -20 };
        let bytes = ts.as_bytes();
        let back = Timestamp::from_bytes(&bytes).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn deliver_pdu_wrong_mti_rejected() {
        let dest: PduAddress = "+447700900123".parse().unwrap();
        let data = GsmMessageData::encode_message("hi").into_iter().next().unwrap();
        let pdu = Pdu::make_simple_message(dest, data);
        let (bytes, _) = pdu.as_bytes();
        assert!(DeliverPdu::try_from(&bytes[..]).is_err());
    }

    #[test]
    fn alphanumeric_address_roundtrip() {
        let addr = PduAddress::alphanumeric("MYBANK");
        assert_eq!(addr.to_string(), "MYBANK");
        let bytes = addr.as_bytes(false);
        assert_eq!(bytes[1], 0xD0);
        let (back, consumed) = PduAddress::parse(&bytes, false).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(back.alphanumeric.as_deref(), Some("MYBANK"));
    }

    #[test]
    fn hex_data_roundtrip() {
        let bytes = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let s = HexData(&bytes).to_string();
        assert_eq!(s, "DEADBEEF");
        assert_eq!(HexData::decode(&s).unwrap(), bytes);
    }

    #[test]
    fn deliver_pdu_roundtrip() {
        let origin: PduAddress = "+447700900123".parse().unwrap();
        let data = GsmMessageData::encode_message("hello").into_iter().next().unwrap();
        let pdu = DeliverPdu {
            more_messages_to_send: true,
            status_report_indication: false,
            originating_address: origin,
            protocol_id: 0,
            dcs: SimplisticDataCodingScheme::default(),
            scts: Timestamp { year: 23, month: 1, day: 15, hour: 9, minute: 30, second: 0, timezone_quarters: 4 },
            user_data: data,
        };
        let bytes = pdu.as_bytes();
        let back = DeliverPdu::try_from(&bytes[..]).unwrap();
        assert_eq!(back, pdu);
    }

    #[test]
    fn status_report_pdu_roundtrip() {
        let recipient: PduAddress = "+447700900123".parse().unwrap();
        let pdu = StatusReportPdu {
            more_messages_to_send: false,
            message_id: 7,
            recipient_address: recipient,
            scts: Timestamp { year: 23, month: 1, day: 15, hour: 9, minute: 30, second: 0, timezone_quarters: 4 },
            discharge_time: Timestamp { year: 23, month: 1, day: 15, hour: 9, minute: 31, second: 0, timezone_quarters: 4 },
            status: DeliveryStatus(0x00),
        };
        let bytes = pdu.as_bytes();
        let back = StatusReportPdu::try_from(&bytes[..]).unwrap();
        assert_eq!(back, pdu);
    }

    #[test]
    fn command_pdu_roundtrip() {
        let destination: PduAddress = "+447700900123".parse().unwrap();
        let pdu = CommandPdu {
            message_id: 3,
            protocol_id: 0,
            command_type: 0,
            message_number: 1,
            destination,
            command_data: vec![0xAB, 0xCD],
        };
        let bytes = pdu.as_bytes();
        let back = CommandPdu::try_from(&bytes[..]).unwrap();
        assert_eq!(back, pdu);
    }

    #[test]
    fn ack_pdu_roundtrip_with_all_optional_fields() {
        let ack = AckPdu {
            failure_cause: None,
            protocol_id: Some(0),
            dcs: Some(SimplisticDataCodingScheme::default()),
            scts: Some(Timestamp { year: 23, month: 1, day: 15, hour: 9, minute: 30, second: 0, timezone_quarters: 4 }),
            user_data: Some(GsmMessageData::encode_message("ok").into_iter().next().unwrap()),
        };
        let bytes = ack.as_bytes();
        let back = AckPdu::try_from(&bytes[..]).unwrap();
        assert_eq!(back, ack);
    }

    #[test]
    fn ack_pdu_roundtrip_with_no_optional_fields() {
        let ack = AckPdu { failure_cause: None, protocol_id: None, dcs: None, scts: None, user_data: None };
        let bytes = ack.as_bytes();
        let back = AckPdu::try_from(&bytes[..]).unwrap();
        assert_eq!(back, ack);
    }

    #[test]
    fn sms_message_as_bytes_dispatches_to_variant() {
        let dest: PduAddress = "+447700900123".parse().unwrap();
        let data = GsmMessageData::encode_message("hi").into_iter().next().unwrap();
        let submit = Pdu::make_simple_message(dest, data);
        let (expected, _) = submit.as_bytes();
        let msg = SmsMessage::Submit(submit);
        assert_eq!(msg.as_bytes(), expected);
    }

    #[test]
    fn ack_pdu_skips_leading_sca() {
        // No SCA (00), first octet with no optional fields set (PI=0).
        let bytes = [0x00u8, 0x00, 0x00];
        let ack = AckPdu::try_from(&bytes[..]).unwrap();
        assert!(ack.scts.is_none());
        assert!(ack.protocol_id.is_none());
    }

    #[test]
    fn ack_pdu_with_real_sca_skips_it_before_first_octet() {
        let sca: PduAddress = "+31624000000".parse().unwrap();
        let mut bytes = sca.as_bytes(true);
        bytes.push(0x00); // first octet: no UDHI
        bytes.push(0b0010); // PI: has_dcs only
        bytes.push(SimplisticDataCodingScheme::default().as_u8());
        let ack = AckPdu::try_from(&bytes[..]).unwrap();
        assert!(ack.dcs.is_some());
        assert!(ack.protocol_id.is_none());
    }

    #[test]
    fn ack_pdu_missing_sca_prefix_needs_zero_byte_prepended() {
        // A device with `has_sms_sca_prefix == false` sends the ack pdu with
        // no SCA octet at all; the caller must prepend `00` before decoding,
        // same as MeTa::send_sms/SmsStore::send do.
        let raw = [0x00u8, 0b0010u8, SimplisticDataCodingScheme::default().as_u8()];
        let mut prefixed = vec![0x00u8];
        prefixed.extend_from_slice(&raw);
        let ack = AckPdu::try_from(&prefixed[..]).unwrap();
        assert!(ack.dcs.is_some());
    }
}
