use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

use crate::codec::CodecError;

// Standard TLV tag constants per SMPP v3.4 specification
pub mod tags {
    pub const PAYLOAD_TYPE: u16 = 0x0019;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const MESSAGE_STATE: u16 = 0x0427;
}

/// An optional parameter in Tag-Length-Value form (Section 5.3.2).
///
/// Unknown tags must be tolerated on receipt and caller-supplied tags pass
/// through submit_sm untouched, so the value is kept as raw octets; the
/// length field is derived from the value at encode time rather than stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Tlv {
    /// Uniquely identifies the optional parameter.
    pub tag: u16,

    /// The parameter data.
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// Total octets this TLV occupies on the wire.
    pub fn wire_length(&self) -> usize {
        4 + self.value.len()
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.tag);
        buf.put_u16(self.value.len() as u16);
        buf.extend_from_slice(&self.value);
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::MalformedPdu {
                field: "tlv",
                reason: format!("{} octets left, need at least 4 for tag and length", buf.remaining()),
            });
        }

        let tag = buf.get_u16();
        let length = buf.get_u16() as usize;

        if buf.remaining() < length {
            return Err(CodecError::MalformedPdu {
                field: "tlv",
                reason: format!("tag {tag:#06x} declares {length} octets, {} available", buf.remaining()),
            });
        }

        let value = buf.copy_to_bytes(length);
        Ok(Self { tag, value })
    }

    /// Interpret the value as a C-octet string. SMSCs differ on whether the
    /// terminator is included inside TLV values, so a trailing NUL is
    /// stripped if present.
    pub fn cstring_value(&self) -> String {
        let raw = match self.value.last() {
            Some(0) => &self.value[..self.value.len() - 1],
            _ => &self.value[..],
        };
        String::from_utf8_lossy(raw).into_owned()
    }
}
