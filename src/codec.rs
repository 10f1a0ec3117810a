// SMPP v3.4 wire codec: the PDU header model, the Encodable/Decodable
// traits implemented by the types in `datatypes`, and the field-level
// primitives (integers, C-octet strings) they are built from.
//
// Framing relies on one trustworthy length prefix. The header is read as
// exactly four big-endian u32 fields; everything after it is the body whose
// extent is fixed by command_length. Any deviation from exact reads risks
// permanent frame slip on a byte-stream transport, which is why decode
// failures here are terminal for the session that hit them.

use crate::datatypes::{CommandId, CommandStatus};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Length of the fixed PDU header: command_length, command_id,
/// command_status and sequence_number, 4 octets each.
pub const HEADER_LENGTH: usize = 16;

/// Upper bound on command_length accepted from the peer, to prevent a
/// hostile or corrupted length prefix from driving a huge allocation.
pub const MAX_PDU_SIZE: u32 = 64 * 1024;

/// SMPP v3.4 PDU header (Section 2.2.1), common to all PDUs.
///
/// `command_id` is kept as the raw wire value rather than the typed
/// [`CommandId`]: a PDU with an unknown operation code must still decode far
/// enough that the session can answer it with generic_nack carrying the
/// original sequence number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: u32,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    /// Decode a header from the buffer, validating the length prefix.
    pub fn read(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < HEADER_LENGTH {
            return Err(CodecError::TruncatedHeader {
                available: buf.remaining(),
            });
        }

        let command_length = buf.get_u32();
        let command_id = buf.get_u32();
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        if command_length < HEADER_LENGTH as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidCommandLength {
                length: command_length,
            });
        }

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id);
        buf.put_u32(u32::from(self.command_status));
        buf.put_u32(self.sequence_number);
    }

    /// Octets of body that follow this header on the wire.
    pub fn body_length(&self) -> usize {
        self.command_length as usize - HEADER_LENGTH
    }
}

/// Types that can be serialized to the SMPP wire format.
pub trait Encodable {
    /// Encode the full PDU (header plus body) into `buf`. The
    /// command_length written by the header may be a placeholder; callers
    /// that need correct framing go through [`Encodable::to_bytes`], which
    /// patches it after the body length is known.
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Serialize to a frame with a correct command_length prefix.
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;

        let length = buf.len() as u32;
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Types that can be parsed from the SMPP wire format.
pub trait Decodable: Sized {
    /// The operation code this PDU type answers to.
    fn command_id() -> CommandId;

    /// Decode the PDU body from a cursor bounded to exactly this PDU's
    /// body octets. The header has already been read and validated.
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() as u32 {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Wire-format errors with enough context to pick a generic_nack status.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("truncated header: need {HEADER_LENGTH} octets, have {available}")]
    TruncatedHeader { available: usize },

    #[error("truncated body: command_length {command_length} but only {available} octets buffered")]
    TruncatedBody { command_length: u32, available: usize },

    #[error("impossible command_length {length}: must be {HEADER_LENGTH}..={MAX_PDU_SIZE}")]
    InvalidCommandLength { length: u32 },

    #[error("unexpected command_id {actual:#010x}, expected {expected:?}")]
    UnexpectedCommandId { expected: CommandId, actual: u32 },

    #[error("malformed PDU in field '{field}': {reason}")]
    MalformedPdu { field: &'static str, reason: String },

    #[error("field '{field}' is not valid UTF-8")]
    Utf8 {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl CodecError {
    /// Map a decode failure to the command_status a generic_nack should
    /// carry back to the peer.
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidCommandLength { .. }
            | CodecError::TruncatedHeader { .. }
            | CodecError::TruncatedBody { .. } => CommandStatus::InvalidCommandLength,
            CodecError::UnexpectedCommandId { .. } => CommandStatus::InvalidCommandId,
            CodecError::MalformedPdu { .. } | CodecError::Utf8 { .. } => CommandStatus::SystemError,
        }
    }
}

/// Get a u8 from the buffer.
pub(crate) fn get_u8(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<u8, CodecError> {
    if !buf.has_remaining() {
        return Err(CodecError::MalformedPdu {
            field,
            reason: "body ended early".to_string(),
        });
    }
    Ok(buf.get_u8())
}

/// Read a C-octet string: ASCII octets up to the first NUL, NUL consumed.
///
/// `max_length` is the field width from the specification including the
/// terminator. A body that runs out before a terminator is malformed; on a
/// byte-stream transport there is no way to resynchronize after it.
pub(crate) fn get_cstring(
    buf: &mut Cursor<&[u8]>,
    max_length: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let limit = buf.remaining().min(max_length);
    let chunk = buf.chunk();
    let terminator = chunk[..limit.min(chunk.len())].iter().position(|&b| b == 0);

    let Some(end) = terminator else {
        return Err(CodecError::MalformedPdu {
            field,
            reason: format!("missing NUL terminator within {max_length} octets"),
        });
    };

    let raw = buf.copy_to_bytes(end);
    buf.advance(1); // terminator
    String::from_utf8(raw.to_vec()).map_err(|source| CodecError::Utf8 { field, source })
}

/// Write a C-octet string: the value clamped to the field width, then NUL.
pub(crate) fn put_cstring(buf: &mut BytesMut, value: &str, max_length: usize) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(max_length - 1);
    buf.put_slice(&bytes[..len]);
    buf.put_u8(0);
}
