use crate::codec::{CodecError, Decodable, Encodable, HEADER_LENGTH, PduHeader};
use crate::datatypes::{CommandId, CommandStatus};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

/// unbind PDU (Section 4.2.1).
///
/// Deregisters the ESME from the SMSC: a logoff request that closes the
/// current SMPP session without closing the TCP connection by itself.
/// Either side may send it.
#[derive(Clone, Debug, PartialEq)]
pub struct Unbind {
    pub sequence_number: u32,
}

/// unbind_resp PDU (Section 4.2.2).
#[derive(Clone, Debug, PartialEq)]
pub struct UnbindResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl Unbind {
    pub fn new(sequence_number: u32) -> Self {
        Self { sequence_number }
    }
}

impl UnbindResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
        }
    }
}

impl Encodable for Unbind {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader {
            command_length: HEADER_LENGTH as u32,
            command_id: CommandId::Unbind as u32,
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
        }
        .write(buf);
        Ok(())
    }
}

impl Decodable for Unbind {
    fn command_id() -> CommandId {
        CommandId::Unbind
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        if buf.has_remaining() {
            return Err(CodecError::MalformedPdu {
                field: "unbind_body",
                reason: format!("{} unexpected body octets", buf.remaining()),
            });
        }
        Ok(Unbind {
            sequence_number: header.sequence_number,
        })
    }
}

impl Encodable for UnbindResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader {
            command_length: HEADER_LENGTH as u32,
            command_id: CommandId::UnbindResp as u32,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        }
        .write(buf);
        Ok(())
    }
}

impl Decodable for UnbindResponse {
    fn command_id() -> CommandId {
        CommandId::UnbindResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        if buf.has_remaining() {
            return Err(CodecError::MalformedPdu {
                field: "unbind_resp_body",
                reason: format!("{} unexpected body octets", buf.remaining()),
            });
        }
        Ok(UnbindResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbind_roundtrip() {
        let original = Unbind::new(123);
        let bytes = original.to_bytes().unwrap();
        assert_eq!(bytes.len(), 16);

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = Unbind::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn unbind_resp_roundtrip() {
        let original = UnbindResponse::new(123);
        let bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = UnbindResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }
}
