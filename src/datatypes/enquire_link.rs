use crate::codec::{CodecError, Decodable, Encodable, HEADER_LENGTH, PduHeader};
use crate::datatypes::{CommandId, CommandStatus};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

/// enquire_link PDU (Section 4.11.1).
///
/// A confidence check of the communication path between ESME and SMSC; the
/// recipient answers with enquire_link_resp. The link prober sends one of
/// these every probe interval, and the reader answers the SMSC's probes in
/// kind. Requests always carry a NULL command_status, so only the sequence
/// number is modeled.
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLink {
    pub sequence_number: u32,
}

/// enquire_link_resp PDU (Section 4.11.2).
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLinkResponse {
    pub sequence_number: u32,
}

impl EnquireLink {
    pub fn new(sequence_number: u32) -> Self {
        Self { sequence_number }
    }
}

impl EnquireLinkResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self { sequence_number }
    }
}

fn decode_empty_body(buf: &Cursor<&[u8]>, field: &'static str) -> Result<(), CodecError> {
    if buf.has_remaining() {
        return Err(CodecError::MalformedPdu {
            field,
            reason: format!("{} unexpected body octets", buf.remaining()),
        });
    }
    Ok(())
}

impl Encodable for EnquireLink {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader {
            command_length: HEADER_LENGTH as u32,
            command_id: CommandId::EnquireLink as u32,
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
        }
        .write(buf);
        Ok(())
    }
}

impl Decodable for EnquireLink {
    fn command_id() -> CommandId {
        CommandId::EnquireLink
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        decode_empty_body(buf, "enquire_link_body")?;
        Ok(EnquireLink {
            sequence_number: header.sequence_number,
        })
    }
}

impl Encodable for EnquireLinkResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader {
            command_length: HEADER_LENGTH as u32,
            command_id: CommandId::EnquireLinkResp as u32,
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
        }
        .write(buf);
        Ok(())
    }
}

impl Decodable for EnquireLinkResponse {
    fn command_id() -> CommandId {
        CommandId::EnquireLinkResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        decode_empty_body(buf, "enquire_link_resp_body")?;
        Ok(EnquireLinkResponse {
            sequence_number: header.sequence_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enquire_link_wire_format() {
        let bytes = EnquireLink::new(3).to_bytes().unwrap();

        let expected = [
            0x00, 0x00, 0x00, 0x10, // command_length (16, empty body)
            0x00, 0x00, 0x00, 0x15, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x03, // sequence_number
        ];
        assert_eq!(bytes.as_ref(), &expected);
    }

    #[test]
    fn enquire_link_roundtrip() {
        let original = EnquireLink::new(42);
        let bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = EnquireLink::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn enquire_link_resp_roundtrip() {
        let original = EnquireLinkResponse::new(42);
        let bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = EnquireLinkResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn enquire_link_rejects_body_octets() {
        let header = PduHeader {
            command_length: 20,
            command_id: CommandId::EnquireLink as u32,
            command_status: CommandStatus::Ok,
            sequence_number: 1,
        };

        let extra = [0x01, 0x02, 0x03, 0x04];
        let mut cursor = Cursor::new(&extra[..]);
        assert!(matches!(
            EnquireLink::decode(header, &mut cursor),
            Err(CodecError::MalformedPdu { .. })
        ));
    }
}
