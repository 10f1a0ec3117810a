use crate::codec::{
    CodecError, Decodable, Encodable, HEADER_LENGTH, PduHeader, get_cstring, get_u8, put_cstring,
};
use crate::datatypes::{
    CommandId, CommandStatus, MAX_ADDRESS_RANGE_LENGTH, MAX_PASSWORD_LENGTH,
    MAX_SYSTEM_ID_LENGTH, MAX_SYSTEM_TYPE_LENGTH, Tlv,
};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// bind_transceiver PDU (Section 4.2.5).
///
/// Registers the ESME with the SMSC for a session that can both submit
/// messages and receive deliveries over one connection. This is the only
/// bind mode the session engine uses.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiver {
    pub sequence_number: u32,

    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub interface_version: u8,
    pub addr_ton: u8,
    pub addr_npi: u8,
    pub address_range: String,
}

/// bind_transceiver_resp PDU (Section 4.2.6).
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiverResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    pub system_id: String,
    /// sc_interface_version TLV, when the SMSC advertises one.
    pub sc_interface_version: Option<Tlv>,
}

impl Encodable for BindTransceiver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0, // patched by to_bytes
            command_id: CommandId::BindTransceiver as u32,
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
        };
        header.write(buf);

        put_cstring(buf, &self.system_id, MAX_SYSTEM_ID_LENGTH);
        put_cstring(buf, &self.password, MAX_PASSWORD_LENGTH);
        put_cstring(buf, &self.system_type, MAX_SYSTEM_TYPE_LENGTH);
        buf.put_u8(self.interface_version);
        buf.put_u8(self.addr_ton);
        buf.put_u8(self.addr_npi);
        put_cstring(buf, &self.address_range, MAX_ADDRESS_RANGE_LENGTH);

        Ok(())
    }
}

impl Decodable for BindTransceiver {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = get_cstring(buf, MAX_SYSTEM_ID_LENGTH, "system_id")?;
        let password = get_cstring(buf, MAX_PASSWORD_LENGTH, "password")?;
        let system_type = get_cstring(buf, MAX_SYSTEM_TYPE_LENGTH, "system_type")?;
        let interface_version = get_u8(buf, "interface_version")?;
        let addr_ton = get_u8(buf, "addr_ton")?;
        let addr_npi = get_u8(buf, "addr_npi")?;
        let address_range = get_cstring(buf, MAX_ADDRESS_RANGE_LENGTH, "address_range")?;

        Ok(BindTransceiver {
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl Encodable for BindTransceiverResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: CommandId::BindTransceiverResp as u32,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.write(buf);

        put_cstring(buf, &self.system_id, MAX_SYSTEM_ID_LENGTH);
        if let Some(tlv) = &self.sc_interface_version {
            tlv.encode(buf);
        }

        Ok(())
    }
}

impl Decodable for BindTransceiverResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransceiverResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        // An error response may carry an empty body.
        if header.command_length == HEADER_LENGTH as u32 {
            return Ok(BindTransceiverResponse {
                command_status: header.command_status,
                sequence_number: header.sequence_number,
                system_id: String::new(),
                sc_interface_version: None,
            });
        }

        let system_id = get_cstring(buf, MAX_SYSTEM_ID_LENGTH, "system_id")?;
        let sc_interface_version = match buf.has_remaining() {
            true => Some(Tlv::decode(buf)?),
            false => None,
        };

        Ok(BindTransceiverResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            sc_interface_version,
        })
    }
}

impl BindTransceiverResponse {
    pub fn new(sequence_number: u32, system_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.into(),
            sc_interface_version: None,
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            system_id: String::new(),
            sc_interface_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::tags;

    fn sample_bind() -> BindTransceiver {
        BindTransceiver {
            sequence_number: 1,
            system_id: "smppclient1".to_string(),
            password: "password".to_string(),
            system_type: String::new(),
            interface_version: 0x34,
            addr_ton: 0,
            addr_npi: 0,
            address_range: String::new(),
        }
    }

    #[test]
    fn bind_transceiver_wire_format() {
        let bytes = sample_bind().to_bytes().unwrap();

        // header
        assert_eq!(&bytes[0..4], &(bytes.len() as u32).to_be_bytes());
        assert_eq!(&bytes[4..8], &0x0000_0009u32.to_be_bytes());
        assert_eq!(&bytes[8..12], &0u32.to_be_bytes());
        assert_eq!(&bytes[12..16], &1u32.to_be_bytes());
        // body
        assert_eq!(&bytes[16..28], b"smppclient1\0");
        assert_eq!(&bytes[28..37], b"password\0");
        assert_eq!(bytes[37], 0); // system_type
        assert_eq!(bytes[38], 0x34); // interface_version
        assert_eq!(&bytes[39..41], &[0, 0]); // addr_ton, addr_npi
        assert_eq!(bytes[41], 0); // address_range
        assert_eq!(bytes.len(), 42);
    }

    #[test]
    fn bind_transceiver_roundtrip() {
        let original = sample_bind();
        let bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = BindTransceiver::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn bind_response_roundtrip_with_tlv() {
        let original = BindTransceiverResponse {
            command_status: CommandStatus::Ok,
            sequence_number: 1,
            system_id: "SMSC".to_string(),
            sc_interface_version: Some(Tlv::new(tags::SC_INTERFACE_VERSION, &[0x34][..])),
        };

        let bytes = original.to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = BindTransceiverResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn bind_response_error_with_empty_body() {
        let original = BindTransceiverResponse::error(9, CommandStatus::BindFailed);
        let bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = BindTransceiverResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded.command_status, CommandStatus::BindFailed);
        assert_eq!(decoded.system_id, "");
    }
}
