use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, get_cstring, get_u8, put_cstring,
};
use crate::datatypes::{
    CommandId, CommandStatus, MAX_ADDR_LENGTH, MAX_MESSAGE_ID_LENGTH, MAX_SERVICE_TYPE_LENGTH,
    MAX_SHORT_MESSAGE_LENGTH, MAX_TIME_LENGTH, Tlv, tags,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// submit_sm PDU (Section 4.4.1).
///
/// Submits a short message to the SMSC for onward transmission to a mobile
/// subscriber. `short_message` holds the octets produced by the per-message
/// text codec; texts whose encoded form exceeds 254 octets travel in a
/// message_payload TLV with `sm_length` 0 instead.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    pub sequence_number: u32,

    // Mandatory parameters
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub source_addr: String,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    pub destination_addr: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,

    // Optional parameters, caller-supplied tags pass through untouched
    pub tlvs: Vec<Tlv>,
}

/// submit_sm_resp PDU (Section 4.4.2).
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// SMSC-assigned id, the key later delivery receipts refer back to.
    pub message_id: String,
}

impl SubmitSm {
    /// First TLV with the given tag, if present.
    pub fn tlv(&self, tag: u16) -> Option<&Tlv> {
        self.tlvs.iter().find(|t| t.tag == tag)
    }

    pub fn message_payload(&self) -> Option<&Tlv> {
        self.tlv(tags::MESSAGE_PAYLOAD)
    }
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, message_id: impl Into<String>) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.into(),
        }
    }

    pub fn error(sequence_number: u32, status: CommandStatus) -> Self {
        Self {
            command_status: status,
            sequence_number,
            message_id: String::new(),
        }
    }
}

impl Encodable for SubmitSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.short_message.len() > MAX_SHORT_MESSAGE_LENGTH {
            return Err(CodecError::MalformedPdu {
                field: "short_message",
                reason: format!(
                    "{} octets exceed the {MAX_SHORT_MESSAGE_LENGTH} octet inline limit; use a message_payload TLV",
                    self.short_message.len()
                ),
            });
        }

        PduHeader {
            command_length: 0, // patched by to_bytes
            command_id: CommandId::SubmitSm as u32,
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
        }
        .write(buf);

        put_cstring(buf, &self.service_type, MAX_SERVICE_TYPE_LENGTH);
        buf.put_u8(self.source_addr_ton);
        buf.put_u8(self.source_addr_npi);
        put_cstring(buf, &self.source_addr, MAX_ADDR_LENGTH);
        buf.put_u8(self.dest_addr_ton);
        buf.put_u8(self.dest_addr_npi);
        put_cstring(buf, &self.destination_addr, MAX_ADDR_LENGTH);
        buf.put_u8(self.esm_class);
        buf.put_u8(self.protocol_id);
        buf.put_u8(self.priority_flag);
        put_cstring(buf, &self.schedule_delivery_time, MAX_TIME_LENGTH);
        put_cstring(buf, &self.validity_period, MAX_TIME_LENGTH);
        buf.put_u8(self.registered_delivery);
        buf.put_u8(self.replace_if_present_flag);
        buf.put_u8(self.data_coding);
        buf.put_u8(self.sm_default_msg_id);
        buf.put_u8(self.short_message.len() as u8);
        buf.extend_from_slice(&self.short_message);

        for tlv in &self.tlvs {
            tlv.encode(buf);
        }

        Ok(())
    }
}

impl Decodable for SubmitSm {
    fn command_id() -> CommandId {
        CommandId::SubmitSm
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let service_type = get_cstring(buf, MAX_SERVICE_TYPE_LENGTH, "service_type")?;
        let source_addr_ton = get_u8(buf, "source_addr_ton")?;
        let source_addr_npi = get_u8(buf, "source_addr_npi")?;
        let source_addr = get_cstring(buf, MAX_ADDR_LENGTH, "source_addr")?;
        let dest_addr_ton = get_u8(buf, "dest_addr_ton")?;
        let dest_addr_npi = get_u8(buf, "dest_addr_npi")?;
        let destination_addr = get_cstring(buf, MAX_ADDR_LENGTH, "destination_addr")?;
        let esm_class = get_u8(buf, "esm_class")?;
        let protocol_id = get_u8(buf, "protocol_id")?;
        let priority_flag = get_u8(buf, "priority_flag")?;
        let schedule_delivery_time = get_cstring(buf, MAX_TIME_LENGTH, "schedule_delivery_time")?;
        let validity_period = get_cstring(buf, MAX_TIME_LENGTH, "validity_period")?;
        let registered_delivery = get_u8(buf, "registered_delivery")?;
        let replace_if_present_flag = get_u8(buf, "replace_if_present_flag")?;
        let data_coding = get_u8(buf, "data_coding")?;
        let sm_default_msg_id = get_u8(buf, "sm_default_msg_id")?;

        let sm_length = get_u8(buf, "sm_length")? as usize;
        if sm_length > MAX_SHORT_MESSAGE_LENGTH {
            return Err(CodecError::MalformedPdu {
                field: "sm_length",
                reason: format!("{sm_length} exceeds the {MAX_SHORT_MESSAGE_LENGTH} octet limit"),
            });
        }
        if buf.remaining() < sm_length {
            return Err(CodecError::MalformedPdu {
                field: "short_message",
                reason: format!("sm_length {sm_length} but only {} octets left", buf.remaining()),
            });
        }
        let short_message = buf.copy_to_bytes(sm_length);

        let mut tlvs = Vec::new();
        while buf.has_remaining() {
            tlvs.push(Tlv::decode(buf)?);
        }

        Ok(SubmitSm {
            sequence_number: header.sequence_number,
            service_type,
            source_addr_ton,
            source_addr_npi,
            source_addr,
            dest_addr_ton,
            dest_addr_npi,
            destination_addr,
            esm_class,
            protocol_id,
            priority_flag,
            schedule_delivery_time,
            validity_period,
            registered_delivery,
            replace_if_present_flag,
            data_coding,
            sm_default_msg_id,
            short_message,
            tlvs,
        })
    }
}

impl Encodable for SubmitSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader {
            command_length: 0,
            command_id: CommandId::SubmitSmResp as u32,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        }
        .write(buf);

        put_cstring(buf, &self.message_id, MAX_MESSAGE_ID_LENGTH);
        Ok(())
    }
}

impl Decodable for SubmitSmResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        // Error responses commonly omit the message_id field entirely.
        let message_id = match buf.has_remaining() {
            true => get_cstring(buf, MAX_MESSAGE_ID_LENGTH, "message_id")?,
            false => String::new(),
        };

        Ok(SubmitSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_submit() -> SubmitSm {
        SubmitSm {
            sequence_number: 2,
            service_type: "CMT".to_string(),
            source_addr_ton: 1,
            source_addr_npi: 1,
            source_addr: "254700".to_string(),
            dest_addr_ton: 1,
            dest_addr_npi: 1,
            destination_addr: "254711".to_string(),
            esm_class: 8,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 5,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: Bytes::from_static(b"Hello"),
            tlvs: Vec::new(),
        }
    }

    #[test]
    fn submit_sm_roundtrip() {
        let original = sample_submit();
        let bytes = original.to_bytes().unwrap();

        assert_eq!(&bytes[0..4], &(bytes.len() as u32).to_be_bytes());
        assert_eq!(&bytes[4..8], &0x0000_0004u32.to_be_bytes());

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = SubmitSm::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn submit_sm_roundtrip_with_tlvs() {
        let mut original = sample_submit();
        original.short_message = Bytes::new();
        original.tlvs.push(Tlv::new(
            tags::MESSAGE_PAYLOAD,
            Bytes::from(vec![0x41; 300]),
        ));
        original
            .tlvs
            .push(Tlv::new(tags::USER_MESSAGE_REFERENCE, &[0x00, 0x07][..]));

        let bytes = original.to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = SubmitSm::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
        assert_eq!(decoded.message_payload().unwrap().value.len(), 300);
        assert!(decoded.tlv(tags::USER_MESSAGE_REFERENCE).is_some());
    }

    #[test]
    fn submit_sm_inline_limit() {
        let mut pdu = sample_submit();

        pdu.short_message = Bytes::from(vec![0x41; MAX_SHORT_MESSAGE_LENGTH]);
        let bytes = pdu.to_bytes().unwrap();
        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = SubmitSm::decode(header, &mut cursor).unwrap();
        assert_eq!(decoded.short_message.len(), MAX_SHORT_MESSAGE_LENGTH);

        pdu.short_message = Bytes::from(vec![0x41; MAX_SHORT_MESSAGE_LENGTH + 1]);
        assert!(matches!(
            pdu.to_bytes(),
            Err(CodecError::MalformedPdu { field: "short_message", .. })
        ));
    }

    #[test]
    fn submit_sm_resp_roundtrip() {
        let original = SubmitSmResponse::new(2, "MID-9");
        let bytes = original.to_bytes().unwrap();

        let mut cursor = Cursor::new(bytes.as_ref());
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = SubmitSmResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(original, decoded);
    }

    #[test]
    fn submit_sm_resp_error_without_message_id() {
        let mut buf = BytesMut::new();
        PduHeader {
            command_length: 16,
            command_id: CommandId::SubmitSmResp as u32,
            command_status: CommandStatus::Throttled,
            sequence_number: 5,
        }
        .write(&mut buf);

        let mut cursor = Cursor::new(&buf[..]);
        let header = PduHeader::read(&mut cursor).unwrap();
        let decoded = SubmitSmResponse::decode(header, &mut cursor).unwrap();

        assert_eq!(decoded.command_status, CommandStatus::Throttled);
        assert_eq!(decoded.message_id, "");
    }
}
