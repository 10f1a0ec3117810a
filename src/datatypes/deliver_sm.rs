use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, get_cstring, get_u8, put_cstring,
};
use crate::datatypes::{
    CommandId, CommandStatus, MAX_ADDR_LENGTH, MAX_MESSAGE_ID_LENGTH, MAX_SERVICE_TYPE_LENGTH,
    MAX_SHORT_MESSAGE_LENGTH, MAX_TIME_LENGTH, Tlv, tags,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// deliver_sm PDU (Section 4.6.1).
///
/// SMSC-originated delivery: either a mobile-originated message or a
/// delivery receipt for an earlier submit_sm. The body mirrors submit_sm;
/// a receipt identifies the original message through the
/// receipted_message_id TLV, not through the sequence number.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub sequence_number: u32,

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

    pub tlvs: Vec<Tlv>,
}

/// deliver_sm_resp PDU (Section 4.6.2).
///
/// The message_id field is unused in this direction and always encoded as
/// an empty C-octet string.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl DeliverSm {
    pub fn tlv(&self, tag: u16) -> Option<&Tlv> {
        self.tlvs.iter().find(|t| t.tag == tag)
    }

    /// The receipted_message_id TLV value, when this delivery is a receipt.
    pub fn receipted_message_id(&self) -> Option<String> {
        self.tlv(tags::RECEIPTED_MESSAGE_ID)
            .map(|tlv| tlv.cstring_value())
    }

    /// Delivery receipts set the message-type bits of esm_class (0x3C
    /// masks the SMSC Delivery Receipt and intermediate notification
    /// types).
    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class & 0x3C != 0
    }
}

impl DeliverSmResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
        }
    }
}

impl Encodable for DeliverSm {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        if self.short_message.len() > MAX_SHORT_MESSAGE_LENGTH {
            return Err(CodecError::MalformedPdu {
                field: "short_message",
                reason: format!(
                    "{} octets exceed the {MAX_SHORT_MESSAGE_LENGTH} octet inline limit",
                    self.short_message.len()
                ),
            });
        }

        PduHeader {
            command_length: 0, // patched by to_bytes
            command_id: CommandId::DeliverSm as u32,
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

impl Decodable for DeliverSm {
    fn command_id() -> CommandId {
        CommandId::DeliverSm
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

        Ok(DeliverSm {
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

impl Encodable for DeliverSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader {
            command_length: 0,
            command_id: CommandId::DeliverSmResp as u32,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        }
        .write(buf);

        // message_id, unused and always NULL in this direction
        put_cstring(buf, "", MAX_MESSAGE_ID_LENGTH);
        Ok(())
    }
}

impl Decodable for DeliverSmResponse {
    fn command_id() -> CommandId {
        CommandId::DeliverSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        if buf.has_remaining() {
            let _ = get_cstring(buf, MAX_MESSAGE_ID_LENGTH, "message_id")?;
        }

        Ok(DeliverSmResponse {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
        })
    }
}
