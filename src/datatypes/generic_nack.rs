use crate::codec::{CodecError, Decodable, Encodable, HEADER_LENGTH, PduHeader};
use crate::datatypes::{CommandId, CommandStatus};
use bytes::{Buf, BytesMut};
use std::io::Cursor;

/// generic_nack PDU (Section 4.3.1).
///
/// Sent when a received PDU cannot be processed at all: an unknown
/// command_id, an impossible command_length, or a header that cannot be
/// parsed. Carries the offending PDU's sequence number when it could be
/// determined, 0 otherwise.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl GenericNack {
    pub fn new(command_status: CommandStatus, sequence_number: u32) -> Self {
        Self {
            command_status,
            sequence_number,
        }
    }

    pub fn invalid_command_id(sequence_number: u32) -> Self {
        Self::new(CommandStatus::InvalidCommandId, sequence_number)
    }

    pub fn invalid_command_length(sequence_number: u32) -> Self {
        Self::new(CommandStatus::InvalidCommandLength, sequence_number)
    }

    pub fn system_error(sequence_number: u32) -> Self {
        Self::new(CommandStatus::SystemError, sequence_number)
    }
}

impl Encodable for GenericNack {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader {
            command_length: HEADER_LENGTH as u32,
            command_id: CommandId::GenericNack as u32,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        }
        .write(buf);
        Ok(())
    }
}

impl Decodable for GenericNack {
    fn command_id() -> CommandId {
        CommandId::GenericNack
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        if buf.has_remaining() {
            return Err(CodecError::MalformedPdu {
                field: "generic_nack_body",
                reason: format!("{} unexpected body octets", buf.remaining()),
            });
        }
        Ok(GenericNack {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
        })
    }
}
