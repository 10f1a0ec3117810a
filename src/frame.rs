//! Provides a type representing one SMPP PDU on the wire as well as
//! utilities for parsing PDUs out of a byte stream.

use crate::codec::{CodecError, Decodable, Encodable, HEADER_LENGTH, PduHeader};
use crate::datatypes::{
    BindTransceiver, BindTransceiverResponse, CommandId, CommandStatus, DeliverSm,
    DeliverSmResponse, EnquireLink, EnquireLinkResponse, GenericNack, SubmitSm, SubmitSmResponse,
    Unbind, UnbindResponse,
};
use bytes::{Buf, Bytes};
use core::fmt;
use std::io::Cursor;

/// One decoded SMPP PDU.
///
/// The `Raw` variant carries a PDU whose command_id is outside the
/// transceiver operation set: the header is parsed, the body is kept as
/// octets, and the session answers it with generic_nack instead of failing
/// the decode.
#[derive(Clone, Debug)]
pub enum Pdu {
    BindTransceiver(BindTransceiver),
    BindTransceiverResp(BindTransceiverResponse),
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),
    Unbind(Unbind),
    UnbindResp(UnbindResponse),
    GenericNack(GenericNack),
    Raw { header: PduHeader, body: Bytes },
}

impl Pdu {
    /// Checks whether an entire PDU is buffered in `src`. Returns the
    /// command_length on success so the caller can size its read.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        if src.remaining() < HEADER_LENGTH {
            return Err(CodecError::TruncatedHeader {
                available: src.remaining(),
            });
        }

        let position = src.position();
        let command_length = src.get_u32();
        src.set_position(position);

        if command_length < HEADER_LENGTH as u32 || command_length > crate::codec::MAX_PDU_SIZE {
            return Err(CodecError::InvalidCommandLength {
                length: command_length,
            });
        }

        if src.remaining() < command_length as usize {
            return Err(CodecError::TruncatedBody {
                command_length,
                available: src.remaining(),
            });
        }

        Ok(command_length as usize)
    }

    /// Parse one PDU from `src`. Consumes exactly `command_length` octets;
    /// the body cursor handed to the per-type decoders is bounded to this
    /// PDU so trailing-TLV loops cannot run into a following frame.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Pdu, CodecError> {
        let header = PduHeader::read(src)?;

        let body_length = header.body_length();
        if src.remaining() < body_length {
            return Err(CodecError::TruncatedBody {
                command_length: header.command_length,
                available: src.remaining() + HEADER_LENGTH,
            });
        }
        let body = src.copy_to_bytes(body_length);

        let Ok(command_id) = CommandId::try_from(header.command_id) else {
            return Ok(Pdu::Raw { header, body });
        };

        let mut buf = Cursor::new(body.as_ref());
        let pdu = match command_id {
            CommandId::BindTransceiver => {
                Pdu::BindTransceiver(BindTransceiver::decode(header, &mut buf)?)
            }
            CommandId::BindTransceiverResp => {
                Pdu::BindTransceiverResp(BindTransceiverResponse::decode(header, &mut buf)?)
            }
            CommandId::SubmitSm => Pdu::SubmitSm(Box::new(SubmitSm::decode(header, &mut buf)?)),
            CommandId::SubmitSmResp => Pdu::SubmitSmResp(SubmitSmResponse::decode(header, &mut buf)?),
            CommandId::DeliverSm => Pdu::DeliverSm(Box::new(DeliverSm::decode(header, &mut buf)?)),
            CommandId::DeliverSmResp => {
                Pdu::DeliverSmResp(DeliverSmResponse::decode(header, &mut buf)?)
            }
            CommandId::EnquireLink => Pdu::EnquireLink(EnquireLink::decode(header, &mut buf)?),
            CommandId::EnquireLinkResp => {
                Pdu::EnquireLinkResp(EnquireLinkResponse::decode(header, &mut buf)?)
            }
            CommandId::Unbind => Pdu::Unbind(Unbind::decode(header, &mut buf)?),
            CommandId::UnbindResp => Pdu::UnbindResp(UnbindResponse::decode(header, &mut buf)?),
            CommandId::GenericNack => Pdu::GenericNack(GenericNack::decode(header, &mut buf)?),
        };

        Ok(pdu)
    }

    /// The raw command_id for this PDU.
    pub fn command_id(&self) -> u32 {
        match self {
            Pdu::BindTransceiver(_) => CommandId::BindTransceiver as u32,
            Pdu::BindTransceiverResp(_) => CommandId::BindTransceiverResp as u32,
            Pdu::SubmitSm(_) => CommandId::SubmitSm as u32,
            Pdu::SubmitSmResp(_) => CommandId::SubmitSmResp as u32,
            Pdu::DeliverSm(_) => CommandId::DeliverSm as u32,
            Pdu::DeliverSmResp(_) => CommandId::DeliverSmResp as u32,
            Pdu::EnquireLink(_) => CommandId::EnquireLink as u32,
            Pdu::EnquireLinkResp(_) => CommandId::EnquireLinkResp as u32,
            Pdu::Unbind(_) => CommandId::Unbind as u32,
            Pdu::UnbindResp(_) => CommandId::UnbindResp as u32,
            Pdu::GenericNack(_) => CommandId::GenericNack as u32,
            Pdu::Raw { header, .. } => header.command_id,
        }
    }

    /// The operation name used in logs, hooks and job payloads.
    pub fn command_name(&self) -> &'static str {
        match self {
            Pdu::Raw { .. } => "unknown",
            other => {
                // command_id() only returns known values for non-Raw frames
                CommandId::try_from(other.command_id())
                    .map(CommandId::wire_name)
                    .unwrap_or("unknown")
            }
        }
    }

    pub fn sequence_number(&self) -> u32 {
        match self {
            Pdu::BindTransceiver(pdu) => pdu.sequence_number,
            Pdu::BindTransceiverResp(pdu) => pdu.sequence_number,
            Pdu::SubmitSm(pdu) => pdu.sequence_number,
            Pdu::SubmitSmResp(pdu) => pdu.sequence_number,
            Pdu::DeliverSm(pdu) => pdu.sequence_number,
            Pdu::DeliverSmResp(pdu) => pdu.sequence_number,
            Pdu::EnquireLink(pdu) => pdu.sequence_number,
            Pdu::EnquireLinkResp(pdu) => pdu.sequence_number,
            Pdu::Unbind(pdu) => pdu.sequence_number,
            Pdu::UnbindResp(pdu) => pdu.sequence_number,
            Pdu::GenericNack(pdu) => pdu.sequence_number,
            Pdu::Raw { header, .. } => header.sequence_number,
        }
    }

    /// The command_status carried by this PDU; requests always report Ok.
    pub fn command_status(&self) -> CommandStatus {
        match self {
            Pdu::BindTransceiverResp(pdu) => pdu.command_status,
            Pdu::SubmitSmResp(pdu) => pdu.command_status,
            Pdu::DeliverSmResp(pdu) => pdu.command_status,
            Pdu::UnbindResp(pdu) => pdu.command_status,
            Pdu::GenericNack(pdu) => pdu.command_status,
            Pdu::Raw { header, .. } => header.command_status,
            _ => CommandStatus::Ok,
        }
    }

    pub fn is_response(&self) -> bool {
        self.command_id() & 0x8000_0000 != 0
    }

    /// Serialize to a wire frame with a correct command_length prefix.
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        match self {
            Pdu::BindTransceiver(pdu) => pdu.to_bytes(),
            Pdu::BindTransceiverResp(pdu) => pdu.to_bytes(),
            Pdu::SubmitSm(pdu) => pdu.to_bytes(),
            Pdu::SubmitSmResp(pdu) => pdu.to_bytes(),
            Pdu::DeliverSm(pdu) => pdu.to_bytes(),
            Pdu::DeliverSmResp(pdu) => pdu.to_bytes(),
            Pdu::EnquireLink(pdu) => pdu.to_bytes(),
            Pdu::EnquireLinkResp(pdu) => pdu.to_bytes(),
            Pdu::Unbind(pdu) => pdu.to_bytes(),
            Pdu::UnbindResp(pdu) => pdu.to_bytes(),
            Pdu::GenericNack(pdu) => pdu.to_bytes(),
            Pdu::Raw { header, body } => {
                let mut buf = bytes::BytesMut::with_capacity(HEADER_LENGTH + body.len());
                PduHeader {
                    command_length: (HEADER_LENGTH + body.len()) as u32,
                    ..*header
                }
                .write(&mut buf);
                buf.extend_from_slice(body);
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Display for Pdu {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Pdu::Raw { header, .. } => write!(
                fmt,
                "unknown command {:#010x} seq={}",
                header.command_id, header.sequence_number
            ),
            other => write!(
                fmt,
                "{} seq={} status={}",
                other.command_name(),
                other.sequence_number(),
                other.command_status()
            ),
        }
    }
}
