mod bind_transceiver;
mod command_id;
mod command_status;
mod deliver_sm;
mod enquire_link;
mod generic_nack;
mod submit_sm;
mod tlv;
mod unbind;

pub use bind_transceiver::{BindTransceiver, BindTransceiverResponse};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use generic_nack::GenericNack;
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use tlv::{Tlv, tags};
pub use unbind::{Unbind, UnbindResponse};

// SMPP v3.4 field width limits, terminator included where the field is a
// C-octet string. Shared across the PDU types.
pub const MAX_SYSTEM_ID_LENGTH: usize = 16;
pub const MAX_PASSWORD_LENGTH: usize = 9;
pub const MAX_SYSTEM_TYPE_LENGTH: usize = 13;
pub const MAX_ADDRESS_RANGE_LENGTH: usize = 41;
pub const MAX_SERVICE_TYPE_LENGTH: usize = 6;
pub const MAX_ADDR_LENGTH: usize = 21;
pub const MAX_TIME_LENGTH: usize = 17;
pub const MAX_MESSAGE_ID_LENGTH: usize = 65;

/// Longest short_message that fits inline; anything larger travels in a
/// message_payload TLV with sm_length 0.
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;
