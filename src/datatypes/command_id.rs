// ABOUTME: Defines the SMPP v3.4 command identifiers used by a transceiver session
// ABOUTME: Implements command_id response-bit handling and wire-name mapping

use num_enum::TryFromPrimitive;

/// SMPP v3.4 Command Identifiers (Table 4-1), transceiver subset.
///
/// The command_id field identifies the SMPP PDU type. Per SMPP v3.4
/// specification Section 2.2.1, this is a 4-octet field in the PDU header:
/// bit 31 distinguishes responses (set) from requests (clear), and the low
/// bits carry the operation.
///
/// Only the operations a transceiver session can legitimately exchange are
/// represented. Anything else decodes as a raw frame and is answered with
/// generic_nack.
#[derive(TryFromPrimitive)]
#[repr(u32)]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Copy)]
pub enum CommandId {
    /// generic_nack PDU (Section 4.3.1), error response for invalid PDUs
    GenericNack = 0x8000_0000,

    /// submit_sm PDU (Section 4.4.1), submit a short message
    SubmitSm = 0x0000_0004,
    /// submit_sm_resp PDU (Section 4.4.2)
    SubmitSmResp = 0x8000_0004,

    /// deliver_sm PDU (Section 4.6.1), SMSC-originated delivery
    DeliverSm = 0x0000_0005,
    /// deliver_sm_resp PDU (Section 4.6.2)
    DeliverSmResp = 0x8000_0005,

    /// unbind PDU (Section 4.2.1)
    Unbind = 0x0000_0006,
    /// unbind_resp PDU (Section 4.2.2)
    UnbindResp = 0x8000_0006,

    /// bind_transceiver PDU (Section 4.2.5)
    BindTransceiver = 0x0000_0009,
    /// bind_transceiver_resp PDU (Section 4.2.6)
    BindTransceiverResp = 0x8000_0009,

    /// enquire_link PDU (Section 4.11.1), link verification request
    EnquireLink = 0x0000_0015,
    /// enquire_link_resp PDU (Section 4.11.2)
    EnquireLinkResp = 0x8000_0015,
}

impl CommandId {
    /// Check if this command_id represents a response PDU.
    pub fn is_response(self) -> bool {
        (self as u32) & 0x8000_0000 != 0
    }

    /// The operation name as it appears in logs, hooks and job payloads.
    pub fn wire_name(self) -> &'static str {
        match self {
            CommandId::GenericNack => "generic_nack",
            CommandId::SubmitSm => "submit_sm",
            CommandId::SubmitSmResp => "submit_sm_resp",
            CommandId::DeliverSm => "deliver_sm",
            CommandId::DeliverSmResp => "deliver_sm_resp",
            CommandId::Unbind => "unbind",
            CommandId::UnbindResp => "unbind_resp",
            CommandId::BindTransceiver => "bind_transceiver",
            CommandId::BindTransceiverResp => "bind_transceiver_resp",
            CommandId::EnquireLink => "enquire_link",
            CommandId::EnquireLinkResp => "enquire_link_resp",
        }
    }
}
