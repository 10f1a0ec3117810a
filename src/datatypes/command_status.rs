// ABOUTME: Defines SMPP v3.4 command status codes per specification Section 5.1.3
// ABOUTME: Implements throttle-signal classification used by the admission control path

use num_enum::FromPrimitive;

/// SMPP v3.4 Command Status Codes (Section 5.1.3).
///
/// Request PDUs always carry 0x00000000; responses carry the actual result.
/// SMSCs in the field return vendor codes outside Table 5-2, and a result
/// code we do not recognize must still reach the `from_smsc` hook rather
/// than kill the session, so unknown values land in [`CommandStatus::Other`]
/// instead of failing the decode.
#[derive(FromPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// No error, operation completed successfully
    Ok = 0x0000_0000,

    /// Message length is invalid
    InvalidMsgLength = 0x0000_0001,
    /// Command length is invalid
    InvalidCommandLength = 0x0000_0002,
    /// Invalid command ID
    InvalidCommandId = 0x0000_0003,
    /// Incorrect BIND status for given command
    IncorrectBindStatus = 0x0000_0004,
    /// ESME already in bound state
    AlreadyBound = 0x0000_0005,
    /// Invalid priority flag
    InvalidPriorityFlag = 0x0000_0006,
    /// Invalid registered delivery flag
    InvalidRegisteredDeliveryFlag = 0x0000_0007,
    /// System error on the SMSC
    SystemError = 0x0000_0008,
    /// Invalid source address
    InvalidSourceAddress = 0x0000_000A,
    /// Invalid destination address
    InvalidDestinationAddress = 0x0000_000B,
    /// Message ID is invalid
    InvalidMessageId = 0x0000_000C,
    /// Bind failed
    BindFailed = 0x0000_000D,
    /// Invalid password
    InvalidPassword = 0x0000_000E,
    /// Invalid system_id
    InvalidSystemId = 0x0000_000F,

    /// Message queue full (ESME_RMSGQFUL)
    MessageQueueFull = 0x0000_0014,
    /// Invalid service_type
    InvalidServiceType = 0x0000_0015,

    /// Throttling error, ESME has exceeded allowed message limits
    /// (ESME_RTHROTTLED)
    Throttled = 0x0000_0058,

    /// Invalid scheduled delivery time
    InvalidScheduledDeliveryTime = 0x0000_0061,
    /// Invalid validity period
    InvalidValidityPeriod = 0x0000_0062,

    /// Any status outside the recognized set, vendor codes included
    #[num_enum(catch_all)]
    Other(u32),
}

impl CommandStatus {
    pub fn is_ok(self) -> bool {
        self == CommandStatus::Ok
    }

    /// Result codes that mean the SMSC is shedding load. Both feed the
    /// throttle handler: a full message queue and an explicit throttle are
    /// the same signal from the sender's point of view.
    pub fn is_throttle_signal(self) -> bool {
        matches!(
            self,
            CommandStatus::Throttled | CommandStatus::MessageQueueFull
        )
    }

    /// The raw wire value.
    pub fn value(self) -> u32 {
        u32::from(self)
    }
}

impl From<CommandStatus> for u32 {
    fn from(status: CommandStatus) -> u32 {
        match status {
            CommandStatus::Ok => 0x0000_0000,
            CommandStatus::InvalidMsgLength => 0x0000_0001,
            CommandStatus::InvalidCommandLength => 0x0000_0002,
            CommandStatus::InvalidCommandId => 0x0000_0003,
            CommandStatus::IncorrectBindStatus => 0x0000_0004,
            CommandStatus::AlreadyBound => 0x0000_0005,
            CommandStatus::InvalidPriorityFlag => 0x0000_0006,
            CommandStatus::InvalidRegisteredDeliveryFlag => 0x0000_0007,
            CommandStatus::SystemError => 0x0000_0008,
            CommandStatus::InvalidSourceAddress => 0x0000_000A,
            CommandStatus::InvalidDestinationAddress => 0x0000_000B,
            CommandStatus::InvalidMessageId => 0x0000_000C,
            CommandStatus::BindFailed => 0x0000_000D,
            CommandStatus::InvalidPassword => 0x0000_000E,
            CommandStatus::InvalidSystemId => 0x0000_000F,
            CommandStatus::MessageQueueFull => 0x0000_0014,
            CommandStatus::InvalidServiceType => 0x0000_0015,
            CommandStatus::Throttled => 0x0000_0058,
            CommandStatus::InvalidScheduledDeliveryTime => 0x0000_0061,
            CommandStatus::InvalidValidityPeriod => 0x0000_0062,
            CommandStatus::Other(code) => code,
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandStatus::Other(code) => write!(f, "unrecognized status {code:#010x}"),
            known => write!(f, "{known:?} ({:#010x})", known.value()),
        }
    }
}
