use crate::datatypes::CommandStatus;
use async_trait::async_trait;

/// User callbacks around the wire.
///
/// `to_smsc` fires just before a PDU's octets are written to the socket;
/// `from_smsc` fires just after a complete PDU has been decoded. Hooks
/// must not block indefinitely; the session applies a soft timeout that
/// logs an overrun but never cancels a hook mid-action. A hook failure is
/// logged and swallowed, it never affects the session.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn to_smsc(
        &self,
        smpp_command: &str,
        log_id: &str,
        hook_metadata: Option<&str>,
        pdu: &[u8],
    ) -> crate::Result<()>;

    async fn from_smsc(
        &self,
        smpp_command: &str,
        log_id: &str,
        hook_metadata: Option<&str>,
        command_status: CommandStatus,
        pdu: &[u8],
    ) -> crate::Result<()>;
}

/// Default hook: does nothing.
#[derive(Debug, Default)]
pub struct NoopHook;

#[async_trait]
impl Hook for NoopHook {
    async fn to_smsc(
        &self,
        _smpp_command: &str,
        _log_id: &str,
        _hook_metadata: Option<&str>,
        _pdu: &[u8],
    ) -> crate::Result<()> {
        Ok(())
    }

    async fn from_smsc(
        &self,
        _smpp_command: &str,
        _log_id: &str,
        _hook_metadata: Option<&str>,
        _command_status: CommandStatus,
        _pdu: &[u8],
    ) -> crate::Result<()> {
        Ok(())
    }
}
