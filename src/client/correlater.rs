// ABOUTME: Ties outbound requests, their responses, SMSC message ids and eventual
// ABOUTME: delivery receipts back to the caller's log_id and hook metadata

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time a pending correlation stays alive.
pub const DEFAULT_CORRELATION_TTL: Duration = Duration::from_secs(15 * 60);

/// The caller-side context remembered for one in-flight request.
#[derive(Debug, Clone)]
pub struct CorrelationEntry {
    pub log_id: String,
    pub hook_metadata: Option<String>,
    expires_at: Instant,
}

impl CorrelationEntry {
    fn new(log_id: String, hook_metadata: Option<String>, ttl: Duration) -> Self {
        Self {
            log_id,
            hook_metadata,
            expires_at: Instant::now() + ttl,
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Maps sequence numbers and SMSC message ids back to caller context.
///
/// Two keyings are maintained. A response is matched to its request by
/// sequence number; a delivery receipt arrives much later carrying the
/// SMSC-assigned receipted_message_id instead, so after submit_sm_resp the
/// same context is re-keyed by message id. Entries expire after the TTL
/// and are purged lazily on access plus by a periodic sweep.
#[async_trait]
pub trait Correlater: Send + Sync {
    /// Record a pending request. Called before the request's octets are
    /// written to the socket.
    async fn put(&self, sequence_number: u32, log_id: String, hook_metadata: Option<String>);

    /// Look up and consume the context for a response's sequence number.
    async fn get(&self, sequence_number: u32) -> Option<CorrelationEntry>;

    /// Re-key the context by the SMSC-assigned message id.
    async fn put_message_id(&self, message_id: String, log_id: String, hook_metadata: Option<String>);

    /// Look up the context for a delivery receipt's receipted_message_id.
    async fn get_by_message_id(&self, message_id: &str) -> Option<CorrelationEntry>;

    /// Purge expired entries.
    async fn sweep(&self);
}

/// Default correlater: two concurrent maps in process memory.
///
/// Correlations do not survive a restart; a receipt for a message submitted
/// by a previous incarnation of the process goes unmatched and is handed to
/// the hook with an empty log_id.
#[derive(Debug)]
pub struct InMemoryCorrelater {
    ttl: Duration,
    by_sequence: DashMap<u32, CorrelationEntry>,
    by_message_id: DashMap<String, CorrelationEntry>,
}

impl InMemoryCorrelater {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            by_sequence: DashMap::new(),
            by_message_id: DashMap::new(),
        }
    }

    /// Entries currently held, expired or not. For logs and tests.
    pub fn len(&self) -> usize {
        self.by_sequence.len() + self.by_message_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCorrelater {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_TTL)
    }
}

#[async_trait]
impl Correlater for InMemoryCorrelater {
    async fn put(&self, sequence_number: u32, log_id: String, hook_metadata: Option<String>) {
        self.by_sequence.insert(
            sequence_number,
            CorrelationEntry::new(log_id, hook_metadata, self.ttl),
        );
    }

    async fn get(&self, sequence_number: u32) -> Option<CorrelationEntry> {
        let (_, entry) = self.by_sequence.remove(&sequence_number)?;
        match entry.expired() {
            true => None,
            false => Some(entry),
        }
    }

    async fn put_message_id(&self, message_id: String, log_id: String, hook_metadata: Option<String>) {
        self.by_message_id.insert(
            message_id,
            CorrelationEntry::new(log_id, hook_metadata, self.ttl),
        );
    }

    async fn get_by_message_id(&self, message_id: &str) -> Option<CorrelationEntry> {
        let entry = self.by_message_id.get(message_id)?.clone();
        if entry.expired() {
            drop(self.by_message_id.remove(message_id));
            return None;
        }
        Some(entry)
    }

    async fn sweep(&self) {
        let before = self.len();
        self.by_sequence.retain(|_, entry| !entry.expired());
        self.by_message_id.retain(|_, entry| !entry.expired());
        let evicted = before - self.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.len(), "correlation sweep");
        }
    }
}
