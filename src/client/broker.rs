//! The broker contract and the outbound job schema.
//!
//! The broker is the seam between the application and the session engine:
//! the application enqueues jobs, the dispatcher dequeues them. The
//! in-process default is a bounded channel; Redis- or AMQP-backed
//! implementations live outside this crate and only need the two methods.

use crate::encoding::{ErrorPolicy, TextEncoding};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// The only job schema version this crate speaks.
pub const JOB_PROTOCOL_VERSION: &str = "1";

/// Source of outbound work.
///
/// `dequeue` may suspend until a job is available; its latency is absorbed
/// by the dispatcher's cooperative scheduling. The session assumes no
/// ordering beyond "what dequeue returns is what is attempted next", and
/// never re-enqueues: a job whose write failed may be re-delivered by the
/// broker, which is where at-least-once semantics come from.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn enqueue(&self, job: OutboundJob) -> crate::Result<()>;
    async fn dequeue(&self) -> crate::Result<OutboundJob>;
}

/// A broker-dequeued unit of work.
///
/// On the wire (for brokers that serialize) this is a JSON object tagged
/// by `smpp_command`, with a sibling `version` field validated by
/// [`OutboundJob::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "smpp_command", rename_all = "snake_case")]
pub enum OutboundJob {
    SubmitSm(SubmitSmJob),
    EnquireLink(ControlJob),
    Unbind(ControlJob),
}

/// A submit_sm job. Fields left `None` fall back to the session defaults
/// from the client configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmitSmJob {
    #[serde(default)]
    pub log_id: String,
    pub short_message: String,
    pub source_addr: String,
    pub destination_addr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<TextEncoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec_error_policy: Option<ErrorPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_addr_ton: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_addr_npi: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_addr_ton: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_addr_npi: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esm_class: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_flag: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_delivery_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_delivery: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_if_present_flag: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sm_default_msg_id: Option<u8>,
    /// Caller-supplied optional parameters, passed through to the PDU.
    /// Values are hex octets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tlvs: Vec<JobTlv>,
}

/// A job with no submit body: enquire_link or unbind on demand.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlJob {
    #[serde(default)]
    pub log_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_metadata: Option<String>,
}

/// An optional parameter supplied with a job: tag plus hex-encoded value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTlv {
    pub tag: u16,
    pub value: String,
}

impl JobTlv {
    /// Decode the hex value into octets.
    pub fn octets(&self) -> Result<Vec<u8>, JobError> {
        let cleaned: String = self.value.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.len() % 2 != 0 {
            return Err(JobError::BadTlvValue { tag: self.tag });
        }
        (0..cleaned.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&cleaned[i..i + 2], 16)
                    .map_err(|_| JobError::BadTlvValue { tag: self.tag })
            })
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported job protocol version '{0}', expected '{JOB_PROTOCOL_VERSION}'")]
    UnsupportedVersion(String),

    #[error("TLV {tag:#06x} value is not valid hex octets")]
    BadTlvValue { tag: u16 },
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: String,
    #[serde(flatten)]
    job: OutboundJob,
}

impl OutboundJob {
    /// Convenience constructor for the common case.
    pub fn submit_sm(
        log_id: impl Into<String>,
        short_message: impl Into<String>,
        source_addr: impl Into<String>,
        destination_addr: impl Into<String>,
    ) -> Self {
        OutboundJob::SubmitSm(SubmitSmJob {
            log_id: log_id.into(),
            short_message: short_message.into(),
            source_addr: source_addr.into(),
            destination_addr: destination_addr.into(),
            ..SubmitSmJob::default()
        })
    }

    /// Parse a serialized job, validating `version` and `smpp_command`.
    /// A job arriving without a log_id gets a generated one so correlation
    /// never silently degrades.
    pub fn from_json(raw: &[u8]) -> Result<Self, JobError> {
        let envelope: Envelope = serde_json::from_slice(raw)?;
        if envelope.version != JOB_PROTOCOL_VERSION {
            return Err(JobError::UnsupportedVersion(envelope.version));
        }

        let mut job = envelope.job;
        if job.log_id().is_empty() {
            let generated = generate_log_id();
            tracing::debug!(log_id = %generated, "job arrived without log_id, generated one");
            job.set_log_id(generated);
        }
        Ok(job)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, JobError> {
        let envelope = Envelope {
            version: JOB_PROTOCOL_VERSION.to_string(),
            job: self.clone(),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    pub fn log_id(&self) -> &str {
        match self {
            OutboundJob::SubmitSm(job) => &job.log_id,
            OutboundJob::EnquireLink(job) | OutboundJob::Unbind(job) => &job.log_id,
        }
    }

    pub fn hook_metadata(&self) -> Option<&str> {
        match self {
            OutboundJob::SubmitSm(job) => job.hook_metadata.as_deref(),
            OutboundJob::EnquireLink(job) | OutboundJob::Unbind(job) => {
                job.hook_metadata.as_deref()
            }
        }
    }

    pub fn command_name(&self) -> &'static str {
        match self {
            OutboundJob::SubmitSm(_) => "submit_sm",
            OutboundJob::EnquireLink(_) => "enquire_link",
            OutboundJob::Unbind(_) => "unbind",
        }
    }

    fn set_log_id(&mut self, log_id: String) {
        match self {
            OutboundJob::SubmitSm(job) => job.log_id = log_id,
            OutboundJob::EnquireLink(job) | OutboundJob::Unbind(job) => job.log_id = log_id,
        }
    }
}

/// Generate a log id for jobs that arrive without one.
pub(crate) fn generate_log_id() -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    token[..17].to_string()
}

/// The trivial in-process broker: a bounded channel.
///
/// Enqueueing suspends when the channel is full, which is how backpressure
/// reaches the producing application while the dispatcher is parked by the
/// rate limiter or throttle handler.
pub struct InMemoryBroker {
    tx: mpsc::Sender<OutboundJob>,
    rx: Mutex<mpsc::Receiver<OutboundJob>>,
}

impl InMemoryBroker {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(&self, job: OutboundJob) -> crate::Result<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| -> crate::Error { "broker channel closed".into() })
    }

    async fn dequeue(&self) -> crate::Result<OutboundJob> {
        self.rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| -> crate::Error { "broker channel closed".into() })
    }
}
