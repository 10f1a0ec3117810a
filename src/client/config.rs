use crate::client::error::SessionError;
use crate::encoding::{ErrorPolicy, TextEncoding};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Everything a session needs to know about one SMSC account.
///
/// Only the host, port and credentials are mandatory; every other field
/// has the documented default and can be set directly or through the
/// `with_*` helpers. The struct deserializes from the JSON declaration the
/// binary's `--client` flag points at.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub smsc_host: String,
    pub smsc_port: u16,
    pub system_id: String,
    pub password: String,

    pub system_type: String,
    pub addr_ton: u8,
    pub addr_npi: u8,
    pub address_range: String,
    pub interface_version: u8,

    // submit_sm defaults, overridable per job
    pub service_type: String,
    pub source_addr_ton: u8,
    pub source_addr_npi: u8,
    pub dest_addr_ton: u8,
    pub dest_addr_npi: u8,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub sm_default_msg_id: u8,

    pub encoding: TextEncoding,
    pub codec_error_policy: ErrorPolicy,

    #[serde(deserialize_with = "secs::deserialize")]
    pub enquire_link_interval: Duration,
    #[serde(deserialize_with = "secs::deserialize")]
    pub socket_timeout: Duration,
    #[serde(deserialize_with = "secs::deserialize")]
    pub drain_duration: Duration,
    #[serde(deserialize_with = "secs::deserialize")]
    pub hook_timeout: Duration,
    #[serde(deserialize_with = "secs::deserialize")]
    pub correlation_ttl: Duration,

    /// Re-enter CONNECTING after a lost session, with exponential backoff.
    pub reconnect: bool,

    /// Sends admitted per second by the default rate limiter.
    pub send_rate: f64,

    /// Attached to every log record of the session span.
    pub log_metadata: HashMap<String, String>,

    /// Identifies this client instance in logs. Random token if unset.
    pub client_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            smsc_host: String::new(),
            smsc_port: 0,
            system_id: String::new(),
            password: String::new(),
            system_type: String::new(),
            addr_ton: 0,
            addr_npi: 0,
            address_range: String::new(),
            interface_version: 0x34,
            service_type: "CMT".to_string(),
            source_addr_ton: 1,
            source_addr_npi: 1,
            dest_addr_ton: 1,
            dest_addr_npi: 1,
            esm_class: 8,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 5,
            replace_if_present_flag: 0,
            sm_default_msg_id: 0,
            encoding: TextEncoding::Gsm0338,
            codec_error_policy: ErrorPolicy::Strict,
            enquire_link_interval: Duration::from_secs_f64(55.0),
            socket_timeout: Duration::from_secs_f64(30.0),
            drain_duration: Duration::from_secs_f64(8.0),
            hook_timeout: Duration::from_secs_f64(5.0),
            correlation_ttl: Duration::from_secs(15 * 60),
            reconnect: true,
            send_rate: 100.0,
            log_metadata: HashMap::new(),
            client_id: crate::client::broker::generate_log_id(),
        }
    }
}

impl ClientConfig {
    pub fn new(
        smsc_host: impl Into<String>,
        smsc_port: u16,
        system_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            smsc_host: smsc_host.into(),
            smsc_port,
            system_id: system_id.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding, policy: ErrorPolicy) -> Self {
        self.encoding = encoding;
        self.codec_error_policy = policy;
        self
    }

    pub fn with_enquire_link_interval(mut self, interval: Duration) -> Self {
        self.enquire_link_interval = interval;
        self
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = timeout;
        self
    }

    pub fn with_drain_duration(mut self, drain: Duration) -> Self {
        self.drain_duration = drain;
        self
    }

    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_send_rate(mut self, send_rate: f64) -> Self {
        self.send_rate = send_rate;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_log_metadata(mut self, log_metadata: HashMap<String, String>) -> Self {
        self.log_metadata = log_metadata;
        self
    }

    /// Check the mandatory fields, returning the first problem found.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.smsc_host.is_empty() {
            return Err(SessionError::Config("smsc_host is required".into()));
        }
        if self.smsc_port == 0 {
            return Err(SessionError::Config("smsc_port is required".into()));
        }
        if self.system_id.is_empty() {
            return Err(SessionError::Config("system_id is required".into()));
        }
        if self.password.is_empty() {
            return Err(SessionError::Config("password is required".into()));
        }
        if self.send_rate <= 0.0 {
            return Err(SessionError::Config("send_rate must be positive".into()));
        }
        Ok(())
    }
}

/// Durations appear in config files as seconds, fractions allowed.
mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(serde::de::Error::custom("duration must be a non-negative number of seconds"));
        }
        Ok(Duration::from_secs_f64(seconds))
    }
}
