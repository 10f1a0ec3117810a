//! The session engine and its pluggable collaborators.
//!
//! The [`Client`] owns the connection and the protocol state machine;
//! everything it needs beyond that is a capability passed in at
//! construction: where outbound work comes from ([`Broker`]), how sends
//! are admitted ([`RateLimiter`], [`ThrottleHandler`]), how requests are
//! tied back to callers ([`Correlater`], [`SequenceGenerator`]) and what
//! the application wants to observe ([`Hook`]). Each trait has a default
//! implementation good enough for a single-process deployment.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use esme::client::{Broker, Client, ClientConfig, InMemoryBroker, OutboundJob};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let broker = Arc::new(InMemoryBroker::new(1000));
//! let config = ClientConfig::new("127.0.0.1", 2775, "smppclient1", "password");
//! let client = Arc::new(Client::new(config, broker.clone()));
//!
//! broker
//!     .enqueue(OutboundJob::submit_sm("L1", "Hello", "254700", "254711"))
//!     .await?;
//!
//! client.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod correlater;
pub mod error;
pub mod hooks;
pub mod rate_limit;
pub mod sequence;
pub mod session;
pub mod throttle;

pub use broker::{Broker, ControlJob, InMemoryBroker, JobError, JobTlv, OutboundJob, SubmitSmJob};
pub use config::ClientConfig;
pub use correlater::{CorrelationEntry, Correlater, InMemoryCorrelater};
pub use error::{SessionError, SessionResult};
pub use hooks::{Hook, NoopHook};
pub use rate_limit::{RateLimiter, TokenBucket, Unlimited};
pub use sequence::{AtomicSequence, MAX_SEQUENCE_NUMBER, SequenceGenerator};
pub use session::{Client, SessionState, StatsSnapshot};
pub use throttle::{SlidingWindowThrottle, ThrottleHandler};
