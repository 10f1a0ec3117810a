pub mod client;
pub mod codec;
pub(crate) mod connection;
pub mod datatypes;
pub mod encoding;
pub mod frame;

#[cfg(test)]
mod tests;

// Re-export the wire-level types for direct access
pub use codec::{CodecError, Decodable, Encodable, PduHeader};
pub use frame::Pdu;

// Re-export the main client API for easy access
pub use client::{
    Broker, Client, ClientConfig, Correlater, Hook, InMemoryBroker, OutboundJob, RateLimiter,
    SequenceGenerator, SessionError, SessionResult, SessionState, ThrottleHandler,
};

/// Error returned by the pluggable collaborator traits (broker, hooks).
///
/// The wire and session layers use dedicated `enum` errors (`CodecError`,
/// `SessionError`) because those are hit and matched on during normal
/// execution. User-supplied collaborators can fail in arbitrary ways, so
/// their contract is the boxed form.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for collaborator operations.
///
/// # Examples
///
/// Bind to an SMSC, enqueue one message, and run the session until stopped:
///
/// ```rust,no_run
/// use esme::{Broker, Client, ClientConfig, InMemoryBroker, OutboundJob};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
///     let config = ClientConfig::new("127.0.0.1", 2775, "smppclient1", "password");
///     let broker = Arc::new(InMemoryBroker::new(1000));
///
///     broker
///         .enqueue(OutboundJob::submit_sm("L1", "Hello", "254700", "254711"))
///         .await?;
///
///     let client = Arc::new(Client::new(config, broker));
///     let runner = {
///         let client = Arc::clone(&client);
///         tokio::spawn(async move { client.run().await })
///     };
///
///     // ... later, from a signal handler or admin surface:
///     client.stop();
///     runner.await??;
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
