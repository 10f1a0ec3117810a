// The session engine: owns the socket, the state machine, and the three
// cooperating loops (dispatcher, reader, link prober) that share one
// full-duplex connection.
//
// Concurrency rules, in one place:
//  - the write half sits behind an async mutex held for the span of one
//    complete PDU write; writes never interleave
//  - the read half is owned by whichever phase is reading (the bind
//    handshake, then the reader loop, then the unbind drain)
//  - a correlation entry is inserted strictly before the request's octets
//    reach the socket, so a fast response can never miss it
//  - reply paths (deliver_sm_resp, enquire_link_resp, unbind_resp,
//    generic_nack) write under the same lock but bypass the rate limiter
//    and throttle handler

use crate::client::broker::{Broker, OutboundJob, SubmitSmJob, generate_log_id};
use crate::client::config::ClientConfig;
use crate::client::correlater::{Correlater, InMemoryCorrelater};
use crate::client::error::{SessionError, SessionResult};
use crate::client::hooks::{Hook, NoopHook};
use crate::client::rate_limit::{RateLimiter, TokenBucket};
use crate::client::sequence::{AtomicSequence, SequenceGenerator};
use crate::client::throttle::{SlidingWindowThrottle, ThrottleHandler};
use crate::connection::{self, ReadError, ReadHalf, WriteHalf};
use crate::datatypes::{
    BindTransceiver, CommandStatus, DeliverSm, DeliverSmResponse, EnquireLink,
    EnquireLinkResponse, GenericNack, MAX_SHORT_MESSAGE_LENGTH, SubmitSm, SubmitSmResponse, Tlv,
    Unbind, UnbindResponse, tags,
};
use crate::encoding::encode_text;
use crate::frame::Pdu;
use bytes::Bytes;
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

const RECONNECT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const RECONNECT_MAX_BACKOFF: Duration = Duration::from_secs(60);

type SharedWriter = Arc<Mutex<WriteHalf>>;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Connecting,
    OpenUnbound,
    BoundTrx,
    Unbinding,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Closed => "closed",
            SessionState::Connecting => "connecting",
            SessionState::OpenUnbound => "open_unbound",
            SessionState::BoundTrx => "bound_trx",
            SessionState::Unbinding => "unbinding",
        };
        f.write_str(name)
    }
}

/// Why the bound phase ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEnd {
    /// `stop` was requested locally.
    Stopped,
    /// The peer unbound, or acknowledged an unbind we sent through the
    /// job queue. No further unbind is owed.
    PeerUnbind,
}

#[derive(Debug, Default)]
struct SessionCounters {
    pdus_sent: AtomicU64,
    pdus_received: AtomicU64,
    binds: AtomicU64,
    submits_acked: AtomicU64,
    discarded_jobs: AtomicU64,
    throttle_responses: AtomicU64,
    throttle_denials: AtomicU64,
    probes_sent: AtomicU64,
    reconnects: AtomicU64,
}

/// A point-in-time copy of the session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub pdus_sent: u64,
    pub pdus_received: u64,
    pub binds: u64,
    pub submits_acked: u64,
    pub discarded_jobs: u64,
    pub throttle_responses: u64,
    pub throttle_denials: u64,
    pub probes_sent: u64,
    pub reconnects: u64,
}

/// An SMPP v3.4 transceiver client.
///
/// Owns the connection, the sequence generator and the correlater, plus
/// references to the injected broker, rate limiter, throttle handler and
/// hook. [`Client::run`] drives the whole lifecycle: connect, bind, the
/// three loops, teardown, and reconnection with exponential backoff when
/// configured. [`Client::stop`] requests a graceful shutdown from any
/// task.
pub struct Client {
    config: ClientConfig,
    broker: Arc<dyn Broker>,
    sequence: Arc<dyn SequenceGenerator>,
    correlater: Arc<dyn Correlater>,
    rate_limiter: Arc<dyn RateLimiter>,
    throttle: Arc<dyn ThrottleHandler>,
    hook: Arc<dyn Hook>,
    state: RwLock<SessionState>,
    counters: SessionCounters,
    shutdown: watch::Sender<bool>,
    pong: Notify,
}

impl Client {
    /// A client with the default collaborators: token-bucket rate limiter
    /// at `config.send_rate`, sliding-window throttle handler, in-memory
    /// correlater, atomic sequence generator, no-op hook.
    pub fn new(config: ClientConfig, broker: Arc<dyn Broker>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            broker,
            sequence: Arc::new(AtomicSequence::new()),
            correlater: Arc::new(InMemoryCorrelater::new(config.correlation_ttl)),
            rate_limiter: Arc::new(TokenBucket::new(config.send_rate)),
            throttle: Arc::new(SlidingWindowThrottle::default()),
            hook: Arc::new(NoopHook),
            state: RwLock::new(SessionState::Closed),
            counters: SessionCounters::default(),
            shutdown,
            pong: Notify::new(),
            config,
        }
    }

    pub fn with_sequence_generator(mut self, sequence: Arc<dyn SequenceGenerator>) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_correlater(mut self, correlater: Arc<dyn Correlater>) -> Self {
        self.correlater = correlater;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_throttle_handler(mut self, throttle: Arc<dyn ThrottleHandler>) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn stats(&self) -> StatsSnapshot {
        let c = &self.counters;
        StatsSnapshot {
            pdus_sent: c.pdus_sent.load(Ordering::Relaxed),
            pdus_received: c.pdus_received.load(Ordering::Relaxed),
            binds: c.binds.load(Ordering::Relaxed),
            submits_acked: c.submits_acked.load(Ordering::Relaxed),
            discarded_jobs: c.discarded_jobs.load(Ordering::Relaxed),
            throttle_responses: c.throttle_responses.load(Ordering::Relaxed),
            throttle_denials: c.throttle_denials.load(Ordering::Relaxed),
            probes_sent: c.probes_sent.load(Ordering::Relaxed),
            reconnects: c.reconnects.load(Ordering::Relaxed),
        }
    }

    /// Request a graceful shutdown: the dispatcher stops dequeueing, the
    /// session drains for `drain_duration`, sends unbind, and closes.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run the client until it is stopped or fails unrecoverably.
    ///
    /// Recoverable session loss (transport errors, framing errors, a peer
    /// unbind) re-enters CONNECTING with exponential backoff when
    /// `reconnect` is on. A rejected bind never retries.
    pub async fn run(&self) -> SessionResult<()> {
        self.config.validate()?;

        let span = info_span!(
            "smpp_client",
            client_id = %self.config.client_id,
            smsc_host = %self.config.smsc_host,
            smsc_port = self.config.smsc_port,
            log_metadata = ?self.config.log_metadata,
        );
        let result = self.run_supervised().instrument(span).await;
        info!(stats = ?self.stats(), "client finished");
        result
    }

    async fn run_supervised(&self) -> SessionResult<()> {
        let mut backoff = RECONNECT_INITIAL_BACKOFF;
        loop {
            let binds_before = self.counters.binds.load(Ordering::Relaxed);
            let outcome = self.run_session().await;
            self.set_state(SessionState::Closed);

            // A session that got as far as a successful bind earns a
            // fresh backoff schedule.
            if self.counters.binds.load(Ordering::Relaxed) > binds_before {
                backoff = RECONNECT_INITIAL_BACKOFF;
            }

            match outcome {
                Ok(LoopEnd::Stopped) => {
                    info!("session stopped");
                    return Ok(());
                }
                Ok(LoopEnd::PeerUnbind) if !self.config.reconnect => {
                    info!("session unbound by peer");
                    return Ok(());
                }
                Ok(LoopEnd::PeerUnbind) => {
                    warn!("session unbound by peer, reconnecting");
                }
                Err(error) if !error.is_recoverable() || !self.config.reconnect => {
                    error!(%error, "session failed");
                    return Err(error);
                }
                Err(error) => {
                    warn!(
                        %error,
                        backoff_secs = backoff.as_secs_f64(),
                        "session lost, reconnecting"
                    );
                }
            }

            self.counters.reconnects.fetch_add(1, Ordering::Relaxed);
            let mut shutdown = self.shutdown.subscribe();
            tokio::select! {
                _ = shutdown.wait_for(|stopped| *stopped) => return Ok(()),
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(RECONNECT_MAX_BACKOFF);
        }
    }

    /// One pass through the state machine: connect, bind, run the loops,
    /// unbind, close.
    async fn run_session(&self) -> SessionResult<LoopEnd> {
        if self.stop_requested() {
            return Ok(LoopEnd::Stopped);
        }

        self.set_state(SessionState::Connecting);
        info!("connecting");
        let mut shutdown = self.shutdown.subscribe();
        let stream = tokio::select! {
            _ = shutdown.wait_for(|stopped| *stopped) => return Ok(LoopEnd::Stopped),
            connected = connection::connect(
                &self.config.smsc_host,
                self.config.smsc_port,
                self.config.socket_timeout,
            ) => connected.map_err(SessionError::Transport)?,
        };
        self.set_state(SessionState::OpenUnbound);

        let (mut reader, writer) = connection::split(stream, self.config.socket_timeout);
        let writer: SharedWriter = Arc::new(Mutex::new(writer));

        self.bind_transceiver(&mut reader, &writer).await?;
        self.set_state(SessionState::BoundTrx);

        // The three loops run concurrently until the first one finishes;
        // the other two are dropped at their next suspension point, which
        // is how cancellation reaches them on teardown.
        let end = tokio::select! {
            outcome = self.dispatch_loop(&writer) => outcome,
            outcome = self.read_loop(&mut reader, &writer) => outcome,
            outcome = self.probe_loop(&writer) => outcome,
        };

        self.set_state(SessionState::Unbinding);
        let owe_unbind = !matches!(end, Ok(LoopEnd::PeerUnbind));
        self.unbind_drain(&mut reader, &writer, owe_unbind).await;

        end
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.write();
        if *state != next {
            debug!(from = %*state, to = %next, "session state");
            *state = next;
        }
    }

    // -- bind ------------------------------------------------------------

    async fn bind_transceiver(
        &self,
        reader: &mut ReadHalf,
        writer: &SharedWriter,
    ) -> SessionResult<()> {
        let sequence_number = self.sequence.next();
        let log_id = generate_log_id();
        let pdu = Pdu::BindTransceiver(BindTransceiver {
            sequence_number,
            system_id: self.config.system_id.clone(),
            password: self.config.password.clone(),
            system_type: self.config.system_type.clone(),
            interface_version: self.config.interface_version,
            addr_ton: self.config.addr_ton,
            addr_npi: self.config.addr_npi,
            address_range: self.config.address_range.clone(),
        });

        self.correlater
            .put(sequence_number, log_id.clone(), None)
            .await;
        let bytes = pdu.to_bytes().map_err(SessionError::Framing)?;
        self.run_hook(self.hook.to_smsc("bind_transceiver", &log_id, None, &bytes))
            .await;
        {
            let mut write_half = writer.lock().await;
            write_half.write_bytes(&bytes).await?;
        }
        self.counters.pdus_sent.fetch_add(1, Ordering::Relaxed);
        info!(sequence_number, system_id = %self.config.system_id, "bind_transceiver sent");

        let (response, raw) = reader
            .read_pdu_timeout(self.config.socket_timeout)
            .await
            .map_err(map_read_error)?;
        self.counters.pdus_received.fetch_add(1, Ordering::Relaxed);

        match response {
            Pdu::BindTransceiverResp(resp) => {
                let log_id = self
                    .correlater
                    .get(resp.sequence_number)
                    .await
                    .map(|entry| entry.log_id)
                    .unwrap_or_default();
                self.run_hook(self.hook.from_smsc(
                    "bind_transceiver_resp",
                    &log_id,
                    None,
                    resp.command_status,
                    &raw,
                ))
                .await;

                if resp.command_status.is_ok() {
                    self.counters.binds.fetch_add(1, Ordering::Relaxed);
                    info!(smsc_system_id = %resp.system_id, "bound as transceiver");
                    Ok(())
                } else {
                    error!(status = %resp.command_status, "bind rejected");
                    Err(SessionError::BindRejected(resp.command_status))
                }
            }
            other => Err(SessionError::UnexpectedPdu {
                expected: "bind_transceiver_resp",
                actual: other.to_string(),
            }),
        }
    }

    // -- dispatcher loop (outbound) --------------------------------------

    async fn dispatch_loop(&self, writer: &SharedWriter) -> SessionResult<LoopEnd> {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            let job = tokio::select! {
                _ = shutdown.wait_for(|stopped| *stopped) => return Ok(LoopEnd::Stopped),
                dequeued = self.broker.dequeue() => dequeued.map_err(SessionError::Broker)?,
            };

            self.rate_limiter.acquire().await;

            while !self.throttle.allow_request().await {
                let delay = self.throttle.throttle_delay().await;
                self.counters.throttle_denials.fetch_add(1, Ordering::Relaxed);
                info!(
                    delay_secs = delay.as_secs_f64(),
                    "outbound parked by throttle handler"
                );
                tokio::select! {
                    _ = shutdown.wait_for(|stopped| *stopped) => return Ok(LoopEnd::Stopped),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            self.send_job(job, writer).await?;
        }
    }

    async fn send_job(&self, job: OutboundJob, writer: &SharedWriter) -> SessionResult<()> {
        let sequence_number = self.sequence.next();
        let log_id = job.log_id().to_string();
        let hook_metadata = job.hook_metadata().map(str::to_string);

        let pdu = match &job {
            OutboundJob::SubmitSm(submit) => {
                match build_submit_sm(&self.config, submit, sequence_number) {
                    Ok(submit_sm) => Pdu::SubmitSm(Box::new(submit_sm)),
                    Err(error) => {
                        // Per-message failure: the job is dropped, the
                        // session continues.
                        self.counters.discarded_jobs.fetch_add(1, Ordering::Relaxed);
                        error!(log_id = %log_id, %error, "job discarded: message cannot be encoded");
                        return Ok(());
                    }
                }
            }
            OutboundJob::EnquireLink(_) => Pdu::EnquireLink(EnquireLink::new(sequence_number)),
            OutboundJob::Unbind(_) => Pdu::Unbind(Unbind::new(sequence_number)),
        };

        let bytes = match pdu.to_bytes() {
            Ok(bytes) => bytes,
            Err(error) => {
                self.counters.discarded_jobs.fetch_add(1, Ordering::Relaxed);
                error!(log_id = %log_id, %error, "job discarded: PDU cannot be encoded");
                return Ok(());
            }
        };

        // Correlation strictly precedes the socket write.
        self.correlater
            .put(sequence_number, log_id.clone(), hook_metadata.clone())
            .await;
        self.run_hook(self.hook.to_smsc(
            job.command_name(),
            &log_id,
            hook_metadata.as_deref(),
            &bytes,
        ))
        .await;

        {
            let mut write_half = writer.lock().await;
            write_half.write_bytes(&bytes).await?;
        }
        self.counters.pdus_sent.fetch_add(1, Ordering::Relaxed);
        debug!(
            log_id = %log_id,
            sequence_number,
            command = job.command_name(),
            octets = bytes.len(),
            "request written"
        );
        Ok(())
    }

    // -- reader loop (inbound) -------------------------------------------

    async fn read_loop(
        &self,
        reader: &mut ReadHalf,
        writer: &SharedWriter,
    ) -> SessionResult<LoopEnd> {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            let (pdu, raw) = tokio::select! {
                _ = async { let _ = shutdown.wait_for(|stopped| *stopped).await; } => return Ok(LoopEnd::Stopped),
                received = reader.read_pdu() => match received {
                    Ok(frame) => frame,
                    Err(ReadError::Frame { sequence_number, source }) => {
                        error!(%source, sequence_number, "unparseable frame from SMSC");
                        let nack = GenericNack::new(source.to_command_status(), sequence_number);
                        let _ = self.write_pdu(writer, &Pdu::GenericNack(nack)).await;
                        return Err(SessionError::Framing(source));
                    }
                    Err(error) => return Err(map_read_error(error)),
                },
            };
            self.counters.pdus_received.fetch_add(1, Ordering::Relaxed);

            match pdu {
                Pdu::SubmitSmResp(resp) => self.on_submit_sm_resp(resp, &raw).await,
                Pdu::DeliverSm(deliver) => self.on_deliver_sm(*deliver, &raw, writer).await?,
                Pdu::EnquireLink(probe) => {
                    debug!(sequence_number = probe.sequence_number, "answering SMSC enquire_link");
                    let resp = EnquireLinkResponse::new(probe.sequence_number);
                    self.write_pdu(writer, &Pdu::EnquireLinkResp(resp)).await?;
                }
                Pdu::EnquireLinkResp(_) => {
                    debug!("enquire_link_resp received");
                    self.pong.notify_waiters();
                }
                Pdu::Unbind(unbind) => {
                    info!(sequence_number = unbind.sequence_number, "unbind requested by SMSC");
                    let resp = UnbindResponse::new(unbind.sequence_number);
                    let _ = self.write_pdu(writer, &Pdu::UnbindResp(resp)).await;
                    return Ok(LoopEnd::PeerUnbind);
                }
                Pdu::UnbindResp(_) => {
                    info!("unbind acknowledged by SMSC");
                    return Ok(LoopEnd::PeerUnbind);
                }
                Pdu::GenericNack(nack) => {
                    warn!(
                        status = %nack.command_status,
                        sequence_number = nack.sequence_number,
                        "generic_nack from SMSC"
                    );
                }
                Pdu::Raw { header, .. } => {
                    warn!(
                        command_id = format_args!("{:#010x}", header.command_id),
                        sequence_number = header.sequence_number,
                        "unknown command from SMSC"
                    );
                    let nack = GenericNack::invalid_command_id(header.sequence_number);
                    self.write_pdu(writer, &Pdu::GenericNack(nack)).await?;
                }
                unexpected => {
                    warn!(pdu = %unexpected, "PDU not valid in this direction, ignored");
                }
            }
        }
    }

    async fn on_submit_sm_resp(&self, resp: SubmitSmResponse, raw: &[u8]) {
        let entry = self.correlater.get(resp.sequence_number).await;
        if entry.is_none() {
            warn!(
                sequence_number = resp.sequence_number,
                "no correlation entry for submit_sm_resp"
            );
        }
        let (log_id, hook_metadata) = entry
            .map(|entry| (entry.log_id, entry.hook_metadata))
            .unwrap_or_default();

        if resp.command_status.is_throttle_signal() {
            self.counters.throttle_responses.fetch_add(1, Ordering::Relaxed);
            self.throttle.throttled().await;
        } else {
            self.throttle.not_throttled().await;
        }

        if resp.command_status.is_ok() {
            self.counters.submits_acked.fetch_add(1, Ordering::Relaxed);
            if !resp.message_id.is_empty() && !log_id.is_empty() {
                self.correlater
                    .put_message_id(resp.message_id.clone(), log_id.clone(), hook_metadata.clone())
                    .await;
            }
            debug!(log_id = %log_id, message_id = %resp.message_id, "submit_sm acknowledged");
        } else {
            warn!(log_id = %log_id, status = %resp.command_status, "submit_sm rejected");
        }

        self.run_hook(self.hook.from_smsc(
            "submit_sm_resp",
            &log_id,
            hook_metadata.as_deref(),
            resp.command_status,
            raw,
        ))
        .await;
    }

    async fn on_deliver_sm(
        &self,
        deliver: DeliverSm,
        raw: &[u8],
        writer: &SharedWriter,
    ) -> SessionResult<()> {
        let receipted_message_id = deliver.receipted_message_id();
        let entry = match &receipted_message_id {
            Some(message_id) => self.correlater.get_by_message_id(message_id).await,
            None => None,
        };
        if let (Some(message_id), None) = (&receipted_message_id, &entry) {
            debug!(message_id = %message_id, "delivery receipt without a live correlation entry");
        }
        let (log_id, hook_metadata) = entry
            .map(|entry| (entry.log_id, entry.hook_metadata))
            .unwrap_or_default();

        info!(
            log_id = %log_id,
            sequence_number = deliver.sequence_number,
            receipt = deliver.is_delivery_receipt(),
            "deliver_sm received"
        );
        self.run_hook(self.hook.from_smsc(
            "deliver_sm",
            &log_id,
            hook_metadata.as_deref(),
            CommandStatus::Ok,
            raw,
        ))
        .await;

        // The response bypasses rate and throttle control.
        let resp = DeliverSmResponse::new(deliver.sequence_number);
        self.write_pdu(writer, &Pdu::DeliverSmResp(resp)).await
    }

    // -- link prober loop ------------------------------------------------

    async fn probe_loop(&self, writer: &SharedWriter) -> SessionResult<LoopEnd> {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.wait_for(|stopped| *stopped) => return Ok(LoopEnd::Stopped),
                _ = tokio::time::sleep(self.config.enquire_link_interval) => {}
            }

            // Piggyback the periodic correlation sweep on the probe cadence.
            self.correlater.sweep().await;

            let sequence_number = self.sequence.next();
            let mut pong = pin!(self.pong.notified());
            pong.as_mut().enable();

            debug!(sequence_number, "sending enquire_link");
            self.write_pdu(writer, &Pdu::EnquireLink(EnquireLink::new(sequence_number)))
                .await?;
            self.counters.probes_sent.fetch_add(1, Ordering::Relaxed);

            if tokio::time::timeout(self.config.socket_timeout, pong)
                .await
                .is_err()
            {
                error!(
                    timeout_secs = self.config.socket_timeout.as_secs_f64(),
                    "no enquire_link_resp within socket_timeout"
                );
                return Err(SessionError::Timeout(self.config.socket_timeout));
            }
        }
    }

    // -- teardown --------------------------------------------------------

    /// Best-effort unbind. The write lock serializes behind any in-flight
    /// write; the drain window bounds how long we wait for the peer's
    /// acknowledgement before the socket is dropped.
    async fn unbind_drain(&self, reader: &mut ReadHalf, writer: &SharedWriter, owe_unbind: bool) {
        if !owe_unbind {
            return;
        }

        let sequence_number = self.sequence.next();
        debug!(sequence_number, "sending unbind");
        if self
            .write_pdu(writer, &Pdu::Unbind(Unbind::new(sequence_number)))
            .await
            .is_err()
        {
            return;
        }

        let deadline = Instant::now() + self.config.drain_duration;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("drain window elapsed without unbind_resp");
                return;
            }
            match reader.read_pdu_timeout(remaining).await {
                Ok((Pdu::UnbindResp(_), _)) => {
                    debug!("unbind acknowledged");
                    return;
                }
                // Late responses drain into the void.
                Ok(_) => continue,
                Err(_) => return,
            }
        }
    }

    // -- shared plumbing -------------------------------------------------

    async fn write_pdu(&self, writer: &SharedWriter, pdu: &Pdu) -> SessionResult<()> {
        {
            let mut write_half = writer.lock().await;
            write_half.write_pdu(pdu).await?;
        }
        self.counters.pdus_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Await a hook with the soft timeout: an overrun is logged but the
    /// hook is never cancelled mid-action, and failures never propagate.
    async fn run_hook<F>(&self, hook_call: F)
    where
        F: Future<Output = crate::Result<()>>,
    {
        let mut hook_call = pin!(hook_call);
        let result = tokio::select! {
            finished = &mut hook_call => finished,
            _ = tokio::time::sleep(self.config.hook_timeout) => {
                warn!(
                    timeout_secs = self.config.hook_timeout.as_secs_f64(),
                    "hook exceeded its soft timeout, waiting for it to finish"
                );
                hook_call.await
            }
        };
        if let Err(error) = result {
            warn!(%error, "hook failed");
        }
    }
}

fn map_read_error(error: ReadError) -> SessionError {
    match error {
        ReadError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            SessionError::ConnectionClosed
        }
        ReadError::Io(e) => SessionError::Transport(e),
        ReadError::Frame { source, .. } => SessionError::Framing(source),
    }
}

/// Materialize a submit job into a PDU: encode the text with the job's
/// codec, spill oversize messages into a message_payload TLV, and fill
/// every field the job does not override from the session defaults.
pub(crate) fn build_submit_sm(
    config: &ClientConfig,
    job: &SubmitSmJob,
    sequence_number: u32,
) -> crate::Result<SubmitSm> {
    let encoding = job.encoding.unwrap_or(config.encoding);
    let policy = job.codec_error_policy.unwrap_or(config.codec_error_policy);
    let encoded = encode_text(&job.short_message, encoding, policy)?;

    let mut tlvs = Vec::with_capacity(job.tlvs.len() + 1);
    for job_tlv in &job.tlvs {
        tlvs.push(Tlv::new(job_tlv.tag, job_tlv.octets()?));
    }

    let short_message = if encoded.len() <= MAX_SHORT_MESSAGE_LENGTH {
        Bytes::from(encoded)
    } else {
        tlvs.push(Tlv::new(tags::MESSAGE_PAYLOAD, Bytes::from(encoded)));
        Bytes::new()
    };

    Ok(SubmitSm {
        sequence_number,
        service_type: job
            .service_type
            .clone()
            .unwrap_or_else(|| config.service_type.clone()),
        source_addr_ton: job.source_addr_ton.unwrap_or(config.source_addr_ton),
        source_addr_npi: job.source_addr_npi.unwrap_or(config.source_addr_npi),
        source_addr: job.source_addr.clone(),
        dest_addr_ton: job.dest_addr_ton.unwrap_or(config.dest_addr_ton),
        dest_addr_npi: job.dest_addr_npi.unwrap_or(config.dest_addr_npi),
        destination_addr: job.destination_addr.clone(),
        esm_class: job.esm_class.unwrap_or(config.esm_class),
        protocol_id: job.protocol_id.unwrap_or(config.protocol_id),
        priority_flag: job.priority_flag.unwrap_or(config.priority_flag),
        schedule_delivery_time: job
            .schedule_delivery_time
            .clone()
            .unwrap_or_else(|| config.schedule_delivery_time.clone()),
        validity_period: job
            .validity_period
            .clone()
            .unwrap_or_else(|| config.validity_period.clone()),
        registered_delivery: job
            .registered_delivery
            .unwrap_or(config.registered_delivery),
        replace_if_present_flag: job
            .replace_if_present_flag
            .unwrap_or(config.replace_if_present_flag),
        data_coding: encoding.data_coding(),
        sm_default_msg_id: job.sm_default_msg_id.unwrap_or(config.sm_default_msg_id),
        short_message,
        tlvs,
    })
}
