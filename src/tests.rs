// End-to-end exercises of the session engine against a scripted SMSC on a
// loopback listener. The fake side speaks raw frames so these tests check
// the bytes the client actually puts on the wire, not just its own codec.

use crate::client::{
    Broker, Client, ClientConfig, Hook, InMemoryBroker, OutboundJob, SessionState,
    SlidingWindowThrottle, SubmitSmJob, ThrottleHandler,
};
use crate::client::session::build_submit_sm;
use crate::datatypes::{CommandStatus, DeliverSm, Tlv, tags};
use crate::encoding::TextEncoding;
use crate::codec::Encodable;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;

const BIND_TRANSCEIVER: u32 = 0x0000_0009;
const BIND_TRANSCEIVER_RESP: u32 = 0x8000_0009;
const SUBMIT_SM: u32 = 0x0000_0004;
const SUBMIT_SM_RESP: u32 = 0x8000_0004;
const DELIVER_SM_RESP: u32 = 0x8000_0005;
const UNBIND: u32 = 0x0000_0006;
const UNBIND_RESP: u32 = 0x8000_0006;
const ENQUIRE_LINK: u32 = 0x0000_0015;
const ENQUIRE_LINK_RESP: u32 = 0x8000_0015;
const GENERIC_NACK: u32 = 0x8000_0000;

struct WireFrame {
    command_id: u32,
    command_status: u32,
    sequence_number: u32,
    body: Vec<u8>,
}

async fn read_frame(stream: &mut TcpStream) -> WireFrame {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await.expect("length prefix");
    let total = u32::from_be_bytes(prefix) as usize;
    assert!(total >= 16, "frame shorter than a header");

    let mut rest = vec![0u8; total - 4];
    stream.read_exact(&mut rest).await.expect("frame body");
    WireFrame {
        command_id: u32::from_be_bytes(rest[0..4].try_into().unwrap()),
        command_status: u32::from_be_bytes(rest[4..8].try_into().unwrap()),
        sequence_number: u32::from_be_bytes(rest[8..12].try_into().unwrap()),
        body: rest[12..].to_vec(),
    }
}

fn frame(command_id: u32, status: u32, sequence_number: u32, body: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(16 + body.len());
    data.extend_from_slice(&((16 + body.len()) as u32).to_be_bytes());
    data.extend_from_slice(&command_id.to_be_bytes());
    data.extend_from_slice(&status.to_be_bytes());
    data.extend_from_slice(&sequence_number.to_be_bytes());
    data.extend_from_slice(body);
    data
}

fn test_config(port: u16) -> ClientConfig {
    ClientConfig::new("127.0.0.1", port, "smppclient1", "password")
        .with_reconnect(false)
        // keep the prober quiet unless a test wants it
        .with_enquire_link_interval(Duration::from_secs(600))
        .with_socket_timeout(Duration::from_secs(5))
        .with_drain_duration(Duration::from_secs(2))
}

async fn wait_for(mut predicate: impl FnMut() -> bool, what: &str) {
    for _ in 0..500 {
        if predicate() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Accept the client and complete the bind handshake.
async fn accept_and_bind(listener: &TcpListener) -> TcpStream {
    let (mut smsc, _) = listener.accept().await.expect("accept");
    let bind = read_frame(&mut smsc).await;
    assert_eq!(bind.command_id, BIND_TRANSCEIVER);
    smsc.write_all(&frame(BIND_TRANSCEIVER_RESP, 0, bind.sequence_number, b"SMSC\0"))
        .await
        .unwrap();
    smsc
}

#[derive(Default)]
struct RecordingHook {
    /// (direction, command, log_id, status) per call
    events: Mutex<Vec<(&'static str, String, String, u32)>>,
    fail_calls: bool,
}

impl RecordingHook {
    fn saw(&self, direction: &str, command: &str, log_id: &str) -> bool {
        self.events
            .lock()
            .unwrap()
            .iter()
            .any(|(d, c, l, _)| *d == direction && c == command && l == log_id)
    }
}

#[async_trait]
impl Hook for RecordingHook {
    async fn to_smsc(
        &self,
        smpp_command: &str,
        log_id: &str,
        _hook_metadata: Option<&str>,
        _pdu: &[u8],
    ) -> crate::Result<()> {
        self.events.lock().unwrap().push((
            "out",
            smpp_command.to_string(),
            log_id.to_string(),
            0,
        ));
        if self.fail_calls {
            return Err("hook exploded".into());
        }
        Ok(())
    }

    async fn from_smsc(
        &self,
        smpp_command: &str,
        log_id: &str,
        _hook_metadata: Option<&str>,
        command_status: CommandStatus,
        _pdu: &[u8],
    ) -> crate::Result<()> {
        self.events.lock().unwrap().push((
            "in",
            smpp_command.to_string(),
            log_id.to_string(),
            command_status.value(),
        ));
        if self.fail_calls {
            return Err("hook exploded".into());
        }
        Ok(())
    }
}

#[tokio::test]
async fn bind_handshake_and_graceful_stop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    let client = Arc::new(Client::new(test_config(port), broker));
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };

    let (mut smsc, _) = listener.accept().await.unwrap();
    let bind = read_frame(&mut smsc).await;
    assert_eq!(bind.command_id, BIND_TRANSCEIVER);
    assert_eq!(bind.command_status, 0);
    assert_eq!(bind.sequence_number, 1);
    assert_eq!(&bind.body[..12], b"smppclient1\0");
    assert_eq!(&bind.body[12..21], b"password\0");

    smsc.write_all(&frame(BIND_TRANSCEIVER_RESP, 0, 1, b"SMSC\0"))
        .await
        .unwrap();
    wait_for(|| client.state() == SessionState::BoundTrx, "bound state").await;
    assert_eq!(client.stats().binds, 1);

    client.stop();
    let unbind = read_frame(&mut smsc).await;
    assert_eq!(unbind.command_id, UNBIND);
    smsc.write_all(&frame(UNBIND_RESP, 0, unbind.sequence_number, &[]))
        .await
        .unwrap();

    runner.await.unwrap().unwrap();
    assert_eq!(client.state(), SessionState::Closed);
}

#[tokio::test]
async fn bind_rejection_is_fatal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    // reconnect on, to prove a rejected bind still never retries
    let config = test_config(port).with_reconnect(true);
    let client = Arc::new(Client::new(config, broker));
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };

    let (mut smsc, _) = listener.accept().await.unwrap();
    let bind = read_frame(&mut smsc).await;
    smsc.write_all(&frame(
        BIND_TRANSCEIVER_RESP,
        CommandStatus::BindFailed.value(),
        bind.sequence_number,
        &[],
    ))
    .await
    .unwrap();

    let result = runner.await.unwrap();
    assert!(matches!(
        result,
        Err(crate::client::SessionError::BindRejected(CommandStatus::BindFailed))
    ));
    assert_eq!(client.stats().binds, 0);
}

#[tokio::test]
async fn submit_ack_and_delivery_receipt_correlate() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    let hook = Arc::new(RecordingHook::default());
    let client = Arc::new(
        Client::new(test_config(port), Arc::clone(&broker) as Arc<dyn Broker>)
            .with_hook(Arc::clone(&hook) as Arc<dyn Hook>),
    );
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };
    let mut smsc = accept_and_bind(&listener).await;

    broker
        .enqueue(OutboundJob::submit_sm("L1", "Hello", "254700", "254711"))
        .await
        .unwrap();

    let submit = read_frame(&mut smsc).await;
    assert_eq!(submit.command_id, SUBMIT_SM);
    assert_eq!(submit.sequence_number, 2);
    assert!(submit.body.windows(7).any(|w| w == b"254700\0"));
    assert!(submit.body.windows(7).any(|w| w == b"254711\0"));
    assert!(submit.body.windows(5).any(|w| w == b"Hello"));

    smsc.write_all(&frame(SUBMIT_SM_RESP, 0, 2, b"MID-9\0"))
        .await
        .unwrap();
    wait_for(|| client.stats().submits_acked == 1, "submit ack").await;
    wait_for(|| hook.saw("in", "submit_sm_resp", "L1"), "resp hook").await;

    // Delivery receipt arrives much later, correlated by message id.
    let receipt = DeliverSm {
        sequence_number: 77,
        service_type: String::new(),
        source_addr_ton: 1,
        source_addr_npi: 1,
        source_addr: "254711".to_string(),
        dest_addr_ton: 1,
        dest_addr_npi: 1,
        destination_addr: "254700".to_string(),
        esm_class: 0x04,
        protocol_id: 0,
        priority_flag: 0,
        schedule_delivery_time: String::new(),
        validity_period: String::new(),
        registered_delivery: 0,
        replace_if_present_flag: 0,
        data_coding: 0,
        sm_default_msg_id: 0,
        short_message: Bytes::from_static(b"id:MID-9 stat:DELIVRD"),
        tlvs: vec![Tlv::new(tags::RECEIPTED_MESSAGE_ID, &b"MID-9\0"[..])],
    };
    smsc.write_all(&receipt.to_bytes().unwrap()).await.unwrap();

    let resp = read_frame(&mut smsc).await;
    assert_eq!(resp.command_id, DELIVER_SM_RESP);
    assert_eq!(resp.command_status, 0);
    assert_eq!(resp.sequence_number, 77);
    assert!(hook.saw("in", "deliver_sm", "L1"));

    client.stop();
    let unbind = read_frame(&mut smsc).await;
    smsc.write_all(&frame(UNBIND_RESP, 0, unbind.sequence_number, &[]))
        .await
        .unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn answers_probes_and_nacks_unknown_commands() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    let client = Arc::new(Client::new(test_config(port), broker));
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };
    let mut smsc = accept_and_bind(&listener).await;

    // SMSC-side link probe is answered with the same sequence number
    smsc.write_all(&frame(ENQUIRE_LINK, 0, 501, &[])).await.unwrap();
    let pong = read_frame(&mut smsc).await;
    assert_eq!(pong.command_id, ENQUIRE_LINK_RESP);
    assert_eq!(pong.sequence_number, 501);

    // An unknown command id draws generic_nack, session keeps running
    smsc.write_all(&frame(0x0000_00AA, 0, 777, &[0x01, 0x02]))
        .await
        .unwrap();
    let nack = read_frame(&mut smsc).await;
    assert_eq!(nack.command_id, GENERIC_NACK);
    assert_eq!(nack.command_status, CommandStatus::InvalidCommandId.value());
    assert_eq!(nack.sequence_number, 777);

    // still alive: another probe round-trips
    smsc.write_all(&frame(ENQUIRE_LINK, 0, 502, &[])).await.unwrap();
    assert_eq!(read_frame(&mut smsc).await.sequence_number, 502);

    client.stop();
    let unbind = read_frame(&mut smsc).await;
    smsc.write_all(&frame(UNBIND_RESP, 0, unbind.sequence_number, &[]))
        .await
        .unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn peer_unbind_ends_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    let client = Arc::new(Client::new(test_config(port), broker));
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };
    let mut smsc = accept_and_bind(&listener).await;

    smsc.write_all(&frame(UNBIND, 0, 900, &[])).await.unwrap();
    let resp = read_frame(&mut smsc).await;
    assert_eq!(resp.command_id, UNBIND_RESP);
    assert_eq!(resp.sequence_number, 900);

    runner.await.unwrap().unwrap();
    assert_eq!(client.state(), SessionState::Closed);
}

#[tokio::test]
async fn abrupt_disconnect_reconnects_and_rebinds() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    let config = test_config(port).with_reconnect(true);
    let client = Arc::new(Client::new(config, Arc::clone(&broker) as Arc<dyn Broker>));
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };

    let smsc = accept_and_bind(&listener).await;
    wait_for(|| client.stats().binds == 1, "first bind").await;
    drop(smsc); // peer resets mid-session

    // the client backs off and re-enters CONNECTING
    let mut smsc = accept_and_bind(&listener).await;
    wait_for(|| client.stats().binds == 2, "rebind").await;
    assert!(client.stats().reconnects >= 1);

    // traffic resumes on the new session
    broker
        .enqueue(OutboundJob::submit_sm("L2", "after", "100", "200"))
        .await
        .unwrap();
    let submit = read_frame(&mut smsc).await;
    assert_eq!(submit.command_id, SUBMIT_SM);
    assert!(submit.body.windows(5).any(|w| w == b"after"));

    client.stop();
    let unbind = read_frame(&mut smsc).await;
    smsc.write_all(&frame(UNBIND_RESP, 0, unbind.sequence_number, &[]))
        .await
        .unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn sustained_throttle_parks_the_dispatcher() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    let throttle = Arc::new(SlidingWindowThrottle::new(Duration::from_secs(60), 5, 1.0));
    let client = Arc::new(
        Client::new(test_config(port), Arc::clone(&broker) as Arc<dyn Broker>)
            .with_throttle_handler(Arc::clone(&throttle) as Arc<dyn ThrottleHandler>),
    );
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };
    let mut smsc = accept_and_bind(&listener).await;

    for i in 0..5u64 {
        broker
            .enqueue(OutboundJob::submit_sm(format!("T{i}"), "x", "1", "2"))
            .await
            .unwrap();
        let submit = read_frame(&mut smsc).await;
        smsc.write_all(&frame(
            SUBMIT_SM_RESP,
            CommandStatus::Throttled.value(),
            submit.sequence_number,
            &[],
        ))
        .await
        .unwrap();
        wait_for(|| client.stats().throttle_responses == i + 1, "throttle recorded").await;
    }

    assert!(!throttle.allow_request().await);

    // the next job parks instead of reaching the wire
    let sent_before = client.stats().pdus_sent;
    broker
        .enqueue(OutboundJob::submit_sm("parked", "x", "1", "2"))
        .await
        .unwrap();
    wait_for(|| client.stats().throttle_denials >= 1, "denial logged").await;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(client.stats().pdus_sent, sent_before);

    client.stop();
    let unbind = read_frame(&mut smsc).await;
    smsc.write_all(&frame(UNBIND_RESP, 0, unbind.sequence_number, &[]))
        .await
        .unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn unencodable_job_is_discarded_and_session_continues() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    let client = Arc::new(Client::new(test_config(port), Arc::clone(&broker) as Arc<dyn Broker>));
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };
    let mut smsc = accept_and_bind(&listener).await;

    broker
        .enqueue(OutboundJob::SubmitSm(SubmitSmJob {
            log_id: "bad".to_string(),
            short_message: "☃".to_string(),
            source_addr: "1".to_string(),
            destination_addr: "2".to_string(),
            encoding: Some(TextEncoding::Ascii),
            ..SubmitSmJob::default()
        }))
        .await
        .unwrap();
    broker
        .enqueue(OutboundJob::submit_sm("good", "ok", "1", "2"))
        .await
        .unwrap();

    // only the encodable job reaches the wire
    let submit = read_frame(&mut smsc).await;
    assert!(submit.body.windows(2).any(|w| w == b"ok"));
    assert_eq!(client.stats().discarded_jobs, 1);

    client.stop();
    let unbind = read_frame(&mut smsc).await;
    smsc.write_all(&frame(UNBIND_RESP, 0, unbind.sequence_number, &[]))
        .await
        .unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn hook_failures_never_reach_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(16));
    let hook = Arc::new(RecordingHook {
        fail_calls: true,
        ..RecordingHook::default()
    });
    let client = Arc::new(
        Client::new(test_config(port), Arc::clone(&broker) as Arc<dyn Broker>)
            .with_hook(Arc::clone(&hook) as Arc<dyn Hook>),
    );
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };
    let mut smsc = accept_and_bind(&listener).await;

    broker
        .enqueue(OutboundJob::submit_sm("L9", "hi", "1", "2"))
        .await
        .unwrap();
    let submit = read_frame(&mut smsc).await;
    smsc.write_all(&frame(SUBMIT_SM_RESP, 0, submit.sequence_number, b"M\0"))
        .await
        .unwrap();

    wait_for(|| client.stats().submits_acked == 1, "ack despite hook errors").await;
    assert!(hook.saw("out", "submit_sm", "L9"));

    client.stop();
    let unbind = read_frame(&mut smsc).await;
    smsc.write_all(&frame(UNBIND_RESP, 0, unbind.sequence_number, &[]))
        .await
        .unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn pipelined_submits_frame_cleanly() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(InMemoryBroker::new(64));
    let client = Arc::new(Client::new(test_config(port), Arc::clone(&broker) as Arc<dyn Broker>));
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run().await })
    };
    let mut smsc = accept_and_bind(&listener).await;

    for i in 0..20 {
        broker
            .enqueue(OutboundJob::submit_sm(format!("P{i}"), "payload", "1", "2"))
            .await
            .unwrap();
    }

    // every frame parses cleanly off the shared connection, in order
    for i in 0..20u32 {
        let submit = read_frame(&mut smsc).await;
        assert_eq!(submit.command_id, SUBMIT_SM);
        assert_eq!(submit.sequence_number, i + 2);
        smsc.write_all(&frame(SUBMIT_SM_RESP, 0, submit.sequence_number, b"M\0"))
            .await
            .unwrap();
    }
    wait_for(|| client.stats().submits_acked == 20, "all acks").await;

    client.stop();
    let unbind = read_frame(&mut smsc).await;
    smsc.write_all(&frame(UNBIND_RESP, 0, unbind.sequence_number, &[]))
        .await
        .unwrap();
    runner.await.unwrap().unwrap();
}

#[test]
fn long_message_spills_into_message_payload() {
    let config = ClientConfig::new("127.0.0.1", 2775, "id", "pw");

    let mut job = SubmitSmJob {
        log_id: "L".to_string(),
        short_message: "A".repeat(254),
        source_addr: "1".to_string(),
        destination_addr: "2".to_string(),
        ..SubmitSmJob::default()
    };
    let pdu = build_submit_sm(&config, &job, 9).unwrap();
    assert_eq!(pdu.short_message.len(), 254);
    assert!(pdu.message_payload().is_none());

    job.short_message = "A".repeat(255);
    let pdu = build_submit_sm(&config, &job, 10).unwrap();
    assert!(pdu.short_message.is_empty());
    assert_eq!(pdu.message_payload().unwrap().value.len(), 255);
}

#[test]
fn job_overrides_beat_session_defaults() {
    let config = ClientConfig::new("127.0.0.1", 2775, "id", "pw");

    let job = SubmitSmJob {
        log_id: "L".to_string(),
        short_message: "hi".to_string(),
        source_addr: "1".to_string(),
        destination_addr: "2".to_string(),
        encoding: Some(TextEncoding::Ucs2),
        registered_delivery: Some(0),
        service_type: Some(String::new()),
        ..SubmitSmJob::default()
    };
    let pdu = build_submit_sm(&config, &job, 3).unwrap();

    assert_eq!(pdu.data_coding, 0x08);
    assert_eq!(pdu.registered_delivery, 0);
    assert_eq!(pdu.service_type, "");
    assert_eq!(pdu.short_message.as_ref(), &[0x00, b'h', 0x00, b'i']);

    // untouched fields come from the session defaults
    assert_eq!(pdu.esm_class, config.esm_class);
    assert_eq!(pdu.source_addr_ton, config.source_addr_ton);
}
