// spool-client/tests/push_channel.rs
// Push session behavior over memory and TCP transports

use async_trait::async_trait;
use spool_client::message::{
    EventType, FarmMessage, MemoryTransport, QueueChangedPayload, TcpTransport, Transport,
};
use spool_client::{
    ClientConfig, ClientResult, EjectionConfig, EjectionPreset, FarmApi, FleetStats, JobStatus,
    PollConfig, PrintJob, Printer, PrinterCommand, PrinterDelta, PrinterKind, PrinterState,
    PushConfig, PushEvent, PushSession, StalenessConfig, SyncEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Fixture controller: one queued job with cooldown ejection at 40°C,
/// one idle printer working on it.
struct FixtureApi;

#[async_trait]
impl FarmApi for FixtureApi {
    async fn list_jobs(&self) -> ClientResult<Vec<PrintJob>> {
        Ok(vec![PrintJob {
            id: 1,
            name: Some("bracket run".to_string()),
            filename: "bracket.gcode".to_string(),
            quantity: 4,
            sent: 1,
            priority: 0,
            groups: Vec::new(),
            status: JobStatus::Active,
            filament_g: Some(12.0),
            ejection: EjectionConfig {
                enabled: true,
                preset_id: None,
                end_gcode: None,
                cooldown_temp: Some(40.0),
            },
        }])
    }

    async fn list_printers(&self) -> ClientResult<Vec<Printer>> {
        Ok(vec![Printer {
            name: "alpha".to_string(),
            address: "10.0.0.30".to_string(),
            kind: PrinterKind::Prusa,
            group: None,
            state: PrinterState::Printing,
            progress: Some(95.0),
            current_file: Some("bracket.gcode".to_string()),
            current_job_id: Some(1),
            seconds_remaining: Some(60),
            nozzle_temp: Some(215.0),
            bed_temp: None,
            cooldown_target: None,
            finished_at: None,
            error_message: None,
        }])
    }

    async fn fetch_stats(&self) -> ClientResult<FleetStats> {
        Ok(FleetStats::default())
    }

    async fn list_presets(&self) -> ClientResult<Vec<EjectionPreset>> {
        Ok(Vec::new())
    }

    async fn reorder_job(&self, _id: i64, _new_index: usize) -> ClientResult<()> {
        Ok(())
    }

    async fn set_quantity(&self, _id: i64, _quantity: u32) -> ClientResult<()> {
        Ok(())
    }

    async fn set_ejection(&self, _id: i64, _config: &EjectionConfig) -> ClientResult<()> {
        Ok(())
    }

    async fn set_printer_group(&self, _name: &str, _group: &str) -> ClientResult<()> {
        Ok(())
    }

    async fn printer_command(&self, _name: &str, _command: PrinterCommand) -> ClientResult<()> {
        Ok(())
    }
}

fn quiet_config() -> ClientConfig {
    // long horizons and no polling keep background refreshes out of the way
    ClientConfig::default()
        .with_poll(PollConfig::disabled())
        .with_staleness(StalenessConfig {
            printers: Duration::from_secs(300),
            jobs: Duration::from_secs(300),
            stats: Duration::from_secs(300),
            presets: Duration::from_secs(300),
        })
}

async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

async fn next_event(events: &mut broadcast::Receiver<PushEvent>) -> PushEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for push event")
        .expect("event stream closed")
}

#[tokio::test]
async fn test_cooldown_gate_over_push_channel() {
    let engine = SyncEngine::start(Arc::new(FixtureApi), &quiet_config());
    let session = PushSession::new(
        PushConfig::lan()
            .with_auto_reconnect(false)
            .with_heartbeat_interval(Duration::ZERO),
    );
    engine.attach_push(&session);

    let (client_half, server) = MemoryTransport::pair();
    session
        .connect_memory(client_half, "gate-test")
        .await
        .unwrap();

    let hello = server.read_message().await.unwrap();
    assert_eq!(hello.event_type, EventType::Hello);

    // the channel-up refresh storm fills the cache from the fixture API
    eventually("bootstrap refresh", || {
        engine.store().printer("alpha").is_some() && !engine.store().jobs().is_empty()
    })
    .await;

    // print finished with the bed still hot; gate must hold at Cooling
    server
        .write_message(&FarmMessage::printer_delta(&PrinterDelta {
            name: "alpha".to_string(),
            state: Some(PrinterState::Finished),
            progress: Some(100.0),
            bed_temp: Some(60.0),
            finished_at: Some(1_755_000_000_000),
            ..Default::default()
        }))
        .await
        .unwrap();
    eventually("cooling state", || {
        engine
            .store()
            .printer("alpha")
            .map(|p| p.state == PrinterState::Cooling && p.cooldown_target == Some(40.0))
            .unwrap_or(false)
    })
    .await;

    // bed reached the threshold; gate releases to Ejecting
    server
        .write_message(&FarmMessage::printer_delta(&PrinterDelta {
            name: "alpha".to_string(),
            bed_temp: Some(38.0),
            ..Default::default()
        }))
        .await
        .unwrap();
    eventually("ejecting state", || {
        engine
            .store()
            .printer("alpha")
            .map(|p| p.state == PrinterState::Ejecting && p.cooldown_target.is_none())
            .unwrap_or(false)
    })
    .await;

    session.shutdown();
}

#[tokio::test]
async fn test_tcp_session_reconnects_after_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = tokio::spawn(async move {
        // first connection: greet, then hang up
        let (stream, _) = listener.accept().await.unwrap();
        let transport = TcpTransport::from_stream(stream);
        let hello = transport.read_message().await.unwrap();
        assert_eq!(hello.event_type, EventType::Hello);
        drop(transport);

        // the session redials; push a queue hint over the new connection
        let (stream, _) = listener.accept().await.unwrap();
        let transport = TcpTransport::from_stream(stream);
        let hello = transport.read_message().await.unwrap();
        assert_eq!(hello.event_type, EventType::Hello);
        transport
            .write_message(&FarmMessage::queue_changed(&QueueChangedPayload {
                version: 4,
            }))
            .await
            .unwrap();

        // hold the connection open until the client shuts down
        let _ = transport.read_message().await;
    });

    let session = PushSession::new(
        PushConfig::lan()
            .with_reconnect_delay(Duration::from_millis(20))
            .with_heartbeat_interval(Duration::ZERO),
    );
    let mut events = session.subscribe();
    session.connect(&addr, "reconnect-test").await.unwrap();

    assert!(matches!(next_event(&mut events).await, PushEvent::ChannelUp));
    assert!(matches!(
        next_event(&mut events).await,
        PushEvent::ChannelDown
    ));
    assert!(matches!(next_event(&mut events).await, PushEvent::ChannelUp));
    match next_event(&mut events).await {
        PushEvent::QueueChanged(hint) => assert_eq!(hint.version, 4),
        other => panic!("expected queue hint, got {:?}", other),
    }

    session.shutdown();
    server.await.unwrap();
}
