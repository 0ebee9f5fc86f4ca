use std::sync::{Arc, Mutex};
use std::time::Duration;

use friend_audio_bridge_lib::commands::{self, ConsoleCommand};
use friend_audio_bridge_lib::config::AppConfig;
use friend_audio_bridge_lib::core::audio::{AudioSink, PlaybackScheduler, SampleFrame};
use friend_audio_bridge_lib::core::bluetooth::memory::{
    MemoryPeripheral, MemoryTransport, TransportCall,
};
use friend_audio_bridge_lib::core::bluetooth::{
    BluetoothManager, ConnectionPolicy, LinkEvent, PeripheralHandle, RadioState,
    UUID_AUDIO_DATA_CHAR, UUID_AUDIO_SERVICE, link_event_channel,
};
use friend_audio_bridge_lib::state::AppState;

#[derive(Default)]
struct RecordingSink {
    frames: Mutex<Vec<SampleFrame>>,
}

impl AudioSink for RecordingSink {
    fn play(&self, frame: &SampleFrame) {
        self.frames.lock().unwrap().push(frame.clone());
    }
}

impl RecordingSink {
    fn samples(&self) -> Vec<Vec<i16>> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| f.samples().to_vec())
            .collect()
    }
}

struct Harness {
    manager: Arc<BluetoothManager>,
    transport: Arc<MemoryTransport>,
    sink: Arc<RecordingSink>,
}

fn friend_peripheral() -> MemoryPeripheral {
    MemoryPeripheral::new().with_service(UUID_AUDIO_SERVICE, vec![UUID_AUDIO_DATA_CHAR])
}

fn start(config: AppConfig) -> Harness {
    let (tx, rx) = link_event_channel();
    let transport = Arc::new(MemoryTransport::new(tx));
    let sink = Arc::new(RecordingSink::default());
    let manager = Arc::new(BluetoothManager::new(
        &config,
        transport.clone(),
        sink.clone(),
    ));
    tokio::spawn(manager.clone().run(rx));
    Harness {
        manager,
        transport,
        sink,
    }
}

fn advertise(transport: &MemoryTransport, id: &str, name: &str, rssi: i16) {
    transport.inject(LinkEvent::Advertisement {
        handle: PeripheralHandle::new(id, Some(name.to_string())),
        name: Some(name.to_string()),
        rssi,
    });
}

async fn eventually<F: Fn() -> bool>(condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn discovers_connects_and_plays() {
    let h = start(AppConfig::default());
    h.transport.add_peripheral("near", friend_peripheral());

    h.transport
        .inject(LinkEvent::RadioStateChanged(RadioState::RadioOn));
    advertise(&h.transport, "far", "Friend", -80);
    advertise(&h.transport, "near", "Friend", -40);
    advertise(&h.transport, "near", "Friend", -10);
    advertise(&h.transport, "other", "Headphones", -20);

    let manager = h.manager.clone();
    eventually(move || manager.snapshot().len() == 2).await;
    assert!(h.transport.is_scanning());

    let snapshot = h.manager.snapshot();
    let ids: Vec<&str> = snapshot.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["near", "far"]);
    assert_eq!(snapshot[0].rssi, -40);

    h.manager.connect("near").unwrap();
    assert!(h.manager.is_connected("near"));

    let manager = h.manager.clone();
    eventually(move || !manager.bindings("near").is_empty()).await;
    let bindings = h.manager.bindings("near");
    assert_eq!(bindings.len(), 1);
    assert!(bindings[0].notify_enabled);
    assert_eq!(
        h.transport.subscriptions("near"),
        vec![(UUID_AUDIO_SERVICE, UUID_AUDIO_DATA_CHAR)]
    );

    h.transport.inject(LinkEvent::Notification {
        device_id: "near".to_string(),
        value: vec![0x01, 0x02, 0x03, 0xFF, 0x7F],
    });
    let sink = h.sink.clone();
    eventually(move || !sink.samples().is_empty()).await;
    assert_eq!(h.sink.samples(), vec![vec![32767]]);

    h.manager.disconnect("near");
    assert!(!h.manager.is_connected("near"));
    assert!(h.manager.bindings("near").is_empty());
    assert!(
        h.transport
            .calls()
            .contains(&TransportCall::Disconnect("near".to_string()))
    );
}

#[tokio::test]
async fn radio_loss_stops_scanning_and_keeps_devices() {
    let h = start(AppConfig::default());
    h.transport
        .inject(LinkEvent::RadioStateChanged(RadioState::RadioOn));
    advertise(&h.transport, "a", "Friend", -60);
    h.transport
        .inject(LinkEvent::RadioStateChanged(RadioState::RadioOff));

    let transport = h.transport.clone();
    eventually(move || !transport.is_scanning() && transport.calls().len() == 2).await;
    assert_eq!(h.manager.radio_state(), RadioState::RadioOff);
    assert_eq!(h.manager.snapshot().len(), 1);
}

#[tokio::test]
async fn confirmed_policy_waits_for_the_link() {
    let mut config = AppConfig::default();
    config.bluetooth.connection_policy = ConnectionPolicy::Confirmed;
    let h = start(config);

    advertise(&h.transport, "silent", "Friend", -50);
    let manager = h.manager.clone();
    eventually(move || manager.snapshot().len() == 1).await;

    // No scripted peripheral, so the transport never reports the link
    h.manager.connect("silent").unwrap();
    assert!(!h.manager.is_connected("silent"));

    h.transport
        .inject(LinkEvent::Connected("silent".to_string()));
    let manager = h.manager.clone();
    eventually(move || manager.is_connected("silent")).await;

    h.transport
        .inject(LinkEvent::Disconnected("silent".to_string()));
    let manager = h.manager.clone();
    eventually(move || !manager.is_connected("silent")).await;
}

#[tokio::test]
async fn connection_without_audio_service_stays_silent() {
    let h = start(AppConfig::default());
    h.transport.add_peripheral(
        "plain",
        MemoryPeripheral::new().with_service(uuid::Uuid::from_u128(0x180f), vec![]),
    );
    advertise(&h.transport, "plain", "Friend", -30);
    let manager = h.manager.clone();
    eventually(move || manager.snapshot().len() == 1).await;

    h.manager.connect("plain").unwrap();
    let transport = h.transport.clone();
    eventually(move || {
        transport
            .calls()
            .contains(&TransportCall::DiscoverServices("plain".to_string()))
    })
    .await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.manager.bindings("plain").is_empty());
    assert!(h.transport.subscriptions("plain").is_empty());
    assert!(h.manager.is_connected("plain"));
}

#[tokio::test]
async fn console_commands_drive_the_state() {
    let (mut state, transport) = AppState::with_transport(
        AppConfig::default(),
        Arc::new(PlaybackScheduler::degraded(8000)),
        MemoryTransport::new,
    );
    state.spawn_event_loop().unwrap();
    assert!(state.spawn_event_loop().is_none());

    let list = ConsoleCommand::parse("list").unwrap().unwrap();
    assert_eq!(commands::execute(&state, &list), "No devices discovered");

    let connect = ConsoleCommand::parse("connect ghost").unwrap().unwrap();
    assert!(commands::execute(&state, &connect).starts_with("Connect failed"));

    transport.add_peripheral("dev", friend_peripheral());
    advertise(&transport, "dev", "Friend", -42);
    let manager = state.get_bluetooth_manager_arc();
    eventually(move || manager.snapshot().len() == 1).await;

    let connect = ConsoleCommand::parse("connect dev").unwrap().unwrap();
    assert_eq!(commands::execute(&state, &connect), "Connecting to dev");
    let status = ConsoleCommand::parse("status dev").unwrap().unwrap();
    assert_eq!(commands::execute(&state, &status), "dev is connected");

    // Playback is disabled, so audio is dropped without touching the device state
    transport.inject(LinkEvent::Notification {
        device_id: "dev".to_string(),
        value: vec![0, 0, 0, 1, 0],
    });

    let reset = ConsoleCommand::parse("reset").unwrap().unwrap();
    commands::execute(&state, &reset);
    assert!(commands::list_devices(&state).is_empty());
    assert!(commands::is_connected(&state, "dev"));
    assert!(!state.playback.is_active());
}
