use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use falcon_scope::ingest::packet::packet_from_rows;
use falcon_scope::ingest::{
    encode_packet, ChannelSelection, ChannelSource, EngineConfig, IngestEngine, IngestError,
    ManualSource, OversizedPacketPolicy, RingBufferStore, TransportError,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config(count: usize, capacity: usize, scale_factor: f32) -> EngineConfig {
    EngineConfig {
        channels: ChannelSelection::Multi { count },
        window_capacity: capacity,
        scale_factor,
        ..EngineConfig::default()
    }
}

async fn wait_for_packets(handle: &falcon_scope::EngineHandle, packets: u64) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.stats().packets_written + handle.stats().dropped() < packets {
        assert!(Instant::now() < deadline, "engine did not drain its source");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn engine_drains_source_and_wraps_the_window() {
    init_logger();
    let payloads: Vec<Vec<u8>> = (0..4)
        .map(|k| {
            let base = (k * 4) as f32;
            encode_packet(&packet_from_rows(&[
                (0..4).map(|i| (base + i as f32) * 10.0).collect(),
                (0..4).map(|i| -(base + i as f32) * 10.0).collect(),
            ]))
        })
        .collect();
    let engine = IngestEngine::new(&config(2, 10, 10.0), ManualSource::new(payloads)).unwrap();
    let handle = engine.spawn();
    wait_for_packets(&handle, 4).await;

    let snap = handle.snapshot();
    // 16 samples through a window of 10: slots hold 10..16 then 6..10
    assert_eq!(snap.cursor, 6);
    assert_eq!(
        snap.channel(0).unwrap().to_vec(),
        vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 6.0, 7.0, 8.0, 9.0]
    );
    assert_eq!(
        snap.chronological(1).unwrap(),
        (6..16).map(|v| -(v as f32)).collect::<Vec<_>>()
    );
    let (window, cursor) = handle.get_snapshot(None).unwrap();
    assert_eq!(cursor, 6);
    assert_eq!(window[0], 10.0);

    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.packets_written, 4);
    assert_eq!(stats.samples_written, 16);
    assert_eq!(stats.dropped(), 0);
}

#[tokio::test]
async fn bad_packets_are_skipped_and_counted() {
    init_logger();
    let mut payloads = vec![b"not a flatbuffer at all".to_vec()];
    let mut mismatched = packet_from_rows(&[vec![1.0; 10], vec![1.0; 10]]);
    mismatched.samples.truncate(15);
    payloads.push(encode_packet(&mismatched));
    payloads.push(encode_packet(&packet_from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]])));
    let engine = IngestEngine::new(&config(2, 8, 1.0), ManualSource::new(payloads)).unwrap();
    let handle = engine.spawn();
    wait_for_packets(&handle, 3).await;
    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.packets_received, 3);
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(stats.shape_errors, 1);
    assert_eq!(stats.packets_written, 1);
}

#[test]
fn random_bytes_never_break_ingestion() {
    init_logger();
    let engine =
        IngestEngine::new(&config(3, 64, 1.0), ManualSource::new(Vec::<Vec<u8>>::new())).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let len = rng.gen_range(0..256);
        let garbage: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        engine.process_payload(&garbage).ok();
    }
    let store = engine.store();
    let before = store.cursor();
    let rows = vec![vec![1.0, 2.0, 3.0]; 3];
    let after = engine
        .process_payload(&encode_packet(&packet_from_rows(&rows)))
        .unwrap();
    assert_eq!(after, (before + 3) % 64);
    let snap = store.snapshot();
    for channel in 0..3 {
        let window = snap.channel(channel).unwrap();
        assert_eq!(window[before], 1.0);
        assert_eq!(window[(before + 2) % 64], 3.0);
    }
}

#[test]
fn concurrent_reader_never_sees_a_torn_packet() {
    let capacity = 97;
    let store = Arc::new(RingBufferStore::new(
        ChannelSelection::Multi { count: 4 },
        capacity,
        1.0,
        OversizedPacketPolicy::KeepNewest,
    ));
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut reads = 0u64;
            while !done.load(Ordering::Acquire) {
                let snap = store.snapshot();
                assert_eq!(snap.samples.ncols(), capacity);
                assert!(snap.cursor < capacity);
                if snap.packets_written > 0 {
                    // every packet writes one value to all channels
                    let last = (snap.cursor + capacity - 1) % capacity;
                    let expected = snap.samples[[0, last]];
                    assert_eq!(expected, snap.packets_written as f32);
                    for channel in 1..4 {
                        assert_eq!(snap.samples[[channel, last]], expected);
                    }
                }
                reads += 1;
            }
            reads
        })
    };

    for k in 1..=2000u32 {
        let num_samples = 1 + (k as usize * 7) % 13;
        let rows = vec![vec![k as f32; num_samples]; 4];
        store
            .write_packet(&packet_from_rows(&rows).validate().unwrap())
            .unwrap();
    }
    done.store(true, Ordering::Release);
    let reads = reader.join().unwrap();
    assert!(reads > 0);
    assert_eq!(store.snapshot().packets_written, 2000);
}

#[tokio::test]
async fn lost_transport_is_surfaced_on_shutdown() {
    init_logger();
    let (tx, source) = ChannelSource::pair();
    let engine = IngestEngine::new(&config(1, 8, 1.0), source).unwrap();
    let store = engine.store();
    let handle = engine.spawn();
    tx.send(encode_packet(&packet_from_rows(&[vec![1.0, 2.0]])).into())
        .unwrap();
    drop(tx);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "engine kept running without a transport");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let err = handle.shutdown().await.unwrap_err();
    assert!(matches!(err, IngestError::Transport(TransportError::Fatal(_))));
    assert_eq!(store.cursor(), 2);
}

#[tokio::test]
async fn shutdown_stops_an_idle_engine() {
    let engine =
        IngestEngine::new(&config(1, 8, 1.0), ManualSource::new(Vec::<Vec<u8>>::new())).unwrap();
    let handle = engine.spawn();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());
    let stats = handle.shutdown().await.unwrap();
    assert_eq!(stats.packets_received, 0);
    assert!(stats.empty_polls > 0);
}

#[test]
fn single_channel_config_tracks_channel_one() {
    let engine = IngestEngine::new(
        &EngineConfig {
            window_capacity: 4,
            scale_factor: 2000.0,
            ..EngineConfig::single_channel(1)
        },
        ManualSource::new(Vec::<Vec<u8>>::new()),
    )
    .unwrap();
    engine
        .process_payload(&encode_packet(&packet_from_rows(&[
            vec![0.0, 0.0],
            vec![2000.0, 4000.0],
            vec![0.0, 0.0],
        ])))
        .unwrap();
    let (window, cursor) = engine.store().channel_snapshot(None).unwrap();
    assert_eq!(window, vec![1.0, 2.0, 0.0, 0.0]);
    assert_eq!(cursor, 2);
}
