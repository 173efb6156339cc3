//! Integration tests for the streaming pipeline

use eeg_stress_agent::collector::{write_recording, Collector, ReplaySource};
use eeg_stress_agent::core::{GateDecision, StabilityState, CHANNEL_COUNT};
use eeg_stress_agent::{
    ChannelEmitter, ClassScores, ClassificationEvent, Classifier, ClassifierError, ClassifierInput,
    EventEmitter, Frame, Label, Pipeline, PipelineConfig, StressMonitor, TickOutcome,
};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

type Recorded = Arc<Mutex<Vec<ClassificationEvent>>>;

fn recorder() -> (Arc<dyn EventEmitter>, Recorded) {
    let events: Recorded = Arc::default();
    let sink = events.clone();
    let emitter = move |e: ClassificationEvent| sink.lock().unwrap().push(e);
    (Arc::new(emitter), events)
}

fn stress_logits() -> Box<dyn Classifier> {
    Box::new(
        |_: ClassifierInput<'_>| -> Result<ClassScores, ClassifierError> {
            Ok(ClassScores::Logits {
                relaxed: 0.0,
                stress: 2.0,
            })
        },
    )
}

/// Stub returning the given stress probabilities in order, then repeating the last.
fn scripted(probabilities: Vec<f64>) -> Box<dyn Classifier> {
    let mut index = 0;
    Box::new(
        move |_: ClassifierInput<'_>| -> Result<ClassScores, ClassifierError> {
            let p = probabilities[index.min(probabilities.len() - 1)];
            index += 1;
            Ok(ClassScores::Probabilities {
                relaxed: 1.0 - p,
                stress: p,
            })
        },
    )
}

fn reference_payload() -> Vec<u8> {
    let mut channels = [0i32; CHANNEL_COUNT];
    channels[0] = 100;
    channels[1] = -50;
    Frame::new(channels).unwrap().to_payload().to_vec()
}

#[test]
fn test_end_to_end_stress_scenario() {
    let (emitter, events) = recorder();
    let pipeline = Pipeline::new(PipelineConfig::default(), stress_logits(), emitter).unwrap();
    pipeline.start();

    for _ in 0..5 {
        pipeline.ingest(&reference_payload()).unwrap();
        let outcome = pipeline.tick();
        assert!(outcome.emitted(), "{outcome:?}");
    }

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 5);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.label, Label::Stress);
        assert!((event.probability - 0.880_797).abs() < 1e-5);
        assert_eq!(event.frame.channels()[0], 100);
        assert_eq!(event.frame.channels()[1], -50);
        assert!(event.frame.channels()[2..].iter().all(|&v| v == 0));
        assert_eq!(event.consecutive, i as u32);
        assert_eq!(event.confidence, 1.0);
    }
}

#[test]
fn test_event_serializes_label_as_text() {
    let (emitter, events) = recorder();
    let pipeline = Pipeline::new(PipelineConfig::default(), stress_logits(), emitter).unwrap();
    pipeline.ingest(&reference_payload()).unwrap();
    pipeline.start();
    pipeline.tick();

    let json = serde_json::to_value(&events.lock().unwrap()[0]).unwrap();
    assert_eq!(json["label"], "Stress");
    assert_eq!(json["frame"].as_array().unwrap().len(), CHANNEL_COUNT);
    assert_eq!(json["frame"][1], -50);
}

#[test]
fn test_stability_gate_opens_on_threshold_tick() {
    // Per-tick labels feed straight into a 3-slot vote; warm-up covers the first tick only.
    let config = PipelineConfig {
        probability_window_size: 1,
        prediction_window_size: 3,
        stability_threshold: 3,
        ..PipelineConfig::default()
    };
    let (emitter, events) = recorder();
    let pipeline = Pipeline::new(
        config,
        scripted(vec![0.1, 0.1, 0.9, 0.9, 0.9, 0.9, 0.9, 0.9]),
        emitter,
    )
    .unwrap();
    pipeline.ingest(&reference_payload()).unwrap();
    pipeline.start();

    let decisions: Vec<GateDecision> = (0..8)
        .map(|_| pipeline.tick().report().unwrap().decision)
        .collect();

    use GateDecision::*;
    assert_eq!(
        decisions,
        vec![WarmUp, Suppressed, Suppressed, Suppressed, Suppressed, Suppressed, Stable, Stable]
    );

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].label, Label::Relaxed);
    assert_eq!(events[1].label, Label::Stress);
    assert_eq!(events[1].consecutive, 3);
}

#[test]
fn test_warm_up_bypasses_gate_for_first_half_window() {
    // Alternating labels keep the majority flipping, so the gate never stabilizes.
    let config = PipelineConfig {
        probability_window_size: 1,
        ..PipelineConfig::default()
    };
    let alternating: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 0.9 } else { 0.1 }).collect();
    let (emitter, events) = recorder();
    let pipeline = Pipeline::new(config, scripted(alternating), emitter).unwrap();
    pipeline.ingest(&reference_payload()).unwrap();
    pipeline.start();

    let emitted: Vec<bool> = (0..12).map(|_| pipeline.tick().emitted()).collect();
    assert_eq!(emitted[..7], [true; 7]);
    assert_eq!(emitted[7..], [false; 5]);

    let events = events.lock().unwrap();
    assert!(events.iter().all(|e| e.consecutive == 0));
    assert_eq!(events[0].label, Label::Stress);
    assert_eq!(events[1].label, Label::Relaxed);
}

#[test]
fn test_smoothing_uses_last_window_only() {
    let config = PipelineConfig {
        probability_window_size: 3,
        ..PipelineConfig::default()
    };
    let (emitter, _) = recorder();
    let pipeline = Pipeline::new(config, scripted(vec![0.9, 0.0, 0.3, 0.6]), emitter).unwrap();
    pipeline.ingest(&reference_payload()).unwrap();
    pipeline.start();

    let averages: Vec<f64> = (0..4)
        .map(|_| pipeline.tick().report().unwrap().avg_probability)
        .collect();
    assert!((averages[0] - 0.9).abs() < 1e-12);
    assert!((averages[1] - 0.45).abs() < 1e-12);
    assert!((averages[2] - 0.4).abs() < 1e-12);
    assert!((averages[3] - 0.3).abs() < 1e-12);
}

#[test]
fn test_stop_start_resets_consumer_state_only() {
    let (emitter, _) = recorder();
    let pipeline = Pipeline::new(PipelineConfig::default(), stress_logits(), emitter).unwrap();

    for _ in 0..3 {
        pipeline.ingest(&reference_payload()).unwrap();
    }
    pipeline.start();
    for _ in 0..6 {
        pipeline.tick();
    }
    assert_eq!(pipeline.stability_state().consecutive_count, 5);

    pipeline.stop();
    assert_eq!(pipeline.tick(), TickOutcome::Inactive);
    pipeline.start();

    assert_eq!(pipeline.probability_window_len(), 0);
    assert_eq!(pipeline.prediction_window_len(), 0);
    assert_eq!(pipeline.stability_state(), StabilityState::default());
    assert_eq!(pipeline.frames().len(), 3);
}

#[test]
fn test_short_payloads_never_reach_window() {
    let (emitter, events) = recorder();
    let pipeline = Pipeline::new(PipelineConfig::default(), stress_logits(), emitter).unwrap();
    pipeline.start();

    for len in [0, 1, 47] {
        assert!(pipeline.ingest(&vec![0xFF; len]).is_err());
    }
    assert!(pipeline.frames().is_empty());
    assert_eq!(pipeline.tick(), TickOutcome::Idle);
    assert!(events.lock().unwrap().is_empty());

    // Extra bytes past the first 48 are ignored
    let mut long = reference_payload();
    long.extend_from_slice(&[0xAB; 16]);
    assert_eq!(pipeline.ingest(&long).unwrap().channels()[0], 100);
}

#[test]
fn test_concurrent_ingest_and_tick() {
    let config = PipelineConfig {
        window_capacity: 50,
        ..PipelineConfig::default()
    };
    let (emitter, _) = recorder();
    let pipeline = Arc::new(Pipeline::new(config, stress_logits(), emitter).unwrap());
    pipeline.start();

    let producer = {
        let pipeline = Arc::clone(&pipeline);
        thread::spawn(move || {
            for i in 0..2000 {
                let frame = Frame::new([i; CHANNEL_COUNT]).unwrap();
                pipeline.ingest(&frame.to_payload()).unwrap();
            }
        })
    };

    for _ in 0..200 {
        pipeline.tick();
        assert!(pipeline.frames().len() <= 50);
    }
    producer.join().unwrap();

    let frames = pipeline.frames().to_vec();
    assert_eq!(frames.len(), 50);
    let firsts: Vec<i32> = frames.iter().map(|f| f.channels()[0]).collect();
    assert_eq!(firsts, (1950..2000).collect::<Vec<i32>>());
}

#[test]
fn test_replay_recording_through_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.bin");
    let frames = (0..4).map(|i| Frame::new([i * 10; CHANNEL_COUNT]).unwrap());
    write_recording(&path, frames).unwrap();

    // Append a partial record
    let mut bytes = std::fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0x01, 0x02]);
    std::fs::write(&path, &bytes).unwrap();

    let (emitter, _) = recorder();
    let pipeline = Pipeline::new(PipelineConfig::default(), stress_logits(), emitter).unwrap();
    let mut collector = Collector::new(ReplaySource::open(&path).unwrap(), Duration::from_millis(1));
    collector.start().unwrap();

    for _ in 0..5 {
        let payload = collector
            .receiver()
            .recv_timeout(Duration::from_secs(2))
            .unwrap();
        let _ = pipeline.ingest(&payload);
    }
    collector.stop();

    let stats = pipeline.log().stats();
    assert_eq!(stats.payloads_received, 5);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(pipeline.frames().len(), 4);
    assert_eq!(pipeline.frames().snapshot_latest().unwrap().channels()[0], 30);
}

#[tokio::test(start_paused = true)]
async fn test_monitor_emits_on_schedule() {
    let (emitter, events) = ChannelEmitter::new(64);
    let mut monitor = StressMonitor::new(
        PipelineConfig::default(),
        stress_logits(),
        Arc::new(emitter),
    )
    .unwrap();
    monitor.ingest(&reference_payload()).unwrap();

    monitor.start().unwrap();
    assert!(monitor.is_running());
    // Ticks at 0, 200, 400, 600 and 800 ms
    tokio::time::sleep(Duration::from_millis(900)).await;

    let received: Vec<ClassificationEvent> = events.try_iter().collect();
    assert_eq!(received.len(), 5);
    assert!(received.iter().all(|e| e.label == Label::Stress));

    monitor.stop();
    assert!(!monitor.is_running());
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_monitor_restart_begins_cold() {
    let (emitter, events) = ChannelEmitter::new(64);
    let mut monitor = StressMonitor::new(
        PipelineConfig::default(),
        stress_logits(),
        Arc::new(emitter),
    )
    .unwrap();
    monitor.ingest(&reference_payload()).unwrap();

    monitor.start().unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    monitor.stop();
    let first: Vec<u32> = events.try_iter().map(|e| e.consecutive).collect();
    assert_eq!(first, vec![0, 1, 2]);

    monitor.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second: Vec<u32> = events.try_iter().map(|e| e.consecutive).collect();
    assert_eq!(second, vec![0]);
    monitor.stop();
}
