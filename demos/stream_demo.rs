//! Demonstration of the EEG stress pipeline.
//!
//! This example shows how to:
//! 1. Build a monitor around the built-in linear classifier
//! 2. Feed it synthetic headset payloads, first relaxed then stressed
//! 3. Watch the smoothed verdicts flip once the new label is stable
//!
//! Run with: cargo run --example stream_demo

use std::sync::Arc;
use std::time::Duration;

use eeg_stress_agent::{
    collector::PayloadSource, ChannelEmitter, LinearClassifier, PipelineConfig, StressMonitor,
    SyntheticSource,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("EEG Stress Agent - Stream Demo");
    println!("==============================");
    println!();

    let config = PipelineConfig {
        tick_period: Duration::from_millis(50),
        ..PipelineConfig::default()
    };
    let classifier = LinearClassifier::new(Default::default())?;
    let (emitter, events) = ChannelEmitter::new(256);
    let mut monitor = StressMonitor::new(config, Box::new(classifier), Arc::new(emitter))?;
    monitor.start()?;

    for (phase, stress) in [("relaxed", false), ("stressed", true)] {
        println!("--- {phase} signal ---");
        let mut source = SyntheticSource::new(stress);

        // 60 payloads at 25ms, so roughly 30 ticks per phase
        for _ in 0..60 {
            if let Some(payload) = source.next_payload() {
                monitor.ingest(&payload)?;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;

            for event in events.try_iter() {
                println!(
                    "{:<7} p={:.3} confidence={:.2} consecutive={}",
                    event.label, event.probability, event.confidence, event.consecutive
                );
            }
        }
        println!();
    }

    monitor.stop();
    println!("{}", monitor.pipeline().log().summary());
    Ok(())
}
