//! Shared utilities for integration tests

use rustywlan::{FrameEvent, FrameSynchronizer, SyncConfig};
use rustfft::num_complex::Complex32;

/// Initialize tracing (RUST_LOG-filtered) once per test binary
pub fn init_test_tracing() {
    rustywlan::tracing_init::init_test_tracing();
}

/// One decoded frame captured from the synchronizer callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub rate: usize,
    pub length: usize,
    pub payload: Vec<u8>,
    pub valid: bool,
    pub seed: u8,
}

/// Run a default-configured synchronizer over a sample stream
pub fn run_synchronizer(samples: &[Complex32]) -> Vec<CapturedFrame> {
    run_synchronizer_with(SyncConfig::default(), samples)
}

/// Run a synchronizer with explicit configuration
pub fn run_synchronizer_with(config: SyncConfig, samples: &[Complex32]) -> Vec<CapturedFrame> {
    let mut frames = Vec::new();
    let mut sync = FrameSynchronizer::new(config, |ev: FrameEvent| {
        frames.push(CapturedFrame {
            rate: ev.rate,
            length: ev.length,
            payload: ev.payload.to_vec(),
            valid: ev.valid,
            seed: ev.seed,
        });
    });
    sync.push(samples);
    drop(sync);
    frames
}

/// Deterministic pseudo-random payload for a given tag
pub fn test_payload(length: usize, tag: u64) -> Vec<u8> {
    let mut state = tag.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 1;
    (0..length)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 32) as u8
        })
        .collect()
}
