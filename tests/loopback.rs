//! Noiseless transmit → receive loopback across the rate table

mod test_utils;

use rustywlan::{simulation, FrameGenerator};
use test_utils::{init_test_tracing, run_synchronizer, test_payload};

fn loopback_one(rate: usize, seed: u8, payload: &[u8]) {
    let samples = FrameGenerator::new().generate(rate, seed, payload).unwrap();
    let frames = run_synchronizer(&samples);
    assert_eq!(frames.len(), 1, "rate {rate}: expected one frame");
    let f = &frames[0];
    assert_eq!(f.rate, rate);
    assert_eq!(f.length, payload.len());
    assert_eq!(f.payload, payload, "rate {rate}: payload mismatch");
    assert!(f.valid, "rate {rate}: frame flagged invalid");
    assert_eq!(f.seed, seed);
}

#[test]
fn test_all_rates_length_100() {
    init_test_tracing();
    for rate in 0..8 {
        loopback_one(rate, 0x5d, &test_payload(100, rate as u64));
    }
}

#[test]
fn test_assorted_seeds() {
    init_test_tracing();
    for (i, seed) in [0x01u8, 0x24, 0x5d, 0x7f].into_iter().enumerate() {
        loopback_one(3, seed, &test_payload(61, i as u64));
    }
}

#[test]
fn test_minimum_length() {
    init_test_tracing();
    loopback_one(0, 0x13, &[0xa7]);
    loopback_one(7, 0x13, &[0x01]);
}

#[test]
fn test_maximum_length() {
    init_test_tracing();
    loopback_one(7, 0x6e, &test_payload(4095, 99));
}

#[test]
fn test_all_zero_and_all_one_payloads() {
    init_test_tracing();
    loopback_one(4, 0x2b, &vec![0u8; 64]);
    loopback_one(4, 0x2b, &vec![0xffu8; 64]);
}

#[test]
fn test_leading_dead_air() {
    init_test_tracing();
    let payload = test_payload(80, 5);
    let frame = FrameGenerator::new().generate(2, 0x31, &payload).unwrap();
    // aligned delay: detection cadence stays on the frame's 64-grid
    let samples = simulation::delay(&frame, 256);
    let frames = run_synchronizer(&samples);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, payload);
}

#[test]
fn test_misaligned_stream_offset() {
    init_test_tracing();
    // offsets within the sub-16-sample timing estimator's reach
    for delay in [124usize, 128, 132] {
        let payload = test_payload(48, delay as u64);
        let frame = FrameGenerator::new().generate(1, 0x45, &payload).unwrap();
        let samples = simulation::delay(&frame, delay);
        let frames = run_synchronizer(&samples);
        assert_eq!(frames.len(), 1, "delay {delay}: no frame decoded");
        assert_eq!(frames[0].payload, payload, "delay {delay}");
        assert!(frames[0].valid, "delay {delay}");
    }
}

#[test]
fn test_carrier_frequency_offset() {
    init_test_tracing();
    // ±100 kHz at 20 Msps (≈ ±40 ppm at 2.4 GHz)
    for cfo in [-0.005f32, 0.002, 0.005] {
        let payload = test_payload(72, 17);
        let mut samples = FrameGenerator::new().generate(0, 0x5d, &payload).unwrap();
        simulation::apply_cfo(&mut samples, cfo);
        let frames = run_synchronizer(&samples);
        assert_eq!(frames.len(), 1, "cfo {cfo}: no frame decoded");
        assert_eq!(frames[0].payload, payload, "cfo {cfo}");
    }
}

#[test]
fn test_wider_postfix_window() {
    init_test_tracing();
    use rustywlan::dft::FftTransform;
    let payload = test_payload(90, 23);
    let mut gen = FrameGenerator::with_postfix(Box::new(FftTransform::new()), 4).unwrap();
    let samples = gen.generate(6, 0x19, &payload).unwrap();
    let frames = run_synchronizer(&samples);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, payload);
}

#[test]
fn test_slow_dft_binding() {
    init_test_tracing();
    use rustywlan::dft::SlowDft;
    use rustywlan::viterbi::SoftViterbi;
    use rustywlan::{FrameEvent, FrameSynchronizer, SyncConfig};

    let payload = test_payload(30, 31);
    let mut gen = FrameGenerator::with_transform(Box::new(SlowDft)).unwrap();
    let samples = gen.generate(2, 0x51, &payload).unwrap();

    let mut got = Vec::new();
    let mut sync = FrameSynchronizer::with_capabilities(
        Box::new(SlowDft),
        Box::new(SoftViterbi),
        SyncConfig::default(),
        |ev: FrameEvent| got.push(ev.payload.to_vec()),
    );
    sync.push(&samples);
    drop(sync);
    assert_eq!(got, vec![payload]);
}
