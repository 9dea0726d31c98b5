//! OFDM frame detector
//!
//! Read a two-channel I/Q WAV file, run the frame synchronizer over it,
//! and print every decoded frame.
//!
//! Usage:
//!   cargo run --bin wlandetect -- <input.wav>

use rustywlan::{FrameEvent, FrameSynchronizer, SyncConfig, RATE_TABLE};

fn main() {
    rustywlan::tracing_init::init_tracing();

    let path = match std::env::args().nth(1) {
        Some(p) if p != "-h" && p != "--help" => p,
        _ => {
            eprintln!("Usage: wlandetect <input.wav>");
            std::process::exit(1);
        }
    };

    let (samples, rate) = match rustywlan::iq::read_iq_wav(&path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };
    eprintln!("{}: {} samples at {} Hz", path, samples.len(), rate);

    let mut count = 0usize;
    let mut sync = FrameSynchronizer::new(SyncConfig::default(), |ev: FrameEvent| {
        count += 1;
        let preview: Vec<String> = ev.payload.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        println!(
            "frame {}: {} Mbit/s, {} bytes, seed {:#04x}, {} [{}{}]",
            count,
            RATE_TABLE[ev.rate].rate_mbps,
            ev.length,
            ev.seed,
            if ev.valid { "valid" } else { "INVALID" },
            preview.join(" "),
            if ev.length > 8 { " ..." } else { "" },
        );
    });
    sync.push(&samples);
    drop(sync);

    println!("{} frame(s) decoded", count);
}
