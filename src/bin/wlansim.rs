//! OFDM frame simulator
//!
//! Generate an 802.11a/g baseband frame with optional channel impairments
//! and write it to a two-channel I/Q WAV file.
//!
//! Usage:
//!   cargo run --bin wlansim -- [OPTIONS] <output.wav>
//!
//! Options:
//!   -r, --rate <0..7>     Rate index, 0 = 6 Mbit/s .. 7 = 54 Mbit/s (default: 0)
//!   -l, --length <bytes>  Payload length 1..4095 (default: 100)
//!   -x, --seed <1..127>   Scrambler seed (default: 0x5d)
//!   -s, --snr <dB>        Add AWGN at this Es/N0
//!   -c, --cfo <ppm>       Carrier frequency offset in parts per million
//!   -d, --delay <n>       Prepend n zero samples (default: 128)
//!   -h, --help            Show this help message
//!
//! Examples:
//!   # Clean 6 Mbit/s frame
//!   wlansim frame.wav
//!
//!   # 54 Mbit/s frame at 15 dB with 40 ppm CFO
//!   wlansim -r 7 -s 15 -c 40 frame.wav

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustywlan::{simulation, FrameGenerator, SAMPLE_RATE};

struct SimConfig {
    output_path: String,
    rate: usize,
    length: usize,
    seed: u8,
    snr_db: Option<f32>,
    cfo_ppm: f32,
    delay: usize,
}

impl SimConfig {
    fn parse_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();

        let mut rate = 0usize;
        let mut length = 100usize;
        let mut seed = 0x5du8;
        let mut snr_db = None;
        let mut cfo_ppm = 0.0f32;
        let mut delay = 128usize;
        let mut output_path = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-r" | "--rate" => {
                    i += 1;
                    rate = next_value(&args, i, "--rate")?;
                }
                "-l" | "--length" => {
                    i += 1;
                    length = next_value(&args, i, "--length")?;
                }
                "-x" | "--seed" => {
                    i += 1;
                    seed = next_value(&args, i, "--seed")?;
                }
                "-s" | "--snr" => {
                    i += 1;
                    snr_db = Some(next_value(&args, i, "--snr")?);
                }
                "-c" | "--cfo" => {
                    i += 1;
                    cfo_ppm = next_value(&args, i, "--cfo")?;
                }
                "-d" | "--delay" => {
                    i += 1;
                    delay = next_value(&args, i, "--delay")?;
                }
                "-h" | "--help" => {
                    print_usage();
                    std::process::exit(0);
                }
                other => {
                    if output_path.is_some() {
                        return Err(format!("Unexpected argument: {}", other));
                    }
                    output_path = Some(other.to_string());
                }
            }
            i += 1;
        }

        Ok(SimConfig {
            output_path: output_path.ok_or("Missing output file")?,
            rate,
            length,
            seed,
            snr_db,
            cfo_ppm,
            delay,
        })
    }
}

fn next_value<T: std::str::FromStr>(args: &[String], i: usize, name: &str) -> Result<T, String> {
    let raw = args.get(i).ok_or(format!("Missing value for {}", name))?;
    raw.parse().map_err(|_| format!("Invalid value for {}: {}", name, raw))
}

fn print_usage() {
    eprintln!("Usage: wlansim [OPTIONS] <output.wav>");
    eprintln!("  -r, --rate <0..7>     rate index (default 0 = 6 Mbit/s)");
    eprintln!("  -l, --length <bytes>  payload length (default 100)");
    eprintln!("  -x, --seed <1..127>   scrambler seed (default 0x5d = 93)");
    eprintln!("  -s, --snr <dB>        add AWGN at this Es/N0");
    eprintln!("  -c, --cfo <ppm>       carrier frequency offset");
    eprintln!("  -d, --delay <n>       leading zero samples (default 128)");
}

fn main() {
    rustywlan::tracing_init::init_tracing();

    let config = match SimConfig::parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    // deterministic payload so wlandetect output is recognizable
    let payload: Vec<u8> = (0..config.length as u32).map(|i| (i * 7 + 1) as u8).collect();

    let mut gen = FrameGenerator::new();
    let frame = match gen.generate(config.rate, config.seed, &payload) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let mut samples = simulation::delay(&frame, config.delay);
    if config.cfo_ppm != 0.0 {
        // CFO in cycles per sample for a 2.4 GHz carrier at 20 Msps
        let cycles = config.cfo_ppm * 1e-6 * 2.4e9 / SAMPLE_RATE as f32;
        simulation::apply_cfo(&mut samples, cycles);
    }
    if let Some(snr) = config.snr_db {
        let mut rng = StdRng::seed_from_u64(0x5742_4c41);
        simulation::add_awgn(&mut samples, snr, &mut rng);
    }

    if let Err(e) = rustywlan::iq::write_iq_wav(&config.output_path, &samples, SAMPLE_RATE) {
        eprintln!("error: failed to write {}: {}", config.output_path, e);
        std::process::exit(1);
    }
    println!(
        "wrote {} samples ({} data symbols) to {}",
        samples.len(),
        frame.len() / 80 - 5,
        config.output_path
    );
}
