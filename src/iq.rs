//! I/Q sample file I/O
//!
//! Complex baseband recordings travel as two-channel WAV: in-phase on the
//! left channel, quadrature on the right, 32-bit float samples. Used by
//! the `wlansim`/`wlandetect` tools and the file-driven tests.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use rustfft::num_complex::Complex32;
use std::path::Path;

/// Write complex samples to a two-channel float WAV
pub fn write_iq_wav<P: AsRef<Path>>(
    path: P,
    samples: &[Complex32],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample(s.re)?;
        writer.write_sample(s.im)?;
    }
    writer.finalize()
}

/// Read complex samples from a two-channel WAV
///
/// Accepts 32-bit float or 16-bit integer recordings (integers normalize
/// to ±1.0). Returns the samples and the recording's sample rate.
pub fn read_iq_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<Complex32>, u32), hound::Error> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels != 2 {
        return Err(hound::Error::Unsupported);
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        _ => return Err(hound::Error::Unsupported),
    };

    let samples = interleaved
        .chunks_exact(2)
        .map(|iq| Complex32::new(iq[0], iq[1]))
        .collect();
    Ok((samples, spec.sample_rate))
}
