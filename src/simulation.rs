//! Channel impairments for simulation and tests
//!
//! Additive white Gaussian noise at a chosen Es/N0, carrier frequency
//! offset, and stream delay padding. Signal power is measured from the
//! buffer rather than assumed, so the same helpers work for whole frames
//! and for sliced symbol streams.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use rustfft::num_complex::Complex32;
use std::f32::consts::TAU;

/// Mean power per sample
pub fn mean_power(samples: &[Complex32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s.norm_sqr()).sum::<f32>() / samples.len() as f32
}

/// Add complex AWGN at the given symbol-energy-to-noise ratio
///
/// Noise variance is set against the measured mean power of `samples`, so
/// call this on the signal region only.
pub fn add_awgn<R: Rng>(samples: &mut [Complex32], es_n0_db: f32, rng: &mut R) {
    let es = mean_power(samples);
    if es == 0.0 {
        return;
    }
    let n0 = es / 10f32.powf(es_n0_db / 10.0);
    // variance n0/2 per real dimension
    let normal = Normal::new(0.0f32, (n0 / 2.0).sqrt()).unwrap();
    for s in samples.iter_mut() {
        *s += Complex32::new(normal.sample(rng), normal.sample(rng));
    }
}

/// Rotate the stream by a carrier frequency offset, cycles per sample
pub fn apply_cfo(samples: &mut [Complex32], cycles_per_sample: f32) {
    let step = Complex32::new((TAU * cycles_per_sample).cos(), (TAU * cycles_per_sample).sin());
    let mut rot = Complex32::new(1.0, 0.0);
    for s in samples.iter_mut() {
        *s *= rot;
        rot *= step;
    }
}

/// Prepend `delay` zero samples (dead air before the frame)
pub fn delay(samples: &[Complex32], delay: usize) -> Vec<Complex32> {
    let mut out = vec![Complex32::new(0.0, 0.0); delay];
    out.extend_from_slice(samples);
    out
}

/// Complex white noise of the given mean power
pub fn noise<R: Rng>(len: usize, power: f32, rng: &mut R) -> Vec<Complex32> {
    let normal = Normal::new(0.0f32, (power / 2.0).sqrt()).unwrap();
    (0..len)
        .map(|_| Complex32::new(normal.sample(rng), normal.sample(rng)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_awgn_hits_target_snr() {
        let mut rng = StdRng::seed_from_u64(7);
        let clean: Vec<Complex32> = (0..20_000)
            .map(|n| Complex32::new((n as f32 * 0.3).cos(), (n as f32 * 0.3).sin()))
            .collect();
        let mut noisy = clean.clone();
        add_awgn(&mut noisy, 10.0, &mut rng);

        let noise_power = noisy
            .iter()
            .zip(clean.iter())
            .map(|(a, b)| (a - b).norm_sqr())
            .sum::<f32>()
            / clean.len() as f32;
        let snr_db = 10.0 * (mean_power(&clean) / noise_power).log10();
        assert!((snr_db - 10.0).abs() < 0.3, "measured {snr_db} dB");
    }

    #[test]
    fn test_cfo_rotation() {
        let mut samples = vec![Complex32::new(1.0, 0.0); 100];
        apply_cfo(&mut samples, 0.01);
        // after 25 samples the rotation is a quarter turn
        assert!((samples[25] - Complex32::new(0.0, 1.0)).norm() < 1e-3);
        // power is preserved
        assert!((mean_power(&samples) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_noise_power() {
        let mut rng = StdRng::seed_from_u64(11);
        let n = noise(50_000, 0.25, &mut rng);
        assert!((mean_power(&n) - 0.25).abs() < 0.01);
    }
}
