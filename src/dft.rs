//! 64-point transform capability
//!
//! The framing code never touches a transform library directly: it goes
//! through `Dft64`, and the host binds either the rustfft-backed default or
//! its own implementation. `SlowDft` is the dependency-free fallback.
//!
//! Convention: `forward` is the plain DFT (no scaling), `inverse` carries
//! the 1/64 factor. With that split the transmit tables come out at the
//! amplitudes printed in Annex G, and DFT(idft(X)) = X.

use once_cell::sync::Lazy;
use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use std::f32::consts::TAU;
use std::sync::{Arc, Mutex};

/// 64-point transform contract
pub trait Dft64: Send {
    /// Frequency from time, unscaled
    fn forward(&self, time: &[Complex32; 64], freq: &mut [Complex32; 64]);
    /// Time from frequency, scaled by 1/64
    fn inverse(&self, freq: &[Complex32; 64], time: &mut [Complex32; 64]);
}

/// Process-wide rustfft plans, built once
static PLANS: Lazy<Mutex<Option<(Arc<dyn Fft<f32>>, Arc<dyn Fft<f32>>)>>> =
    Lazy::new(|| Mutex::new(None));

fn plans() -> (Arc<dyn Fft<f32>>, Arc<dyn Fft<f32>>) {
    let mut guard = PLANS.lock().unwrap();
    let (fwd, inv) = guard.get_or_insert_with(|| {
        let mut planner = FftPlanner::new();
        (planner.plan_fft_forward(64), planner.plan_fft_inverse(64))
    });
    (Arc::clone(fwd), Arc::clone(inv))
}

/// rustfft-backed transform (the default binding)
pub struct FftTransform {
    fwd: Arc<dyn Fft<f32>>,
    inv: Arc<dyn Fft<f32>>,
}

impl FftTransform {
    pub fn new() -> Self {
        let (fwd, inv) = plans();
        FftTransform { fwd, inv }
    }
}

impl Default for FftTransform {
    fn default() -> Self {
        FftTransform::new()
    }
}

impl Dft64 for FftTransform {
    fn forward(&self, time: &[Complex32; 64], freq: &mut [Complex32; 64]) {
        freq.copy_from_slice(time);
        self.fwd.process(freq);
    }

    fn inverse(&self, freq: &[Complex32; 64], time: &mut [Complex32; 64]) {
        time.copy_from_slice(freq);
        self.inv.process(time);
        for t in time.iter_mut() {
            *t /= 64.0;
        }
    }
}

/// Textbook O(n²) transform, kept as the no-dependency fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct SlowDft;

impl SlowDft {
    fn run(input: &[Complex32; 64], output: &mut [Complex32; 64], sign: f32, scale: f32) {
        for (k, out) in output.iter_mut().enumerate() {
            let mut acc = Complex32::new(0.0, 0.0);
            for (n, &x) in input.iter().enumerate() {
                let phase = sign * TAU * (k * n % 64) as f32 / 64.0;
                acc += x * Complex32::new(phase.cos(), phase.sin());
            }
            *out = acc * scale;
        }
    }
}

impl Dft64 for SlowDft {
    fn forward(&self, time: &[Complex32; 64], freq: &mut [Complex32; 64]) {
        Self::run(time, freq, -1.0, 1.0);
    }

    fn inverse(&self, freq: &[Complex32; 64], time: &mut [Complex32; 64]) {
        Self::run(freq, time, 1.0, 1.0 / 64.0);
    }
}
