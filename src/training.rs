//! PLCP training sequences and the pilot polarity generator
//!
//! S0 is the short training sequence: energy on every fourth subcarrier,
//! scaled by √(13/6), giving a 16-sample-periodic time image used for
//! detection, AGC, and coarse CFO. S1 is the long training sequence: ±1 on
//! all 52 occupied subcarriers, 64-sample periodic, used for fine CFO and
//! channel estimation.
//!
//! Time-domain images use the 1/64-scaled inverse DFT, which reproduces
//! the numerical tables of Annex G directly.

use once_cell::sync::Lazy;
use rustfft::num_complex::Complex32;
use std::f32::consts::TAU;

/// √(13/6), the short-sequence power normalization
const S0_SCALE: f32 = 1.472_077_4;

/// Short training sequence, frequency domain (FFT bin order)
pub static S0_FREQ: Lazy<[Complex32; 64]> = Lazy::new(|| {
    let mut s = [Complex32::new(0.0, 0.0); 64];
    // +(1+j) on subcarriers −24, −16, −4, +12, +16, +20, +24
    let plus = [40, 48, 60, 12, 16, 20, 24];
    // −(1+j) on subcarriers −20, −12, −8, +4, +8
    let minus = [44, 52, 56, 4, 8];
    for &bin in &plus {
        s[bin] = Complex32::new(1.0, 1.0) * S0_SCALE;
    }
    for &bin in &minus {
        s[bin] = Complex32::new(-1.0, -1.0) * S0_SCALE;
    }
    s
});

/// Long training sequence values on subcarriers −26..−1, then +1..+26
const S1_VALUES_NEG: [f32; 26] = [
    1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, -1.0, -1.0,
    1.0, 1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0,
];
const S1_VALUES_POS: [f32; 26] = [
    1.0, -1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0, -1.0, -1.0, -1.0, -1.0, 1.0, 1.0,
    -1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, 1.0, 1.0, 1.0,
];

/// Long training sequence, frequency domain (FFT bin order)
pub static S1_FREQ: Lazy<[Complex32; 64]> = Lazy::new(|| {
    let mut s = [Complex32::new(0.0, 0.0); 64];
    for (i, &v) in S1_VALUES_NEG.iter().enumerate() {
        // subcarrier −26+i lives in bin 38+i
        s[38 + i] = Complex32::new(v, 0.0);
    }
    for (i, &v) in S1_VALUES_POS.iter().enumerate() {
        s[1 + i] = Complex32::new(v, 0.0);
    }
    s
});

/// 1/64-scaled inverse DFT, used once at table build time
fn idft64(freq: &[Complex32; 64]) -> [Complex32; 64] {
    let mut time = [Complex32::new(0.0, 0.0); 64];
    for (n, t) in time.iter_mut().enumerate() {
        let mut acc = Complex32::new(0.0, 0.0);
        for (k, &f) in freq.iter().enumerate() {
            let phase = TAU * (k * n % 64) as f32 / 64.0;
            acc += f * Complex32::new(phase.cos(), phase.sin());
        }
        *t = acc / 64.0;
    }
    time
}

/// Short training sequence, time domain (period 16)
pub static S0_TIME: Lazy<[Complex32; 64]> = Lazy::new(|| idft64(&S0_FREQ));

/// Long training sequence, time domain (period 64)
pub static S1_TIME: Lazy<[Complex32; 64]> = Lazy::new(|| idft64(&S1_FREQ));

/// Maximal-length sequence generator, x⁷ + x⁴ + 1, 127-bit period
///
/// Drives the pilot polarity: reset to the all-ones state at the start of
/// each frame and stepped once per OFDM symbol beginning with SIGNAL.
#[derive(Debug, Clone)]
pub struct Msequence {
    state: u8,
}

impl Msequence {
    pub fn new() -> Self {
        Msequence { state: 0x7f }
    }

    pub fn reset(&mut self) {
        self.state = 0x7f;
    }

    /// Next raw sequence bit
    pub fn next_bit(&mut self) -> u8 {
        let out = ((self.state >> 6) ^ (self.state >> 3)) & 1;
        self.state = ((self.state << 1) | out) & 0x7f;
        out
    }

    /// Next pilot polarity: sequence bit 0 → +1, 1 → −1
    pub fn next_polarity(&mut self) -> f32 {
        1.0 - 2.0 * self.next_bit() as f32
    }
}

impl Default for Msequence {
    fn default() -> Self {
        Msequence::new()
    }
}
