//! Numerically controlled oscillator
//!
//! Phase accumulator used by the receiver to take out carrier frequency
//! offset. Frequency is in radians per sample; estimates arrive as
//! incremental adjustments as the synchronizer refines through the
//! preamble.

use rustfft::num_complex::Complex32;
use std::f32::consts::TAU;

#[derive(Debug, Clone, Default)]
pub struct Nco {
    phase: f32,
    freq: f32,
}

impl Nco {
    pub fn new() -> Self {
        Nco::default()
    }

    /// Current frequency, radians per sample
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    /// Add a correction to the frequency, radians per sample
    pub fn adjust_frequency(&mut self, delta: f32) {
        self.freq += delta;
    }

    /// Mix a sample down by the current phase
    #[inline]
    pub fn mix_down(&self, x: Complex32) -> Complex32 {
        x * Complex32::new(self.phase.cos(), -self.phase.sin())
    }

    /// Advance the phase by one sample
    #[inline]
    pub fn step(&mut self) {
        self.phase += self.freq;
        if self.phase > TAU {
            self.phase -= TAU;
        } else if self.phase < -TAU {
            self.phase += TAU;
        }
    }

    /// Zero frequency and phase
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.freq = 0.0;
    }
}
