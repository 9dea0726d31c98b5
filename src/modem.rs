//! Subcarrier constellation mapping and soft demapping
//!
//! Gray-coded BPSK/QPSK/16-QAM/64-QAM with unit average power (the KMOD
//! factors of §17.3.5.8). The first half of each subcarrier's bit group
//! selects the I level, the second half the Q level.
//!
//! The demapper produces one unsigned soft value per bit: 0 is a confident
//! zero, 255 a confident one, 127 an erasure. Metrics are the usual
//! per-axis piecewise distances, scaled so that an exact constellation
//! point saturates every bit of its own label.

use crate::ratetab::Modulation;
use bitvec::prelude::*;
use rustfft::num_complex::Complex32;

/// 1/√2
const KMOD_QPSK: f32 = 0.707_106_77;
/// 1/√10
const KMOD_QAM16: f32 = 0.316_227_77;
/// 1/√42
const KMOD_QAM64: f32 = 0.154_303_35;

/// Gray axis levels indexed by the axis bit group (MSB first)
const LEVELS_1: [f32; 2] = [-1.0, 1.0];
const LEVELS_2: [f32; 4] = [-3.0, -1.0, 3.0, 1.0];
const LEVELS_3: [f32; 8] = [-7.0, -5.0, -1.0, -3.0, 7.0, 5.0, 1.0, 3.0];

/// Stateless modulator/demodulator for one modulation scheme
#[derive(Debug, Clone, Copy)]
pub struct Modem {
    modulation: Modulation,
}

impl Modem {
    pub fn new(modulation: Modulation) -> Self {
        Modem { modulation }
    }

    /// Coded bits per subcarrier
    pub fn bits_per_symbol(&self) -> usize {
        match self.modulation {
            Modulation::Bpsk => 1,
            Modulation::Qpsk => 2,
            Modulation::Qam16 => 4,
            Modulation::Qam64 => 6,
        }
    }

    /// Map one subcarrier's bit group to a constellation point
    pub fn modulate(&self, bits: &BitSlice<u8, Msb0>) -> Complex32 {
        debug_assert_eq!(bits.len(), self.bits_per_symbol());
        let idx = |range: core::ops::Range<usize>| {
            bits[range].iter().by_vals().fold(0usize, |acc, b| (acc << 1) | b as usize)
        };
        match self.modulation {
            Modulation::Bpsk => Complex32::new(LEVELS_1[idx(0..1)], 0.0),
            Modulation::Qpsk => {
                Complex32::new(LEVELS_1[idx(0..1)], LEVELS_1[idx(1..2)]) * KMOD_QPSK
            }
            Modulation::Qam16 => {
                Complex32::new(LEVELS_2[idx(0..2)], LEVELS_2[idx(2..4)]) * KMOD_QAM16
            }
            Modulation::Qam64 => {
                Complex32::new(LEVELS_3[idx(0..3)], LEVELS_3[idx(3..6)]) * KMOD_QAM64
            }
        }
    }

    /// Demap one equalized point into per-bit soft values
    ///
    /// `out` receives `bits_per_symbol()` values. `erased` marks a
    /// subcarrier whose channel gain was too small to equalize; all its
    /// bits become erasures.
    pub fn demodulate_soft(&self, point: Complex32, erased: bool, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.bits_per_symbol());
        if erased {
            out.fill(crate::convcode::SOFTBIT_ERASURE);
            return;
        }
        match self.modulation {
            Modulation::Bpsk => {
                out[0] = soft(point.re);
            }
            Modulation::Qpsk => {
                let t = point / KMOD_QPSK;
                out[0] = soft(t.re);
                out[1] = soft(t.im);
            }
            Modulation::Qam16 => {
                let t = point / KMOD_QAM16;
                axis_soft_2(t.re, &mut out[0..2]);
                axis_soft_2(t.im, &mut out[2..4]);
            }
            Modulation::Qam64 => {
                let t = point / KMOD_QAM64;
                axis_soft_3(t.re, &mut out[0..3]);
                axis_soft_3(t.im, &mut out[3..6]);
            }
        }
    }
}

/// Map a signed metric to the soft alphabet: −1 → 0, 0 → 127, +1 → 255
#[inline]
fn soft(metric: f32) -> u8 {
    (127.5 * (1.0 + metric)).clamp(0.0, 255.0) as u8
}

/// 16-QAM axis: bit 0 is the sign, bit 1 selects inner (1) vs outer (0)
#[inline]
fn axis_soft_2(t: f32, out: &mut [u8]) {
    out[0] = soft(t);
    out[1] = soft(2.0 - t.abs());
}

/// 64-QAM axis: sign, then distance from ±4, then distance from ±2/±6
#[inline]
fn axis_soft_3(t: f32, out: &mut [u8]) {
    out[0] = soft(t);
    out[1] = soft(4.0 - t.abs());
    out[2] = soft(2.0 - (t.abs() - 4.0).abs());
}
