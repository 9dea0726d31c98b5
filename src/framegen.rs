//! Frame generator: PLCP preamble, SIGNAL, and DATA symbol stream
//!
//! Every symbol occupies 80 samples: a 16-sample cyclic prefix and the
//! 64-sample transform body. Adjacent symbols overlap by the post-fix
//! length P (default 1); the overlap region is blended with a raised-cosine
//! ramp, ramp-up on the incoming symbol against the held-over tail of the
//! outgoing one.
//!
//! Frame layout: S0a S0b (10 short-training repetitions), S1a S1b (32-
//! sample guard plus two long-training copies), SIGNAL, then N_SYM DATA
//! symbols.

use crate::dft::{Dft64, FftTransform};
use crate::error::PhyError;
use crate::interleave;
use crate::mapper;
use crate::modem::Modem;
use crate::packet;
use crate::ratetab;
use crate::signal_field;
use crate::training::{Msequence, S0_TIME, S1_TIME};
use bitvec::prelude::*;
use rustfft::num_complex::Complex32;
use std::f32::consts::PI;
use tracing::debug;

/// Samples per OFDM symbol including cyclic prefix
pub const SYMBOL_LEN: usize = 80;
/// Cyclic prefix length
pub const PREFIX_LEN: usize = 16;
/// Symbols before the DATA field: S0a, S0b, S1a, S1b, SIGNAL
pub const PREAMBLE_SYMBOLS: usize = 5;

/// OFDM frame generator
///
/// Stateful across one frame: the post-fix tail and pilot polarity advance
/// symbol by symbol. `generate` resets and produces a whole frame.
pub struct FrameGenerator {
    dft: Box<dyn Dft64>,
    postfix_len: usize,
    rampup: Vec<f32>,
    x_prime: Vec<Complex32>,
    ms_pilot: Msequence,
}

impl FrameGenerator {
    /// Generator with the default transform and P = 1 window
    pub fn new() -> Self {
        Self::with_transform(Box::new(FftTransform::new())).expect("default postfix is valid")
    }

    /// Generator with a host-supplied transform
    pub fn with_transform(dft: Box<dyn Dft64>) -> Result<Self, PhyError> {
        Self::with_postfix(dft, 1)
    }

    /// Generator with an explicit inter-symbol window length
    pub fn with_postfix(dft: Box<dyn Dft64>, postfix_len: usize) -> Result<Self, PhyError> {
        if postfix_len == 0 || postfix_len > PREFIX_LEN {
            return Err(PhyError::InvalidPostfix { len: postfix_len });
        }
        let rampup = (0..postfix_len)
            .map(|k| 0.5 * (1.0 - (PI * (k + 1) as f32 / (postfix_len + 1) as f32).cos()))
            .collect();
        Ok(FrameGenerator {
            dft,
            postfix_len,
            rampup,
            x_prime: vec![Complex32::new(0.0, 0.0); postfix_len],
            ms_pilot: Msequence::new(),
        })
    }

    /// Generate a complete frame
    ///
    /// Output is `80 * (5 + N_SYM)` samples at the Annex G amplitude
    /// convention.
    pub fn generate(&mut self, rate: usize, seed: u8, payload: &[u8]) -> Result<Vec<Complex32>, PhyError> {
        let (params, coded) = packet::encode(rate, seed, payload)?;
        let rp = params.rate_params();
        debug!(
            rate_mbps = rp.rate_mbps,
            length = params.length,
            nsym = params.nsym,
            "generating frame"
        );

        // per-frame state
        self.ms_pilot.reset();
        // the very first ramp-down wraps to the short-sequence tail
        self.x_prime.copy_from_slice(&S0_TIME[..self.postfix_len]);

        let mut out = vec![Complex32::new(0.0, 0.0); SYMBOL_LEN * (PREAMBLE_SYMBOLS + params.nsym)];
        let mut chunks = out.chunks_exact_mut(SYMBOL_LEN);

        // S0a, S0b: the 16-periodic short sequence fills both bodies
        self.write_symbol(&S0_TIME, chunks.next().unwrap());
        self.write_symbol(&S0_TIME, chunks.next().unwrap());

        // S1a: 32-sample guard + first long copy; S1b: rest of the first
        // copy + second copy. Both are rotations of the 64-periodic s1.
        let mut s1a = [Complex32::new(0.0, 0.0); 64];
        for (u, s) in s1a.iter_mut().enumerate() {
            *s = S1_TIME[(u + 48) % 64];
        }
        self.write_symbol(&s1a, chunks.next().unwrap());
        self.write_symbol(&S1_TIME, chunks.next().unwrap());

        // SIGNAL: one interleaved BPSK symbol at the frame's first polarity
        let signal = signal_field::encode(&signal_field::pack(rate, params.length)?);
        let mut interleaved = [0u8; 6];
        interleave::signal_table().interleave(&signal, &mut interleaved);
        let bpsk = Modem::new(ratetab::Modulation::Bpsk);
        let mut points = [Complex32::new(0.0, 0.0); mapper::NUM_DATA_BINS];
        for (i, p) in points.iter_mut().enumerate() {
            *p = bpsk.modulate(&interleaved.view_bits::<Msb0>()[i..i + 1]);
        }
        self.write_mapped(&points, chunks.next().unwrap());

        // DATA: interleave and map each symbol's N_CBPS coded bits
        let table = interleave::table_for(rp);
        let modem = Modem::new(rp.modulation);
        let mut symbol_bits = bitvec![u8, Msb0; 0; rp.ncbps];
        for sym in 0..params.nsym {
            table.interleave_bits(&coded[sym * rp.ncbps..(sym + 1) * rp.ncbps], &mut symbol_bits);
            for (i, p) in points.iter_mut().enumerate() {
                *p = modem.modulate(&symbol_bits[i * rp.nbpsc..(i + 1) * rp.nbpsc]);
            }
            self.write_mapped(&points, chunks.next().unwrap());
        }

        debug_assert!(chunks.next().is_none());
        Ok(out)
    }

    /// Map 48 points onto the grid, transform, and emit one symbol
    fn write_mapped(&mut self, points: &[Complex32; mapper::NUM_DATA_BINS], out: &mut [Complex32]) {
        let polarity = self.ms_pilot.next_polarity();
        let mut grid = [Complex32::new(0.0, 0.0); 64];
        mapper::pack_symbol(points, polarity, &mut grid);
        let mut body = [Complex32::new(0.0, 0.0); 64];
        self.dft.inverse(&grid, &mut body);
        self.write_symbol(&body, out);
    }

    /// Emit one 80-sample symbol from a 64-sample body
    ///
    /// The prefix is the body tail x[48..64]; the first P output samples
    /// blend the incoming prefix against the previous symbol's held-over
    /// tail; the new tail is the first P body samples (the cyclic
    /// continuation past sample 80).
    fn write_symbol(&mut self, body: &[Complex32; 64], out: &mut [Complex32]) {
        debug_assert_eq!(out.len(), SYMBOL_LEN);
        for (k, o) in out.iter_mut().enumerate() {
            *o = body[(48 + k) % 64];
        }
        for k in 0..self.postfix_len {
            let r = self.rampup[k];
            out[k] = r * out[k] + (1.0 - r) * self.x_prime[k];
        }
        self.x_prime.copy_from_slice(&body[..self.postfix_len]);
    }
}

impl Default for FrameGenerator {
    fn default() -> Self {
        FrameGenerator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Vec<Complex32> {
        let payload: Vec<u8> = (0..100u32).map(|i| i as u8).collect();
        FrameGenerator::new().generate(5, 0x5d, &payload).unwrap()
    }

    #[test]
    fn test_frame_length() {
        // 36 Mbit/s, 100 bytes: 5 preamble symbols + 6 DATA symbols
        assert_eq!(frame().len(), 80 * 11);
    }

    #[test]
    fn test_short_preamble_periodicity() {
        let f = frame();
        // ten repetitions of the 16-sample pattern; the seam samples are
        // ramp-blended but s0 wraps onto itself, so every sample matches
        for n in 0..160 {
            let d = f[n] - S0_TIME[n % 16];
            assert!(d.norm() < 1e-5, "short preamble sample {n}");
        }
    }

    #[test]
    fn test_long_preamble_structure() {
        let f = frame();
        // samples 160..320 follow s1 cyclically with a 32-sample guard;
        // sample 160 is blended against the short-sequence tail
        for k in 1..160 {
            let d = f[160 + k] - S1_TIME[(k + 32) % 64];
            assert!(d.norm() < 1e-5, "long preamble sample {k}");
        }
        // the guard is the tail of s1 (a doubled cyclic prefix)
        for k in 1..32 {
            let d = f[160 + k] - S1_TIME[32 + k];
            assert!(d.norm() < 1e-5, "guard sample {k}");
        }
    }

    #[test]
    fn test_cyclic_prefix_property() {
        let f = frame();
        // for SIGNAL and each DATA symbol, prefix sample k equals body
        // sample 48+k (skip k=0, which carries the overlap window)
        for sym in 4..11 {
            let base = sym * 80;
            for k in 1..16 {
                let d = f[base + k] - f[base + 16 + 48 + k];
                assert!(d.norm() < 1e-5, "symbol {sym} prefix sample {k}");
            }
        }
    }

    #[test]
    fn test_signal_symbol_is_bpsk() {
        // DFT of the SIGNAL body must put ±1 on the 48 data bins and the
        // pilot pattern at polarity p0 = +1 on the pilot bins
        let f = frame();
        let body: [Complex32; 64] = core::array::from_fn(|n| f[4 * 80 + 16 + n]);
        let mut grid = [Complex32::new(0.0, 0.0); 64];
        FftTransform::new().forward(&body, &mut grid);

        for &bin in mapper::DATA_BINS.iter() {
            assert!((grid[bin].re.abs() - 1.0).abs() < 1e-3, "bin {bin}");
            assert!(grid[bin].im.abs() < 1e-3, "bin {bin}");
        }
        assert!((grid[43].re - 1.0).abs() < 1e-3);
        assert!((grid[21].re + 1.0).abs() < 1e-3);
        assert!(grid[0].norm() < 1e-3);
    }

    #[test]
    fn test_postfix_validation() {
        use crate::dft::SlowDft;
        assert!(FrameGenerator::with_postfix(Box::new(SlowDft), 0).is_err());
        assert!(FrameGenerator::with_postfix(Box::new(SlowDft), 17).is_err());
        assert!(FrameGenerator::with_postfix(Box::new(SlowDft), 16).is_ok());
    }

    #[test]
    fn test_longer_window_keeps_body() {
        // with P = 4 the first 4 samples of each prefix are blended, the
        // body region is untouched
        let payload = [7u8; 20];
        let mut short = FrameGenerator::new();
        let mut wide = FrameGenerator::with_postfix(Box::new(FftTransform::new()), 4).unwrap();
        let a = short.generate(0, 0x11, &payload).unwrap();
        let b = wide.generate(0, 0x11, &payload).unwrap();
        assert_eq!(a.len(), b.len());
        for sym in 0..a.len() / 80 {
            for k in 4..80 {
                let d = a[sym * 80 + k] - b[sym * 80 + k];
                assert!(d.norm() < 1e-6, "symbol {sym} sample {k}");
            }
        }
    }
}
