//! Soft-decision Viterbi decoding for the r1/2 mother code
//!
//! The decoder is an injected capability: the synchronizer only frames its
//! input (two soft values per data bit, erasures at punctured positions)
//! and output buffers. `SoftViterbi` is the built-in implementation; a host
//! with an optimized native decoder can bind its own `ConvDecoder`.

use crate::convcode::{GENPOLY_A, GENPOLY_B};
use bitvec::prelude::*;

/// Sequence decoder contract for the K=7, r1/2 trellis
pub trait ConvDecoder: Send {
    /// Decode `out.len()` data bits from `2 * out.len()` soft values
    ///
    /// Soft values use the 0/127/255 alphabet; the encoder is assumed to
    /// start and end in the all-zero state (tail-terminated).
    fn decode(&self, soft: &[u8], out: &mut BitSlice<u8, Msb0>);
}

const NUM_STATES: usize = 64;

/// Built-in 64-state soft-decision decoder with full-sequence traceback
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftViterbi;

/// Expected (A, B) output pair for a 7-bit register value
#[inline]
fn branch_bits(reg: u8) -> (bool, bool) {
    (
        (reg & GENPOLY_A).count_ones() & 1 == 1,
        (reg & GENPOLY_B).count_ones() & 1 == 1,
    )
}

/// Distance of a soft value from an expected hard bit
///
/// An erasure (127) costs almost the same either way and so steers no
/// branch decision.
#[inline]
fn bit_cost(soft: u8, expected: bool) -> u32 {
    if expected {
        255 - soft as u32
    } else {
        soft as u32
    }
}

impl ConvDecoder for SoftViterbi {
    fn decode(&self, soft: &[u8], out: &mut BitSlice<u8, Msb0>) {
        let nbits = out.len();
        assert_eq!(soft.len(), 2 * nbits, "soft stream must hold 2 values per bit");

        // Branch outputs depend only on the full 7-bit register; precompute
        // per next-state for both candidate predecessors.
        let mut outputs = [[(false, false); 2]; NUM_STATES];
        for (next, entry) in outputs.iter_mut().enumerate() {
            for (high, slot) in entry.iter_mut().enumerate() {
                let reg = ((high as u8) << 6) | next as u8;
                *slot = branch_bits(reg);
            }
        }

        const UNREACHED: u32 = u32::MAX / 2;
        let mut metrics = [UNREACHED; NUM_STATES];
        metrics[0] = 0;
        let mut next_metrics = [UNREACHED; NUM_STATES];
        // One decision bit per state per step: set = survivor came from the
        // predecessor with register bit 5 set.
        let mut decisions: Vec<u64> = Vec::with_capacity(nbits);

        for step in 0..nbits {
            let (va, vb) = (soft[2 * step], soft[2 * step + 1]);
            let mut word = 0u64;
            for (next, entry) in outputs.iter().enumerate() {
                let p0 = next >> 1;
                let p1 = p0 | 0x20;
                let (a0, b0) = entry[0];
                let (a1, b1) = entry[1];
                let c0 = metrics[p0].saturating_add(bit_cost(va, a0) + bit_cost(vb, b0));
                let c1 = metrics[p1].saturating_add(bit_cost(va, a1) + bit_cost(vb, b1));
                if c1 < c0 {
                    word |= 1 << next;
                    next_metrics[next] = c1;
                } else {
                    next_metrics[next] = c0;
                }
            }
            decisions.push(word);
            metrics.copy_from_slice(&next_metrics);
        }

        // Tail bits drive the encoder back to state 0
        let mut state = 0usize;
        for step in (0..nbits).rev() {
            out.set(step, state & 1 == 1);
            let high = decisions[step] >> state & 1;
            state = (state >> 1) | (high as usize) << 5;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convcode::{self, SOFTBIT_0, SOFTBIT_1};
    use crate::ratetab::CodingRate;

    fn test_pattern(nbits: usize) -> BitVec<u8, Msb0> {
        let mut data = bitvec![u8, Msb0; 0; nbits];
        for i in 0..nbits.saturating_sub(6) {
            // deterministic pseudo-random payload, zero tail
            data.set(i, (i * 37 + i * i * 11) % 5 < 2);
        }
        data
    }

    fn loopback(coding: CodingRate, nbits: usize, corrupt: impl Fn(&mut [u8])) {
        let data = test_pattern(nbits);
        let coded = convcode::encode(coding, &data);
        let mut soft = convcode::to_soft(&coded);
        corrupt(&mut soft);
        let soft = convcode::depuncture(coding, &soft);

        let mut decoded = bitvec![u8, Msb0; 0; nbits];
        SoftViterbi.decode(&soft, &mut decoded);
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_clean_rate_half() {
        loopback(CodingRate::R1_2, 96, |_| {});
    }

    #[test]
    fn test_clean_punctured() {
        // 288 mother bits divide into whole blocks of both matrices
        loopback(CodingRate::R2_3, 144, |_| {});
        loopback(CodingRate::R3_4, 144, |_| {});
    }

    #[test]
    fn test_corrects_hard_errors() {
        loopback(CodingRate::R1_2, 96, |soft| {
            // isolated flips well inside the free distance
            for &i in &[10, 40, 90, 150] {
                soft[i] = 255 - soft[i];
            }
        });
    }

    #[test]
    fn test_corrects_erasures_and_noise() {
        loopback(CodingRate::R1_2, 96, |soft| {
            for &i in &[5, 6, 70, 130] {
                soft[i] = 127;
            }
            for s in soft.iter_mut() {
                // pull every value 25% of the way toward the midpoint
                *s = if *s == SOFTBIT_1 { 192 } else if *s == SOFTBIT_0 { 63 } else { *s };
            }
        });
    }

    #[test]
    fn test_all_zero_input() {
        let soft = vec![SOFTBIT_0; 48];
        let mut decoded = bitvec![u8, Msb0; 1; 24];
        SoftViterbi.decode(&soft, &mut decoded);
        assert!(decoded.not_any());
    }
}
