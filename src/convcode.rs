//! Convolutional mother code and puncturing
//!
//! The r1/2, K=7 industry-standard code with generators 0x6d/0x4f (the
//! shift-left form of 133/171 octal). Higher rates puncture the mother
//! stream: r2/3 keeps 9 of every 12 output bits, r3/4 keeps 12 of 18.
//! Depuncturing reinserts erasure soft values at the discarded positions
//! ahead of the Viterbi decoder.

use crate::ratetab::CodingRate;
use bitvec::prelude::*;

/// Generator polynomial for output bit A (133 octal, reversed)
pub const GENPOLY_A: u8 = 0x6d;
/// Generator polynomial for output bit B (171 octal, reversed)
pub const GENPOLY_B: u8 = 0x4f;

/// Erasure code point of the 8-bit soft-decision alphabet
pub const SOFTBIT_ERASURE: u8 = 127;
/// Hard one of the 8-bit soft-decision alphabet
pub const SOFTBIT_1: u8 = 255;
/// Hard zero of the 8-bit soft-decision alphabet
pub const SOFTBIT_0: u8 = 0;

/// Puncturing pattern: flags for the A row then the B row of the 2×P matrix
#[derive(Debug, Clone, Copy)]
pub struct PunctureMatrix {
    pub period: usize,
    flags: &'static [u8],
}

/// r2/3: B₂, B₄, B₆ of each 6-pair block are discarded
pub const PUNCTURE_R2_3: PunctureMatrix = PunctureMatrix {
    period: 6,
    flags: &[
        1, 1, 1, 1, 1, 1, //
        1, 0, 1, 0, 1, 0,
    ],
};

/// r3/4: B₂ and A₃ of each 3-pair group are discarded
pub const PUNCTURE_R3_4: PunctureMatrix = PunctureMatrix {
    period: 9,
    flags: &[
        1, 1, 0, 1, 1, 0, 1, 1, 0, //
        1, 0, 1, 1, 0, 1, 1, 0, 1,
    ],
};

impl PunctureMatrix {
    /// Is mother-stream position `pos` transmitted?
    ///
    /// Even positions are A outputs, odd are B; the column cycles with the
    /// matrix period.
    #[inline]
    pub fn keep(&self, pos: usize) -> bool {
        let row = pos & 1;
        let col = (pos / 2) % self.period;
        self.flags[row * self.period + col] != 0
    }

    /// Transmitted bits per 2·period mother bits
    pub fn kept_per_block(&self) -> usize {
        self.flags.iter().filter(|&&f| f != 0).count()
    }
}

/// Puncture matrix for a coding rate, if any
pub fn puncture_matrix(coding: CodingRate) -> Option<&'static PunctureMatrix> {
    match coding {
        CodingRate::R1_2 => None,
        CodingRate::R2_3 => Some(&PUNCTURE_R2_3),
        CodingRate::R3_4 => Some(&PUNCTURE_R3_4),
    }
}

/// Number of coded bits produced for `nbits` data bits at `coding`
pub fn coded_len(coding: CodingRate, nbits: usize) -> usize {
    match puncture_matrix(coding) {
        None => 2 * nbits,
        Some(pm) => {
            debug_assert_eq!(2 * nbits % (2 * pm.period), 0);
            2 * nbits / (2 * pm.period) * pm.kept_per_block()
        }
    }
}

/// r1/2 mother encoder state
#[derive(Debug, Clone, Default)]
pub struct ConvEncoder {
    reg: u8,
}

impl ConvEncoder {
    pub fn new() -> Self {
        ConvEncoder { reg: 0 }
    }

    /// Shift in one data bit, producing output bits A then B
    #[inline]
    pub fn push(&mut self, bit: bool) -> (bool, bool) {
        self.reg = ((self.reg << 1) | bit as u8) & 0x7f;
        let a = (self.reg & GENPOLY_A).count_ones() & 1 == 1;
        let b = (self.reg & GENPOLY_B).count_ones() & 1 == 1;
        (a, b)
    }
}

/// Encode a data bit stream at the given coding rate
///
/// The caller is responsible for the six zero tail bits that return the
/// encoder to the all-zero state. Punctured output lengths require the
/// mother stream to divide evenly into matrix blocks, which every
/// rate-table combination guarantees.
pub fn encode(coding: CodingRate, data: &BitSlice<u8, Msb0>) -> BitVec<u8, Msb0> {
    let pm = puncture_matrix(coding);
    let mut out = BitVec::with_capacity(coded_len(coding, data.len()));
    let mut enc = ConvEncoder::new();
    let mut pos = 0usize;
    for bit in data.iter().by_vals() {
        let (a, b) = enc.push(bit);
        for o in [a, b] {
            if pm.map_or(true, |m| m.keep(pos)) {
                out.push(o);
            }
            pos += 1;
        }
    }
    out
}

/// Expand a received soft stream back to mother-rate positions
///
/// Discarded positions come back as erasures; kept positions copy through.
pub fn depuncture(coding: CodingRate, soft: &[u8]) -> Vec<u8> {
    let Some(pm) = puncture_matrix(coding) else {
        return soft.to_vec();
    };
    let block = 2 * pm.period;
    let kept = pm.kept_per_block();
    debug_assert_eq!(soft.len() % kept, 0);
    let mut out = Vec::with_capacity(soft.len() / kept * block);
    let mut it = soft.iter();
    while it.len() > 0 {
        for pos in 0..block {
            if pm.keep(pos) {
                out.push(*it.next().expect("soft stream truncated mid-block"));
            } else {
                out.push(SOFTBIT_ERASURE);
            }
        }
    }
    out
}

/// Map a hard bit stream to the soft alphabet (test and SIGNAL plumbing)
pub fn to_soft(bits: &BitSlice<u8, Msb0>) -> Vec<u8> {
    bits.iter()
        .by_vals()
        .map(|b| if b { SOFTBIT_1 } else { SOFTBIT_0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_counts() {
        assert_eq!(PUNCTURE_R2_3.kept_per_block(), 9);
        assert_eq!(PUNCTURE_R3_4.kept_per_block(), 12);
    }

    #[test]
    fn test_standard_puncture_pattern() {
        // r2/3 figure: A1 B1 A2 (B2 dropped), repeating every two pairs
        let dropped: Vec<usize> = (0..12).filter(|&p| !PUNCTURE_R2_3.keep(p)).collect();
        assert_eq!(dropped, vec![3, 7, 11]);
        // r3/4 figure: A1 B1 A2 B3 (B2 and A3 dropped), every three pairs
        let dropped: Vec<usize> = (0..18).filter(|&p| !PUNCTURE_R3_4.keep(p)).collect();
        assert_eq!(dropped, vec![3, 4, 9, 10, 15, 16]);
    }

    #[test]
    fn test_coded_len_matches_rate_table() {
        use crate::ratetab::RATE_TABLE;
        for r in &RATE_TABLE {
            assert_eq!(coded_len(r.coding, r.ndbps), r.ncbps, "{} Mbit/s", r.rate_mbps);
        }
    }

    #[test]
    fn test_mother_encode_impulse() {
        // A single 1 followed by flush zeros reads out both generators
        let mut data = bitvec![u8, Msb0; 0; 8];
        data.set(0, true);
        let out = encode(CodingRate::R1_2, &data);
        assert_eq!(out.len(), 16);
        // A outputs are the taps of 0x6d, B outputs the taps of 0x4f
        let a: Vec<bool> = out.iter().by_vals().step_by(2).collect();
        let b: Vec<bool> = out.iter().by_vals().skip(1).step_by(2).collect();
        // the impulse marches from register bit 0 up to bit 6
        let taps = |poly: u8| (0..7).map(|i| poly & (1 << i) != 0).collect::<Vec<_>>();
        assert_eq!(&a[..7], &taps(GENPOLY_A)[..]);
        assert_eq!(&b[..7], &taps(GENPOLY_B)[..]);
    }

    #[test]
    fn test_depuncture_positions() {
        // 18 data bits: the 36-bit mother stream divides into whole
        // blocks of both matrices
        let data = bitvec![u8, Msb0; 1, 0, 1, 1, 0, 0, 1, 0, 1, 0, 1, 1, 1, 0, 0, 1, 0, 0];
        for coding in [CodingRate::R2_3, CodingRate::R3_4] {
            let mother = encode(CodingRate::R1_2, &data);
            let sent = encode(coding, &data);
            let soft = depuncture(coding, &to_soft(&sent));
            assert_eq!(soft.len(), mother.len());
            let pm = puncture_matrix(coding).unwrap();
            for (pos, (&s, m)) in soft.iter().zip(mother.iter().by_vals()).enumerate() {
                if pm.keep(pos) {
                    assert_eq!(s, if m { SOFTBIT_1 } else { SOFTBIT_0 }, "position {pos}");
                } else {
                    assert_eq!(s, SOFTBIT_ERASURE, "position {pos}");
                }
            }
        }
    }
}
