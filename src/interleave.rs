//! Block interleaver for one OFDM symbol
//!
//! Two permutations from §17.3.5.7 of the standard: the first spreads
//! adjacent coded bits onto nonadjacent subcarriers, the second alternates
//! them between significant and less significant constellation bits.
//!
//! Each N_CBPS/N_BPSC combination is materialized once into a table of
//! byte-index/bit-mask entries (the form the hard-bit transmit path walks)
//! plus the flat index permutation the soft receive path uses. Tables are
//! shared process-wide.

use crate::ratetab::{RateParams, RATE_TABLE};
use bitvec::prelude::*;
use once_cell::sync::Lazy;

/// One bit move: source position (byte, mask) to destination (byte, mask)
#[derive(Debug, Clone, Copy)]
pub struct InterleaverEntry {
    pub src_byte: u8,
    pub dst_byte: u8,
    pub src_mask: u8,
    pub dst_mask: u8,
}

/// Interleaver permutation for one (N_CBPS, N_BPSC) pair
#[derive(Debug)]
pub struct InterleaverTable {
    pub ncbps: usize,
    pub nbpsc: usize,
    /// Entry k moves input bit k to output bit `forward[k]`
    pub entries: Vec<InterleaverEntry>,
    forward: Vec<u16>,
}

/// Output position of input bit `k` (transmit direction)
pub fn permute(ncbps: usize, nbpsc: usize, k: usize) -> usize {
    let s = (nbpsc / 2).max(1);
    let i = (ncbps / 16) * (k % 16) + k / 16;
    s * (i / s) + (i + ncbps - 16 * i / ncbps) % s
}

/// Input position of output bit `j` (receive direction)
pub fn permute_inverse(ncbps: usize, nbpsc: usize, j: usize) -> usize {
    let s = (nbpsc / 2).max(1);
    let i = s * (j / s) + (j + 16 * j / ncbps) % s;
    16 * i - (ncbps - 1) * (16 * i / ncbps)
}

impl InterleaverTable {
    fn build(ncbps: usize, nbpsc: usize) -> Self {
        let forward: Vec<u16> = (0..ncbps).map(|k| permute(ncbps, nbpsc, k) as u16).collect();
        let entries = forward
            .iter()
            .enumerate()
            .map(|(k, &j)| InterleaverEntry {
                src_byte: (k / 8) as u8,
                dst_byte: (j / 8) as u8,
                src_mask: 0x80 >> (k % 8),
                dst_mask: 0x80 >> (j as usize % 8),
            })
            .collect();
        InterleaverTable { ncbps, nbpsc, entries, forward }
    }

    /// Interleave one symbol of hard bits (packed MSB-first)
    pub fn interleave(&self, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len() * 8, self.ncbps);
        debug_assert_eq!(output.len() * 8, self.ncbps);
        output.fill(0);
        for e in &self.entries {
            if input[e.src_byte as usize] & e.src_mask != 0 {
                output[e.dst_byte as usize] |= e.dst_mask;
            }
        }
    }

    /// De-interleave one symbol of hard bits (packed MSB-first)
    pub fn deinterleave(&self, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len() * 8, self.ncbps);
        debug_assert_eq!(output.len() * 8, self.ncbps);
        output.fill(0);
        for e in &self.entries {
            if input[e.dst_byte as usize] & e.dst_mask != 0 {
                output[e.src_byte as usize] |= e.src_mask;
            }
        }
    }

    /// Interleave one symbol from a bit slice into a bit slice
    pub fn interleave_bits(&self, input: &BitSlice<u8, Msb0>, output: &mut BitSlice<u8, Msb0>) {
        debug_assert_eq!(input.len(), self.ncbps);
        debug_assert_eq!(output.len(), self.ncbps);
        for (k, &j) in self.forward.iter().enumerate() {
            output.set(j as usize, input[k]);
        }
    }

    /// De-interleave one symbol of soft values
    pub fn deinterleave_soft(&self, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len(), self.ncbps);
        debug_assert_eq!(output.len(), self.ncbps);
        for (k, &j) in self.forward.iter().enumerate() {
            output[k] = input[j as usize];
        }
    }
}

/// The four distinct tables: N_CBPS 48, 96, 192, 288
static TABLES: Lazy<[InterleaverTable; 4]> = Lazy::new(|| {
    [
        InterleaverTable::build(48, 1),
        InterleaverTable::build(96, 2),
        InterleaverTable::build(192, 4),
        InterleaverTable::build(288, 6),
    ]
});

/// Shared interleaver table for a rate-table row
pub fn table_for(rate: &RateParams) -> &'static InterleaverTable {
    TABLES
        .iter()
        .find(|t| t.ncbps == rate.ncbps)
        .expect("every rate-table row has an interleaver table")
}

/// The SIGNAL symbol always interleaves as 48-bit BPSK
pub fn signal_table() -> &'static InterleaverTable {
    &TABLES[0]
}
