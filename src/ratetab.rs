//! Rate-dependent parameters for the eight 802.11a/g data rates
//!
//! One row per rate (Table 78 of the standard): modulation depth, coding
//! rate, and the derived bits-per-symbol counts. The 4-bit SIGNAL rate
//! encoding (Table 80) rides along in each row.

use crate::error::PhyError;

/// Subcarrier modulation scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Bpsk,
    Qpsk,
    Qam16,
    Qam64,
}

/// Convolutional coding rate after puncturing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingRate {
    R1_2,
    R2_3,
    R3_4,
}

/// One row of the rate table
#[derive(Debug, Clone, Copy)]
pub struct RateParams {
    /// Primitive data rate in Mbit/s
    pub rate_mbps: u32,
    pub modulation: Modulation,
    pub coding: CodingRate,
    /// Coded bits per subcarrier (modulation depth)
    pub nbpsc: usize,
    /// Coded bits per OFDM symbol
    pub ncbps: usize,
    /// Data bits per OFDM symbol
    pub ndbps: usize,
    /// R1..R4 rate field of the SIGNAL symbol (Table 80)
    pub signal_nibble: u8,
}

/// Number of data subcarriers per OFDM symbol
pub const NUM_DATA_CARRIERS: usize = 48;

/// Rate table indexed 0..=7 for 6..54 Mbit/s
pub const RATE_TABLE: [RateParams; 8] = [
    RateParams { rate_mbps: 6,  modulation: Modulation::Bpsk,  coding: CodingRate::R1_2, nbpsc: 1, ncbps: 48,  ndbps: 24,  signal_nibble: 0b1101 },
    RateParams { rate_mbps: 9,  modulation: Modulation::Bpsk,  coding: CodingRate::R3_4, nbpsc: 1, ncbps: 48,  ndbps: 36,  signal_nibble: 0b1111 },
    RateParams { rate_mbps: 12, modulation: Modulation::Qpsk,  coding: CodingRate::R1_2, nbpsc: 2, ncbps: 96,  ndbps: 48,  signal_nibble: 0b0101 },
    RateParams { rate_mbps: 18, modulation: Modulation::Qpsk,  coding: CodingRate::R3_4, nbpsc: 2, ncbps: 96,  ndbps: 72,  signal_nibble: 0b0111 },
    RateParams { rate_mbps: 24, modulation: Modulation::Qam16, coding: CodingRate::R1_2, nbpsc: 4, ncbps: 192, ndbps: 96,  signal_nibble: 0b1001 },
    RateParams { rate_mbps: 36, modulation: Modulation::Qam16, coding: CodingRate::R3_4, nbpsc: 4, ncbps: 192, ndbps: 144, signal_nibble: 0b1011 },
    RateParams { rate_mbps: 48, modulation: Modulation::Qam64, coding: CodingRate::R2_3, nbpsc: 6, ncbps: 288, ndbps: 192, signal_nibble: 0b0001 },
    RateParams { rate_mbps: 54, modulation: Modulation::Qam64, coding: CodingRate::R3_4, nbpsc: 6, ncbps: 288, ndbps: 216, signal_nibble: 0b0011 },
];

/// Look up rate parameters, rejecting out-of-range indices
pub fn rate_params(rate: usize) -> Result<&'static RateParams, PhyError> {
    RATE_TABLE.get(rate).ok_or(PhyError::InvalidRate { rate })
}

/// Map a received SIGNAL rate nibble back to a rate index
pub fn rate_from_nibble(nibble: u8) -> Option<usize> {
    RATE_TABLE.iter().position(|r| r.signal_nibble == nibble)
}
