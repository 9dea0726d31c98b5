//! DATA field scrambler (x⁷ + x⁴ + 1)
//!
//! A 7-bit linear-feedback shift register generates the scrambling stream;
//! each output bit is XORed with the message, MSB first within each byte.
//! Scrambling and descrambling are the same operation.
//!
//! The transmitter's seed travels covertly in the SERVICE field: the first
//! 7 SERVICE bits are zero before scrambling, so the receiver reads the
//! generator output directly off the wire and reconstructs the register.

use crate::error::PhyError;
use bitvec::prelude::*;

/// Scrambling-sequence generator state
#[derive(Debug, Clone)]
pub struct Scrambler {
    state: u8,
}

impl Scrambler {
    /// Create a generator from a nonzero 7-bit seed
    pub fn new(seed: u8) -> Result<Self, PhyError> {
        if seed == 0 || seed > 0x7f {
            return Err(PhyError::InvalidSeed { seed });
        }
        Ok(Scrambler { state: seed })
    }

    /// Produce the next bit of the scrambling sequence
    ///
    /// Output is bit6 XOR bit3 of the register; the register shifts left
    /// with the output fed back into position 0.
    pub fn next_bit(&mut self) -> u8 {
        let out = ((self.state >> 6) ^ (self.state >> 3)) & 1;
        self.state = ((self.state << 1) | out) & 0x7f;
        out
    }

    /// XOR the generator output over a bit slice in place
    pub fn apply(&mut self, bits: &mut BitSlice<u8, Msb0>) {
        for mut bit in bits.iter_mut() {
            *bit ^= self.next_bit() != 0;
        }
    }
}

/// Scramble (or descramble) `bits` in place with the given seed
pub fn scramble(seed: u8, bits: &mut BitSlice<u8, Msb0>) -> Result<(), PhyError> {
    Scrambler::new(seed)?.apply(bits);
    Ok(())
}

/// Step the register backwards: recover the state that produced `state`
fn unstep(state: u8) -> u8 {
    // The inserted bit b0 was output = bit6(prev) ^ bit3(prev), and
    // bit3(prev) is bit4 of the current register.
    let b6 = (state ^ (state >> 4)) & 1;
    (state >> 1) | (b6 << 6)
}

/// Recover the transmitter's seed from the first 7 scrambled SERVICE bits
///
/// The SERVICE field is zero before scrambling, so those bits are the raw
/// generator output; after 7 shifts the register holds exactly them
/// (earliest bit in position 6). Seven backward steps give the seed.
pub fn recover_seed(service: &BitSlice<u8, Msb0>) -> u8 {
    debug_assert!(service.len() >= 7);
    let mut state = 0u8;
    for i in 0..7 {
        state = (state << 1) | service[i] as u8;
    }
    for _ in 0..7 {
        state = unstep(state);
    }
    state
}

/// Descramble a DATA bit stream whose seed is unknown
///
/// Reconstructs the generator from the first 7 bits, descrambles the rest,
/// zeroes the 7 seed-scratch bits, and returns the recovered seed.
pub fn descramble_from_service(bits: &mut BitSlice<u8, Msb0>) -> u8 {
    debug_assert!(bits.len() >= 16);
    let seed = recover_seed(bits);
    let mut state = 0u8;
    for i in 0..7 {
        state = (state << 1) | bits[i] as u8;
        bits.set(i, false);
    }
    let mut gen = Scrambler { state };
    gen.apply(&mut bits[7..]);
    seed
}
