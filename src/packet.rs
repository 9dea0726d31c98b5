//! DATA field packet codec
//!
//! Assembles SERVICE + PSDU + tail + pad into the N_DATA-bit blob,
//! scrambles it (forcing the tail back to zero so the encoder terminates),
//! and runs the punctured convolutional code. The inverse runs after the
//! Viterbi stage: descramble with the seed recovered from the SERVICE
//! field, then strip everything but the payload.
//!
//! N_DATA is not always a whole number of bytes (9 Mbit/s makes 36-bit
//! symbols), so the decoded side stays a bit vector throughout.

use crate::convcode;
use crate::error::PhyError;
use crate::ratetab::{self, RateParams};
use crate::scramble;
use crate::viterbi::ConvDecoder;
use bitvec::prelude::*;

/// SERVICE bits preceding the PSDU
pub const SERVICE_BITS: usize = 16;
/// Encoder tail bits following the PSDU
pub const TAIL_BITS: usize = 6;

/// Symbol and padding arithmetic for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketParams {
    pub rate: usize,
    pub length: usize,
    /// OFDM symbols in the DATA field
    pub nsym: usize,
    /// Bits in the DATA field (nsym · ndbps)
    pub ndata: usize,
    /// Zero pad bits after the tail
    pub npad: usize,
}

impl PacketParams {
    pub fn compute(rate: usize, length: usize) -> Result<Self, PhyError> {
        let params = ratetab::rate_params(rate)?;
        if length == 0 || length > 4095 {
            return Err(PhyError::InvalidLength { length });
        }
        let payload_bits = SERVICE_BITS + 8 * length + TAIL_BITS;
        let nsym = payload_bits.div_ceil(params.ndbps);
        let ndata = nsym * params.ndbps;
        Ok(PacketParams {
            rate,
            length,
            nsym,
            ndata,
            npad: ndata - payload_bits,
        })
    }

    pub fn rate_params(&self) -> &'static RateParams {
        &ratetab::RATE_TABLE[self.rate]
    }

    /// Coded DATA bits across the whole frame (nsym · ncbps)
    pub fn encoded_bits(&self) -> usize {
        self.nsym * self.rate_params().ncbps
    }
}

/// Assemble and scramble the decoded-side blob: N_DATA bits
pub fn assemble(params: &PacketParams, seed: u8, payload: &[u8]) -> Result<BitVec<u8, Msb0>, PhyError> {
    debug_assert_eq!(payload.len(), params.length);
    let mut bits = BitVec::with_capacity(params.ndata);
    bits.resize(SERVICE_BITS, false);
    for &byte in payload {
        bits.extend_from_bitslice([byte].view_bits::<Msb0>());
    }
    bits.resize(params.ndata, false);

    scramble::scramble(seed, &mut bits)?;
    // the tail must stay zero after scrambling so the decoder's trellis
    // terminates in the all-zero state
    let tail_at = SERVICE_BITS + 8 * params.length;
    for i in tail_at..tail_at + TAIL_BITS {
        bits.set(i, false);
    }
    Ok(bits)
}

/// Full transmit-side bit pipeline: assemble, scramble, encode, puncture
///
/// The result is `encoded_bits()` long and feeds the per-symbol
/// interleaver.
pub fn encode(rate: usize, seed: u8, payload: &[u8]) -> Result<(PacketParams, BitVec<u8, Msb0>), PhyError> {
    let params = PacketParams::compute(rate, payload.len())?;
    let assembled = assemble(&params, seed, payload)?;
    let coded = convcode::encode(params.rate_params().coding, &assembled);
    debug_assert_eq!(coded.len(), params.encoded_bits());
    Ok((params, coded))
}

/// Receive-side result of `decode`
#[derive(Debug, Clone)]
pub struct DecodedPacket {
    pub payload: Vec<u8>,
    /// Scrambler seed recovered from the SERVICE field
    pub seed: u8,
    /// All 9 reserved SERVICE bits descrambled to zero
    pub service_ok: bool,
}

/// Full receive-side bit pipeline from de-interleaved soft values
///
/// `soft` holds `encoded_bits()` values; depuncture, Viterbi-decode,
/// descramble, and strip SERVICE/tail/pad.
pub fn decode(params: &PacketParams, soft: &[u8], decoder: &dyn ConvDecoder) -> DecodedPacket {
    debug_assert_eq!(soft.len(), params.encoded_bits());
    let mother = convcode::depuncture(params.rate_params().coding, soft);
    debug_assert_eq!(mother.len(), 2 * params.ndata);

    let mut bits = bitvec![u8, Msb0; 0; params.ndata];
    decoder.decode(&mother, &mut bits);

    let seed = scramble::descramble_from_service(&mut bits);
    let service_ok = !bits[7..SERVICE_BITS].any();

    let payload_bits = &bits[SERVICE_BITS..SERVICE_BITS + 8 * params.length];
    let mut payload = vec![0u8; params.length];
    payload.view_bits_mut::<Msb0>().copy_from_bitslice(payload_bits);

    DecodedPacket { payload, seed, service_ok }
}
