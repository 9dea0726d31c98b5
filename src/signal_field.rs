//! SIGNAL field: 24-bit PLCP header
//!
//! Wire layout, transmitted MSB-first:
//! bits 0..3 rate nibble (Table 80), bit 4 reserved zero, bits 5..16 LENGTH
//! (LSB first), bit 17 even parity over bits 0..16, bits 18..23 zero tail.
//!
//! The field is always protected by the unpunctured r1/2 code and sent as
//! one BPSK symbol, regardless of the DATA rate.

use crate::convcode;
use crate::error::PhyError;
use crate::ratetab::{self, CodingRate};
use crate::viterbi::ConvDecoder;
use bitvec::prelude::*;
use tracing::trace;

/// Decoded SIGNAL contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalField {
    /// Rate-table index
    pub rate: usize,
    /// PSDU length in bytes, 1..=4095
    pub length: usize,
}

/// Pack rate and length into the 3-byte SIGNAL field
pub fn pack(rate: usize, length: usize) -> Result<[u8; 3], PhyError> {
    let params = ratetab::rate_params(rate)?;
    if length == 0 || length > 4095 {
        return Err(PhyError::InvalidLength { length });
    }

    let mut out = [0u8; 3];
    let bits = out.view_bits_mut::<Msb0>();
    for i in 0..4 {
        bits.set(i, params.signal_nibble & (0x08 >> i) != 0);
    }
    // bit 4 reserved, zero
    for i in 0..12 {
        bits.set(5 + i, length & (1 << i) != 0);
    }
    let parity = bits[..17].count_ones() & 1 == 1;
    bits.set(17, parity);
    // bits 18..24 tail, zero
    Ok(out)
}

/// Unpack and validate a decoded 3-byte SIGNAL field
///
/// `None` means the frame must be abandoned: bad parity, reserved bit set,
/// unknown rate nibble, or zero length.
pub fn unpack(signal: &[u8; 3]) -> Option<SignalField> {
    let bits = signal.view_bits::<Msb0>();
    if bits[..18].count_ones() & 1 != 0 {
        trace!("SIGNAL parity check failed");
        return None;
    }
    if bits[4] {
        trace!("SIGNAL reserved bit set");
        return None;
    }
    if bits[18..24].any() {
        trace!("SIGNAL tail bits nonzero");
        return None;
    }
    let mut nibble = 0u8;
    for i in 0..4 {
        nibble |= (bits[i] as u8) << (3 - i);
    }
    let rate = match ratetab::rate_from_nibble(nibble) {
        Some(rate) => rate,
        None => {
            trace!(nibble, "SIGNAL rate nibble invalid");
            return None;
        }
    };
    let mut length = 0usize;
    for i in 0..12 {
        length |= (bits[5 + i] as usize) << i;
    }
    if length == 0 {
        trace!("SIGNAL length zero");
        return None;
    }
    Some(SignalField { rate, length })
}

/// Encode the SIGNAL field with the unpunctured r1/2 code: 24 → 48 bits
pub fn encode(signal: &[u8; 3]) -> [u8; 6] {
    let coded = convcode::encode(CodingRate::R1_2, signal.view_bits::<Msb0>());
    let mut out = [0u8; 6];
    out.copy_from_slice(coded.as_raw_slice());
    out
}

/// Decode 48 de-interleaved soft values back to the 3-byte SIGNAL field
pub fn decode(soft: &[u8; 48], decoder: &dyn ConvDecoder) -> [u8; 3] {
    let mut out = [0u8; 3];
    decoder.decode(soft, out.view_bits_mut::<Msb0>());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convcode::SOFTBIT_ERASURE;
    use crate::viterbi::SoftViterbi;

    /// Map a coded SIGNAL field to soft values, erasing chosen positions
    fn soft_with_erasures(coded: &[u8; 6], erased: &[usize]) -> [u8; 48] {
        let mut soft = [0u8; 48];
        for (i, bit) in coded.view_bits::<Msb0>().iter().by_vals().enumerate() {
            soft[i] = if bit { 255 } else { 0 };
        }
        for &i in erased {
            soft[i] = SOFTBIT_ERASURE;
        }
        soft
    }

    #[test]
    fn test_annex_g_field() {
        // 36 Mbit/s, LENGTH = 100: 1011 0 001001100000 0 000000
        let packed = pack(5, 100).unwrap();
        let expected = [
            1, 0, 1, 1, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let bits = packed.view_bits::<Msb0>();
        for (i, &e) in expected.iter().enumerate() {
            assert_eq!(bits[i] as u8, e, "SIGNAL bit {i}");
        }
        assert_eq!(packed, [0xb1, 0x30, 0x00]);
    }

    #[test]
    fn test_annex_g_encoded_field() {
        let coded = encode(&pack(5, 100).unwrap());
        assert_eq!(coded, [0xd1, 0xa1, 0x02, 0x3e, 0x70, 0x00]);
    }

    #[test]
    fn test_parity_is_even() {
        // parity bit equals XOR of bits 0..=16 for every rate and length
        for rate in 0..8 {
            for length in [1usize, 77, 2048, 4095] {
                let packed = pack(rate, length).unwrap();
                let bits = packed.view_bits::<Msb0>();
                let xor = bits[..17].count_ones() & 1 == 1;
                assert_eq!(bits[17], xor);
                assert_eq!(
                    unpack(&packed),
                    Some(SignalField { rate, length }),
                    "rate {rate} length {length}"
                );
            }
        }
    }

    #[test]
    fn test_rejects_corruption() {
        let good = pack(3, 1200).unwrap();

        // single bit flip breaks parity
        for i in 0..18 {
            let mut bad = good;
            let bits = bad.view_bits_mut::<Msb0>();
            let v = bits[i];
            bits.set(i, !v);
            assert_eq!(unpack(&bad), None, "flip of bit {i} accepted");
        }

        // zero length
        let mut zero_len = pack(0, 1).unwrap();
        {
            let bits = zero_len.view_bits_mut::<Msb0>();
            let v5 = bits[5];
            let v17 = bits[17];
            bits.set(5, !v5);
            bits.set(17, !v17); // keep parity consistent
        }
        assert_eq!(unpack(&zero_len), None);
    }

    #[test]
    fn test_pack_validation() {
        assert!(pack(8, 100).is_err());
        assert!(pack(0, 0).is_err());
        assert!(pack(0, 4096).is_err());
    }

    #[test]
    fn test_fec_roundtrip_with_erasures() {
        let packed = pack(6, 333).unwrap();
        let coded = encode(&packed);
        let soft = soft_with_erasures(&coded, &[2, 17, 30]);
        let decoded = decode(&soft, &SoftViterbi);
        assert_eq!(decoded, packed);
        assert_eq!(unpack(&decoded), Some(SignalField { rate: 6, length: 333 }));
    }
}
