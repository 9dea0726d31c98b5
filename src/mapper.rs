//! OFDM subcarrier grid: data order, pilots, nulls
//!
//! The 64-bin frequency grid in FFT index order: positive subcarriers
//! 1..26 occupy bins 1..26, negative subcarriers −26..−1 occupy bins
//! 38..63. Bin 0 (DC) and the guard bins 27..37 are never driven. Pilots
//! ride at subcarriers ±21 and ±7 with the fixed pattern {+1, +1, +1, −1}
//! times the per-symbol polarity bit.
//!
//! Data symbols fill the grid in the order +1..+26 then −26..−1, skipping
//! the pilot bins; the demapper reads them back in the same order.

use rustfft::num_complex::Complex32;
use once_cell::sync::Lazy;

/// Subcarrier classification by FFT bin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinClass {
    Null,
    Pilot,
    Data,
}

/// Pilot FFT bins for subcarriers −21, −7, +7, +21
pub const PILOT_BINS: [usize; 4] = [43, 57, 7, 21];

/// Fixed pilot pattern matching `PILOT_BINS` order
pub const PILOT_PATTERN: [f32; 4] = [1.0, 1.0, 1.0, -1.0];

/// Number of data-bearing bins
pub const NUM_DATA_BINS: usize = 48;

/// Classify an FFT bin
pub fn bin_class(bin: usize) -> BinClass {
    debug_assert!(bin < 64);
    match bin {
        0 | 27..=37 => BinClass::Null,
        b if PILOT_BINS.contains(&b) => BinClass::Pilot,
        _ => BinClass::Data,
    }
}

/// Data bins in fill order: +1..+26 then −26..−1, pilots skipped
pub static DATA_BINS: Lazy<[usize; NUM_DATA_BINS]> = Lazy::new(|| {
    let mut bins = [0usize; NUM_DATA_BINS];
    let mut n = 0;
    for bin in (1..=26).chain(38..=63) {
        if bin_class(bin) == BinClass::Data {
            bins[n] = bin;
            n += 1;
        }
    }
    debug_assert_eq!(n, NUM_DATA_BINS);
    bins
});

/// Write 48 data points plus pilots and nulls into a frequency grid
pub fn pack_symbol(points: &[Complex32; NUM_DATA_BINS], polarity: f32, grid: &mut [Complex32; 64]) {
    grid.fill(Complex32::new(0.0, 0.0));
    for (&bin, &p) in DATA_BINS.iter().zip(points.iter()) {
        grid[bin] = p;
    }
    for (&bin, &sign) in PILOT_BINS.iter().zip(PILOT_PATTERN.iter()) {
        grid[bin] = Complex32::new(sign * polarity, 0.0);
    }
}

/// Read the 48 data bins of a received grid in fill order
pub fn extract_symbol(grid: &[Complex32; 64]) -> [Complex32; NUM_DATA_BINS] {
    let mut points = [Complex32::new(0.0, 0.0); NUM_DATA_BINS];
    for (&bin, out) in DATA_BINS.iter().zip(points.iter_mut()) {
        *out = grid[bin];
    }
    points
}

/// Expected pilot values for a symbol with the given polarity bit
pub fn expected_pilots(polarity: f32) -> [Complex32; 4] {
    let mut out = [Complex32::new(0.0, 0.0); 4];
    for (o, &sign) in out.iter_mut().zip(PILOT_PATTERN.iter()) {
        *o = Complex32::new(sign * polarity, 0.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_census() {
        let mut nulls = 0;
        let mut pilots = 0;
        let mut data = 0;
        for bin in 0..64 {
            match bin_class(bin) {
                BinClass::Null => nulls += 1,
                BinClass::Pilot => pilots += 1,
                BinClass::Data => data += 1,
            }
        }
        assert_eq!((nulls, pilots, data), (12, 4, 48));
    }

    #[test]
    fn test_data_bin_order() {
        // positive subcarriers first, negative second, pilots absent
        assert_eq!(DATA_BINS[0], 1);
        assert_eq!(DATA_BINS[5], 6);
        assert_eq!(DATA_BINS[6], 8); // bin 7 is a pilot
        assert_eq!(DATA_BINS[23], 26);
        assert_eq!(DATA_BINS[24], 38); // subcarrier −26
        assert_eq!(DATA_BINS[47], 63); // subcarrier −1
        for &b in DATA_BINS.iter() {
            assert_eq!(bin_class(b), BinClass::Data);
        }
    }

    #[test]
    fn test_pack_extract_roundtrip() {
        let mut points = [Complex32::new(0.0, 0.0); NUM_DATA_BINS];
        for (i, p) in points.iter_mut().enumerate() {
            *p = Complex32::new(i as f32, -(i as f32) * 0.5);
        }
        let mut grid = [Complex32::new(9.0, 9.0); 64];
        pack_symbol(&points, -1.0, &mut grid);

        assert_eq!(extract_symbol(&grid), points);
        assert_eq!(grid[0], Complex32::new(0.0, 0.0));
        for bin in 27..=37 {
            assert_eq!(grid[bin], Complex32::new(0.0, 0.0), "guard bin {bin}");
        }
        // polarity −1 flips the pattern
        assert_eq!(grid[43], Complex32::new(-1.0, 0.0));
        assert_eq!(grid[21], Complex32::new(1.0, 0.0));
    }
}
