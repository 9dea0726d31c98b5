use snafu::Snafu;

/// Configuration errors surfaced at construct/encode time.
///
/// The sample-processing path never fails; bad frames are dropped or
/// delivered with `valid = false` instead.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum PhyError {
    /// Rate index outside the 8-entry rate table
    #[snafu(display("invalid rate index {rate} (expected 0..=7)"))]
    InvalidRate { rate: usize },

    /// PSDU length outside the 12-bit SIGNAL LENGTH field range
    #[snafu(display("invalid payload length {length} (expected 1..=4095)"))]
    InvalidLength { length: usize },

    /// Scrambler seed of zero would stall the generator
    #[snafu(display("invalid scrambler seed {seed:#04x} (expected 1..=127)"))]
    InvalidSeed { seed: u8 },

    /// Inter-symbol window longer than the cyclic prefix
    #[snafu(display("invalid postfix length {len} (expected 1..=16)"))]
    InvalidPostfix { len: usize },
}
