//! 802.11a/g OFDM baseband modem
//!
//! The physical-layer transmit and receive chain of a Clause 17 OFDM
//! radio: payload bytes in, 20 Msample/s complex baseband out, and back.
//!
//! **Transmit**: [`FrameGenerator`] assembles SERVICE/tail/pad, scrambles,
//! convolutionally encodes with puncturing, interleaves, maps onto the
//! 64-carrier grid with pilots, and emits windowed 80-sample symbols
//! behind the PLCP preamble and SIGNAL header.
//!
//! **Receive**: [`FrameSynchronizer`] hunts for the short training
//! sequence, estimates gain, carrier offset, timing, and the channel
//! response from the preamble, decodes SIGNAL, demodulates the DATA
//! symbols, and hands each completed frame to a callback.
//!
//! The 64-point transform and the Viterbi decoder are injected
//! capabilities ([`dft::Dft64`], [`viterbi::ConvDecoder`]) with built-in
//! defaults, so the core never binds to a particular numeric library.

pub mod convcode;
pub mod dft;
pub mod error;
pub mod framegen;
pub mod framesync;
pub mod interleave;
pub mod iq;
pub mod mapper;
pub mod modem;
pub mod nco;
pub mod packet;
pub mod ratetab;
pub mod scramble;
pub mod signal_field;
pub mod simulation;
pub mod tracing_init;
pub mod training;
pub mod viterbi;
pub mod window;

pub use error::PhyError;
pub use framegen::FrameGenerator;
pub use framesync::{FrameEvent, FrameSynchronizer, SyncConfig};
pub use packet::PacketParams;
pub use ratetab::{CodingRate, Modulation, RateParams, RATE_TABLE};

/// Nominal baseband sample rate, samples per second
pub const SAMPLE_RATE: u32 = 20_000_000;
