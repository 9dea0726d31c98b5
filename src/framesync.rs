//! Frame synchronizer: PLCP detection through DATA decode
//!
//! A sample-driven state machine over a length-80 ring buffer. Every
//! pushed sample is mixed down by the receiver NCO (once a frame is being
//! tracked), buffered, and counted; each state fires after its expected
//! sample count and works on a snapshot of the window.
//!
//! **State schedule** (offsets from frame start, one row per handler):
//!
//! | window      | state     | work |
//! |-------------|-----------|------|
//! | [0, 64)     | SEEK_PLCP | detect, G0a, coarse CFO, sub-16 timing |
//! | [64, 128)   | RX_SHORT0 | G0b, short-sequence CFO refinement |
//! | [128, 192)  | RX_SHORT1 | bridge over short tail + long guard |
//! | [192, 256)  | RX_LONG0  | G1a |
//! | [256, 320)  | RX_LONG1  | G1b, fine CFO, channel estimate |
//! | [320, 400)  | RX_SIGNAL | equalize, decode, validate SIGNAL |
//! | [400+80k, …)| RX_DATA   | per-symbol demodulation, final decode |
//!
//! Detection combines the delay-16 short-training autocorrelation (≈1 in
//! training, ≈0 in noise; its phase is the coarse CFO) with the S0
//! frequency-domain metric s_hat (its phase is the sub-16-sample timing
//! offset). Frames rejected at SIGNAL validation return silently to
//! SEEK_PLCP; completed frames are delivered through the callback with a
//! validity flag from the descrambled SERVICE bits.

use crate::dft::{Dft64, FftTransform};
use crate::interleave;
use crate::mapper;
use crate::modem::Modem;
use crate::nco::Nco;
use crate::packet::{self, PacketParams};
use crate::ratetab::{self, Modulation};
use crate::signal_field;
use crate::training::{Msequence, S0_FREQ, S1_FREQ};
use crate::viterbi::{ConvDecoder, SoftViterbi};
use crate::window::{SampleWindow, WINDOW_LEN};
use rustfft::num_complex::Complex32;
use std::f32::consts::TAU;
use tracing::{debug, trace};

/// sqrt(12)/64, the S0 gain-estimate normalization
const S0_GAIN: f32 = 0.054_127;

/// Channel gains below this magnitude demap to erasures
const GAIN_FLOOR: f32 = 1e-6;

/// Minimum fraction of window energy on the 12 active S0 bins
///
/// The short training concentrates all its energy there; noise spreads
/// roughly 12/64 of its energy into the band, so the gate separates the
/// two by a wide margin at any usable SNR.
const S0_BAND_MIN: f32 = 0.5;

/// Receiver tuning knobs
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Threshold on the normalized S0 metric |s_hat| (ideal 1.0)
    pub detect_threshold: f32,
    /// Threshold on the delay-16 autocorrelation (ideal 1.0)
    pub autocorr_threshold: f32,
    /// Minimum mean power per sample in the detection window, if enabled
    pub squelch_floor: Option<f32>,
    /// Polynomial order for equalizer smoothing, if enabled (2..=4)
    pub smoothing_order: Option<usize>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            detect_threshold: 0.3,
            autocorr_threshold: 0.5,
            squelch_floor: None,
            smoothing_order: None,
        }
    }
}

/// A completed frame, borrowed for the duration of the callback
#[derive(Debug)]
pub struct FrameEvent<'a> {
    /// Rate-table index 0..=7
    pub rate: usize,
    /// Declared PSDU length from SIGNAL
    pub length: usize,
    /// Decoded payload, `length` bytes
    pub payload: &'a [u8],
    /// SERVICE reserved bits descrambled to zero
    pub valid: bool,
    /// Scrambler seed recovered from the SERVICE field
    pub seed: u8,
}

/// Per-state accumulators; counters live beside the machine
enum State {
    SeekPlcp,
    RxShort0 { g0a: Box<[Complex32; 64]>, adjust: i32 },
    RxShort1,
    RxLong0,
    RxLong1 { g1a: Box<[Complex32; 64]> },
    RxSignal,
    RxData { symbol: usize },
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::SeekPlcp => "SEEK_PLCP",
            State::RxShort0 { .. } => "RX_SHORT0",
            State::RxShort1 => "RX_SHORT1",
            State::RxLong0 => "RX_LONG0",
            State::RxLong1 { .. } => "RX_LONG1",
            State::RxSignal => "RX_SIGNAL",
            State::RxData { .. } => "RX_DATA",
        }
    }
}

/// OFDM frame synchronizer
///
/// Single-stream, single-threaded; feed samples with `push` and receive
/// decoded frames through the callback, in completion order.
pub struct FrameSynchronizer<F>
where
    F: FnMut(FrameEvent),
{
    callback: F,
    config: SyncConfig,
    dft: Box<dyn Dft64>,
    decoder: Box<dyn ConvDecoder>,

    window: SampleWindow,
    nco: Nco,
    ms_pilot: Msequence,

    state: State,
    timer: usize,
    /// 64-bin channel estimate from the long training
    gain: [Complex32; 64],
    /// Mean received power over the last detection window
    rssi: f32,
    params: Option<PacketParams>,
    msg_soft: Vec<u8>,
}

impl<F> FrameSynchronizer<F>
where
    F: FnMut(FrameEvent),
{
    /// Synchronizer with the default transform and Viterbi decoder
    pub fn new(config: SyncConfig, callback: F) -> Self {
        Self::with_capabilities(Box::new(FftTransform::new()), Box::new(SoftViterbi), config, callback)
    }

    /// Synchronizer with host-supplied transform and decoder bindings
    pub fn with_capabilities(
        dft: Box<dyn Dft64>,
        decoder: Box<dyn ConvDecoder>,
        config: SyncConfig,
        callback: F,
    ) -> Self {
        FrameSynchronizer {
            callback,
            config,
            dft,
            decoder,
            window: SampleWindow::new(),
            nco: Nco::new(),
            ms_pilot: Msequence::new(),
            state: State::SeekPlcp,
            timer: 0,
            gain: [Complex32::new(0.0, 0.0); 64],
            rssi: 0.0,
            params: None,
            msg_soft: Vec::new(),
        }
    }

    /// Discard any in-progress frame and return to PLCP seek
    ///
    /// No callback fires for the discarded frame; NCO frequency and phase
    /// are zeroed.
    pub fn reset(&mut self) {
        if !matches!(self.state, State::SeekPlcp) {
            debug!(from = self.state.name(), "synchronizer reset");
        }
        self.window.clear();
        self.nco.reset();
        self.state = State::SeekPlcp;
        self.timer = 0;
        self.params = None;
        self.msg_soft.clear();
    }

    /// Mean received power over the most recent detection window
    pub fn rssi(&self) -> f32 {
        self.rssi
    }

    /// Current carrier-frequency-offset estimate, cycles per sample
    pub fn cfo(&self) -> f32 {
        self.nco.frequency() / TAU
    }

    /// Feed a block of baseband samples of any size
    pub fn push(&mut self, samples: &[Complex32]) {
        for &s in samples {
            self.execute_sample(s);
        }
    }

    fn execute_sample(&mut self, sample: Complex32) {
        // mix by the receiver NCO except while still hunting for a frame
        let x = if matches!(self.state, State::SeekPlcp) {
            sample
        } else {
            let mixed = self.nco.mix_down(sample);
            self.nco.step();
            mixed
        };
        self.window.push(x);
        self.timer += 1;

        match &self.state {
            State::SeekPlcp => {
                if self.timer >= 64 {
                    self.timer = 0;
                    self.execute_seekplcp();
                }
            }
            State::RxShort0 { adjust, .. } => {
                if self.timer as i32 >= 64 + adjust {
                    self.timer = 0;
                    self.execute_rxshort0();
                }
            }
            State::RxShort1 => {
                if self.timer >= 64 {
                    self.timer = 0;
                    self.state = State::RxLong0;
                }
            }
            State::RxLong0 => {
                if self.timer >= 64 {
                    self.timer = 0;
                    self.execute_rxlong0();
                }
            }
            State::RxLong1 { .. } => {
                if self.timer >= 64 {
                    self.timer = 0;
                    self.execute_rxlong1();
                }
            }
            State::RxSignal => {
                if self.timer >= 80 {
                    self.timer = 0;
                    self.execute_rxsignal();
                }
            }
            State::RxData { .. } => {
                if self.timer >= 80 {
                    self.timer = 0;
                    self.execute_rxdata();
                }
            }
        }
    }

    /// Estimate the complex gain on the 12 active S0 bins
    ///
    /// Also returns the fraction of window energy falling on those bins,
    /// the spectral signature used to qualify a detection.
    fn estimate_gain_s0(&self, x: &[Complex32; 64]) -> ([Complex32; 64], f32) {
        let mut freq = [Complex32::new(0.0, 0.0); 64];
        self.dft.forward(x, &mut freq);
        let total: f32 = freq.iter().map(|c| c.norm_sqr()).sum();
        let mut g = [Complex32::new(0.0, 0.0); 64];
        let mut in_band = 0.0f32;
        for k in (4..=24).step_by(4).chain((40..=60).step_by(4)) {
            in_band += freq[k].norm_sqr();
            g[k] = freq[k] * S0_FREQ[k].conj() * S0_GAIN;
        }
        let fraction = if total > 0.0 { in_band / total } else { 0.0 };
        (g, fraction)
    }

    /// S0 metric: conjugate products along each 4-spaced bin cluster,
    /// normalized by the mean gain power (ideal magnitude 1)
    fn s0_metric(g: &[Complex32; 64]) -> Complex32 {
        let mut s_hat = Complex32::new(0.0, 0.0);
        for k in (4..=20).step_by(4) {
            s_hat += g[k + 4] * g[k].conj();
        }
        for k in (40..=56).step_by(4) {
            s_hat += g[k + 4] * g[k].conj();
        }
        let power: f32 = (4..=24)
            .step_by(4)
            .chain((40..=60).step_by(4))
            .map(|k| g[k].norm_sqr())
            .sum();
        if power > 0.0 {
            s_hat * 1.2 / power
        } else {
            Complex32::new(0.0, 0.0)
        }
    }

    fn execute_seekplcp(&mut self) {
        let mut rc = [Complex32::new(0.0, 0.0); WINDOW_LEN];
        self.window.snapshot(&mut rc);
        let x: &[Complex32; 64] = rc[16..].try_into().expect("window holds 80 samples");

        let energy: f32 = x.iter().map(|c| c.norm_sqr()).sum();
        self.rssi = energy / 64.0;
        if let Some(floor) = self.config.squelch_floor {
            if self.rssi < floor {
                return;
            }
        }

        // delay-16 autocorrelation over the window: magnitude detects the
        // short training, phase is the coarse CFO
        let mut corr = Complex32::new(0.0, 0.0);
        let mut p0 = 0.0f32;
        let mut p1 = 0.0f32;
        for n in 0..48 {
            corr += x[n + 16] * x[n].conj();
            p0 += x[n].norm_sqr();
            p1 += x[n + 16].norm_sqr();
        }
        let norm = (p0 * p1).sqrt();
        let rho = if norm > 0.0 { corr.norm() / norm } else { 0.0 };
        if rho < self.config.autocorr_threshold {
            return;
        }

        let (g0a, in_band) = self.estimate_gain_s0(x);
        let s_hat = Self::s0_metric(&g0a);
        trace!(rho, in_band, s_hat = s_hat.norm(), rssi = self.rssi, "PLCP candidate");
        if in_band < S0_BAND_MIN || s_hat.norm() < self.config.detect_threshold {
            return;
        }

        // phase of s_hat is the timing offset within the 16-sample period;
        // stretch or shrink the next state's wait to land on a boundary
        let tau = -s_hat.arg() * 16.0 / TAU;
        let adjust = (tau.round() as i32).clamp(-8, 8);

        // coarse CFO from the autocorrelation phase over the 16-sample lag
        self.nco.reset();
        self.nco.adjust_frequency(corr.arg() / 16.0);
        self.ms_pilot.reset();

        debug!(rho, tau, cfo = self.cfo(), "PLCP detected");
        self.state = State::RxShort0 { g0a: Box::new(g0a), adjust };
    }

    fn execute_rxshort0(&mut self) {
        let State::RxShort0 { g0a, adjust } = std::mem::replace(&mut self.state, State::RxShort1)
        else {
            unreachable!("handler runs only in RX_SHORT0");
        };
        let mut rc = [Complex32::new(0.0, 0.0); WINDOW_LEN];
        self.window.snapshot(&mut rc);
        let x: &[Complex32; 64] = rc[16..].try_into().expect("window holds 80 samples");
        let (g0b, _) = self.estimate_gain_s0(x);

        // refine CFO from the phase advance between the two estimates,
        // derotating G0a by the timing shift applied after detection
        let spacing = (64 + adjust) as f32;
        let mut acc = Complex32::new(0.0, 0.0);
        for k in (4..=24).step_by(4).chain((40..=60).step_by(4)) {
            let rot = TAU * k as f32 * adjust as f32 / 64.0;
            let g0a_shifted = g0a[k] * Complex32::new(rot.cos(), rot.sin());
            acc += g0b[k] * g0a_shifted.conj();
        }
        if acc.norm() > 0.0 {
            // G0a was taken before the NCO armed, G0b after, so a zero
            // residual still shows the oscillator's own phase advance from
            // the detection window's center: frequency * 32.5
            let residual = wrap_to_pi(acc.arg() - self.nco.frequency() * 32.5);
            self.nco.adjust_frequency(residual / spacing);
        }
        trace!(cfo = self.cfo(), "short-sequence CFO refinement");
    }

    fn execute_rxlong0(&mut self) {
        let mut rc = [Complex32::new(0.0, 0.0); WINDOW_LEN];
        self.window.snapshot(&mut rc);
        let x: &[Complex32; 64] = rc[16..].try_into().expect("window holds 80 samples");
        let mut g1a = Box::new([Complex32::new(0.0, 0.0); 64]);
        self.estimate_gain_s1(x, &mut g1a);
        self.state = State::RxLong1 { g1a };
    }

    fn execute_rxlong1(&mut self) {
        let State::RxLong1 { g1a } = std::mem::replace(&mut self.state, State::RxSignal) else {
            unreachable!("handler runs only in RX_LONG1");
        };
        let mut rc = [Complex32::new(0.0, 0.0); WINDOW_LEN];
        self.window.snapshot(&mut rc);
        let x: &[Complex32; 64] = rc[16..].try_into().expect("window holds 80 samples");
        let mut g1b = [Complex32::new(0.0, 0.0); 64];
        self.estimate_gain_s1(x, &mut g1b);

        // fine CFO: the two long copies sit exactly 64 samples apart
        let mut acc = Complex32::new(0.0, 0.0);
        for k in 1..64 {
            if S1_FREQ[k].norm_sqr() > 0.0 {
                acc += g1b[k] * g1a[k].conj();
            }
        }
        if acc.norm() > 0.0 {
            self.nco.adjust_frequency(acc.arg() / 64.0);
        }

        for k in 0..64 {
            self.gain[k] = (g1a[k] + g1b[k]) * 0.5;
        }
        if let Some(order) = self.config.smoothing_order {
            smooth_gain(&mut self.gain, order);
        }
        debug!(cfo = self.cfo(), "channel estimated, receiving SIGNAL");
    }

    /// Per-bin gain from one long-training copy
    fn estimate_gain_s1(&self, x: &[Complex32; 64], g: &mut [Complex32; 64]) {
        let mut freq = [Complex32::new(0.0, 0.0); 64];
        self.dft.forward(x, &mut freq);
        for k in 0..64 {
            let s = S1_FREQ[k];
            // S1 values are ±1, so conjugate multiplication divides
            if s.norm_sqr() > 0.0 {
                g[k] = freq[k] * s.conj();
            }
        }
    }

    /// Equalize the buffered symbol and demap it into `soft`
    ///
    /// Common pilot phase is removed before demapping; bins with a
    /// vanishing channel estimate demap to erasures.
    fn recover_symbol(&mut self, modulation: Modulation, soft: &mut [u8]) {
        let mut rc = [Complex32::new(0.0, 0.0); WINDOW_LEN];
        self.window.snapshot(&mut rc);
        let body: &[Complex32; 64] = rc[16..].try_into().expect("window holds 80 samples");
        let mut freq = [Complex32::new(0.0, 0.0); 64];
        self.dft.forward(body, &mut freq);

        let polarity = self.ms_pilot.next_polarity();
        let expected = mapper::expected_pilots(polarity);
        let mut pilot_acc = Complex32::new(0.0, 0.0);
        for (&bin, &e) in mapper::PILOT_BINS.iter().zip(expected.iter()) {
            if self.gain[bin].norm() >= GAIN_FLOOR {
                pilot_acc += (freq[bin] / self.gain[bin]) * e.conj();
            }
        }
        let cpe = if pilot_acc.norm() > 0.0 {
            pilot_acc.arg()
        } else {
            0.0
        };
        let derot = Complex32::new(cpe.cos(), -cpe.sin());

        let modem = Modem::new(modulation);
        let nbpsc = modem.bits_per_symbol();
        for (i, &bin) in mapper::DATA_BINS.iter().enumerate() {
            let erased = self.gain[bin].norm() < GAIN_FLOOR;
            let y = if erased {
                Complex32::new(0.0, 0.0)
            } else {
                freq[bin] / self.gain[bin] * derot
            };
            modem.demodulate_soft(y, erased, &mut soft[i * nbpsc..(i + 1) * nbpsc]);
        }
    }

    fn execute_rxsignal(&mut self) {
        let mut soft = [0u8; 48];
        self.recover_symbol(Modulation::Bpsk, &mut soft);

        let mut deinterleaved = [0u8; 48];
        interleave::signal_table().deinterleave_soft(&soft, &mut deinterleaved);
        let decoded = signal_field::decode(&deinterleaved, self.decoder.as_ref());

        let Some(sig) = signal_field::unpack(&decoded) else {
            debug!("SIGNAL rejected, abandoning frame");
            self.reset();
            return;
        };
        let params = PacketParams::compute(sig.rate, sig.length)
            .expect("validated SIGNAL fields are in range");
        debug!(
            rate_mbps = ratetab::RATE_TABLE[sig.rate].rate_mbps,
            length = sig.length,
            nsym = params.nsym,
            "SIGNAL decoded"
        );
        self.msg_soft.clear();
        self.msg_soft.reserve(params.encoded_bits());
        self.params = Some(params);
        self.state = State::RxData { symbol: 0 };
    }

    fn execute_rxdata(&mut self) {
        let State::RxData { symbol } = &self.state else {
            unreachable!("handler runs only in RX_DATA");
        };
        let symbol = *symbol;
        let params = self.params.expect("RX_DATA always has packet params");
        let rp = params.rate_params();

        let mut soft = vec![0u8; rp.ncbps];
        self.recover_symbol(rp.modulation, &mut soft);

        let table = interleave::table_for(rp);
        let mut deinterleaved = vec![0u8; rp.ncbps];
        table.deinterleave_soft(&soft, &mut deinterleaved);
        self.msg_soft.extend_from_slice(&deinterleaved);

        if symbol + 1 < params.nsym {
            self.state = State::RxData { symbol: symbol + 1 };
            return;
        }

        // all DATA symbols collected: run the back half of the bit pipe
        let decoded = packet::decode(&params, &self.msg_soft, self.decoder.as_ref());
        debug!(
            rate = params.rate,
            length = params.length,
            valid = decoded.service_ok,
            seed = decoded.seed,
            "frame complete"
        );
        (self.callback)(FrameEvent {
            rate: params.rate,
            length: params.length,
            payload: &decoded.payload,
            valid: decoded.service_ok,
            seed: decoded.seed,
        });
        self.reset();
    }
}

/// Wrap an angle into (−π, π]
fn wrap_to_pi(theta: f32) -> f32 {
    use std::f32::consts::PI;
    let mut t = theta % TAU;
    if t > PI {
        t -= TAU;
    } else if t <= -PI {
        t += TAU;
    }
    t
}

/// Least-squares polynomial smoothing of the channel estimate
///
/// Real and imaginary parts are fitted separately as functions of bin
/// index, the two occupied clusters independently (they are far apart in
/// frequency once the guard band is crossed).
fn smooth_gain(gain: &mut [Complex32; 64], order: usize) {
    let order = order.clamp(2, 4);
    smooth_cluster(gain, 1, 26, order);
    smooth_cluster(gain, 38, 63, order);
}

fn smooth_cluster(gain: &mut [Complex32; 64], lo: usize, hi: usize, order: usize) {
    let bins: Vec<usize> = (lo..=hi).filter(|&k| S1_FREQ[k].norm_sqr() > 0.0).collect();
    let re = polyfit_eval(&bins, |k| gain[k].re, order);
    let im = polyfit_eval(&bins, |k| gain[k].im, order);
    for (i, &k) in bins.iter().enumerate() {
        gain[k] = Complex32::new(re[i], im[i]);
    }
}

/// Fit a degree-`order` polynomial to (bin, f(bin)) and evaluate it back
fn polyfit_eval(bins: &[usize], f: impl Fn(usize) -> f32, order: usize) -> Vec<f32> {
    let n = order + 1;
    // normal equations in f64 for conditioning; bins are recentered
    let mid = bins[bins.len() / 2] as f64;
    let xs: Vec<f64> = bins.iter().map(|&k| k as f64 - mid).collect();
    let mut ata = vec![vec![0.0f64; n]; n];
    let mut atb = vec![0.0f64; n];
    for (&k, &x) in bins.iter().zip(xs.iter()) {
        let y = f(k) as f64;
        let mut powers = vec![1.0f64; n];
        for p in 1..n {
            powers[p] = powers[p - 1] * x;
        }
        for i in 0..n {
            for j in 0..n {
                ata[i][j] += powers[i] * powers[j];
            }
            atb[i] += powers[i] * y;
        }
    }
    let coeffs = solve(&mut ata, &mut atb);
    xs.iter()
        .map(|&x| {
            let mut acc = 0.0;
            let mut pow = 1.0;
            for &c in &coeffs {
                acc += c * pow;
                pow *= x;
            }
            acc as f32
        })
        .collect()
}

/// Gaussian elimination with partial pivoting on a small system
fn solve(a: &mut [Vec<f64>], b: &mut [f64]) -> Vec<f64> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap();
        a.swap(col, pivot);
        b.swap(col, pivot);
        let diag = a[col][col];
        if diag.abs() < 1e-12 {
            continue;
        }
        for row in col + 1..n {
            let factor = a[row][col] / diag;
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in row + 1..n {
            acc -= a[row][k] * x[k];
        }
        x[row] = if a[row][row].abs() < 1e-12 { 0.0 } else { acc / a[row][row] };
    }
    x
}
