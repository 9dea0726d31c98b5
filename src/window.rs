//! Fixed-length sample ring buffer
//!
//! The synchronizer keeps exactly the last 80 samples (one symbol period)
//! and reads them oldest-first when a state handler fires.

use rustfft::num_complex::Complex32;

pub const WINDOW_LEN: usize = 80;

#[derive(Debug, Clone)]
pub struct SampleWindow {
    buf: [Complex32; WINDOW_LEN],
    pos: usize,
}

impl SampleWindow {
    pub fn new() -> Self {
        SampleWindow {
            buf: [Complex32::new(0.0, 0.0); WINDOW_LEN],
            pos: 0,
        }
    }

    pub fn clear(&mut self) {
        self.buf = [Complex32::new(0.0, 0.0); WINDOW_LEN];
        self.pos = 0;
    }

    #[inline]
    pub fn push(&mut self, x: Complex32) {
        self.buf[self.pos] = x;
        self.pos = (self.pos + 1) % WINDOW_LEN;
    }

    /// Copy out the window contents, oldest sample first
    pub fn snapshot(&self, out: &mut [Complex32; WINDOW_LEN]) {
        let (tail, head) = self.buf.split_at(self.pos);
        out[..head.len()].copy_from_slice(head);
        out[head.len()..].copy_from_slice(tail);
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        SampleWindow::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_order() {
        let mut w = SampleWindow::new();
        for n in 0..200 {
            w.push(Complex32::new(n as f32, 0.0));
        }
        let mut out = [Complex32::new(0.0, 0.0); WINDOW_LEN];
        w.snapshot(&mut out);
        for (i, o) in out.iter().enumerate() {
            assert_eq!(o.re, (200 - WINDOW_LEN + i) as f32);
        }
    }

    #[test]
    fn test_clear() {
        let mut w = SampleWindow::new();
        w.push(Complex32::new(1.0, 1.0));
        w.clear();
        let mut out = [Complex32::new(9.0, 9.0); WINDOW_LEN];
        w.snapshot(&mut out);
        assert!(out.iter().all(|c| c.norm() == 0.0));
    }
}
