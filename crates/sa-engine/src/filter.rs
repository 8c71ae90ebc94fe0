//! Amiga "LED" low-pass filter.
//!
//! The A500/A1200 LED filter is a second-order Butterworth low-pass with a
//! cutoff near 3.3 kHz. It is modelled here as a bilinear-transformed
//! biquad whose coefficients are derived once for a 44.1 kHz reference
//! rate, whatever the actual output rate is.

use core::f64::consts::{PI, SQRT_2};

/// Cutoff frequency in Hz.
pub const CUTOFF_HZ: f64 = 3275.0;

/// Rate the coefficients are derived for.
pub const REFERENCE_RATE: f64 = 44_100.0;

/// Second-order IIR low-pass: `y = b0*x + b1*x1 + b2*x2 - a1*y1 - a2*y2`.
#[derive(Clone, Debug)]
pub struct LowPassFilter {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    /// Previous inputs, most recent first.
    inputs: [f64; 2],
    /// Previous outputs, most recent first.
    outputs: [f64; 2],
}

impl LowPassFilter {
    pub fn new() -> Self {
        // s-domain prototype: 1 / (s^2 + sqrt(2) s + 1), prewarped.
        let omega = 2.0 * PI * CUTOFF_HZ / REFERENCE_RATE;
        let k = 1.0 / (0.5 * omega).tan();
        let k2 = k * k;
        let d = k2 + SQRT_2 * k + 1.0;
        Self {
            b0: 1.0 / d,
            b1: 2.0 / d,
            b2: 1.0 / d,
            a1: (2.0 - 2.0 * k2) / d,
            a2: (k2 - SQRT_2 * k + 1.0) / d,
            inputs: [0.0; 2],
            outputs: [0.0; 2],
        }
    }

    pub fn reset(&mut self) {
        self.inputs = [0.0; 2];
        self.outputs = [0.0; 2];
    }

    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b1 * self.inputs[0] + self.b2 * self.inputs[1]
            - self.a1 * self.outputs[0]
            - self.a2 * self.outputs[1];
        self.inputs = [x, self.inputs[0]];
        self.outputs = [y, self.outputs[0]];
        y
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::new()
    }
}
