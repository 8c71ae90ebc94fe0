//! One output frame of 1, 2 or 4 samples.

use arrayvec::ArrayVec;

/// Interleaved samples of one output frame, each in `[-1, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    samples: ArrayVec<f64, 4>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.samples.push(value.clamp(-1.0, 1.0));
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Signed 8-bit samples, rounded.
    pub fn to_signed(&self) -> impl Iterator<Item = i8> + '_ {
        self.samples.iter().map(|&s| quantize(s))
    }
}

/// Scale `[-1, 1]` to a signed byte with rounding and clamping.
pub fn quantize(value: f64) -> i8 {
    (value * 128.0).round().clamp(-128.0, 127.0) as i8
}
