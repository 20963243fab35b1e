//! Logistic-map chaos sequences
//!
//! The recurrence `x_{n+1} = mu * x_n * (1 - x_n)` behaves chaotically for
//! seeds in the key bounds, so the sequence it produces is reproducible
//! from the key yet unpredictable without it. Both the block permutation
//! and the XOR keystream are drawn from it.

use glaze_core::errors::Result;
use glaze_core::key::ChaosKey;

/// Iterator over successive logistic-map values
///
/// The seed itself is never emitted; the first value is already one
/// application of the map.
#[derive(Debug, Clone)]
pub struct LogisticMap {
    x: f64,
    mu: f64,
}

impl LogisticMap {
    /// Starts the map at `x0` with parameter `mu`.
    pub fn new(x0: f64, mu: f64) -> Self {
        Self { x: x0, mu }
    }

    /// Starts the map from the seeds carried by `key`.
    pub fn from_key(key: &ChaosKey) -> Result<Self> {
        let (x0, mu) = key.seeds()?;
        Ok(Self::new(x0, mu))
    }

    /// Draws `len` values and returns the positions that sort them
    /// ascending.
    ///
    /// The result maps each output slot to the input position whose chaos
    /// value ranks there, which makes it usable directly as a scatter
    /// table for block shuffling.
    pub fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut indexed: Vec<(f64, usize)> = self
            .by_ref()
            .take(len)
            .enumerate()
            .map(|(position, value)| (value, position))
            .collect();
        // stable sort keeps equal chaos values in position order
        indexed.sort_by(|a, b| a.0.total_cmp(&b.0));
        indexed.into_iter().map(|(_, position)| position).collect()
    }

    /// Draws `len` values and quantizes each into a keystream byte.
    pub fn keystream(&mut self, len: usize) -> Vec<u8> {
        self.by_ref()
            .take(len)
            .map(|value| ((value * 1.0e6).floor() as u64 % 256) as u8)
            .collect()
    }
}

impl Iterator for LogisticMap {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.x = self.mu * self.x * (1.0 - self.x);
        Some(self.x)
    }
}
