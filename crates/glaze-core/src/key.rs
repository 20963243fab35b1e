//! Chaotic-map crypto key model
//!
//! A key is the `(x0, mu)` seed pair of the logistic map. Both fields are
//! kept as decimal strings so no precision is lost across serialization
//! boundaries; they are parsed to native floats only at the point of map
//! iteration. The bounds `x0 ∈ [0.5, 1.0)` and `mu ∈ [3.57, 4.0)` keep the
//! map in its fully chaotic regime. Values outside these ranges degrade the
//! transform's scrambling, so the generator guarantees them by construction.

use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{GlazeError, Result};

/// Lower bound (inclusive) of the `x0` seed
pub const X0_MIN: f64 = 0.5;
/// Upper bound (exclusive) of the `x0` seed
pub const X0_MAX: f64 = 1.0;
/// Lower bound (inclusive) of the `mu` seed
pub const MU_MIN: f64 = 3.57;
/// Upper bound (exclusive) of the `mu` seed
pub const MU_MAX: f64 = 4.0;

/// Immutable seed pair for the chaotic map
///
/// Constructed once per request, owned by the request, read-only to the
/// stage. `build` accepts any non-empty decimal strings; only the generator
/// promises the chaotic-regime bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosKey {
    x0: String,
    mu: String,
}

impl ChaosKey {
    /// Builds a key from explicit field values.
    ///
    /// Fails with [`GlazeError::InvalidKey`] if either field is empty.
    pub fn build(x0: impl Into<String>, mu: impl Into<String>) -> Result<Self> {
        let x0 = x0.into();
        let mu = mu.into();
        if x0.is_empty() {
            return Err(GlazeError::invalid_key("x0 must not be empty"));
        }
        if mu.is_empty() {
            return Err(GlazeError::invalid_key("mu must not be empty"));
        }
        Ok(Self { x0, mu })
    }

    /// Fixed key for reproducible tests and demos.
    pub fn test_key() -> Self {
        Self {
            x0: "5.55555555555555555556e-1".to_string(),
            mu: "3.577777777777777777e0".to_string(),
        }
    }

    /// The `x0` field as supplied.
    pub fn x0(&self) -> &str {
        &self.x0
    }

    /// The `mu` field as supplied.
    pub fn mu(&self) -> &str {
        &self.mu
    }

    /// Parses both fields as decimals for map iteration.
    ///
    /// Fails with [`GlazeError::InvalidKey`] when a field is not a decimal
    /// number.
    pub fn seeds(&self) -> Result<(f64, f64)> {
        let x0 = self
            .x0
            .parse::<f64>()
            .map_err(|e| GlazeError::invalid_key(format!("x0 {:?} does not parse: {e}", self.x0)))?;
        let mu = self
            .mu
            .parse::<f64>()
            .map_err(|e| GlazeError::invalid_key(format!("mu {:?} does not parse: {e}", self.mu)))?;
        Ok((x0, mu))
    }
}

/// Generates a fresh key from OS randomness.
///
/// `x0_len` and `mu_len` are the fractional digit counts of each field;
/// lengths below 2 are clamped to 2. The returned key always parses inside
/// the chaotic-regime bounds.
pub fn generate_key(x0_len: usize, mu_len: usize) -> ChaosKey {
    let mut rng = OsRng;
    ChaosKey {
        x0: generate_x0(&mut rng, x0_len),
        mu: generate_mu(&mut rng, mu_len),
    }
}

fn generate_x0(rng: &mut impl Rng, len: usize) -> String {
    let len = len.max(2);
    let mut field = String::with_capacity(len + 4);
    field.push_str("0.");
    field.push(digit(rng.gen_range(5..=9)));
    for _ in 1..len {
        field.push(digit(rng.gen_range(0..=9)));
    }
    field.push_str("e0");
    field
}

fn generate_mu(rng: &mut impl Rng, len: usize) -> String {
    let len = len.max(2);
    let mut field = String::with_capacity(len + 4);
    field.push_str("3.");
    let first = rng.gen_range(5..=9u8);
    field.push(digit(first));
    // a leading 5 reaches down to 3.50, hold the next digit at 7 or above
    let second_min = if first == 5 { 7 } else { 0 };
    field.push(digit(rng.gen_range(second_min..=9)));
    for _ in 2..len {
        field.push(digit(rng.gen_range(0..=9)));
    }
    field.push_str("e0");
    field
}

fn digit(value: u8) -> char {
    char::from(b'0' + value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_empty_fields() {
        assert!(matches!(
            ChaosKey::build("", "3.6e0"),
            Err(GlazeError::InvalidKey { .. })
        ));
        assert!(matches!(
            ChaosKey::build("0.6e-1", ""),
            Err(GlazeError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_build_round_trips_fields_exactly() {
        let key = ChaosKey::build("0.6e-1", "3.6e0").unwrap();
        assert_eq!(key.x0(), "0.6e-1");
        assert_eq!(key.mu(), "3.6e0");
    }

    #[test]
    fn test_seeds_parse_scientific_notation() {
        let key = ChaosKey::build("0.6e-1", "3.6e0").unwrap();
        let (x0, mu) = key.seeds().unwrap();
        assert!((x0 - 0.06).abs() < 1e-12);
        assert!((mu - 3.6).abs() < 1e-12);
    }

    #[test]
    fn test_seeds_reject_non_numeric_fields() {
        let key = ChaosKey::build("zero point five", "3.6e0").unwrap();
        assert!(matches!(key.seeds(), Err(GlazeError::InvalidKey { .. })));
    }

    #[test]
    fn test_test_key_is_inside_bounds() {
        let (x0, mu) = ChaosKey::test_key().seeds().unwrap();
        assert!((X0_MIN..X0_MAX).contains(&x0));
        assert!((MU_MIN..MU_MAX).contains(&mu));
    }

    #[test]
    fn test_generate_clamps_short_lengths() {
        let key = generate_key(0, 1);
        let (x0, mu) = key.seeds().unwrap();
        assert!((X0_MIN..X0_MAX).contains(&x0));
        assert!((MU_MIN..MU_MAX).contains(&mu));
    }

    #[test]
    fn test_key_serde_round_trip() {
        let key = ChaosKey::test_key();
        let json = serde_json::to_string(&key).unwrap();
        let back: ChaosKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
