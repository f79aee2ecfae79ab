//! Validated domain newtypes.

use serde::{Deserialize, Serialize};

/// Sampling temperature, validated to the 0.0–2.0 range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f32);

impl Temperature {
    /// Create a validated temperature.
    ///
    /// # Errors
    /// Returns an error string if the value is outside 0.0–2.0 or not finite.
    pub fn new(value: f32) -> Result<Self, String> {
        if !value.is_finite() || !(0.0..=2.0).contains(&value) {
            return Err(format!("temperature must be between 0.0 and 2.0, got {value}"));
        }
        Ok(Self(value))
    }

    /// Get the inner value.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(0.7)
    }
}

/// Maximum output tokens, validated to be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaxTokens(u32);

impl MaxTokens {
    /// Create a validated max-tokens value.
    ///
    /// # Errors
    /// Returns an error string if the value is zero.
    pub fn new(value: u32) -> Result<Self, String> {
        if value == 0 {
            return Err("max_tokens must be positive".to_string());
        }
        Ok(Self(value))
    }

    /// Get the inner value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for MaxTokens {
    fn default() -> Self {
        Self(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_range() {
        assert!(Temperature::new(0.0).is_ok());
        assert!(Temperature::new(2.0).is_ok());
        assert!(Temperature::new(-0.1).is_err());
        assert!(Temperature::new(2.1).is_err());
        assert!(Temperature::new(f32::NAN).is_err());
    }

    #[test]
    fn test_temperature_default() {
        assert!((Temperature::default().value() - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_max_tokens() {
        assert!(MaxTokens::new(0).is_err());
        assert_eq!(MaxTokens::new(512).map(MaxTokens::value), Ok(512));
        assert_eq!(MaxTokens::default().value(), 1024);
    }
}
