//! Playback speed multiplier and its admissible range.
//!
//! A [`Speed`] is always finite and strictly positive, so the effective
//! wait `nominal / speed` can never be zero, negative, or infinite.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SequencerError;

/// Validated playback speed multiplier.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Speed(f64);

impl Speed {
    /// Normal playback speed.
    pub const NORMAL: Self = Self(1.0);

    /// Creates a speed from a raw multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidSpeed`] if `value` is NaN, infinite,
    /// zero, or negative.
    pub fn new(value: f64) -> Result<Self, SequencerError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(SequencerError::InvalidSpeed(value))
        }
    }

    /// Raw multiplier value.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    /// Scales a nominal duration to wall-clock time at this speed.
    #[must_use]
    pub fn effective(self, nominal: Duration) -> Duration {
        scale(nominal, self.0.recip())
    }
}

/// Multiplies a duration by `factor`, rounding to the nearest nanosecond.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn scale(duration: Duration, factor: f64) -> Duration {
    let nanos = (duration.as_nanos() as f64 * factor).round();
    if nanos <= 0.0 {
        Duration::ZERO
    } else if nanos >= u64::MAX as f64 {
        Duration::from_nanos(u64::MAX)
    } else {
        Duration::from_nanos(nanos as u64)
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

impl FromStr for Speed {
    type Err = SequencerError;

    /// Accepts `"2"`, `"1.5"`, or `"1.5x"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_suffix(['x', 'X'])
            .unwrap_or(trimmed)
            .trim();
        let value: f64 = number
            .parse()
            .map_err(|_| SequencerError::InvalidSpeed(f64::NAN))?;
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Speed {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Bounded range of speeds offered to the control surface.
///
/// The control surface steps through `min, min + step, ..., max`; direct
/// input outside `[min, max]` is clamped to the nearest bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedRange {
    /// Slowest allowed speed
    pub min: f64,
    /// Fastest allowed speed
    pub max: f64,
    /// Increment between discrete choices
    pub step: f64,
}

impl Default for SpeedRange {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 3.0,
            step: 0.5,
        }
    }
}

impl SpeedRange {
    /// Creates a range, checking that the bounds are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidRange`] unless
    /// `0 < min <= max` and `step > 0`, all finite.
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, SequencerError> {
        let range = Self { min, max, step };
        range.check()?;
        Ok(range)
    }

    /// Verifies the bounds.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidRange`] describing the first problem.
    pub fn check(&self) -> Result<(), SequencerError> {
        if ![self.min, self.max, self.step].iter().all(|v| v.is_finite()) {
            return Err(SequencerError::InvalidRange(
                "bounds must be finite".to_string(),
            ));
        }
        if self.min <= 0.0 {
            return Err(SequencerError::InvalidRange(format!(
                "min must be positive, got {}",
                self.min
            )));
        }
        if self.max < self.min {
            return Err(SequencerError::InvalidRange(format!(
                "max ({}) is below min ({})",
                self.max, self.min
            )));
        }
        if self.step <= 0.0 {
            return Err(SequencerError::InvalidRange(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        Ok(())
    }

    /// Admits a requested multiplier: rejects invalid input and clamps
    /// out-of-range input to the nearest bound.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidSpeed`] for NaN, infinite, zero, or
    /// negative input.
    pub fn admit(&self, requested: f64) -> Result<Speed, SequencerError> {
        let speed = Speed::new(requested)?;
        let clamped = speed.0.clamp(self.min, self.max);
        if (clamped - speed.0).abs() > f64::EPSILON {
            warn!(
                requested,
                clamped,
                min = self.min,
                max = self.max,
                "speed outside allowed range; clamping"
            );
        }
        Ok(Speed(clamped))
    }

    /// Returns whether `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Discrete speed choices from `min` to `max` inclusive.
    #[must_use]
    pub fn steps(&self) -> Vec<Speed> {
        let mut out = Vec::new();
        let mut i = 0_u32;
        loop {
            let value = self.step.mul_add(f64::from(i), self.min);
            if value > self.max + 1e-9 {
                break;
            }
            out.push(Speed(value.min(self.max)));
            i += 1;
        }
        out
    }

    /// Next discrete choice above `current`, saturating at `max`.
    #[must_use]
    pub fn faster(&self, current: Speed) -> Speed {
        self.steps()
            .into_iter()
            .find(|s| s.0 > current.0 + 1e-9)
            .unwrap_or(Speed(self.max))
    }

    /// Next discrete choice below `current`, saturating at `min`.
    #[must_use]
    pub fn slower(&self, current: Speed) -> Speed {
        self.steps()
            .into_iter()
            .rev()
            .find(|s| s.0 < current.0 - 1e-9)
            .unwrap_or(Speed(self.min))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_duration_halves_at_2x() {
        let speed = Speed::new(2.0).unwrap();
        assert_eq!(
            speed.effective(Duration::from_millis(1000)),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_effective_duration_rounds_to_nanos() {
        let speed = Speed::new(1.5).unwrap();
        assert_eq!(
            speed.effective(Duration::from_secs(1)),
            Duration::from_nanos(666_666_667)
        );
    }

    #[test]
    fn test_scale_exact() {
        assert_eq!(
            scale(Duration::from_millis(600), 0.5),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_rejects_non_positive_and_non_finite() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(Speed::new(bad).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn test_parse_with_and_without_suffix() {
        assert_eq!("1.5x".parse::<Speed>().unwrap().get(), 1.5);
        assert_eq!("2".parse::<Speed>().unwrap().get(), 2.0);
        assert_eq!(" 0.5X ".parse::<Speed>().unwrap().get(), 0.5);
        assert!("fast".parse::<Speed>().is_err());
        assert!("0x".parse::<Speed>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Speed::new(1.5).unwrap().to_string(), "1.5x");
        assert_eq!(Speed::NORMAL.to_string(), "1x");
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Speed>("0").is_err());
        assert_eq!(serde_json::from_str::<Speed>("2.5").unwrap().get(), 2.5);
    }

    #[test]
    fn test_admit_clamps_to_bounds() {
        let range = SpeedRange::default();
        assert_eq!(range.admit(10.0).unwrap().get(), 3.0);
        assert_eq!(range.admit(0.1).unwrap().get(), 0.5);
        assert_eq!(range.admit(1.5).unwrap().get(), 1.5);
    }

    #[test]
    fn test_admit_rejects_invalid() {
        let range = SpeedRange::default();
        assert_eq!(
            range.admit(-2.0).unwrap_err(),
            SequencerError::InvalidSpeed(-2.0)
        );
        assert!(range.admit(0.0).is_err());
    }

    #[test]
    fn test_default_steps() {
        let values: Vec<f64> = SpeedRange::default().steps().iter().map(|s| s.get()).collect();
        assert_eq!(values, [0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_faster_and_slower_saturate() {
        let range = SpeedRange::default();
        let one = Speed::NORMAL;
        assert_eq!(range.faster(one).get(), 1.5);
        assert_eq!(range.slower(one).get(), 0.5);
        assert_eq!(range.faster(Speed::new(3.0).unwrap()).get(), 3.0);
        assert_eq!(range.slower(Speed::new(0.5).unwrap()).get(), 0.5);
    }

    #[test]
    fn test_faster_from_off_grid_value() {
        let range = SpeedRange::default();
        assert_eq!(range.faster(Speed::new(1.2).unwrap()).get(), 1.5);
        assert_eq!(range.slower(Speed::new(1.2).unwrap()).get(), 1.0);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(SpeedRange::new(0.0, 3.0, 0.5).is_err());
        assert!(SpeedRange::new(2.0, 1.0, 0.5).is_err());
        assert!(SpeedRange::new(0.5, 3.0, 0.0).is_err());
        assert!(SpeedRange::new(0.5, f64::INFINITY, 0.5).is_err());
        assert!(SpeedRange::new(1.0, 1.0, 0.5).is_ok());
    }
}
