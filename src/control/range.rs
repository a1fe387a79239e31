
use crate::errors::*;

// Absolute hardware limits, in degrees.
pub const MIN_ROTATION: f64 = 0.0;
pub const DEFAULT_CENTER: f64 = 90.0;
pub const MAX_ROTATION: f64 = 180.0;

/// Validated physical envelope of one actuator: `min < center < max`,
/// inside the absolute hardware limits. The range may be asymmetric
/// around its center.
#[derive(PartialEq, Copy, Clone, Debug)]
pub struct ActuatorRange {
    min: f64,
    center: f64,
    max: f64,
}

impl ActuatorRange {
    pub fn new(min: f64, center: f64, max: f64) -> Result<ActuatorRange> {
        ActuatorRange::validate(min, center, max)?;
        Ok(ActuatorRange { min, center, max })
    }

    /// Each bound is checked on its own so the error names the one that
    /// failed.
    pub fn validate(min: f64, center: f64, max: f64) -> Result<()> {
        if min < MIN_ROTATION || min >= max {
            return Err(ErrorKind::RangeInvalid("min", min, center, max).into());
        }
        if max > MAX_ROTATION || max <= min {
            return Err(ErrorKind::RangeInvalid("max", min, center, max).into());
        }
        if center <= min || center >= max {
            return Err(ErrorKind::RangeInvalid("center", min, center, max).into());
        }
        Ok(())
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn center(&self) -> f64 {
        self.center
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Asymmetric scaling: the halves above and below center are scaled
    /// independently, so ±1.0 reaches exactly `max`/`min` even when the
    /// range is not centered, and 0.0 is exactly `center`.
    pub fn position_for(&self, modifier: f64) -> f64 {
        if modifier > 0.0 {
            self.center + modifier * (self.max - self.center)
        } else {
            self.center + modifier * (self.center - self.min)
        }
    }

    /// Inverse of `position_for`.
    pub fn modifier_for(&self, position: f64) -> f64 {
        if position >= self.center {
            (position - self.center) / (self.max - self.center)
        } else {
            (position - self.center) / (self.center - self.min)
        }
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.min && position <= self.max
    }
}

impl Default for ActuatorRange {
    fn default() -> ActuatorRange {
        ActuatorRange {
            min: MIN_ROTATION,
            center: DEFAULT_CENTER,
            max: MAX_ROTATION,
        }
    }
}
