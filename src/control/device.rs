
use std::fmt;

use slog::Logger;

use crate::control::{ActuatorRange, DeviceKind};
use crate::errors::*;
use crate::pwm::{self, SharedPwm};

/// One actuated control surface bound to an exclusive PWM channel.
///
/// The stored `modifier` is the normalized command last applied; the
/// physical position is always derived from it through the range, never
/// stored on its own.
pub struct ControlDevice {
    log: Logger,
    kind: DeviceKind,
    channel: u8,
    range: ActuatorRange,
    modifier: f64,
    pwm: SharedPwm,
}

impl ControlDevice {
    /// Creates the device and immediately drives the actuator to its
    /// center position.
    pub fn new(
        log: &Logger,
        kind: DeviceKind,
        motion_range: (f64, f64, f64),
        pwm: Option<SharedPwm>,
    ) -> Result<ControlDevice> {
        let pwm = match pwm {
            Some(pwm) => pwm,
            None => return Err(ErrorKind::ActuatorUnavailable.into()),
        };
        let (min, center, max) = motion_range;
        let range = ActuatorRange::new(min, center, max)?;
        let channel = kind.channel();
        if channel >= pwm::lock(&pwm).channel_count() {
            return Err(ErrorKind::ActuatorUnavailable.into());
        }

        let log = log.new(o!("device" => kind.as_str()));
        info!(log, "creating device";
              "min" => range.min(), "center" => range.center(), "max" => range.max());
        let mut device = ControlDevice {
            log,
            kind,
            channel,
            range,
            modifier: 0.0,
            pwm,
        };
        device.write(center)?;
        Ok(device)
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn range(&self) -> ActuatorRange {
        self.range
    }

    /// Replaces the motion range; the new range is validated before the
    /// swap so no caller can observe a half-updated one.
    pub fn set_range(&mut self, motion_range: (f64, f64, f64)) -> Result<()> {
        let (min, center, max) = motion_range;
        let range = ActuatorRange::new(min, center, max)?;
        debug!(self.log, "updating motion range";
               "min" => min, "center" => center, "max" => max);
        self.range = range;
        Ok(())
    }

    /// Applies a normalized command. Out-of-domain modifiers are rejected
    /// rather than clamped so upstream bugs surface.
    pub fn modify_position(&mut self, modifier: f64) -> Result<()> {
        if !modifier.is_finite() || modifier < -1.0 || modifier > 1.0 {
            return Err(ErrorKind::PositionOutOfRange(modifier, -1.0, 1.0).into());
        }
        let position = self.range.position_for(modifier);
        if !self.range.contains(position) {
            return Err(ErrorKind::PositionOutOfRange(
                position,
                self.range.min(),
                self.range.max(),
            )
            .into());
        }
        debug!(self.log, "updating position";
               "modifier" => modifier, "position" => position);
        self.write(position)?;
        self.modifier = modifier;
        Ok(())
    }

    /// Absolute variant of `modify_position`, used for calibration. The
    /// stored modifier is derived back from the position so telemetry
    /// stays truthful.
    pub fn set_position(&mut self, position: f64) -> Result<()> {
        if !self.range.contains(position) {
            return Err(ErrorKind::PositionOutOfRange(
                position,
                self.range.min(),
                self.range.max(),
            )
            .into());
        }
        debug!(self.log, "updating position"; "position" => position);
        self.write(position)?;
        self.modifier = self.range.modifier_for(position);
        Ok(())
    }

    pub fn modifier(&self) -> f64 {
        self.modifier
    }

    pub fn position(&self) -> f64 {
        self.range.position_for(self.modifier)
    }

    /// Fail-safe action: back to center.
    pub fn set_to_neutral(&mut self) -> Result<()> {
        debug!(self.log, "returning to neutral");
        let center = self.range.center();
        self.write(center)?;
        self.modifier = 0.0;
        Ok(())
    }

    /// Zeroes the physical pulse entirely. Distinct from neutral: after
    /// this the actuator holds no position at all.
    pub fn stop(&mut self) -> Result<()> {
        info!(self.log, "stopping pulse");
        pwm::lock(&self.pwm).stop(self.channel)
    }

    fn write(&mut self, position: f64) -> Result<()> {
        pwm::lock(&self.pwm).write_pulse(self.channel, position)
    }
}

impl fmt::Debug for ControlDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlDevice")
            .field("kind", &self.kind)
            .field("channel", &self.channel)
            .field("range", &self.range)
            .field("modifier", &self.modifier)
            .finish()
    }
}
