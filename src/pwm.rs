
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use slog::Logger;

use crate::errors::*;

pub const SUPPORTED_CHANNEL_COUNTS: [u8; 2] = [8, 16];
pub const DEFAULT_FREQUENCY: u16 = 90;

/// PWM actuator capability. Hardware bindings (servo hat, GPIO) live
/// outside this crate; everything here talks to the capability through
/// this trait so the control path runs unchanged on the bench.
pub trait PwmOutput: Send {
    fn channel_count(&self) -> u8;
    fn write_pulse(&mut self, channel: u8, position: f64) -> Result<()>;
    fn stop(&mut self, channel: u8) -> Result<()>;
}

pub type SharedPwm = Arc<Mutex<dyn PwmOutput>>;

pub fn lock(pwm: &SharedPwm) -> MutexGuard<'_, dyn PwmOutput + 'static> {
    match pwm.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Bench driver: validates the channel layout and traces every pulse.
pub struct PwmDriver {
    log: Logger,
    frequency: u16,
    channels: u8,
}

impl PwmDriver {
    pub fn initialize(log: &Logger, channels: u8, frequency: u16) -> Result<PwmDriver> {
        if !SUPPORTED_CHANNEL_COUNTS.contains(&channels) {
            return Err(ErrorKind::UnsupportedChannelCount(channels).into());
        }
        let log = log.new(o!("driver" => "pwm"));
        info!(log, "PWM driver initialized";
              "channels" => channels, "frequency" => frequency);
        Ok(PwmDriver {
            log,
            frequency,
            channels,
        })
    }

    pub fn into_shared(self) -> SharedPwm {
        Arc::new(Mutex::new(self))
    }
}

impl fmt::Debug for PwmDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PwmDriver")
            .field("channels", &self.channels)
            .field("frequency", &self.frequency)
            .finish()
    }
}

impl PwmOutput for PwmDriver {
    fn channel_count(&self) -> u8 {
        self.channels
    }

    fn write_pulse(&mut self, channel: u8, position: f64) -> Result<()> {
        debug!(self.log, "pulse";
               "channel" => channel, "position" => position, "frequency" => self.frequency);
        Ok(())
    }

    fn stop(&mut self, channel: u8) -> Result<()> {
        debug!(self.log, "pulse stopped"; "channel" => channel);
        Ok(())
    }
}
