
pub mod device;
pub mod range;

pub use self::device::ControlDevice;
pub use self::range::ActuatorRange;

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::*;

pub const DIRECT_KIND: &str = "direction";
pub const ESC_KIND: &str = "esc";

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum DeviceKind {
    Direct,
    Esc,
}

impl DeviceKind {
    /// Channel assignment is fixed: one exclusive PWM channel per kind.
    pub fn channel(&self) -> u8 {
        match *self {
            DeviceKind::Direct => 0,
            DeviceKind::Esc => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            DeviceKind::Direct => DIRECT_KIND,
            DeviceKind::Esc => ESC_KIND,
        }
    }
}

impl FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<DeviceKind> {
        match s {
            DIRECT_KIND => Ok(DeviceKind::Direct),
            ESC_KIND => Ok(DeviceKind::Esc),
            other => Err(ErrorKind::UnsupportedDeviceKind(other.into()).into()),
        }
    }
}

/// The dispatch path and the telemetry cycle share the devices; the
/// mutex serializes mutation per device.
pub type SharedDevice = Arc<Mutex<ControlDevice>>;

pub fn shared(device: ControlDevice) -> SharedDevice {
    Arc::new(Mutex::new(device))
}

pub fn lock(device: &SharedDevice) -> MutexGuard<'_, ControlDevice> {
    match device.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
