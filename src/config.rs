
use crate::control::range::{DEFAULT_CENTER, MAX_ROTATION, MIN_ROTATION};
use crate::control::{DIRECT_KIND, ESC_KIND};
use crate::link::Credentials;

pub const DEFAULT_UNIT: &str = "f1-operator";
pub const DEFAULT_TELEMETRY_PERIOD_MS: u64 = 100;
pub const DEFAULT_PWM_CHANNEL_COUNT: u8 = 16;
pub const DEFAULT_PWM_FREQUENCY: u16 = 180;

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub unit: String,
    pub credentials: Credentials,
    pub pwm: PwmConfig,
    pub steering: DeviceConfig,
    pub throttle: DeviceConfig,
    pub telemetry_period_ms: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            unit: DEFAULT_UNIT.into(),
            credentials: Credentials::default(),
            pwm: PwmConfig::default(),
            steering: DeviceConfig::default(),
            throttle: DeviceConfig {
                kind: ESC_KIND.into(),
                ..DeviceConfig::default()
            },
            telemetry_period_ms: DEFAULT_TELEMETRY_PERIOD_MS,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct PwmConfig {
    pub channel_count: u8,
    pub frequency: u16,
}

impl Default for PwmConfig {
    fn default() -> PwmConfig {
        PwmConfig {
            channel_count: DEFAULT_PWM_CHANNEL_COUNT,
            frequency: DEFAULT_PWM_FREQUENCY,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DeviceConfig {
    pub kind: String,
    pub min: f64,
    pub center: f64,
    pub max: f64,
}

impl DeviceConfig {
    pub fn motion_range(&self) -> (f64, f64, f64) {
        (self.min, self.center, self.max)
    }
}

impl Default for DeviceConfig {
    fn default() -> DeviceConfig {
        DeviceConfig {
            kind: DIRECT_KIND.into(),
            min: MIN_ROTATION,
            center: DEFAULT_CENTER,
            max: MAX_ROTATION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_both_devices() {
        let config = Config::default();
        assert_eq!(config.unit, DEFAULT_UNIT);
        assert_eq!(config.steering.kind, DIRECT_KIND);
        assert_eq!(config.throttle.kind, ESC_KIND);
        assert_eq!(config.steering.motion_range(), (0.0, 90.0, 180.0));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::de::from_str(
            r#"
            unit = "rover-2"

            [steering]
            min = 30.0
            center = 95.0
            max = 150.0
            "#,
        )
        .expect("valid config");
        assert_eq!(config.unit, "rover-2");
        assert_eq!(config.steering.motion_range(), (30.0, 95.0, 150.0));
        assert_eq!(config.steering.kind, DIRECT_KIND);
        assert_eq!(config.throttle.motion_range(), (0.0, 90.0, 180.0));
        assert_eq!(config.pwm.channel_count, DEFAULT_PWM_CHANNEL_COUNT);
        assert_eq!(config.telemetry_period_ms, DEFAULT_TELEMETRY_PERIOD_MS);
    }
}
