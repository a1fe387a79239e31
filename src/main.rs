
#[macro_use]
extern crate slog;

use std::process;
use std::time::Duration;

use slog::{Drain, Logger};

use mission_operator::config::{Config, DeviceConfig};
use mission_operator::control::{self, ControlDevice, DeviceKind, SharedDevice};
use mission_operator::errors::*;
use mission_operator::link::MissionLink;
use mission_operator::mock::MockTransport;
use mission_operator::operator::Operator;
use mission_operator::pwm::{PwmDriver, SharedPwm};
use mission_operator::util;

fn main() {
    let log = init_logger();
    if let Err(ref e) = run(&log) {
        crit!(log, "{}", util::get_error_trace(e));
        process::exit(1);
    }
}

fn init_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("app" => "mission-operator"))
}

fn run(log: &Logger) -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(log, "loading configuration"; "path" => &path);
            util::load_config_from_file(&path)?
        }
        None => Config::default(),
    };

    let pwm = PwmDriver::initialize(log, config.pwm.channel_count, config.pwm.frequency)?
        .into_shared();
    let steering = build_device(log, &config.steering, &pwm)?;
    let throttle = build_device(log, &config.throttle, &pwm)?;

    // The broker binding lives outside this crate; the loopback transport
    // stands in for it on the bench.
    let transport = MockTransport::new();
    let link = MissionLink::new(
        log,
        &config.unit,
        steering.clone(),
        throttle.clone(),
        Box::new(transport),
    );
    let mut operator = Operator::new(
        log,
        link,
        steering,
        throttle,
        Duration::from_millis(config.telemetry_period_ms),
    );

    let shutdown = operator.shutdown_handle();
    ctrlc::set_handler(move || {
        let _ = shutdown.send(());
    })
    .chain_err(|| "Failed to install the shutdown handler")?;

    operator.run(&config.credentials)
}

fn build_device(log: &Logger, config: &DeviceConfig, pwm: &SharedPwm) -> Result<SharedDevice> {
    let kind: DeviceKind = config.kind.parse()?;
    let device = ControlDevice::new(log, kind, config.motion_range(), Some(pwm.clone()))?;
    Ok(control::shared(device))
}
