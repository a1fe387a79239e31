
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use slog::Logger;

use crate::control::{self, SharedDevice};
use crate::errors::*;
use crate::link::{Credentials, MissionLink};

/// Top-level context: owns the devices, the mission link and the
/// telemetry clock. Replaces process-wide globals so the whole control
/// loop runs against in-process capabilities in tests.
pub struct Operator {
    log: Logger,
    link: MissionLink,
    steering: SharedDevice,
    throttle: SharedDevice,
    period: Duration,
    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
}

impl Operator {
    pub fn new(
        log: &Logger,
        link: MissionLink,
        steering: SharedDevice,
        throttle: SharedDevice,
        period: Duration,
    ) -> Operator {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        Operator {
            log: log.new(o!("module" => "operator")),
            link,
            steering,
            throttle,
            period,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Handle for the bootstrap to request shutdown (ctrl-c handler).
    pub fn shutdown_handle(&self) -> Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Connects the link and runs the control loop until shutdown is
    /// requested or a fatal actuator failure surfaces. The telemetry wait
    /// doubles as the scheduler: the loop sleeps on the transport event
    /// channel, bounded by the next telemetry deadline.
    pub fn run(&mut self, credentials: &Credentials) -> Result<()> {
        info!(self.log, "starting mission operator");
        let events = self.link.connect(credentials)?;
        let mut next_tick = Instant::now() + self.period;

        let result = loop {
            match self.shutdown_rx.try_recv() {
                Ok(()) => break Ok(()),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }

            let now = Instant::now();
            if now >= next_tick {
                self.link.publish_telemetry();
                next_tick += self.period;
                continue;
            }

            match events.recv_timeout(next_tick - now) {
                Ok(event) => {
                    if let Err(err) = self.link.handle_event(event) {
                        break Err(err);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(self.log, "transport event channel closed");
                    break Ok(());
                }
            }
        };

        match result {
            Ok(()) => self.shutdown(),
            Err(err) => {
                self.force_safe();
                Err(err)
            }
        }
    }

    /// Orderly exit: link stop sequence first (neutral, retained offline,
    /// disconnect), then zero both pulses so the actuators neither fight
    /// external forces nor drain power.
    fn shutdown(&mut self) -> Result<()> {
        info!(self.log, "stopping mission operator");
        self.link.stop()?;
        control::lock(&self.steering).stop()?;
        control::lock(&self.throttle).stop()?;
        Ok(())
    }

    /// A failed actuator write is a safety hazard, not a condition to
    /// retry: run the same stop sequence but swallow secondary failures so
    /// the original error reaches the caller.
    fn force_safe(&mut self) {
        error!(self.log, "actuator failure, forcing safe state");
        if let Err(err) = self.link.stop() {
            error!(self.log, "link stop failed: {}", err);
        }
        if let Err(err) = control::lock(&self.steering).stop() {
            error!(self.log, "steering stop failed: {}", err);
        }
        if let Err(err) = control::lock(&self.throttle).stop() {
            error!(self.log, "throttle stop failed: {}", err);
        }
    }
}
