
//! In-process doubles for the two hardware-facing capabilities. The
//! mocks record every operation so tests (and the bench binary) can
//! assert on write ordering, and they let the caller play the broker.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::*;
use crate::link::{Credentials, LastWill, LinkEvent, Transport};
use crate::pwm::{PwmOutput, SharedPwm};

#[derive(PartialEq, Clone, Debug)]
pub enum PulseRecord {
    Write { channel: u8, position: f64 },
    Stop { channel: u8 },
}

/// A PWM capability that records pulses instead of driving hardware.
#[derive(Clone)]
pub struct MockPwm {
    channels: u8,
    fail_writes: Arc<Mutex<bool>>,
    pulses: Arc<Mutex<Vec<PulseRecord>>>,
}

impl MockPwm {
    pub fn new(channels: u8) -> MockPwm {
        MockPwm {
            channels,
            fail_writes: Arc::new(Mutex::new(false)),
            pulses: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn into_shared(self) -> SharedPwm {
        Arc::new(Mutex::new(self))
    }

    pub fn pulses(&self) -> Vec<PulseRecord> {
        self.lock_pulses().clone()
    }

    /// The last position written to a channel, if any.
    pub fn last_write(&self, channel: u8) -> Option<f64> {
        self.lock_pulses().iter().rev().find_map(|record| match *record {
            PulseRecord::Write {
                channel: written,
                position,
            } if written == channel => Some(position),
            _ => None,
        })
    }

    /// Makes every subsequent pulse write fail, to exercise the fatal
    /// actuator path.
    pub fn fail_writes(&self, fail: bool) {
        match self.fail_writes.lock() {
            Ok(mut guard) => *guard = fail,
            Err(poisoned) => *poisoned.into_inner() = fail,
        }
    }

    fn lock_pulses(&self) -> MutexGuard<'_, Vec<PulseRecord>> {
        match self.pulses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn writes_failing(&self) -> bool {
        match self.fail_writes.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl PwmOutput for MockPwm {
    fn channel_count(&self) -> u8 {
        self.channels
    }

    fn write_pulse(&mut self, channel: u8, position: f64) -> Result<()> {
        if self.writes_failing() {
            return Err(ErrorKind::ActuatorWrite(channel, "mock write failure".into()).into());
        }
        self.lock_pulses().push(PulseRecord::Write { channel, position });
        Ok(())
    }

    fn stop(&mut self, channel: u8) -> Result<()> {
        self.lock_pulses().push(PulseRecord::Stop { channel });
        Ok(())
    }
}

#[derive(PartialEq, Clone, Debug)]
pub enum TransportOp {
    Connect,
    Publish {
        topic: String,
        payload: Vec<u8>,
        retain: bool,
    },
    Subscribe(Vec<String>),
    Disconnect,
}

struct Inner {
    connected: bool,
    last_will: Option<LastWill>,
    ops: Vec<TransportOp>,
    events: Option<Sender<LinkEvent>>,
}

/// Loopback transport: records operations and lets the caller play the
/// broker side (complete the handshake, deliver messages, drop the
/// connection).
#[derive(Clone)]
pub struct MockTransport {
    auto_connack: bool,
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    /// A transport whose broker accepts the connection immediately.
    pub fn new() -> MockTransport {
        MockTransport {
            auto_connack: true,
            inner: Arc::new(Mutex::new(Inner {
                connected: false,
                last_will: None,
                ops: Vec::new(),
                events: None,
            })),
        }
    }

    /// A transport whose connection handshake is completed by hand with
    /// `fire_connected`.
    pub fn manual() -> MockTransport {
        let mut transport = MockTransport::new();
        transport.auto_connack = false;
        transport
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn last_will(&self) -> Option<LastWill> {
        self.lock().last_will.clone()
    }

    pub fn ops(&self) -> Vec<TransportOp> {
        self.lock().ops.clone()
    }

    /// Broker side: complete the connection handshake.
    pub fn fire_connected(&self) {
        self.send(LinkEvent::Connected);
    }

    /// Broker side: signal a lost connection.
    pub fn fire_disconnected(&self) {
        self.send(LinkEvent::Disconnected);
    }

    /// Broker side: deliver an inbound message.
    pub fn deliver(&self, topic: &str, payload: &[u8]) {
        self.send(LinkEvent::Message {
            topic: topic.into(),
            payload: payload.to_vec(),
        });
    }

    fn send(&self, event: LinkEvent) {
        if let Some(ref events) = self.lock().events {
            let _ = events.send(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Transport for MockTransport {
    fn connect(
        &mut self,
        _credentials: &Credentials,
        last_will: LastWill,
    ) -> Result<Receiver<LinkEvent>> {
        let (tx, rx) = mpsc::channel();
        {
            let mut inner = self.lock();
            inner.connected = true;
            inner.last_will = Some(last_will);
            inner.events = Some(tx.clone());
            inner.ops.push(TransportOp::Connect);
        }
        if self.auto_connack {
            let _ = tx.send(LinkEvent::Connected);
        }
        Ok(rx)
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(ErrorKind::Link("publish while disconnected".into()).into());
        }
        inner.ops.push(TransportOp::Publish {
            topic: topic.into(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topics: &[String]) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(ErrorKind::Link("subscribe while disconnected".into()).into());
        }
        inner.ops.push(TransportOp::Subscribe(topics.to_vec()));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.connected = false;
        inner.events = None;
        inner.ops.push(TransportOp::Disconnect);
        Ok(())
    }
}
