
use std::sync::mpsc::Receiver;

use slog::Logger;

use crate::control::{self, SharedDevice};
use crate::errors::*;
use crate::messages::{self, CommandMessage, ConnState, ConnectionStateMsg, TelemetryMessage};

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Credentials {
        Credentials {
            username: "f1-operator".into(),
            password: "12345".into(),
        }
    }
}

/// Pre-registered with the transport; the broker publishes it on an
/// ungraceful drop without any code running on this side.
#[derive(PartialEq, Clone, Debug)]
pub struct LastWill {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

#[derive(PartialEq, Clone, Debug)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Message { topic: String, payload: Vec<u8> },
}

/// Publish/subscribe transport capability. The concrete broker binding
/// lives outside this crate; it delivers connection events and inbound
/// messages over the channel returned by `connect`. Reconnection policy
/// is the transport's own business.
pub trait Transport: Send {
    fn connect(&mut self, credentials: &Credentials, last_will: LastWill)
        -> Result<Receiver<LinkEvent>>;
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<()>;
    fn subscribe(&mut self, topics: &[String]) -> Result<()>;
    fn disconnect(&mut self) -> Result<()>;
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum LinkPhase {
    Disconnected,
    Connecting,
    Online,
}

/// Owns the transport session: lifecycle, last-will safety semantics,
/// command dispatch to the control devices and telemetry publication.
pub struct MissionLink {
    log: Logger,
    unit: String,
    steering: SharedDevice,
    throttle: SharedDevice,
    transport: Box<dyn Transport>,
    phase: LinkPhase,
}

impl MissionLink {
    pub fn new(
        log: &Logger,
        unit: &str,
        steering: SharedDevice,
        throttle: SharedDevice,
        transport: Box<dyn Transport>,
    ) -> MissionLink {
        MissionLink {
            log: log.new(o!("module" => "link")),
            unit: unit.into(),
            steering,
            throttle,
            transport,
            phase: LinkPhase::Disconnected,
        }
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    /// Opens the transport session. The retained offline last-will is
    /// registered before the connection opens, so an ungraceful drop is
    /// announced by the broker without relying on this process.
    pub fn connect(&mut self, credentials: &Credentials) -> Result<Receiver<LinkEvent>> {
        let will_msg = ConnectionStateMsg::new(&self.unit, ConnState::Offline);
        let last_will = LastWill {
            topic: will_msg.topic(),
            payload: will_msg.encode(),
            retain: true,
        };
        info!(self.log, "connecting to mission broker");
        let events = self.transport.connect(credentials, last_will)?;
        self.phase = LinkPhase::Connecting;
        Ok(events)
    }

    pub fn handle_event(&mut self, event: LinkEvent) -> Result<()> {
        match event {
            LinkEvent::Connected => self.on_connected(),
            LinkEvent::Disconnected => {
                warn!(self.log, "disconnected from mission broker");
                self.phase = LinkPhase::Disconnected;
                Ok(())
            }
            LinkEvent::Message { topic, payload } => self.dispatch(&topic, &payload),
        }
    }

    /// The only path that announces online. Subscriptions are armed here,
    /// after the connect event, so no command can arrive earlier. A blip
    /// racing the connect event is the transport's to retry; the link
    /// stays `Connecting` and the next connect event runs the transition
    /// again.
    fn on_connected(&mut self) -> Result<()> {
        info!(self.log, "connected to mission broker");
        let online = ConnectionStateMsg::new(&self.unit, ConnState::Online);
        let command_topic = messages::command_topic(&self.unit);
        let armed = self
            .transport
            .publish(&online.topic(), &online.encode(), true)
            .and_then(|()| self.transport.subscribe(&[command_topic]));
        if let Err(err) = armed {
            warn!(self.log, "online transition failed: {}", err);
            return Ok(());
        }
        self.phase = LinkPhase::Online;
        Ok(())
    }

    /// One malformed or foreign command must not halt control of the
    /// vehicle: validation failures are logged and the command dropped. A
    /// failed actuator write is not maskable and propagates to the caller.
    fn dispatch(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if topic != messages::command_topic(&self.unit) {
            debug!(self.log, "ignoring message"; "topic" => topic);
            return Ok(());
        }
        let command = match CommandMessage::decode(&self.unit, payload) {
            Ok(command) => command,
            Err(err) => {
                warn!(self.log, "dropping command: {}", err);
                return Ok(());
            }
        };
        debug!(self.log, "received command";
               "steering" => command.steering, "throttle" => command.throttle);
        self.apply(&self.steering, command.steering)?;
        self.apply(&self.throttle, command.throttle)?;
        Ok(())
    }

    fn apply(&self, device: &SharedDevice, modifier: f64) -> Result<()> {
        match control::lock(device).modify_position(modifier) {
            Ok(()) => Ok(()),
            Err(err) => {
                if err.kind().is_fatal() {
                    return Err(err);
                }
                warn!(self.log, "dropping command: {}", err);
                Ok(())
            }
        }
    }

    /// Periodic cycle: reads both modifiers and publishes them. Fire and
    /// forget; a failed publish is logged and never stalls the loop.
    pub fn publish_telemetry(&mut self) {
        if self.phase != LinkPhase::Online {
            debug!(self.log, "telemetry skipped, link not online");
            return;
        }
        let msg = TelemetryMessage {
            unit: self.unit.clone(),
            steering: control::lock(&self.steering).modifier(),
            throttle: control::lock(&self.throttle).modifier(),
        };
        if let Err(err) = self.transport.publish(&msg.topic(), &msg.encode(), false) {
            warn!(self.log, "telemetry publish failed: {}", err);
        }
    }

    /// Graceful shutdown always wins the race against the last-will: both
    /// surfaces go neutral, the retained offline state is published, and
    /// only then does the connection close.
    pub fn stop(&mut self) -> Result<()> {
        info!(self.log, "stopping mission link");
        if let Err(err) = control::lock(&self.steering).set_to_neutral() {
            error!(self.log, "steering neutral failed: {}", err);
        }
        if let Err(err) = control::lock(&self.throttle).set_to_neutral() {
            error!(self.log, "throttle neutral failed: {}", err);
        }
        let offline = ConnectionStateMsg::new(&self.unit, ConnState::Offline);
        if let Err(err) = self
            .transport
            .publish(&offline.topic(), &offline.encode(), true)
        {
            warn!(self.log, "offline publish failed: {}", err);
        }
        self.transport.disconnect()?;
        self.phase = LinkPhase::Disconnected;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{self, ControlDevice, DeviceKind, SharedDevice};
    use crate::mock::{MockPwm, MockTransport, PulseRecord, TransportOp};

    const UNIT: &str = "f1-operator";

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    struct Rig {
        link: MissionLink,
        transport: MockTransport,
        pwm: MockPwm,
        steering: SharedDevice,
        throttle: SharedDevice,
    }

    fn rig(transport: MockTransport) -> Rig {
        let log = test_logger();
        let pwm = MockPwm::new(16);
        let steering = control::shared(
            ControlDevice::new(
                &log,
                DeviceKind::Direct,
                (0.0, 90.0, 180.0),
                Some(pwm.clone().into_shared()),
            )
            .expect("steering device"),
        );
        let throttle = control::shared(
            ControlDevice::new(
                &log,
                DeviceKind::Esc,
                (0.0, 90.0, 180.0),
                Some(pwm.clone().into_shared()),
            )
            .expect("throttle device"),
        );
        let link = MissionLink::new(
            &log,
            UNIT,
            steering.clone(),
            throttle.clone(),
            Box::new(transport.clone()),
        );
        Rig {
            link,
            transport,
            pwm,
            steering,
            throttle,
        }
    }

    fn online_rig() -> Rig {
        let mut rig = self::rig(MockTransport::new());
        let events = rig.link.connect(&Credentials::default()).expect("connect");
        let event = events.recv().expect("connack");
        rig.link.handle_event(event).expect("online transition");
        rig
    }

    fn command(steering: f64, throttle: f64) -> Vec<u8> {
        CommandMessage {
            unit: UNIT.into(),
            steering,
            throttle,
        }
        .encode()
    }

    #[test]
    fn connect_registers_the_offline_will_first() {
        let mut rig = rig(MockTransport::manual());
        let events = rig.link.connect(&Credentials::default()).expect("connect");
        assert_eq!(rig.link.phase(), LinkPhase::Connecting);

        let will = rig.transport.last_will().expect("will registered");
        assert!(will.retain);
        assert_eq!(will.topic, messages::connection_topic(UNIT));
        let state = ConnectionStateMsg::decode(UNIT, &will.payload).expect("will payload");
        assert_eq!(state.state, ConnState::Offline);

        rig.transport.fire_connected();
        let event = events.recv().expect("connack");
        rig.link.handle_event(event).expect("online transition");
        assert_eq!(rig.link.phase(), LinkPhase::Online);
    }

    #[test]
    fn connected_event_announces_online_then_subscribes() {
        let rig = online_rig();
        assert_eq!(rig.link.phase(), LinkPhase::Online);
        let ops = rig.transport.ops();
        match ops[1] {
            TransportOp::Publish {
                ref topic, retain, ..
            } => {
                assert_eq!(topic, &messages::connection_topic(UNIT));
                assert!(retain);
            }
            ref other => panic!("unexpected op: {:?}", other),
        }
        assert_eq!(
            ops[2],
            TransportOp::Subscribe(vec![messages::command_topic(UNIT)])
        );
    }

    #[test]
    fn link_blip_during_the_online_transition_stays_connecting() {
        let mut rig = rig(MockTransport::manual());
        rig.link.connect(&Credentials::default()).expect("connect");

        // The broker drops the session right after accepting it, so the
        // online publish fails. The transport retries on its own; the
        // link must wait for the next connect event, not abort the run.
        let mut broker = rig.transport.clone();
        broker.disconnect().expect("broker side drop");
        rig.link
            .handle_event(LinkEvent::Connected)
            .expect("transient link error is not fatal");
        assert_eq!(rig.link.phase(), LinkPhase::Connecting);
        assert!(!ErrorKind::Link("publish while disconnected".into()).is_fatal());
    }

    #[test]
    fn commands_are_routed_to_both_devices() {
        let mut rig = online_rig();
        rig.link
            .handle_event(LinkEvent::Message {
                topic: messages::command_topic(UNIT),
                payload: command(0.5, -0.25),
            })
            .expect("dispatch");
        assert_eq!(control::lock(&rig.steering).modifier(), 0.5);
        assert_eq!(control::lock(&rig.throttle).modifier(), -0.25);
        assert_eq!(rig.pwm.last_write(0), Some(135.0));
        assert_eq!(rig.pwm.last_write(1), Some(67.5));
    }

    #[test]
    fn malformed_commands_are_dropped_without_error() {
        let mut rig = online_rig();
        rig.link
            .handle_event(LinkEvent::Message {
                topic: messages::command_topic(UNIT),
                payload: b"not json".to_vec(),
            })
            .expect("malformed commands are non-fatal");
        assert_eq!(control::lock(&rig.steering).modifier(), 0.0);
    }

    #[test]
    fn foreign_commands_are_dropped_without_error() {
        let mut rig = online_rig();
        let foreign = CommandMessage {
            unit: "other".into(),
            steering: 1.0,
            throttle: 1.0,
        };
        rig.link
            .handle_event(LinkEvent::Message {
                topic: messages::command_topic(UNIT),
                payload: foreign.encode(),
            })
            .expect("foreign commands are non-fatal");
        assert_eq!(control::lock(&rig.steering).modifier(), 0.0);
        assert_eq!(control::lock(&rig.throttle).modifier(), 0.0);
    }

    #[test]
    fn out_of_domain_modifiers_are_dropped_without_error() {
        let mut rig = online_rig();
        rig.link
            .handle_event(LinkEvent::Message {
                topic: messages::command_topic(UNIT),
                payload: command(7.0, 0.0),
            })
            .expect("validation failures are non-fatal");
        assert_eq!(control::lock(&rig.steering).modifier(), 0.0);
    }

    #[test]
    fn actuator_write_failures_propagate() {
        let mut rig = online_rig();
        rig.pwm.fail_writes(true);
        let err = rig
            .link
            .handle_event(LinkEvent::Message {
                topic: messages::command_topic(UNIT),
                payload: command(0.5, 0.0),
            })
            .expect_err("write failures are fatal");
        match *err.kind() {
            ErrorKind::ActuatorWrite(..) => {}
            ref other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn telemetry_mirrors_the_current_modifiers() {
        let mut rig = online_rig();
        rig.link
            .handle_event(LinkEvent::Message {
                topic: messages::command_topic(UNIT),
                payload: command(-1.0, 0.75),
            })
            .expect("dispatch");
        rig.link.publish_telemetry();

        let ops = rig.transport.ops();
        let telemetry = match ops.last() {
            Some(&TransportOp::Publish {
                ref topic,
                ref payload,
                retain,
            }) => {
                assert_eq!(topic, &messages::state_topic(UNIT));
                assert!(!retain);
                TelemetryMessage::decode(UNIT, payload).expect("telemetry payload")
            }
            other => panic!("unexpected op: {:?}", other),
        };
        assert_eq!(telemetry.steering, -1.0);
        assert_eq!(telemetry.throttle, 0.75);
    }

    #[test]
    fn telemetry_is_skipped_while_not_online() {
        let mut rig = rig(MockTransport::manual());
        rig.link.connect(&Credentials::default()).expect("connect");
        rig.link.publish_telemetry();
        let publishes = rig
            .transport
            .ops()
            .into_iter()
            .filter(|op| match *op {
                TransportOp::Publish { .. } => true,
                _ => false,
            })
            .count();
        assert_eq!(publishes, 0);
    }

    #[test]
    fn stop_neutrals_then_announces_offline_then_disconnects() {
        let mut rig = online_rig();
        rig.link
            .handle_event(LinkEvent::Message {
                topic: messages::command_topic(UNIT),
                payload: command(1.0, -1.0),
            })
            .expect("dispatch");
        rig.link.stop().expect("stop");
        assert_eq!(rig.link.phase(), LinkPhase::Disconnected);

        // Both surfaces went back to center before the link closed.
        let pulses = rig.pwm.pulses();
        let tail = &pulses[pulses.len() - 2..];
        assert_eq!(
            tail,
            &[
                PulseRecord::Write {
                    channel: 0,
                    position: 90.0,
                },
                PulseRecord::Write {
                    channel: 1,
                    position: 90.0,
                },
            ]
        );

        let ops = rig.transport.ops();
        match ops[ops.len() - 2] {
            TransportOp::Publish {
                ref topic,
                ref payload,
                retain,
            } => {
                assert_eq!(topic, &messages::connection_topic(UNIT));
                assert!(retain);
                let state = ConnectionStateMsg::decode(UNIT, payload).expect("offline payload");
                assert_eq!(state.state, ConnState::Offline);
            }
            ref other => panic!("unexpected op: {:?}", other),
        }
        assert_eq!(ops[ops.len() - 1], TransportOp::Disconnect);
    }
}
