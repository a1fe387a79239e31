
//! Wire messages exchanged over the mission link.
//!
//! Every message is a JSON envelope `{unit, payload}`; the topic is
//! namespaced by the same unit id. Topic and field names are part of the
//! wire contract and must stay stable.

use crate::errors::*;

pub fn connection_topic(unit: &str) -> String {
    format!("{}/connection", unit)
}

pub fn command_topic(unit: &str) -> String {
    format!("{}/command", unit)
}

pub fn state_topic(unit: &str) -> String {
    format!("{}/state", unit)
}

#[derive(Serialize, Deserialize, PartialEq, Eq, Copy, Clone, Debug)]
pub enum ConnState {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "offline")]
    Offline,
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    unit: String,
    payload: T,
}

#[derive(Serialize, Deserialize)]
struct StatePayload {
    state: ConnState,
}

#[derive(Serialize, Deserialize)]
struct AxisPayload {
    steering: f64,
    throttle: f64,
}

fn decode_envelope<'a, T>(expected_unit: &str, raw: &'a [u8]) -> Result<Envelope<T>>
where
    T: serde::Deserialize<'a>,
{
    let envelope: Envelope<T> = serde_json::from_slice(raw)
        .map_err(|e| Error::from(ErrorKind::MalformedMessage(e.to_string())))?;
    if envelope.unit != expected_unit {
        return Err(ErrorKind::ForeignUnit(expected_unit.into(), envelope.unit).into());
    }
    Ok(envelope)
}

/// Published retained on `{unit}/connection`; the `Offline` form doubles
/// as the transport's last-will payload.
#[derive(PartialEq, Clone, Debug)]
pub struct ConnectionStateMsg {
    pub unit: String,
    pub state: ConnState,
}

impl ConnectionStateMsg {
    pub fn new(unit: &str, state: ConnState) -> ConnectionStateMsg {
        ConnectionStateMsg {
            unit: unit.into(),
            state,
        }
    }

    pub fn topic(&self) -> String {
        connection_topic(&self.unit)
    }

    pub fn encode(&self) -> Vec<u8> {
        let envelope = Envelope {
            unit: self.unit.clone(),
            payload: StatePayload { state: self.state },
        };
        serde_json::to_vec(&envelope).expect("connection state message always serializes")
    }

    pub fn decode(expected_unit: &str, raw: &[u8]) -> Result<ConnectionStateMsg> {
        let envelope: Envelope<StatePayload> = decode_envelope(expected_unit, raw)?;
        Ok(ConnectionStateMsg {
            unit: envelope.unit,
            state: envelope.payload.state,
        })
    }
}

/// Inbound command on `{unit}/command`.
#[derive(PartialEq, Clone, Debug)]
pub struct CommandMessage {
    pub unit: String,
    pub steering: f64,
    pub throttle: f64,
}

impl CommandMessage {
    pub fn decode(expected_unit: &str, raw: &[u8]) -> Result<CommandMessage> {
        let envelope: Envelope<AxisPayload> = decode_envelope(expected_unit, raw)?;
        Ok(CommandMessage {
            unit: envelope.unit,
            steering: envelope.payload.steering,
            throttle: envelope.payload.throttle,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let envelope = Envelope {
            unit: self.unit.clone(),
            payload: AxisPayload {
                steering: self.steering,
                throttle: self.throttle,
            },
        };
        serde_json::to_vec(&envelope).expect("command message always serializes")
    }
}

/// Outbound telemetry on `{unit}/state`, mirroring the current modifiers.
#[derive(PartialEq, Clone, Debug)]
pub struct TelemetryMessage {
    pub unit: String,
    pub steering: f64,
    pub throttle: f64,
}

impl TelemetryMessage {
    pub fn topic(&self) -> String {
        state_topic(&self.unit)
    }

    pub fn encode(&self) -> Vec<u8> {
        let envelope = Envelope {
            unit: self.unit.clone(),
            payload: AxisPayload {
                steering: self.steering,
                throttle: self.throttle,
            },
        };
        serde_json::to_vec(&envelope).expect("telemetry message always serializes")
    }

    pub fn decode(expected_unit: &str, raw: &[u8]) -> Result<TelemetryMessage> {
        let envelope: Envelope<AxisPayload> = decode_envelope(expected_unit, raw)?;
        Ok(TelemetryMessage {
            unit: envelope.unit,
            steering: envelope.payload.steering,
            throttle: envelope.payload.throttle,
        })
    }
}
