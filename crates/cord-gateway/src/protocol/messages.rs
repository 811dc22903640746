//! Gateway frame envelope
//!
//! Every frame, in either direction, is a JSON object `{op, d, s, t}`.

use super::{HelloPayload, IdentifyPayload, OpCode, StatusUpdatePayload, VoiceStatePayload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway frame
///
/// `op` stays a raw integer so frames with op codes this client does not
/// know still decode and can be ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: u8,

    /// Event data payload
    #[serde(default)]
    pub d: Value,

    /// Sequence number (dispatch frames only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event name (dispatch frames only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayMessage {
    fn new(op: OpCode, d: Value) -> Self {
        Self {
            op: op.as_u8(),
            d,
            s: None,
            t: None,
        }
    }

    /// Known op code of this frame
    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        OpCode::from_u8(self.op)
    }

    // === Client frames ===

    /// Heartbeat (op 1) carrying the last sequence number seen
    #[must_use]
    pub fn heartbeat(last_sequence: u64) -> Self {
        Self::new(OpCode::Heartbeat, Value::from(last_sequence))
    }

    /// Identify (op 2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::new(
            OpCode::Identify,
            serde_json::to_value(payload).unwrap_or_default(),
        )
    }

    /// Status Update (op 3)
    #[must_use]
    pub fn status_update(payload: &StatusUpdatePayload) -> Self {
        Self::new(
            OpCode::StatusUpdate,
            serde_json::to_value(payload).unwrap_or_default(),
        )
    }

    /// Voice State Update (op 4)
    #[must_use]
    pub fn voice_state(payload: &VoiceStatePayload) -> Self {
        Self::new(
            OpCode::VoiceStateUpdate,
            serde_json::to_value(payload).unwrap_or_default(),
        )
    }

    // === Server frames ===

    /// Dispatch (op 0)
    #[must_use]
    pub fn dispatch(event_name: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch.as_u8(),
            d: data,
            s: Some(sequence),
            t: Some(event_name.into()),
        }
    }

    /// Hello (op 10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self::new(OpCode::Hello, serde_json::to_value(payload).unwrap_or_default())
    }

    /// Heartbeat ACK (op 11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::new(OpCode::HeartbeatAck, Value::Null)
    }

    // === Utilities ===

    /// Decode the payload of a Hello frame
    pub fn as_hello(&self) -> Result<HelloPayload, serde_json::Error> {
        HelloPayload::deserialize(&self.d)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode() {
            Some(op) => write!(f, "GatewayMessage(op={op}")?,
            None => write!(f, "GatewayMessage(op={}", self.op)?,
        }
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        write!(f, ")")
    }
}
