//! Gateway message format
//!
//! Every frame, in both directions, is a `{op, d, s, t}` envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload, RequestGuildMembersPayload,
    ResumePayload, VoiceStateUpdatePayload,
};

/// Gateway message envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event name (dispatch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (dispatch only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Payload; always present on the wire, `null` when empty
    #[serde(default)]
    pub d: Option<Value>,
}

impl GatewayMessage {
    fn control(op: OpCode, d: Option<Value>) -> Self {
        Self {
            op,
            t: None,
            s: None,
            d,
        }
    }

    fn with_payload<T: Serialize>(op: OpCode, payload: &T) -> Self {
        Self::control(op, Some(serde_json::to_value(payload).unwrap_or_default()))
    }

    // === Client Messages ===

    /// Heartbeat (op=1) carrying the last sequence seen
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::control(OpCode::Heartbeat, last_sequence.map(Value::from))
    }

    /// Identify (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::with_payload(OpCode::Identify, payload)
    }

    /// Presence Update (op=3)
    #[must_use]
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Self {
        Self::with_payload(OpCode::PresenceUpdate, payload)
    }

    /// Voice State Update (op=4)
    #[must_use]
    pub fn voice_state_update(payload: &VoiceStateUpdatePayload) -> Self {
        Self::with_payload(OpCode::VoiceStateUpdate, payload)
    }

    /// Resume (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self::with_payload(OpCode::Resume, payload)
    }

    /// Request Guild Members (op=8)
    #[must_use]
    pub fn request_guild_members(payload: &RequestGuildMembersPayload) -> Self {
        Self::with_payload(OpCode::RequestGuildMembers, payload)
    }

    // === Server Messages ===

    /// Dispatch (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Hello (op=10)
    #[must_use]
    pub fn hello(heartbeat_interval_ms: u64) -> Self {
        Self::with_payload(OpCode::Hello, &HelloPayload::with_interval(heartbeat_interval_ms))
    }

    /// Heartbeat ACK (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::control(OpCode::HeartbeatAck, None)
    }

    /// Reconnect (op=7)
    #[must_use]
    pub fn reconnect() -> Self {
        Self::control(OpCode::Reconnect, None)
    }

    /// Invalid Session (op=9); `resumable` is advisory
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::control(OpCode::InvalidSession, Some(Value::Bool(resumable)))
    }

    // === Parsing ===

    /// Parse the Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.payload()
    }

    /// Parse the Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        if self.op != OpCode::Identify {
            return None;
        }
        self.payload()
    }

    /// Parse the Resume payload (op=6)
    pub fn as_resume(&self) -> Option<ResumePayload> {
        if self.op != OpCode::Resume {
            return None;
        }
        self.payload()
    }

    /// Parse the heartbeat sequence number (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    fn payload<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.d
            .as_ref()
            .and_then(|d| T::deserialize(d).ok())
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_slice(json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
