//! Signaling payload validation.
//!
//! Structural only: the relay checks that an SDP or candidate is shaped like
//! one before forwarding, never that it is semantically valid. Media
//! negotiation is entirely between the peers.

use serde_json::Value;

use crate::error::VideoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "offer" => Some(SignalKind::Offer),
            "answer" => Some(SignalKind::Answer),
            "ice-candidate" => Some(SignalKind::IceCandidate),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
        }
    }

    /// Offers and answers open a specific peer connection; broadcasting them
    /// would make every receiver answer at once.
    pub fn requires_target(self) -> bool {
        matches!(self, SignalKind::Offer | SignalKind::Answer)
    }
}

/// Validate the payload shape for a signal kind.
pub fn validate_payload(kind: SignalKind, payload: &Value) -> Result<(), VideoError> {
    match kind {
        SignalKind::Offer | SignalKind::Answer => {
            let sdp = payload.get("sdp").and_then(Value::as_str);
            match sdp {
                Some(s) if !s.is_empty() => Ok(()),
                _ => Err(VideoError::InvalidSignalStructure),
            }
        }
        SignalKind::IceCandidate => {
            let candidate = payload.get("candidate").and_then(Value::as_str);
            match candidate {
                Some(s) if !s.is_empty() => {}
                _ => return Err(VideoError::InvalidSignalStructure),
            }
            match payload.get("sdpMLineIndex") {
                None | Some(Value::Null) => {}
                Some(v) if v.as_i64().is_some() => {}
                Some(_) => return Err(VideoError::InvalidSignalStructure),
            }
            match payload.get("sdpMid") {
                None | Some(Value::Null) => {}
                Some(Value::String(_)) => {}
                Some(_) => return Err(VideoError::InvalidSignalStructure),
            }
            Ok(())
        }
    }
}
