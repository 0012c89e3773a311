//! Stable frame identifiers.
//!
//! A [`FrameId`] labels one activation record observed during a trace session.
//! Ids are allocated by a monotonically increasing per-session counter in
//! first-seen order, so they double as a creation-order index. On the wire a
//! frame id is the label string `frame_<n>`.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Stable identifier for one stack frame within a trace session.
///
/// Non-owning: holding a `FrameId` says nothing about whether the frame is
/// still live. Ids are never reused within a session and never shared across
/// sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u64);

/// Failure to parse a `frame_<n>` label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid frame label: '{0}'")]
pub struct ParseFrameIdError(String);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame_{}", self.0)
    }
}

impl FromStr for FrameId {
    type Err = ParseFrameIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("frame_")
            .and_then(|n| n.parse::<u64>().ok())
            .map(FrameId)
            .ok_or_else(|| ParseFrameIdError(s.to_string()))
    }
}

// The wire form is the label string, not the raw counter value.

impl Serialize for FrameId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FrameId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_id_display() {
        assert_eq!(format!("{}", FrameId(0)), "frame_0");
        assert_eq!(format!("{}", FrameId(17)), "frame_17");
    }

    #[test]
    fn frame_id_parse() {
        assert_eq!("frame_3".parse::<FrameId>(), Ok(FrameId(3)));
        assert!("frame_".parse::<FrameId>().is_err());
        assert!("frame_x".parse::<FrameId>().is_err());
        assert!("3".parse::<FrameId>().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let id = FrameId(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"frame_42\"");

        let back: FrameId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn ids_order_by_counter() {
        // First-seen order is encoded directly in the counter value.
        assert!(FrameId(0) < FrameId(1));
        assert!(FrameId(1) < FrameId(10));
    }
}
