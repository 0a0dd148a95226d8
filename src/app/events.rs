//! Outbound application events.
//!
//! The [`NfcService`](super::service::NfcService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide how they reach application code (script injection, log,
//! a channel in tests).

use serde_json::Value;

/// Which discovery path produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscoveryKind {
    /// Technology-list discovery of an NDEF tag.
    Ndef,
    /// NDEF discovery matched by MIME type (also peer-to-peer push).
    NdefMime,
    /// Technology-list discovery of a formatable tag.
    NdefFormatable,
    /// Generic tag discovery.
    Tag,
}

impl DiscoveryKind {
    /// Event name seen by application code.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Ndef => "ndef",
            Self::NdefMime => "ndef-mime",
            Self::NdefFormatable => "ndef-formatable",
            Self::Tag => "tag",
        }
    }
}

/// Structured events emitted by the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum NfcEvent {
    /// A tag (or peer) was discovered; `tag` is its structural description.
    Discovered { kind: DiscoveryKind, tag: Value },

    /// The tag of the open session left the field.
    TagLost,
}

impl NfcEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Discovered { kind, .. } => kind.event_name(),
            Self::TagLost => "tag-lost",
        }
    }
}
