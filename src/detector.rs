//! Event detector.
//!
//! Runs on the control context for each discovery intent: records the tag
//! as the detected tag, works out which kind of discovery happened and
//! emits the matching event(s).  The whole pass runs under the
//! detected-tag lock so that a session worker handling tag loss cannot
//! interleave with it.

use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use serde_json::Value;

use crate::app::events::{DiscoveryKind, NfcEvent};
use crate::app::intent::{DiscoveryIntent, IntentAction};
use crate::app::ports::{EventSink, TECH_NDEF, TECH_NDEF_FORMATABLE, Tag};
use crate::config::BridgeConfig;
use crate::ndef::NdefMessage;
use crate::ndef::json::{message_to_json, ndef_to_json, tag_to_json};
use crate::state::BridgeState;

/// Tag type reported for a peer-to-peer push.
const PUSH_TYPE: &str = "NDEF Push Protocol";

pub struct EventDetector<'a> {
    bridge: &'a BridgeState,
    events: &'a dyn EventSink,
    config: &'a BridgeConfig,
}

impl<'a> EventDetector<'a> {
    pub fn new(bridge: &'a BridgeState, events: &'a dyn EventSink, config: &'a BridgeConfig) -> Self {
        Self {
            bridge,
            events,
            config,
        }
    }

    /// Consume the current intent and emit its events.  Returns the kinds
    /// emitted, in order.
    pub fn process_current_intent(&self) -> Vec<DiscoveryKind> {
        let intent = self.bridge.take_intent();
        self.process(&intent)
    }

    fn process(&self, intent: &DiscoveryIntent) -> Vec<DiscoveryKind> {
        if intent.launched_from_history && self.config.ignore_recycled_intents {
            info!("Launched from history, killing recycled intent");
            return Vec::new();
        }
        let Some(action) = &intent.action else {
            return Vec::new();
        };
        debug!("parse intent: {:?}", intent);

        let mut slot = self.bridge.detected_slot();
        if let Some(tag) = &intent.tag {
            let detection = slot.set(Arc::clone(tag));
            debug!("detected tag #{}", detection);
        }

        let tag = intent.tag.as_deref();
        let mut fired = Vec::new();
        match action {
            IntentAction::NdefDiscovered => {
                let tag_json = ndef_description(tag, &intent.messages);
                self.emit(DiscoveryKind::NdefMime, tag_json, &mut fired);
            }
            IntentAction::TechDiscovered => {
                let Some(tag) = tag else {
                    warn!("technology discovery without a tag");
                    return fired;
                };
                for tech in tag.tech_list() {
                    debug!("{}", tech);
                    if tech == TECH_NDEF_FORMATABLE {
                        self.emit(
                            DiscoveryKind::NdefFormatable,
                            Value::Object(serde_json::Map::new()),
                            &mut fired,
                        );
                    } else if tech == TECH_NDEF {
                        let tag_json = ndef_description(Some(tag), &intent.messages);
                        self.emit(DiscoveryKind::Ndef, tag_json, &mut fired);
                    }
                }
            }
            IntentAction::TagDiscovered => match tag {
                Some(tag) => self.emit(DiscoveryKind::Tag, tag_to_json(tag), &mut fired),
                None => warn!("tag discovery without a tag"),
            },
            IntentAction::Other(name) => debug!("ignoring intent action {}", name),
        }
        drop(slot);
        fired
    }

    fn emit(&self, kind: DiscoveryKind, tag: Value, fired: &mut Vec<DiscoveryKind>) {
        if self.config.trace_event_payloads {
            trace!("{} {}", kind.event_name(), tag);
        }
        self.events.emit(&NfcEvent::Discovered { kind, tag });
        fired.push(kind);
    }
}

/// NDEF description of a discovered tag.  Without NDEF access but with
/// carried messages the discovery came from a peer push.
fn ndef_description(tag: Option<&dyn Tag>, messages: &[NdefMessage]) -> Value {
    let ndef = tag.and_then(|t| t.ndef());
    let mut json = ndef_to_json(tag, ndef.as_deref());

    if ndef.is_none() {
        if let Some(first) = messages.first() {
            json.insert("ndefMessage".into(), message_to_json(Some(first)));
            json.insert("type".into(), Value::String(PUSH_TYPE.into()));
        }
        if messages.len() > 1 {
            error!("Expected one ndefMessage but found {}", messages.len());
        }
    }
    Value::Object(json)
}
