//! Discovery intents delivered by the platform.

use core::fmt;
use std::sync::Arc;

use crate::ndef::NdefMessage;

use super::ports::Tag;

/// Discovery action carried by an intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IntentAction {
    /// NDEF tag (or peer push) matched by content type.
    NdefDiscovered,
    /// Tag matched by technology list.
    TechDiscovered,
    /// Catch-all tag discovery.
    TagDiscovered,
    /// Any other action (e.g. the plain application launch).
    Other(String),
}

/// One intent as delivered to the application.
#[derive(Clone, Default)]
pub struct DiscoveryIntent {
    /// `None` for the empty intent left behind once one has been consumed.
    pub action: Option<IntentAction>,
    pub tag: Option<Arc<dyn Tag>>,
    /// Messages read by the platform during discovery.
    pub messages: Vec<NdefMessage>,
    /// Set when the platform replays an old launch from recent-apps history.
    pub launched_from_history: bool,
}

impl DiscoveryIntent {
    pub fn new(action: IntentAction, tag: Option<Arc<dyn Tag>>) -> Self {
        Self {
            action: Some(action),
            tag,
            messages: Vec::new(),
            launched_from_history: false,
        }
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<NdefMessage>) -> Self {
        self.messages = messages;
        self
    }

    #[must_use]
    pub fn from_history(mut self) -> Self {
        self.launched_from_history = true;
        self
    }
}

impl fmt::Debug for DiscoveryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryIntent")
            .field("action", &self.action)
            .field("tag_id", &self.tag.as_ref().map(|t| t.id()))
            .field("messages", &self.messages.len())
            .field("launched_from_history", &self.launched_from_history)
            .finish()
    }
}
