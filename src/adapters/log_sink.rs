//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every bridge event to the `log`
//! facade.  Handy for headless hosts and for watching discoveries while
//! bringing up a new platform adapter.

use log::info;

use crate::app::events::NfcEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`NfcEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &NfcEvent) {
        match event {
            NfcEvent::Discovered { kind, tag } => {
                let id = tag.get("id").map_or_else(String::new, ToString::to_string);
                info!("NFC | {} | id={}", kind.event_name(), id);
            }
            NfcEvent::TagLost => {
                info!("NFC | tag-lost");
            }
        }
    }
}
