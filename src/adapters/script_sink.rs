//! Script event sink adapter.
//!
//! Implements [`EventSink`] for web-view hosts: each event is rendered as
//! the snippet of script that raises a DOM event of the same name, with the
//! structural tag description attached as `e.tag`.  The host evaluates the
//! text in its web view.
//!
//! ```text
//! var e = document.createEvent('Events');
//! e.initEvent('ndef');
//! e.tag = {"id":[4,18,...],"techTypes":[...],...};
//! document.dispatchEvent(e);
//! ```

use log::trace;

use crate::app::events::NfcEvent;
use crate::app::ports::EventSink;

/// Receives the rendered script.
pub type ScriptCallback = Box<dyn Fn(String) + Send + Sync>;

pub struct ScriptEventSink {
    deliver: ScriptCallback,
}

impl ScriptEventSink {
    pub fn new(deliver: ScriptCallback) -> Self {
        Self { deliver }
    }
}

/// Script raising `event` in the page.
pub fn render(event: &NfcEvent) -> String {
    match event {
        NfcEvent::Discovered { tag, .. } => format!(
            "var e = document.createEvent('Events');\n\
             e.initEvent('{}');\n\
             e.tag = {};\n\
             document.dispatchEvent(e);",
            event.event_name(),
            tag
        ),
        NfcEvent::TagLost => format!(
            "var e = document.createEvent('Events');\n\
             e.initEvent('{}');\n\
             document.dispatchEvent(e);",
            event.event_name()
        ),
    }
}

impl EventSink for ScriptEventSink {
    fn emit(&self, event: &NfcEvent) {
        let script = render(event);
        trace!("{}", script);
        (self.deliver)(script);
    }
}
