//! Port traits: the hexagonal boundary between the bridge and the platform.
//!
//! ```text
//!   Platform adapter ──▶ Port trait ──▶ NfcService (domain)
//! ```
//!
//! The platform NFC stack (tags, technologies, the adapter), the host
//! shell's control thread and its event delivery are all reached through
//! these traits.  Everything is `Send + Sync`: ports are shared between the
//! control context and session workers.
//!
//! ## I/O contract
//!
//! Methods returning [`TagIoError`] may block indefinitely; they end when
//! the hardware answers, when the tag leaves the field
//! ([`TagIoError::TagLost`]) or when the technology is closed from another
//! thread.  Property getters never block.

use std::sync::Arc;

use crate::dispatch::DispatchRegistration;
use crate::error::TagIoError;
use crate::ndef::NdefMessage;

use super::events::NfcEvent;

/// Platform name of the NDEF technology.
pub const TECH_NDEF: &str = "android.nfc.tech.Ndef";

/// Platform name of the NDEF-formatable technology.
pub const TECH_NDEF_FORMATABLE: &str = "android.nfc.tech.NdefFormatable";

// ───────────────────────────────────────────────────────────────
// Tag + technologies (driven adapter: domain → NFC hardware)
// ───────────────────────────────────────────────────────────────

/// A physical tag as presented by the platform while it is in the field.
pub trait Tag: Send + Sync {
    /// Anti-collision identifier.
    fn id(&self) -> Vec<u8>;

    /// Technology names, in the order the platform reports them.
    fn tech_list(&self) -> Vec<String>;

    /// NDEF access, if the tag is NDEF-formatted.
    fn ndef(&self) -> Option<Arc<dyn NdefTech>>;

    /// Formatting access, if the tag can be formatted to NDEF.
    fn ndef_formatable(&self) -> Option<Arc<dyn FormatableTech>>;
}

/// NDEF technology handle.
pub trait NdefTech: Send + Sync {
    fn connect(&self) -> Result<(), TagIoError>;

    fn close(&self) -> Result<(), TagIoError>;

    /// Read the current message; `None` for a freshly formatted tag.
    fn read_ndef(&self) -> Result<Option<NdefMessage>, TagIoError>;

    fn write_ndef(&self, message: &NdefMessage) -> Result<(), TagIoError>;

    /// Platform tag type, e.g. `org.nfcforum.ndef.type2`.
    fn tag_type(&self) -> String;

    /// Maximum NDEF message size in bytes.
    fn max_size(&self) -> usize;

    fn is_writable(&self) -> bool;

    /// `None` when the platform cannot tell.
    fn can_make_read_only(&self) -> Option<bool>;

    /// Message read during discovery, without I/O.
    fn cached_message(&self) -> Option<NdefMessage>;
}

/// NDEF-formatable technology handle.
pub trait FormatableTech: Send + Sync {
    fn connect(&self) -> Result<(), TagIoError>;

    fn close(&self) -> Result<(), TagIoError>;

    /// Format the tag and write `message` as its first content.
    fn format(&self, message: &NdefMessage) -> Result<(), TagIoError>;
}

// ───────────────────────────────────────────────────────────────
// Adapter (driven adapter: domain → OS dispatch / push)
// ───────────────────────────────────────────────────────────────

/// The device NFC adapter.  Dispatch and push calls must be made from the
/// control context.
pub trait NfcAdapter: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Install `registration` as the single live foreground-dispatch set,
    /// replacing any previous one.
    fn enable_foreground_dispatch(&self, registration: &DispatchRegistration);

    fn disable_foreground_dispatch(&self);

    fn enable_ndef_push(&self, message: &NdefMessage);

    fn disable_ndef_push(&self);
}

/// Looks up the default adapter; `None` on devices without NFC.
pub trait AdapterProvider: Send + Sync {
    fn default_adapter(&self) -> Option<Arc<dyn NfcAdapter>>;
}

// ───────────────────────────────────────────────────────────────
// Control context (driven adapter: domain → host UI thread)
// ───────────────────────────────────────────────────────────────

/// Unit of work posted to the control context.
pub type ControlTask = Box<dyn FnOnce() + Send + 'static>;

/// The single designated context where dispatch registration must happen.
pub trait ControlContext: Send + Sync {
    /// Run `task` on the control context, now or later.
    fn run_on_control(&self, task: ControlTask);
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → application code)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget delivery of [`NfcEvent`]s to application code.
///
/// Called from the control context (discovery) and from session workers
/// (tag loss), so implementations must be thread-safe.
///
/// Discovery events are emitted while the detected-tag lock is held.  An
/// implementation must not call back into the bridge from `emit` (a
/// `connect` there deadlocks); hand the follow-up to the control context
/// or another thread instead.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &NfcEvent);
}
