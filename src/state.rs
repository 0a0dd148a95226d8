//! Process-wide bridge state.
//!
//! One [`BridgeState`] is created when the service starts and shared (via
//! `Arc`) by the control context and every session worker.  It holds the
//! only mutable state in the bridge:
//!
//! | Slot          | Written by                          | Read by                 |
//! |---------------|-------------------------------------|-------------------------|
//! | detected tag  | event detector, tag-loss handling   | connect, legacy write   |
//! | session       | connect, legacy write, close, loss  | every session command   |
//! | registry      | register commands                   | dispatch reinstall      |
//! | adapter       | lifecycle (pause / resume)          | registrar, push, init   |
//! | p2p message   | share / unshare                     | lifecycle (resume)      |
//! | intent        | host launch, new intents            | init, event detector    |
//!
//! ## Lock discipline
//!
//! Each slot has its own lock, held only for the read or update itself and
//! never across port I/O.  No two slot locks are ever held together, with
//! one exception: the event detector keeps the detected-tag lock while it
//! emits discovery events, so that tag-loss handling on a worker cannot
//! interleave with a discovery.  Event sinks therefore must not call back
//! into the bridge synchronously.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::app::intent::DiscoveryIntent;
use crate::app::ports::{NfcAdapter, Tag};
use crate::dispatch::InterestRegistry;
use crate::ndef::NdefMessage;
use crate::session::TagSession;

/// Lock a mutex, recovering the data if a holder panicked.  Every guarded
/// value here is replaced wholesale, so it is never observed half-updated.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sequence number given to each discovery written into the slot.
pub type DetectionId = u64;

/// The most recently discovered tag.
#[derive(Clone)]
pub struct DetectedTag {
    pub detection: DetectionId,
    pub tag: Arc<dyn Tag>,
}

/// Contents of the detected-tag slot.
#[derive(Default)]
pub struct DetectedSlot {
    current: Option<DetectedTag>,
    next_detection: DetectionId,
}

impl DetectedSlot {
    /// Overwrite the slot with a newly discovered tag.
    pub fn set(&mut self, tag: Arc<dyn Tag>) -> DetectionId {
        self.next_detection += 1;
        let detection = self.next_detection;
        self.current = Some(DetectedTag { detection, tag });
        detection
    }

    pub fn current(&self) -> Option<&DetectedTag> {
        self.current.as_ref()
    }

    /// Clear the slot only if it still holds `detection`.
    pub fn clear_if(&mut self, detection: DetectionId) -> bool {
        if self.current.as_ref().is_some_and(|d| d.detection == detection) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

pub struct BridgeState {
    detected: Mutex<DetectedSlot>,
    session: Mutex<Option<Arc<TagSession>>>,
    registry: InterestRegistry,
    adapter: RwLock<Option<Arc<dyn NfcAdapter>>>,
    p2p: Mutex<Option<NdefMessage>>,
    intent: Mutex<DiscoveryIntent>,
    next_session: AtomicU64,
}

impl BridgeState {
    pub fn new() -> Self {
        Self {
            detected: Mutex::new(DetectedSlot::default()),
            session: Mutex::new(None),
            registry: InterestRegistry::new(),
            adapter: RwLock::new(None),
            p2p: Mutex::new(None),
            intent: Mutex::new(DiscoveryIntent::default()),
            next_session: AtomicU64::new(1),
        }
    }

    // ── Detected tag ──────────────────────────────────────────

    /// Exclusive access to the detected-tag slot.
    pub fn detected_slot(&self) -> MutexGuard<'_, DetectedSlot> {
        lock(&self.detected)
    }

    /// Snapshot of the detected tag.
    pub fn detected(&self) -> Option<DetectedTag> {
        self.detected_slot().current().cloned()
    }

    pub fn clear_detected_if(&self, detection: DetectionId) -> bool {
        self.detected_slot().clear_if(detection)
    }

    // ── Session ───────────────────────────────────────────────

    pub fn session(&self) -> Option<Arc<TagSession>> {
        lock(&self.session).clone()
    }

    pub fn has_session(&self) -> bool {
        lock(&self.session).is_some()
    }

    /// Store `session` unless another one got there first.
    pub fn install_session(&self, session: Arc<TagSession>) -> Result<(), Arc<TagSession>> {
        let mut slot = lock(&self.session);
        if slot.is_some() {
            return Err(session);
        }
        *slot = Some(session);
        Ok(())
    }

    pub fn take_session(&self) -> Option<Arc<TagSession>> {
        lock(&self.session).take()
    }

    /// Clear the slot only if it still holds session `id`.
    pub fn clear_session_if(&self, id: u64) -> bool {
        let mut slot = lock(&self.session);
        if slot.as_ref().is_some_and(|s| s.id() == id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn next_session_id(&self) -> u64 {
        self.next_session.fetch_add(1, Ordering::Relaxed)
    }

    // ── Interest registry ─────────────────────────────────────

    pub fn registry(&self) -> &InterestRegistry {
        &self.registry
    }

    // ── Adapter handle ────────────────────────────────────────

    pub fn adapter(&self) -> Option<Arc<dyn NfcAdapter>> {
        self.adapter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_adapter(&self) -> bool {
        self.adapter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn set_adapter(&self, adapter: Option<Arc<dyn NfcAdapter>>) {
        *self.adapter.write().unwrap_or_else(PoisonError::into_inner) = adapter;
    }

    pub fn take_adapter(&self) -> Option<Arc<dyn NfcAdapter>> {
        self.adapter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    // ── Peer-to-peer message ──────────────────────────────────

    pub fn p2p_message(&self) -> Option<NdefMessage> {
        lock(&self.p2p).clone()
    }

    pub fn set_p2p_message(&self, message: Option<NdefMessage>) {
        *lock(&self.p2p) = message;
    }

    // ── Current intent ────────────────────────────────────────

    pub fn set_intent(&self, intent: DiscoveryIntent) {
        *lock(&self.intent) = intent;
    }

    /// Take the current intent, leaving the empty intent behind.
    pub fn take_intent(&self) -> DiscoveryIntent {
        core::mem::take(&mut *lock(&self.intent))
    }

    pub fn has_pending_intent(&self) -> bool {
        lock(&self.intent).action.is_some()
    }
}

impl Default for BridgeState {
    fn default() -> Self {
        Self::new()
    }
}
