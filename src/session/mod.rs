//! Tag session: one live technology connection and its dedicated worker.
//!
//! Every hardware operation of a session runs on the session's own
//! [`SerialWorker`], strictly in the order it was requested, so a write can
//! never overtake a connect that has not finished yet and the control
//! context never blocks on the tag.  The only exception is
//! [`TagSession::connect_inline`], used by the legacy one-shot write.
//!
//! ## Tag loss
//!
//! When any operation reports [`TagIoError::TagLost`] the worker tears the
//! session down on the spot:
//!
//! 1. state → `Lost`
//! 2. clear the detected-tag slot, if it still holds this session's tag
//! 3. clear the session slot, if it still holds this session
//! 4. release the technology, state → `Closed`
//! 5. emit `tag-lost` once, answer the request with "Tag left the field"
//! 6. stop the worker; anything still queued is answered "not connected"

mod state;

pub use state::SessionState;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, error, info};

use crate::app::commands::{CommandOutput, Responder};
use crate::app::events::NfcEvent;
use crate::app::ports::EventSink;
use crate::config::BridgeConfig;
use crate::error::{IoOp, NfcError, TagIoError};
use crate::ndef::NdefMessage;
use crate::state::{BridgeState, DetectionId};
use crate::tech::TagTech;
use crate::worker::{Flow, SerialWorker, Stopped};

use state::StateCell;

/// How the session came to exist, and so how it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Opened by `connect`, closed by `close`.
    Persistent,
    /// Opened by a legacy `writeTag`; closes itself after the write.
    OneShot,
}

/// Work queued on a session worker.
enum SessionJob {
    Connect(Responder),
    ReadNdef(Responder),
    WriteNdef(NdefMessage, Responder),
    Close(Responder),
    CloseWhenDone,
}

/// Everything needed to start a session.
pub(crate) struct SessionSeed {
    pub id: u64,
    pub detection: DetectionId,
    pub tech: TagTech,
    pub mode: SessionMode,
}

/// State shared between the session handle and its worker thread.
struct SessionCore {
    id: u64,
    detection: DetectionId,
    tech: TagTech,
    mode: SessionMode,
    phase: StateCell,
    released: AtomicBool,
    bridge: Weak<BridgeState>,
    events: Arc<dyn EventSink>,
}

impl SessionCore {
    fn transition(&self, to: SessionState) {
        let from = self.phase.swap(to);
        if from != to {
            debug!("session {}: {} -> {}", self.id, from, to);
        }
    }

    /// Close the technology once; later calls are no-ops.
    fn release(&self) -> Result<(), TagIoError> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.tech.close()
    }

    fn handle(&self, job: SessionJob) -> Flow {
        match job {
            SessionJob::Connect(reply) => {
                self.transition(SessionState::Connecting);
                match self.tech.connect() {
                    Ok(()) => {
                        self.transition(SessionState::Connected);
                        reply(Ok(CommandOutput::Done));
                        Flow::Continue
                    }
                    Err(e) => self.fail(IoOp::Connect, e, SessionState::ConnectFailed, reply),
                }
            }
            SessionJob::ReadNdef(reply) => {
                let TagTech::Ndef(ndef) = &self.tech else {
                    reply(Err(NfcError::NotNdef));
                    return Flow::Continue;
                };
                let resume = self.phase.get();
                self.transition(SessionState::Reading);
                match ndef.read_ndef() {
                    Ok(message) => {
                        self.transition(resume);
                        reply(Ok(CommandOutput::Message(message)));
                        Flow::Continue
                    }
                    Err(e) => self.fail(IoOp::Read, e, resume, reply),
                }
            }
            SessionJob::WriteNdef(message, reply) => {
                let resume = self.phase.get();
                self.transition(SessionState::Writing);
                match self.write(&message) {
                    Ok(()) => {
                        self.transition(resume);
                        reply(Ok(CommandOutput::Done));
                        Flow::Continue
                    }
                    Err(WriteFailure::Rejected(e)) => {
                        self.transition(resume);
                        reply(Err(e));
                        Flow::Continue
                    }
                    Err(WriteFailure::Io(e)) => self.fail(IoOp::Write, e, resume, reply),
                }
            }
            SessionJob::Close(reply) => {
                let result = self.release();
                self.transition(SessionState::Closed);
                reply(
                    result
                        .map(|()| CommandOutput::Done)
                        .map_err(|e| NfcError::Io {
                            op: IoOp::Close,
                            message: e.to_string(),
                        }),
                );
                Flow::Stop
            }
            SessionJob::CloseWhenDone => {
                debug!("Closing the one-shot NFC tag connection (session {})", self.id);
                if let Err(e) = self.release() {
                    error!("Failed to close NFC tag connection: {}", e);
                }
                self.transition(SessionState::Closed);
                Flow::Stop
            }
        }
    }

    /// Capability checks then the blocking write or format.
    fn write(&self, message: &NdefMessage) -> Result<(), WriteFailure> {
        match &self.tech {
            TagTech::Ndef(ndef) => {
                if !ndef.is_writable() {
                    return Err(WriteFailure::Rejected(NfcError::ReadOnly));
                }
                let size = message.byte_len();
                let capacity = ndef.max_size();
                if capacity < size {
                    return Err(WriteFailure::Rejected(NfcError::TooLarge { capacity, size }));
                }
                ndef.write_ndef(message).map_err(WriteFailure::Io)
            }
            TagTech::Formatable(formatable) => formatable.format(message).map_err(WriteFailure::Io),
        }
    }

    /// Report an I/O failure; tag loss tears the session down.
    fn fail(&self, op: IoOp, err: TagIoError, otherwise: SessionState, reply: Responder) -> Flow {
        let err = NfcError::from_io(op, err);
        if err == NfcError::TagLost {
            self.on_tag_lost();
            reply(Err(err));
            return Flow::Stop;
        }
        self.transition(otherwise);
        reply(Err(err));
        Flow::Continue
    }

    fn on_tag_lost(&self) {
        info!("session {}: tag left the field", self.id);
        self.transition(SessionState::Lost);
        if let Some(bridge) = self.bridge.upgrade() {
            if !bridge.clear_detected_if(self.detection) {
                debug!("session {}: a newer tag was detected; keeping it", self.id);
            }
            bridge.clear_session_if(self.id);
        }
        // The platform may refuse to close a lost tag; it is gone either way.
        let _ = self.release();
        self.transition(SessionState::Closed);
        self.events.emit(&NfcEvent::TagLost);
    }
}

enum WriteFailure {
    /// Refused before touching the hardware.
    Rejected(NfcError),
    Io(TagIoError),
}

/// Answer a job that will never run.
fn discard(job: SessionJob) {
    match job {
        SessionJob::Connect(reply) | SessionJob::ReadNdef(reply) | SessionJob::WriteNdef(_, reply) => {
            reply(Err(NfcError::NotConnected));
        }
        // The connection is already gone, which is what close asked for.
        SessionJob::Close(reply) => reply(Ok(CommandOutput::Done)),
        SessionJob::CloseWhenDone => {}
    }
}

// ───────────────────────────────────────────────────────────────
// TagSession
// ───────────────────────────────────────────────────────────────

/// Handle to an open tag session.
pub struct TagSession {
    core: Arc<SessionCore>,
    worker: SerialWorker<SessionJob>,
}

impl TagSession {
    /// Start the session's worker.  No hardware is touched yet.
    pub(crate) fn spawn(
        seed: SessionSeed,
        bridge: &Arc<BridgeState>,
        events: Arc<dyn EventSink>,
        config: &BridgeConfig,
    ) -> Result<Self, NfcError> {
        let core = Arc::new(SessionCore {
            id: seed.id,
            detection: seed.detection,
            tech: seed.tech,
            mode: seed.mode,
            phase: StateCell::new(SessionState::Idle),
            released: AtomicBool::new(false),
            bridge: Arc::downgrade(bridge),
            events,
        });

        let name = format!("{}-{}", config.worker_name, seed.id);
        let handler_core = Arc::clone(&core);
        let worker = SerialWorker::spawn(
            &name,
            config.worker_stack_kb,
            move |job: SessionJob| handler_core.handle(job),
            discard,
        )
        .map_err(|e| NfcError::Worker(e.to_string()))?;

        debug!(
            "session {}: {:?} session on {:?} (worker '{}')",
            core.id,
            core.mode,
            core.tech,
            worker.name()
        );
        Ok(Self { core, worker })
    }

    pub fn id(&self) -> u64 {
        self.core.id
    }

    pub fn state(&self) -> SessionState {
        self.core.phase.get()
    }

    /// Queue the hardware connect.
    pub fn connect(&self, reply: Responder) {
        self.post(SessionJob::Connect(reply));
    }

    /// Queue a read.  Fails at once if the technology has no NDEF access.
    pub fn read_ndef(&self, reply: Responder) {
        if !self.core.tech.is_ndef() {
            reply(Err(NfcError::NotNdef));
            return;
        }
        self.post(SessionJob::ReadNdef(reply));
    }

    /// Queue a write (or a format, on a formatable tag).
    pub fn write_ndef(&self, message: NdefMessage, reply: Responder) {
        self.post(SessionJob::WriteNdef(message, reply));
    }

    /// Queue the close behind everything already requested.
    pub fn close(&self, reply: Responder) {
        self.post(SessionJob::Close(reply));
    }

    /// Queue the silent close that ends a one-shot session.
    pub fn close_when_done(&self) {
        self.post(SessionJob::CloseWhenDone);
    }

    /// Connect on the calling thread, blocking it.  Tag loss is handled as
    /// on the worker; the worker is stopped on any failure.
    pub fn connect_inline(&self) -> Result<(), NfcError> {
        debug!("Blocking on NFC tag connect; consider using nfc.connect");
        let core = &self.core;
        core.transition(SessionState::Connecting);
        if let Err(e) = core.tech.connect() {
            let err = NfcError::from_io(IoOp::Connect, e);
            if err == NfcError::TagLost {
                core.on_tag_lost();
                self.worker.stop();
            } else {
                core.transition(SessionState::ConnectFailed);
                self.force_close();
            }
            return Err(err);
        }
        core.transition(SessionState::Connected);
        Ok(())
    }

    /// Release the hardware right now from the calling thread and stop the
    /// worker.  An operation blocked on the tag is expected to fail once the
    /// technology is closed underneath it.
    pub fn force_close(&self) {
        self.worker.stop();
        if let Err(e) = self.core.release() {
            error!("Failed to close NFC tag connection: {}", e);
        }
        self.core.transition(SessionState::Closed);
    }

    fn post(&self, job: SessionJob) {
        if let Err(Stopped(job)) = self.worker.post(job) {
            discard(job);
        }
    }
}

impl core::fmt::Debug for TagSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TagSession")
            .field("id", &self.core.id)
            .field("mode", &self.core.mode)
            .field("tech", &self.core.tech)
            .field("state", &self.state())
            .finish()
    }
}
