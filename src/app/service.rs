//! Application service: the hexagonal core.
//!
//! [`NfcService`] owns the shared [`BridgeState`] and the injected ports,
//! and implements every command the application layer can issue.  It is
//! `Send + Sync`; commands and intents are expected on the control
//! context, session I/O happens on session workers.
//!
//! ```text
//!  execute(action, args) ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!  on_new_intent(intent) ──▶ │        NfcService        │
//!  pause / resume / destroy ▶│ registrar · detector ·   │ ──▶ NfcAdapter
//!                            │ sessions · P2P           │ ──▶ Tag techs (workers)
//!                            └─────────────────────────┘
//! ```
//!
//! Every command is answered exactly once through its responder.
//! Precondition failures are answered before the call returns; hardware
//! results arrive later, from the session worker.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::detector::EventDetector;
use crate::dispatch::{self, DispatchRegistration, Interest};
use crate::error::NfcError;
use crate::ndef::NdefMessage;
use crate::session::{SessionMode, SessionSeed, SessionState, TagSession};
use crate::state::{BridgeState, DetectedTag};
use crate::tech::classify;

use super::commands::{CommandOutput, NfcCommand, Responder};
use super::events::DiscoveryKind;
use super::intent::DiscoveryIntent;
use super::ports::{AdapterProvider, ControlContext, EventSink};

/// The platform collaborators the service talks to.
#[derive(Clone)]
pub struct NfcPorts {
    pub adapters: Arc<dyn AdapterProvider>,
    pub control: Arc<dyn ControlContext>,
    pub events: Arc<dyn EventSink>,
}

// ───────────────────────────────────────────────────────────────
// NfcService
// ───────────────────────────────────────────────────────────────

pub struct NfcService {
    pub(super) config: BridgeConfig,
    pub(super) bridge: Arc<BridgeState>,
    pub(super) ports: NfcPorts,
}

impl NfcService {
    /// Validate `config` and create the bridge state.  No adapter handle is
    /// held until the first [`on_resume`](Self::on_resume).
    pub fn new(config: BridgeConfig, ports: NfcPorts) -> Result<Self, NfcError> {
        config.validate()?;
        Ok(Self {
            config,
            bridge: Arc::new(BridgeState::new()),
            ports,
        })
    }

    // ── Command routing ───────────────────────────────────────

    /// Route a named action.  Returns `false`, without answering, for
    /// actions the bridge does not know.
    pub fn execute(&self, action: &str, args: &Value, reply: Responder) -> bool {
        debug!("execute {}", action);
        if NfcCommand::needs_session(action) && !self.bridge.has_session() {
            reply(Err(NfcError::NotConnected));
            return true;
        }
        match NfcCommand::parse(action, args) {
            Ok(Some(command)) => {
                self.handle_command(command, reply);
                true
            }
            Ok(None) => {
                debug!("no result");
                false
            }
            Err(e) => {
                reply(Err(NfcError::InvalidArgument(format!("{e:#}"))));
                true
            }
        }
    }

    /// Run one parsed command.
    pub fn handle_command(&self, command: NfcCommand, reply: Responder) {
        debug!("command {}", command.name());
        match command {
            NfcCommand::RegisterMimeType(mime) => match dispatch::validate_mime(&mime) {
                Ok(mime) => {
                    self.register(Interest::mime(mime));
                    reply(Ok(CommandOutput::Done));
                }
                Err(e) => reply(Err(e)),
            },
            NfcCommand::RegisterNdef => {
                self.register(Interest::ndef());
                reply(Ok(CommandOutput::Done));
            }
            NfcCommand::RegisterNdefFormatable => {
                self.register(Interest::ndef_formatable());
                reply(Ok(CommandOutput::Done));
            }
            NfcCommand::RegisterTag => {
                self.register(Interest::tag());
                reply(Ok(CommandOutput::Done));
            }
            NfcCommand::Connect => self.connect(reply),
            NfcCommand::Close => self.close(reply),
            NfcCommand::ReadNdef => self.read_ndef(reply),
            NfcCommand::WriteNdef(message) => self.write_ndef(message, reply),
            NfcCommand::WriteTag(message) => self.write_tag(message, reply),
            NfcCommand::ShareTag(message) => {
                self.share_tag(message);
                reply(Ok(CommandOutput::Done));
            }
            NfcCommand::UnshareTag => {
                self.unshare_tag();
                reply(Ok(CommandOutput::Done));
            }
            NfcCommand::Init => reply(self.init().map(|()| CommandOutput::Done)),
        }
    }

    // ── Registration ──────────────────────────────────────────

    /// Add an interest and schedule a reinstall of the whole set.
    pub fn register(&self, interest: Interest) {
        if !self.bridge.registry().add(interest) {
            debug!("interest already registered");
        }
        dispatch::request_reinstall(&self.bridge, self.ports.control.as_ref());
    }

    // ── Sessions ──────────────────────────────────────────────

    /// Open a persistent session on the detected tag and queue the connect.
    pub fn connect(&self, reply: Responder) {
        if self.bridge.has_session() {
            reply(Err(NfcError::AlreadyConnected));
            return;
        }
        let session = match self.open_session(SessionMode::Persistent) {
            Ok(session) => Arc::new(session),
            Err(e) => {
                reply(Err(e));
                return;
            }
        };
        if let Err(session) = self.bridge.install_session(Arc::clone(&session)) {
            session.force_close();
            reply(Err(NfcError::AlreadyConnected));
            return;
        }
        session.connect(reply);
    }

    /// Queue the close of the open session.  The slot is freed at once, so
    /// a new `connect` does not wait for the hardware close.
    pub fn close(&self, reply: Responder) {
        match self.bridge.take_session() {
            Some(session) => session.close(reply),
            None => reply(Err(NfcError::NotConnected)),
        }
    }

    pub fn read_ndef(&self, reply: Responder) {
        match self.bridge.session() {
            Some(session) => session.read_ndef(reply),
            None => reply(Err(NfcError::NotConnected)),
        }
    }

    pub fn write_ndef(&self, message: NdefMessage, reply: Responder) {
        match self.bridge.session() {
            Some(session) => session.write_ndef(message, reply),
            None => reply(Err(NfcError::NotConnected)),
        }
    }

    /// Legacy write.  Uses the open session if there is one; otherwise
    /// connects to the detected tag on the calling thread, writes through a
    /// one-shot session and lets that session close itself afterwards.  The
    /// one-shot session never occupies the session slot.
    pub fn write_tag(&self, message: NdefMessage, reply: Responder) {
        if let Some(session) = self.bridge.session() {
            session.write_ndef(message, reply);
            return;
        }
        let session = match self.open_session(SessionMode::OneShot) {
            Ok(session) => session,
            Err(e) => {
                reply(Err(e));
                return;
            }
        };
        if let Err(e) = session.connect_inline() {
            reply(Err(e));
            return;
        }
        session.write_ndef(message, reply);
        session.close_when_done();
    }

    fn open_session(&self, mode: SessionMode) -> Result<TagSession, NfcError> {
        let DetectedTag { detection, tag } = self.bridge.detected().ok_or(NfcError::NoTagDetected)?;
        let tech = classify(tag.as_ref()).ok_or(NfcError::TagUnsupported)?;
        let seed = SessionSeed {
            id: self.bridge.next_session_id(),
            detection,
            tech,
            mode,
        };
        TagSession::spawn(seed, &self.bridge, Arc::clone(&self.ports.events), &self.config)
    }

    // ── Peer-to-peer push ─────────────────────────────────────

    /// Remember `message` for peer push and push it now if in the
    /// foreground.  Resume re-applies it.
    pub fn share_tag(&self, message: NdefMessage) {
        self.bridge.set_p2p_message(Some(message));
        if !self.bridge.has_adapter() {
            return;
        }
        let bridge = Arc::clone(&self.bridge);
        self.ports.control.run_on_control(Box::new(move || {
            if let (Some(adapter), Some(message)) = (bridge.adapter(), bridge.p2p_message()) {
                adapter.enable_ndef_push(&message);
            }
        }));
    }

    pub fn unshare_tag(&self) {
        self.bridge.set_p2p_message(None);
        if !self.bridge.has_adapter() {
            return;
        }
        let bridge = Arc::clone(&self.bridge);
        self.ports.control.run_on_control(Box::new(move || {
            if let Some(adapter) = bridge.adapter() {
                adapter.disable_ndef_push();
            }
        }));
    }

    // ── Intents ───────────────────────────────────────────────

    /// Check the adapter, then process the launch intent.
    pub fn init(&self) -> Result<(), NfcError> {
        debug!("Enabling plugin");
        let adapter = self.ports.adapters.default_adapter().ok_or(NfcError::NoNfc)?;
        if !adapter.is_enabled() {
            return Err(NfcError::NfcDisabled);
        }
        self.detector().process_current_intent();
        Ok(())
    }

    /// Store the intent the application was launched with; `init`
    /// processes it.
    pub fn set_launch_intent(&self, intent: DiscoveryIntent) {
        self.bridge.set_intent(intent);
    }

    /// A discovery intent arrived while running.  Returns the kinds of the
    /// events emitted, in order.
    pub fn on_new_intent(&self, intent: DiscoveryIntent) -> Vec<DiscoveryKind> {
        debug!("onNewIntent {:?}", intent);
        self.bridge.set_intent(intent);
        self.detector().process_current_intent()
    }

    fn detector(&self) -> EventDetector<'_> {
        EventDetector::new(&self.bridge, self.ports.events.as_ref(), &self.config)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.bridge.has_session()
    }

    /// State of the open session, if any.
    pub fn session_state(&self) -> Option<SessionState> {
        self.bridge.session().map(|s| s.state())
    }

    pub fn detected_tag_id(&self) -> Option<Vec<u8>> {
        self.bridge.detected().map(|d| d.tag.id())
    }

    /// The registration a reinstall would apply now.
    pub fn registration(&self) -> DispatchRegistration {
        self.bridge.registry().snapshot()
    }

    /// `true` while in the foreground with an adapter handle.
    pub fn adapter_active(&self) -> bool {
        self.bridge.has_adapter()
    }

    pub fn p2p_message(&self) -> Option<NdefMessage> {
        self.bridge.p2p_message()
    }

    pub fn has_pending_intent(&self) -> bool {
        self.bridge.has_pending_intent()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}
