//! NFC tag-session bridge.
//!
//! Connects a platform NFC stack to a web-technology application shell:
//! discovery intents become application events, and application commands
//! (register, connect, read, write, close, share) drive a single tag
//! session whose hardware I/O runs on its own worker thread.
//!
//! The host supplies the platform through the port traits in
//! [`app::ports`] and drives [`app::service::NfcService`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod detector;
pub mod dispatch;
pub mod error;
pub mod ndef;
pub mod session;
pub mod state;
pub mod tech;
pub mod worker;

pub use app::commands::{CommandOutput, CommandResult, NfcCommand, Responder};
pub use app::events::{DiscoveryKind, NfcEvent};
pub use app::intent::{DiscoveryIntent, IntentAction};
pub use app::service::{NfcPorts, NfcService};
pub use config::BridgeConfig;
pub use error::{NfcError, TagIoError};
pub use ndef::{NdefMessage, NdefRecord, Tnf};
