//! Inbound commands to the application service.
//!
//! The host shell hands the bridge a named action plus a JSON argument
//! array; [`NfcCommand::parse`] turns that into a typed command which the
//! [`NfcService`](super::service::NfcService) acts upon.  Every command is
//! answered exactly once through its [`Responder`].

use anyhow::{Context, anyhow};
use serde_json::Value;

use crate::error::NfcError;
use crate::ndef::NdefMessage;
use crate::ndef::json::{message_from_json, message_to_json};

/// Commands the application layer can send into the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum NfcCommand {
    /// Deliver NDEF discoveries whose first record has this MIME type.
    RegisterMimeType(String),
    /// Deliver technology-list discoveries of NDEF tags.
    RegisterNdef,
    /// Deliver technology-list discoveries of NDEF-formatable tags.
    RegisterNdefFormatable,
    /// Deliver every tag discovery.
    RegisterTag,
    Connect,
    Close,
    ReadNdef,
    WriteNdef(NdefMessage),
    /// Legacy connect-less write.
    WriteTag(NdefMessage),
    ShareTag(NdefMessage),
    UnshareTag,
    Init,
}

impl NfcCommand {
    /// Map an action name and its arguments to a command.
    ///
    /// Returns `Ok(None)` for actions the bridge does not handle.  Names
    /// are matched ignoring case, except `registerTag`.
    pub fn parse(action: &str, args: &Value) -> anyhow::Result<Option<Self>> {
        if action == "registerTag" {
            return Ok(Some(Self::RegisterTag));
        }

        let command = match action.to_ascii_lowercase().as_str() {
            "registermimetype" => {
                let mime = first_arg(args)?
                    .as_str()
                    .ok_or_else(|| anyhow!("MIME type must be a string"))?;
                Self::RegisterMimeType(mime.to_owned())
            }
            "registerndef" => Self::RegisterNdef,
            "registerndefformatable" => Self::RegisterNdefFormatable,
            "connect" => Self::Connect,
            "close" => Self::Close,
            "readndef" => Self::ReadNdef,
            "writendef" => Self::WriteNdef(message_arg(args)?),
            "writetag" => Self::WriteTag(message_arg(args)?),
            "sharetag" => Self::ShareTag(message_arg(args)?),
            "unsharetag" => Self::UnshareTag,
            "init" => Self::Init,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    /// Actions answered "not connected" while no session is open, before
    /// their arguments are decoded.
    pub fn needs_session(action: &str) -> bool {
        matches!(
            action.to_ascii_lowercase().as_str(),
            "close" | "readndef" | "writendef"
        )
    }

    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterMimeType(_) => "registerMimeType",
            Self::RegisterNdef => "registerNdef",
            Self::RegisterNdefFormatable => "registerNdefFormatable",
            Self::RegisterTag => "registerTag",
            Self::Connect => "connect",
            Self::Close => "close",
            Self::ReadNdef => "readNdef",
            Self::WriteNdef(_) => "writeNdef",
            Self::WriteTag(_) => "writeTag",
            Self::ShareTag(_) => "shareTag",
            Self::UnshareTag => "unshareTag",
            Self::Init => "init",
        }
    }
}

fn first_arg(args: &Value) -> anyhow::Result<&Value> {
    args.as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| anyhow!("missing argument"))
}

fn message_arg(args: &Value) -> anyhow::Result<NdefMessage> {
    message_from_json(first_arg(args)?).context("bad NDEF records")
}

// ───────────────────────────────────────────────────────────────
// Replies
// ───────────────────────────────────────────────────────────────

/// Successful outcome of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    Done,
    /// Result of `readNdef`; `None` for an empty tag.
    Message(Option<NdefMessage>),
}

impl CommandOutput {
    /// Value handed back to application code.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Done => Value::Null,
            Self::Message(m) => message_to_json(m.as_ref()),
        }
    }
}

pub type CommandResult = Result<CommandOutput, NfcError>;

/// One-shot reply channel for a command, callable from any thread.
pub type Responder = Box<dyn FnOnce(CommandResult) + Send + 'static>;
