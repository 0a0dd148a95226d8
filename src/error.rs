//! Unified error types for the NFC bridge.
//!
//! Every command failure funnels into [`NfcError`], whose `Display` text is
//! exactly what the application layer receives.  Hardware I/O reports
//! through the narrower [`TagIoError`], which keeps tag-loss apart from
//! ordinary I/O failure so every caller can treat it specially.

use core::fmt;

// ---------------------------------------------------------------------------
// Hardware I/O outcome
// ---------------------------------------------------------------------------

/// Failure of a single blocking tag operation.
///
/// Returned by every I/O method on the technology ports.  `TagLost` is the
/// privileged kind: it always tears the session down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagIoError {
    /// The tag left the reader's field mid-operation.
    TagLost,
    /// Any other I/O failure, with the platform's message.
    Io(String),
}

impl fmt::Display for TagIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagLost => write!(f, "tag was lost"),
            Self::Io(msg) => write!(f, "{msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// I/O operation label
// ---------------------------------------------------------------------------

/// Which hardware operation an [`NfcError::Io`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Connect,
    Read,
    Write,
    Close,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the text names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level bridge error
// ---------------------------------------------------------------------------

/// Every reportable command failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NfcError {
    /// The device has no NFC adapter.
    NoNfc,
    /// The adapter exists but NFC is switched off.
    NfcDisabled,
    /// `connect` while a session is already open.
    AlreadyConnected,
    /// No tag has been discovered (or the last one was lost).
    NoTagDetected,
    /// The detected tag offers neither NDEF nor NDEF-formatable access.
    TagUnsupported,
    /// The command needs an open session and there is none.
    NotConnected,
    /// A read was requested on a technology without NDEF access.
    NotNdef,
    /// The tag refuses writes.
    ReadOnly,
    /// The encoded message does not fit on the tag.
    TooLarge { capacity: usize, size: usize },
    /// The tag left the field during the operation.
    TagLost,
    /// Hardware I/O failed for a reason other than tag loss.
    Io { op: IoOp, message: String },
    /// `registerMimeType` received something that is not a MIME type.
    InvalidMimeType(String),
    /// Command arguments could not be decoded.
    InvalidArgument(String),
    /// The session worker could not be started or refused the request.
    Worker(String),
    /// The bridge configuration was rejected.
    Config(ConfigError),
}

impl NfcError {
    /// Classify a port failure for a given operation.
    pub fn from_io(op: IoOp, err: TagIoError) -> Self {
        match err {
            TagIoError::TagLost => Self::TagLost,
            TagIoError::Io(message) => Self::Io { op, message },
        }
    }
}

impl fmt::Display for NfcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNfc => write!(f, "NO_NFC"),
            Self::NfcDisabled => write!(f, "NFC_DISABLED"),
            Self::AlreadyConnected => write!(f, "Already connected"),
            Self::NoTagDetected => write!(f, "No tag is detected"),
            Self::TagUnsupported => write!(f, "Tag doesn't support NDEF"),
            Self::NotConnected => write!(f, "Tag is not connected"),
            Self::NotNdef => write!(f, "Tag does not have a NDEF message"),
            Self::ReadOnly => write!(f, "NDEF write error: Tag is read only"),
            Self::TooLarge { capacity, size } => write!(
                f,
                "NDEF write error: Tag capacity is {capacity} bytes, message is {size} bytes."
            ),
            Self::TagLost => write!(f, "Tag left the field"),
            Self::Io { op, message } => match op {
                IoOp::Connect => write!(f, "NFC tag connect failed: {message}"),
                IoOp::Read => write!(f, "NDEF read error: {message}"),
                IoOp::Write => write!(f, "NDEF write error: {message}"),
                IoOp::Close => write!(f, "Failed to close NFC tag connection: {message}"),
            },
            Self::InvalidMimeType(_) => write!(f, "Invalid MIME Type"),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            Self::Worker(msg) => write!(f, "NFC worker error: {msg}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for NfcError {}

impl From<ConfigError> for NfcError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
