//! Tag classifier.
//!
//! Picks the access technology a session will drive: NDEF when the tag is
//! NDEF-formatted, otherwise NDEF-formatable, otherwise nothing.  Pure
//! capability lookup; no I/O happens here.

use std::sync::Arc;

use crate::app::ports::{FormatableTech, NdefTech, Tag};
use crate::error::TagIoError;

/// The technology a session is bound to.
#[derive(Clone)]
pub enum TagTech {
    Ndef(Arc<dyn NdefTech>),
    Formatable(Arc<dyn FormatableTech>),
}

impl TagTech {
    pub fn is_ndef(&self) -> bool {
        matches!(self, Self::Ndef(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ndef(_) => "Ndef",
            Self::Formatable(_) => "NdefFormatable",
        }
    }

    pub fn connect(&self) -> Result<(), TagIoError> {
        match self {
            Self::Ndef(t) => t.connect(),
            Self::Formatable(t) => t.connect(),
        }
    }

    pub fn close(&self) -> Result<(), TagIoError> {
        match self {
            Self::Ndef(t) => t.close(),
            Self::Formatable(t) => t.close(),
        }
    }
}

impl core::fmt::Debug for TagTech {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Select the technology to use for `tag`, preferring NDEF.
pub fn classify(tag: &dyn Tag) -> Option<TagTech> {
    tag.ndef()
        .map(TagTech::Ndef)
        .or_else(|| tag.ndef_formatable().map(TagTech::Formatable))
}
