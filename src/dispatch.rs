//! Dispatch registrar.
//!
//! Application code registers interest in discoveries (by MIME type, by
//! technology, or for every tag).  The accumulated set lives in the
//! [`InterestRegistry`]; whenever it changes, or the application comes back
//! to the foreground, a consistent [`DispatchRegistration`] snapshot is
//! installed with the adapter in one call, from the control context.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::app::intent::IntentAction;
use crate::app::ports::{ControlContext, TECH_NDEF, TECH_NDEF_FORMATABLE};
use crate::error::NfcError;
use crate::state::{BridgeState, lock};

/// One foreground-dispatch filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchFilter {
    pub action: IntentAction,
    /// Only for [`IntentAction::NdefDiscovered`] filters.
    pub mime_type: Option<String>,
}

/// A filter plus, for technology discoveries, the technologies it needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interest {
    pub filter: DispatchFilter,
    pub tech_list: Option<Vec<String>>,
}

impl Interest {
    /// NDEF discoveries of the given (already validated) MIME type.
    pub fn mime(mime_type: String) -> Self {
        Self {
            filter: DispatchFilter {
                action: IntentAction::NdefDiscovered,
                mime_type: Some(mime_type),
            },
            tech_list: None,
        }
    }

    /// Technology discoveries of tags offering `tech`.
    pub fn tech(tech: &str) -> Self {
        Self {
            filter: DispatchFilter {
                action: IntentAction::TechDiscovered,
                mime_type: None,
            },
            tech_list: Some(vec![tech.to_owned()]),
        }
    }

    pub fn ndef() -> Self {
        Self::tech(TECH_NDEF)
    }

    pub fn ndef_formatable() -> Self {
        Self::tech(TECH_NDEF_FORMATABLE)
    }

    /// Catch-all tag discoveries.
    pub fn tag() -> Self {
        Self {
            filter: DispatchFilter {
                action: IntentAction::TagDiscovered,
                mime_type: None,
            },
            tech_list: None,
        }
    }
}

/// The complete set handed to the adapter in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchRegistration {
    pub filters: Vec<DispatchFilter>,
    pub tech_lists: Vec<Vec<String>>,
}

/// Every interest registered so far, in registration order, without
/// duplicates.
pub struct InterestRegistry {
    interests: Mutex<Vec<Interest>>,
}

impl InterestRegistry {
    pub fn new() -> Self {
        Self {
            interests: Mutex::new(Vec::new()),
        }
    }

    /// Add `interest`; returns `false` if it was already registered.
    pub fn add(&self, interest: Interest) -> bool {
        let mut interests = lock(&self.interests);
        if interests.contains(&interest) {
            return false;
        }
        interests.push(interest);
        true
    }

    /// Consistent view of the whole set.
    pub fn snapshot(&self) -> DispatchRegistration {
        let interests = lock(&self.interests);
        let mut registration = DispatchRegistration::default();
        for interest in interests.iter() {
            if !registration.filters.contains(&interest.filter) {
                registration.filters.push(interest.filter.clone());
            }
            if let Some(techs) = &interest.tech_list {
                registration.tech_lists.push(techs.clone());
            }
        }
        registration
    }
}

impl Default for InterestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check and normalise a MIME type: `major/minor`, both parts non-empty.
pub fn validate_mime(raw: &str) -> Result<String, NfcError> {
    let mime = raw.trim();
    match mime.split_once('/') {
        Some((major, minor)) if !major.is_empty() && !minor.is_empty() => {
            Ok(mime.to_ascii_lowercase())
        }
        _ => Err(NfcError::InvalidMimeType(raw.to_owned())),
    }
}

/// Install the current registration.  Must run on the control context; a
/// no-op while no adapter handle is held.
pub fn reinstall(bridge: &BridgeState) {
    let Some(adapter) = bridge.adapter() else {
        return;
    };
    let registration = bridge.registry().snapshot();
    debug!(
        "Installing foreground dispatch: {} filter(s), {} tech list(s)",
        registration.filters.len(),
        registration.tech_lists.len()
    );
    adapter.enable_foreground_dispatch(&registration);
}

/// Schedule [`reinstall`] on the control context.
pub fn request_reinstall(bridge: &Arc<BridgeState>, control: &dyn ControlContext) {
    // Nothing to install into while backgrounded; resume reinstalls anyway.
    if !bridge.has_adapter() {
        return;
    }
    let bridge = Arc::clone(bridge);
    control.run_on_control(Box::new(move || reinstall(&bridge)));
}
