//! Foreground / background / shutdown handling.
//!
//! | Transition | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | pause      | disable dispatch and push, drop the adapter handle        |
//! | resume     | take the adapter, reinstall dispatch, re-apply P2P message |
//! | destroy    | force-close a session the application never closed        |
//!
//! All three run on the control context.

use std::sync::Arc;

use log::{debug, error, warn};

use crate::dispatch;

use super::service::NfcService;

impl NfcService {
    pub fn on_pause(&self) {
        debug!("onPause");
        if let Some(adapter) = self.bridge.take_adapter() {
            adapter.disable_foreground_dispatch();
            adapter.disable_ndef_push();
        }
    }

    pub fn on_resume(&self) {
        debug!("onResume");
        if self.bridge.has_adapter() {
            error!("NFC adapter was active on resume");
            return;
        }

        let Some(adapter) = self.ports.adapters.default_adapter() else {
            debug!("no NFC adapter on this device");
            return;
        };
        self.bridge.set_adapter(Some(Arc::clone(&adapter)));
        dispatch::reinstall(&self.bridge);

        if let Some(message) = self.bridge.p2p_message() {
            adapter.enable_ndef_push(&message);
        }
    }

    pub fn on_destroy(&self) {
        debug!("onDestroy");
        if let Some(session) = self.bridge.take_session() {
            warn!(
                "reaping the unreleased NFC session {}, nfc.close() was not called",
                session.id()
            );
            session.force_close();
        }
    }
}
