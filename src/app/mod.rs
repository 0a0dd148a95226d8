//! Application core: the bridge's domain logic.
//!
//! Commands come in, events go out, and every platform collaborator (the
//! NFC stack, the host's control thread, event delivery) is reached through
//! the **port traits** in [`ports`], so the whole core runs against mock
//! adapters in tests.

pub mod commands;
pub mod events;
pub mod intent;
pub mod lifecycle;
pub mod ports;
pub mod service;
