//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements     | Connects to                      |
//! |----------------|----------------|----------------------------------|
//! | `control`      | ControlContext | caller thread / dedicated thread |
//! | `log_sink`     | EventSink      | `log` output                     |
//! | `script_sink`  | EventSink      | web-view script evaluation       |
//!
//! Platform NFC adapters (tags, technologies, the device adapter) live in
//! the host and implement the remaining ports.

pub mod control;
pub mod log_sink;
pub mod script_sink;
