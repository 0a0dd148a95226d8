//! Bridge configuration parameters
//!
//! All tunable parameters for the NFC bridge.
//! The host loads these however it likes (typically JSON) and hands them to
//! [`NfcService::new`](crate::app::service::NfcService::new).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Smallest stack a worker thread may be given.
const MIN_WORKER_STACK_KB: usize = 16;

/// Core bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    // --- Session worker ---
    /// Thread name for every tag-session worker
    pub worker_name: String,
    /// Stack size of a tag-session worker (KiB)
    pub worker_stack_kb: usize,

    // --- Control loop ---
    /// Thread name for the dedicated control loop adapter
    pub control_name: String,

    // --- Discovery ---
    /// Drop discovery intents replayed from the recent-apps history
    pub ignore_recycled_intents: bool,
    /// Log the rendered payload of every emitted event at trace level
    pub trace_event_payloads: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_name: "nfc-worker".into(),
            worker_stack_kb: 64,
            control_name: "nfc-control".into(),
            ignore_recycled_intents: true,
            trace_event_payloads: true,
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("worker_name must not be empty"));
        }
        if self.control_name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("control_name must not be empty"));
        }
        if self.worker_stack_kb < MIN_WORKER_STACK_KB {
            return Err(ConfigError::ValidationFailed("worker_stack_kb below 16"));
        }
        Ok(())
    }
}
