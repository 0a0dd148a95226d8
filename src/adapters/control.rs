//! Control-context adapters.
//!
//! | Adapter         | Runs tasks                                       |
//! |-----------------|--------------------------------------------------|
//! | `InlineControl` | immediately, on the caller (host already is the  |
//! |                 | control thread, or in tests)                     |
//! | `ControlLoop`   | on a dedicated named thread, in posting order    |

use log::warn;

use crate::app::ports::{ControlContext, ControlTask};
use crate::config::BridgeConfig;
use crate::error::NfcError;
use crate::worker::{Flow, SerialWorker};

/// Runs every task on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineControl;

impl ControlContext for InlineControl {
    fn run_on_control(&self, task: ControlTask) {
        task();
    }
}

/// A dedicated control thread fed through a [`SerialWorker`].
pub struct ControlLoop {
    worker: SerialWorker<ControlTask>,
}

impl ControlLoop {
    pub fn start(config: &BridgeConfig) -> Result<Self, NfcError> {
        let worker = SerialWorker::spawn(
            &config.control_name,
            config.worker_stack_kb,
            |task: ControlTask| {
                task();
                Flow::Continue
            },
            drop,
        )
        .map_err(|e| NfcError::Worker(e.to_string()))?;
        Ok(Self { worker })
    }

    /// Stop the thread; tasks not yet started are dropped.
    pub fn shutdown(&self) {
        self.worker.stop();
    }
}

impl ControlContext for ControlLoop {
    fn run_on_control(&self, task: ControlTask) {
        if self.worker.post(task).is_err() {
            warn!("control loop stopped; task dropped");
        }
    }
}
