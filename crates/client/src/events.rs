//! Monitor events for consumers that live on another task.
//!
//! [`ChannelObserver`] turns observer callbacks into [`MonitorEvent`]s on
//! an unbounded channel, so a monitor can run in a spawned task while a
//! front end keeps reading user input.

use chrono::{DateTime, Utc};
use cliptrim_core::progress::ProgressPayload;
use cliptrim_core::types::ProcessId;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::monitor::ProgressObserver;

/// A state change of one monitored job.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A non-terminal payload arrived.
    Progress {
        process_id: ProcessId,
        payload: ProgressPayload,
        observed_at: DateTime<Utc>,
    },

    /// The job finished.
    Completed {
        process_id: ProcessId,
        payload: ProgressPayload,
        observed_at: DateTime<Utc>,
    },

    /// The job failed or could not be monitored.
    Failed {
        process_id: ProcessId,
        /// Human-readable error description.
        message: String,
        observed_at: DateTime<Utc>,
    },
}

impl MonitorEvent {
    pub fn process_id(&self) -> &ProcessId {
        match self {
            Self::Progress { process_id, .. }
            | Self::Completed { process_id, .. }
            | Self::Failed { process_id, .. } => process_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Forwards observer callbacks for one job into a channel.
///
/// Send failures mean the receiver is gone and are ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    process_id: ProcessId,
    tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl ChannelObserver {
    pub fn new(process_id: ProcessId, tx: mpsc::UnboundedSender<MonitorEvent>) -> Self {
        Self { process_id, tx }
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&mut self, payload: &ProgressPayload) {
        let _ = self.tx.send(MonitorEvent::Progress {
            process_id: self.process_id.clone(),
            payload: payload.clone(),
            observed_at: Utc::now(),
        });
    }

    fn on_complete(&mut self, payload: ProgressPayload) {
        let _ = self.tx.send(MonitorEvent::Completed {
            process_id: self.process_id.clone(),
            payload,
            observed_at: Utc::now(),
        });
    }

    fn on_error(&mut self, message: String) {
        let _ = self.tx.send(MonitorEvent::Failed {
            process_id: self.process_id.clone(),
            message,
            observed_at: Utc::now(),
        });
    }
}
