//! Event types for the tarang event system
//!
//! Provides shared event definitions and the EventBus used by every front-end
//! to reflect intermediate progress (spinners, disabled actions) while network
//! calls are outstanding.

mod analysis_types;
mod asset_types;
mod playback_types;

pub use analysis_types::{AnalysisStage, PipelineStep};
pub use asset_types::AssetSource;
pub use playback_types::PlaybackState;

use crate::AssetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Client event types
///
/// Broadcast via EventBus; serializable so a front-end can forward them as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Playback controller changed state
    PlaybackStateChanged {
        /// Active asset after the change (None when cleared)
        asset_id: Option<AssetId>,
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// Binary payload fetch started for a newly selected track
    TrackLoading {
        asset_id: AssetId,
        timestamp: DateTime<Utc>,
    },

    /// Payload bound to the media element
    TrackLoaded {
        asset_id: AssetId,
        object_url: String,
        timestamp: DateTime<Utc>,
    },

    /// A superseded load completed and was dropped without effect
    TrackLoadDiscarded {
        asset_id: AssetId,
        timestamp: DateTime<Utc>,
    },

    /// Load failed; controller is in the Error state
    PlaybackFailed {
        asset_id: AssetId,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Registry replaced its listing
    AssetsRefreshed {
        source: AssetSource,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Listing refresh failed; previous list kept
    AssetsRefreshFailed {
        source: AssetSource,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Remote delete confirmed and asset removed from the registry
    AssetDeleted {
        asset_id: AssetId,
        /// True if the asset was the active playback target
        was_active: bool,
        timestamp: DateTime<Utc>,
    },

    /// Remote delete failed; registry and playback untouched
    AssetDeleteFailed {
        asset_id: AssetId,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Analysis run moved to a new stage
    AnalysisStageChanged {
        run_id: Uuid,
        old_stage: AnalysisStage,
        new_stage: AnalysisStage,
        timestamp: DateTime<Utc>,
    },

    /// Analysis step failed; pipeline halted
    AnalysisFailed {
        run_id: Uuid,
        step: PipelineStep,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Cloning shares the underlying channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use tarang_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
