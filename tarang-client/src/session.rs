//! Studio session
//!
//! Owns everything one signed-in view needs: the remote service, the playback
//! controller, one registry per asset source and the analysis pipeline.
//!
//! No lock is held across a network await. Each operation locks to decide,
//! unlocks to call the service, then locks again to apply, so a second user
//! action can interleave with an outstanding one; the ticket/generation guards
//! in the controller and registries decide which response wins. When both a
//! registry and the controller are needed, the registry is locked first.

use crate::error::{ClientError, ClientResult};
use crate::models::{AudioAsset, UserProfile};
use crate::pipeline::AnalysisPipeline;
use crate::playback::{
    HeadlessElement, LoadOutcome, MediaElement, PlaybackController, PlaybackSnapshot,
    SelectOutcome,
};
use crate::registry::{AssetRegistry, RefreshOutcome};
use crate::services::{AudioService, HttpAudioService};
use std::sync::Arc;
use tarang_common::config::ClientConfig;
use tarang_common::events::{AssetSource, ClientEvent, EventBus, PlaybackState};
use tarang_common::time::now;
use tarang_common::AssetId;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

/// Label shown when the playing asset is not in any listing
pub const UNKNOWN_FILE_LABEL: &str = "Unknown file";

const EVENT_CAPACITY: usize = 100;

/// What selecting a track ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSelection {
    /// Already bound: play/pause toggled without a fetch
    Toggled(PlaybackState),
    /// Same track still loading; nothing done
    AlreadyLoading,
    /// Fetched, bound and playing
    Loaded,
    /// Fetched, but a newer selection had taken over
    Superseded,
}

/// One signed-in user's audio workspace
pub struct StudioSession<M: MediaElement = HeadlessElement> {
    service: Arc<dyn AudioService>,
    profile: UserProfile,
    playback: Mutex<PlaybackController<M>>,
    uploads: Mutex<AssetRegistry>,
    generated: Mutex<AssetRegistry>,
    pipeline: AnalysisPipeline,
    events: EventBus,
}

impl StudioSession<HeadlessElement> {
    /// Session against the configured HTTP service with headless output
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let service = Arc::new(HttpAudioService::new(config)?);
        let profile = UserProfile {
            id: config.user_id.clone().unwrap_or_default(),
            email: config.email.clone(),
            full_name: config.full_name.clone(),
        };
        Ok(Self::new(
            service,
            profile,
            HeadlessElement::new(),
            config.default_volume,
            EventBus::new(EVENT_CAPACITY),
        ))
    }
}

impl<M: MediaElement> StudioSession<M> {
    pub fn new(
        service: Arc<dyn AudioService>,
        profile: UserProfile,
        element: M,
        volume: f64,
        events: EventBus,
    ) -> Self {
        Self {
            pipeline: AnalysisPipeline::new(service.clone(), profile.clone(), events.clone()),
            playback: Mutex::new(PlaybackController::new(element, volume, events.clone())),
            uploads: Mutex::new(AssetRegistry::new(AssetSource::Uploaded, events.clone())),
            generated: Mutex::new(AssetRegistry::new(AssetSource::Generated, events.clone())),
            service,
            profile,
            events,
        }
    }

    fn registry(&self, source: AssetSource) -> &Mutex<AssetRegistry> {
        match source {
            AssetSource::Uploaded => &self.uploads,
            AssetSource::Generated => &self.generated,
        }
    }

    fn user_id(&self) -> ClientResult<&str> {
        if self.profile.has_id() {
            Ok(&self.profile.id)
        } else {
            Err(ClientError::Validation("No user signed in".to_string()))
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Replace the listing of `source` with the server's current one
    ///
    /// On failure the previous listing stays and the registry's error flag is
    /// set. A listing overtaken by a newer refresh is dropped.
    pub async fn refresh(&self, source: AssetSource) -> ClientResult<Vec<AudioAsset>> {
        let user_id = self.user_id()?;
        let ticket = self.registry(source).lock().await.begin_refresh();

        let listing = self.service.list_assets(source, user_id).await;

        let mut registry = self.registry(source).lock().await;
        if registry.apply_listing(ticket, listing)? == RefreshOutcome::Superseded {
            debug!(source = %source, "Listing superseded; returning current snapshot");
        }
        Ok(registry.snapshot())
    }

    /// Snapshot of the current listing of `source`
    pub async fn assets(&self, source: AssetSource) -> Vec<AudioAsset> {
        self.registry(source).lock().await.snapshot()
    }

    pub async fn refresh_error(&self, source: AssetSource) -> Option<String> {
        self.registry(source)
            .lock()
            .await
            .refresh_error()
            .map(str::to_string)
    }

    pub async fn delete_error(&self, source: AssetSource) -> Option<String> {
        self.registry(source)
            .lock()
            .await
            .delete_error()
            .map(str::to_string)
    }

    /// Select a track from `source`
    ///
    /// Re-selecting the bound track toggles play/pause without a fetch.
    pub async fn select_track(
        &self,
        asset_id: AssetId,
        source: AssetSource,
    ) -> ClientResult<TrackSelection> {
        let outcome = self
            .playback
            .lock()
            .await
            .select_track(asset_id.clone(), source)?;

        let ticket = match outcome {
            SelectOutcome::Toggled(state) => return Ok(TrackSelection::Toggled(state)),
            SelectOutcome::AlreadyLoading => return Ok(TrackSelection::AlreadyLoading),
            SelectOutcome::Load(ticket) => ticket,
        };

        let payload = self.service.fetch_asset(source, &asset_id).await;

        let applied = self.playback.lock().await.complete_load(&ticket, payload)?;
        Ok(match applied {
            LoadOutcome::Applied => TrackSelection::Loaded,
            LoadOutcome::Discarded => TrackSelection::Superseded,
        })
    }

    /// Transport play/pause
    pub async fn toggle_play_pause(&self) -> ClientResult<PlaybackState> {
        self.playback.lock().await.toggle_play_pause()
    }

    pub async fn seek(&self, seconds: f64) -> bool {
        self.playback.lock().await.set_time(seconds)
    }

    pub async fn set_volume(&self, volume: f64) {
        self.playback.lock().await.set_volume(volume);
    }

    pub async fn toggle_mute(&self) -> bool {
        self.playback.lock().await.toggle_mute()
    }

    pub async fn on_loaded_metadata(&self, duration: f64) {
        self.playback.lock().await.on_loaded_metadata(duration);
    }

    pub async fn on_time_update(&self, seconds: f64) {
        self.playback.lock().await.on_time_update(seconds);
    }

    pub async fn on_ended(&self) {
        self.playback.lock().await.on_ended();
    }

    pub async fn stop(&self) {
        self.playback.lock().await.stop();
    }

    /// Delete an asset once the server confirms
    ///
    /// Returns true if it was the playback target. Removal from the listing and
    /// stopping playback happen under the same locks, so no observer sees the
    /// asset gone while still "now playing". A failed delete touches neither.
    pub async fn delete(&self, source: AssetSource, asset_id: &AssetId) -> ClientResult<bool> {
        let user_id = self.user_id()?;
        self.registry(source).lock().await.ensure_deletable(asset_id)?;

        if let Err(e) = self.service.delete_asset(asset_id, user_id).await {
            self.registry(source).lock().await.fail_delete(asset_id, &e);
            return Err(e);
        }

        let mut registry = self.registry(source).lock().await;
        let mut playback = self.playback.lock().await;
        registry.remove(asset_id);
        let was_active = playback.stop_if_target(asset_id, source);
        drop(playback);
        drop(registry);

        info!(asset_id = %asset_id, was_active, "Asset deleted");
        self.events.emit_lossy(ClientEvent::AssetDeleted {
            asset_id: asset_id.clone(),
            was_active,
            timestamp: now(),
        });
        Ok(was_active)
    }

    /// Filename of the playback target, or [`UNKNOWN_FILE_LABEL`]
    ///
    /// Looked up only in the listing the track was selected from. `None` when
    /// nothing is selected.
    pub async fn now_playing_label(&self) -> Option<String> {
        let (target, source) = {
            let playback = self.playback.lock().await;
            let (id, source) = playback.target()?;
            (id.clone(), source)
        };

        let label = self
            .registry(source)
            .lock()
            .await
            .filename_of(&target)
            .map(str::to_string);
        Some(label.unwrap_or_else(|| UNKNOWN_FILE_LABEL.to_string()))
    }

    pub async fn playback_snapshot(&self) -> PlaybackSnapshot {
        self.playback.lock().await.snapshot()
    }

    /// Live object URLs held by the playback controller (0 or 1)
    pub async fn live_playback_urls(&self) -> usize {
        self.playback.lock().await.object_urls().live_count()
    }

    /// Tear down the view: release every local reference
    pub async fn close(&self) {
        self.playback.lock().await.teardown();
        self.pipeline.close().await;
        debug!("Session closed");
    }
}
