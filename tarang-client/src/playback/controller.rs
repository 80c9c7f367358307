//! Playback controller
//!
//! State machine over one media element:
//!
//! ```text
//! Idle --select(id)--> Loading --payload--> Playing <--toggle--> Paused
//!                         |                    \--ended--> Paused (time 0)
//!                         \--failure--> Error (selection cleared)
//! ```
//!
//! Selecting is split in two halves so the caller can await the network in
//! between: [`PlaybackController::select_track`] hands out a [`LoadTicket`],
//! [`PlaybackController::complete_load`] applies the payload only if that
//! ticket is still the current target. A newer selection (or a stop) makes
//! older tickets stale, and their results are dropped without effect.
//!
//! Invariant: `active_asset_id` is `Some` iff an object URL is bound.

use super::media::{HeadlessElement, MediaElement};
use crate::error::{ClientError, ClientResult};
use crate::object_url::{ObjectUrl, ObjectUrlRegistry};
use bytes::Bytes;
use serde::Serialize;
use tarang_common::events::{AssetSource, ClientEvent, EventBus, PlaybackState};
use tarang_common::time::now;
use tarang_common::AssetId;
use tracing::{debug, info, warn};

/// Outstanding payload fetch for a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    asset_id: AssetId,
    source: AssetSource,
    generation: u64,
}

impl LoadTicket {
    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn source(&self) -> AssetSource {
        self.source
    }
}

/// Result of selecting a track
#[derive(Debug, Clone, PartialEq)]
pub enum SelectOutcome {
    /// Track was already bound; play/pause toggled, no network access
    Toggled(PlaybackState),
    /// Track is already being fetched
    AlreadyLoading,
    /// Caller must fetch the payload and pass it to `complete_load`
    Load(LoadTicket),
}

/// Result of completing a load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Payload bound and playback started
    Applied,
    /// Ticket was superseded; nothing changed
    Discarded,
}

/// Read-only view of the playback session for UIs
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub active_asset_id: Option<AssetId>,
    pub loading_asset_id: Option<AssetId>,
    pub object_url: Option<String>,
    /// Size of the payload behind `object_url`
    pub payload_bytes: Option<usize>,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub volume: f64,
    pub muted: bool,
    pub last_error: Option<String>,
}

/// Single-element playback state machine
pub struct PlaybackController<M: MediaElement = HeadlessElement> {
    element: M,
    object_urls: ObjectUrlRegistry,
    events: EventBus,
    state: PlaybackState,
    active: Option<AssetId>,
    /// Listing the bound asset was selected from
    active_source: Option<AssetSource>,
    object_url: Option<ObjectUrl>,
    pending: Option<LoadTicket>,
    generation: u64,
    current_time: f64,
    duration: Option<f64>,
    volume: f64,
    /// Restored on unmute when the stored volume is zero
    last_audible_volume: f64,
    muted: bool,
    last_error: Option<String>,
}

impl<M: MediaElement> PlaybackController<M> {
    pub fn new(mut element: M, initial_volume: f64, events: EventBus) -> Self {
        let volume = if initial_volume.is_finite() {
            initial_volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        element.set_volume(volume);

        Self {
            element,
            object_urls: ObjectUrlRegistry::new(),
            events,
            state: PlaybackState::Idle,
            active: None,
            active_source: None,
            object_url: None,
            pending: None,
            generation: 0,
            current_time: 0.0,
            duration: None,
            volume,
            last_audible_volume: if volume > 0.0 { volume } else { 1.0 },
            muted: volume == 0.0,
            last_error: None,
        }
    }

    /// Select a track
    ///
    /// A track is its id within a source listing. Re-selecting the bound track
    /// toggles play/pause and never refetches. Selecting anything else
    /// releases the current payload, supersedes any outstanding load and
    /// returns a ticket for the new fetch.
    pub fn select_track(
        &mut self,
        asset_id: AssetId,
        source: AssetSource,
    ) -> ClientResult<SelectOutcome> {
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.asset_id == asset_id && p.source == source)
        {
            debug!(asset_id = %asset_id, "Track already loading");
            return Ok(SelectOutcome::AlreadyLoading);
        }

        if self.is_bound(&asset_id, source) {
            return self.toggle_play_pause().map(SelectOutcome::Toggled);
        }

        self.unbind();
        self.current_time = 0.0;
        self.duration = None;
        self.last_error = None;
        self.generation += 1;

        let ticket = LoadTicket {
            asset_id: asset_id.clone(),
            source,
            generation: self.generation,
        };
        if let Some(superseded) = self.pending.replace(ticket.clone()) {
            debug!(
                superseded = %superseded.asset_id,
                asset_id = %asset_id,
                "Load superseded by newer selection"
            );
        }

        info!(asset_id = %asset_id, source = %source, "Loading track");
        self.events.emit_lossy(ClientEvent::TrackLoading {
            asset_id,
            timestamp: now(),
        });
        self.set_state(PlaybackState::Loading);

        Ok(SelectOutcome::Load(ticket))
    }

    /// Apply the fetch result for `ticket`
    ///
    /// Stale tickets are discarded whatever their result. A failure moves to
    /// `Error` with no object URL left behind.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: ClientResult<Bytes>,
    ) -> ClientResult<LoadOutcome> {
        if self.pending.as_ref() != Some(ticket) {
            debug!(asset_id = %ticket.asset_id, "Discarding stale load response");
            self.events.emit_lossy(ClientEvent::TrackLoadDiscarded {
                asset_id: ticket.asset_id.clone(),
                timestamp: now(),
            });
            return Ok(LoadOutcome::Discarded);
        }
        self.pending = None;

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                self.fail(&ticket.asset_id, &e);
                return Err(e);
            }
        };

        let url = self.object_urls.acquire(payload);
        self.element.set_source(&url);
        self.element.set_volume(self.effective_volume());

        if let Err(e) = self.element.play() {
            self.element.clear_source();
            self.object_urls.release(Some(&url));
            self.fail(&ticket.asset_id, &e);
            return Err(e);
        }

        self.active = Some(ticket.asset_id.clone());
        self.active_source = Some(ticket.source);
        self.object_url = Some(url.clone());
        self.events.emit_lossy(ClientEvent::TrackLoaded {
            asset_id: ticket.asset_id.clone(),
            object_url: url.to_string(),
            timestamp: now(),
        });
        self.set_state(PlaybackState::Playing);

        Ok(LoadOutcome::Applied)
    }

    /// Transport play/pause for the bound track
    pub fn toggle_play_pause(&mut self) -> ClientResult<PlaybackState> {
        match self.state {
            PlaybackState::Playing => {
                self.element.pause();
                self.set_state(PlaybackState::Paused);
            }
            PlaybackState::Paused => {
                if let Err(e) = self.element.play() {
                    warn!(error = %e, "Resume refused");
                    self.last_error = Some(e.to_string());
                    return Err(e);
                }
                self.set_state(PlaybackState::Playing);
            }
            other => {
                return Err(ClientError::Validation(format!(
                    "No track ready to toggle (state: {})",
                    other
                )));
            }
        }
        Ok(self.state)
    }

    /// Seek; ignored until the duration is known
    ///
    /// Returns true if the position was applied.
    pub fn set_time(&mut self, seconds: f64) -> bool {
        let Some(duration) = self.duration else {
            return false;
        };
        if !self.state.is_ready() || !seconds.is_finite() {
            return false;
        }
        let position = seconds.clamp(0.0, duration);
        self.element.set_current_time(position);
        self.current_time = position;
        true
    }

    /// Volume slider; 0 mutes, any positive value unmutes
    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.volume = volume;
        if volume > 0.0 {
            self.last_audible_volume = volume;
            self.muted = false;
        } else {
            self.muted = true;
        }
        self.element.set_volume(volume);
    }

    /// Mute button; returns the new muted flag
    ///
    /// Muting leaves the stored volume untouched and unmuting restores it.
    pub fn toggle_mute(&mut self) -> bool {
        if self.muted {
            if self.volume == 0.0 {
                self.volume = self.last_audible_volume;
            }
            self.muted = false;
            self.element.set_volume(self.volume);
        } else {
            self.muted = true;
            self.element.set_volume(0.0);
        }
        self.muted
    }

    /// Media callback: metadata loaded
    pub fn on_loaded_metadata(&mut self, duration: f64) {
        if self.object_url.is_some() && duration.is_finite() && duration > 0.0 {
            self.duration = Some(duration);
        }
    }

    /// Media callback: position advanced
    pub fn on_time_update(&mut self, seconds: f64) {
        if self.object_url.is_some() && seconds.is_finite() {
            self.current_time = seconds.max(0.0);
        }
    }

    /// Media callback: reached the end
    ///
    /// Keeps the active selection so the UI still shows what was last played.
    pub fn on_ended(&mut self) {
        if !self.state.is_ready() {
            return;
        }
        self.element.pause();
        self.element.set_current_time(0.0);
        self.current_time = 0.0;
        self.set_state(PlaybackState::Paused);
    }

    /// Clear the selection, cancel any outstanding load, release the payload
    pub fn stop(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(asset_id = %pending.asset_id, "Outstanding load cancelled");
        }
        self.unbind();
        self.current_time = 0.0;
        self.duration = None;
        self.set_state(PlaybackState::Idle);
    }

    /// Stop only if `asset_id` from `source` is the active or loading target
    pub fn stop_if_target(&mut self, asset_id: &AssetId, source: AssetSource) -> bool {
        let is_target = self.target() == Some((asset_id, source));
        if is_target {
            self.stop();
        }
        is_target
    }

    /// Final release when the owning view goes away
    pub fn teardown(&mut self) {
        self.stop();
        let leaked = self.object_urls.release_all();
        if leaked > 0 {
            warn!(count = leaked, "Released object URLs left live at teardown");
        }
    }

    fn unbind(&mut self) {
        self.element.pause();
        if let Some(url) = self.object_url.take() {
            self.element.clear_source();
            self.object_urls.release(Some(&url));
        }
        self.active = None;
        self.active_source = None;
    }

    fn is_bound(&self, asset_id: &AssetId, source: AssetSource) -> bool {
        self.active.as_ref() == Some(asset_id) && self.active_source == Some(source)
    }

    fn fail(&mut self, asset_id: &AssetId, error: &ClientError) {
        warn!(asset_id = %asset_id, error = %error, "Playback failed");
        self.active = None;
        self.active_source = None;
        self.last_error = Some(error.to_string());
        self.events.emit_lossy(ClientEvent::PlaybackFailed {
            asset_id: asset_id.clone(),
            message: error.to_string(),
            timestamp: now(),
        });
        self.set_state(PlaybackState::Error);
    }

    fn set_state(&mut self, new_state: PlaybackState) {
        let old_state = self.state;
        if old_state == new_state {
            return;
        }
        self.state = new_state;
        debug!(old = %old_state, new = %new_state, "Playback state changed");
        self.events.emit_lossy(ClientEvent::PlaybackStateChanged {
            asset_id: self.target_asset_id().cloned(),
            old_state,
            new_state,
            timestamp: now(),
        });
    }

    fn effective_volume(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Asset bound to the element
    pub fn active_asset_id(&self) -> Option<&AssetId> {
        self.active.as_ref()
    }

    /// Asset being fetched
    pub fn loading_asset_id(&self) -> Option<&AssetId> {
        self.pending.as_ref().map(|p| &p.asset_id)
    }

    /// Loading target if any, else the bound asset
    pub fn target_asset_id(&self) -> Option<&AssetId> {
        self.target().map(|(id, _)| id)
    }

    /// Loading target or bound asset, with the listing it was selected from
    pub fn target(&self) -> Option<(&AssetId, AssetSource)> {
        match (&self.pending, &self.active, self.active_source) {
            (Some(pending), _, _) => Some((&pending.asset_id, pending.source)),
            (None, Some(id), Some(source)) => Some((id, source)),
            _ => None,
        }
    }

    pub fn object_url(&self) -> Option<&ObjectUrl> {
        self.object_url.as_ref()
    }

    pub fn object_urls(&self) -> &ObjectUrlRegistry {
        &self.object_urls
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Stored (slider) volume; unaffected by mute
    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn element(&self) -> &M {
        &self.element
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            active_asset_id: self.active.clone(),
            loading_asset_id: self.loading_asset_id().cloned(),
            object_url: self.object_url.as_ref().map(|u| u.to_string()),
            payload_bytes: self
                .object_url
                .as_ref()
                .and_then(|u| self.object_urls.resolve(u))
                .map(|payload| payload.len()),
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume,
            muted: self.muted,
            last_error: self.last_error.clone(),
        }
    }
}

impl<M: MediaElement> Drop for PlaybackController<M> {
    fn drop(&mut self) {
        if self.object_url.is_some() || self.object_urls.live_count() > 0 {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> PlaybackController {
        PlaybackController::new(HeadlessElement::new(), 0.8, EventBus::new(64))
    }

    fn load(c: &mut PlaybackController, id: &str) -> LoadTicket {
        match c.select_track(AssetId::from(id), AssetSource::Generated).unwrap() {
            SelectOutcome::Load(ticket) => ticket,
            other => panic!("expected load, got {:?}", other),
        }
    }

    fn payload() -> ClientResult<Bytes> {
        Ok(Bytes::from_static(b"ID3 fake mp3"))
    }

    #[test]
    fn test_select_load_play() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        assert_eq!(c.state(), PlaybackState::Loading);
        assert!(c.active_asset_id().is_none());
        assert_eq!(c.loading_asset_id().unwrap().as_str(), "a");

        assert_eq!(c.complete_load(&ticket, payload()).unwrap(), LoadOutcome::Applied);
        assert_eq!(c.state(), PlaybackState::Playing);
        assert_eq!(c.active_asset_id().unwrap().as_str(), "a");
        assert!(c.object_url().is_some());
        assert!(c.element().playing);
        assert_eq!(c.element().volume, 0.8);
        assert_eq!(c.snapshot().payload_bytes, Some(b"ID3 fake mp3".len()));

        c.stop();
        assert!(c.snapshot().payload_bytes.is_none());
    }

    #[test]
    fn test_reselect_toggles_without_load() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        c.complete_load(&ticket, payload()).unwrap();
        let url = c.object_url().cloned();

        let outcome = c.select_track(AssetId::from("a"), AssetSource::Generated).unwrap();
        assert_eq!(outcome, SelectOutcome::Toggled(PlaybackState::Paused));
        assert!(!c.element().playing);

        let outcome = c.select_track(AssetId::from("a"), AssetSource::Generated).unwrap();
        assert_eq!(outcome, SelectOutcome::Toggled(PlaybackState::Playing));
        assert_eq!(c.object_url().cloned(), url);
        assert_eq!(c.object_urls().acquired_total(), 1);
    }

    #[test]
    fn test_reselect_while_loading_is_noop() {
        let mut c = controller();
        let _ticket = load(&mut c, "a");
        let outcome = c.select_track(AssetId::from("a"), AssetSource::Generated).unwrap();
        assert_eq!(outcome, SelectOutcome::AlreadyLoading);
    }

    #[test]
    fn test_switch_releases_previous_url() {
        let mut c = controller();
        let first = load(&mut c, "a");
        c.complete_load(&first, payload()).unwrap();
        let first_url = c.object_url().cloned().unwrap();

        let second = load(&mut c, "b");
        assert!(!c.object_urls().is_live(&first_url));
        assert_eq!(c.object_urls().live_count(), 0);
        assert!(c.element().source.is_none());

        c.complete_load(&second, payload()).unwrap();
        assert_eq!(c.object_urls().live_count(), 1);
        assert_eq!(c.active_asset_id().unwrap().as_str(), "b");
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut c = controller();
        let first = load(&mut c, "a");
        let second = load(&mut c, "b");

        assert_eq!(c.complete_load(&first, payload()).unwrap(), LoadOutcome::Discarded);
        assert_eq!(c.state(), PlaybackState::Loading);
        assert_eq!(c.object_urls().live_count(), 0);

        assert_eq!(c.complete_load(&second, payload()).unwrap(), LoadOutcome::Applied);
        assert_eq!(c.active_asset_id().unwrap().as_str(), "b");
    }

    #[test]
    fn test_stale_failure_discarded() {
        let mut c = controller();
        let first = load(&mut c, "a");
        let second = load(&mut c, "b");
        c.complete_load(&second, payload()).unwrap();

        let outcome = c
            .complete_load(&first, Err(ClientError::Transport("late".into())))
            .unwrap();
        assert_eq!(outcome, LoadOutcome::Discarded);
        assert_eq!(c.state(), PlaybackState::Playing);
        assert!(c.last_error().is_none());
    }

    #[test]
    fn test_failure_enters_error_and_allows_retry() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        let result = c.complete_load(&ticket, Err(ClientError::Transport("down".into())));

        assert!(result.is_err());
        assert_eq!(c.state(), PlaybackState::Error);
        assert!(c.active_asset_id().is_none());
        assert!(c.object_url().is_none());
        assert_eq!(c.object_urls().live_count(), 0);
        assert!(c.last_error().is_some());

        let retry = load(&mut c, "a");
        assert_eq!(c.complete_load(&retry, payload()).unwrap(), LoadOutcome::Applied);
    }

    #[test]
    fn test_refused_play_leaves_no_url() {
        let mut element = HeadlessElement::new();
        element.refuse_next_play = true;
        let mut c = PlaybackController::new(element, 0.8, EventBus::new(8));
        let ticket = load(&mut c, "a");

        assert!(c.complete_load(&ticket, payload()).is_err());
        assert_eq!(c.state(), PlaybackState::Error);
        assert_eq!(c.object_urls().live_count(), 0);
        assert!(c.element().source.is_none());
    }

    #[test]
    fn test_seek_requires_duration_and_clamps() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        c.complete_load(&ticket, payload()).unwrap();

        assert!(!c.set_time(10.0));

        c.on_loaded_metadata(120.0);
        assert!(c.set_time(30.5));
        assert_eq!(c.current_time(), 30.5);
        assert_eq!(c.element().current_time, 30.5);

        assert!(c.set_time(500.0));
        assert_eq!(c.current_time(), 120.0);
        assert!(c.set_time(-4.0));
        assert_eq!(c.current_time(), 0.0);
    }

    #[test]
    fn test_invalid_duration_ignored() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        c.complete_load(&ticket, payload()).unwrap();
        c.on_loaded_metadata(f64::INFINITY);
        c.on_loaded_metadata(0.0);
        assert!(c.duration().is_none());
    }

    #[test]
    fn test_volume_and_mute() {
        let mut c = controller();

        c.set_volume(0.0);
        assert!(c.is_muted());

        c.set_volume(0.4);
        assert!(!c.is_muted());
        assert_eq!(c.element().volume, 0.4);

        assert!(c.toggle_mute());
        assert_eq!(c.volume(), 0.4);
        assert_eq!(c.element().volume, 0.0);

        assert!(!c.toggle_mute());
        assert_eq!(c.volume(), 0.4);
        assert_eq!(c.element().volume, 0.4);
    }

    #[test]
    fn test_positive_volume_while_muted_unmutes() {
        let mut c = controller();
        c.toggle_mute();
        c.set_volume(0.6);
        assert!(!c.is_muted());
        assert_eq!(c.element().volume, 0.6);
    }

    #[test]
    fn test_unmute_after_slider_zero_restores_last_audible() {
        let mut c = controller();
        c.set_volume(0.3);
        c.set_volume(0.0);
        assert!(c.is_muted());
        assert!(!c.toggle_mute());
        assert_eq!(c.volume(), 0.3);
    }

    #[test]
    fn test_track_end_keeps_selection() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        c.complete_load(&ticket, payload()).unwrap();
        c.on_time_update(42.0);
        c.on_ended();

        assert_eq!(c.state(), PlaybackState::Paused);
        assert_eq!(c.current_time(), 0.0);
        assert_eq!(c.active_asset_id().unwrap().as_str(), "a");
        assert!(c.object_url().is_some());
    }

    #[test]
    fn test_stop_if_target() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        c.complete_load(&ticket, payload()).unwrap();

        assert!(!c.stop_if_target(&AssetId::from("b"), AssetSource::Generated));
        assert!(!c.stop_if_target(&AssetId::from("a"), AssetSource::Uploaded));
        assert!(c.stop_if_target(&AssetId::from("a"), AssetSource::Generated));
        assert_eq!(c.state(), PlaybackState::Idle);
        assert!(c.active_asset_id().is_none());
        assert_eq!(c.object_urls().live_count(), 0);
    }

    #[test]
    fn test_same_id_from_other_source_is_a_new_track() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        c.complete_load(&ticket, payload()).unwrap();
        assert_eq!(c.target(), Some((&AssetId::from("a"), AssetSource::Generated)));

        let ticket = match c.select_track(AssetId::from("a"), AssetSource::Uploaded).unwrap() {
            SelectOutcome::Load(ticket) => ticket,
            other => panic!("expected load, got {:?}", other),
        };
        assert_eq!(ticket.source(), AssetSource::Uploaded);
        assert_eq!(c.target(), Some((&AssetId::from("a"), AssetSource::Uploaded)));
        assert_eq!(c.object_urls().live_count(), 0);

        c.complete_load(&ticket, payload()).unwrap();
        assert_eq!(c.target(), Some((&AssetId::from("a"), AssetSource::Uploaded)));
    }

    #[test]
    fn test_stop_cancels_outstanding_load() {
        let mut c = controller();
        let ticket = load(&mut c, "a");
        c.stop();
        assert_eq!(c.complete_load(&ticket, payload()).unwrap(), LoadOutcome::Discarded);
        assert_eq!(c.state(), PlaybackState::Idle);
        assert_eq!(c.object_urls().live_count(), 0);
    }

    #[test]
    fn test_toggle_without_track_rejected() {
        let mut c = controller();
        assert!(c.toggle_play_pause().is_err());
    }

    #[tokio::test]
    async fn test_state_events_emitted() {
        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let mut c = PlaybackController::new(HeadlessElement::new(), 0.8, events);
        let ticket = load(&mut c, "a");
        c.complete_load(&ticket, payload()).unwrap();

        let mut transitions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ClientEvent::PlaybackStateChanged { new_state, .. } = event {
                transitions.push(new_state);
            }
        }
        assert_eq!(transitions, [PlaybackState::Loading, PlaybackState::Playing]);
    }
}
