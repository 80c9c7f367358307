//! Asset registry
//!
//! In-memory, user-scoped listing of one asset source. The registry never
//! talks to the network itself: the session begins a refresh, awaits the
//! listing without holding the registry, then applies it. Each refresh carries
//! a generation so a slow listing cannot overwrite a newer one.
//!
//! Consumers only read snapshots; mutation goes through the methods below.

use crate::error::{ClientError, ClientResult};
use crate::models::AudioAsset;
use std::collections::HashSet;
use tarang_common::events::{AssetSource, ClientEvent, EventBus};
use tarang_common::time::now;
use tarang_common::AssetId;
use tracing::{debug, info, warn};

/// Outstanding listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

/// Result of applying a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Listing replaced; number of distinct assets
    Replaced(usize),
    /// A newer refresh was started; listing dropped
    Superseded,
}

/// Listing of one asset source for the current user
#[derive(Debug)]
pub struct AssetRegistry {
    source: AssetSource,
    assets: Vec<AudioAsset>,
    loaded: bool,
    refreshing: bool,
    generation: u64,
    refresh_error: Option<String>,
    delete_error: Option<String>,
    events: EventBus,
}

impl AssetRegistry {
    pub fn new(source: AssetSource, events: EventBus) -> Self {
        Self {
            source,
            assets: Vec::new(),
            loaded: false,
            refreshing: false,
            generation: 0,
            refresh_error: None,
            delete_error: None,
            events,
        }
    }

    pub fn source(&self) -> AssetSource {
        self.source
    }

    /// Start a refresh; any earlier outstanding refresh becomes stale
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        self.refreshing = true;
        RefreshTicket {
            generation: self.generation,
        }
    }

    /// Apply the listing for `ticket`
    ///
    /// Success replaces the whole list. Entries that normalize to the same id
    /// collapse to the first occurrence. Failure keeps the previous list and
    /// sets the refresh error flag.
    pub fn apply_listing(
        &mut self,
        ticket: RefreshTicket,
        listing: ClientResult<Vec<AudioAsset>>,
    ) -> ClientResult<RefreshOutcome> {
        if ticket.generation != self.generation {
            debug!(source = %self.source, "Discarding superseded listing");
            return Ok(RefreshOutcome::Superseded);
        }
        self.refreshing = false;

        let listing = match listing {
            Ok(listing) => listing,
            Err(e) => {
                warn!(source = %self.source, error = %e, "Asset refresh failed");
                self.refresh_error = Some(e.to_string());
                self.events.emit_lossy(ClientEvent::AssetsRefreshFailed {
                    source: self.source,
                    message: e.to_string(),
                    timestamp: now(),
                });
                return Err(e);
            }
        };

        let received = listing.len();
        let mut seen = HashSet::with_capacity(received);
        let assets: Vec<AudioAsset> = listing
            .into_iter()
            .filter(|asset| seen.insert(asset.id.clone()))
            .collect();
        if assets.len() < received {
            debug!(
                source = %self.source,
                duplicates = received - assets.len(),
                "Collapsed duplicate asset ids"
            );
        }

        let count = assets.len();
        self.assets = assets;
        self.loaded = true;
        self.refresh_error = None;
        info!(source = %self.source, count, "Asset list refreshed");
        self.events.emit_lossy(ClientEvent::AssetsRefreshed {
            source: self.source,
            count,
            timestamp: now(),
        });

        Ok(RefreshOutcome::Replaced(count))
    }

    /// Check a delete may be sent for `id`
    ///
    /// Only generated assets are deletable, and only ones still listed.
    pub fn ensure_deletable(&self, id: &AssetId) -> ClientResult<()> {
        if self.source != AssetSource::Generated {
            return Err(ClientError::Validation(format!(
                "{} assets cannot be deleted",
                self.source
            )));
        }
        if !self.contains(id) {
            return Err(ClientError::NotFoundAfterDelete(id.clone()));
        }
        Ok(())
    }

    /// Remove an asset after the server confirmed the delete
    pub fn remove(&mut self, id: &AssetId) -> Option<AudioAsset> {
        let index = self.assets.iter().position(|a| &a.id == id)?;
        self.delete_error = None;
        Some(self.assets.remove(index))
    }

    /// Record a failed delete; the list is left unchanged
    pub fn fail_delete(&mut self, id: &AssetId, error: &ClientError) {
        warn!(asset_id = %id, error = %error, "Delete failed");
        self.delete_error = Some(error.to_string());
        self.events.emit_lossy(ClientEvent::AssetDeleteFailed {
            asset_id: id.clone(),
            message: error.to_string(),
            timestamp: now(),
        });
    }

    pub fn get(&self, id: &AssetId) -> Option<&AudioAsset> {
        self.assets.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.get(id).is_some()
    }

    /// Display name for `id`, if listed
    pub fn filename_of(&self, id: &AssetId) -> Option<&str> {
        self.get(id).map(|a| a.filename.as_str())
    }

    /// Current listing in server order
    pub fn assets(&self) -> &[AudioAsset] {
        &self.assets
    }

    /// Owned copy of the listing
    pub fn snapshot(&self) -> Vec<AudioAsset> {
        self.assets.clone()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// True once a listing has been applied
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    pub fn refresh_error(&self) -> Option<&str> {
        self.refresh_error.as_deref()
    }

    pub fn delete_error(&self) -> Option<&str> {
        self.delete_error.as_deref()
    }
}
