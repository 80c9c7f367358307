//! Playback-related event payload types

use serde::{Deserialize, Serialize};

/// Playback controller state
///
/// `Paused` and `Playing` are the two `Ready` sub-states: a payload is bound
/// to the media element in both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No track selected
    Idle,
    /// Binary payload fetch outstanding
    Loading,
    /// Ready, not playing
    Paused,
    /// Ready, playing
    Playing,
    /// Last load failed; selection cleared so the user may retry
    Error,
}

impl PlaybackState {
    /// True in either `Ready` sub-state
    pub fn is_ready(&self) -> bool {
        matches!(self, PlaybackState::Paused | PlaybackState::Playing)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}
