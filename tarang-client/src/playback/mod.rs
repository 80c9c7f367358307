//! Playback
//!
//! One media element per session, owned by [`PlaybackController`].

mod controller;
mod media;

pub use controller::{LoadOutcome, LoadTicket, PlaybackController, PlaybackSnapshot, SelectOutcome};
pub use media::{HeadlessElement, MediaElement};
