//! Media element abstraction
//!
//! The single audio element is driven exclusively by the playback controller;
//! view code never touches it. Hosts plug in their real output, tests and the
//! CLI use [`HeadlessElement`].

use crate::error::{ClientError, ClientResult};
use crate::object_url::ObjectUrl;

/// The one audio output a playback session binds payloads to
pub trait MediaElement: Send {
    /// Point the element at a payload
    fn set_source(&mut self, url: &ObjectUrl);

    /// Detach the current payload
    fn clear_source(&mut self);

    /// Start or resume output; may be refused by the host
    fn play(&mut self) -> ClientResult<()>;

    fn pause(&mut self);

    /// Single synchronous position assignment, seconds
    fn set_current_time(&mut self, seconds: f64);

    /// Output gain, 0.0 - 1.0
    fn set_volume(&mut self, volume: f64);
}

/// Element with no audio output that records every assignment
#[derive(Debug, Default, Clone)]
pub struct HeadlessElement {
    pub source: Option<ObjectUrl>,
    pub playing: bool,
    pub current_time: f64,
    pub volume: f64,
    pub play_calls: usize,
    /// Refuse the next `play()` call (host autoplay policy, decode error)
    pub refuse_next_play: bool,
}

impl HeadlessElement {
    pub fn new() -> Self {
        Self {
            volume: 1.0,
            ..Default::default()
        }
    }
}

impl MediaElement for HeadlessElement {
    fn set_source(&mut self, url: &ObjectUrl) {
        self.source = Some(url.clone());
        self.current_time = 0.0;
        self.playing = false;
    }

    fn clear_source(&mut self) {
        self.source = None;
        self.playing = false;
        self.current_time = 0.0;
    }

    fn play(&mut self) -> ClientResult<()> {
        self.play_calls += 1;
        if self.refuse_next_play {
            self.refuse_next_play = false;
            return Err(ClientError::Media("play() refused".to_string()));
        }
        if self.source.is_none() {
            return Err(ClientError::Media("no source bound".to_string()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.current_time = seconds;
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }
}
