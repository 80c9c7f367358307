//! Remote service access
//!
//! The analysis backend is an opaque collaborator: [`AudioService`] is the seam
//! every controller talks through, [`HttpAudioService`] the production
//! implementation.

mod audio_service;
mod http_client;

pub use audio_service::AudioService;
pub use http_client::HttpAudioService;
