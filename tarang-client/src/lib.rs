//! tarang-client library
//!
//! Client side of the tarang audio platform: the remote service client, the
//! single-element playback controller and its object URL lifecycle, per-source
//! asset registries and the upload-and-analyze pipeline, tied together by
//! [`session::StudioSession`].

pub mod error;
pub mod models;
pub mod object_url;
pub mod pipeline;
pub mod playback;
pub mod registry;
pub mod services;
pub mod session;

pub use crate::error::{ClientError, ClientResult};
pub use crate::session::StudioSession;
