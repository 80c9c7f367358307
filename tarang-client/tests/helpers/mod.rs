//! Test helpers for tarang-client integration tests
//!
//! - FakeService: in-memory AudioService with call log, failure injection and
//!   gates for holding a call open while another action interleaves

#![allow(dead_code)]

pub mod fake_service;

pub use fake_service::FakeService;

use serde_json::json;
use tarang_client::models::AudioAsset;

/// Listing entry as the server would send it
pub fn asset(id: &str, filename: &str) -> AudioAsset {
    serde_json::from_value(json!({
        "gridfs_id": id,
        "filename": filename,
        "uploaded_at": "Tue, 12 Mar 2024 10:00:00 GMT",
        "content_type": "audio/mpeg"
    }))
    .expect("valid asset json")
}

/// Yield until `condition` holds (bounded)
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
