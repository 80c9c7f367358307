//! In-memory AudioService

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tarang_client::models::{
    AudioAsset, ClassifyResponse, ProcessResponse, SelectedFile, UploadResponse, UserProfile,
};
use tarang_client::services::AudioService;
use tarang_client::{ClientError, ClientResult};
use tarang_common::events::AssetSource;
use tarang_common::AssetId;
use tokio::sync::Notify;

pub const BASE_URL: &str = "http://fake.test";

#[derive(Default)]
struct Inner {
    calls: Vec<String>,
    user_exists: bool,
    assets: HashMap<AssetSource, Vec<AudioAsset>>,
    failing: HashSet<String>,
    gates: HashMap<String, Arc<Notify>>,
    process_response: Option<Value>,
    classify_response: Option<Value>,
}

/// Scriptable fake of the remote audio service
///
/// Call keys: `check_user`, `create_user`, `upload`, `process`, `classify`,
/// `list:<source>`, `fetch:<id>`, `delete:<id>`.
#[derive(Default)]
pub struct FakeService {
    inner: Mutex<Inner>,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        {
            let mut inner = fake.inner.lock().unwrap();
            inner.process_response = Some(json!({
                "status": "success",
                "genre": "Classical",
                "plot_urls": { "waveform": "/img/a.png", "harmonic": "/img/b.png" }
            }));
            inner.classify_response = Some(json!({
                "status": "success",
                "analyses": {
                    "genre": "Hindustani",
                    "instrument": {
                        "predicted_instrument": "Sitar",
                        "probabilities": {
                            "Sitar": 0.62, "Tabla": 0.20, "Flute": 0.10,
                            "Veena": 0.05, "Dhol": 0.03
                        },
                        "features": { "spectral_centroid": 2140.5 }
                    },
                    "key_tempo": { "key": "C# minor", "tempo": 92.3 }
                }
            }));
        }
        Arc::new(fake)
    }

    pub fn set_user_exists(&self, exists: bool) {
        self.inner.lock().unwrap().user_exists = exists;
    }

    pub fn set_assets(&self, source: AssetSource, assets: Vec<AudioAsset>) {
        self.inner.lock().unwrap().assets.insert(source, assets);
    }

    pub fn set_process_response(&self, value: Value) {
        self.inner.lock().unwrap().process_response = Some(value);
    }

    pub fn set_classify_response(&self, value: Value) {
        self.inner.lock().unwrap().classify_response = Some(value);
    }

    /// Make every call with this key fail with HTTP 500
    pub fn fail(&self, key: &str) {
        self.inner.lock().unwrap().failing.insert(key.to_string());
    }

    pub fn heal(&self, key: &str) {
        self.inner.lock().unwrap().failing.remove(key);
    }

    /// Hold calls with this key until [`FakeService::release`]
    pub fn hold(&self, key: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner
            .lock()
            .unwrap()
            .gates
            .insert(key.to_string(), gate.clone());
        gate
    }

    /// Let one held call with this key proceed
    pub fn release(&self, key: &str) {
        let gate = self.inner.lock().unwrap().gates.remove(key);
        if let Some(gate) = gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == key)
            .count()
    }

    async fn enter(&self, key: String) -> ClientResult<()> {
        let (gate, failing) = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(key.clone());
            (inner.gates.get(&key).cloned(), inner.failing.contains(&key))
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if failing {
            return Err(ClientError::Http {
                status: 500,
                message: format!("{} failed", key),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AudioService for FakeService {
    async fn check_user(&self, _user_id: &str) -> ClientResult<bool> {
        self.enter("check_user".into()).await?;
        Ok(self.inner.lock().unwrap().user_exists)
    }

    async fn create_user(&self, _profile: &UserProfile) -> ClientResult<String> {
        self.enter("create_user".into()).await?;
        self.inner.lock().unwrap().user_exists = true;
        Ok("User created".to_string())
    }

    async fn upload(&self, _user_id: &str, file: &SelectedFile) -> ClientResult<UploadResponse> {
        self.enter("upload".into()).await?;
        serde_json::from_value(json!({
            "success": true,
            "file_id": { "$oid": "65f1a2b3c4d5e6f708192a3b" },
            "filename": file.name
        }))
        .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn process_audio(&self, _user_id: &str) -> ClientResult<ProcessResponse> {
        self.enter("process".into()).await?;
        let value = self.inner.lock().unwrap().process_response.clone();
        serde_json::from_value(value.unwrap_or(Value::Null))
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn analyze_instruments(&self, _user_id: &str) -> ClientResult<ClassifyResponse> {
        self.enter("classify".into()).await?;
        let value = self.inner.lock().unwrap().classify_response.clone();
        serde_json::from_value(value.unwrap_or(Value::Null))
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn list_assets(
        &self,
        source: AssetSource,
        _user_id: &str,
    ) -> ClientResult<Vec<AudioAsset>> {
        self.enter(format!("list:{}", source)).await?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .assets
            .get(&source)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_asset(&self, source: AssetSource, id: &AssetId) -> ClientResult<Bytes> {
        self.enter(format!("fetch:{}", id)).await?;
        let known = self
            .inner
            .lock()
            .unwrap()
            .assets
            .get(&source)
            .map(|list| list.iter().any(|a| &a.id == id))
            .unwrap_or(false);
        if !known {
            return Err(ClientError::NotFoundAfterDelete(id.clone()));
        }
        Ok(Bytes::from(format!("ID3 payload of {}", id)))
    }

    async fn delete_asset(&self, id: &AssetId, _user_id: &str) -> ClientResult<()> {
        self.enter(format!("delete:{}", id)).await?;
        let mut inner = self.inner.lock().unwrap();
        let list = inner.assets.entry(AssetSource::Generated).or_default();
        let before = list.len();
        list.retain(|a| &a.id != id);
        if list.len() == before {
            return Err(ClientError::NotFoundAfterDelete(id.clone()));
        }
        Ok(())
    }

    fn resolve_url(&self, path: &str) -> String {
        format!("{}/{}", BASE_URL, path.trim_start_matches('/'))
    }
}
