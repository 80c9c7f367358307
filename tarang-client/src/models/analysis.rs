//! Analysis pipeline wire responses and run state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tarang_common::events::{AnalysisStage, PipelineStep};
use tarang_common::AssetId;
use uuid::Uuid;

const STATUS_SUCCESS: &str = "success";

/// `POST /upload/{userId}` response
///
/// Older servers answer `{message, filename, gridfs_id}`, newer ones
/// `{success, file_id}`; both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, alias = "gridfs_id")]
    pub file_id: Option<AssetId>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadResponse {
    /// Server acknowledged the upload
    pub fn acknowledged(&self) -> bool {
        self.success != Some(false) && self.error.is_none()
    }
}

/// Visualization artifact paths as returned by the server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlotUrls {
    pub waveform: String,
    pub harmonic: String,
}

/// `POST /process-audio/{userId}` response
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResponse {
    pub status: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub plot_urls: Option<PlotUrls>,
    #[serde(default)]
    pub waveform_url: Option<String>,
    #[serde(default)]
    pub harmonic_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ProcessResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Artifact paths from `plot_urls`, falling back to the flat fields
    pub fn plot_paths(&self) -> Option<PlotUrls> {
        if let Some(urls) = &self.plot_urls {
            return Some(urls.clone());
        }
        match (&self.waveform_url, &self.harmonic_url) {
            (Some(waveform), Some(harmonic)) => Some(PlotUrls {
                waveform: waveform.clone(),
                harmonic: harmonic.clone(),
            }),
            _ => None,
        }
    }

    /// Best failure description the server gave
    pub fn failure_message(&self) -> String {
        failure_text(&self.status, self.error.as_deref(), self.details.as_deref())
    }
}

/// Instrument classifier output
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstrumentAnalysis {
    pub predicted_instrument: String,
    /// Independent per-label probabilities; not guaranteed to sum to 1
    pub probabilities: BTreeMap<String, f64>,
    #[serde(default)]
    pub features: Value,
}

/// Key / tempo estimate
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeyTempo {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub tempo: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Analyses {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub instrument: Option<InstrumentAnalysis>,
    #[serde(default)]
    pub key_tempo: Option<KeyTempo>,
}

/// `POST /analyze-instruments/{userId}` response
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyResponse {
    pub status: String,
    #[serde(default)]
    pub analyses: Option<Analyses>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

impl ClassifyResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    pub fn failure_message(&self) -> String {
        failure_text(&self.status, self.error.as_deref(), self.details.as_deref())
    }
}

fn failure_text(status: &str, error: Option<&str>, details: Option<&str>) -> String {
    match (error, details) {
        (Some(e), Some(d)) => format!("{}: {}", e, d),
        (Some(e), None) => e.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) => format!("Unexpected status '{}'", status),
    }
}

/// Cache-busted visualization URLs for one processing result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationRefs {
    pub waveform: String,
    pub harmonic: String,
    /// Freshness token appended to both URLs
    pub token: i64,
}

/// Instrument prediction as displayed
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentPrediction {
    pub predicted: String,
    pub probabilities: BTreeMap<String, f64>,
    pub features: Value,
}

/// One bar of the probability chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentBar {
    pub label: String,
    /// Raw probability exactly as the classifier reported it
    pub probability: f64,
    /// Bar width: probability × 100, clamped to [0, 100]
    pub width_percent: f64,
}

impl InstrumentPrediction {
    /// Bars proportional to each raw probability, highest first
    ///
    /// Probabilities are never renormalized.
    pub fn bars(&self) -> Vec<InstrumentBar> {
        let mut bars: Vec<InstrumentBar> = self
            .probabilities
            .iter()
            .map(|(label, &probability)| InstrumentBar {
                label: label.clone(),
                probability,
                width_percent: if probability.is_finite() {
                    (probability * 100.0).clamp(0.0, 100.0)
                } else {
                    0.0
                },
            })
            .collect();
        bars.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then_with(|| a.label.cmp(&b.label))
        });
        bars
    }
}

impl From<InstrumentAnalysis> for InstrumentPrediction {
    fn from(analysis: InstrumentAnalysis) -> Self {
        Self {
            predicted: analysis.predicted_instrument,
            probabilities: analysis.probabilities,
            features: analysis.features,
        }
    }
}

/// Step that halted a run, with the error shown to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub step: PipelineStep,
    pub message: String,
}

/// One upload-and-analyze interaction
///
/// Results fill in as steps complete and survive a later failure. `stage` is
/// the most recent stage entered; the `*_succeeded` flags gate each successor.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRun {
    pub run_id: Uuid,
    pub stage: AnalysisStage,
    pub file_name: Option<String>,
    pub uploaded_file_id: Option<AssetId>,
    pub upload_succeeded: bool,
    pub process_succeeded: bool,
    pub classify_succeeded: bool,
    pub genre: Option<String>,
    pub key: Option<String>,
    pub tempo: Option<f64>,
    pub instrument: Option<InstrumentPrediction>,
    pub visualization: Option<VisualizationRefs>,
    pub failure: Option<StageFailure>,
    pub started_at: DateTime<Utc>,
}

impl AnalysisRun {
    pub fn new(file_name: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: AnalysisStage::NotStarted,
            file_name,
            uploaded_file_id: None,
            upload_succeeded: false,
            process_succeeded: false,
            classify_succeeded: false,
            genre: None,
            key: None,
            tempo: None,
            instrument: None,
            visualization: None,
            failure: None,
            started_at: Utc::now(),
        }
    }

    /// Probability chart for the predicted instrument, if classified
    pub fn instrument_bars(&self) -> Vec<InstrumentBar> {
        self.instrument
            .as_ref()
            .map(InstrumentPrediction::bars)
            .unwrap_or_default()
    }

    pub fn failed_step(&self) -> Option<PipelineStep> {
        self.failure.as_ref().map(|f| f.step)
    }
}
