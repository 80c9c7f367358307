//! Analysis-pipeline event payload types

use serde::{Deserialize, Serialize};

/// Analysis run stage
///
/// `Uploading`, `Processing` and `ClassifyingInstruments` are reported only
/// while that stage's request is outstanding. Once it settles the run moves to
/// the matching settled stage (`Uploaded`, `Processed`, `Complete`) or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    NotStarted,
    Uploading,
    Uploaded,
    Processing,
    Processed,
    ClassifyingInstruments,
    Complete,
    Failed,
}

impl AnalysisStage {
    /// A remote call for this stage is outstanding
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AnalysisStage::Uploading
                | AnalysisStage::Processing
                | AnalysisStage::ClassifyingInstruments
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStage::Complete | AnalysisStage::Failed)
    }
}

/// One dependent step of the analysis workflow
///
/// Recorded as the originating step when a run fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    EnsureUser,
    Upload,
    Process,
    Classify,
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStep::EnsureUser => write!(f, "ensure-user"),
            PipelineStep::Upload => write!(f, "upload"),
            PipelineStep::Process => write!(f, "process"),
            PipelineStep::Classify => write!(f, "classify"),
        }
    }
}
