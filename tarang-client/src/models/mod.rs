//! Data models: wire records and the client-side domain types built from them

pub mod analysis;
pub mod asset;
pub mod upload;
pub mod user;

pub use analysis::{
    AnalysisRun, ClassifyResponse, InstrumentBar, InstrumentPrediction, ProcessResponse,
    StageFailure, UploadResponse, VisualizationRefs,
};
pub use asset::{AudioAsset, UploadedAt};
pub use upload::SelectedFile;
pub use user::{CheckUserResponse, CreateUserResponse, UserProfile};
