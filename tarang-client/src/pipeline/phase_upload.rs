//! UPLOAD stage

use super::{AnalysisPipeline, StageOutcome};
use crate::error::{ClientError, ClientResult};
use tarang_common::events::{AnalysisStage, PipelineStep};
use tarang_common::AssetId;
use tracing::info;

impl AnalysisPipeline {
    /// Upload the selected file
    ///
    /// Requires a selected file and runs ensure-user first if it has not
    /// succeeded yet. A new upload invalidates results of earlier processing.
    pub async fn upload(&self) -> ClientResult<StageOutcome<Option<AssetId>>> {
        let user_id = self.user_id()?.to_string();
        if self.state.lock().await.selected.is_none() {
            return Err(ClientError::Validation("No file selected".to_string()));
        }
        if !self.user_ensured().await {
            self.ensure_user().await?;
        }

        let (guard, file) = {
            let mut state = self.state.lock().await;
            let file = state
                .selected
                .clone()
                .ok_or_else(|| ClientError::Validation("No file selected".to_string()))?;
            let guard = Self::claim(&mut state, PipelineStep::Upload)?;

            let run = &mut state.run;
            run.failure = None;
            run.upload_succeeded = false;
            run.uploaded_file_id = None;
            run.process_succeeded = false;
            run.classify_succeeded = false;
            run.genre = None;
            run.key = None;
            run.tempo = None;
            run.instrument = None;
            run.visualization = None;
            self.enter_stage(&mut state, AnalysisStage::Uploading);
            (guard, file)
        };

        let result = self.service.upload(&user_id, &file).await;

        let mut state = self.state.lock().await;
        if !Self::settle(&mut state, &guard) {
            return Ok(StageOutcome::Superseded);
        }

        let response = match result {
            Ok(response) if response.acknowledged() => response,
            Ok(response) => {
                let message = response
                    .error
                    .or(response.message)
                    .unwrap_or_else(|| "Upload was not acknowledged".to_string());
                let e = ClientError::Rejected(message);
                self.fail(&mut state, guard.step, &e);
                return Err(e);
            }
            Err(e) => {
                self.fail(&mut state, guard.step, &e);
                return Err(e);
            }
        };

        info!(
            file = %file.name,
            file_id = ?response.file_id,
            "Upload acknowledged"
        );
        state.run.upload_succeeded = true;
        state.run.uploaded_file_id = response.file_id.clone();
        self.enter_stage(&mut state, AnalysisStage::Uploaded);
        Ok(StageOutcome::Done(response.file_id))
    }
}
