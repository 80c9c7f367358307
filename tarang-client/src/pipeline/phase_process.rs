//! PROCESS stage
//!
//! Server-side feature extraction on the latest upload. Returns the genre and
//! two visualization artifacts whose filenames the server reuses across runs,
//! so both URLs get one fresh token per result.

use super::{AnalysisPipeline, StageOutcome};
use crate::error::{ClientError, ClientResult};
use crate::models::VisualizationRefs;
use tarang_common::events::{AnalysisStage, PipelineStep};
use tarang_common::time::stamp_url;
use tracing::info;

impl AnalysisPipeline {
    /// Process the uploaded file; rejected until the upload has succeeded
    pub async fn process(&self) -> ClientResult<StageOutcome<Option<VisualizationRefs>>> {
        let user_id = self.user_id()?.to_string();

        let guard = {
            let mut state = self.state.lock().await;
            if !state.run.upload_succeeded {
                return Err(ClientError::Validation(
                    "Upload must succeed before processing".to_string(),
                ));
            }
            let guard = Self::claim(&mut state, PipelineStep::Process)?;
            state.run.failure = None;
            state.run.process_succeeded = false;
            state.run.classify_succeeded = false;
            self.enter_stage(&mut state, AnalysisStage::Processing);
            guard
        };

        let result = self.service.process_audio(&user_id).await;

        let mut state = self.state.lock().await;
        if !Self::settle(&mut state, &guard) {
            return Ok(StageOutcome::Superseded);
        }

        let response = match result {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                let e = ClientError::Rejected(response.failure_message());
                self.fail(&mut state, guard.step, &e);
                return Err(e);
            }
            Err(e) => {
                self.fail(&mut state, guard.step, &e);
                return Err(e);
            }
        };

        let visualization = response.plot_paths().map(|paths| {
            let token = self.clock.next_token();
            VisualizationRefs {
                waveform: stamp_url(&self.service.resolve_url(&paths.waveform), token),
                harmonic: stamp_url(&self.service.resolve_url(&paths.harmonic), token),
                token,
            }
        });

        info!(
            genre = ?response.genre,
            token = ?visualization.as_ref().map(|v| v.token),
            "Processing complete"
        );
        let run = &mut state.run;
        run.genre = response.genre;
        run.visualization = visualization.clone();
        run.instrument = None;
        run.key = None;
        run.tempo = None;
        run.process_succeeded = true;
        self.enter_stage(&mut state, AnalysisStage::Processed);
        Ok(StageOutcome::Done(visualization))
    }
}
