//! CLASSIFY stage
//!
//! Instrument, key and tempo. Probabilities are stored exactly as returned.

use super::{AnalysisPipeline, StageOutcome};
use crate::error::{ClientError, ClientResult};
use crate::models::InstrumentPrediction;
use tarang_common::events::{AnalysisStage, PipelineStep};
use tracing::info;

impl AnalysisPipeline {
    /// Classify the processed file; rejected until processing has succeeded
    pub async fn classify(&self) -> ClientResult<StageOutcome<Option<InstrumentPrediction>>> {
        let user_id = self.user_id()?.to_string();

        let guard = {
            let mut state = self.state.lock().await;
            if !state.run.process_succeeded {
                return Err(ClientError::Validation(
                    "Processing must succeed before classification".to_string(),
                ));
            }
            let guard = Self::claim(&mut state, PipelineStep::Classify)?;
            state.run.failure = None;
            state.run.classify_succeeded = false;
            self.enter_stage(&mut state, AnalysisStage::ClassifyingInstruments);
            guard
        };

        let result = self.service.analyze_instruments(&user_id).await;

        let mut state = self.state.lock().await;
        if !Self::settle(&mut state, &guard) {
            return Ok(StageOutcome::Superseded);
        }

        let analyses = match result {
            Ok(response) if response.is_success() => response.analyses.unwrap_or_default(),
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

        let prediction = analyses.instrument.map(InstrumentPrediction::from);
        let key_tempo = analyses.key_tempo.unwrap_or_default();
        info!(
            instrument = ?prediction.as_ref().map(|p| p.predicted.as_str()),
            key = ?key_tempo.key,
            tempo = ?key_tempo.tempo,
            "Classification complete"
        );

        let run = &mut state.run;
        if run.genre.is_none() {
            run.genre = analyses.genre;
        }
        run.key = key_tempo.key;
        run.tempo = key_tempo.tempo;
        run.instrument = prediction.clone();
        run.classify_succeeded = true;
        self.enter_stage(&mut state, AnalysisStage::Complete);
        Ok(StageOutcome::Done(prediction))
    }
}
