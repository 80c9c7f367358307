//! Analysis pipeline orchestrator
//!
//! # Stage Progression
//! ENSURE-USER → UPLOAD → PROCESS → CLASSIFY → COMPLETE
//!
//! Each stage is gated on its predecessor's recorded success and handled by a
//! dedicated `phase_*` module. A stage:
//!
//! 1. checks its precondition and that nothing else is in flight (locked)
//! 2. awaits the remote call (unlocked)
//! 3. applies the response if the run was not reset meanwhile (locked)
//!
//! A failure halts the run as `Failed` with the step recorded; results of
//! earlier stages stay visible. There is no automatic retry: the caller
//! re-invokes the failed stage once its precondition holds again.

mod phase_classify;
mod phase_process;
mod phase_upload;

use crate::error::{ClientError, ClientResult};
use crate::models::{AnalysisRun, SelectedFile, StageFailure, UserProfile};
use crate::object_url::{ObjectUrl, ObjectUrlRegistry};
use crate::services::AudioService;
use std::sync::Arc;
use tarang_common::events::{AnalysisStage, ClientEvent, EventBus, PipelineStep};
use tarang_common::time::{now, FreshnessClock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of a stage whose response may arrive after a reset
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// Response applied to the current run
    Done(T),
    /// Run was reset while the call was outstanding; response dropped
    Superseded,
}

impl<T> StageOutcome<T> {
    pub fn is_superseded(&self) -> bool {
        matches!(self, StageOutcome::Superseded)
    }

    pub fn done(self) -> Option<T> {
        match self {
            StageOutcome::Done(value) => Some(value),
            StageOutcome::Superseded => None,
        }
    }
}

/// Mutable pipeline state, only touched while locked
struct PipelineState {
    run: AnalysisRun,
    /// One-shot: set after the first successful ensure-user
    user_ensured: bool,
    selected: Option<SelectedFile>,
    preview: Option<ObjectUrl>,
    preview_urls: ObjectUrlRegistry,
    in_flight: Option<PipelineStep>,
    /// Bumped on reset and file selection; responses for older runs are dropped
    generation: u64,
}

/// Claim on a running stage
struct StageGuard {
    step: PipelineStep,
    generation: u64,
}

/// Sequences upload and analysis of one selected file at a time
pub struct AnalysisPipeline {
    service: Arc<dyn AudioService>,
    profile: UserProfile,
    clock: FreshnessClock,
    events: EventBus,
    state: Mutex<PipelineState>,
}

impl AnalysisPipeline {
    pub fn new(service: Arc<dyn AudioService>, profile: UserProfile, events: EventBus) -> Self {
        Self {
            service,
            profile,
            clock: FreshnessClock::new(),
            events,
            state: Mutex::new(PipelineState {
                run: AnalysisRun::new(None),
                user_ensured: false,
                selected: None,
                preview: None,
                preview_urls: ObjectUrlRegistry::new(),
                in_flight: None,
                generation: 0,
            }),
        }
    }

    /// Check-then-create the user profile, at most once per session
    ///
    /// Skips the create call when the check reports the user exists. A failed
    /// attempt leaves the one-shot flag unset so it can be retried.
    pub async fn ensure_user(&self) -> ClientResult<()> {
        let user_id = self.user_id()?.to_string();

        let guard = {
            let mut state = self.state.lock().await;
            if state.user_ensured {
                return Ok(());
            }
            Self::claim(&mut state, PipelineStep::EnsureUser)?
        };

        debug!(user = %user_id, "Ensuring user profile exists");
        let result = match self.service.check_user(&user_id).await {
            Ok(true) => Ok(false),
            Ok(false) => self.service.create_user(&self.profile).await.map(|_| true),
            Err(e) => Err(e),
        };

        let mut state = self.state.lock().await;
        let current = state.generation == guard.generation;
        if current {
            state.in_flight = None;
        }
        match result {
            Ok(created) => {
                state.user_ensured = true;
                info!(user = %user_id, created, "User profile ready");
                Ok(())
            }
            Err(e) => {
                if current {
                    self.fail(&mut state, guard.step, &e);
                }
                Err(e)
            }
        }
    }

    /// Pick the file for the next run
    ///
    /// Validated before anything else; replaces the current run and releases
    /// the previous preview.
    pub async fn select_file(&self, file: SelectedFile) -> ClientResult<()> {
        file.validate()?;

        let mut state = self.state.lock().await;
        if let Some(step) = state.in_flight {
            return Err(ClientError::Validation(format!(
                "Cannot change file while {} is running",
                step
            )));
        }

        Self::release_preview(&mut state);
        state.generation += 1;
        state.run = AnalysisRun::new(Some(file.name.clone()));
        info!(file = %file.name, bytes = file.bytes.len(), "File selected");
        state.selected = Some(file);
        Ok(())
    }

    /// Local object URL for playing the selected file before upload
    pub async fn preview(&self) -> ClientResult<ObjectUrl> {
        let mut state = self.state.lock().await;
        if let Some(url) = &state.preview {
            return Ok(url.clone());
        }
        let bytes = state
            .selected
            .as_ref()
            .map(|f| f.bytes.clone())
            .ok_or_else(|| ClientError::Validation("No file selected".to_string()))?;
        let url = state.preview_urls.acquire(bytes);
        state.preview = Some(url.clone());
        Ok(url)
    }

    /// Discard the current run ("cancel upload")
    ///
    /// Responses still outstanding for the discarded run are dropped when they
    /// arrive. The ensure-user flag is kept.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        Self::release_preview(&mut state);
        state.selected = None;
        state.in_flight = None;
        state.generation += 1;

        let old_stage = state.run.stage;
        let old_run = state.run.run_id;
        state.run = AnalysisRun::new(None);
        if old_stage != AnalysisStage::NotStarted {
            self.events.emit_lossy(ClientEvent::AnalysisStageChanged {
                run_id: old_run,
                old_stage,
                new_stage: AnalysisStage::NotStarted,
                timestamp: now(),
            });
        }
        debug!(interrupted = old_stage.is_active(), "Analysis run reset");
    }

    /// Select `file` and run every stage in order, halting at the first failure
    pub async fn run_all(&self, file: SelectedFile) -> ClientResult<AnalysisRun> {
        self.select_file(file).await?;
        self.ensure_user().await?;

        if self.upload().await?.is_superseded()
            || self.process().await?.is_superseded()
            || self.classify().await?.is_superseded()
        {
            debug!("Run superseded before completion");
        }

        Ok(self.run().await)
    }

    /// Snapshot of the current run
    pub async fn run(&self) -> AnalysisRun {
        self.state.lock().await.run.clone()
    }

    pub async fn stage(&self) -> AnalysisStage {
        self.state.lock().await.run.stage
    }

    /// Step currently awaiting the network, if any
    pub async fn in_flight(&self) -> Option<PipelineStep> {
        self.state.lock().await.in_flight
    }

    pub async fn user_ensured(&self) -> bool {
        self.state.lock().await.user_ensured
    }

    pub async fn can_upload(&self) -> bool {
        let state = self.state.lock().await;
        state.in_flight.is_none() && state.selected.is_some()
    }

    /// The "analyze" action is enabled
    pub async fn can_process(&self) -> bool {
        let state = self.state.lock().await;
        state.in_flight.is_none() && state.run.upload_succeeded
    }

    pub async fn can_classify(&self) -> bool {
        let state = self.state.lock().await;
        state.in_flight.is_none() && state.run.process_succeeded
    }

    /// Live preview URLs (0 or 1)
    pub async fn live_preview_count(&self) -> usize {
        self.state.lock().await.preview_urls.live_count()
    }

    /// Final release of the preview URL
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.preview = None;
        state.preview_urls.release_all();
    }

    fn user_id(&self) -> ClientResult<&str> {
        if self.profile.has_id() {
            Ok(&self.profile.id)
        } else {
            Err(ClientError::Validation("No user signed in".to_string()))
        }
    }

    fn claim(state: &mut PipelineState, step: PipelineStep) -> ClientResult<StageGuard> {
        if let Some(running) = state.in_flight {
            return Err(ClientError::Validation(format!(
                "Stage already running: {}",
                running
            )));
        }
        state.in_flight = Some(step);
        Ok(StageGuard {
            step,
            generation: state.generation,
        })
    }

    /// Re-lock check after a remote call; clears the in-flight marker if the
    /// run is still current
    fn settle(state: &mut PipelineState, guard: &StageGuard) -> bool {
        if state.generation != guard.generation {
            debug!(step = %guard.step, "Dropping response for a discarded run");
            return false;
        }
        state.in_flight = None;
        true
    }

    fn enter_stage(&self, state: &mut PipelineState, new_stage: AnalysisStage) {
        let old_stage = state.run.stage;
        state.run.stage = new_stage;
        if old_stage != new_stage {
            debug!(old = ?old_stage, new = ?new_stage, "Analysis stage changed");
            self.events.emit_lossy(ClientEvent::AnalysisStageChanged {
                run_id: state.run.run_id,
                old_stage,
                new_stage,
                timestamp: now(),
            });
        }
    }

    fn fail(&self, state: &mut PipelineState, step: PipelineStep, error: &ClientError) {
        warn!(step = %step, error = %error, "Analysis step failed");
        state.run.failure = Some(StageFailure {
            step,
            message: error.to_string(),
        });
        self.enter_stage(state, AnalysisStage::Failed);
        self.events.emit_lossy(ClientEvent::AnalysisFailed {
            run_id: state.run.run_id,
            step,
            message: error.to_string(),
            timestamp: now(),
        });
    }

    fn release_preview(state: &mut PipelineState) {
        let preview = state.preview.take();
        state.preview_urls.release(preview.as_ref());
    }
}
