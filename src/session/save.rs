// Post-session save/discard workflow

use std::sync::Arc;

use crate::error::WorkflowError;
use crate::relay::{DeviceRelay, SavedSession, SessionRecord};
use crate::session::SessionSummary;

/// Externally visible workflow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    Idle,
    AwaitingSave,
    Saving,
    Saved,
    Discarding,
    Discarded,
}

/// What the user filled into the save dialog.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub title: String,
    pub description: String,
    pub brocade_type: String,
    /// Whether to transfer the selected recording to permanent storage
    pub transfer_video: bool,
    pub selected_recording: Option<String>,
}

/// Result of a completed save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub record: SavedSession,
    pub video_transferred: bool,
    /// Non-fatal problems surfaced to the user (e.g. transfer failure)
    pub warnings: Vec<String>,
}

enum WorkflowState {
    Idle,
    AwaitingSave(SessionSummary),
    Saving,
    Saved(SavedSession),
    Discarding,
    Discarded,
}

/// Save-or-discard decision for a finished session.
///
/// Holds the summary a session stop produced, together with the device
/// recordings listed at stop time, until the user commits one way or the
/// other. Metadata is worth more than video: a failed transfer degrades the
/// save to metadata-only instead of losing it.
pub struct SaveWorkflow {
    relay: Arc<dyn DeviceRelay>,
    state: WorkflowState,
}

impl SaveWorkflow {
    pub fn new(relay: Arc<dyn DeviceRelay>) -> Self {
        Self {
            relay,
            state: WorkflowState::Idle,
        }
    }

    /// Enter `AwaitingSave` with the summary of a just-stopped session.
    pub fn begin(relay: Arc<dyn DeviceRelay>, summary: SessionSummary) -> Self {
        Self {
            relay,
            state: WorkflowState::AwaitingSave(summary),
        }
    }

    /// Hand a (new or re-offered) session summary to the workflow.
    pub fn accept(&mut self, summary: SessionSummary) {
        self.state = WorkflowState::AwaitingSave(summary);
    }

    pub fn phase(&self) -> SavePhase {
        match self.state {
            WorkflowState::Idle => SavePhase::Idle,
            WorkflowState::AwaitingSave(_) => SavePhase::AwaitingSave,
            WorkflowState::Saving => SavePhase::Saving,
            WorkflowState::Saved(_) => SavePhase::Saved,
            WorkflowState::Discarding => SavePhase::Discarding,
            WorkflowState::Discarded => SavePhase::Discarded,
        }
    }

    /// The session currently awaiting a decision, if any.
    pub fn pending(&self) -> Option<&SessionSummary> {
        match &self.state {
            WorkflowState::AwaitingSave(summary) => Some(summary),
            _ => None,
        }
    }

    /// The persisted record, once saved.
    pub fn saved(&self) -> Option<&SavedSession> {
        match &self.state {
            WorkflowState::Saved(record) => Some(record),
            _ => None,
        }
    }

    /// Persist the pending session.
    ///
    /// An empty title is a validation error and does not transition. A
    /// failed video transfer degrades to a metadata-only save with a
    /// warning. A failed metadata save returns to `AwaitingSave` so the
    /// dialog can offer retry. After a successful save with a transferred
    /// video, the now-redundant device-side copy is deleted best-effort.
    pub async fn save(&mut self, request: SaveRequest) -> Result<SaveOutcome, WorkflowError> {
        let summary = match &self.state {
            WorkflowState::AwaitingSave(summary) => summary.clone(),
            _ => return Err(WorkflowError::NothingPending),
        };
        if request.title.trim().is_empty() {
            return Err(WorkflowError::EmptyTitle);
        }
        self.state = WorkflowState::Saving;

        let mut warnings = Vec::new();
        let mut video_filename = None;
        if request.transfer_video {
            match request.selected_recording.as_deref() {
                Some(filename) => match self.relay.transfer_video(filename).await {
                    Ok(stored) => video_filename = Some(stored),
                    Err(e) => {
                        log::warn!("Video transfer failed, saving metadata without video: {}", e);
                        warnings.push(format!("video transfer failed: {}", e));
                    }
                },
                None => warnings.push("no recording selected for transfer".to_string()),
            }
        }

        let record = SessionRecord {
            title: request.title.trim().to_string(),
            description: request.description,
            brocade_type: request.brocade_type,
            session_id: summary.session_id.clone(),
            video_filename: video_filename.clone(),
            has_video_file: video_filename.is_some(),
            duration_seconds: summary.duration.as_secs(),
        };

        let saved = match self.relay.save_session(&record).await {
            Ok(saved) => saved,
            Err(e) => {
                self.state = WorkflowState::AwaitingSave(summary);
                return Err(e.into());
            }
        };

        // The transferred copy now lives in permanent storage; losing the
        // device-side delete must not roll back the save
        if let Some(filename) = &video_filename {
            if let Err(e) = self.relay.delete_recording(filename).await {
                log::warn!("Failed to delete device-side recording {}: {}", filename, e);
            }
        }

        log::info!("Session '{}' saved", record.title);
        self.state = WorkflowState::Saved(saved.clone());
        Ok(SaveOutcome {
            record: saved,
            video_transferred: video_filename.is_some(),
            warnings,
        })
    }

    /// Discard the pending session, deleting its device-side recordings.
    ///
    /// `confirm` is the irreversible-action guard; when it returns false,
    /// nothing is deleted and no transition happens. Returns `Ok(true)`
    /// once discarded. Deletion is the whole point of a discard, so a
    /// failed delete surfaces as an error and the workflow stays in
    /// `AwaitingSave` for retry.
    pub async fn discard(
        &mut self,
        confirm: impl FnOnce() -> bool,
    ) -> Result<bool, WorkflowError> {
        let summary = match &self.state {
            WorkflowState::AwaitingSave(summary) => summary.clone(),
            _ => return Err(WorkflowError::NothingPending),
        };
        if !confirm() {
            return Ok(false);
        }
        self.state = WorkflowState::Discarding;

        for recording in &summary.recordings {
            if let Err(e) = self.relay.delete_recording(&recording.filename).await {
                self.state = WorkflowState::AwaitingSave(summary);
                return Err(e.into());
            }
        }

        log::info!("Session '{}' discarded", summary.session_name);
        self.state = WorkflowState::Discarded;
        Ok(true)
    }

    /// Drop the pending summary without persisting or deleting anything.
    ///
    /// The summary is handed back so a caller can re-offer the decision
    /// later via [`SaveWorkflow::accept`]; server-side artifacts are left
    /// untouched.
    pub fn cancel(&mut self) -> Result<SessionSummary, WorkflowError> {
        match std::mem::replace(&mut self.state, WorkflowState::Idle) {
            WorkflowState::AwaitingSave(summary) => Ok(summary),
            other => {
                self.state = other;
                Err(WorkflowError::NothingPending)
            }
        }
    }
}
