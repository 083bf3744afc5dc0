// Scripted in-process stand-in for the device relay

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use baduanjin_live::analysis::AnalysisKind;
use baduanjin_live::error::RelayError;
use baduanjin_live::relay::{
    DeviceRelay, DeviceStatus, ExerciseFeedback, ExerciseInfo, FramePayload, FrameStats,
    RecordingEntry, RecordingInfo, SavedSession, SessionHandle, SessionRecord,
};

/// Programmable device behavior. Tests flip the failure switches and
/// counters mid-run; the mock reads them on every call.
pub struct MockState {
    /// Fail status/frame/feedback fetches (unreachable device)
    pub fail_polls: bool,
    pub fail_transfer: bool,
    pub fail_delete: bool,
    pub persons_detected: u32,
    pub current_fps: f64,
    /// What the device reports in `status.is_recording`
    pub device_recording: bool,
    /// Feedback the device would serve while tracking
    pub feedback: Option<ExerciseFeedback>,
    /// Files already finalized and listable
    pub recordings: Vec<RecordingEntry>,
    /// Files acknowledged as stopped but still being finalized; they become
    /// listable once their instant passes
    pub finalizing: Vec<(Instant, RecordingEntry)>,
    /// How long the device takes to finalize a stopped recording
    pub finalize_delay: Duration,
    /// One-shot lifecycle calls in order (polls are not logged)
    pub calls: Vec<String>,
    /// Number of status polls served (including failed ones)
    pub status_polls: u64,
    next_recording: u32,
    next_session: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            fail_polls: false,
            fail_transfer: false,
            fail_delete: false,
            persons_detected: 1,
            current_fps: 25.0,
            device_recording: false,
            feedback: None,
            recordings: Vec::new(),
            finalizing: Vec::new(),
            finalize_delay: Duration::from_secs(1),
            calls: Vec::new(),
            status_polls: 0,
            next_recording: 0,
            next_session: 0,
        }
    }
}

pub struct MockRelay {
    pub state: Arc<Mutex<MockState>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }
}

fn unreachable_err() -> RelayError {
    RelayError::Unreachable("connection timed out".to_string())
}

#[async_trait]
impl DeviceRelay for MockRelay {
    async fn status(&self) -> Result<DeviceStatus, RelayError> {
        let mut state = self.state.lock();
        state.status_polls += 1;
        if state.fail_polls {
            return Err(unreachable_err());
        }
        Ok(DeviceStatus {
            pi_connected: true,
            is_recording: state.device_recording,
            camera_available: true,
            yolo_available: true,
            is_running: true,
            persons_detected: state.persons_detected,
            current_fps: state.current_fps,
            ..Default::default()
        })
    }

    async fn current_frame(&self) -> Result<FramePayload, RelayError> {
        let state = self.state.lock();
        if state.fail_polls {
            return Err(unreachable_err());
        }
        Ok(FramePayload {
            image: Some("ZnJhbWU=".to_string()),
            pose_data: Vec::new(),
            stats: Some(FrameStats {
                persons_detected: state.persons_detected,
                current_fps: state.current_fps,
            }),
            timestamp: 0.0,
        })
    }

    async fn start_session(&self, session_name: &str) -> Result<SessionHandle, RelayError> {
        let mut state = self.state.lock();
        state.calls.push("start_session".to_string());
        state.next_session += 1;
        Ok(SessionHandle {
            session_id: format!("sess-{}", state.next_session),
            session_name: session_name.to_string(),
        })
    }

    async fn stop_session(&self, _session_id: &str) -> Result<(), RelayError> {
        self.state.lock().calls.push("stop_session".to_string());
        Ok(())
    }

    async fn start_recording(&self, _session_id: &str) -> Result<(), RelayError> {
        let mut state = self.state.lock();
        state.calls.push("start_recording".to_string());
        state.device_recording = true;
        Ok(())
    }

    async fn stop_recording(&self, _session_id: &str) -> Result<RecordingInfo, RelayError> {
        let mut state = self.state.lock();
        state.calls.push("stop_recording".to_string());
        state.device_recording = false;
        state.next_recording += 1;
        let entry = RecordingEntry {
            filename: format!("rec_{:03}.mp4", state.next_recording),
            size_bytes: 2_097_152,
        };
        let ready_at = Instant::now() + state.finalize_delay;
        state.finalizing.push((ready_at, entry.clone()));
        Ok(RecordingInfo {
            filename: Some(entry.filename),
            ..Default::default()
        })
    }

    async fn list_recordings(&self) -> Result<Vec<RecordingEntry>, RelayError> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let finalizing = std::mem::take(&mut state.finalizing);
        for (ready_at, entry) in finalizing {
            if ready_at <= now {
                state.recordings.push(entry);
            } else {
                state.finalizing.push((ready_at, entry));
            }
        }
        Ok(state.recordings.clone())
    }

    async fn start_exercise(&self, exercise_id: &str) -> Result<ExerciseInfo, RelayError> {
        let mut state = self.state.lock();
        state.calls.push(format!("start_exercise:{}", exercise_id));
        Ok(ExerciseInfo {
            exercise_id: exercise_id.to_string(),
            name: format!("Brocade {}", exercise_id),
            description: None,
        })
    }

    async fn stop_exercise(&self) -> Result<(), RelayError> {
        self.state.lock().calls.push("stop_exercise".to_string());
        Ok(())
    }

    async fn exercise_feedback(&self) -> Result<Option<ExerciseFeedback>, RelayError> {
        let state = self.state.lock();
        if state.fail_polls {
            return Err(unreachable_err());
        }
        Ok(state.feedback.clone())
    }

    async fn transfer_video(&self, filename: &str) -> Result<String, RelayError> {
        let mut state = self.state.lock();
        state.calls.push(format!("transfer:{}", filename));
        if state.fail_transfer {
            return Err(unreachable_err());
        }
        Ok(filename.to_string())
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<SavedSession, RelayError> {
        self.state.lock().calls.push("save_session".to_string());
        Ok(SavedSession {
            id: "saved-1".to_string(),
            title: record.title.clone(),
            description: record.description.clone(),
            brocade_type: record.brocade_type.clone(),
            video_filename: record.video_filename.clone(),
            has_video_file: record.has_video_file,
            duration_seconds: record.duration_seconds,
            saved_at: None,
        })
    }

    async fn delete_recording(&self, filename: &str) -> Result<(), RelayError> {
        let mut state = self.state.lock();
        state.calls.push(format!("delete:{}", filename));
        if state.fail_delete {
            return Err(unreachable_err());
        }
        state.recordings.retain(|r| r.filename != filename);
        Ok(())
    }

    async fn master_analysis(&self, kind: AnalysisKind) -> Result<serde_json::Value, RelayError> {
        Ok(serde_json::json!({ "analysis": kind.as_query(), "scope": "master" }))
    }

    async fn session_analysis(
        &self,
        session_id: &str,
        kind: AnalysisKind,
    ) -> Result<serde_json::Value, RelayError> {
        Ok(serde_json::json!({ "analysis": kind.as_query(), "session": session_id }))
    }
}
