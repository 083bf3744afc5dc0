// Device-relay boundary: typed API over the Pi camera + inference relay

pub mod client;
pub mod types;

pub use client::RelayClient;
pub use types::*;

use async_trait::async_trait;

use crate::analysis::AnalysisKind;
use crate::error::RelayError;

/// The external device-relay, seen as a typed async API.
///
/// The production implementation is [`RelayClient`] over HTTP; tests
/// substitute a scripted mock. Every method resolves to `Ok` or a
/// [`RelayError`], never to a raw response shape.
#[async_trait]
pub trait DeviceRelay: Send + Sync {
    /// Device connectivity, camera/model availability, live counters.
    async fn status(&self) -> Result<DeviceStatus, RelayError>;

    /// Most recent encoded frame plus pose keypoints.
    async fn current_frame(&self) -> Result<FramePayload, RelayError>;

    /// Open a named session on the device.
    async fn start_session(&self, session_name: &str) -> Result<SessionHandle, RelayError>;

    /// Close a session. Acknowledgement is best-effort; callers clean up
    /// locally regardless.
    async fn stop_session(&self, session_id: &str) -> Result<(), RelayError>;

    /// Start video recording within an active session.
    async fn start_recording(&self, session_id: &str) -> Result<(), RelayError>;

    /// Stop video recording. The device finalizes the file asynchronously
    /// after acknowledging.
    async fn stop_recording(&self, session_id: &str) -> Result<RecordingInfo, RelayError>;

    /// List recording files currently on the device.
    async fn list_recordings(&self) -> Result<Vec<RecordingEntry>, RelayError>;

    /// Start server-side exercise-form tracking.
    async fn start_exercise(&self, exercise_id: &str) -> Result<ExerciseInfo, RelayError>;

    /// Stop server-side exercise-form tracking.
    async fn stop_exercise(&self) -> Result<(), RelayError>;

    /// Latest scored feedback for the tracked exercise, if any has been
    /// produced yet.
    async fn exercise_feedback(&self) -> Result<Option<ExerciseFeedback>, RelayError>;

    /// Transfer a recording file from the device to permanent storage.
    /// Large payload; carries the long timeout class.
    async fn transfer_video(&self, filename: &str) -> Result<String, RelayError>;

    /// Persist session metadata to permanent storage.
    async fn save_session(&self, record: &SessionRecord) -> Result<SavedSession, RelayError>;

    /// Delete a recording file on the device.
    async fn delete_recording(&self, filename: &str) -> Result<(), RelayError>;

    /// Reference analysis series for the master performer.
    async fn master_analysis(&self, kind: AnalysisKind) -> Result<serde_json::Value, RelayError>;

    /// Analysis series computed for a saved session.
    async fn session_analysis(
        &self,
        session_id: &str,
        kind: AnalysisKind,
    ) -> Result<serde_json::Value, RelayError>;
}
