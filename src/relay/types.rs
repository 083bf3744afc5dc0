// Wire contract for the Pi relay HTTP/JSON API
//
// The API shape is fixed by the remote device-relay service; these types
// mirror it field for field. Optional fields carry #[serde(default)] because
// the relay omits them freely depending on device state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device status record, returned by `GET status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Whether the Pi itself is reachable behind the relay.
    pub pi_connected: bool,
    #[serde(default)]
    pub is_recording: bool,
    #[serde(default)]
    pub camera_available: bool,
    #[serde(default)]
    pub yolo_available: bool,
    /// Whether the inference loop is running (streaming frames).
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub persons_detected: u32,
    #[serde(default)]
    pub current_fps: f64,
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    #[serde(default)]
    pub memory_usage: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One detected keypoint in frame coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub confidence: f64,
}

/// Pose detection for one person in a frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosePerson {
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    #[serde(default)]
    pub confidence: f64,
}

/// Per-frame counters reported alongside the image.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FrameStats {
    #[serde(default)]
    pub persons_detected: u32,
    #[serde(default)]
    pub current_fps: f64,
}

/// Latest frame plus pose keypoints, from `GET current-frame`.
///
/// The image stays base64-encoded as received; decode lazily via
/// [`FramePayload::decode_image`] only when raw bytes are needed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FramePayload {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub pose_data: Vec<PosePerson>,
    #[serde(default)]
    pub stats: Option<FrameStats>,
    #[serde(default)]
    pub timestamp: f64,
}

impl FramePayload {
    /// Decode the base64 image payload to raw encoded-image bytes.
    pub fn decode_image(&self) -> Option<Vec<u8>> {
        use base64::Engine;
        let image = self.image.as_deref()?;
        base64::engine::general_purpose::STANDARD.decode(image).ok()
    }
}

/// A recording file present on the device, from `GET recordings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingEntry {
    pub filename: String,
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
}

/// Session identity as issued by `POST start-session`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    pub session_name: String,
}

/// Recording details the relay may attach to a recording-stop acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingInfo {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(rename = "size", default)]
    pub size_bytes: Option<u64>,
}

/// Exercise descriptor returned when server-side tracking starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExerciseInfo {
    #[serde(default)]
    pub exercise_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Scored form feedback, from `GET baduanjin/feedback`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExerciseFeedback {
    #[serde(default)]
    pub form_score: f64,
    #[serde(default)]
    pub completion_percentage: f64,
    #[serde(default)]
    pub current_phase: String,
    #[serde(default)]
    pub feedback_messages: Vec<String>,
    #[serde(default)]
    pub corrections: Vec<String>,
}

/// Session metadata posted to `POST save-session` for permanent storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub title: String,
    pub description: String,
    pub brocade_type: String,
    pub session_id: String,
    #[serde(default)]
    pub video_filename: Option<String>,
    pub has_video_file: bool,
    pub duration_seconds: u64,
}

/// The persisted record echoed back by `POST save-session`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedSession {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brocade_type: String,
    #[serde(default)]
    pub video_filename: Option<String>,
    #[serde(default)]
    pub has_video_file: bool,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}
