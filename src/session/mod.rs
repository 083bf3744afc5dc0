// Live session state model and coordination

pub mod coordinator;
pub mod save;

pub use coordinator::*;
pub use save::*;

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::relay::{
    DeviceStatus, ExerciseFeedback, ExerciseInfo, FramePayload, RecordingEntry,
};

/// An open session on the device.
///
/// Recording and exercise tracking are nested here rather than held as
/// top-level flags, so a recording without a session cannot be represented.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub session_id: String,
    pub session_name: String,
    /// Wall-clock start, for display
    pub started_at: DateTime<Utc>,
    /// Monotonic start; authoritative for elapsed-time display
    pub started: Instant,
    pub recording: Option<RecordingView>,
    pub exercise: Option<ExerciseView>,
}

impl SessionView {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// An active recording within a session.
#[derive(Debug, Clone)]
pub struct RecordingView {
    pub started_at: DateTime<Utc>,
    pub started: Instant,
}

impl RecordingView {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Server-side exercise tracking in progress.
#[derive(Debug, Clone)]
pub struct ExerciseView {
    pub info: ExerciseInfo,
    /// Latest scored feedback; lags tracking start by at most one poll tick
    pub feedback: Option<ExerciseFeedback>,
}

/// The consolidated client-side state snapshot.
///
/// Owned and written exclusively by [`LiveCoordinator`]; presentation code
/// receives clones through a watch channel and never mutates one. All
/// fields of one poll tick land in a single replace, so readers never see
/// a torn update.
#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    /// Present iff a session is open on the device
    pub session: Option<SessionView>,
    /// Last-known device reachability, refreshed every poll tick
    pub connected: bool,
    /// Human-readable error; set on poll/request failure, cleared on the
    /// next success or explicit dismissal
    pub connection_error: Option<String>,
    /// Full device status as last reported (fps, persons, cpu, ...)
    pub device: Option<DeviceStatus>,
    /// Latest frame; always replaced, never queued
    pub frame: Option<FramePayload>,
    /// Device recordings as last listed
    pub recordings: Vec<RecordingEntry>,
}

impl LiveSnapshot {
    pub fn is_recording(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.recording.is_some())
            .unwrap_or(false)
    }

    pub fn is_tracking(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.exercise.is_some())
            .unwrap_or(false)
    }

    pub fn exercise_feedback(&self) -> Option<&ExerciseFeedback> {
        self.session
            .as_ref()
            .and_then(|s| s.exercise.as_ref())
            .and_then(|e| e.feedback.as_ref())
    }
}

/// What a session amounted to once stopped. Duration comes from the local
/// monotonic clock, not the device.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub session_name: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Device recordings as listed at stop time
    pub recordings: Vec<RecordingEntry>,
}

/// Result of a successful recording stop.
#[derive(Debug, Clone)]
pub struct StoppedRecording {
    /// Filename the device reported, when it did
    pub filename: Option<String>,
    pub duration: Duration,
}

/// Format an elapsed duration for display: `m:ss`, with hours when needed.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
