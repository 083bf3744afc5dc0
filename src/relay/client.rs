// HTTP implementation of the device-relay boundary

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::analysis::AnalysisKind;
use crate::config::Config;
use crate::error::RelayError;
use crate::relay::types::*;
use crate::relay::DeviceRelay;

/// Timeout for one-shot actions (start/stop session, recording, tracking).
/// Polls use the configured short timeout; transfers use the long one.
const ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the Pi device-relay.
///
/// One shared pooled `reqwest::Client`; all requests carry the bearer token
/// and a timeout appropriate to their class. An absent token fails every
/// request locally without touching the network.
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    poll_timeout: Duration,
    transfer_timeout: Duration,
}

impl RelayClient {
    pub fn new(config: &Config) -> Self {
        Self::from_parts(
            &config.relay_url,
            config.token(),
            Duration::from_secs(config.poll_timeout_secs),
            Duration::from_secs(config.transfer_timeout_secs),
        )
    }

    pub fn from_parts(
        base_url: &str,
        token: Option<String>,
        poll_timeout: Duration,
        transfer_timeout: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            poll_timeout,
            transfer_timeout,
        }
    }

    fn bearer(&self) -> Result<&str, RelayError> {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(RelayError::MissingToken),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T, RelayError> {
        let token = self.bearer()?;
        let response = self
            .http
            .get(self.endpoint(path))
            .bearer_auth(token)
            .timeout(timeout)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
        timeout: Duration,
    ) -> Result<T, RelayError> {
        let token = self.bearer()?;
        let mut request = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(token)
            .timeout(timeout);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        Self::decode(response).await
    }

    async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T, RelayError> {
        let token = self.bearer()?;
        let response = self
            .http
            .delete(self.endpoint(path))
            .bearer_auth(token)
            .timeout(timeout)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RelayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Http(status.as_u16()));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RelayError::Decode(e.to_string()))
    }
}

// ============================================================================
// Response envelopes
// ============================================================================
//
// The relay signals failure inconsistently: some endpoints omit `success`
// entirely, others set `success: false` with the reason in `error` or
// `message`. Each envelope is converted to a Result here so nothing past
// this file inspects raw optional fields.

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Ack {
    fn rejection(self) -> Result<(), RelayError> {
        if self.success {
            Ok(())
        } else {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "request rejected".to_string());
            Err(RelayError::Rejected(reason))
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartSessionResponse {
    #[serde(flatten)]
    ack: Ack,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    session_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FrameResponse {
    #[serde(flatten)]
    ack: Ack,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    pose_data: Vec<PosePerson>,
    #[serde(default)]
    stats: Option<FrameStats>,
    #[serde(default)]
    timestamp: f64,
}

#[derive(Debug, Deserialize)]
struct StopRecordingResponse {
    #[serde(flatten)]
    ack: Ack,
    #[serde(default)]
    recording_info: Option<RecordingInfo>,
}

#[derive(Debug, Deserialize)]
struct RecordingsResponse {
    #[serde(flatten)]
    ack: Ack,
    #[serde(default)]
    recordings: Vec<RecordingEntry>,
}

#[derive(Debug, Deserialize)]
struct StartExerciseResponse {
    #[serde(flatten)]
    ack: Ack,
    #[serde(default)]
    exercise_info: Option<ExerciseInfo>,
}

#[derive(Debug, Deserialize)]
struct FeedbackResponse {
    #[serde(default)]
    feedback: Option<ExerciseFeedback>,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    #[serde(flatten)]
    ack: Ack,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaveSessionResponse {
    #[serde(flatten)]
    ack: Ack,
    #[serde(default)]
    session: Option<SavedSession>,
}

#[async_trait]
impl DeviceRelay for RelayClient {
    async fn status(&self) -> Result<DeviceStatus, RelayError> {
        self.get("status", self.poll_timeout).await
    }

    async fn current_frame(&self) -> Result<FramePayload, RelayError> {
        let response: FrameResponse = self.get("current-frame", self.poll_timeout).await?;
        let FrameResponse {
            ack,
            image,
            pose_data,
            stats,
            timestamp,
        } = response;
        ack.rejection()?;
        Ok(FramePayload {
            image,
            pose_data,
            stats,
            timestamp,
        })
    }

    async fn start_session(&self, session_name: &str) -> Result<SessionHandle, RelayError> {
        let response: StartSessionResponse = self
            .post(
                "start-session",
                Some(json!({ "session_name": session_name })),
                ACTION_TIMEOUT,
            )
            .await?;
        let StartSessionResponse {
            ack,
            session_id,
            session_name: reported_name,
        } = response;
        ack.rejection()?;
        let session_id = session_id
            .ok_or_else(|| RelayError::Decode("start-session response missing session_id".into()))?;
        Ok(SessionHandle {
            session_id,
            session_name: reported_name.unwrap_or_else(|| session_name.to_string()),
        })
    }

    async fn stop_session(&self, session_id: &str) -> Result<(), RelayError> {
        let ack: Ack = self
            .post(&format!("stop-session/{session_id}"), None, ACTION_TIMEOUT)
            .await?;
        ack.rejection()
    }

    async fn start_recording(&self, session_id: &str) -> Result<(), RelayError> {
        let ack: Ack = self
            .post(&format!("recording/start/{session_id}"), None, ACTION_TIMEOUT)
            .await?;
        ack.rejection()
    }

    async fn stop_recording(&self, session_id: &str) -> Result<RecordingInfo, RelayError> {
        let response: StopRecordingResponse = self
            .post(&format!("recording/stop/{session_id}"), None, ACTION_TIMEOUT)
            .await?;
        let StopRecordingResponse {
            ack,
            recording_info,
        } = response;
        ack.rejection()?;
        Ok(recording_info.unwrap_or_default())
    }

    async fn list_recordings(&self) -> Result<Vec<RecordingEntry>, RelayError> {
        let response: RecordingsResponse = self.get("recordings", ACTION_TIMEOUT).await?;
        let RecordingsResponse { ack, recordings } = response;
        ack.rejection()?;
        Ok(recordings)
    }

    async fn start_exercise(&self, exercise_id: &str) -> Result<ExerciseInfo, RelayError> {
        let response: StartExerciseResponse = self
            .post(&format!("baduanjin/start/{exercise_id}"), None, ACTION_TIMEOUT)
            .await?;
        let StartExerciseResponse { ack, exercise_info } = response;
        ack.rejection()?;
        // Some relay builds return a bare ack; fall back to the requested id.
        Ok(exercise_info.unwrap_or_else(|| ExerciseInfo {
            exercise_id: exercise_id.to_string(),
            ..Default::default()
        }))
    }

    async fn stop_exercise(&self) -> Result<(), RelayError> {
        let ack: Ack = self.post("baduanjin/stop", None, ACTION_TIMEOUT).await?;
        ack.rejection()
    }

    async fn exercise_feedback(&self) -> Result<Option<ExerciseFeedback>, RelayError> {
        let response: FeedbackResponse = self.get("baduanjin/feedback", self.poll_timeout).await?;
        Ok(response.feedback)
    }

    async fn transfer_video(&self, filename: &str) -> Result<String, RelayError> {
        let response: TransferResponse = self
            .post(
                &format!("transfer-video/{filename}"),
                None,
                self.transfer_timeout,
            )
            .await?;
        let TransferResponse {
            ack,
            filename: transferred,
        } = response;
        ack.rejection()?;
        Ok(transferred.unwrap_or_else(|| filename.to_string()))
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<SavedSession, RelayError> {
        let body = serde_json::to_value(record)
            .map_err(|e| RelayError::Decode(e.to_string()))?;
        let response: SaveSessionResponse =
            self.post("save-session", Some(body), ACTION_TIMEOUT).await?;
        let SaveSessionResponse { ack, session } = response;
        ack.rejection()?;
        session.ok_or_else(|| {
            RelayError::Decode("save-session response missing persisted record".into())
        })
    }

    async fn delete_recording(&self, filename: &str) -> Result<(), RelayError> {
        let ack: Ack = self
            .delete(&format!("recordings/{filename}"), ACTION_TIMEOUT)
            .await?;
        ack.rejection()
    }

    async fn master_analysis(&self, kind: AnalysisKind) -> Result<serde_json::Value, RelayError> {
        self.get(&format!("analysis/master/{}", kind.as_query()), ACTION_TIMEOUT)
            .await
    }

    async fn session_analysis(
        &self,
        session_id: &str,
        kind: AnalysisKind,
    ) -> Result<serde_json::Value, RelayError> {
        self.get(
            &format!("analysis/session/{}/{}", session_id, kind.as_query()),
            ACTION_TIMEOUT,
        )
        .await
    }
}
