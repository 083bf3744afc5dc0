// Session, recording, and exercise coordination over the device relay

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::Config;
use crate::error::SessionError;
use crate::relay::{DeviceRelay, ExerciseInfo, RecordingEntry};
use crate::session::{
    format_duration, ExerciseView, LiveSnapshot, RecordingView, SessionSummary, SessionView,
    StoppedRecording,
};

/// Poller timing knobs, taken from [`Config`] in the app and built directly
/// in tests.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Unified poller tick interval
    pub interval: Duration,
    /// Delay between a recording-stop acknowledgement and the recordings
    /// refresh. The device finalizes the file asynchronously; refreshing
    /// immediately races the file write and reports a stale list.
    pub recordings_settle_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            recordings_settle_delay: Duration::from_millis(1500),
        }
    }
}

impl From<&Config> for PollSettings {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            recordings_settle_delay: config.recordings_settle_delay(),
        }
    }
}

/// State cell shared between the coordinator and its poller task.
struct Shared {
    state: Mutex<State>,
    publish: watch::Sender<LiveSnapshot>,
}

struct State {
    snapshot: LiveSnapshot,
    /// Bumped on every session teardown. A poll tick captures the epoch it
    /// started under; a merge from an older epoch is dropped, so a tick
    /// completing after cleanup cannot resurrect cleared state.
    epoch: u64,
}

impl Shared {
    /// Mutate the snapshot and publish the result as one atomic replace.
    /// Publishing happens under the lock so concurrent updates cannot
    /// publish out of order.
    fn update(&self, mutate: impl FnOnce(&mut LiveSnapshot)) -> LiveSnapshot {
        let mut state = self.state.lock();
        mutate(&mut state.snapshot);
        let snapshot = state.snapshot.clone();
        self.publish.send_replace(snapshot.clone());
        snapshot
    }
}

/// Handle to the running poller task. Owned exclusively by the coordinator
/// that started it; nothing else starts or stops the loop.
struct PollerHandle {
    task: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

/// Coordinates session lifecycle, recording lifecycle, exercise tracking,
/// and the unified poller against the device relay.
///
/// The coordinator is the single writer of the [`LiveSnapshot`];
/// presentation code subscribes via [`LiveCoordinator::subscribe`] and only
/// reads. One-shot user actions are serialized internally, so overlapping
/// calls (a stop clicked while a start is in flight) resolve in order
/// rather than interleaving.
pub struct LiveCoordinator {
    relay: Arc<dyn DeviceRelay>,
    settings: PollSettings,
    shared: Arc<Shared>,
    /// Serializes one-shot user actions; poll ticks do not take this
    actions: tokio::sync::Mutex<()>,
    poller: Mutex<Option<PollerHandle>>,
}

impl LiveCoordinator {
    pub fn new(relay: Arc<dyn DeviceRelay>, settings: PollSettings) -> Self {
        let (publish, _) = watch::channel(LiveSnapshot::default());
        Self {
            relay,
            settings,
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    snapshot: LiveSnapshot::default(),
                    epoch: 0,
                }),
                publish,
            }),
            actions: tokio::sync::Mutex::new(()),
            poller: Mutex::new(None),
        }
    }

    /// Subscribe to consolidated state updates.
    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.shared.publish.subscribe()
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> LiveSnapshot {
        self.shared.state.lock().snapshot.clone()
    }

    /// Clear the connection error banner.
    pub fn dismiss_error(&self) {
        self.shared.update(|s| s.connection_error = None);
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Open a named session on the device and start the unified poller.
    ///
    /// On failure the local state is left untouched — there is no partial
    /// session to clean up.
    pub async fn start_session(&self, session_name: &str) -> Result<SessionView, SessionError> {
        let _guard = self.actions.lock().await;

        if self.shared.state.lock().snapshot.session.is_some() {
            return Err(SessionError::SessionAlreadyActive);
        }

        let handle = match self.relay.start_session(session_name).await {
            Ok(handle) => handle,
            Err(e) => {
                // No partial session; the failure is surfaced in the banner
                // and to the caller
                self.shared
                    .update(|s| s.connection_error = Some(e.to_string()));
                return Err(e.into());
            }
        };
        let view = SessionView {
            session_id: handle.session_id,
            session_name: handle.session_name,
            started_at: Utc::now(),
            started: Instant::now(),
            recording: None,
            exercise: None,
        };

        self.shared.update(|s| {
            s.session = Some(view.clone());
            s.connection_error = None;
        });
        self.spawn_poller();

        log::info!(
            "Session '{}' started ({})",
            view.session_name,
            view.session_id
        );
        Ok(view)
    }

    /// Close the active session.
    ///
    /// An open recording is finalized first, then the stop request is sent.
    /// The acknowledgement is best-effort: local resources (poller, state)
    /// are released regardless, so an unreachable device cannot leave the
    /// UI stuck in a phantom session. Elapsed duration comes from the local
    /// monotonic clock.
    pub async fn stop_session(&self) -> Result<SessionSummary, SessionError> {
        let _guard = self.actions.lock().await;

        let view = self
            .shared
            .state
            .lock()
            .snapshot
            .session
            .clone()
            .ok_or(SessionError::NoActiveSession)?;
        let duration = view.elapsed();

        // Recording must be finalized before the session closes
        if view.recording.is_some() {
            if let Err(e) = self.stop_recording_inner().await {
                log::warn!("Failed to stop recording during session stop: {}", e);
            }
        }

        if let Err(e) = self.relay.stop_session(&view.session_id).await {
            log::warn!("Session stop not acknowledged by relay: {}", e);
        }

        // Invalidate any in-flight poll tick, then tear the poller down
        self.shared.state.lock().epoch += 1;
        self.stop_poller();

        let snapshot = self.shared.update(|s| {
            s.session = None;
            s.frame = None;
        });

        let summary = SessionSummary {
            session_id: view.session_id,
            session_name: view.session_name,
            started_at: view.started_at,
            duration,
            recordings: snapshot.recordings,
        };
        log::info!(
            "Session '{}' stopped after {}",
            summary.session_name,
            format_duration(summary.duration)
        );
        Ok(summary)
    }

    // ========================================================================
    // Recording lifecycle
    // ========================================================================

    /// Start video recording within the active session.
    pub async fn start_recording(&self) -> Result<(), SessionError> {
        let _guard = self.actions.lock().await;

        let session_id = {
            let state = self.shared.state.lock();
            let session = state
                .snapshot
                .session
                .as_ref()
                .ok_or(SessionError::NoActiveSession)?;
            if session.recording.is_some() {
                return Err(SessionError::AlreadyRecording);
            }
            session.session_id.clone()
        };

        self.relay.start_recording(&session_id).await?;
        self.shared.update(|s| {
            if let Some(session) = s.session.as_mut() {
                session.recording = Some(RecordingView {
                    started_at: Utc::now(),
                    started: Instant::now(),
                });
            }
        });
        log::info!("Recording started");
        Ok(())
    }

    /// Stop the active recording and refresh the recordings list after the
    /// settling delay, so the just-created file shows up.
    pub async fn stop_recording(&self) -> Result<StoppedRecording, SessionError> {
        let _guard = self.actions.lock().await;
        self.stop_recording_inner().await
    }

    async fn stop_recording_inner(&self) -> Result<StoppedRecording, SessionError> {
        let (session_id, recording_started) = {
            let state = self.shared.state.lock();
            let session = state
                .snapshot
                .session
                .as_ref()
                .ok_or(SessionError::NoActiveSession)?;
            let recording = session
                .recording
                .as_ref()
                .ok_or(SessionError::NotRecording)?;
            (session.session_id.clone(), recording.started)
        };

        let info = self.relay.stop_recording(&session_id).await?;
        let duration = recording_started.elapsed();

        self.shared.update(|s| {
            if let Some(session) = s.session.as_mut() {
                session.recording = None;
            }
        });
        log::info!("Recording stopped after {}", format_duration(duration));

        // The device finalizes the file after acknowledging; refreshing
        // immediately would race the write
        tokio::time::sleep(self.settings.recordings_settle_delay).await;
        self.refresh_recordings().await;

        Ok(StoppedRecording {
            filename: info.filename,
            duration,
        })
    }

    /// Refresh the recordings list. Best-effort: a failed listing is logged
    /// and swallowed to an empty list.
    pub async fn refresh_recordings(&self) -> Vec<RecordingEntry> {
        let listed = match self.relay.list_recordings().await {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Failed to list recordings: {}", e);
                Vec::new()
            }
        };
        self.shared.update(|s| s.recordings = listed.clone());
        listed
    }

    // ========================================================================
    // Exercise tracking
    // ========================================================================

    /// Start server-side form tracking for the given exercise. An empty id
    /// means nothing is selected; that is a no-op, not an error.
    pub async fn start_tracking(
        &self,
        exercise_id: &str,
    ) -> Result<Option<ExerciseInfo>, SessionError> {
        let _guard = self.actions.lock().await;
        self.start_tracking_inner(exercise_id).await
    }

    /// Stop tracking. Local tracking state is cleared even if the relay
    /// call fails — a user-initiated stop must never leave a stale
    /// "currently tracking" behind.
    pub async fn stop_tracking(&self) -> Result<(), SessionError> {
        let _guard = self.actions.lock().await;
        self.stop_tracking_inner().await
    }

    /// Switch tracking to a different exercise. The stop fully completes
    /// (feedback cleared) before the new start is attempted, so no two
    /// exercises are ever simultaneously current, even transiently.
    pub async fn change_tracking(
        &self,
        new_exercise_id: &str,
    ) -> Result<Option<ExerciseInfo>, SessionError> {
        let _guard = self.actions.lock().await;

        if let Err(e) = self.stop_tracking_inner().await {
            log::warn!("Failed to stop exercise tracking during change: {}", e);
        }
        self.start_tracking_inner(new_exercise_id).await
    }

    async fn start_tracking_inner(
        &self,
        exercise_id: &str,
    ) -> Result<Option<ExerciseInfo>, SessionError> {
        if exercise_id.trim().is_empty() {
            return Ok(None);
        }
        if self.shared.state.lock().snapshot.session.is_none() {
            return Err(SessionError::NoActiveSession);
        }

        let info = self.relay.start_exercise(exercise_id).await?;
        self.shared.update(|s| {
            if let Some(session) = s.session.as_mut() {
                session.exercise = Some(ExerciseView {
                    info: info.clone(),
                    feedback: None,
                });
            }
        });
        log::info!("Tracking exercise '{}'", exercise_id);
        Ok(Some(info))
    }

    async fn stop_tracking_inner(&self) -> Result<(), SessionError> {
        let was_tracking = self.shared.state.lock().snapshot.is_tracking();
        if !was_tracking {
            return Ok(());
        }

        let result = self.relay.stop_exercise().await;
        self.shared.update(|s| {
            if let Some(session) = s.session.as_mut() {
                session.exercise = None;
            }
        });
        log::info!("Tracking stopped");
        result.map_err(SessionError::from)
    }

    // ========================================================================
    // Unified poller
    // ========================================================================

    fn spawn_poller(&self) {
        self.stop_poller();

        let epoch = self.shared.state.lock().epoch;
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let relay = self.relay.clone();
        let shared = self.shared.clone();
        let interval = self.settings.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // A tick that outlasts the interval skips the missed slots
            // rather than queuing a burst of catch-up ticks against a slow
            // device
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        poll_tick(relay.as_ref(), &shared, epoch).await;
                    }
                }
            }
            log::debug!("Poller loop exited");
        });

        *self.poller.lock() = Some(PollerHandle {
            task,
            stop: stop_tx,
        });
    }

    fn stop_poller(&self) {
        if let Some(handle) = self.poller.lock().take() {
            let _ = handle.stop.send(true);
            // Abandon any in-flight tick; the epoch guard already keeps a
            // completed-but-unmerged tick from writing stale state
            handle.task.abort();
        }
    }
}

impl Drop for LiveCoordinator {
    fn drop(&mut self) {
        // Unmount without a stop_session call must not leave a timer firing
        self.stop_poller();
    }
}

/// One poller tick: fetch status + frame + (conditionally) feedback
/// concurrently, then fold all results into the snapshot as a single
/// update. Ticks are strictly sequential — the loop awaits this function
/// before the next tick can fire.
async fn poll_tick(relay: &dyn DeviceRelay, shared: &Shared, epoch: u64) {
    // Identity marks taken before the fetches. A user action can change the
    // recording or the tracked exercise while requests are in flight; the
    // merge below only applies device-reported state to the same recording
    // and exercise it was fetched against.
    let (tracking_id, recording_mark) = {
        let state = shared.state.lock();
        if state.epoch != epoch {
            return;
        }
        let Some(session) = state.snapshot.session.as_ref() else {
            return;
        };
        (
            session
                .exercise
                .as_ref()
                .map(|e| e.info.exercise_id.clone()),
            session.recording.as_ref().map(|r| r.started),
        )
    };
    let tracking = tracking_id.is_some();

    let (status, frame, feedback) = tokio::join!(relay.status(), relay.current_frame(), async {
        if tracking {
            Some(relay.exercise_feedback().await)
        } else {
            None
        }
    });

    // `feedback` is None when tracking was off this tick, Some(polled
    // value) otherwise
    let tick = match (status, frame, feedback.transpose()) {
        (Ok(status), Ok(frame), Ok(feedback)) => Ok((status, frame, feedback)),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => Err(e),
    };

    let mut state = shared.state.lock();
    if state.epoch != epoch {
        // Cleanup won the race while requests were in flight
        return;
    }
    let snapshot = &mut state.snapshot;

    match tick {
        Ok((status, frame, feedback)) => {
            snapshot.connected = true;
            snapshot.connection_error = None;
            if let Some(session) = snapshot.session.as_mut() {
                // A successful status response is authoritative: the device
                // finalizing or aborting a recording on its own is
                // reconciled here. The reverse (adopting a device-initiated
                // recording) is not — the client has no start time for it.
                // Only the recording the status was fetched against is
                // eligible; one started mid-tick is left alone.
                let same_recording =
                    session.recording.as_ref().map(|r| r.started) == recording_mark;
                if same_recording && session.recording.is_some() && !status.is_recording {
                    log::warn!("Device reports recording ended; reconciling local state");
                    session.recording = None;
                }
                if let Some(polled) = feedback {
                    if let Some(exercise) = session.exercise.as_mut() {
                        // Feedback belongs to the exercise it was polled for
                        if Some(&exercise.info.exercise_id) == tracking_id.as_ref() {
                            exercise.feedback = polled;
                        }
                    }
                }
            }
            snapshot.device = Some(status);
            snapshot.frame = Some(frame);
        }
        Err(e) => {
            // Transient failure: the session and recording survive a
            // network blip, but stale visuals must not pose as live data
            snapshot.connected = false;
            snapshot.connection_error = Some(e.to_string());
            snapshot.frame = None;
            if let Some(session) = snapshot.session.as_mut() {
                if let Some(exercise) = session.exercise.as_mut() {
                    exercise.feedback = None;
                }
            }
        }
    }

    let published = snapshot.clone();
    shared.publish.send_replace(published);
}
