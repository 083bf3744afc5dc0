// Coordinator lifecycle and unified-poller behavior against a scripted relay

mod common;

use std::sync::Arc;
use std::time::Duration;

use baduanjin_live::{format_duration, LiveCoordinator, PollSettings, SessionError};
use common::MockRelay;

fn coordinator_with(interval_ms: u64, settle_ms: u64) -> (Arc<MockRelay>, LiveCoordinator) {
    let mock = Arc::new(MockRelay::new());
    let coordinator = LiveCoordinator::new(
        mock.clone(),
        PollSettings {
            interval: Duration::from_millis(interval_ms),
            recordings_settle_delay: Duration::from_millis(settle_ms),
        },
    );
    (mock, coordinator)
}

#[tokio::test(start_paused = true)]
async fn recording_stops_before_session_stop() {
    let (mock, coordinator) = coordinator_with(200, 1500);

    coordinator.start_session("Morning").await.unwrap();
    coordinator.start_recording().await.unwrap();
    let summary = coordinator.stop_session().await.unwrap();

    assert_eq!(summary.session_name, "Morning");
    assert_eq!(
        mock.calls(),
        vec![
            "start_session",
            "start_recording",
            "stop_recording",
            "stop_session"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn recording_requires_active_session() {
    let (mock, coordinator) = coordinator_with(200, 1500);

    let err = coordinator.start_recording().await.unwrap_err();
    assert!(matches!(err, SessionError::NoActiveSession));
    assert!(!coordinator.snapshot().is_recording());
    // The precondition violation never reached the device
    assert!(mock.calls().is_empty());

    let err = coordinator.stop_session().await.unwrap_err();
    assert!(matches!(err, SessionError::NoActiveSession));
}

#[tokio::test(start_paused = true)]
async fn second_session_start_is_rejected() {
    let (_mock, coordinator) = coordinator_with(200, 1500);

    coordinator.start_session("First").await.unwrap();
    let err = coordinator.start_session("Second").await.unwrap_err();
    assert!(matches!(err, SessionError::SessionAlreadyActive));

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.session.unwrap().session_name, "First");
}

#[tokio::test(start_paused = true)]
async fn poll_failure_preserves_session_and_recording() {
    let (mock, coordinator) = coordinator_with(200, 1500);

    coordinator.start_session("Morning").await.unwrap();
    coordinator.start_recording().await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    let snapshot = coordinator.snapshot();
    assert!(snapshot.connected);
    assert!(snapshot.frame.is_some());

    mock.state.lock().fail_polls = true;
    tokio::time::sleep(Duration::from_millis(400)).await;

    let snapshot = coordinator.snapshot();
    assert!(!snapshot.connected);
    assert!(snapshot.connection_error.is_some());
    // Stale visuals are dropped, but the session and recording survive
    assert!(snapshot.frame.is_none());
    assert!(snapshot.session.is_some());
    assert!(snapshot.is_recording());

    // The error auto-clears on the next successful poll
    mock.state.lock().fail_polls = false;
    tokio::time::sleep(Duration::from_millis(400)).await;
    let snapshot = coordinator.snapshot();
    assert!(snapshot.connected);
    assert!(snapshot.connection_error.is_none());
    assert!(snapshot.frame.is_some());
}

#[tokio::test(start_paused = true)]
async fn stopped_recording_listed_after_settling_delay() {
    let (mock, coordinator) = coordinator_with(200, 1500);
    // The device finalizes the file 1s after acknowledging the stop; an
    // immediate refresh would miss it
    mock.state.lock().finalize_delay = Duration::from_secs(1);

    coordinator.start_session("Morning").await.unwrap();
    coordinator.start_recording().await.unwrap();
    let stopped = coordinator.stop_recording().await.unwrap();
    let filename = stopped.filename.unwrap();

    let snapshot = coordinator.snapshot();
    assert!(
        snapshot.recordings.iter().any(|r| r.filename == filename),
        "expected {} in {:?}",
        filename,
        snapshot.recordings
    );
}

#[tokio::test(start_paused = true)]
async fn change_tracking_stops_old_exercise_first() {
    let (mock, coordinator) = coordinator_with(200, 1500);

    coordinator.start_session("Morning").await.unwrap();
    coordinator.start_tracking("brocade-1").await.unwrap();
    let info = coordinator.change_tracking("brocade-2").await.unwrap().unwrap();
    assert_eq!(info.exercise_id, "brocade-2");

    let lifecycle: Vec<String> = mock
        .calls()
        .into_iter()
        .filter(|c| c.contains("exercise"))
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            "start_exercise:brocade-1",
            "stop_exercise",
            "start_exercise:brocade-2"
        ]
    );

    let snapshot = coordinator.snapshot();
    let exercise = snapshot.session.unwrap().exercise.unwrap();
    assert_eq!(exercise.info.exercise_id, "brocade-2");
    // Feedback from the previous exercise never carries over
    assert!(exercise.feedback.is_none());
}

#[tokio::test(start_paused = true)]
async fn elapsed_duration_uses_the_local_clock() {
    let (_mock, coordinator) = coordinator_with(200, 1500);

    coordinator.start_session("Morning").await.unwrap();
    coordinator.start_recording().await.unwrap();

    tokio::time::sleep(Duration::from_secs(65)).await;

    let snapshot = coordinator.snapshot();
    let session = snapshot.session.unwrap();
    assert_eq!(format_duration(session.elapsed()), "1:05");
    assert_eq!(
        format_duration(session.recording.unwrap().elapsed()),
        "1:05"
    );
}

#[tokio::test(start_paused = true)]
async fn status_counters_refresh_across_ticks() {
    let (mock, coordinator) = coordinator_with(200, 1500);
    mock.state.lock().persons_detected = 2;

    coordinator.start_session("Morning").await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let snapshot = coordinator.snapshot();
    let session_id = snapshot.session.as_ref().unwrap().session_id.clone();
    assert_eq!(snapshot.device.unwrap().persons_detected, 2);

    mock.state.lock().persons_detected = 5;
    tokio::time::sleep(Duration::from_millis(250)).await;

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.device.unwrap().persons_detected, 5);
    // Same session throughout; the update was a re-poll, not a restart
    assert_eq!(snapshot.session.unwrap().session_id, session_id);
}

#[tokio::test(start_paused = true)]
async fn feedback_arrives_while_tracking_and_clears_on_stop() {
    let (mock, coordinator) = coordinator_with(200, 1500);
    mock.state.lock().feedback = Some(baduanjin_live::relay::ExerciseFeedback {
        form_score: 85.0,
        completion_percentage: 50.0,
        current_phase: "transition".to_string(),
        feedback_messages: vec!["good pace".to_string()],
        corrections: Vec::new(),
    });

    coordinator.start_session("Morning").await.unwrap();
    coordinator.start_tracking("brocade-4").await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let snapshot = coordinator.snapshot();
    assert!(snapshot.is_tracking());
    assert_eq!(snapshot.exercise_feedback().unwrap().form_score, 85.0);

    coordinator.stop_tracking().await.unwrap();
    let snapshot = coordinator.snapshot();
    assert!(!snapshot.is_tracking());
    assert!(snapshot.exercise_feedback().is_none());
}

#[tokio::test(start_paused = true)]
async fn empty_exercise_id_is_a_noop() {
    let (mock, coordinator) = coordinator_with(200, 1500);

    coordinator.start_session("Morning").await.unwrap();
    let started = coordinator.start_tracking("").await.unwrap();
    assert!(started.is_none());
    assert!(!coordinator.snapshot().is_tracking());
    assert!(!mock.calls().iter().any(|c| c.starts_with("start_exercise")));
}

#[tokio::test(start_paused = true)]
async fn tracking_requires_active_session() {
    let (_mock, coordinator) = coordinator_with(200, 1500);

    let err = coordinator.start_tracking("brocade-1").await.unwrap_err();
    assert!(matches!(err, SessionError::NoActiveSession));
}

#[tokio::test(start_paused = true)]
async fn poller_stops_when_the_session_ends() {
    let (mock, coordinator) = coordinator_with(200, 1500);

    coordinator.start_session("Morning").await.unwrap();
    tokio::time::sleep(Duration::from_millis(450)).await;
    coordinator.stop_session().await.unwrap();

    let polls_after_stop = mock.state.lock().status_polls;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        mock.state.lock().status_polls,
        polls_after_stop,
        "poller kept firing after session stop"
    );

    let snapshot = coordinator.snapshot();
    assert!(snapshot.session.is_none());
    assert!(snapshot.frame.is_none());
}
