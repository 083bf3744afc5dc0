// Headless control panel: open a session against the configured relay,
// print live status, stop cleanly on Ctrl-C

use std::sync::Arc;

use baduanjin_live::{format_duration, Config, LiveCoordinator, LiveSnapshot, PollSettings, RelayClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = Config::load_or_default();
    let session_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Practice".to_string());

    let relay = Arc::new(RelayClient::new(&config));
    let coordinator = LiveCoordinator::new(relay, PollSettings::from(&config));

    let session = coordinator.start_session(&session_name).await?;
    println!(
        "Session '{}' started ({}) against {}",
        session.session_name, session.session_id, config.relay_url
    );
    println!("Press Ctrl-C to stop");

    let mut updates = coordinator.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                print_status(&snapshot);
            }
        }
    }

    let summary = coordinator.stop_session().await?;
    println!(
        "Session '{}' stopped after {}",
        summary.session_name,
        format_duration(summary.duration)
    );
    if !summary.recordings.is_empty() {
        println!("Recordings on device:");
        for recording in &summary.recordings {
            println!("  {} ({})", recording.filename, human_size(recording.size_bytes));
        }
    }

    Ok(())
}

fn print_status(snapshot: &LiveSnapshot) {
    if !snapshot.connected {
        if let Some(error) = &snapshot.connection_error {
            println!("Disconnected: {}", error);
        }
        return;
    }
    let Some(device) = &snapshot.device else {
        return;
    };
    let elapsed = snapshot
        .session
        .as_ref()
        .map(|s| format_duration(s.elapsed()))
        .unwrap_or_else(|| "-".to_string());
    let feedback = snapshot
        .exercise_feedback()
        .map(|f| format!("  Form: {:.0} ({})", f.form_score, f.current_phase))
        .unwrap_or_default();
    println!(
        "[{}] Persons: {}  FPS: {:.1}  Recording: {}{}",
        elapsed,
        device.persons_detected,
        device.current_fps,
        if snapshot.is_recording() { "yes" } else { "no" },
        feedback
    );
}

fn human_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
