use murok_audio::AudioCaptureError;
use murok_engine::error::SessionError;

/// Short, child-appropriate message for a surfaced failure.
///
/// Keep messages actionable and short; details are in logs. Every message
/// corresponds to a state the user can retry from; none of these are
/// dead ends.
pub fn describe_session_error(err: &SessionError) -> String {
    match err {
        SessionError::ChildNotReady => {
            "We're still getting things ready. Please try again in a moment.".into()
        }
        SessionError::Turn(_) => {
            "Please press and hold the microphone and answer one more time.".into()
        }
        SessionError::Intro(_) => "Could not load the story scene. Please try again.".into(),
        SessionError::Card(_) => "Could not load the action card. Please try again.".into(),
        SessionError::Capture(source) => describe_capture_failure(source),
    }
}

fn describe_capture_failure(source: &anyhow::Error) -> String {
    match source.downcast_ref::<AudioCaptureError>() {
        Some(AudioCaptureError::PermissionDenied) => {
            "Microphone access appears blocked. Please allow the microphone in settings.".into()
        }
        Some(AudioCaptureError::NoInputDevice) => {
            "No microphone detected. Check your mic and try again.".into()
        }
        _ => "The microphone had a problem. Please try again.".into(),
    }
}
