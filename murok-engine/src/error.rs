use thiserror::Error;

/// Failures the conversation surface can show the child.
///
/// Every variant maps to a stable waiting state: the user always has a way
/// to retry the specific failed step, and none of these mark the session
/// failed on their own.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Profile lookup has not completed yet; the mic press is rejected and
    /// the user retries after a moment.
    #[error("child profile is still loading")]
    ChildNotReady,

    /// Intro/scene fetch failed: blocking error screen, nothing rendered.
    #[error("failed to load the scene")]
    Intro(#[source] anyhow::Error),

    /// One turn failed (network, rejected upload). Retryable by speaking
    /// again; the session itself stays alive.
    #[error("failed to deliver the answer")]
    Turn(#[source] anyhow::Error),

    /// Reward card fetch failed: blocking error screen on the card stage.
    #[error("failed to load the action card")]
    Card(#[source] anyhow::Error),

    /// Microphone could not start (permission, device). Retryable.
    #[error("microphone unavailable")]
    Capture(#[source] anyhow::Error),
}
