use crate::session::SessionStatus;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Latest snapshot of the running interview
    pub status: watch::Receiver<SessionStatus>,

    /// Ends the interview by user request
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(status: watch::Receiver<SessionStatus>, cancel: CancellationToken) -> Self {
        Self { status, cancel }
    }
}
