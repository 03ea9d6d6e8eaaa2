use thiserror::Error;

/// User-facing failures of the overlay engine.
///
/// `SnapshotUnavailable` and `PersistenceUnavailable` are absorbed inside a
/// single poll; only the explicit reminder actions surface the rest.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("window snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[from] anyhow::Error),

    #[error("reminder limit reached: at most {cap} active reminders allowed")]
    CapacityExceeded { cap: i64 },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("overlay controller is not running")]
    ControllerStopped,
}

impl OverlayError {
    /// True for errors the user must act on rather than retry.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            OverlayError::CapacityExceeded { .. }
                | OverlayError::NotFound { .. }
                | OverlayError::InvalidInput { .. }
        )
    }
}

impl From<OverlayError> for String {
    fn from(e: OverlayError) -> Self {
        e.to_string()
    }
}
