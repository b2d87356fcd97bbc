use thiserror::Error;

use crate::constants::{COOLDOWN_MESSAGE, GENERIC_SPIN_ERROR, NETWORK_ERROR_MESSAGE};

/// Every way a spin session can end without a reward.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpinError {
    /// Spinning too soon after the last successful spin, locally or per the server.
    #[error("spin cooldown active")]
    Cooldown { remaining_ms: Option<f64> },
    /// Timed out or cancelled. Never shown to the user.
    #[error("spin request aborted")]
    Aborted,
    #[error("reward service unreachable: {0}")]
    NetworkUnavailable(String),
    #[error("reward service rejected the spin: {0}")]
    ServerRejected(String),
    #[error("a spin is already in progress")]
    Busy,
    #[error("item catalog not loaded")]
    CatalogUnavailable,
    #[error("reel length {length} must exceed final index {final_index}")]
    InvalidLayout { length: usize, final_index: usize },
}

/// Network-level failure reported by a transport, before any HTTP status exists.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Cooldown,
    NetworkUnavailable,
    ServerRejected,
}

/// A transient message surfaced in the idle state.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl SpinError {
    /// User-facing notice for this failure, `None` for silent kinds.
    pub fn notice(&self) -> Option<SpinNotice> {
        match self {
            SpinError::Cooldown { .. } => Some(SpinNotice {
                kind: NoticeKind::Cooldown,
                message: COOLDOWN_MESSAGE.to_string(),
            }),
            SpinError::NetworkUnavailable(_) => Some(SpinNotice {
                kind: NoticeKind::NetworkUnavailable,
                message: NETWORK_ERROR_MESSAGE.to_string(),
            }),
            SpinError::ServerRejected(message) => Some(SpinNotice {
                kind: NoticeKind::ServerRejected,
                message: if message.is_empty() {
                    GENERIC_SPIN_ERROR.to_string()
                } else {
                    message.clone()
                },
            }),
            SpinError::Aborted
            | SpinError::Busy
            | SpinError::CatalogUnavailable
            | SpinError::InvalidLayout { .. } => None,
        }
    }
}

impl From<TransportError> for SpinError {
    fn from(err: TransportError) -> Self {
        SpinError::NetworkUnavailable(err.0)
    }
}
