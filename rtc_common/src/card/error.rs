//! Error type for card session and list operations.

use thiserror::Error;

/// Error types for card operations.
///
/// Every message already carries the task, card slot, raw code and, where
/// it applies, the decoded error register text, so a caller can diagnose a
/// failure without talking to the card again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtcError {
    /// Device library could not be initialised. Unrecoverable for the process.
    #[error("Initialization failed: {0}")]
    FatalInit(String),

    /// Could not become the exclusive owner of the card
    #[error("Acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// Program or correction upload rejected
    #[error("Configuration load failed: {0}")]
    ConfigLoadFailed(String),

    /// Liveness probe failed or the session handle is stale
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Requested list buffer could not start loading
    #[error("List busy: {0}")]
    ListBusy(String),

    /// Requested list buffer could not start executing
    #[error("List not ready: {0}")]
    ListNotReady(String),

    /// Release of the card could not be confirmed
    #[error("Release failed: {0}")]
    ReleaseFailed(String),
}

impl RtcError {
    /// Returns true for errors about owning or reaching the card.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            RtcError::FatalInit(_)
                | RtcError::AcquisitionFailed(_)
                | RtcError::ConfigLoadFailed(_)
                | RtcError::ConnectionLost(_)
                | RtcError::ReleaseFailed(_)
        )
    }

    /// Returns true for errors raised by the list handshake.
    pub fn is_list_error(&self) -> bool {
        matches!(self, RtcError::ListBusy(_) | RtcError::ListNotReady(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtc_error_display() {
        let err = RtcError::FatalInit("code 2".to_string());
        assert_eq!(err.to_string(), "Initialization failed: code 2");

        let err = RtcError::ListBusy("list 1".to_string());
        assert!(err.to_string().contains("list 1"));
    }

    #[test]
    fn test_rtc_error_families() {
        assert!(RtcError::ConnectionLost(String::new()).is_connection_error());
        assert!(RtcError::ReleaseFailed(String::new()).is_connection_error());
        assert!(!RtcError::ListBusy(String::new()).is_connection_error());
        assert!(RtcError::ListBusy(String::new()).is_list_error());
        assert!(RtcError::ListNotReady(String::new()).is_list_error());
        assert!(!RtcError::AcquisitionFailed(String::new()).is_list_error());
    }
}
