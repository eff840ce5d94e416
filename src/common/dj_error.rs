//! Error kinds surfaced by the player, the track store and the session manager.
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum DjError {
    /// track, playlist or tag lookup miss
    NotFound(String),
    /// malformed identifier or unparseable command
    InvalidInput(String),
    /// decode or encode failure
    SourceUnavailable(String),
    /// playback already active
    Busy,
    /// no track loaded
    NoSelection,
    /// random selection spent its attempt budget
    Exhausted,
    /// unexpected fault, logged only
    Internal(String),
}

impl DjError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DjError::NotFound(_))
    }
}

impl fmt::Display for DjError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DjError::NotFound(what) => write!(f, "{} not found", what),
            DjError::InvalidInput(why) => write!(f, "invalid input: {}", why),
            DjError::SourceUnavailable(why) => write!(f, "audio source unavailable: {}", why),
            DjError::Busy => write!(f, "playback already active"),
            DjError::NoSelection => write!(f, "no track loaded"),
            DjError::Exhausted => write!(f, "selection attempts exhausted"),
            DjError::Internal(why) => write!(f, "internal error: {}", why),
        }
    }
}

impl Error for DjError {}

#[cfg(test)]
mod test_dj_error {
    use super::*;
    use crate::common::box_error::BoxError;

    #[test]
    fn display() {
        assert_eq!(DjError::NotFound("track 4".to_string()).to_string(), "track 4 not found");
        assert_eq!(DjError::Busy.to_string(), "playback already active");
    }

    #[test]
    fn boxes_for_threads() {
        // A DjError should be able to travel as a BoxError
        let boxed: BoxError = Box::new(DjError::NoSelection);
        assert_eq!(boxed.to_string(), "no track loaded");
        assert!(DjError::NotFound("x".to_string()).is_not_found());
        assert!(!DjError::Exhausted.is_not_found());
    }
}
