//! Generation job statuses and the transition graph.
//!
//! Status IDs match the `job_statuses` seed data (1-based SMALLSERIAL).
//! Transitions are monotonic: a job never revisits an earlier non-terminal
//! state, and terminal states admit no further transitions.

use serde::{Deserialize, Serialize};

/// Status of a generation job, mirroring the `job_statuses` lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum JobStatus {
    Queued = 1,
    GeneratingImage = 2,
    ImageReady = 3,
    GeneratingVideo = 4,
    VideoReady = 5,
    Completed = 6,
    Failed = 7,
}

impl JobStatus {
    /// The SMALLINT id stored in the `jobs.status_id` column.
    pub fn id(self) -> i16 {
        self as i16
    }

    /// Reverse lookup from a stored status id.
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Queued),
            2 => Some(Self::GeneratingImage),
            3 => Some(Self::ImageReady),
            4 => Some(Self::GeneratingVideo),
            5 => Some(Self::VideoReady),
            6 => Some(Self::Completed),
            7 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Snake-case name as seeded in `job_statuses.name`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::GeneratingImage => "generating_image",
            Self::ImageReady => "image_ready",
            Self::GeneratingVideo => "generating_video",
            Self::VideoReady => "video_ready",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and Failed are immutable once set.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Valid target statuses reachable from `self`.
    ///
    /// Failed is reachable from every non-terminal state; terminal states
    /// return an empty slice.
    pub fn valid_transitions(self) -> &'static [JobStatus] {
        match self {
            Self::Queued => &[Self::GeneratingImage, Self::Failed],
            Self::GeneratingImage => &[Self::ImageReady, Self::Failed],
            Self::ImageReady => &[Self::GeneratingVideo, Self::Failed],
            Self::GeneratingVideo => &[Self::VideoReady, Self::Failed],
            Self::VideoReady => &[Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => &[],
        }
    }

    /// Check whether a transition from `self` to `to` is valid.
    pub fn can_transition(self, to: JobStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

/// Machine-readable error codes stored on `jobs.error_code`.
pub mod error_codes {
    /// Async wait exceeded the staleness threshold or poll budget.
    pub const TIMEOUT: &str = "TIMEOUT";
    /// External provider reported a failure.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
    /// Object-storage write failed.
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    /// Request-level validation failure.
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    /// A referenced entity is missing.
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// The operation conflicted with concurrent state.
    pub const CONFLICT: &str = "CONFLICT";
    /// Anything else.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Happy path
    // -----------------------------------------------------------------------

    #[test]
    fn full_pipeline_walk_is_valid() {
        let path = [
            JobStatus::Queued,
            JobStatus::GeneratingImage,
            JobStatus::ImageReady,
            JobStatus::GeneratingVideo,
            JobStatus::VideoReady,
            JobStatus::Completed,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition(pair[1]),
                "{} -> {} should be valid",
                pair[0].as_str(),
                pair[1].as_str()
            );
        }
    }

    #[test]
    fn failed_reachable_from_every_non_terminal() {
        for status in [
            JobStatus::Queued,
            JobStatus::GeneratingImage,
            JobStatus::ImageReady,
            JobStatus::GeneratingVideo,
            JobStatus::VideoReady,
        ] {
            assert!(status.can_transition(JobStatus::Failed));
        }
    }

    // -----------------------------------------------------------------------
    // Monotonicity / terminal immutability
    // -----------------------------------------------------------------------

    #[test]
    fn no_backward_transitions() {
        assert!(!JobStatus::ImageReady.can_transition(JobStatus::Queued));
        assert!(!JobStatus::GeneratingVideo.can_transition(JobStatus::GeneratingImage));
        assert!(!JobStatus::VideoReady.can_transition(JobStatus::ImageReady));
    }

    #[test]
    fn no_stage_skipping() {
        assert!(!JobStatus::Queued.can_transition(JobStatus::ImageReady));
        assert!(!JobStatus::GeneratingImage.can_transition(JobStatus::GeneratingVideo));
        assert!(!JobStatus::ImageReady.can_transition(JobStatus::Completed));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        assert!(JobStatus::Completed.valid_transitions().is_empty());
        assert!(JobStatus::Failed.valid_transitions().is_empty());
        assert!(!JobStatus::Failed.can_transition(JobStatus::Queued));
        assert!(!JobStatus::Completed.can_transition(JobStatus::Failed));
    }

    #[test]
    fn terminal_predicate() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::VideoReady.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
    }

    // -----------------------------------------------------------------------
    // Id round-trips
    // -----------------------------------------------------------------------

    #[test]
    fn id_round_trip() {
        for id in 1..=7i16 {
            let status = JobStatus::from_id(id).unwrap();
            assert_eq!(status.id(), id);
        }
    }

    #[test]
    fn unknown_id_is_none() {
        assert_eq!(JobStatus::from_id(0), None);
        assert_eq!(JobStatus::from_id(8), None);
    }
}
