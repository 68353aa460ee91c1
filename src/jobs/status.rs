use serde::{Deserialize, Serialize};

use crate::classad::ClassAd;

pub const JOB_STATUS_ATTR: &str = "JobStatus";

/// Scheduler job states, by their `JobStatus` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Idle,
    Running,
    Removed,
    Completed,
    Held,
    TransferringOutput,
    Suspended,
}

impl JobStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(JobStatus::Idle),
            2 => Some(JobStatus::Running),
            3 => Some(JobStatus::Removed),
            4 => Some(JobStatus::Completed),
            5 => Some(JobStatus::Held),
            6 => Some(JobStatus::TransferringOutput),
            7 => Some(JobStatus::Suspended),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            JobStatus::Idle => 1,
            JobStatus::Running => 2,
            JobStatus::Removed => 3,
            JobStatus::Completed => 4,
            JobStatus::Held => 5,
            JobStatus::TransferringOutput => 6,
            JobStatus::Suspended => 7,
        }
    }

    /// Status of a job ad. Missing, undefined, or unrecognized codes read as
    /// `None`.
    pub fn of(ad: &ClassAd) -> Option<Self> {
        ad.integer(JOB_STATUS_ATTR).and_then(Self::from_code)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "idle"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Removed => write!(f, "removed"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Held => write!(f, "held"),
            JobStatus::TransferringOutput => write!(f, "transferring_output"),
            JobStatus::Suspended => write!(f, "suspended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in 1..=7 {
            assert_eq!(JobStatus::from_code(code).map(JobStatus::code), Some(code));
        }
        assert_eq!(JobStatus::from_code(0), None);
        assert_eq!(JobStatus::from_code(8), None);
    }

    #[test]
    fn status_of_ad() {
        assert_eq!(
            JobStatus::of(&ClassAd::new().with("JobStatus", "5")),
            Some(JobStatus::Held)
        );
        assert_eq!(JobStatus::of(&ClassAd::new()), None);
        assert_eq!(
            JobStatus::of(&ClassAd::new().with("JobStatus", "\"2\"")),
            None
        );
    }
}
