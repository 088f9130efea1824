use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::{DomainError, DomainResult};

/// Kind of search a client job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// One decomposition round.
    DdMin,
    /// Rounds chained until the remaining universe passes.
    RddMin,
}

impl JobKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DdMin => "ddmin",
            Self::RddMin => "rddmin",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ddmin" => Ok(Self::DdMin),
            "rddmin" => Ok(Self::RddMin),
            other => Err(DomainError::Precondition(format!(
                "unknown job kind '{other}', expected one of: ddmin, rddmin"
            ))),
        }
    }
}

/// Client-visible lifecycle of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// No job has been set.
    #[default]
    NoJob,
    /// Set but not started.
    JobCreated,
    /// Started, nothing new since the last drain.
    Running,
    /// Subsets arrived that have not been drained.
    Updated,
    Completed,
    Failed,
}

impl JobStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoJob => "NO_JOB",
            Self::JobCreated => "JOB_CREATED",
            Self::Running => "RUNNING",
            Self::Updated => "UPDATED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// COMPLETED or FAILED.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// RUNNING or UPDATED.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Updated)
    }

    /// Statuses reachable in one step.
    pub fn valid_transitions(self) -> &'static [Self] {
        match self {
            Self::NoJob => &[Self::JobCreated],
            Self::JobCreated => &[Self::Running, Self::Failed],
            Self::Running => &[Self::Updated, Self::Completed, Self::Failed],
            Self::Updated => &[Self::Running, Self::Completed, Self::Failed],
            Self::Completed | Self::Failed => &[],
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.valid_transitions().contains(&target)
    }

    /// Move to `target`, staying put when already there.
    pub fn transition_to(&mut self, target: Self) -> DomainResult<()> {
        if *self == target {
            return Ok(());
        }
        if !self.can_transition_to(target) {
            return Err(DomainError::InvalidStateTransition {
                from: self.as_str().to_string(),
                to: target.as_str().to_string(),
            });
        }
        *self = target;
        Ok(())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_kind_from_str() {
        assert_eq!("DDMin".parse::<JobKind>(), Ok(JobKind::DdMin));
        assert_eq!("rddmin".parse::<JobKind>(), Ok(JobKind::RddMin));
        assert!(matches!(
            "srddmin".parse::<JobKind>(),
            Err(DomainError::Precondition(_))
        ));
    }

    #[test]
    fn test_status_never_leaves_terminal_states() {
        let mut status = JobStatus::Completed;
        assert!(status.transition_to(JobStatus::Running).is_err());
        assert!(status.transition_to(JobStatus::Completed).is_ok());

        let mut status = JobStatus::Failed;
        assert!(status.transition_to(JobStatus::Updated).is_err());
    }

    #[test]
    fn test_status_forward_path() {
        let mut status = JobStatus::NoJob;
        for next in [
            JobStatus::JobCreated,
            JobStatus::Running,
            JobStatus::Updated,
            JobStatus::Running,
            JobStatus::Updated,
            JobStatus::Completed,
        ] {
            status.transition_to(next).expect("valid transition");
        }
        assert!(status.is_terminal());
    }

    #[test]
    fn test_created_cannot_complete_without_running() {
        assert!(!JobStatus::JobCreated.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::NoJob.can_transition_to(JobStatus::Running));
    }
}
