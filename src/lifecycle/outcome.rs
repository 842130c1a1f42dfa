//! Shutdown outcome: what happened to every resource, and overall.

use std::fmt;
use std::time::Duration;

use crate::lifecycle::resource::ResourceId;

/// Result of releasing a single resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseResult {
    /// Released successfully before the deadline.
    Released { elapsed: Duration },
    /// The resource reported a failure before the deadline.
    Failed { reason: String, elapsed: Duration },
    /// Still running when the deadline elapsed. Left running, not observed.
    TimedOut,
}

impl ReleaseResult {
    pub fn is_released(&self) -> bool {
        matches!(self, ReleaseResult::Released { .. })
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ReleaseResult::Released { .. } => "released",
            ReleaseResult::Failed { .. } => "failed",
            ReleaseResult::TimedOut => "timed_out",
        }
    }
}

/// Overall status of a shutdown attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeStatus {
    /// Every resource released within the deadline.
    Clean,
    /// Deadline met, but at least one resource failed.
    PartialFailure,
    /// At least one resource was still outstanding at the deadline.
    TimedOut,
}

impl OutcomeStatus {
    /// Derive the overall status. A timeout dominates any failure.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ReleaseResult>) -> Self {
        let mut status = OutcomeStatus::Clean;
        for result in results {
            match result {
                ReleaseResult::TimedOut => return OutcomeStatus::TimedOut,
                ReleaseResult::Failed { .. } => status = OutcomeStatus::PartialFailure,
                ReleaseResult::Released { .. } => {}
            }
        }
        status
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Clean => "clean",
            OutcomeStatus::PartialFailure => "partial-failure",
            OutcomeStatus::TimedOut => "timed-out",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReport {
    pub id: ResourceId,
    pub result: ReleaseResult,
}

/// Immutable record of one shutdown attempt.
///
/// Entries are kept in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownOutcome {
    reports: Vec<ResourceReport>,
    status: OutcomeStatus,
    deadline: Duration,
    elapsed: Duration,
}

impl ShutdownOutcome {
    pub(crate) fn new(reports: Vec<ResourceReport>, deadline: Duration, elapsed: Duration) -> Self {
        let status = OutcomeStatus::from_results(reports.iter().map(|r| &r.result));
        Self {
            reports,
            status,
            deadline,
            elapsed,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        self.status
    }

    pub fn is_clean(&self) -> bool {
        self.status == OutcomeStatus::Clean
    }

    /// Per-resource results, in registration order.
    pub fn reports(&self) -> &[ResourceReport] {
        &self.reports
    }

    /// Look up the result for a resource by name.
    pub fn get(&self, name: &str) -> Option<&ReleaseResult> {
        self.reports
            .iter()
            .find(|r| r.id.name() == name)
            .map(|r| &r.result)
    }

    /// Entries that did not release cleanly.
    pub fn failures(&self) -> impl Iterator<Item = &ResourceReport> {
        self.reports.iter().filter(|r| !r.result.is_released())
    }

    /// The deadline this shutdown ran under.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Wall time from start of shutdown until the outcome was recorded.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl fmt::Display for ShutdownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let released = self.reports.iter().filter(|r| r.result.is_released()).count();
        write!(
            f,
            "{} ({}/{} released in {:?}",
            self.status,
            released,
            self.reports.len(),
            self.elapsed
        )?;
        for report in self.failures() {
            match &report.result {
                ReleaseResult::Failed { reason, .. } => write!(f, "; {} failed: {}", report.id, reason)?,
                ReleaseResult::TimedOut => write!(f, "; {} timed out", report.id)?,
                ReleaseResult::Released { .. } => {}
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn released() -> ReleaseResult {
        ReleaseResult::Released {
            elapsed: Duration::from_millis(1),
        }
    }

    fn failed(reason: &str) -> ReleaseResult {
        ReleaseResult::Failed {
            reason: reason.to_string(),
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn status_precedence() {
        assert_eq!(OutcomeStatus::from_results(std::iter::empty()), OutcomeStatus::Clean);
        assert_eq!(
            OutcomeStatus::from_results(&[released(), released()]),
            OutcomeStatus::Clean
        );
        assert_eq!(
            OutcomeStatus::from_results(&[released(), failed("boom")]),
            OutcomeStatus::PartialFailure
        );
        assert_eq!(
            OutcomeStatus::from_results(&[failed("boom"), ReleaseResult::TimedOut, released()]),
            OutcomeStatus::TimedOut
        );
    }

    #[test]
    fn display_lists_failures() {
        let outcome = ShutdownOutcome::new(
            vec![
                ResourceReport {
                    id: ResourceId::new(0, "http"),
                    result: released(),
                },
                ResourceReport {
                    id: ResourceId::new(1, "backend"),
                    result: failed("connection reset"),
                },
                ResourceReport {
                    id: ResourceId::new(2, "cache"),
                    result: ReleaseResult::TimedOut,
                },
            ],
            Duration::from_secs(2),
            Duration::from_secs(2),
        );

        let text = outcome.to_string();
        assert!(text.starts_with("timed-out (1/3 released"));
        assert!(text.contains("#1 backend failed: connection reset"));
        assert!(text.contains("#2 cache timed out"));
        assert_eq!(outcome.failures().count(), 2);
        assert_eq!(outcome.get("cache"), Some(&ReleaseResult::TimedOut));
    }
}
