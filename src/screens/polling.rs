use std::{fmt::Display, time::Duration};

/// Default delay between two status fetches
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Default delay before the user may leave a terminal status
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(7);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    /// client-side only, no status received yet
    Loading,
    Verified,
    Processing,
    RequiresInput,
    Canceled,
    /// client-side only, set on any fetch failure
    Error,
    Other(String),
}

impl VerificationStatus {
    pub fn from_backend(status: &str) -> Self {
        match status {
            "verified" => VerificationStatus::Verified,
            "processing" => VerificationStatus::Processing,
            "requires_input" => VerificationStatus::RequiresInput,
            "canceled" => VerificationStatus::Canceled,
            // local states are never trusted from the wire
            other => VerificationStatus::Other(other.to_string()),
        }
    }

    /// Statuses after which polling stops, `Error` being handled by the poll itself
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Verified
                | VerificationStatus::RequiresInput
                | VerificationStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            VerificationStatus::Loading => "loading",
            VerificationStatus::Verified => "verified",
            VerificationStatus::Processing => "processing",
            VerificationStatus::RequiresInput => "requires_input",
            VerificationStatus::Canceled => "canceled",
            VerificationStatus::Error => "error",
            VerificationStatus::Other(s) => s.as_str(),
        }
    }
}

impl Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollTimings {
    pub interval: Duration,
    pub grace_period: Duration,
}

impl Default for PollTimings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollPhase {
    Polling,
    Settled(VerificationStatus),
    Failed,
}

/// Result of a single status fetch as seen by the poll
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Status(VerificationStatus),
    Failure,
}

/// State machine of the polling loop.
///
/// `Settled` and `Failed` are absorbing: once reached, further outcomes are ignored.
#[derive(Clone, Debug)]
pub struct StatusPoll {
    phase: PollPhase,
    current: VerificationStatus,
    fetches: usize,
}

impl Default for StatusPoll {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusPoll {
    pub fn new() -> Self {
        Self {
            phase: PollPhase::Polling,
            current: VerificationStatus::Loading,
            fetches: 0,
        }
    }

    pub fn observe(&mut self, outcome: FetchOutcome) -> &PollPhase {
        if self.should_stop() {
            return &self.phase;
        }

        self.fetches += 1;

        match outcome {
            FetchOutcome::Failure => {
                self.current = VerificationStatus::Error;
                self.phase = PollPhase::Failed;
            }
            FetchOutcome::Status(status) => {
                if status.is_terminal() {
                    self.phase = PollPhase::Settled(status.clone());
                }
                self.current = status;
            }
        }

        &self.phase
    }

    /// Exit predicate of the polling loop
    pub fn should_stop(&self) -> bool {
        !matches!(self.phase, PollPhase::Polling)
    }

    /// The grace timer only runs for a settled, non-error status
    pub fn starts_grace_timer(&self) -> bool {
        matches!(self.phase, PollPhase::Settled(_))
    }

    pub fn phase(&self) -> &PollPhase {
        &self.phase
    }

    pub fn current(&self) -> &VerificationStatus {
        &self.current
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }
}
