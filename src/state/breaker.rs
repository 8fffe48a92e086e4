use crate::crawler::FetchStatus;

/// Outcome counts for one joined batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub successes: u32,
    /// Transient and fatal-host failures
    pub failures: u32,
    /// Permanent failures and robots skips
    pub ignored: u32,
}

impl BatchTally {
    pub fn record(&mut self, status: Option<FetchStatus>) {
        match status {
            Some(FetchStatus::Success) => self.successes += 1,
            Some(FetchStatus::TransientFail) | Some(FetchStatus::FatalHostFail) => {
                self.failures += 1
            }
            Some(FetchStatus::PermanentFail) | None => self.ignored += 1,
        }
    }
}

/// Consecutive-failure counter for one seed
///
/// A batch with any success resets the counter. A batch without success adds
/// its transient and fatal-host failures. Permanent failures (404/403) and
/// robots skips are expected while exploring and never count.
#[derive(Debug, Clone)]
pub struct FailureBreaker {
    threshold: u32,
    consecutive: u32,
}

impl FailureBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive: 0,
        }
    }

    /// Folds a joined batch into the counter
    pub fn observe(&mut self, tally: &BatchTally) {
        if tally.successes > 0 {
            self.consecutive = 0;
        } else {
            self.consecutive = self.consecutive.saturating_add(tally.failures);
        }
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn is_tripped(&self) -> bool {
        self.consecutive >= self.threshold
    }
}
