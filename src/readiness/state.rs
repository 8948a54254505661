use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadinessStatus {
    Unknown,
    Probing,
    Ready,
    Failed,
}

impl ReadinessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadinessStatus::Unknown => "UNKNOWN",
            ReadinessStatus::Probing => "PROBING",
            ReadinessStatus::Ready => "READY",
            ReadinessStatus::Failed => "FAILED",
        }
    }

    pub fn is_settled(self) -> bool {
        matches!(self, ReadinessStatus::Ready | ReadinessStatus::Failed)
    }
}

impl fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Timeout,
    NetworkError,
    BadStatus,
}

impl ProbeOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeOutcome::Success => "SUCCESS",
            ProbeOutcome::Timeout => "TIMEOUT",
            ProbeOutcome::NetworkError => "NETWORK_ERROR",
            ProbeOutcome::BadStatus => "BAD_STATUS",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ProbeOutcome::Success)
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("probing cannot start from status {status}")]
    AlreadyStarted { status: ReadinessStatus },
    #[error("probe outcome ignored outside an active probing cycle (status {status})")]
    NotProbing { status: ReadinessStatus },
}

/// Pure readiness state machine: UNKNOWN -> PROBING -> {READY | FAILED},
/// with reset returning to UNKNOWN from any state. The async controller
/// folds probe outcomes into this; nothing here touches the network.
#[derive(Debug)]
pub struct ReadinessMachine {
    status: ReadinessStatus,
    attempts: u32,
    last_outcome: Option<ProbeOutcome>,
    max_attempts: u32,
}

impl ReadinessMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            status: ReadinessStatus::Unknown,
            attempts: 0,
            last_outcome: None,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn status(&self) -> ReadinessStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_outcome(&self) -> Option<ProbeOutcome> {
        self.last_outcome
    }

    /// Begins a probing cycle. Only valid from UNKNOWN.
    pub fn begin(&mut self) -> Result<(), TransitionError> {
        if self.status != ReadinessStatus::Unknown {
            return Err(TransitionError::AlreadyStarted {
                status: self.status,
            });
        }
        self.status = ReadinessStatus::Probing;
        self.attempts = 0;
        self.last_outcome = None;
        Ok(())
    }

    /// Folds one probe outcome into the cycle and returns the new status.
    pub fn fold(&mut self, outcome: ProbeOutcome) -> Result<ReadinessStatus, TransitionError> {
        if self.status != ReadinessStatus::Probing {
            return Err(TransitionError::NotProbing {
                status: self.status,
            });
        }

        self.attempts += 1;
        self.last_outcome = Some(outcome);
        self.status = if outcome.is_success() {
            ReadinessStatus::Ready
        } else if self.attempts < self.max_attempts {
            ReadinessStatus::Probing
        } else {
            ReadinessStatus::Failed
        };
        Ok(self.status)
    }

    /// Returns to UNKNOWN. Valid from any state, including mid-cycle.
    pub fn reset(&mut self) {
        self.status = ReadinessStatus::Unknown;
        self.attempts = 0;
        self.last_outcome = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_settles_ready_on_success() {
        let mut machine = ReadinessMachine::new(3);
        machine.begin().expect("begin from UNKNOWN");
        assert_eq!(machine.status(), ReadinessStatus::Probing);

        assert_eq!(
            machine.fold(ProbeOutcome::NetworkError),
            Ok(ReadinessStatus::Probing)
        );
        assert_eq!(
            machine.fold(ProbeOutcome::Success),
            Ok(ReadinessStatus::Ready)
        );
        assert_eq!(machine.attempts(), 2);
    }

    #[test]
    fn cycle_fails_after_max_attempts() {
        let mut machine = ReadinessMachine::new(3);
        machine.begin().expect("begin from UNKNOWN");

        assert_eq!(
            machine.fold(ProbeOutcome::Timeout),
            Ok(ReadinessStatus::Probing)
        );
        assert_eq!(
            machine.fold(ProbeOutcome::BadStatus),
            Ok(ReadinessStatus::Probing)
        );
        assert_eq!(
            machine.fold(ProbeOutcome::Timeout),
            Ok(ReadinessStatus::Failed)
        );
        assert_eq!(machine.attempts(), 3);
        assert_eq!(machine.last_outcome(), Some(ProbeOutcome::Timeout));
    }

    #[test]
    fn begin_rejected_outside_unknown() {
        let mut machine = ReadinessMachine::new(1);
        machine.begin().expect("begin from UNKNOWN");
        assert_eq!(
            machine.begin(),
            Err(TransitionError::AlreadyStarted {
                status: ReadinessStatus::Probing
            })
        );

        machine.fold(ProbeOutcome::Success).expect("fold to READY");
        assert_eq!(
            machine.begin(),
            Err(TransitionError::AlreadyStarted {
                status: ReadinessStatus::Ready
            })
        );
    }

    #[test]
    fn outcomes_rejected_outside_probing() {
        let mut machine = ReadinessMachine::new(2);
        assert_eq!(
            machine.fold(ProbeOutcome::Success),
            Err(TransitionError::NotProbing {
                status: ReadinessStatus::Unknown
            })
        );
    }

    #[test]
    fn reset_returns_to_unknown_from_any_state() {
        let mut machine = ReadinessMachine::new(2);
        machine.begin().expect("begin from UNKNOWN");
        machine.fold(ProbeOutcome::Success).expect("fold to READY");

        machine.reset();
        assert_eq!(machine.status(), ReadinessStatus::Unknown);
        assert_eq!(machine.attempts(), 0);
        assert_eq!(machine.last_outcome(), None);

        machine.begin().expect("begin after reset");
        assert_eq!(machine.status(), ReadinessStatus::Probing);
    }
}
