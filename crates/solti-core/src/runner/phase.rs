use std::fmt;

/// Lifecycle phase a set of hooks is driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Prestart,
    Poststart,
    Update,
    Stop,
    Kill,
}

/// What a phase does when one of its hooks fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failing hook and return its error.
    FailFast,
    /// Log the failure and keep going; every hook is attempted.
    BestEffort,
}

impl Phase {
    // TODO: decide whether poststart and stop should attempt every hook and aggregate errors instead
    // of stopping at the first.
    pub fn policy(&self) -> FailurePolicy {
        match self {
            Phase::Prestart | Phase::Poststart | Phase::Stop => FailurePolicy::FailFast,
            Phase::Update | Phase::Kill => FailurePolicy::BestEffort,
        }
    }

    /// Whether a hook failure in this phase may be handled by rerunning the phase from the top.
    ///
    /// Only prestart qualifies: finished hooks are skipped on the next pass.
    pub fn recoverable(&self) -> bool {
        matches!(self, Phase::Prestart)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prestart => "prestart",
            Phase::Poststart => "poststart",
            Phase::Update => "update",
            Phase::Stop => "stop",
            Phase::Kill => "kill",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_per_phase() {
        assert_eq!(Phase::Prestart.policy(), FailurePolicy::FailFast);
        assert_eq!(Phase::Poststart.policy(), FailurePolicy::FailFast);
        assert_eq!(Phase::Stop.policy(), FailurePolicy::FailFast);
        assert_eq!(Phase::Update.policy(), FailurePolicy::BestEffort);
        assert_eq!(Phase::Kill.policy(), FailurePolicy::BestEffort);
    }

    #[test]
    fn only_prestart_is_recoverable() {
        assert!(Phase::Prestart.recoverable());
        for phase in [Phase::Poststart, Phase::Update, Phase::Stop, Phase::Kill] {
            assert!(!phase.recoverable(), "{phase}");
        }
    }
}
