use std::time::Duration;

use tokio::time::Instant;

/// Per-move countdown, armed when a search starts and polled from the
/// actor's tick loop.
///
/// Two stages: the move-time budget, then a grace window after `stop` has
/// been sent. Each stage fires at most once; re-arming is only possible
/// after an explicit disarm, so a fired timer can never fire again without
/// the session passing through `Ready` first.
pub(crate) struct MoveTimer {
    budget: Duration,
    grace: Duration,
    phase: TimerPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerPhase {
    Disarmed,
    Armed { deadline: Instant },
    Grace { deadline: Instant },
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerFired {
    /// The move-time budget ran out.
    BudgetExpired,
    /// The grace window after `stop` ran out too.
    GraceExpired,
}

impl MoveTimer {
    pub fn new(budget_ms: u64, grace_ms: u64) -> Self {
        Self {
            budget: Duration::from_millis(budget_ms),
            grace: Duration::from_millis(grace_ms),
            phase: TimerPhase::Disarmed,
        }
    }

    /// Start the countdown. Ignored unless the timer is disarmed.
    pub fn arm(&mut self, now: Instant) {
        if self.phase != TimerPhase::Disarmed {
            tracing::warn!("Refusing to re-arm a running move timer");
            return;
        }
        self.phase = TimerPhase::Armed {
            deadline: now + self.budget,
        };
    }

    pub fn disarm(&mut self) {
        self.phase = TimerPhase::Disarmed;
    }

    /// Whether the actor needs to keep polling this timer.
    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            TimerPhase::Armed { .. } | TimerPhase::Grace { .. }
        )
    }

    /// Advance the timer. Returns a fired stage at most once per stage.
    pub fn poll(&mut self, now: Instant) -> Option<TimerFired> {
        match self.phase {
            TimerPhase::Armed { deadline } if now >= deadline => {
                self.phase = TimerPhase::Grace {
                    deadline: now + self.grace,
                };
                Some(TimerFired::BudgetExpired)
            }
            TimerPhase::Grace { deadline } if now >= deadline => {
                self.phase = TimerPhase::Expired;
                Some(TimerFired::GraceExpired)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test]
    async fn test_budget_fires_exactly_once() {
        let start = Instant::now();
        let mut timer = MoveTimer::new(100, 50);
        timer.arm(start);

        assert_eq!(timer.poll(start + ms(99)), None);
        assert_eq!(timer.poll(start + ms(100)), Some(TimerFired::BudgetExpired));
        // Still inside the grace window: nothing more fires
        assert_eq!(timer.poll(start + ms(101)), None);
    }

    #[tokio::test]
    async fn test_grace_fires_exactly_once() {
        let start = Instant::now();
        let mut timer = MoveTimer::new(100, 50);
        timer.arm(start);

        assert_eq!(timer.poll(start + ms(100)), Some(TimerFired::BudgetExpired));
        assert_eq!(timer.poll(start + ms(150)), Some(TimerFired::GraceExpired));
        assert_eq!(timer.poll(start + ms(1000)), None);
        assert!(!timer.is_running());
    }

    #[tokio::test]
    async fn test_no_rearm_after_expiry() {
        let start = Instant::now();
        let mut timer = MoveTimer::new(100, 50);
        timer.arm(start);
        timer.poll(start + ms(100));
        timer.poll(start + ms(150));

        // Expired without an intervening disarm: arm is refused
        timer.arm(start + ms(200));
        assert_eq!(timer.poll(start + ms(1000)), None);
    }

    #[tokio::test]
    async fn test_disarm_clears() {
        let start = Instant::now();
        let mut timer = MoveTimer::new(100, 50);
        timer.arm(start);
        timer.disarm();

        assert!(!timer.is_running());
        assert_eq!(timer.poll(start + ms(1000)), None);

        // Disarmed timers can be armed again
        timer.arm(start + ms(1000));
        assert!(timer.is_running());
    }
}
