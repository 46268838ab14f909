/// Notification budget
///
/// Counts down once per notification. When it reaches zero the poller sleeps
/// through a cooldown and resets it. The counter stays within `[0, budget]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throttle {
    budget: u32,
    remaining: u32,
}

impl Throttle {
    /// Create a full throttle.
    pub fn new(budget: u32) -> Self {
        Self {
            budget,
            remaining: budget,
        }
    }

    /// Notifications left before cooldown.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Configured budget.
    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// True once the budget is used up.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Use one notification. Returns false, leaving the counter at zero, when
    /// nothing was left.
    pub fn consume(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(left) => {
                self.remaining = left;
                true
            }
            None => false,
        }
    }

    /// Refill after a cooldown.
    pub fn reset(&mut self) {
        self.remaining = self.budget;
    }
}
