use jiff::{SignedDuration, Timestamp};

/// Wall-clock budget shared by the phases of one run.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Timestamp,
    budget: SignedDuration,
}

impl Deadline {
    pub fn new(budget: SignedDuration) -> Self {
        Deadline {
            start: Timestamp::now(),
            budget: budget.max(SignedDuration::ZERO),
        }
    }

    pub fn budget(&self) -> SignedDuration {
        self.budget
    }

    pub fn elapsed(&self) -> SignedDuration {
        Timestamp::now().duration_since(self.start)
    }

    pub fn remaining(&self) -> SignedDuration {
        (self.budget - self.elapsed()).max(SignedDuration::ZERO)
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.budget
    }

    /// Sub-deadline starting now, never outliving this one.
    pub fn child(&self, budget: SignedDuration) -> Deadline {
        Deadline::new(budget.min(self.remaining()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_expired() {
        let deadline = Deadline::new(SignedDuration::ZERO);
        assert!(deadline.is_expired());
        assert_eq!(deadline.remaining(), SignedDuration::ZERO);

        let negative = Deadline::new(SignedDuration::from_secs(-3));
        assert_eq!(negative.budget(), SignedDuration::ZERO);
    }

    #[test]
    fn test_child_is_capped() {
        let deadline = Deadline::new(SignedDuration::from_secs(60));
        let child = deadline.child(SignedDuration::from_secs(600));

        assert!(!child.is_expired());
        assert!(child.budget() <= SignedDuration::from_secs(60));
    }
}
