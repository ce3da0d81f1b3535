use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_priority() -> f64 {
    1.0
}

/// Service window of a bin.
///
/// Service never starts before `start` (the vehicle waits). Arrivals after
/// `end` are tolerated up to `end + flexibility` at a service-quality cost,
/// anything later is a violation.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,

    /// Weight of lateness inside the flexibility slack.
    #[serde(default = "default_priority")]
    pub priority: f64,

    #[serde(default)]
    pub flexibility: SignedDuration,
}

impl TimeWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        TimeWindow {
            start,
            end,
            priority: default_priority(),
            flexibility: SignedDuration::ZERO,
        }
    }

    pub fn with_flexibility(mut self, flexibility: SignedDuration) -> Self {
        self.flexibility = flexibility;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.start < self.end
            && !self.flexibility.is_negative()
            && self.priority.is_finite()
            && self.priority >= 0.0
    }

    pub fn latest_arrival(&self) -> Timestamp {
        self.end + self.flexibility
    }

    pub fn is_satisfied(&self, arrival: Timestamp) -> bool {
        arrival <= self.latest_arrival()
    }

    /// Served inside the nominal window, without using the flexibility slack.
    pub fn is_met(&self, service_start: Timestamp) -> bool {
        service_start <= self.end
    }

    pub fn service_start(&self, arrival: Timestamp) -> Timestamp {
        arrival.max(self.start)
    }

    pub fn lateness(&self, service_start: Timestamp) -> SignedDuration {
        service_start
            .duration_since(self.end)
            .max(SignedDuration::ZERO)
    }
}
