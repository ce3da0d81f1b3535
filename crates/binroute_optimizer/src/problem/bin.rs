use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    define_index_newtype,
    problem::{location::Location, time_window::TimeWindow},
};

define_index_newtype!(BinIdx, Bin);

pub const MAX_PRIORITY: f64 = 10.0;

/// Projected fill level above which a bin earns a priority bonus.
const FILL_BONUS_THRESHOLD: f64 = 0.75;
const MAX_FILL_BONUS: f64 = 3.0;
const OVERDUE_BONUS_FACTOR: f64 = 2.0;

fn default_service_duration() -> SignedDuration {
    SignedDuration::from_mins(3)
}

fn default_base_priority() -> f64 {
    1.0
}

/// A collection point.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Bin {
    pub id: String,
    pub location: Location,

    /// Volume collected at this bin, in the same unit as vehicle capacity.
    pub demand: f64,

    /// Estimated weight, checked against the vehicle weight capacity.
    #[serde(default)]
    pub weight: f64,

    /// Current fill level between 0 and 1.
    #[serde(default)]
    pub fill_level: f64,

    /// Expected fill increase per day.
    #[serde(default)]
    pub predicted_fill_rate: f64,

    #[serde(default)]
    pub time_window: Option<TimeWindow>,

    #[serde(default)]
    pub access_difficulty: f64,

    #[serde(default = "default_service_duration")]
    pub service_duration: SignedDuration,

    #[serde(default = "default_base_priority")]
    pub base_priority: f64,

    #[serde(default)]
    pub days_since_service: f64,

    #[serde(default)]
    pub service_frequency_days: Option<f64>,

    /// Capability tags a vehicle must carry to service this bin.
    #[serde(default)]
    pub required_capabilities: Vec<String>,
}

impl Default for Bin {
    fn default() -> Self {
        Bin {
            id: String::new(),
            location: Location::default(),
            demand: 0.0,
            weight: 0.0,
            fill_level: 0.0,
            predicted_fill_rate: 0.0,
            time_window: None,
            access_difficulty: 0.0,
            service_duration: default_service_duration(),
            base_priority: default_base_priority(),
            days_since_service: 0.0,
            service_frequency_days: None,
            required_capabilities: Vec::new(),
        }
    }
}

impl Bin {
    pub fn projected_fill(&self) -> f64 {
        (self.fill_level + self.predicted_fill_rate).clamp(0.0, 1.0)
    }

    fn fill_bonus(&self) -> f64 {
        let projected = self.projected_fill();
        if projected <= FILL_BONUS_THRESHOLD {
            return 0.0;
        }

        MAX_FILL_BONUS * (projected - FILL_BONUS_THRESHOLD) / (1.0 - FILL_BONUS_THRESHOLD)
    }

    fn overdue_bonus(&self) -> f64 {
        match self.service_frequency_days {
            Some(frequency) if frequency > 0.0 => {
                OVERDUE_BONUS_FACTOR * (self.days_since_service - frequency).max(0.0) / frequency
            }
            _ => 0.0,
        }
    }

    /// Collection priority, from 0 up to [`MAX_PRIORITY`].
    pub fn priority(&self) -> f64 {
        (self.base_priority + self.fill_bonus() + self.overdue_bonus()).clamp(0.0, MAX_PRIORITY)
    }

    pub fn is_servicable_by(&self, capabilities: &[String]) -> bool {
        self.required_capabilities
            .iter()
            .all(|required| capabilities.contains(required))
    }
}
