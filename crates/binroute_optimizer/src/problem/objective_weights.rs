use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, evaluator::objective::ObjectiveVector};

pub const MIN_WEIGHT_SUM: f64 = 0.5;
pub const MAX_WEIGHT_SUM: f64 = 1.5;

/// Scalarization weights. Missing fields in the input keep their default.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub distance: f64,
    pub time: f64,
    pub fuel: f64,
    pub service_quality: f64,
    pub cost: f64,
    pub driver_satisfaction: f64,
    pub environmental: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectiveWeights {
            distance: 0.2,
            time: 0.15,
            fuel: 0.1,
            service_quality: 0.25,
            cost: 0.15,
            driver_satisfaction: 0.05,
            environmental: 0.1,
        }
    }
}

impl ObjectiveWeights {
    pub fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("distance", self.distance),
            ("time", self.time),
            ("fuel", self.fuel),
            ("service_quality", self.service_quality),
            ("cost", self.cost),
            ("driver_satisfaction", self.driver_satisfaction),
            ("environmental", self.environmental),
        ]
    }

    pub fn sum(&self) -> f64 {
        self.named().iter().map(|(_, weight)| weight).sum()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in self.named() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::WeightOutOfRange { name, value });
            }
        }

        let sum = self.sum();
        if !(MIN_WEIGHT_SUM..=MAX_WEIGHT_SUM).contains(&sum) {
            return Err(ValidationError::WeightSumOutOfRange {
                sum,
                min: MIN_WEIGHT_SUM,
                max: MAX_WEIGHT_SUM,
            });
        }

        Ok(())
    }

    /// Scalar cost of an objective vector.
    pub fn weigh(&self, objectives: &ObjectiveVector) -> f64 {
        self.distance * objectives.distance_km
            + self.time * objectives.time_hours
            + self.fuel * objectives.fuel_liters
            + self.service_quality * objectives.service_quality_penalty
            + self.cost * objectives.cost
            + self.driver_satisfaction * objectives.driver_load
            + self.environmental * objectives.emissions_kg
    }
}

/// Hard-constraint compliance goals, in percent.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ComplianceTargets {
    pub time_window: f64,
    pub capacity: f64,
    pub driver_hours: f64,
}

impl Default for ComplianceTargets {
    fn default() -> Self {
        ComplianceTargets {
            time_window: 95.0,
            capacity: 100.0,
            driver_hours: 100.0,
        }
    }
}
