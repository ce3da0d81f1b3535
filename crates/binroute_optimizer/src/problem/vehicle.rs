use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{define_index_newtype, problem::location::Location};

define_index_newtype!(VehicleIdx, Vehicle);

fn default_fuel_efficiency() -> f64 {
    3.0
}

fn default_average_speed() -> f64 {
    30.0
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct WorkingHours {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl WorkingHours {
    pub fn duration(&self) -> SignedDuration {
        self.end.duration_since(self.start)
    }
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: String,

    /// Volumetric capacity.
    pub capacity: f64,

    #[serde(default)]
    pub weight_capacity: Option<f64>,

    /// Kilometers per liter.
    #[serde(default = "default_fuel_efficiency")]
    pub fuel_efficiency: f64,

    #[serde(default = "default_average_speed")]
    pub average_speed_kmh: f64,

    #[serde(default)]
    pub cost_per_hour: f64,

    #[serde(default)]
    pub cost_per_km: f64,

    /// Home depot the route starts from and returns to.
    pub home: Location,

    pub working_hours: WorkingHours,

    /// Driver-hours limit, stricter than the working-hours window.
    #[serde(default)]
    pub max_working_duration: Option<SignedDuration>,

    #[serde(default)]
    pub driver_id: Option<String>,

    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl Vehicle {
    pub fn shift_start(&self) -> Timestamp {
        self.working_hours.start
    }

    pub fn weight_capacity(&self) -> f64 {
        self.weight_capacity.unwrap_or(f64::INFINITY)
    }

    /// Longest allowed route duration.
    pub fn max_duration(&self) -> SignedDuration {
        let shift = self.working_hours.duration();
        match self.max_working_duration {
            Some(max) => max.min(shift),
            None => shift,
        }
    }
}
