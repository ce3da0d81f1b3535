use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::problem::{bin::Bin, depot::BoundingBox};

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    /// Business-critical change, the adaptation budget shrinks further.
    Emergency,
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Traffic,
    Weather,
}

/// Relative travel-time change for every location inside `area` (or every
/// location when no area is given). Factors compound across versions.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct ConditionUpdate {
    pub kind: ConditionKind,

    #[serde(default)]
    pub area: Option<BoundingBox>,

    pub travel_time_factor: f64,
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ChangeSet {
    pub added_bins: Vec<Bin>,
    pub removed_bin_ids: Vec<String>,
    pub unavailable_vehicle_ids: Vec<String>,
    pub condition_updates: Vec<ConditionUpdate>,
    pub urgency: Urgency,

    /// Waypoints departed at or before this instant are serviced and locked.
    pub as_of: Option<Timestamp>,
}

pub const ADAPT_BUDGET_CAP: SignedDuration = SignedDuration::from_secs(5);
pub const EMERGENCY_BUDGET_CAP: SignedDuration = SignedDuration::from_secs(1);

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added_bins.is_empty()
            && self.removed_bin_ids.is_empty()
            && self.unavailable_vehicle_ids.is_empty()
            && self.condition_updates.is_empty()
    }

    pub fn budget(&self, requested: SignedDuration) -> SignedDuration {
        let cap = match self.urgency {
            Urgency::Normal => ADAPT_BUDGET_CAP,
            Urgency::Emergency => EMERGENCY_BUDGET_CAP,
        };

        requested.min(cap)
    }
}
