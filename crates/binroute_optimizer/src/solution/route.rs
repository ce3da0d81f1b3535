use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

use crate::{
    evaluator::{objective::RouteMetrics, schedule::Visit},
    problem::vehicle::VehicleIdx,
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteStop {
    pub bin_id: String,
    #[serde(flatten)]
    pub visit: Visit,
}

/// Published, immutable route. Shared by `Arc` between solution versions.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Route {
    pub vehicle_id: String,
    #[serde(skip)]
    pub vehicle: VehicleIdx,
    pub stops: Vec<RouteStop>,
    pub start: Timestamp,
    pub end: Timestamp,
    pub distance_km: f64,
    pub duration: SignedDuration,
    pub fuel_liters: f64,
    pub cost: f64,
    pub emissions_kg: f64,

    /// Share of stops served inside their nominal window.
    pub service_quality: f64,
    pub capacity_utilization: f64,
    pub slack_score: f64,

    /// Number of leading stops already serviced.
    pub locked: usize,
    pub metrics: RouteMetrics,
}

impl Route {
    pub fn bin_ids(&self) -> impl Iterator<Item = &str> {
        self.stops.iter().map(|stop| stop.bin_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}
