use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::problem::location::Location;

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn is_valid(&self) -> bool {
        Location::from_lat_lon(self.min_lat, self.min_lon).is_valid()
            && Location::from_lat_lon(self.max_lat, self.max_lon).is_valid()
            && self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
    }

    /// Boundary points are inside.
    pub fn contains(&self, location: &Location) -> bool {
        (self.min_lat..=self.max_lat).contains(&location.lat())
            && (self.min_lon..=self.max_lon).contains(&location.lon())
    }
}

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Depot {
    pub id: String,
    pub location: Location,

    #[serde(default)]
    pub service_area: Option<BoundingBox>,
}

/// A bin is inside the served geography when it lies in the organization
/// area (if any) and in at least one depot area. A depot without bounds
/// accepts any bin.
pub fn is_in_service_area(
    location: &Location,
    organization_area: Option<&BoundingBox>,
    depots: &[Depot],
) -> bool {
    if organization_area.is_some_and(|area| !area.contains(location)) {
        return false;
    }

    depots.is_empty()
        || depots.iter().any(|depot| match &depot.service_area {
            Some(area) => area.contains(location),
            None => true,
        })
}
