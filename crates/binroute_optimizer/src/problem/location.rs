use geo::{Distance, Haversine};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::define_index_newtype;

define_index_newtype!(LocationIdx, Location);

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Location { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn point(&self) -> geo::Point {
        geo::Point::new(self.lon, self.lat)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance in meters.
    pub fn haversine_distance(&self, to: &Location) -> f64 {
        let haversine = Haversine;

        haversine.distance(self.point(), to.point())
    }
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        location.point()
    }
}
