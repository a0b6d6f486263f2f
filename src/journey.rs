use serde::{Deserialize, Serialize};

/// A single geolocation reading. Immutable once captured; a later successful
/// reading replaces it wholesale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Location {
            latitude,
            longitude,
            accuracy: None,
        }
    }

    /// (lon, lat) pair, the order used everywhere on the wire.
    pub fn lng_lat(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }
}

/// An ordered path with optional walk metadata. Coordinates are (lon, lat)
/// pairs, may be empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub coordinates: Vec<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub coordinates: (f64, f64),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The result of one query+location request. Created wholesale by a
/// successful journey request and replaced wholesale by the next one, never
/// partially mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Journey {
    pub id: String,
    pub title: String,
    pub narrative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fun_fact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_awareness: Option<String>,
    pub images: Vec<String>,
    pub route: Route,
    pub destinations: Vec<Destination>,
}
