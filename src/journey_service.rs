use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::journey::{Destination, Journey, Location, Route};

/// Wire shape of a journey request, shared by the HTTP client and server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JourneyRequest {
    pub query: String,
    pub location: Location,
}

/// One query+location round trip yielding a complete journey. The service
/// does not validate the query (that is the UI boundary's job) and does not
/// inspect the payload's internal consistency; whatever the backend returns
/// propagates as-is.
#[async_trait]
pub trait JourneyService: Send + Sync {
    async fn generate_journey(&self, query: &str, location: &Location) -> Result<Journey>;
}

const MOCK_JOURNEY_DELAY: Duration = Duration::from_secs(2);

// A short walk: four points, ~3.2km at an easy pace.
const ROUTE_DELTAS: [(f64, f64); 4] = [
    (0.0, 0.0),
    (0.0038, 0.0021),
    (0.0074, 0.0052),
    (0.0115, 0.0083),
];
const ROUTE_DURATION_SECS: f64 = 120.0;
const ROUTE_DISTANCE_METERS: f64 = 3200.0;

const DESTINATION_NAMES: [&str; 4] = [
    "Trailhead",
    "Old Quarter Arcade",
    "Riverside Overlook",
    "Lantern Market",
];

const DESTINATION_DESCRIPTIONS: [&str; 4] = [
    "Where your walk begins.",
    "A covered passage of workshops that predates the surrounding streets.",
    "The bend in the river the whole neighborhood is named after.",
    "Stalls light up here an hour before sunset.",
];

const NARRATIVES: [&str; 3] = [
    "Leave the main road behind and let the side streets set the pace. Each turn \
     on this walk was chosen to keep you close to the quiet corners that match \
     what you asked for, ending where the locals actually linger.",
    "This route strings together places that most maps flatten into nothing. \
     Take it slowly; the stretch between the second and third stop rewards an \
     unhurried eye.",
    "A short loop with a long memory. The walk bends past storefronts and \
     doorways that have kept their shape for decades, and finishes somewhere \
     worth sitting down.",
];

const FUN_FACTS: [&str; 3] = [
    "The oldest building on this route is held together without a single nail.",
    "Street numbers here run in the order houses were built, not the order they stand.",
    "The river along this walk has changed its name three times in two centuries.",
];

const CANNED_IMAGE_URL: &str = "https://images.wayfarer.dev/static/journey-preview.jpg";

fn derive_title(query: &str) -> String {
    let capitalize = |word: &str| {
        let mut chars = word.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => first.to_uppercase().chain(chars).collect(),
        }
    };
    let headline = query.split_whitespace().take(3).map(capitalize).join(" ");
    if headline.is_empty() {
        "A Short Wander".to_string()
    } else {
        format!("The {headline} Walk")
    }
}

/// Synthesizes a journey deterministically from the query and location: a
/// fixed four-point route offset from the start by small deltas, one canned
/// image repeated, and narrative text picked by query length. An artificial
/// delay emulates backend latency.
pub struct MockJourneyService {
    delay: Duration,
}

impl MockJourneyService {
    pub fn new() -> Self {
        MockJourneyService {
            delay: MOCK_JOURNEY_DELAY,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        MockJourneyService { delay }
    }

    pub fn synthesize(&self, query: &str, location: &Location) -> Journey {
        let (lng, lat) = location.lng_lat();
        let coordinates: Vec<(f64, f64)> = ROUTE_DELTAS
            .iter()
            .map(|(dlng, dlat)| (lng + dlng, lat + dlat))
            .collect();

        let destinations = coordinates
            .iter()
            .zip(DESTINATION_NAMES.iter().zip(DESTINATION_DESCRIPTIONS))
            .map(|(coordinates, (name, description))| Destination {
                name: name.to_string(),
                coordinates: *coordinates,
                description: Some(description.to_string()),
            })
            .collect();

        let pick = query.chars().count();
        Journey {
            id: Uuid::new_v4().to_string(),
            title: derive_title(query),
            narrative: NARRATIVES[pick % NARRATIVES.len()].to_string(),
            fun_fact: Some(FUN_FACTS[pick % FUN_FACTS.len()].to_string()),
            location_awareness: Some(format!(
                "You are starting out near ({:.4}, {:.4}); the first stop is only a few minutes away.",
                lat, lng
            )),
            images: vec![CANNED_IMAGE_URL.to_string(); 3],
            route: Route {
                coordinates,
                duration: Some(ROUTE_DURATION_SECS),
                distance: Some(ROUTE_DISTANCE_METERS),
            },
            destinations,
        }
    }
}

#[async_trait]
impl JourneyService for MockJourneyService {
    async fn generate_journey(&self, query: &str, location: &Location) -> Result<Journey> {
        tokio::time::sleep(self.delay).await;
        Ok(self.synthesize(query, location))
    }
}

/// Talks to a real backend over HTTP, `POST {base_url}/api/generate-journey`.
pub struct HttpJourneyService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJourneyService {
    pub fn new(base_url: &str) -> Self {
        HttpJourneyService {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl JourneyService for HttpJourneyService {
    async fn generate_journey(&self, query: &str, location: &Location) -> Result<Journey> {
        let request = JourneyRequest {
            query: query.to_string(),
            location: location.clone(),
        };
        let response = self
            .client
            .post(format!("{}/api/generate-journey", self.base_url))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("journey request failed: HTTP {}", response.status());
        }
        Ok(response.json().await?)
    }
}
