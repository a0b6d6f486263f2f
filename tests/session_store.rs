use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use assert_float_eq::*;
use async_trait::async_trait;

use wayfarer_core::journey::{Journey, Location};
use wayfarer_core::journey_service::{JourneyService, MockJourneyService};
use wayfarer_core::location::{FixedLocationProvider, LocationProvider};
use wayfarer_core::session::SessionStore;
use wayfarer_core::upload_service::{ImageFile, MockUploadService};

/// Counts calls so tests can verify that fast-fail paths never reach the
/// service.
struct RecordingJourneyService {
    calls: AtomicU32,
    inner: MockJourneyService,
}

impl RecordingJourneyService {
    fn new() -> Self {
        RecordingJourneyService {
            calls: AtomicU32::new(0),
            inner: MockJourneyService::with_delay(Duration::ZERO),
        }
    }
}

#[async_trait]
impl JourneyService for RecordingJourneyService {
    async fn generate_journey(&self, query: &str, location: &Location) -> Result<Journey> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate_journey(query, location).await
    }
}

struct FailingJourneyService;

#[async_trait]
impl JourneyService for FailingJourneyService {
    async fn generate_journey(&self, _query: &str, _location: &Location) -> Result<Journey> {
        anyhow::bail!("backend unreachable")
    }
}

/// Echoes the query as the journey title, settling slowly for queries that
/// start with "slow".
struct QueryEchoService;

#[async_trait]
impl JourneyService for QueryEchoService {
    async fn generate_journey(&self, query: &str, location: &Location) -> Result<Journey> {
        let delay = if query.starts_with("slow") {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(5)
        };
        tokio::time::sleep(delay).await;
        let mut journey = MockJourneyService::with_delay(Duration::ZERO).synthesize(query, location);
        journey.title = query.to_string();
        Ok(journey)
    }
}

struct FlakyLocationProvider {
    lookups: AtomicU32,
}

#[async_trait]
impl LocationProvider for FlakyLocationProvider {
    async fn current_location(&self) -> Result<Location> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Location::new(40.0, -74.0))
        } else {
            anyhow::bail!("permission denied")
        }
    }
}

fn store_with(journey_service: Arc<dyn JourneyService>) -> SessionStore {
    SessionStore::new(
        Arc::new(FixedLocationProvider::new(Location {
            latitude: 40.0,
            longitude: -74.0,
            accuracy: Some(15.0),
        })),
        journey_service,
        Arc::new(MockUploadService::with_delay(Duration::ZERO)),
    )
}

fn png_file(name: &str, size: usize) -> ImageFile {
    ImageFile {
        filename: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0; size],
    }
}

#[tokio::test]
async fn generate_journey_without_location_fast_fails() {
    let journey_service = Arc::new(RecordingJourneyService::new());
    let store = store_with(journey_service.clone());

    store.generate_journey("waterfalls").await;

    store.with_state(|state| {
        assert!(state.journey.is_none());
        assert!(!state.journey_loading);
        assert!(state.journey_error.is_some());
    });
    assert_eq!(journey_service.calls.load(Ordering::SeqCst), 0);

    // once a location is known the same action goes through and the error
    // from the failed attempt is cleared
    store.set_location(Some(Location::new(40.0, -74.0)));
    store.generate_journey("waterfalls").await;
    store.with_state(|state| {
        assert!(state.journey.is_some());
        assert!(state.journey_error.is_none());
    });
    assert_eq!(journey_service.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn location_then_journey_end_to_end() {
    let store = store_with(Arc::new(MockJourneyService::with_delay(Duration::ZERO)));

    store.request_location().await;
    store.with_state(|state| {
        let location = state.location.as_ref().unwrap();
        assert_f64_near!(location.latitude, 40.0);
        assert_f64_near!(location.longitude, -74.0);
        assert_eq!(location.accuracy, Some(15.0));
        assert!(!state.location_loading);
        assert!(state.location_error.is_none());
    });

    store.generate_journey("waterfalls").await;
    store.with_state(|state| {
        let journey = state.journey.as_ref().unwrap();
        assert_eq!(journey.destinations.len(), 4);
        assert_eq!(journey.route.duration, Some(120.0));
        assert_eq!(journey.route.distance, Some(3200.0));
        let (lng, lat) = journey.destinations[0].coordinates;
        assert_f64_near!(lng, -74.0);
        assert_f64_near!(lat, 40.0);
        assert_eq!(journey.route.coordinates[0], journey.destinations[0].coordinates);
        assert!(state.journey_card_visible);
        assert!(!state.journey_loading);
        assert!(state.journey_error.is_none());
    });
}

#[tokio::test]
async fn journey_failure_is_stored_not_thrown() {
    let store = store_with(Arc::new(FailingJourneyService));

    store.request_location().await;
    store.generate_journey("waterfalls").await;

    store.with_state(|state| {
        assert!(state.journey.is_none());
        assert!(!state.journey_card_visible);
        assert!(!state.journey_loading);
        assert!(state
            .journey_error
            .as_ref()
            .unwrap()
            .contains("backend unreachable"));
        // other subsystems are untouched
        assert!(state.upload_error.is_none());
        assert!(state.location.is_some());
    });

    store.dismiss_journey_error();
    store.with_state(|state| assert!(state.journey_error.is_none()));
}

#[tokio::test]
async fn failed_location_refresh_keeps_last_known_good() {
    let store = SessionStore::new(
        Arc::new(FlakyLocationProvider {
            lookups: AtomicU32::new(0),
        }),
        Arc::new(MockJourneyService::with_delay(Duration::ZERO)),
        Arc::new(MockUploadService::with_delay(Duration::ZERO)),
    );

    store.request_location().await;
    store.with_state(|state| assert!(state.location.is_some()));

    store.request_location().await;
    store.with_state(|state| {
        assert!(state.location_error.as_ref().unwrap().contains("permission denied"));
        // the stale-but-valid reading survives the failed refresh
        let location = state.location.as_ref().unwrap();
        assert_f64_near!(location.latitude, 40.0);
        assert!(!state.location_loading);
    });
}

#[tokio::test]
async fn uploads_append_in_order_and_remove_positionally() {
    let store = store_with(Arc::new(MockJourneyService::with_delay(Duration::ZERO)));

    store.upload_image(png_file("a.png", 100)).await;
    store.upload_image(png_file("b.png", 200)).await;
    store.upload_image(png_file("c.png", 300)).await;

    store.with_state(|state| {
        let names: Vec<&str> = state.uploads.iter().map(|u| u.filename.as_str()).collect();
        assert_eq!(names, ["a.png", "b.png", "c.png"]);
    });

    let removed = store.remove_uploaded_image(1).unwrap();
    assert_eq!(removed.filename, "b.png");
    store.with_state(|state| {
        let names: Vec<&str> = state.uploads.iter().map(|u| u.filename.as_str()).collect();
        assert_eq!(names, ["a.png", "c.png"]);
    });

    assert!(store.remove_uploaded_image(7).is_none());
}

#[tokio::test]
async fn disallowed_upload_never_reaches_the_list() {
    let store = store_with(Arc::new(MockJourneyService::with_delay(Duration::ZERO)));

    store
        .upload_image(ImageFile {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: vec![0; 10],
        })
        .await;

    store.with_state(|state| {
        assert!(state.uploads.is_empty());
        assert!(!state.upload_in_progress);
        assert!(state
            .upload_error
            .as_ref()
            .unwrap()
            .contains("unsupported image type"));
    });
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let store = store_with(Arc::new(MockJourneyService::with_delay(Duration::ZERO)));

    store
        .upload_image(png_file("huge.png", 10 * 1024 * 1024 + 1))
        .await;

    store.with_state(|state| {
        assert!(state.uploads.is_empty());
        assert!(state.upload_error.as_ref().unwrap().contains("too large"));
    });
}

#[tokio::test]
async fn a_new_upload_clears_the_prior_error() {
    let store = store_with(Arc::new(MockJourneyService::with_delay(Duration::ZERO)));

    store
        .upload_image(ImageFile {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: vec![0; 10],
        })
        .await;
    store.with_state(|state| assert!(state.upload_error.is_some()));

    store.upload_image(png_file("ok.png", 100)).await;
    store.with_state(|state| {
        assert!(state.upload_error.is_none());
        assert_eq!(state.uploads.len(), 1);
    });
}

#[tokio::test]
async fn clearing_the_journey_hides_the_card() {
    let store = store_with(Arc::new(MockJourneyService::with_delay(Duration::ZERO)));

    store.request_location().await;
    store.generate_journey("waterfalls").await;
    store.with_state(|state| assert!(state.journey_card_visible));

    store.set_journey(None);
    store.with_state(|state| {
        assert!(state.journey.is_none());
        assert!(!state.journey_card_visible);
    });

    // the card cannot be shown again until a journey exists
    store.set_journey_card_visible(true);
    store.with_state(|state| assert!(!state.journey_card_visible));
}

#[tokio::test]
async fn stale_journey_response_is_discarded() {
    let store = Arc::new(store_with(Arc::new(QueryEchoService)));
    store.request_location().await;

    let slow_store = store.clone();
    let slow = tokio::spawn(async move { slow_store.generate_journey("slow scenic loop").await });

    // let the slow request get issued first
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.generate_journey("fast market tour").await;
    store.with_state(|state| {
        assert_eq!(state.journey.as_ref().unwrap().title, "fast market tour");
    });

    // the slow response settles afterwards and must not win
    slow.await.unwrap();
    store.with_state(|state| {
        assert_eq!(state.journey.as_ref().unwrap().title, "fast market tour");
        assert!(!state.journey_loading);
        assert!(state.journey_error.is_none());
    });
}
