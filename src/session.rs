use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use crate::journey::{Journey, Location};
use crate::journey_service::JourneyService;
use crate::location::LocationProvider;
use crate::upload_service::{ImageFile, ImageUploadService};

/// Every outbound service call gets a bounded wait, so a hung backend turns
/// into a stored error instead of a loading flag that never settles.
pub const SERVICE_CALL_DEADLINE: Duration = Duration::from_secs(15);

/// A confirmed upload, kept in insertion order. Removal is positional.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedImage {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub image_url: String,
    pub uploaded_at: String,
}

/// Everything the presentation layer renders from. Each subsystem owns its
/// own error field; they are independent and last-write-wins.
#[derive(Default)]
pub struct SessionState {
    pub location: Option<Location>,
    pub location_loading: bool,
    pub location_error: Option<String>,

    pub journey: Option<Journey>,
    pub journey_loading: bool,
    pub journey_error: Option<String>,
    pub journey_card_visible: bool,

    pub uploads: Vec<UploadedImage>,
    pub upload_in_progress: bool,
    pub upload_error: Option<String>,

    // One sequence counter per asynchronous field. A settle only applies if
    // its number is still the latest issued, so an older response cannot
    // overwrite a newer one.
    location_seq: u64,
    journey_seq: u64,
    upload_seq: u64,
}

/// The single holder of client-visible application state. Explicitly
/// constructed with its three capabilities injected; created once at
/// bootstrap and handed by reference to the presentation layer, fresh per
/// test.
///
/// Failures never escape an operation: each one stores a field-scoped,
/// human-readable error string and the store stays usable afterwards.
pub struct SessionStore {
    location_provider: Arc<dyn LocationProvider>,
    journey_service: Arc<dyn JourneyService>,
    upload_service: Arc<dyn ImageUploadService>,
    state: Mutex<SessionState>,
}

async fn with_deadline<T>(fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(SERVICE_CALL_DEADLINE, fut).await {
        Ok(result) => result,
        Err(_) => bail!(
            "request timed out after {}s",
            SERVICE_CALL_DEADLINE.as_secs()
        ),
    }
}

impl SessionStore {
    pub fn new(
        location_provider: Arc<dyn LocationProvider>,
        journey_service: Arc<dyn JourneyService>,
        upload_service: Arc<dyn ImageUploadService>,
    ) -> Self {
        SessionStore {
            location_provider,
            journey_service,
            upload_service,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        let state = self.state.lock().unwrap();
        f(&state)
    }

    /// One platform location lookup. On failure the previously-known
    /// location is left untouched: a failed refresh should not blank out a
    /// map that already has a usable position.
    pub async fn request_location(&self) {
        let seq = {
            let mut state = self.state.lock().unwrap();
            state.location_seq += 1;
            state.location_loading = true;
            state.location_error = None;
            state.location_seq
        };

        // The provider enforces its own wait bound.
        let result = self.location_provider.current_location().await;

        let mut state = self.state.lock().unwrap();
        if state.location_seq != seq {
            info!("discarding stale location result");
            return;
        }
        state.location_loading = false;
        match result {
            Ok(location) => state.location = Some(location),
            Err(e) => {
                warn!("location lookup failed: {e}");
                state.location_error = Some(e.to_string());
            }
        }
    }

    /// Requires a known location; without one this fast-fails with a stored
    /// error and performs no service call.
    pub async fn generate_journey(&self, query: &str) {
        let (location, seq) = {
            let mut state = self.state.lock().unwrap();
            match state.location.clone() {
                None => {
                    state.journey_error =
                        Some("cannot generate a journey without a location".to_string());
                    return;
                }
                Some(location) => {
                    state.journey_seq += 1;
                    state.journey_loading = true;
                    state.journey_error = None;
                    (location, state.journey_seq)
                }
            }
        };

        let result = with_deadline(self.journey_service.generate_journey(query, &location)).await;

        let mut state = self.state.lock().unwrap();
        if state.journey_seq != seq {
            info!("discarding stale journey result");
            return;
        }
        state.journey_loading = false;
        match result {
            Ok(journey) => {
                state.journey = Some(journey);
                state.journey_card_visible = true;
            }
            Err(e) => {
                warn!("journey generation failed: {e}");
                state.journey_error = Some(e.to_string());
            }
        }
    }

    /// Starting a new upload clears a prior upload error. The file is not
    /// pre-validated here; rejection comes back from the service.
    pub async fn upload_image(&self, file: ImageFile) {
        let seq = {
            let mut state = self.state.lock().unwrap();
            state.upload_seq += 1;
            state.upload_in_progress = true;
            state.upload_error = None;
            state.upload_seq
        };

        let result = with_deadline(self.upload_service.upload_image(&file)).await;

        let mut state = self.state.lock().unwrap();
        if state.upload_seq != seq {
            info!("discarding stale upload result");
            return;
        }
        state.upload_in_progress = false;
        match result {
            Ok(ack) => state.uploads.push(UploadedImage {
                filename: ack.filename,
                content_type: file.content_type,
                size: ack.size,
                image_url: ack.image_url,
                uploaded_at: ack.uploaded_at,
            }),
            Err(e) => {
                warn!("image upload failed: {e}");
                state.upload_error = Some(e.to_string());
            }
        }
    }

    pub fn set_location(&self, location: Option<Location>) {
        let mut state = self.state.lock().unwrap();
        state.location = location;
    }

    /// Clearing the journey also hides the journey card; the card must never
    /// be visible with nothing to show.
    pub fn set_journey(&self, journey: Option<Journey>) {
        let mut state = self.state.lock().unwrap();
        if journey.is_none() {
            state.journey_card_visible = false;
        }
        state.journey = journey;
    }

    pub fn set_journey_card_visible(&self, visible: bool) {
        let mut state = self.state.lock().unwrap();
        if visible && state.journey.is_none() {
            warn!("ignoring request to show the journey card with no journey");
            return;
        }
        state.journey_card_visible = visible;
    }

    /// Positional removal; the relative order of the remaining uploads is
    /// preserved.
    pub fn remove_uploaded_image(&self, index: usize) -> Option<UploadedImage> {
        let mut state = self.state.lock().unwrap();
        if index >= state.uploads.len() {
            warn!("ignoring removal of upload {index}, only {} held", state.uploads.len());
            return None;
        }
        Some(state.uploads.remove(index))
    }

    pub fn dismiss_location_error(&self) {
        self.state.lock().unwrap().location_error = None;
    }

    pub fn dismiss_journey_error(&self) {
        self.state.lock().unwrap().journey_error = None;
    }

    pub fn dismiss_upload_error(&self) {
        self.state.lock().unwrap().upload_error = None;
    }
}
