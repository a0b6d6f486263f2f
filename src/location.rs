use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;

use crate::journey::Location;

pub const LOCATION_WAIT_LIMIT: Duration = Duration::from_secs(10);
pub const LOCATION_STALENESS_LIMIT: Duration = Duration::from_secs(60);

/// One platform location lookup. Implementations report failures
/// (permission denied, timeout, unsupported platform) as human-readable
/// strings rather than structured codes.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<Location>;
}

/// Wraps any [`LocationProvider`] with a bounded wait and a cached reading:
/// a lookup never takes longer than `wait_limit`, and a reading younger than
/// `staleness_limit` is served in place of a fresh one.
pub struct BoundedLocationProvider<P> {
    inner: P,
    wait_limit: Duration,
    staleness_limit: Duration,
    last_reading: Mutex<Option<(Instant, Location)>>,
}

impl<P: LocationProvider> BoundedLocationProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_limits(inner, LOCATION_WAIT_LIMIT, LOCATION_STALENESS_LIMIT)
    }

    pub fn with_limits(inner: P, wait_limit: Duration, staleness_limit: Duration) -> Self {
        BoundedLocationProvider {
            inner,
            wait_limit,
            staleness_limit,
            last_reading: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<Location> {
        let last_reading = self.last_reading.lock().unwrap();
        match &*last_reading {
            Some((at, location)) if at.elapsed() <= self.staleness_limit => {
                Some(location.clone())
            }
            _ => None,
        }
    }
}

#[async_trait]
impl<P: LocationProvider> LocationProvider for BoundedLocationProvider<P> {
    async fn current_location(&self) -> Result<Location> {
        if let Some(location) = self.cached() {
            return Ok(location);
        }
        match tokio::time::timeout(self.wait_limit, self.inner.current_location()).await {
            Ok(Ok(location)) => {
                let mut last_reading = self.last_reading.lock().unwrap();
                *last_reading = Some((Instant::now(), location.clone()));
                Ok(location)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => bail!(
                "location lookup timed out after {}s",
                self.wait_limit.as_secs()
            ),
        }
    }
}

/// Always yields the same reading. Stands in for a platform lookup in demos
/// and tests.
pub struct FixedLocationProvider {
    location: Location,
}

impl FixedLocationProvider {
    pub fn new(location: Location) -> Self {
        FixedLocationProvider { location }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_location(&self) -> Result<Location> {
        Ok(self.location.clone())
    }
}
