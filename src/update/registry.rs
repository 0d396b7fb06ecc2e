//! Version registry client (§4.9): a bare `HTTP GET` returning `{"version": "..."}`,
//! compared via `semver`. Concurrent callers are serialized behind a short
//! cache so a burst of checks costs one request.

use crate::error::{Result, UpdateError};
use semver::Version;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, serde::Deserialize)]
struct VersionResponse {
    version: String,
}

struct CachedCheck {
    fetched_at: std::time::Instant,
    version: Version,
}

pub struct VersionRegistry {
    client: reqwest::Client,
    url: String,
    cache: Mutex<Option<CachedCheck>>,
    cache_ttl: std::time::Duration,
    in_flight: Arc<Mutex<()>>,
}

impl VersionRegistry {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            cache: Mutex::new(None),
            cache_ttl: std::time::Duration::from_secs(30),
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Fetch the latest published version, serving the cached result to any
    /// caller that lands while a fetch is already underway or fresh.
    pub async fn latest_version(&self) -> Result<Version> {
        let _permit = self.in_flight.lock().await;

        if let Some(cached) = self.cache.lock().await.as_ref() {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                return Ok(cached.version.clone());
            }
        }

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| UpdateError::RegistryCheck(e.to_string()))?
            .error_for_status()
            .map_err(|e| UpdateError::RegistryCheck(e.to_string()))?
            .json::<VersionResponse>()
            .await
            .map_err(|e| UpdateError::RegistryCheck(e.to_string()))?;

        let version = Version::parse(response.version.trim_start_matches('v')).map_err(UpdateError::InvalidVersion)?;

        *self.cache.lock().await = Some(CachedCheck {
            fetched_at: std::time::Instant::now(),
            version: version.clone(),
        });

        Ok(version)
    }

    pub async fn is_update_available(&self, current: &Version) -> Result<Option<Version>> {
        let latest = self.latest_version().await?;
        Ok(if &latest > current { Some(latest) } else { None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_numerically_not_lexicographically() {
        assert!(Version::parse("1.9.0").unwrap() < Version::parse("1.10.0").unwrap());
    }
}
