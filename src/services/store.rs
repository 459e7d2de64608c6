use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Listing, PreferenceQuery};

/// Errors that can occur when reading the listing catalog
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Catalog API returned error: {0}")]
    Api(String),

    #[error("Invalid listing data: {0}")]
    InvalidData(String),

    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Store misconfigured: {0}")]
    Config(String),
}

/// Read side of the listing catalog
///
/// The engine reads one snapshot per request and never retries; a failure
/// here aborts the request.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Short backend name for health output
    fn name(&self) -> &'static str;

    /// Read every listing, in a stable order
    async fn fetch_all(&self) -> Result<Vec<Listing>, StoreError>;

    /// Read listings, optionally pushing hard constraints down to the backend
    ///
    /// Implementations may return a superset of the matching listings; the
    /// Filter Stage always runs afterwards. Catalog order must be preserved.
    async fn fetch_candidates(&self, _query: &PreferenceQuery) -> Result<Vec<Listing>, StoreError> {
        self.fetch_all().await
    }

    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Pull the listing array out of a catalog payload
///
/// Accepts a bare array or an object wrapping it under `listings`,
/// `properties` or `rentals`. Documents that fail to parse are skipped.
pub(crate) fn listings_from_payload(payload: Value) -> Result<Vec<Listing>, StoreError> {
    let documents = match payload {
        Value::Array(documents) => documents,
        Value::Object(mut map) => ["listings", "properties", "rentals"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(documents)) => Some(documents),
                _ => None,
            })
            .ok_or_else(|| StoreError::InvalidData("Missing listings array".into()))?,
        _ => return Err(StoreError::InvalidData("Expected a listings array".into())),
    };

    let total = documents.len();
    let listings: Vec<Listing> = documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<Listing>(doc) {
            Ok(listing) => Some(listing),
            Err(e) => {
                tracing::warn!("Skipping malformed listing document: {}", e);
                None
            }
        })
        .collect();

    tracing::debug!("Parsed {} of {} listing documents", listings.len(), total);

    Ok(listings)
}

/// Listing store backed by an in-process snapshot
#[derive(Debug, Clone, Default)]
pub struct InMemoryListingStore {
    listings: Arc<Vec<Listing>>,
}

impl InMemoryListingStore {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: Arc::new(listings),
        }
    }

    /// Load a snapshot from a JSON catalog file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let store = Self::from_json_str(&raw)?;

        tracing::info!(
            "Loaded {} listings from {}",
            store.len(),
            path.as_ref().display()
        );

        Ok(store)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, StoreError> {
        let payload: Value = serde_json::from_str(raw)?;
        Ok(Self::new(listings_from_payload(payload)?))
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_all(&self) -> Result<Vec<Listing>, StoreError> {
        Ok(self.listings.as_ref().clone())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
