// Service exports
pub mod cache;
pub mod catalog_api;
pub mod postgres;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use catalog_api::CatalogApiStore;
pub use postgres::PgListingStore;
pub use store::{InMemoryListingStore, ListingStore, StoreError};

use std::sync::Arc;
use std::time::Duration;

use crate::config::{StoreBackend, StoreSettings};

const DEFAULT_SEED_PATH: &str = "data/listings.json";

/// Build the configured listing store
pub async fn connect_store(settings: &StoreSettings) -> Result<Arc<dyn ListingStore>, StoreError> {
    match settings.backend {
        StoreBackend::Memory => {
            let path = settings.seed_path.as_deref().unwrap_or(DEFAULT_SEED_PATH);
            let store = InMemoryListingStore::from_json_file(path)?;
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres => {
            let url = settings
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Config("store.database_url is not set".into()))?;

            let store = PgListingStore::from_settings(
                url,
                settings.max_connections,
                settings.min_connections,
                settings.acquire_timeout_secs,
                settings.idle_timeout_secs,
            )
            .await?;
            Ok(Arc::new(store))
        }
        StoreBackend::CatalogApi => {
            let url = settings
                .catalog_url
                .clone()
                .ok_or_else(|| StoreError::Config("store.catalog_url is not set".into()))?;

            let store = CatalogApiStore::new(
                url,
                settings.catalog_api_key.clone(),
                Duration::from_secs(settings.request_timeout_secs.unwrap_or(10)),
            )?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_database_url_is_config_error() {
        let settings = StoreSettings {
            backend: StoreBackend::Postgres,
            ..Default::default()
        };

        let err = connect_store(&settings).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_seed_file_is_io_error() {
        let settings = StoreSettings {
            seed_path: Some("does/not/exist.json".to_string()),
            ..Default::default()
        };

        let err = connect_store(&settings).await.err().unwrap();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[tokio::test]
    async fn test_catalog_api_store_selected() {
        let settings = StoreSettings {
            backend: StoreBackend::CatalogApi,
            catalog_url: Some("http://localhost:5000/api".to_string()),
            ..Default::default()
        };

        let store = connect_store(&settings).await.unwrap();
        assert_eq!(store.name(), "catalog_api");
    }
}
