use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::models::{Listing, PreferenceQuery, PropertyType};
use crate::services::store::{listings_from_payload, ListingStore, StoreError};

/// Listing store that reads the existing catalog REST API
///
/// Talks to the document-backed rentals service:
/// - `GET {base}/rentals` for the full catalog, optionally narrowed by
///   `property_type`
/// - `GET {base}/health` for liveness
///
/// The catalog matches `location` as a raw regular expression and stores
/// categories the engine folds into `other`, so only the hostel and pg
/// categories are pushed down. Everything else is left to the Filter Stage.
pub struct CatalogApiStore {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl CatalogApiStore {
    /// Create a new catalog API client
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn rentals_url(&self, query: Option<&PreferenceQuery>) -> String {
        let property_type = query.and_then(|q| match q.property_type {
            Some(PropertyType::Hostel) | Some(PropertyType::Pg) => q.property_type,
            _ => None,
        });

        match property_type {
            Some(property_type) => format!(
                "{}/rentals?property_type={}",
                self.base_url,
                urlencoding::encode(property_type.as_str())
            ),
            None => format!("{}/rentals", self.base_url),
        }
    }

    async fn get_listings(&self, url: &str) -> Result<Vec<Listing>, StoreError> {
        tracing::debug!("Fetching listings from: {}", url);

        let mut request = self.client.get(url);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Catalog API returned {} - {}", status, body);
            return Err(StoreError::Api(format!("Failed to fetch listings: {}", status)));
        }

        let payload: Value = response.json().await?;
        listings_from_payload(payload)
    }
}

#[async_trait]
impl ListingStore for CatalogApiStore {
    fn name(&self) -> &'static str {
        "catalog_api"
    }

    async fn fetch_all(&self) -> Result<Vec<Listing>, StoreError> {
        self.get_listings(&self.rentals_url(None)).await
    }

    async fn fetch_candidates(&self, query: &PreferenceQuery) -> Result<Vec<Listing>, StoreError> {
        self.get_listings(&self.rentals_url(Some(query))).await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter_candidates;
    use crate::models::UnratedPolicy;

    fn client(base_url: &str) -> CatalogApiStore {
        CatalogApiStore::new(base_url.to_string(), None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_rentals_url() {
        let store = client("https://catalog.test/api/");
        assert_eq!(store.rentals_url(None), "https://catalog.test/api/rentals");

        let query = PreferenceQuery {
            location: Some("Navi Mumbai".to_string()),
            property_type: Some(PropertyType::Hostel),
            ..Default::default()
        };
        assert_eq!(
            store.rentals_url(Some(&query)),
            "https://catalog.test/api/rentals?property_type=hostel"
        );
    }

    #[test]
    fn test_folded_category_and_location_stay_local() {
        let store = client("https://catalog.test/api");
        let query = PreferenceQuery {
            location: Some("Pune (East)$".to_string()),
            property_type: Some(PropertyType::Other),
            ..Default::default()
        };

        assert_eq!(store.rentals_url(Some(&query)), "https://catalog.test/api/rentals");
    }

    #[tokio::test]
    async fn test_narrowed_fetch_matches_full_fetch_after_filtering() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rentals")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"properties": [
                    {"_id": "v1", "title": "Villa", "location": "Pune (East)", "price": 9000,
                     "propertyType": "villa", "property_type": "villa"},
                    {"_id": "o1", "title": "Studio", "location": "Kothrud", "city": "Pune", "price": 7000,
                     "propertyType": "others"},
                    {"_id": "p1", "title": "PG", "location": "Pune (East)", "price": 4000,
                     "property_type": "pg"}
                ]}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let store = client(&server.url());
        let query = PreferenceQuery {
            location: Some("Pune (East)".to_string()),
            property_type: Some(PropertyType::Other),
            ..Default::default()
        };

        let full = filter_candidates(store.fetch_all().await.unwrap(), &query, UnratedPolicy::Include);
        let pushed = filter_candidates(
            store.fetch_candidates(&query).await.unwrap(),
            &query,
            UnratedPolicy::Include,
        );

        mock.assert_async().await;
        assert_eq!(pushed, full);
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].id, "v1");
    }

    #[tokio::test]
    async fn test_fetch_all_parses_catalog_documents() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rentals")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "message": "Properties retrieved successfully",
                    "count": 2,
                    "properties": [
                        {"_id": "a1", "title": "Sunrise PG", "location": "Ameerpet", "city": "Hyderabad",
                         "price": 4500, "property_type": "pg", "amenities": ["WiFi", "Food", "AC"],
                         "rating": 4.1, "vacancies": 2, "capacity": 8},
                        {"_id": "a2", "title": "Broken", "location": "Nowhere"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let store = client(&server.url());
        let listings = store.fetch_all().await.unwrap();

        mock.assert_async().await;
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "a1");
        assert_eq!(listings[0].amenities.keys(), vec!["wifi", "food", "ac"]);
    }

    #[tokio::test]
    async fn test_api_error_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rentals")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let store = client(&server.url());
        let err = store.fetch_all().await.unwrap_err();

        assert!(matches!(err, StoreError::Api(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;

        assert!(client(&server.url()).health_check().await.unwrap());
    }
}
