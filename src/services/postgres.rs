use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;

use crate::models::{AmenitySet, Gender, Listing, PreferenceQuery, PropertyType, SharingType};
use crate::services::store::{ListingStore, StoreError};

const LISTING_COLUMNS: &str = r#"
    SELECT id, name, location, city, price, property_type, capacity, vacancies,
           rating, sharing_type, gender_preference, amenities, is_selected
    FROM listings
"#;

/// PostgreSQL-backed listing store
///
/// Amenities are stored as a `TEXT[]` of canonical keys, so the dual amenity
/// shapes of the document catalog never reach this table.
pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from optional settings values
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL listing store");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    async fn fetch_rows(
        &self,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<Listing>, StoreError> {
        // Insertion order is the catalog order the ranking ties fall back to
        builder.push(" ORDER BY created_at, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let listings = rows
            .iter()
            .map(listing_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Fetched {} listings from PostgreSQL", listings.len());

        Ok(listings)
    }
}

fn invalid<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::InvalidData(e.to_string())
}

fn listing_from_row(row: &PgRow) -> Result<Listing, StoreError> {
    let property_type: String = row.try_get("property_type")?;
    let sharing_type: String = row.try_get("sharing_type")?;
    let gender: String = row.try_get("gender_preference")?;
    let capacity: i32 = row.try_get("capacity")?;
    let vacancies: i32 = row.try_get("vacancies")?;
    let amenities: Vec<String> = row.try_get("amenities")?;

    Ok(Listing {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        location: row.try_get("location")?,
        city: row.try_get("city")?,
        price: row.try_get("price")?,
        property_type: property_type.parse::<PropertyType>().map_err(invalid)?,
        capacity: u32::try_from(capacity.max(0)).map_err(invalid)?,
        vacancies: u32::try_from(vacancies.max(0)).map_err(invalid)?,
        rating: row.try_get("rating")?,
        sharing_type: sharing_type.parse::<SharingType>().map_err(invalid)?,
        gender_preference: gender.parse::<Gender>().map_err(invalid)?,
        amenities: AmenitySet::from_labels(amenities),
        is_selected: row.try_get("is_selected")?,
    })
}

/// Append the hard constraints PostgreSQL can evaluate directly
///
/// Location matching and the unrated policy stay in the Filter Stage.
fn push_constraints(builder: &mut QueryBuilder<'_, Postgres>, query: &PreferenceQuery) {
    builder.push(" WHERE TRUE");

    if let Some(max_budget) = query.max_budget {
        builder.push(" AND price <= ").push_bind(max_budget);
    }

    if let Some(gender) = query.gender_preference {
        builder
            .push(" AND gender_preference IN (")
            .push_bind(gender.as_str())
            .push(", 'unisex')");
    }

    if let Some(sharing_type) = query.sharing_type {
        builder
            .push(" AND sharing_type = ")
            .push_bind(sharing_type.as_str());
    }

    if let Some(property_type) = query.property_type {
        builder
            .push(" AND property_type = ")
            .push_bind(property_type.as_str());
    }

    if let Some(min_rating) = query.min_rating {
        builder.push(" AND rating >= ").push_bind(min_rating);
    }

    if !query.required_amenities.is_empty() {
        let keys: Vec<String> = query
            .required_amenities
            .keys()
            .into_iter()
            .map(str::to_string)
            .collect();
        builder.push(" AND amenities @> ").push_bind(keys);
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn fetch_all(&self) -> Result<Vec<Listing>, StoreError> {
        self.fetch_rows(QueryBuilder::new(LISTING_COLUMNS)).await
    }

    async fn fetch_candidates(&self, query: &PreferenceQuery) -> Result<Vec<Listing>, StoreError> {
        let mut builder = QueryBuilder::new(LISTING_COLUMNS);
        push_constraints(&mut builder, query);
        self.fetch_rows(builder).await
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
