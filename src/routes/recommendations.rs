use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::Instrument;

use crate::core::Recommender;
use crate::models::{
    ErrorResponse, HealthResponse, InvalidateResponse, PreferenceQuery, QueryError, QueryLimits,
    RecommendRequest, RecommendResponse, TrendingParams, TrendingResponse,
};
use crate::services::{CacheError, CacheKey, CacheManager, ListingStore, StoreError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ListingStore>,
    pub cache: Option<Arc<CacheManager>>,
    pub recommender: Recommender,
    pub limits: QueryLimits,
}

impl AppState {
    pub fn new(store: Arc<dyn ListingStore>, recommender: Recommender, limits: QueryLimits) -> Self {
        Self {
            store,
            cache: None,
            recommender,
            limits,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Configure all recommendation-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/recommendations", web::post().to(recommend))
        .route("/rentals/recommend", web::post().to(recommend))
        .route("/listings/trending", web::get().to(trending))
        .route("/cache/recommendations", web::delete().to(invalidate_cache));
}

fn query_error(err: QueryError) -> ErrorResponse {
    match err {
        QueryError::Validation(errors) => {
            ErrorResponse::new("validation_failed", errors.to_string(), 400)
        }
        e @ QueryError::LimitTooLarge { .. } => {
            ErrorResponse::new("validation_failed", e.to_string(), 400)
        }
        QueryError::UnknownValue(e) => ErrorResponse::new("invalid_query", e.to_string(), 400),
    }
}

fn store_error(err: StoreError) -> ErrorResponse {
    tracing::error!("Listing store failed: {}", err);
    ErrorResponse::new("store_unavailable", err.to_string(), 503)
}

/// Cache entry for one request, pinned to the generation read before the store fetch
///
/// An invalidation that lands while the request is ranking moves readers to a
/// newer generation, so the late write below is never served.
struct CacheSlot<'a> {
    cache: &'a CacheManager,
    key: String,
}

impl<'a> CacheSlot<'a> {
    async fn open(cache: Option<&'a CacheManager>, key: impl FnOnce(u64) -> String) -> Option<Self> {
        let cache = cache?;
        match cache.generation().await {
            Ok(generation) => Some(Self {
                cache,
                key: key(generation),
            }),
            Err(e) => {
                tracing::warn!("Cache generation unavailable, bypassing cache: {}", e);
                None
            }
        }
    }

    /// Any cache failure other than a miss is logged and treated as one
    async fn get<T>(&self) -> Option<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        match self.cache.get::<T>(&self.key).await {
            Ok(value) => Some(value),
            Err(CacheError::CacheMiss(_)) => None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", self.key, e);
                None
            }
        }
    }

    async fn fill<T: serde::Serialize>(&self, value: &T) {
        if let Err(e) = self.cache.set(&self.key, value).await {
            tracing::warn!("Cache write failed for {}: {}", self.key, e);
        }
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_healthy = match state.store.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if store_healthy { "healthy" } else { "degraded" };

    let cache = match &state.cache {
        Some(cache) => Some(cache.stats().await),
        None => None,
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store.name().to_string(),
        cache,
        timestamp: chrono::Utc::now(),
    })
}

/// Ranked recommendations endpoint
///
/// POST /api/v1/recommendations
///
/// Request body (every field optional):
/// ```json
/// {
///   "maxBudget": 5000,
///   "requiredAmenities": ["wifi", "food"],
///   "genderPreference": "female",
///   "sharingType": "double",
///   "propertyType": "pg",
///   "location": "Hyderabad",
///   "minRating": 4.0,
///   "limit": 10
/// }
/// ```
async fn recommend(
    state: web::Data<AppState>,
    req: web::Json<RecommendRequest>,
) -> Result<HttpResponse, ErrorResponse> {
    let query = req.into_inner().into_query(&state.limits).map_err(|e| {
        tracing::info!("Rejected recommendation request: {}", e);
        query_error(e)
    })?;

    let span = tracing::info_span!("recommend", request_id = %uuid::Uuid::new_v4());

    rank(&state, query).instrument(span).await
}

async fn rank(state: &AppState, query: PreferenceQuery) -> Result<HttpResponse, ErrorResponse> {
    let signature = query.signature();
    let slot = CacheSlot::open(state.cache.as_deref(), |generation| {
        CacheKey::recommendations(generation, &signature)
    })
    .await;

    if let Some(slot) = &slot {
        if let Some(response) = slot.get::<RecommendResponse>().await {
            tracing::debug!("Serving cached recommendations");
            return Ok(HttpResponse::Ok().json(response));
        }
    }

    let listings = state
        .store
        .fetch_candidates(&query)
        .await
        .map_err(store_error)?;

    let result = state.recommender.recommend(listings, &query);

    let response = RecommendResponse {
        count: result.recommendations.len(),
        total_candidates: result.total_candidates,
        recommendations: result.recommendations,
    };

    tracing::info!(
        "Returning {} recommendations (from {} candidates)",
        response.count,
        response.total_candidates
    );

    if let Some(slot) = &slot {
        slot.fill(&response).await;
    }

    Ok(HttpResponse::Ok().json(response))
}

/// Trending listings endpoint
///
/// GET /api/v1/listings/trending?limit=10
async fn trending(
    state: web::Data<AppState>,
    params: web::Query<TrendingParams>,
) -> Result<HttpResponse, ErrorResponse> {
    let limit = params.resolve_limit(&state.limits).map_err(query_error)?;

    let slot = CacheSlot::open(state.cache.as_deref(), |generation| {
        CacheKey::trending(generation, limit)
    })
    .await;

    if let Some(slot) = &slot {
        if let Some(response) = slot.get::<TrendingResponse>().await {
            return Ok(HttpResponse::Ok().json(response));
        }
    }

    let listings = state.store.fetch_all().await.map_err(store_error)?;
    let listings = state.recommender.trending(listings, limit);

    let response = TrendingResponse {
        count: listings.len(),
        listings,
    };

    if let Some(slot) = &slot {
        slot.fill(&response).await;
    }

    Ok(HttpResponse::Ok().json(response))
}

/// Drop every cached ranking
///
/// DELETE /api/v1/cache/recommendations
async fn invalidate_cache(state: web::Data<AppState>) -> Result<HttpResponse, ErrorResponse> {
    let Some(cache) = &state.cache else {
        return Ok(HttpResponse::Ok().json(InvalidateResponse { invalidated: false }));
    };

    let generation = cache.invalidate_all().await.map_err(|e| {
        tracing::error!("Cache invalidation failed: {}", e);
        ErrorResponse::new("cache_unavailable", e.to_string(), 503)
    })?;

    tracing::info!("Invalidated cached recommendations (generation {})", generation);

    Ok(HttpResponse::Ok().json(InvalidateResponse { invalidated: true }))
}
