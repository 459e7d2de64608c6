use serde::{Deserialize, Serialize};
use crate::models::domain::{Listing, ScoredListing};
use crate::services::CacheStats;

/// Response for the recommendation endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub count: usize,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
    pub recommendations: Vec<ScoredListing>,
}

/// Response for the trending endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingResponse {
    pub count: usize,
    pub listings: Vec<Listing>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Cache invalidation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub invalidated: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            status_code,
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for ErrorResponse {}
