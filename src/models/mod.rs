// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    round2, Amenity, AmenitySet, Gender, Listing, ParseEnumError, PreferenceQuery, PropertyType,
    ScoreBreakdown, ScoredListing, ScoringWeights, SharingType, UnratedPolicy, DEFAULT_LIMIT,
    MAX_RATING,
};
pub use requests::{QueryError, QueryLimits, RecommendRequest, TrendingParams};
pub use responses::{
    ErrorResponse, HealthResponse, InvalidateResponse, RecommendResponse, TrendingResponse,
};
