//! Rental Ranker - recommendation and ranking engine for rental listings
//!
//! This library scores rental listings (PGs, hostels and other properties)
//! against a renter's preferences. It implements a filter-then-score pipeline:
//! hard constraints first, then five capped sub-scores, a stable sort and
//! truncation.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{calculate_match_score, Recommender};
pub use models::{
    Listing, PreferenceQuery, RecommendRequest, RecommendResponse, ScoredListing, ScoringWeights,
};
pub use services::{InMemoryListingStore, ListingStore};
