// Core algorithm exports
pub mod filters;
pub mod recommender;
pub mod scoring;

pub use filters::{filter_candidates, matches_preferences};
pub use recommender::{Recommendations, Recommender};
pub use scoring::{calculate_match_score, score_listing};
