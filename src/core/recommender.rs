use std::cmp::Ordering;

use crate::core::{filters::filter_candidates, scoring::score_listing};
use crate::models::{Listing, PreferenceQuery, ScoredListing, ScoringWeights, UnratedPolicy};

/// Result of one recommendation pass
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub recommendations: Vec<ScoredListing>,
    /// Listings that survived the Filter Stage, before truncation
    pub total_candidates: usize,
}

/// Ranking orchestrator
///
/// # Pipeline Stages
/// 1. Filter Stage: hard constraints (budget, location, gender, sharing type,
///    property category, minimum rating, required amenities)
/// 2. Scoring Stage: five capped sub-scores per candidate
/// 3. Stable sort by unrounded score, descending
/// 4. Truncation to the requested result size
///
/// Holds no per-request state; clones are cheap and safe to share.
#[derive(Debug, Clone, Default)]
pub struct Recommender {
    weights: ScoringWeights,
    unrated: UnratedPolicy,
}

impl Recommender {
    pub fn new(weights: ScoringWeights, unrated: UnratedPolicy) -> Self {
        Self { weights, unrated }
    }

    pub fn with_default_weights() -> Self {
        Self::default()
    }

    /// Rank a catalog snapshot against a preference query
    ///
    /// Equal scores keep their catalog order, so identical inputs always
    /// produce identical output.
    pub fn recommend(&self, listings: Vec<Listing>, query: &PreferenceQuery) -> Recommendations {
        let catalog_size = listings.len();

        let candidates = filter_candidates(listings, query, self.unrated);
        let total_candidates = candidates.len();

        tracing::debug!(
            "Filter stage kept {} of {} listings",
            total_candidates,
            catalog_size
        );

        let max_total = self.weights.max_total();
        let mut scored: Vec<(f64, ScoredListing)> = candidates
            .into_iter()
            .map(|listing| {
                let breakdown = score_listing(&listing, query, &self.weights);
                let raw = breakdown.total().clamp(0.0, max_total);
                (raw, ScoredListing::new(listing, raw, breakdown))
            })
            .collect();

        // Sort on the unrounded score; sort_by is stable
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(query.limit);

        Recommendations {
            recommendations: scored.into_iter().map(|(_, listing)| listing).collect(),
            total_candidates,
        }
    }

    /// Highest rated first, selected listings ahead on equal rating
    pub fn trending(&self, mut listings: Vec<Listing>, limit: usize) -> Vec<Listing> {
        listings.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.is_selected.cmp(&a.is_selected))
        });
        listings.truncate(limit);
        listings
    }
}
