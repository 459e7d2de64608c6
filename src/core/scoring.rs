use crate::models::{AmenitySet, Listing, PreferenceQuery, ScoreBreakdown, ScoringWeights, MAX_RATING};

/// Vacancies beyond this count earn no extra availability points
const AVAILABILITY_CAP: u32 = 5;

/// Amenities beyond this count earn no extra breadth points
const BREADTH_CAP: usize = 8;

/// Listings at or above this capacity get the capacity points
const MIN_SUITABLE_CAPACITY: u32 = 2;

/// Clamp into `[0, max]`, mapping NaN to zero
#[inline]
fn bounded(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max.max(0.0))
    }
}

/// Calculate the five sub-scores for a candidate listing
///
/// Scoring table (default weights):
/// ```text
/// budget        25 × (1 − price / maxBudget), or a flat 20 without a budget
/// rating        rating × 6
/// amenities     25 × matched / requested, or 2 per amenity (max 16) when none requested
/// availability  3 × min(vacancies, 5), 0 when fully booked
/// capacity      5 when capacity ≥ 2
/// ```
/// Each component is clamped to its weight, so malformed listing data cannot
/// push the total outside `[0, weights.max_total()]`.
pub fn score_listing(
    listing: &Listing,
    query: &PreferenceQuery,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    ScoreBreakdown {
        budget: budget_score(listing.price, query.max_budget, weights),
        rating: rating_score(listing.rating, weights),
        amenities: amenity_score(&listing.amenities, &query.required_amenities, weights),
        availability: availability_score(listing.vacancies, weights),
        capacity: capacity_score(listing.capacity, weights),
    }
}

/// Calculate the total match score (unrounded)
pub fn calculate_match_score(
    listing: &Listing,
    query: &PreferenceQuery,
    weights: &ScoringWeights,
) -> f64 {
    bounded(score_listing(listing, query, weights).total(), weights.max_total())
}

/// Cheaper relative to the budget scores higher
#[inline]
pub fn budget_score(price: f64, max_budget: Option<f64>, weights: &ScoringWeights) -> f64 {
    match max_budget {
        Some(max) if max > 0.0 => bounded(weights.budget * (1.0 - price / max), weights.budget),
        // Rejected at the request boundary; never rewarded if it slips through
        Some(_) => 0.0,
        None => bounded(weights.unbudgeted, weights.budget),
    }
}

#[inline]
pub fn rating_score(rating: f64, weights: &ScoringWeights) -> f64 {
    bounded(rating, MAX_RATING) * (weights.rating / MAX_RATING)
}

/// Fraction of requested amenities present, or breadth when nothing was requested
#[inline]
pub fn amenity_score(available: &AmenitySet, requested: &AmenitySet, weights: &ScoringWeights) -> f64 {
    if requested.is_empty() {
        let breadth = available.len().min(BREADTH_CAP) as f64;
        return bounded(weights.per_amenity * breadth, weights.amenities);
    }

    let matched = requested.iter().filter(|a| available.contains(*a)).count() as f64;
    bounded(
        weights.amenities * (matched / requested.len() as f64),
        weights.amenities,
    )
}

/// A fully booked listing never earns availability points
#[inline]
pub fn availability_score(vacancies: u32, weights: &ScoringWeights) -> f64 {
    if vacancies == 0 {
        return 0.0;
    }
    let per_vacancy = weights.availability / AVAILABILITY_CAP as f64;
    bounded(
        per_vacancy * vacancies.min(AVAILABILITY_CAP) as f64,
        weights.availability,
    )
}

#[inline]
pub fn capacity_score(capacity: u32, weights: &ScoringWeights) -> f64 {
    if capacity >= MIN_SUITABLE_CAPACITY {
        bounded(weights.capacity, weights.capacity)
    } else {
        0.0
    }
}
