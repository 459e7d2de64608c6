use crate::models::{AmenitySet, Gender, Listing, PreferenceQuery, PropertyType, SharingType, UnratedPolicy};

/// Check the budget ceiling: price must not exceed the requested maximum
#[inline]
pub fn within_budget(listing: &Listing, max_budget: Option<f64>) -> bool {
    max_budget.map_or(true, |max| listing.price <= max)
}

/// Case-insensitive substring match against the listing's location or city
#[inline]
pub fn matches_location(listing: &Listing, location: Option<&str>) -> bool {
    let Some(needle) = location else {
        return true;
    };
    let needle = needle.to_lowercase();

    listing.location.to_lowercase().contains(&needle)
        || listing
            .city
            .as_deref()
            .is_some_and(|city| city.to_lowercase().contains(&needle))
}

/// Unisex listings are always eligible; gendered listings need an exact match
#[inline]
pub fn matches_gender(listing: &Listing, preference: Option<Gender>) -> bool {
    match preference {
        None => true,
        Some(gender) => {
            listing.gender_preference == gender || listing.gender_preference == Gender::Unisex
        }
    }
}

#[inline]
pub fn matches_sharing_type(listing: &Listing, sharing_type: Option<SharingType>) -> bool {
    sharing_type.map_or(true, |wanted| listing.sharing_type == wanted)
}

#[inline]
pub fn matches_property_type(listing: &Listing, property_type: Option<PropertyType>) -> bool {
    property_type.map_or(true, |wanted| listing.property_type == wanted)
}

/// Inclusive minimum rating
///
/// Without an explicit minimum every listing passes, unrated ones included,
/// unless the policy asks for unrated listings to be held back.
#[inline]
pub fn meets_min_rating(listing: &Listing, min_rating: Option<f64>, policy: UnratedPolicy) -> bool {
    match min_rating {
        Some(min) => listing.rating >= min,
        None => policy == UnratedPolicy::Include || listing.is_rated(),
    }
}

/// Every requested amenity must be present (AND across the whole set)
#[inline]
pub fn has_required_amenities(listing: &Listing, required: &AmenitySet) -> bool {
    required.iter().all(|amenity| listing.amenities.contains(amenity))
}

/// Check a listing against every hard constraint in the query
pub fn matches_preferences(
    listing: &Listing,
    query: &PreferenceQuery,
    policy: UnratedPolicy,
) -> bool {
    within_budget(listing, query.max_budget)
        && matches_location(listing, query.location.as_deref())
        && matches_gender(listing, query.gender_preference)
        && matches_sharing_type(listing, query.sharing_type)
        && matches_property_type(listing, query.property_type)
        && meets_min_rating(listing, query.min_rating, policy)
        && has_required_amenities(listing, &query.required_amenities)
}

/// Filter Stage: reduce the catalog to the candidate set, keeping catalog order
pub fn filter_candidates(
    listings: Vec<Listing>,
    query: &PreferenceQuery,
    policy: UnratedPolicy,
) -> Vec<Listing> {
    listings
        .into_iter()
        .filter(|listing| matches_preferences(listing, query, policy))
        .collect()
}
