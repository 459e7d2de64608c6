use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::models::domain::{
    Amenity, AmenitySet, Gender, ParseEnumError, PreferenceQuery, PropertyType, SharingType,
    DEFAULT_LIMIT,
};

/// Errors raised while turning a wire request into a [`PreferenceQuery`]
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid query: {0}")]
    UnknownValue(#[from] ParseEnumError),

    #[error("Validation failed: limit {limit} exceeds the maximum of {max}")]
    LimitTooLarge { limit: i64, max: usize },
}

/// Default and maximum result sizes; a larger request is refused, never shortened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl QueryLimits {
    /// Requested size, or the default; anything above the maximum is rejected
    fn resolve(&self, requested: Option<i64>) -> Result<usize, QueryError> {
        let Some(limit) = requested else {
            return Ok(self.default_limit);
        };

        match usize::try_from(limit) {
            Ok(size) if size <= self.max_limit => Ok(size),
            _ => Err(QueryError::LimitTooLarge {
                limit,
                max: self.max_limit,
            }),
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: 100,
        }
    }
}

/// Request to rank listings against a renter's preferences
///
/// Field names follow the public camelCase shape; the snake_case names sent
/// by the existing web client are accepted as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RecommendRequest {
    #[validate(range(exclusive_min = 0.0))]
    #[serde(rename = "maxBudget", alias = "max_budget", default)]
    pub max_budget: Option<f64>,
    #[serde(rename = "requiredAmenities", alias = "required_amenities", default)]
    pub required_amenities: Vec<String>,
    #[serde(rename = "genderPreference", alias = "gender_preference", default)]
    pub gender_preference: Option<String>,
    #[serde(rename = "sharingType", alias = "sharing_type", default)]
    pub sharing_type: Option<String>,
    #[serde(rename = "propertyType", alias = "property_type", default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[validate(range(min = 0.0, max = 5.0))]
    #[serde(rename = "minRating", alias = "min_rating", default)]
    pub min_rating: Option<f64>,
    #[validate(range(min = 1))]
    #[serde(default)]
    pub limit: Option<i64>,
}

/// `"all"`, `"any"` and blank values mean "no constraint" to the web client
fn optional_constraint<T>(raw: Option<&str>) -> Result<Option<T>, ParseEnumError>
where
    T: FromStr<Err = ParseEnumError>,
{
    match raw.map(str::trim) {
        None => Ok(None),
        Some(value)
            if value.is_empty()
                || value.eq_ignore_ascii_case("all")
                || value.eq_ignore_ascii_case("any") =>
        {
            Ok(None)
        }
        Some(value) => value.parse().map(Some),
    }
}

impl RecommendRequest {
    /// Validate the request and build the engine's query
    pub fn into_query(self, limits: &QueryLimits) -> Result<PreferenceQuery, QueryError> {
        self.validate()?;

        let required_amenities = self
            .required_amenities
            .iter()
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .map(Amenity::from_str)
            .collect::<Result<AmenitySet, _>>()?;

        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        Ok(PreferenceQuery {
            max_budget: self.max_budget,
            location,
            gender_preference: optional_constraint::<Gender>(self.gender_preference.as_deref())?,
            sharing_type: optional_constraint::<SharingType>(self.sharing_type.as_deref())?,
            property_type: optional_constraint::<PropertyType>(self.property_type.as_deref())?,
            min_rating: self.min_rating,
            required_amenities,
            limit: limits.resolve(self.limit)?,
        })
    }
}

/// Query string for the trending endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TrendingParams {
    #[validate(range(min = 1))]
    #[serde(default)]
    pub limit: Option<i64>,
}

impl TrendingParams {
    pub fn resolve_limit(&self, limits: &QueryLimits) -> Result<usize, QueryError> {
        self.validate()?;
        limits.resolve(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::Amenity;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> RecommendRequest {
        serde_json::from_value(value).expect("request should deserialize")
    }

    #[test]
    fn test_empty_request_uses_defaults() {
        let query = parse(json!({})).into_query(&QueryLimits::default()).unwrap();

        assert_eq!(query, PreferenceQuery::default());
        assert_eq!(query.limit, 10);
    }

    #[test]
    fn test_snake_case_aliases() {
        let query = parse(json!({
            "max_budget": 5000,
            "required_amenities": ["wifi", "Food"],
            "gender_preference": "female",
            "sharing_type": "double",
            "property_type": "pg",
            "min_rating": 4.0,
            "limit": 12
        }))
        .into_query(&QueryLimits::default())
        .unwrap();

        assert_eq!(query.max_budget, Some(5000.0));
        assert!(query.required_amenities.contains(Amenity::Wifi));
        assert!(query.required_amenities.contains(Amenity::Food));
        assert_eq!(query.gender_preference, Some(Gender::Female));
        assert_eq!(query.sharing_type, Some(SharingType::Double));
        assert_eq!(query.property_type, Some(PropertyType::Pg));
        assert_eq!(query.min_rating, Some(4.0));
        assert_eq!(query.limit, 12);
    }

    #[test]
    fn test_all_means_no_constraint() {
        let query = parse(json!({
            "sharingType": "all",
            "propertyType": "ALL",
            "genderPreference": "",
            "location": "   "
        }))
        .into_query(&QueryLimits::default())
        .unwrap();

        assert_eq!(query.sharing_type, None);
        assert_eq!(query.property_type, None);
        assert_eq!(query.gender_preference, None);
        assert_eq!(query.location, None);
    }

    #[test]
    fn test_rejects_non_positive_limit() {
        let err = parse(json!({"limit": 0}))
            .into_query(&QueryLimits::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));

        let err = parse(json!({"limit": -3}))
            .into_query(&QueryLimits::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn test_rejects_non_positive_budget() {
        let err = parse(json!({"maxBudget": 0}))
            .into_query(&QueryLimits::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn test_rejects_out_of_range_rating() {
        let err = parse(json!({"minRating": 5.5}))
            .into_query(&QueryLimits::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn test_rejects_unknown_amenity() {
        let err = parse(json!({"requiredAmenities": ["wifi", "helipad"]}))
            .into_query(&QueryLimits::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownValue(_)));
    }

    #[test]
    fn test_rejects_unknown_gender() {
        let err = parse(json!({"genderPreference": "robot"}))
            .into_query(&QueryLimits::default())
            .unwrap_err();
        assert!(matches!(err, QueryError::UnknownValue(_)));
    }

    #[test]
    fn test_non_numeric_budget_fails_to_decode() {
        let result = serde_json::from_value::<RecommendRequest>(json!({"maxBudget": "cheap"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_limit_above_maximum_is_rejected() {
        let limits = QueryLimits {
            default_limit: 10,
            max_limit: 25,
        };

        let query = parse(json!({"limit": 25})).into_query(&limits).unwrap();
        assert_eq!(query.limit, 25);

        let err = parse(json!({"limit": 26})).into_query(&limits).unwrap_err();
        assert!(matches!(err, QueryError::LimitTooLarge { limit: 26, max: 25 }));
    }

    #[test]
    fn test_default_maximum_boundary() {
        let limits = QueryLimits::default();

        assert_eq!(parse(json!({"limit": 100})).into_query(&limits).unwrap().limit, 100);
        assert!(parse(json!({"limit": 150})).into_query(&limits).is_err());
    }

    #[test]
    fn test_trending_limit() {
        let limits = QueryLimits::default();
        assert_eq!(TrendingParams::default().resolve_limit(&limits).unwrap(), 10);
        assert_eq!(
            TrendingParams { limit: Some(3) }.resolve_limit(&limits).unwrap(),
            3
        );
        assert!(TrendingParams { limit: Some(0) }.resolve_limit(&limits).is_err());
        assert!(matches!(
            TrendingParams { limit: Some(101) }.resolve_limit(&limits),
            Err(QueryError::LimitTooLarge { .. })
        ));
    }
}
