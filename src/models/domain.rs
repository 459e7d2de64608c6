use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Highest star rating a listing can carry
pub const MAX_RATING: f64 = 5.0;

/// Result size used when a query does not ask for one
pub const DEFAULT_LIMIT: usize = 10;

/// Error returned when a string does not name a known enum value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Lower-cases and folds spaces and hyphens into underscores
fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(|c: char| c == ' ' || c == '-', "_")
}

/// Fixed amenity vocabulary tracked on every listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum Amenity {
    Wifi,
    Food,
    Ac,
    Parking,
    Laundry,
    PowerBackup,
    Security,
    Cctv,
}

impl Amenity {
    pub const ALL: [Amenity; 8] = [
        Amenity::Wifi,
        Amenity::Food,
        Amenity::Ac,
        Amenity::Parking,
        Amenity::Laundry,
        Amenity::PowerBackup,
        Amenity::Security,
        Amenity::Cctv,
    ];

    /// Canonical key used on the wire and in storage
    pub fn key(&self) -> &'static str {
        match self {
            Amenity::Wifi => "wifi",
            Amenity::Food => "food",
            Amenity::Ac => "ac",
            Amenity::Parking => "parking",
            Amenity::Laundry => "laundry",
            Amenity::PowerBackup => "power_backup",
            Amenity::Security => "security",
            Amenity::Cctv => "cctv",
        }
    }

    /// Display label used by the listing catalog
    pub fn label(&self) -> &'static str {
        match self {
            Amenity::Wifi => "WiFi",
            Amenity::Food => "Food Available",
            Amenity::Ac => "Air Conditioning",
            Amenity::Parking => "Parking",
            Amenity::Laundry => "Laundry",
            Amenity::PowerBackup => "Power Backup",
            Amenity::Security => "Security",
            Amenity::Cctv => "CCTV",
        }
    }

    /// Resolve either a canonical key or a catalog label, case-insensitively
    pub fn from_label(raw: &str) -> Option<Self> {
        match normalize_token(raw).as_str() {
            "wifi" | "wi_fi" => Some(Amenity::Wifi),
            "food" | "food_available" | "meals" => Some(Amenity::Food),
            "ac" | "air_conditioning" => Some(Amenity::Ac),
            "parking" => Some(Amenity::Parking),
            "laundry" => Some(Amenity::Laundry),
            "power_backup" | "powerbackup" => Some(Amenity::PowerBackup),
            "security" => Some(Amenity::Security),
            "cctv" => Some(Amenity::Cctv),
            _ => None,
        }
    }
}

impl fmt::Display for Amenity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Amenity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amenity::from_label(s).ok_or_else(|| ParseEnumError::new("amenity", s))
    }
}

impl TryFrom<String> for Amenity {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Source documents carry amenities either as a flag map or as a label list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmenities {
    Flags(BTreeMap<String, Value>),
    Labels(Vec<String>),
}

impl From<RawAmenities> for AmenitySet {
    fn from(raw: RawAmenities) -> Self {
        match raw {
            RawAmenities::Flags(flags) => AmenitySet::from_flags(
                flags
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_bool() == Some(true))),
            ),
            RawAmenities::Labels(labels) => AmenitySet::from_labels(labels),
        }
    }
}

/// Ordered set of amenities present on a listing (or requested by a renter)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawAmenities")]
pub struct AmenitySet(BTreeSet<Amenity>);

impl AmenitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `key -> enabled` map, ignoring unknown keys
    pub fn from_flags<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        flags
            .into_iter()
            .filter(|(_, enabled)| *enabled)
            .filter_map(|(key, _)| {
                let amenity = Amenity::from_label(key);
                if amenity.is_none() {
                    tracing::debug!("Ignoring unknown amenity flag: {}", key);
                }
                amenity
            })
            .collect()
    }

    /// Build from keys or catalog labels, ignoring unknown entries
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        labels
            .into_iter()
            .filter_map(|label| {
                let amenity = Amenity::from_label(label.as_ref());
                if amenity.is_none() {
                    tracing::debug!("Ignoring unknown amenity label: {}", label.as_ref());
                }
                amenity
            })
            .collect()
    }

    pub fn contains(&self, amenity: Amenity) -> bool {
        self.0.contains(&amenity)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Amenity> + '_ {
        self.0.iter().copied()
    }

    /// Canonical keys, in vocabulary order
    pub fn keys(&self) -> Vec<&'static str> {
        self.iter().map(|a| a.key()).collect()
    }
}

impl FromIterator<Amenity> for AmenitySet {
    fn from_iter<T: IntoIterator<Item = Amenity>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Property category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PropertyType {
    /// Shared-room hostel
    Hostel,
    /// Paying-guest accommodation
    Pg,
    Other,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Hostel => "hostel",
            PropertyType::Pg => "pg",
            PropertyType::Other => "other",
        }
    }
}

impl FromStr for PropertyType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "hostel" => Ok(PropertyType::Hostel),
            "pg" | "paying_guest" => Ok(PropertyType::Pg),
            // The wider catalog also lists real-estate categories
            "other" | "others" | "apartment" | "house" | "villa" | "land" | "commercial" => {
                Ok(PropertyType::Other)
            }
            _ => Err(ParseEnumError::new("property type", s)),
        }
    }
}

impl TryFrom<String> for PropertyType {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Room sharing arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SharingType {
    Single,
    Double,
    Triple,
    Shared,
}

impl SharingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SharingType::Single => "single",
            SharingType::Double => "double",
            SharingType::Triple => "triple",
            SharingType::Shared => "shared",
        }
    }
}

impl FromStr for SharingType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "single" => Ok(SharingType::Single),
            "double" => Ok(SharingType::Double),
            "triple" => Ok(SharingType::Triple),
            "shared" => Ok(SharingType::Shared),
            _ => Err(ParseEnumError::new("sharing type", s)),
        }
    }
}

impl TryFrom<String> for SharingType {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for SharingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gender eligibility tag on a listing, or a renter's gender preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unisex => "unisex",
        }
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "unisex" => Ok(Gender::Unisex),
            _ => Err(ParseEnumError::new("gender", s)),
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rentable property record eligible for recommendation
///
/// Deserialization goes through [`ListingDocument`], so both the canonical
/// camelCase form and raw catalog documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ListingDocument")]
pub struct Listing {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub price: f64,
    #[serde(rename = "propertyType")]
    pub property_type: PropertyType,
    pub capacity: u32,
    pub vacancies: u32,
    pub rating: f64,
    #[serde(rename = "sharingType")]
    pub sharing_type: SharingType,
    #[serde(rename = "genderPreference")]
    pub gender_preference: Gender,
    pub amenities: AmenitySet,
    #[serde(rename = "isSelected")]
    pub is_selected: bool,
}

impl Listing {
    /// A rating of exactly 0.0 means nobody has rated the listing yet
    pub fn is_rated(&self) -> bool {
        self.rating > 0.0
    }
}

/// Raw listing document as stored by the catalog
///
/// The catalog mixes Mongo naming (`_id`, `title`, `property_type`) with
/// camelCase duplicates and keeps amenities in two shapes. Everything is
/// folded into one canonical [`Listing`] here so the engine sees one shape.
#[derive(Debug, Deserialize)]
struct ListingDocument {
    #[serde(default)]
    id: Option<Value>,
    #[serde(rename = "_id", default)]
    mongo_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    city: Option<String>,
    price: f64,
    #[serde(rename = "propertyType", default)]
    property_type_camel: Option<PropertyType>,
    #[serde(rename = "property_type", default)]
    property_type_snake: Option<PropertyType>,
    #[serde(default = "default_capacity")]
    capacity: f64,
    #[serde(default)]
    vacancies: f64,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(rename = "sharingType", alias = "sharing_type", default)]
    sharing_type: Option<SharingType>,
    #[serde(rename = "genderPreference", alias = "gender_preference", default)]
    gender_preference: Option<Gender>,
    #[serde(default)]
    amenities: Option<AmenitySet>,
    #[serde(rename = "amenities_object", alias = "amenitiesObject", default)]
    amenities_object: Option<AmenitySet>,
    #[serde(rename = "isSelected", alias = "is_selected", default)]
    is_selected: bool,
}

fn default_capacity() -> f64 {
    1.0
}

/// Render a document id, unwrapping Mongo's `{"$oid": ...}` export form
fn document_id(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Object(map) => {
            if let Some(Value::String(oid)) = map.get("$oid") {
                return oid.clone();
            }
            Value::Object(map).to_string()
        }
        other => other.to_string(),
    }
}

/// JavaScript writers store counts as plain numbers, so `4.0` is common
fn clamp_count(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    // Float-to-int `as` saturates at u32::MAX
    value.trunc() as u32
}

impl From<ListingDocument> for Listing {
    fn from(doc: ListingDocument) -> Self {
        let id = doc
            .id
            .or(doc.mongo_id)
            .map(document_id)
            .unwrap_or_default();

        // Prefer the flag map when both amenity shapes are present
        let amenities = doc
            .amenities_object
            .filter(|set| !set.is_empty())
            .or(doc.amenities)
            .unwrap_or_default();

        Listing {
            id,
            name: doc.name.or(doc.title).unwrap_or_default(),
            location: doc.location.unwrap_or_default(),
            city: doc.city,
            price: doc.price,
            property_type: doc
                .property_type_snake
                .or(doc.property_type_camel)
                .unwrap_or(PropertyType::Pg),
            capacity: clamp_count(doc.capacity),
            vacancies: clamp_count(doc.vacancies),
            rating: doc.rating.unwrap_or(0.0),
            sharing_type: doc.sharing_type.unwrap_or(SharingType::Shared),
            gender_preference: doc.gender_preference.unwrap_or(Gender::Unisex),
            amenities,
            is_selected: doc.is_selected,
        }
    }
}

/// Whether unrated listings pass the Filter Stage when a query sets no minimum rating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnratedPolicy {
    /// Unrated listings stay discoverable
    #[default]
    Include,
    /// Unrated listings only appear when the query names a minimum rating
    Exclude,
}

/// A renter's filter and ranking inputs for one recommendation request
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceQuery {
    pub max_budget: Option<f64>,
    pub location: Option<String>,
    pub gender_preference: Option<Gender>,
    pub sharing_type: Option<SharingType>,
    pub property_type: Option<PropertyType>,
    pub min_rating: Option<f64>,
    pub required_amenities: AmenitySet,
    pub limit: usize,
}

impl Default for PreferenceQuery {
    fn default() -> Self {
        Self {
            max_budget: None,
            location: None,
            gender_preference: None,
            sharing_type: None,
            property_type: None,
            min_rating: None,
            required_amenities: AmenitySet::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PreferenceQuery {
    /// Normalised filter signature, stable across equivalent queries
    pub fn signature(&self) -> String {
        fn opt<T: fmt::Display>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
        }

        format!(
            "budget={}|location={}|gender={}|sharing={}|type={}|rating={}|amenities={}|limit={}",
            opt(self.max_budget),
            opt(self.location.as_deref().map(|l| l.trim().to_lowercase())),
            opt(self.gender_preference),
            opt(self.sharing_type),
            opt(self.property_type),
            opt(self.min_rating),
            self.required_amenities.keys().join(","),
            self.limit,
        )
    }
}

/// Maximum points each sub-score can contribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub budget: f64,
    pub rating: f64,
    pub amenities: f64,
    pub availability: f64,
    pub capacity: f64,
    /// Budget points given when the query sets no budget
    pub unbudgeted: f64,
    /// Points per available amenity when nothing specific was requested
    pub per_amenity: f64,
}

impl ScoringWeights {
    /// Upper bound of the total score
    pub fn max_total(&self) -> f64 {
        self.budget + self.rating + self.amenities + self.availability + self.capacity
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            budget: 25.0,
            rating: 30.0,
            amenities: 25.0,
            availability: 15.0,
            capacity: 5.0,
            unbudgeted: 20.0,
            per_amenity: 2.0,
        }
    }
}

/// Round to two decimal places for display
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The five sub-scores that make up a match score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub budget: f64,
    pub rating: f64,
    pub amenities: f64,
    pub availability: f64,
    pub capacity: f64,
}

impl ScoreBreakdown {
    /// Unrounded total
    pub fn total(&self) -> f64 {
        self.budget + self.rating + self.amenities + self.availability + self.capacity
    }

    pub fn rounded(&self) -> Self {
        Self {
            budget: round2(self.budget),
            rating: round2(self.rating),
            amenities: round2(self.amenities),
            availability: round2(self.availability),
            capacity: round2(self.capacity),
        }
    }
}

/// Ranked recommendation: the listing plus its match score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub score: f64,
    /// Same value as `score`; existing clients read this name
    #[serde(rename = "recommendationScore")]
    pub recommendation_score: f64,
    #[serde(rename = "scoreBreakdown")]
    pub score_breakdown: ScoreBreakdown,
}

impl ScoredListing {
    /// Attach the rounded score; ordering must already have used the raw value
    pub fn new(listing: Listing, raw_score: f64, breakdown: ScoreBreakdown) -> Self {
        let score = round2(raw_score);
        Self {
            listing,
            score,
            recommendation_score: score,
            score_breakdown: breakdown.rounded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_amenity_from_label() {
        assert_eq!(Amenity::from_label("WiFi"), Some(Amenity::Wifi));
        assert_eq!(Amenity::from_label("Air Conditioning"), Some(Amenity::Ac));
        assert_eq!(Amenity::from_label("power-backup"), Some(Amenity::PowerBackup));
        assert_eq!(Amenity::from_label("Food Available"), Some(Amenity::Food));
        assert_eq!(Amenity::from_label("jacuzzi"), None);
    }

    #[test]
    fn test_amenity_labels_round_trip() {
        for amenity in Amenity::ALL {
            assert_eq!(Amenity::from_label(amenity.label()), Some(amenity));
            assert_eq!(Amenity::from_label(amenity.key()), Some(amenity));
        }
    }

    #[test]
    fn test_property_type_aliases() {
        assert_eq!("PG".parse::<PropertyType>().unwrap(), PropertyType::Pg);
        assert_eq!("others".parse::<PropertyType>().unwrap(), PropertyType::Other);
        assert_eq!("villa".parse::<PropertyType>().unwrap(), PropertyType::Other);
        assert!("castle".parse::<PropertyType>().is_err());
    }

    #[test]
    fn test_listing_from_flag_map_document() {
        let listing: Listing = serde_json::from_value(json!({
            "_id": {"$oid": "65f0c1"},
            "title": "Modern PG",
            "location": "Madhapur",
            "city": "Hyderabad",
            "price": 4500,
            "property_type": "pg",
            "propertyType": "pg",
            "capacity": 10,
            "vacancies": 3,
            "rating": 4.2,
            "gender_preference": "female",
            "sharing_type": "double",
            "amenities": ["WiFi", "Food"],
            "amenities_object": {"wifi": true, "food": true, "ac": true, "parking": false}
        }))
        .unwrap();

        assert_eq!(listing.id, "65f0c1");
        assert_eq!(listing.name, "Modern PG");
        assert_eq!(listing.gender_preference, Gender::Female);
        assert_eq!(listing.sharing_type, SharingType::Double);
        assert_eq!(listing.amenities.keys(), vec!["wifi", "food", "ac"]);
    }

    #[test]
    fn test_listing_document_defaults() {
        let listing: Listing = serde_json::from_value(json!({
            "id": "r1",
            "name": "Bare Hostel",
            "location": "Pune",
            "price": 3000
        }))
        .unwrap();

        assert_eq!(listing.capacity, 1);
        assert_eq!(listing.vacancies, 0);
        assert_eq!(listing.rating, 0.0);
        assert!(!listing.is_rated());
        assert_eq!(listing.sharing_type, SharingType::Shared);
        assert_eq!(listing.gender_preference, Gender::Unisex);
        assert_eq!(listing.property_type, PropertyType::Pg);
        assert!(listing.amenities.is_empty());
    }

    #[test]
    fn test_counts_accept_float_numbers() {
        let listing: Listing = serde_json::from_value(json!({
            "id": "r3",
            "name": "Float Counts PG",
            "location": "Pune",
            "price": 4000,
            "capacity": 4.0,
            "vacancies": 2.0
        }))
        .unwrap();
        assert_eq!(listing.capacity, 4);
        assert_eq!(listing.vacancies, 2);

        assert_eq!(clamp_count(2.7), 2);
        assert_eq!(clamp_count(-3.0), 0);
        assert_eq!(clamp_count(f64::NAN), 0);
        assert_eq!(clamp_count(1e12), u32::MAX);
    }

    #[test]
    fn test_canonical_listing_round_trip() {
        let listing: Listing = serde_json::from_value(json!({
            "id": "r2",
            "name": "Green Hostel",
            "location": "Koramangala",
            "price": 5200.0,
            "propertyType": "hostel",
            "capacity": 4,
            "vacancies": 2,
            "rating": 3.9,
            "sharingType": "triple",
            "genderPreference": "male",
            "amenities": ["wifi", "laundry"],
            "isSelected": true
        }))
        .unwrap();

        let encoded = serde_json::to_value(&listing).unwrap();
        let decoded: Listing = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, listing);
    }

    #[test]
    fn test_signature_normalizes_location() {
        let a = PreferenceQuery {
            location: Some("  Hyderabad ".to_string()),
            ..Default::default()
        };
        let b = PreferenceQuery {
            location: Some("hyderabad".to_string()),
            ..Default::default()
        };
        assert_eq!(a.signature(), b.signature());

        let c = PreferenceQuery {
            max_budget: Some(5000.0),
            ..Default::default()
        };
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(2.4999999999999996), 2.5);
        assert_eq!(round2(71.456), 71.46);
    }
}
