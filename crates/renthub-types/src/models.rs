use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of property a listing advertises. Stored in SQLite as the
/// SCREAMING_SNAKE_CASE wire string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Apartment,
    House,
    Room,
    Studio,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Apartment => "APARTMENT",
            PropertyType::House => "HOUSE",
            PropertyType::Room => "ROOM",
            PropertyType::Studio => "STUDIO",
            PropertyType::Commercial => "COMMERCIAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "APARTMENT" => Some(PropertyType::Apartment),
            "HOUSE" => Some(PropertyType::House),
            "ROOM" => Some(PropertyType::Room),
            "STUDIO" => Some(PropertyType::Studio),
            "COMMERCIAL" => Some(PropertyType::Commercial),
            _ => None,
        }
    }
}

/// Which slice of the listings table a list query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingScope {
    Mine,
    Public,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOption {
    Recent,
    Popular,
}

impl Default for SortOption {
    fn default() -> Self {
        SortOption::Recent
    }
}

/// Which database the admin surface talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbTarget {
    Local,
    Prod,
}

impl Default for DbTarget {
    fn default() -> Self {
        DbTarget::Local
    }
}

/// A listing as the dashboard sees it: the stored row annotated with the
/// like count and whether the requesting viewer has liked it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub price: i64,
    pub property_type: PropertyType,
    pub area: f64,
    pub rooms: Option<i64>,
    pub floor: Option<i64>,
    pub total_floors: Option<i64>,
    pub city: String,
    pub district: Option<String>,
    pub address: String,
    /// Data-URI encoded photos, capped at 10.
    pub images: Vec<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub show_contacts: bool,
    pub is_public: bool,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
    pub liked_by_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_type_roundtrip() {
        for ty in [
            PropertyType::Apartment,
            PropertyType::House,
            PropertyType::Room,
            PropertyType::Studio,
            PropertyType::Commercial,
        ] {
            assert_eq!(PropertyType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(PropertyType::parse("CASTLE"), None);
    }

    #[test]
    fn scope_and_sort_wire_names() {
        assert_eq!(
            serde_json::to_string(&ListingScope::Favorites).unwrap(),
            "\"favorites\""
        );
        assert_eq!(
            serde_json::from_str::<SortOption>("\"popular\"").unwrap(),
            SortOption::Popular
        );
        assert_eq!(
            serde_json::from_str::<DbTarget>("\"prod\"").unwrap(),
            DbTarget::Prod
        );
    }
}
