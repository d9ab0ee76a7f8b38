//! Database row types — these map directly to SQLite rows.
//! Distinct from the renthub-types API models to keep the storage layer
//! independent; timestamps stay in their stored text form here.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

/// A listings row plus the two derived columns every list/get query
/// computes: total like count and whether the viewer has liked it.
pub struct ListingRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub price: i64,
    pub property_type: String,
    pub area: f64,
    pub rooms: Option<i64>,
    pub floor: Option<i64>,
    pub total_floors: Option<i64>,
    pub city: String,
    pub district: Option<String>,
    pub address: String,
    /// JSON array of data URIs, stored as text.
    pub images: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub show_contacts: bool,
    pub is_public: bool,
    pub is_favorite: bool,
    pub created_at: String,
    pub updated_at: String,
    pub likes_count: i64,
    pub liked_by_viewer: bool,
}

/// Column values for an insert or full-replace update of a listing.
/// Ids, flags and timestamps are handled by the queries themselves.
pub struct ListingDraft {
    pub title: String,
    pub content: String,
    pub price: i64,
    pub property_type: String,
    pub area: f64,
    pub rooms: Option<i64>,
    pub floor: Option<i64>,
    pub total_floors: Option<i64>,
    pub city: String,
    pub district: Option<String>,
    pub address: String,
    pub images: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub show_contacts: bool,
    pub is_public: bool,
}

/// Result of a like toggle, settled inside one transaction.
pub enum LikeOutcome {
    /// Listing does not exist.
    NotFound,
    /// Listing exists but is private; private listings cannot be liked.
    Private,
    Toggled { liked: bool, likes_count: i64 },
}
