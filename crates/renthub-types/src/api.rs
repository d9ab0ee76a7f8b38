use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DbTarget, Listing, PropertyType};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the client crate.
/// Canonical definition lives here in renthub-types to eliminate
/// duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Listings --

/// Payload for creating a listing; updates reuse it as a full replace.
/// Field names match the dashboard form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub title: String,
    pub content: String,
    pub price: i64,
    pub property_type: PropertyType,
    pub area: f64,
    #[serde(default)]
    pub rooms: Option<i64>,
    #[serde(default)]
    pub floor: Option<i64>,
    #[serde(default)]
    pub total_floors: Option<i64>,
    pub city: String,
    #[serde(default)]
    pub district: Option<String>,
    pub address: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub show_contacts: bool,
    #[serde(default)]
    pub is_public: bool,
}

/// Body of the is_public / is_favorite toggle actions; the listing id
/// rides in the path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleRequest {
    pub value: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingListResponse {
    pub items: Vec<Listing>,
    pub total: i64,
    pub page_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}

// -- view-db admin --

/// Form input kind a column maps to, mirroring the admin page's
/// introspection-driven form generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    Checkbox,
    Number,
    DatetimeLocal,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub input: InputKind,
    /// "default: ..", "optional" or "required" — the form placeholder hint.
    pub placeholder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTableView {
    pub table: String,
    pub columns: Vec<AdminColumn>,
    pub primary_key: Option<String>,
    pub total_rows: i64,
    pub page: i64,
    pub max_page: i64,
    pub rows: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverviewResponse {
    pub db: DbTarget,
    pub tables: Vec<String>,
    pub selected: Option<AdminTableView>,
}

/// Raw form submission for an admin insert/update. Values arrive as the
/// strings the generated form produced; the engine coerces them per
/// introspected column type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminRowUpsertRequest {
    #[serde(default)]
    pub db: DbTarget,
    pub table: String,
    /// Present (and required) for updates: the primary-key value.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub values: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminRowDeleteRequest {
    #[serde(default)]
    pub db: DbTarget,
    pub table: String,
    pub id: String,
}
