use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use renthub_db::models::{ListingDraft, ListingRow};
use renthub_db::queries::ListingPageRequest;
use renthub_types::api::{Claims, CreateListingRequest, ListingListResponse, ToggleRequest};
use renthub_types::models::{Listing, ListingScope, PropertyType, SortOption};

use crate::auth::AppState;
use crate::cache::CacheKey;
use crate::error::ApiError;
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub scope: Option<ListingScope>,
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default)]
    pub sort: SortOption,
}

fn default_page() -> i64 {
    1
}

/// GET /api/renthub — one page of listings for a scope, served from the
/// cache when nothing has been mutated since it was rendered.
pub async fn list_listings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListingListResponse>, ApiError> {
    let scope = query.scope.unwrap_or(ListingScope::Mine);
    let viewer = claims.sub.to_string();

    let key = CacheKey {
        scope,
        viewer: Some(viewer.clone()),
        query: query.q.clone(),
        page: query.page,
        sort: query.sort,
    };
    if let Some(hit) = state.cache.get(&key) {
        return Ok(Json(hit));
    }

    let db = state.clone();
    let search = query.q.clone();
    let (page, sort) = (query.page, query.sort);
    let result = tokio::task::spawn_blocking(move || {
        db.db.list_listings(&ListingPageRequest {
            scope,
            viewer: Some(&viewer),
            search: &search,
            page,
            sort,
        })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    let response = ListingListResponse {
        items: result.items.into_iter().map(row_to_listing).collect(),
        total: result.total,
        page_count: result.page_count,
    };
    state.cache.put(key, response.clone());
    Ok(Json(response))
}

/// POST /api/renthub
pub async fn create_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<Listing>), ApiError> {
    validate::validate_listing(&req)?;

    let id = Uuid::new_v4();
    let draft = draft_from(&req);

    let db = state.clone();
    let id_text = id.to_string();
    let owner = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || {
        db.db.insert_listing(&id_text, &owner, &draft)?;
        db.db.get_listing(&id_text, Some(&owner))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??
    .ok_or(ApiError::NotFound)?;

    state.cache.invalidate();
    Ok((StatusCode::CREATED, Json(row_to_listing(row))))
}

/// PUT /api/renthub/{id} — full replace, owner only.
pub async fn update_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateListingRequest>,
) -> Result<Json<Listing>, ApiError> {
    validate::validate_listing(&req)?;

    let draft = draft_from(&req);
    let db = state.clone();
    let id_text = id.to_string();
    let caller = claims.sub.to_string();
    let outcome = tokio::task::spawn_blocking(move || -> anyhow::Result<UpdateOutcome> {
        let Some(existing) = db.db.get_listing(&id_text, Some(&caller))? else {
            return Ok(UpdateOutcome::NotFound);
        };
        if existing.owner_id != caller {
            return Ok(UpdateOutcome::Forbidden);
        }
        db.db.update_listing(&id_text, &draft)?;
        match db.db.get_listing(&id_text, Some(&caller))? {
            Some(row) => Ok(UpdateOutcome::Updated(row)),
            None => Ok(UpdateOutcome::NotFound),
        }
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    match outcome {
        UpdateOutcome::NotFound => Err(ApiError::NotFound),
        UpdateOutcome::Forbidden => Err(ApiError::Forbidden),
        UpdateOutcome::Updated(row) => {
            state.cache.invalidate();
            Ok(Json(row_to_listing(row)))
        }
    }
}

enum UpdateOutcome {
    NotFound,
    Forbidden,
    Updated(ListingRow),
}

/// DELETE /api/renthub/{id} — owner only.
pub async fn delete_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    guarded_mutation(&state, id, &claims, |db, id| db.delete_listing(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/renthub/{id}/public — owner only.
pub async fn toggle_public(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleRequest>,
) -> Result<StatusCode, ApiError> {
    guarded_mutation(&state, id, &claims, move |db, id| db.set_public(id, req.value)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/renthub/{id}/favorite — owner only.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleRequest>,
) -> Result<StatusCode, ApiError> {
    guarded_mutation(&state, id, &claims, move |db, id| db.set_favorite(id, req.value)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Shared skeleton of the owner-gated mutations: load, check ownership,
/// mutate, invalidate cached pages.
async fn guarded_mutation<F>(
    state: &AppState,
    id: Uuid,
    claims: &Claims,
    mutate: F,
) -> Result<(), ApiError>
where
    F: FnOnce(&renthub_db::Database, &str) -> anyhow::Result<()> + Send + 'static,
{
    let db = state.clone();
    let id_text = id.to_string();
    let caller = claims.sub.to_string();

    let outcome = tokio::task::spawn_blocking(move || -> anyhow::Result<MutationOutcome> {
        let Some(existing) = db.db.get_listing(&id_text, None)? else {
            return Ok(MutationOutcome::NotFound);
        };
        if existing.owner_id != caller {
            return Ok(MutationOutcome::Forbidden);
        }
        mutate(&db.db, &id_text)?;
        Ok(MutationOutcome::Done)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    match outcome {
        MutationOutcome::NotFound => Err(ApiError::NotFound),
        MutationOutcome::Forbidden => Err(ApiError::Forbidden),
        MutationOutcome::Done => {
            state.cache.invalidate();
            Ok(())
        }
    }
}

enum MutationOutcome {
    NotFound,
    Forbidden,
    Done,
}

fn draft_from(req: &CreateListingRequest) -> ListingDraft {
    ListingDraft {
        title: req.title.clone(),
        content: req.content.clone(),
        price: req.price,
        property_type: req.property_type.as_str().to_string(),
        area: req.area,
        rooms: req.rooms,
        floor: req.floor,
        total_floors: req.total_floors,
        city: req.city.clone(),
        district: req.district.clone(),
        address: req.address.clone(),
        images: serde_json::to_string(&req.images).unwrap_or_else(|_| "[]".to_string()),
        contact_phone: req.contact_phone.clone(),
        contact_email: req.contact_email.clone(),
        show_contacts: req.show_contacts,
        is_public: req.is_public,
    }
}

/// Convert a storage row into the API shape, tolerating corrupt stored
/// data the same way the rest of the read path does: log and default.
pub(crate) fn row_to_listing(row: ListingRow) -> Listing {
    let images: Vec<String> = serde_json::from_str(&row.images).unwrap_or_else(|e| {
        warn!("Corrupt images payload on listing '{}': {}", row.id, e);
        Vec::new()
    });

    let property_type = PropertyType::parse(&row.property_type).unwrap_or_else(|| {
        warn!(
            "Corrupt property_type '{}' on listing '{}'",
            row.property_type, row.id
        );
        PropertyType::Apartment
    });

    Listing {
        id: parse_uuid(&row.id, "id", &row.id),
        owner_id: parse_uuid(&row.owner_id, "owner_id", &row.id),
        title: row.title,
        content: row.content,
        price: row.price,
        property_type,
        area: row.area,
        rooms: row.rooms,
        floor: row.floor,
        total_floors: row.total_floors,
        city: row.city,
        district: row.district,
        address: row.address,
        images,
        contact_phone: row.contact_phone,
        contact_email: row.contact_email,
        show_contacts: row.show_contacts,
        is_public: row.is_public,
        is_favorite: row.is_favorite,
        created_at: parse_timestamp(&row.created_at, &row.id),
        updated_at: parse_timestamp(&row.updated_at, &row.id),
        likes_count: row.likes_count,
        liked_by_me: row.liked_by_viewer,
    }
}

fn parse_uuid(raw: &str, what: &str, listing_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on listing '{}': {}", what, raw, listing_id, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str, listing_id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS[.SSS]"
            // without a timezone. Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on listing '{}': {}", raw, listing_id, e);
            DateTime::default()
        })
}
