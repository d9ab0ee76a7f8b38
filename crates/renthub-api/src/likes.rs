use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::error;
use uuid::Uuid;

use renthub_db::models::LikeOutcome;
use renthub_types::api::{Claims, LikeResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// POST /api/renthub/{id}/like
///
/// Toggle the caller's like on a public listing and report the settled
/// state plus the recomputed count. The storage layer runs the whole
/// flip in one transaction, so rapid duplicate clicks each flip exactly
/// once and the response always reflects current truth.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<LikeResponse>, ApiError> {
    let db = state.clone();
    let like_id = Uuid::new_v4().to_string();
    let listing_id = id.to_string();
    let user_id = claims.sub.to_string();

    let outcome = tokio::task::spawn_blocking(move || {
        db.db.toggle_like(&like_id, &listing_id, &user_id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    match outcome {
        LikeOutcome::NotFound => Err(ApiError::NotFound),
        LikeOutcome::Private => Err(ApiError::Forbidden),
        LikeOutcome::Toggled { liked, likes_count } => {
            state.cache.invalidate();
            Ok(Json(LikeResponse { liked, likes_count }))
        }
    }
}
