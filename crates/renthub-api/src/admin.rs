//! The view-db surface: ad-hoc CRUD over whatever tables the selected
//! database happens to contain. Table names are allow-listed against a
//! fresh introspection on every call, including the mutating ones, so
//! the check can never go stale between requests.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use renthub_db::admin::{self, AdminError};
use renthub_db::introspect::{self, TableColumn};
use renthub_types::api::{
    AdminColumn, AdminOverviewResponse, AdminRowDeleteRequest, AdminRowUpsertRequest,
    AdminTableView, Claims, InputKind,
};
use renthub_types::models::DbTarget;

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub db: DbTarget,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// GET /api/view-db — table list plus, when a known table is selected,
/// everything the generic CRUD form needs: columns with input kinds,
/// primary key, row page.
pub async fn view_db(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<AdminOverviewResponse>, ApiError> {
    let targets = state.admin.clone();
    let overview = tokio::task::spawn_blocking(
        move || -> Result<AdminOverviewResponse, AdminError> {
        let conn = targets.open(query.db)?;
        let tables = introspect::list_tables(&conn)?;

        // An unknown table in the query string just deselects, it is not
        // an error on the read path.
        let selected = match query.table {
            Some(ref table) if tables.contains(table) => {
                let page = query.page.max(1);
                let columns = introspect::list_columns(&conn, table)?;
                let primary_key = columns
                    .iter()
                    .filter(|column| column.pk > 0)
                    .min_by_key(|column| column.pk)
                    .map(|column| column.name.clone());
                let total_rows = admin::count_rows(&conn, table)?;
                let order = primary_key
                    .clone()
                    .or_else(|| columns.first().map(|column| column.name.clone()))
                    .unwrap_or_else(|| "id".to_string());
                let rows = admin::fetch_rows(&conn, table, &order, page)?;

                Some(AdminTableView {
                    table: table.clone(),
                    columns: columns.into_iter().map(admin_column).collect(),
                    primary_key,
                    total_rows,
                    page,
                    max_page: ((total_rows + admin::PAGE_SIZE - 1) / admin::PAGE_SIZE).max(1),
                    rows,
                })
            }
            _ => None,
        };

        Ok(AdminOverviewResponse {
            db: query.db,
            tables,
            selected,
        })
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    Ok(Json(overview))
}

/// POST /api/view-db/rows
pub async fn create_row(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<AdminRowUpsertRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let targets = state.admin.clone();
    tokio::task::spawn_blocking(move || -> Result<(), AdminError> {
        let conn = targets.open(req.db)?;
        allow_table(&conn, &req.table)?;
        admin::insert_row(&conn, &req.table, &req.values)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}

/// PUT /api/view-db/rows
pub async fn update_row(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<AdminRowUpsertRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = req
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("id", "primary key value is required"))?
        .to_string();

    let targets = state.admin.clone();
    tokio::task::spawn_blocking(move || -> Result<(), AdminError> {
        let conn = targets.open(req.db)?;
        allow_table(&conn, &req.table)?;
        let primary_key = introspect::primary_key_column(&conn, &req.table)?
            .ok_or(AdminError::MissingPrimaryKey("update"))?;
        admin::update_row(&conn, &req.table, &primary_key, &id, &req.values)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    Ok(Json(json!({ "ok": true })))
}

/// DELETE /api/view-db/rows
pub async fn delete_row(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<AdminRowDeleteRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.id.is_empty() {
        return Err(ApiError::validation("id", "primary key value is required"));
    }

    let targets = state.admin.clone();
    tokio::task::spawn_blocking(move || -> Result<(), AdminError> {
        let conn = targets.open(req.db)?;
        allow_table(&conn, &req.table)?;
        let primary_key = introspect::primary_key_column(&conn, &req.table)?
            .ok_or(AdminError::MissingPrimaryKey("delete"))?;
        admin::delete_row(&conn, &req.table, &primary_key, &req.id)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    Ok(Json(json!({ "ok": true })))
}

fn allow_table(conn: &rusqlite::Connection, table: &str) -> Result<(), AdminError> {
    let tables = introspect::list_tables(conn)?;
    if !tables.iter().any(|name| name == table) {
        return Err(AdminError::TableNotAllowed(table.to_string()));
    }
    Ok(())
}

/// Map a declared column type onto the form input that edits it.
fn input_kind(data_type: &str) -> InputKind {
    let normalized = data_type.to_ascii_lowercase();
    if normalized.contains("bool") {
        InputKind::Checkbox
    } else if ["int", "numeric", "decimal", "real", "double"]
        .iter()
        .any(|kind| normalized.contains(kind))
    {
        InputKind::Number
    } else if normalized.contains("timestamp") || normalized.contains("date") {
        InputKind::DatetimeLocal
    } else {
        InputKind::Text
    }
}

fn admin_column(column: TableColumn) -> AdminColumn {
    let placeholder = match (&column.default, column.notnull) {
        (Some(default), _) => format!("default: {default}"),
        (None, false) => "optional".to_string(),
        (None, true) => "required".to_string(),
    };
    AdminColumn {
        input: input_kind(&column.data_type),
        placeholder,
        name: column.name,
        data_type: column.data_type,
        nullable: !column.notnull,
        default: column.default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AppStateInner;
    use crate::cache::ListingCache;
    use renthub_db::Database;
    use renthub_db::admin::AdminTargets;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;
    use uuid::Uuid;

    struct TempDb {
        path: PathBuf,
    }

    impl TempDb {
        fn new() -> Self {
            let path =
                std::env::temp_dir().join(format!("renthub-admin-test-{}.db", Uuid::new_v4()));
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(
                "
                CREATE TABLE gadgets (
                    id      INTEGER PRIMARY KEY,
                    name    TEXT NOT NULL,
                    broken  BOOLEAN NOT NULL DEFAULT 0
                );
                CREATE TABLE freeform (label TEXT);
                ",
            )
            .unwrap();
            Self { path }
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    fn test_state(temp: &TempDb) -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".to_string(),
            admin: AdminTargets::new(Some(temp.path.clone()), None),
            cache: ListingCache::default(),
        })
    }

    fn claims() -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            username: "operator".to_string(),
            exp: usize::MAX,
        }
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn overview(state: &AppState, table: Option<&str>) -> AdminOverviewResponse {
        let Json(response) = view_db(
            State(state.clone()),
            Extension(claims()),
            Query(AdminQuery {
                db: DbTarget::Local,
                table: table.map(str::to_string),
                page: 1,
            }),
        )
        .await
        .unwrap();
        response
    }

    #[tokio::test]
    async fn overview_lists_tables_and_builds_forms() {
        let temp = TempDb::new();
        let state = test_state(&temp);

        let response = overview(&state, Some("gadgets")).await;
        assert_eq!(response.tables, vec!["freeform", "gadgets"]);

        let view = response.selected.expect("gadgets should be selected");
        assert_eq!(view.primary_key.as_deref(), Some("id"));
        assert_eq!(view.max_page, 1);

        let inputs: Vec<InputKind> = view.columns.iter().map(|c| c.input).collect();
        assert_eq!(
            inputs,
            vec![InputKind::Number, InputKind::Text, InputKind::Checkbox]
        );
        assert_eq!(view.columns[1].placeholder, "required");
        assert_eq!(view.columns[2].placeholder, "default: 0");
    }

    #[tokio::test]
    async fn unknown_table_is_deselected_not_an_error() {
        let temp = TempDb::new();
        let state = test_state(&temp);
        let response = overview(&state, Some("no_such_table")).await;
        assert!(response.selected.is_none());
    }

    #[tokio::test]
    async fn insert_missing_required_column_names_it() {
        let temp = TempDb::new();
        let state = test_state(&temp);

        let err = create_row(
            State(state.clone()),
            Extension(claims()),
            Json(AdminRowUpsertRequest {
                db: DbTarget::Local,
                table: "gadgets".to_string(),
                id: None,
                values: values(&[("broken", "on")]),
            }),
        )
        .await
        .err()
        .expect("expected a validation error");
        assert!(matches!(err, ApiError::Validation { ref field, .. } if field == "name"));

        let response = overview(&state, Some("gadgets")).await;
        assert_eq!(response.selected.unwrap().total_rows, 0);
    }

    #[tokio::test]
    async fn full_crud_round_trip() {
        let temp = TempDb::new();
        let state = test_state(&temp);

        create_row(
            State(state.clone()),
            Extension(claims()),
            Json(AdminRowUpsertRequest {
                db: DbTarget::Local,
                table: "gadgets".to_string(),
                id: None,
                values: values(&[("name", "widget"), ("broken", "on")]),
            }),
        )
        .await
        .unwrap();

        let view = overview(&state, Some("gadgets")).await.selected.unwrap();
        assert_eq!(view.total_rows, 1);
        assert_eq!(view.rows[0]["name"], "widget");
        assert_eq!(view.rows[0]["broken"], 1);

        update_row(
            State(state.clone()),
            Extension(claims()),
            Json(AdminRowUpsertRequest {
                db: DbTarget::Local,
                table: "gadgets".to_string(),
                id: Some("1".to_string()),
                values: values(&[("broken", "false")]),
            }),
        )
        .await
        .unwrap();

        let view = overview(&state, Some("gadgets")).await.selected.unwrap();
        assert_eq!(view.rows[0]["broken"], 0);

        delete_row(
            State(state.clone()),
            Extension(claims()),
            Json(AdminRowDeleteRequest {
                db: DbTarget::Local,
                table: "gadgets".to_string(),
                id: "1".to_string(),
            }),
        )
        .await
        .unwrap();

        let view = overview(&state, Some("gadgets")).await.selected.unwrap();
        assert_eq!(view.total_rows, 0);
    }

    #[tokio::test]
    async fn mutations_reject_unlisted_tables() {
        let temp = TempDb::new();
        let state = test_state(&temp);

        let err = create_row(
            State(state.clone()),
            Extension(claims()),
            Json(AdminRowUpsertRequest {
                db: DbTarget::Local,
                table: "sqlite_master".to_string(),
                id: None,
                values: values(&[("name", "x")]),
            }),
        )
        .await
        .err()
        .expect("expected a query error");
        assert!(matches!(err, ApiError::Query(_)));
    }

    #[tokio::test]
    async fn update_without_primary_key_fails() {
        let temp = TempDb::new();
        let state = test_state(&temp);

        let err = update_row(
            State(state.clone()),
            Extension(claims()),
            Json(AdminRowUpsertRequest {
                db: DbTarget::Local,
                table: "freeform".to_string(),
                id: Some("1".to_string()),
                values: values(&[("label", "x")]),
            }),
        )
        .await
        .err()
        .expect("expected a validation error");
        assert!(matches!(err, ApiError::Validation { ref field, .. } if field == "id"));
    }

    #[tokio::test]
    async fn unset_target_reports_configuration_error() {
        let temp = TempDb::new();
        let state = test_state(&temp);

        let err = view_db(
            State(state.clone()),
            Extension(claims()),
            Query(AdminQuery {
                db: DbTarget::Prod,
                table: None,
                page: 1,
            }),
        )
        .await
        .err()
        .expect("expected a configuration error");
        assert!(matches!(err, ApiError::Configuration(_)));
    }
}
