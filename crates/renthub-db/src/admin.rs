//! Generic row CRUD over tables that are only known at request time.
//!
//! The one security-relevant rule here: identifiers are quote-escaped
//! before they touch SQL text, values never are — they always travel as
//! bound parameters. Callers allow-list table names against a fresh
//! introspection before every mutating call.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, params_from_iter};
use thiserror::Error;

use renthub_types::models::DbTarget;

use crate::introspect::{self, TableColumn};

pub const PAGE_SIZE: i64 = 10;

pub const LOCAL_DB_ENV: &str = "RENTHUB_DB_PATH";
pub const PROD_DB_ENV: &str = "RENTHUB_DB_PATH_PROD";

#[derive(Debug, Error)]
pub enum AdminError {
    /// The env var holding the selected target's database path is unset.
    #[error("{0} is not set")]
    Configuration(&'static str),

    #[error("table {0} is not allowed")]
    TableNotAllowed(String),

    #[error("unknown table {0}")]
    UnknownTable(String),

    #[error("unknown column {0}")]
    UnknownColumn(String),

    #[error("field {0} is required")]
    MissingColumn(String),

    #[error("invalid {kind} value in {column}")]
    InvalidValue { column: String, kind: &'static str },

    #[error("no columns provided for {0}")]
    EmptyChangeSet(&'static str),

    #[error("primary key is required for {0}")]
    MissingPrimaryKey(&'static str),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Database paths the admin surface may open, one per target.
/// Each call opens a fresh connection and drops it afterwards; the admin
/// surface holds no long-lived handles.
#[derive(Debug, Clone, Default)]
pub struct AdminTargets {
    local: Option<PathBuf>,
    prod: Option<PathBuf>,
}

impl AdminTargets {
    pub fn new(local: Option<PathBuf>, prod: Option<PathBuf>) -> Self {
        Self { local, prod }
    }

    pub fn from_env() -> Self {
        Self::new(
            env::var_os(LOCAL_DB_ENV).map(PathBuf::from),
            env::var_os(PROD_DB_ENV).map(PathBuf::from),
        )
    }

    pub fn open(&self, target: DbTarget) -> Result<Connection, AdminError> {
        let (path, env_name) = match target {
            DbTarget::Local => (self.local.as_ref(), LOCAL_DB_ENV),
            DbTarget::Prod => (self.prod.as_ref(), PROD_DB_ENV),
        };
        let path = path.ok_or(AdminError::Configuration(env_name))?;
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

enum TypeClass {
    Bool,
    Number,
    Date,
    Text,
}

fn type_class(declared: &str) -> TypeClass {
    let normalized = declared.to_ascii_lowercase();
    if normalized.contains("bool") {
        TypeClass::Bool
    } else if ["int", "numeric", "decimal", "real", "double"]
        .iter()
        .any(|kind| normalized.contains(kind))
    {
        TypeClass::Number
    } else if normalized.contains("timestamp") || normalized.contains("date") {
        TypeClass::Date
    } else {
        TypeClass::Text
    }
}

/// Coerce one raw form value into a bindable SQLite value, keyed on the
/// column's declared type.
pub fn coerce_value(column: &TableColumn, raw: &str) -> Result<Value, AdminError> {
    match type_class(&column.data_type) {
        TypeClass::Bool => match raw {
            "on" | "true" => Ok(Value::Integer(1)),
            "false" => Ok(Value::Integer(0)),
            _ => Err(AdminError::InvalidValue {
                column: column.name.clone(),
                kind: "boolean",
            }),
        },
        TypeClass::Number => {
            if let Ok(int) = raw.parse::<i64>() {
                Ok(Value::Integer(int))
            } else if let Ok(real) = raw.parse::<f64>() {
                Ok(Value::Real(real))
            } else {
                Err(AdminError::InvalidValue {
                    column: column.name.clone(),
                    kind: "numeric",
                })
            }
        }
        TypeClass::Date => match parse_datetime(raw) {
            Some(stamp) => Ok(Value::Text(stamp.format("%Y-%m-%d %H:%M:%S").to_string())),
            None => Err(AdminError::InvalidValue {
                column: column.name.clone(),
                kind: "date",
            }),
        },
        TypeClass::Text => Ok(Value::Text(raw.to_string())),
    }
}

/// Accepts RFC 3339 plus the formats an HTML datetime-local / date input
/// produces.
fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.naive_utc());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(stamp);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64, AdminError> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// One page of rows, newest-by-order-column first, as JSON objects.
pub fn fetch_rows(
    conn: &Connection,
    table: &str,
    order_column: &str,
    page: i64,
) -> Result<Vec<serde_json::Value>, AdminError> {
    let columns = introspect::list_columns(conn, table)?;
    if !columns.iter().any(|column| column.name == order_column) {
        return Err(AdminError::UnknownColumn(order_column.to_string()));
    }

    let offset = (page.max(1) - 1) * PAGE_SIZE;
    let sql = format!(
        "SELECT * FROM {} ORDER BY {} DESC LIMIT {PAGE_SIZE} OFFSET {offset}",
        quote_ident(table),
        quote_ident(order_column),
    );

    let mut stmt = conn.prepare(&sql)?;
    let names: Vec<String> = stmt.column_names().iter().map(|name| name.to_string()).collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = serde_json::Map::new();
        for (idx, name) in names.iter().enumerate() {
            object.insert(name.clone(), value_ref_to_json(row.get_ref(idx)?));
        }
        out.push(serde_json::Value::Object(object));
    }
    Ok(out)
}

fn value_ref_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(int) => serde_json::Value::from(int),
        ValueRef::Real(real) => serde_json::Number::from_f64(real)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(text) => serde_json::Value::from(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => serde_json::Value::from(B64.encode(blob)),
    }
}

/// Insert a row assembled from raw form values. Empty strings mean "not
/// supplied". Fails — before any statement reaches the database — when a
/// non-nullable, no-default column is missing a value.
pub fn insert_row(
    conn: &Connection,
    table: &str,
    data: &HashMap<String, String>,
) -> Result<(), AdminError> {
    let columns = introspect::list_columns(conn, table)?;

    let mut names: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    for column in &columns {
        let Some(raw) = data.get(&column.name) else { continue };
        if raw.is_empty() {
            continue;
        }
        values.push(coerce_value(column, raw)?);
        names.push(column.name.clone());
    }

    for column in &columns {
        let required = column.notnull && column.default.is_none();
        if required && !names.contains(&column.name) {
            return Err(AdminError::MissingColumn(column.name.clone()));
        }
    }

    if names.is_empty() {
        return Err(AdminError::EmptyChangeSet("insert"));
    }

    let quoted: Vec<String> = names.iter().map(|name| quote_ident(name)).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|idx| format!("?{idx}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        quoted.join(", "),
        placeholders.join(", "),
    );
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(())
}

/// Update the row whose primary key equals `id`. The primary-key column
/// itself is never part of the change set.
pub fn update_row(
    conn: &Connection,
    table: &str,
    primary_key: &str,
    id: &str,
    data: &HashMap<String, String>,
) -> Result<(), AdminError> {
    let columns = introspect::list_columns(conn, table)?;
    let Some(pk_column) = columns.iter().find(|column| column.name == primary_key) else {
        return Err(AdminError::UnknownColumn(primary_key.to_string()));
    };

    let mut assignments: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    for column in &columns {
        if column.name == primary_key {
            continue;
        }
        let Some(raw) = data.get(&column.name) else { continue };
        if raw.is_empty() {
            continue;
        }
        values.push(coerce_value(column, raw)?);
        assignments.push(format!("{} = ?{}", quote_ident(&column.name), values.len()));
    }

    if assignments.is_empty() {
        return Err(AdminError::EmptyChangeSet("update"));
    }

    values.push(coerce_value(pk_column, id)?);
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?{}",
        quote_ident(table),
        assignments.join(", "),
        quote_ident(primary_key),
        values.len(),
    );
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(())
}

pub fn delete_row(
    conn: &Connection,
    table: &str,
    primary_key: &str,
    id: &str,
) -> Result<(), AdminError> {
    let columns = introspect::list_columns(conn, table)?;
    let Some(pk_column) = columns.iter().find(|column| column.name == primary_key) else {
        return Err(AdminError::UnknownColumn(primary_key.to_string()));
    };

    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1",
        quote_ident(table),
        quote_ident(primary_key),
    );
    conn.execute(&sql, [coerce_value(pk_column, id)?])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE notes (
                id          INTEGER PRIMARY KEY,
                title       TEXT NOT NULL,
                body        TEXT,
                done        BOOLEAN NOT NULL DEFAULT 0,
                score       NUMERIC,
                created_at  TIMESTAMP
            );
            CREATE TABLE freeform (label TEXT);
            ",
        )
        .unwrap();
        conn
    }

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn insert_requires_non_nullable_no_default_columns() {
        let conn = scratch();
        let err = insert_row(&conn, "notes", &data(&[("body", "text")])).unwrap_err();
        assert!(matches!(err, AdminError::MissingColumn(name) if name == "title"));
        // Nothing reached the database.
        assert_eq!(count_rows(&conn, "notes").unwrap(), 0);
    }

    #[test]
    fn insert_coerces_per_declared_type() {
        let conn = scratch();
        insert_row(
            &conn,
            "notes",
            &data(&[
                ("title", "Запись"),
                ("done", "on"),
                ("score", "3.5"),
                ("created_at", "2024-03-04T10:30"),
            ]),
        )
        .unwrap();

        let rows = fetch_rows(&conn, "notes", "id", 1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "Запись");
        assert_eq!(rows[0]["done"], 1);
        assert_eq!(rows[0]["score"], 3.5);
        assert_eq!(rows[0]["created_at"], "2024-03-04 10:30:00");
    }

    #[test]
    fn empty_string_means_not_supplied() {
        let conn = scratch();
        insert_row(&conn, "notes", &data(&[("title", "Пусто"), ("body", "")])).unwrap();
        let rows = fetch_rows(&conn, "notes", "id", 1).unwrap();
        assert!(rows[0]["body"].is_null());
    }

    #[test]
    fn bad_values_are_rejected_by_kind() {
        let conn = scratch();
        let bool_err =
            insert_row(&conn, "notes", &data(&[("title", "x"), ("done", "maybe")])).unwrap_err();
        assert!(
            matches!(bool_err, AdminError::InvalidValue { column, kind } if column == "done" && kind == "boolean")
        );

        let num_err =
            insert_row(&conn, "notes", &data(&[("title", "x"), ("score", "heaps")])).unwrap_err();
        assert!(
            matches!(num_err, AdminError::InvalidValue { column, kind } if column == "score" && kind == "numeric")
        );

        let date_err = insert_row(
            &conn,
            "notes",
            &data(&[("title", "x"), ("created_at", "yesterday")]),
        )
        .unwrap_err();
        assert!(
            matches!(date_err, AdminError::InvalidValue { column, kind } if column == "created_at" && kind == "date")
        );

        assert_eq!(count_rows(&conn, "notes").unwrap(), 0);
    }

    #[test]
    fn update_rejects_empty_change_set() {
        let conn = scratch();
        insert_row(&conn, "notes", &data(&[("title", "До")])).unwrap();
        let err = update_row(&conn, "notes", "id", "1", &data(&[])).unwrap_err();
        assert!(matches!(err, AdminError::EmptyChangeSet("update")));
    }

    #[test]
    fn update_and_delete_by_primary_key() {
        let conn = scratch();
        insert_row(&conn, "notes", &data(&[("title", "До")])).unwrap();

        update_row(&conn, "notes", "id", "1", &data(&[("title", "После")])).unwrap();
        let rows = fetch_rows(&conn, "notes", "id", 1).unwrap();
        assert_eq!(rows[0]["title"], "После");

        delete_row(&conn, "notes", "id", "1").unwrap();
        assert_eq!(count_rows(&conn, "notes").unwrap(), 0);
    }

    #[test]
    fn fetch_rows_pages_descending() {
        let conn = scratch();
        for i in 1..=15 {
            let title = format!("n{i}");
            insert_row(&conn, "notes", &data(&[("title", title.as_str())])).unwrap();
        }

        let first = fetch_rows(&conn, "notes", "id", 1).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0]["id"], 15);

        let second = fetch_rows(&conn, "notes", "id", 2).unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[4]["id"], 1);
    }

    #[test]
    fn unknown_order_column_is_rejected() {
        let conn = scratch();
        let err = fetch_rows(&conn, "notes", "id; DROP TABLE notes", 1).unwrap_err();
        assert!(matches!(err, AdminError::UnknownColumn(_)));
    }

    #[test]
    fn table_without_primary_key_reports_none() {
        let conn = scratch();
        assert_eq!(
            crate::introspect::primary_key_column(&conn, "freeform").unwrap(),
            None
        );
    }

    #[test]
    fn unset_target_is_a_configuration_error() {
        let targets = AdminTargets::new(Some(PathBuf::from(":memory:")), None);
        assert!(targets.open(DbTarget::Local).is_ok());
        let err = targets.open(DbTarget::Prod).unwrap_err();
        assert!(matches!(err, AdminError::Configuration(name) if name == PROD_DB_ENV));
    }
}
