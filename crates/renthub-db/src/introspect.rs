//! Runtime discovery of table/column metadata for the view-db surface.
//! Nothing here is known at build time; the admin engine re-introspects
//! on every call so the allow-list can never go stale.

use rusqlite::Connection;

use crate::admin::AdminError;

/// One column as reported by SQLite's table_info pragma.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub name: String,
    /// Declared type from the DDL, e.g. "TEXT" or "BOOLEAN".
    pub data_type: String,
    pub notnull: bool,
    /// Default expression text, when the column has one.
    pub default: Option<String>,
    /// 1-based position within the primary key, 0 when not part of it.
    pub pk: i64,
}

/// Base tables, alphabetical, without SQLite internals.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>, AdminError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(tables)
}

/// Columns of a table in declaration order.
pub fn list_columns(conn: &Connection, table: &str) -> Result<Vec<TableColumn>, AdminError> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", dflt_value, pk \
         FROM pragma_table_info(?1) ORDER BY cid",
    )?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(TableColumn {
                name: row.get(0)?,
                data_type: row.get(1)?,
                notnull: row.get(2)?,
                default: row.get(3)?,
                pk: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // The pragma yields nothing for a name it does not know.
    if columns.is_empty() {
        return Err(AdminError::UnknownTable(table.to_string()));
    }
    Ok(columns)
}

/// First column participating in the primary key, if any.
pub fn primary_key_column(conn: &Connection, table: &str) -> Result<Option<String>, AdminError> {
    let columns = list_columns(conn, table)?;
    Ok(columns
        .into_iter()
        .filter(|column| column.pk > 0)
        .min_by_key(|column| column.pk)
        .map(|column| column.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE zebra (id INTEGER PRIMARY KEY, label TEXT);
            CREATE TABLE apple (
                code    TEXT NOT NULL,
                seq     INTEGER NOT NULL,
                note    TEXT,
                stamp   TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (code, seq)
            );
            ",
        )
        .unwrap();
        conn
    }

    #[test]
    fn tables_come_back_sorted() {
        let conn = scratch();
        assert_eq!(list_tables(&conn).unwrap(), vec!["apple", "zebra"]);
    }

    #[test]
    fn columns_keep_declaration_order_and_metadata() {
        let conn = scratch();
        let columns = list_columns(&conn, "apple").unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["code", "seq", "note", "stamp"]);

        assert!(columns[0].notnull);
        assert!(!columns[2].notnull);
        assert_eq!(columns[3].default.as_deref(), Some("CURRENT_TIMESTAMP"));
    }

    #[test]
    fn first_primary_key_column_wins() {
        let conn = scratch();
        assert_eq!(
            primary_key_column(&conn, "apple").unwrap().as_deref(),
            Some("code")
        );
        assert_eq!(
            primary_key_column(&conn, "zebra").unwrap().as_deref(),
            Some("id")
        );
    }

    #[test]
    fn unknown_table_is_an_error() {
        let conn = scratch();
        let err = list_columns(&conn, "nope").unwrap_err();
        assert!(matches!(err, AdminError::UnknownTable(name) if name == "nope"));
    }
}
