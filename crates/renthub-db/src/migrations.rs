use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE TABLE listings (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                content         TEXT NOT NULL,
                price           INTEGER NOT NULL CHECK (price >= 1),
                property_type   TEXT NOT NULL,
                area            REAL NOT NULL CHECK (area > 0),
                rooms           INTEGER,
                floor           INTEGER,
                total_floors    INTEGER,
                city            TEXT NOT NULL,
                district        TEXT,
                address         TEXT NOT NULL,
                images          TEXT NOT NULL DEFAULT '[]',
                contact_phone   TEXT,
                contact_email   TEXT,
                show_contacts   INTEGER NOT NULL DEFAULT 0,
                is_public       INTEGER NOT NULL DEFAULT 0,
                is_favorite     INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
            );

            CREATE INDEX idx_listings_owner
                ON listings(owner_id, created_at);
            CREATE INDEX idx_listings_public
                ON listings(is_public, created_at);

            CREATE TABLE likes (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                listing_id  TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                UNIQUE(user_id, listing_id)
            );

            CREATE INDEX idx_likes_listing
                ON likes(listing_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
