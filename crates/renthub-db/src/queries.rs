use anyhow::{Result, bail};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, TransactionBehavior, named_params, params, params_from_iter};

use renthub_types::models::{ListingScope, SortOption};

use crate::Database;
use crate::models::{LikeOutcome, ListingDraft, ListingRow, UserRow};

pub const PAGE_SIZE: i64 = 10;

/// Columns every listing read selects, including the two derived ones.
/// `viewer_param` is the bind index of the viewer id probe feeding
/// liked_by_viewer (bound NULL when anonymous, which can never match a
/// user id).
fn listing_columns(viewer_param: usize) -> String {
    format!(
        "l.id, l.owner_id, l.title, l.content, l.price, l.property_type, \
         l.area, l.rooms, l.floor, l.total_floors, l.city, l.district, l.address, l.images, \
         l.contact_phone, l.contact_email, l.show_contacts, l.is_public, l.is_favorite, \
         l.created_at, l.updated_at, \
         (SELECT COUNT(*) FROM likes WHERE listing_id = l.id) AS likes_count, \
         EXISTS(SELECT 1 FROM likes WHERE listing_id = l.id AND user_id = ?{viewer_param}) \
         AS liked_by_viewer"
    )
}

pub struct ListingPageRequest<'a> {
    pub scope: ListingScope,
    /// Authenticated caller, when there is one. Required for the Mine and
    /// Favorites scopes; only feeds liked_by_viewer for Public.
    pub viewer: Option<&'a str>,
    pub search: &'a str,
    /// 1-indexed; values below 1 are clamped to 1.
    pub page: i64,
    pub sort: SortOption,
}

pub struct ListingPage {
    pub items: Vec<ListingRow>,
    pub total: i64,
    pub page_count: i64,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, password, created_at FROM users WHERE username = ?1",
                    [username],
                    map_user_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, password, created_at FROM users WHERE id = ?1",
                    [id],
                    map_user_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Listings --

    pub fn insert_listing(&self, id: &str, owner_id: &str, draft: &ListingDraft) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listings (id, owner_id, title, content, price, property_type, area, \
                 rooms, floor, total_floors, city, district, address, images, contact_phone, \
                 contact_email, show_contacts, is_public) \
                 VALUES (:id, :owner_id, :title, :content, :price, :property_type, :area, :rooms, \
                 :floor, :total_floors, :city, :district, :address, :images, :contact_phone, \
                 :contact_email, :show_contacts, :is_public)",
                named_params! {
                    ":id": id,
                    ":owner_id": owner_id,
                    ":title": draft.title,
                    ":content": draft.content,
                    ":price": draft.price,
                    ":property_type": draft.property_type,
                    ":area": draft.area,
                    ":rooms": draft.rooms,
                    ":floor": draft.floor,
                    ":total_floors": draft.total_floors,
                    ":city": draft.city,
                    ":district": draft.district,
                    ":address": draft.address,
                    ":images": draft.images,
                    ":contact_phone": draft.contact_phone,
                    ":contact_email": draft.contact_email,
                    ":show_contacts": draft.show_contacts,
                    ":is_public": draft.is_public,
                },
            )?;
            Ok(())
        })
    }

    pub fn get_listing(&self, id: &str, viewer: Option<&str>) -> Result<Option<ListingRow>> {
        let sql = format!(
            "SELECT {} FROM listings l WHERE l.id = ?2",
            listing_columns(1)
        );
        self.with_conn(|conn| {
            let row = conn
                .query_row(&sql, params![viewer, id], map_listing_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Full replace of the editable columns; bumps updated_at.
    pub fn update_listing(&self, id: &str, draft: &ListingDraft) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE listings SET title = :title, content = :content, price = :price, \
                 property_type = :property_type, area = :area, rooms = :rooms, floor = :floor, \
                 total_floors = :total_floors, city = :city, district = :district, \
                 address = :address, images = :images, contact_phone = :contact_phone, \
                 contact_email = :contact_email, show_contacts = :show_contacts, \
                 is_public = :is_public, \
                 updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') \
                 WHERE id = :id",
                named_params! {
                    ":id": id,
                    ":title": draft.title,
                    ":content": draft.content,
                    ":price": draft.price,
                    ":property_type": draft.property_type,
                    ":area": draft.area,
                    ":rooms": draft.rooms,
                    ":floor": draft.floor,
                    ":total_floors": draft.total_floors,
                    ":city": draft.city,
                    ":district": draft.district,
                    ":address": draft.address,
                    ":images": draft.images,
                    ":contact_phone": draft.contact_phone,
                    ":contact_email": draft.contact_email,
                    ":show_contacts": draft.show_contacts,
                    ":is_public": draft.is_public,
                },
            )?;
            Ok(())
        })
    }

    pub fn delete_listing(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM listings WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn set_public(&self, id: &str, value: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE listings SET is_public = ?1, \
                 updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') WHERE id = ?2",
                params![value, id],
            )?;
            Ok(())
        })
    }

    pub fn set_favorite(&self, id: &str, value: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE listings SET is_favorite = ?1, \
                 updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') WHERE id = ?2",
                params![value, id],
            )?;
            Ok(())
        })
    }

    /// One page of listings for a scope, with search, sort and the derived
    /// like annotations. The WHERE clause is assembled per scope; all user
    /// input travels as bound parameters.
    pub fn list_listings(&self, req: &ListingPageRequest<'_>) -> Result<ListingPage> {
        let mut where_bind: Vec<Value> = Vec::new();
        let mut where_sql = String::new();

        match req.scope {
            ListingScope::Public => where_sql.push_str("l.is_public = 1"),
            ListingScope::Mine | ListingScope::Favorites => {
                let Some(owner) = req.viewer else {
                    bail!("listing scope {:?} requires an authenticated caller", req.scope);
                };
                where_bind.push(Value::from(owner.to_string()));
                where_sql.push_str(&format!("l.owner_id = ?{}", where_bind.len()));
                if req.scope == ListingScope::Favorites {
                    where_sql.push_str(" AND l.is_favorite = 1");
                }
            }
        }

        let search = req.search.trim();
        if !search.is_empty() {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            where_bind.push(Value::from(pattern));
            let n = where_bind.len();
            where_sql.push_str(&format!(
                " AND (casefold(l.title) LIKE ?{n} ESCAPE '\\' \
                 OR casefold(l.content) LIKE ?{n} ESCAPE '\\')"
            ));
        }

        let order_sql = match req.sort {
            SortOption::Recent => "l.created_at DESC, l.id",
            SortOption::Popular => "likes_count DESC, l.created_at DESC, l.id",
        };

        let page = req.page.max(1);
        let offset = (page - 1) * PAGE_SIZE;

        // The viewer probe goes last so the count query can share the
        // WHERE bindings verbatim.
        let count_sql = format!("SELECT COUNT(*) FROM listings l WHERE {where_sql}");
        let items_sql = format!(
            "SELECT {} FROM listings l WHERE {where_sql} \
             ORDER BY {order_sql} LIMIT {PAGE_SIZE} OFFSET {offset}",
            listing_columns(where_bind.len() + 1)
        );

        let mut items_bind = where_bind.clone();
        items_bind.push(opt_text(req.viewer));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&items_sql)?;
            let items = stmt
                .query_map(params_from_iter(items_bind.iter()), map_listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let total: i64 = conn.query_row(&count_sql, params_from_iter(where_bind.iter()), |row| {
                row.get(0)
            })?;

            Ok(ListingPage {
                items,
                total,
                page_count: ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1),
            })
        })
    }

    // -- Likes --

    /// Toggle the (user, listing) like inside a single immediate
    /// transaction: existence/visibility check, flip, recount. Concurrent
    /// identical toggles serialize on the writer connection, so each call
    /// flips state exactly once and reports post-commit truth.
    pub fn toggle_like(&self, like_id: &str, listing_id: &str, user_id: &str) -> Result<LikeOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let is_public: Option<bool> = tx
                .query_row(
                    "SELECT is_public FROM listings WHERE id = ?1",
                    [listing_id],
                    |row| row.get(0),
                )
                .optional()?;

            let is_public = match is_public {
                None => return Ok(LikeOutcome::NotFound),
                Some(value) => value,
            };
            if !is_public {
                return Ok(LikeOutcome::Private);
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM likes WHERE user_id = ?1 AND listing_id = ?2",
                    params![user_id, listing_id],
                    |row| row.get(0),
                )
                .optional()?;

            let liked = match existing {
                Some(existing_id) => {
                    tx.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                    false
                }
                None => {
                    tx.execute(
                        "INSERT INTO likes (id, user_id, listing_id) VALUES (?1, ?2, ?3)",
                        params![like_id, user_id, listing_id],
                    )?;
                    true
                }
            };

            let likes_count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM likes WHERE listing_id = ?1",
                [listing_id],
                |row| row.get(0),
            )?;

            tx.commit()?;
            Ok(LikeOutcome::Toggled { liked, likes_count })
        })
    }

    pub fn like_count(&self, listing_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE listing_id = ?1",
                [listing_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_listing_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        price: row.get(4)?,
        property_type: row.get(5)?,
        area: row.get(6)?,
        rooms: row.get(7)?,
        floor: row.get(8)?,
        total_floors: row.get(9)?,
        city: row.get(10)?,
        district: row.get(11)?,
        address: row.get(12)?,
        images: row.get(13)?,
        contact_phone: row.get(14)?,
        contact_email: row.get(15)?,
        show_contacts: row.get(16)?,
        is_public: row.get(17)?,
        is_favorite: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
        likes_count: row.get(21)?,
        liked_by_viewer: row.get(22)?,
    })
}

fn opt_text(value: Option<&str>) -> Value {
    match value {
        Some(text) => Value::from(text.to_string()),
        None => Value::Null,
    }
}

/// Escape LIKE wildcards so search terms match as literal substrings.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
