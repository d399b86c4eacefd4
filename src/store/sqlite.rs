//! SQLite-backed metadata store

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use snafu::{OptionExt, ResultExt};
use std::sync::{Mutex, MutexGuard};

use super::{
    ContentItem, Direction, IdOutOfRangeSnafu, ItemId, ItemQuery, MetadataStore, OpenSnafu,
    OrderBy, Result, SqliteSnafu, StoreError,
};

/// Single connection guarded by a mutex (single writer)
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context(OpenSnafu { path })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context(OpenSnafu { path: ":memory:" })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_db(&conn).context(SqliteSnafu {
            action: "creating tables",
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY,
            content_type TEXT NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'publish',
            published_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_items_type ON items(content_type, status);
        CREATE TABLE IF NOT EXISTS item_meta (
            item_id INTEGER NOT NULL,
            meta_key TEXT NOT NULL,
            meta_value TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (item_id, meta_key)
        );
        ",
    )?;
    Ok(())
}

// RFC 3339 with a fixed shape so text order equals time order
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ContentItem> {
    let status: String = row.get(3)?;
    let published_at: String = row.get(4)?;

    Ok(ContentItem {
        id: ItemId::try_from(row.get::<_, i64>(0)?)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?,
        content_type: row.get(1)?,
        title: row.get(2)?,
        status: status
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        published_at: DateTime::parse_from_rfc3339(&published_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
    })
}

/// Ids above `i64::MAX` would wrap and sort as negatives
fn sql_id(id: ItemId) -> Result<i64> {
    i64::try_from(id).ok().context(IdOutOfRangeSnafu { id })
}

fn clamp_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl MetadataStore for SqliteStore {
    fn get(&self, id: ItemId, key: &str) -> Result<Option<String>> {
        let id = sql_id(id)?;
        let conn = self.lock()?;
        conn.query_row(
            "SELECT meta_value FROM item_meta WHERE item_id = ?1 AND meta_key = ?2",
            params![id, key],
            |r| r.get::<_, String>(0),
        )
        .optional()
        .context(SqliteSnafu {
            action: "reading metadata",
        })
    }

    fn set(&self, id: ItemId, key: &str, value: &str) -> Result<()> {
        let id = sql_id(id)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO item_meta (item_id, meta_key, meta_value) VALUES (?1, ?2, ?3)
             ON CONFLICT(item_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
            params![id, key, value],
        )
        .context(SqliteSnafu {
            action: "writing metadata",
        })?;
        Ok(())
    }

    fn delete(&self, id: ItemId, key: &str) -> Result<()> {
        let id = sql_id(id)?;
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM item_meta WHERE item_id = ?1 AND meta_key = ?2",
            params![id, key],
        )
        .context(SqliteSnafu {
            action: "deleting metadata",
        })?;
        Ok(())
    }

    fn query(&self, query: &ItemQuery) -> Result<Vec<ContentItem>> {
        let mut sql = String::from(
            "SELECT i.id, i.content_type, i.title, i.status, i.published_at FROM items i",
        );
        let mut args: Vec<String> = Vec::new();

        if let OrderBy::MetaNumeric { key, .. } = &query.order_by {
            args.push(key.clone());
            sql.push_str(&format!(
                " LEFT JOIN item_meta m ON m.item_id = i.id AND m.meta_key = ?{}",
                args.len()
            ));
        }

        args.push(query.content_type.clone());
        sql.push_str(&format!(" WHERE i.content_type = ?{}", args.len()));

        if !query.statuses.is_empty() {
            let mut placeholders = Vec::with_capacity(query.statuses.len());
            for status in &query.statuses {
                args.push(status.as_str().to_string());
                placeholders.push(format!("?{}", args.len()));
            }
            sql.push_str(&format!(" AND i.status IN ({})", placeholders.join(", ")));
        }

        // CAST reads leading digits and yields 0 for text without them
        match &query.order_by {
            OrderBy::Default => sql.push_str(" ORDER BY i.published_at DESC, i.id DESC"),
            OrderBy::MetaNumeric { direction, .. } => {
                let dir = match direction {
                    Direction::Desc => "DESC",
                    Direction::Asc => "ASC",
                };
                sql.push_str(&format!(
                    " ORDER BY MAX(CAST(COALESCE(m.meta_value, '0') AS INTEGER), 0) {dir}, \
                     i.published_at DESC, i.id DESC"
                ));
            }
        }

        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            clamp_i64(query.limit),
            clamp_i64(query.offset)
        ));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).context(SqliteSnafu {
            action: "preparing item query",
        })?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), item_from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .context(SqliteSnafu {
                action: "querying items",
            })?;

        tracing::debug!(
            content_type = %query.content_type,
            returned = items.len(),
            "Item query"
        );
        Ok(items)
    }

    fn upsert_item(&self, item: &ContentItem) -> Result<()> {
        let id = sql_id(item.id)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO items (id, content_type, title, status, published_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                content_type = excluded.content_type,
                title = excluded.title,
                status = excluded.status,
                published_at = excluded.published_at",
            params![
                id,
                item.content_type,
                item.title,
                item.status.as_str(),
                format_time(&item.published_at)
            ],
        )
        .context(SqliteSnafu {
            action: "writing item",
        })?;
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> Result<Option<ContentItem>> {
        let id = sql_id(id)?;
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, content_type, title, status, published_at FROM items WHERE id = ?1",
            params![id],
            item_from_row,
        )
        .optional()
        .context(SqliteSnafu {
            action: "reading item",
        })
    }

    fn remove_item(&self, id: ItemId) -> Result<bool> {
        let id = sql_id(id)?;
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().context(SqliteSnafu {
            action: "starting transaction",
        })?;

        tx.execute("DELETE FROM item_meta WHERE item_id = ?1", params![id])
            .context(SqliteSnafu {
                action: "deleting item metadata",
            })?;
        let removed = tx
            .execute("DELETE FROM items WHERE id = ?1", params![id])
            .context(SqliteSnafu {
                action: "deleting item",
            })?;

        tx.commit().context(SqliteSnafu {
            action: "committing item removal",
        })?;
        Ok(removed > 0)
    }
}
