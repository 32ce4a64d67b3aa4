use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tariffscan_core::ParsedItem;

pub type DbPool = Pool<Sqlite>;

/// Row cap for listing and search.
pub const DEFAULT_LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRecord {
    pub id: i64,
    pub hs_code: String,
    pub item_name: String,
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn item(&self) -> ParsedItem {
        ParsedItem::new(self.hs_code.clone(), self.item_name.clone())
    }
}

type ScanRow = (i64, String, String, String, DateTime<Utc>);

fn to_record(r: ScanRow) -> ScanRecord {
    ScanRecord {
        id: r.0,
        hs_code: r.1,
        item_name: r.2,
        raw_text: r.3,
        created_at: r.4,
    }
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hs_code TEXT NOT NULL,
            item_name TEXT NOT NULL,
            raw_text TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scans_created_at ON scans(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn save_scan(
    pool: &DbPool,
    item: &ParsedItem,
    raw_text: &str,
    at: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO scans (hs_code, item_name, raw_text, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&item.hs_code)
    .bind(&item.item_name)
    .bind(raw_text)
    .bind(at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Saves a batch atomically; either every item lands or none do.
pub async fn save_scans(
    pool: &DbPool,
    items: &[ParsedItem],
    raw_text: &str,
    at: DateTime<Utc>,
) -> Result<Vec<i64>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(items.len());

    for item in items {
        let result = sqlx::query(
            "INSERT INTO scans (hs_code, item_name, raw_text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&item.hs_code)
        .bind(&item.item_name)
        .bind(raw_text)
        .bind(at)
        .execute(&mut *tx)
        .await?;
        ids.push(result.last_insert_rowid());
    }

    tx.commit().await?;
    tracing::debug!(count = ids.len(), "scans saved");
    Ok(ids)
}

/// Newest first.
pub async fn latest_scans(pool: &DbPool, limit: i64) -> Result<Vec<ScanRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ScanRow>(
        "SELECT id, hs_code, item_name, raw_text, created_at FROM scans ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(to_record).collect())
}

/// `%` and `_` in user input match themselves.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Substring match on either code or name, newest first.
pub async fn search_scans(pool: &DbPool, query: &str) -> Result<Vec<ScanRecord>, sqlx::Error> {
    let pattern = format!("%{}%", escape_like(query.trim()));
    let rows = sqlx::query_as::<_, ScanRow>(
        r"SELECT id, hs_code, item_name, raw_text, created_at FROM scans
          WHERE hs_code LIKE ? ESCAPE '\' OR item_name LIKE ? ESCAPE '\'
          ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(&pattern)
    .bind(&pattern)
    .bind(DEFAULT_LIST_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(to_record).collect())
}

/// Returns the number of rows removed.
pub async fn clear_scans(pool: &DbPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM scans").execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn count_scans(pool: &DbPool) -> Result<i64, sqlx::Error> {
    let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM scans")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
