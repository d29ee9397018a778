//! Persistence for reprocess requests.
//!
//! Uses SQLx with SQLite. The store is deliberately dumb: every status
//! transition is a bulk update issued by the service, which owns the
//! state machine. A `UNIQUE(user_id, search_query)` constraint backs
//! the at-most-one-request-per-query invariant at the schema level.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::Result;
use crate::model::{Page, ReprocessStatus, SearchReprocess, join_genres};

/// SQLx-backed store for [`SearchReprocess`] rows.
#[derive(Clone)]
pub struct ReprocessStore {
    pool: SqlitePool,
}

impl ReprocessStore {
    /// Wrap an existing pool and run migrations.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Connect to a SQLite URL (e.g. `sqlite:cratedig.db`), creating the
    /// database file if needed, and run migrations.
    pub async fn connect(db_url: &str) -> Result<Self> {
        if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
            sqlx::Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        Self::new(pool).await
    }

    /// Insert a new request in `NOT_FOUND`.
    pub async fn create(
        &self,
        search_query: &str,
        collection_id: Option<i64>,
        genres: &BTreeSet<String>,
        user_id: i64,
    ) -> Result<SearchReprocess> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO search_reprocess
                (search_query, user_id, collection_id, genres, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(search_query)
        .bind(user_id)
        .bind(collection_id)
        .bind(join_genres(genres))
        .bind(ReprocessStatus::NotFound)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(self
            .find_by_id(result.last_insert_rowid())
            .await?
            .expect("inserted row must exist"))
    }

    /// Fetch a request by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<SearchReprocess>> {
        let row = sqlx::query_as::<_, SearchReprocess>(
            "SELECT * FROM search_reprocess WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Fetch the request for an exact `(user, query)` pair, if any.
    pub async fn find_by_user_and_query(
        &self,
        user_id: i64,
        search_query: &str,
    ) -> Result<Option<SearchReprocess>> {
        let row = sqlx::query_as::<_, SearchReprocess>(
            "SELECT * FROM search_reprocess WHERE user_id = ? AND search_query = ?",
        )
        .bind(user_id)
        .bind(search_query)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// One page of a user's requests in the given status, ordered by id.
    ///
    /// Fetches one row beyond the page size to learn whether another
    /// page follows.
    pub async fn find_by_user_and_status(
        &self,
        user_id: i64,
        status: ReprocessStatus,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SearchReprocess>> {
        let mut items = sqlx::query_as::<_, SearchReprocess>(
            r#"
            SELECT * FROM search_reprocess
            WHERE user_id = ? AND status = ?
            ORDER BY id
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(status)
        .bind(i64::from(page_size) + 1)
        .bind(i64::from(page) * i64::from(page_size))
        .fetch_all(&self.pool)
        .await?;

        let has_next = items.len() > page_size as usize;
        items.truncate(page_size as usize);
        Ok(Page { items, has_next })
    }

    /// Distinct users owning at least one request in the given status.
    pub async fn users_with_status(&self, status: ReprocessStatus) -> Result<Vec<i64>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT DISTINCT user_id FROM search_reprocess WHERE status = ? ORDER BY user_id",
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(user_id,)| user_id).collect())
    }

    /// Mark the given requests `FOUND` at the given instant.
    pub async fn set_found(&self, ids: &HashSet<i64>, found_at: DateTime<Utc>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "UPDATE search_reprocess SET status = ?, found_at = ?, updated_at = ? WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(ReprocessStatus::Found)
            .bind(found_at)
            .bind(Utc::now());
        for id in ids {
            query = query.bind(*id);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    /// Mark the given requests `DOWNLOADED` at the given instant.
    pub async fn set_downloaded(
        &self,
        ids: &HashSet<i64>,
        downloaded_at: DateTime<Utc>,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "UPDATE search_reprocess SET status = ?, downloaded_at = ?, updated_at = ? WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(ReprocessStatus::Downloaded)
            .bind(downloaded_at)
            .bind(Utc::now());
        for id in ids {
            query = query.bind(*id);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    /// Re-arm a single request to `NOT_FOUND`, clearing `found_at`.
    pub async fn set_not_found_by_id(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE search_reprocess SET status = ?, found_at = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(ReprocessStatus::NotFound)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Consistency repair: revert every `FOUND` request of this user
    /// whose id is NOT in `keep_ids` back to `NOT_FOUND`.
    pub async fn reset_found_except(&self, user_id: i64, keep_ids: &HashSet<i64>) -> Result<()> {
        if keep_ids.is_empty() {
            return self.reset_found_for_user(user_id).await;
        }
        let sql = format!(
            r#"
            UPDATE search_reprocess SET status = ?, found_at = NULL, updated_at = ?
            WHERE user_id = ? AND status = ? AND id NOT IN ({})
            "#,
            placeholders(keep_ids.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(ReprocessStatus::NotFound)
            .bind(Utc::now())
            .bind(user_id)
            .bind(ReprocessStatus::Found);
        for id in keep_ids {
            query = query.bind(*id);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }

    /// Consistency repair: revert all of this user's `FOUND` requests to
    /// `NOT_FOUND`.
    pub async fn reset_found_for_user(&self, user_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE search_reprocess SET status = ?, found_at = NULL, updated_at = ?
            WHERE user_id = ? AND status = ?
            "#,
        )
        .bind(ReprocessStatus::NotFound)
        .bind(Utc::now())
        .bind(user_id)
        .bind(ReprocessStatus::Found)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Bump the retry counter for every request in the set.
    pub async fn increment_retries(&self, ids: &HashSet<i64>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "UPDATE search_reprocess SET retries = retries + 1, updated_at = ? WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql).bind(Utc::now());
        for id in ids {
            query = query.bind(*id);
        }
        query.execute(&self.pool).await?;
        Ok(())
    }
}

/// `?, ?, ...` for a dynamic IN clause.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
