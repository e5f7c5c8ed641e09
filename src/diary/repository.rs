// Repository pattern - isolates all database side effects for trade entries
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use thiserror::Error;

use crate::db::models::Diary;
use crate::error::AppError;
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => AppError::Pool(e),
            RepositoryError::Sql(e) => AppError::Database(e),
        }
    }
}

/// Validated fields for a new entry.
#[derive(Debug, Clone)]
pub struct NewDiary {
    pub pair: String,
    pub direction: String,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub pips: Option<f64>,
    pub notes: Option<String>,
    pub image: Option<String>,
    pub date: String,
}

#[async_trait]
pub trait DiaryRepository: Send + Sync {
    async fn create(&self, user_id: &str, entry: NewDiary) -> Result<Diary, RepositoryError>;

    /// Entries for a user, newest date first, optionally narrowed to one pair.
    async fn list(&self, user_id: &str, pair: Option<&str>) -> Result<Vec<Diary>, RepositoryError>;

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Diary>, RepositoryError>;

    /// Write back every mutable field of `entry`. Returns the stored row, or None if
    /// it doesn't exist for this user.
    async fn update(&self, entry: &Diary) -> Result<Option<Diary>, RepositoryError>;

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteDiaryRepository {
    pool: DbPool,
}

impl SqliteDiaryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiaryRepository for SqliteDiaryRepository {
    async fn create(&self, user_id: &str, entry: NewDiary) -> Result<Diary, RepositoryError> {
        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();

        conn.execute(
            "INSERT INTO diaries
               (id, user_id, pair, direction, entry_price, exit_price, pips, notes, image, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                user_id,
                entry.pair,
                entry.direction,
                entry.entry_price,
                entry.exit_price,
                entry.pips,
                entry.notes,
                entry.image,
                entry.date,
            ],
        )?;

        let diary = conn.query_row(
            &format!("SELECT {} FROM diaries WHERE id = ?1", Diary::COLUMNS),
            params![id],
            Diary::from_row,
        )?;
        Ok(diary)
    }

    async fn list(&self, user_id: &str, pair: Option<&str>) -> Result<Vec<Diary>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM diaries
             WHERE user_id = ?1 AND (?2 IS NULL OR pair = ?2)
             ORDER BY date DESC, created_at DESC, rowid DESC",
            Diary::COLUMNS
        ))?;

        let entries = stmt
            .query_map(params![user_id, pair], Diary::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn get(&self, user_id: &str, id: &str) -> Result<Option<Diary>, RepositoryError> {
        let conn = self.pool.get()?;
        let diary = conn
            .query_row(
                &format!(
                    "SELECT {} FROM diaries WHERE id = ?1 AND user_id = ?2",
                    Diary::COLUMNS
                ),
                params![id, user_id],
                Diary::from_row,
            )
            .optional()?;
        Ok(diary)
    }

    async fn update(&self, entry: &Diary) -> Result<Option<Diary>, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE diaries SET
               pair = ?1, direction = ?2, entry_price = ?3, exit_price = ?4, pips = ?5,
               notes = ?6, image = ?7, date = ?8, updated_at = datetime('now')
             WHERE id = ?9 AND user_id = ?10",
            params![
                entry.pair,
                entry.direction,
                entry.entry_price,
                entry.exit_price,
                entry.pips,
                entry.notes,
                entry.image,
                entry.date,
                entry.id,
                entry.user_id,
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }

        let diary = conn.query_row(
            &format!("SELECT {} FROM diaries WHERE id = ?1", Diary::COLUMNS),
            params![entry.id],
            Diary::from_row,
        )?;
        Ok(Some(diary))
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM diaries WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }
}
