//! SQLite-backed chapter store.
//!
//! Every [`StoreTransaction`] opened by [`SqliteStore`] wraps an
//! `sqlx::Transaction`, which rolls back when dropped without a commit.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::{ChapterStore, MangaLocks, StoreTransaction};
use crate::{
    error::{Error, Result},
    types::{Chapter, Manga},
};

const CREATE_MANGA: &str = "CREATE TABLE IF NOT EXISTS manga (
    id INTEGER PRIMARY KEY,
    source_id TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    last_update INTEGER NOT NULL DEFAULT 0
)";

const CREATE_CHAPTERS: &str = "CREATE TABLE IF NOT EXISTS chapters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    manga_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    name TEXT NOT NULL,
    scanlator TEXT,
    chapter_number REAL NOT NULL,
    date_upload INTEGER NOT NULL,
    date_fetch INTEGER NOT NULL,
    source_order INTEGER NOT NULL,
    read INTEGER NOT NULL DEFAULT 0,
    bookmarked INTEGER NOT NULL DEFAULT 0,
    last_page_read INTEGER NOT NULL DEFAULT 0,
    UNIQUE (manga_id, url)
)";

const SELECT_CHAPTERS: &str = "SELECT id, manga_id, url, name, scanlator, chapter_number,
    date_upload, date_fetch, source_order, read, bookmarked, last_page_read
    FROM chapters WHERE manga_id = ? ORDER BY source_order";

const UPSERT_LAST_UPDATE: &str = "INSERT INTO manga (id, source_id, url, title, last_update)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET last_update = excluded.last_update";

/// Chapter store backed by an SQLite database.
///
/// # Examples
///
/// ```rust,no_run
/// use hondana::store::{ChapterStore, SqliteStore};
///
/// # async fn example() -> hondana::Result<()> {
/// let store = SqliteStore::connect("sqlite://library.db").await?;
/// let chapters = store.get_chapters(1).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    locks: MangaLocks,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and its schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::with_pool(pool).await
    }

    /// Uses an existing pool, creating the schema if needed.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_MANGA).execute(&pool).await?;
        sqlx::query(CREATE_CHAPTERS).execute(&pool).await?;
        Ok(Self {
            pool,
            locks: MangaLocks::default(),
        })
    }

    /// Adds or replaces a manga record.
    pub async fn insert_manga(&self, manga: &Manga) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO manga (id, source_id, url, title, last_update)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(manga.id)
        .bind(&manga.source_id)
        .bind(&manga.url)
        .bind(&manga.title)
        .bind(manga.last_update)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns a manga record.
    pub async fn manga(&self, id: i64) -> Result<Option<Manga>> {
        let manga = sqlx::query_as::<_, Manga>(
            "SELECT id, source_id, url, title, last_update FROM manga WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(manga)
    }
}

#[async_trait]
impl ChapterStore for SqliteStore {
    async fn get_chapters(&self, manga_id: i64) -> Result<Vec<Chapter>> {
        let chapters = sqlx::query_as::<_, Chapter>(SELECT_CHAPTERS)
            .bind(manga_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(chapters)
    }

    async fn update_last_updated(&self, manga: &Manga) -> Result<()> {
        upsert_last_update(manga).execute(&self.pool).await?;
        Ok(())
    }

    async fn begin(&self, manga_id: i64) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.locks.acquire(manga_id).await;
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction {
            tx,
            _guard: guard,
            manga_id,
        }))
    }
}

fn upsert_last_update(
    manga: &Manga,
) -> sqlx::query::Query<'_, Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(UPSERT_LAST_UPDATE)
        .bind(manga.id)
        .bind(&manga.source_id)
        .bind(&manga.url)
        .bind(&manga.title)
        .bind(manga.last_update)
}

struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
    manga_id: i64,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn get_chapters(&mut self) -> Result<Vec<Chapter>> {
        let chapters = sqlx::query_as::<_, Chapter>(SELECT_CHAPTERS)
            .bind(self.manga_id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(chapters)
    }

    async fn insert_chapters(&mut self, chapters: &[Chapter]) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(chapters.len());
        for chapter in chapters {
            if chapter.manga_id != self.manga_id {
                return Err(Error::store(format!(
                    "chapter '{}' belongs to manga {}, transaction is for manga {}",
                    chapter.url, chapter.manga_id, self.manga_id
                )));
            }
            let result = sqlx::query(
                "INSERT INTO chapters (manga_id, url, name, scanlator, chapter_number,
                 date_upload, date_fetch, source_order, read, bookmarked, last_page_read)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(chapter.manga_id)
            .bind(&chapter.url)
            .bind(&chapter.name)
            .bind(&chapter.scanlator)
            .bind(chapter.chapter_number)
            .bind(chapter.date_upload)
            .bind(chapter.date_fetch)
            .bind(chapter.source_order)
            .bind(chapter.read)
            .bind(chapter.bookmarked)
            .bind(chapter.last_page_read)
            .execute(&mut *self.tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }
        Ok(ids)
    }

    async fn delete_chapters(&mut self, chapters: &[Chapter]) -> Result<()> {
        for chapter in chapters {
            sqlx::query("DELETE FROM chapters WHERE manga_id = ? AND url = ?")
                .bind(self.manga_id)
                .bind(&chapter.url)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn update_chapters(&mut self, chapters: &[Chapter]) -> Result<()> {
        for chapter in chapters {
            let id = chapter.id.ok_or_else(|| {
                Error::store(format!("cannot update unsaved chapter '{}'", chapter.url))
            })?;
            let result = sqlx::query(
                "UPDATE chapters SET url = ?, name = ?, scanlator = ?, chapter_number = ?,
                 date_upload = ?, date_fetch = ?, source_order = ?, read = ?, bookmarked = ?,
                 last_page_read = ? WHERE id = ? AND manga_id = ?",
            )
            .bind(&chapter.url)
            .bind(&chapter.name)
            .bind(&chapter.scanlator)
            .bind(chapter.chapter_number)
            .bind(chapter.date_upload)
            .bind(chapter.date_fetch)
            .bind(chapter.source_order)
            .bind(chapter.read)
            .bind(chapter.bookmarked)
            .bind(chapter.last_page_read)
            .bind(id)
            .bind(self.manga_id)
            .execute(&mut *self.tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(Error::store(format!("chapter {} is not stored", id)));
            }
        }
        Ok(())
    }

    async fn fix_source_order(&mut self, chapters: &[Chapter]) -> Result<()> {
        for chapter in chapters {
            sqlx::query("UPDATE chapters SET source_order = ? WHERE manga_id = ? AND url = ?")
                .bind(chapter.source_order)
                .bind(self.manga_id)
                .bind(&chapter.url)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn update_last_updated(&mut self, manga: &Manga) -> Result<()> {
        upsert_last_update(manga).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.commit().await?;
        debug!(manga_id = this.manga_id, "committed sqlite transaction");
        Ok(())
    }
}
