use chrono::NaiveDateTime;
use sqlx::{
    migrate::MigrateDatabase, query, query_as, query_scalar, sqlite::SqlitePoolOptions, FromRow,
    Pool, QueryBuilder, Sqlite, SqlitePool,
};
use thiserror::Error;

use crate::model::{Difficulty, Profile, QuizScore, Sense, UserId, Word, WordId, WordPatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record violates a uniqueness constraint")]
    UniqueViolation,
    #[error("record not found")]
    NotFound,
    #[error("not allowed to modify this record")]
    Unauthorized,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation,
            sqlx::Error::RowNotFound => StoreError::NotFound,
            _ => StoreError::Database(error),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Newest,
    Alphabetical,
}

/// Field filters understood by the `words` collection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordQuery {
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive substring of `word`.
    pub word_contains: Option<String>,
    pub owner: Option<UserId>,
    pub created_since: Option<NaiveDateTime>,
    pub order: Order,
    pub limit: Option<u32>,
}

/// Validated word ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordRecord {
    pub word: String,
    pub definition: String,
    pub senses: Vec<Sense>,
    pub example_sentence: Option<String>,
    pub difficulty: Difficulty,
}

/// Projection used by the admin statistics.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct WordStat {
    pub id: WordId,
    pub difficulty: Difficulty,
    pub created_at: NaiveDateTime,
    pub user_id: Option<UserId>,
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn initialize(database_url: &str) -> sqlx::Result<Self> {
        if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            tracing::info!(%database_url, "creating database");
            Sqlite::create_database(database_url).await?;
        }
        let pool = SqlitePool::connect(database_url).await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }

    /// Private database living as long as the returned storage.
    pub async fn in_memory() -> sqlx::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }

    /// Closes the pool; every later query fails.
    #[cfg(test)]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_word_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &WordQuery) {
    builder.push(" WHERE 1 = 1");
    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ").push_bind(difficulty);
    }
    if let Some(text) = filter.word_contains.as_deref() {
        builder
            .push(" AND word LIKE ")
            .push_bind(escape_like(&text.to_lowercase()))
            .push(" ESCAPE '\\'");
    }
    if let Some(owner) = filter.owner {
        builder.push(" AND user_id = ").push_bind(owner);
    }
    if let Some(since) = filter.created_since {
        builder.push(" AND created_at >= ").push_bind(since);
    }
}

// words
impl Storage {
    pub async fn select_words(&self, filter: &WordQuery) -> StoreResult<Vec<Word>> {
        let mut builder = QueryBuilder::new("SELECT * FROM words");
        push_word_filters(&mut builder, filter);
        builder.push(match filter.order {
            Order::Newest => " ORDER BY created_at DESC, id DESC",
            Order::Alphabetical => " ORDER BY word ASC, id ASC",
        });
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }
        let words = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(words)
    }

    pub async fn count_words(&self, filter: &WordQuery) -> StoreResult<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM words");
        push_word_filters(&mut builder, filter);
        let count = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn select_word(&self, id: WordId) -> StoreResult<Option<Word>> {
        let word = query_as("SELECT * FROM words WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(word)
    }

    pub async fn insert_word(
        &self,
        owner: Option<UserId>,
        record: &WordRecord,
    ) -> StoreResult<Word> {
        let word = query_as(
            "INSERT INTO words(word, definition, senses, example_sentence, difficulty, created_at, user_id)
             VALUES(?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(&record.word)
        .bind(&record.definition)
        .bind(sqlx::types::Json(&record.senses))
        .bind(&record.example_sentence)
        .bind(record.difficulty)
        .bind(chrono::Utc::now().naive_utc())
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;
        Ok(word)
    }

    async fn owned_word(&self, id: WordId, owner: UserId) -> StoreResult<Word> {
        let word = self.select_word(id).await?.ok_or(StoreError::NotFound)?;
        if word.owner != Some(owner) {
            return Err(StoreError::Unauthorized);
        }
        Ok(word)
    }

    /// Applies the patch to a word owned by `owner`. `senses` replaces the
    /// stored structure whenever the definition changes.
    pub async fn update_word(
        &self,
        id: WordId,
        owner: UserId,
        patch: &WordPatch,
        senses: Option<&[Sense]>,
    ) -> StoreResult<Word> {
        let current = self.owned_word(id, owner).await?;
        if patch.is_empty() {
            return Ok(current);
        }
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE words SET ");
        let mut set = builder.separated(", ");
        if let Some(definition) = &patch.definition {
            set.push("definition = ").push_bind_unseparated(definition.clone());
        }
        if let Some(senses) = senses {
            set.push("senses = ")
                .push_bind_unseparated(sqlx::types::Json(senses.to_vec()));
        }
        if let Some(example) = &patch.example_sentence {
            set.push("example_sentence = ").push_bind_unseparated(example.clone());
        }
        if let Some(difficulty) = patch.difficulty {
            set.push("difficulty = ").push_bind_unseparated(difficulty);
        }
        builder.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
        let word = builder.build_query_as().fetch_one(&self.pool).await?;
        Ok(word)
    }

    pub async fn delete_word(&self, id: WordId, owner: UserId) -> StoreResult<()> {
        self.owned_word(id, owner).await?;
        query("DELETE FROM words WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn select_word_stats(&self) -> StoreResult<Vec<WordStat>> {
        let stats = query_as("SELECT id, difficulty, created_at, user_id FROM words")
            .fetch_all(&self.pool)
            .await?;
        Ok(stats)
    }
}

// quiz scores
impl Storage {
    pub async fn insert_quiz_score(
        &self,
        user: UserId,
        score: i64,
        total: i64,
        difficulty: &str,
    ) -> StoreResult<QuizScore> {
        let score = query_as(
            "INSERT INTO quiz_scores(user_id, score, total, difficulty, created_at)
             VALUES(?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(user)
        .bind(score)
        .bind(total)
        .bind(difficulty)
        .bind(chrono::Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await?;
        Ok(score)
    }

    pub async fn select_quiz_scores(
        &self,
        user: UserId,
        limit: u32,
    ) -> StoreResult<Vec<QuizScore>> {
        let scores = query_as(
            "SELECT * FROM quiz_scores WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(scores)
    }

    pub async fn count_quiz_scores(&self, user: UserId) -> StoreResult<i64> {
        let count = query_scalar("SELECT COUNT(*) FROM quiz_scores WHERE user_id = ?")
            .bind(user)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// profiles
impl Storage {
    pub async fn insert_profile(&self, display_name: Option<&str>) -> StoreResult<Profile> {
        let profile = query_as(
            "INSERT INTO profiles(display_name, created_at) VALUES(?, ?) RETURNING *",
        )
        .bind(display_name)
        .bind(chrono::Utc::now().naive_utc())
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn select_profile(&self, id: UserId) -> StoreResult<Option<Profile>> {
        let profile = query_as("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn select_profile_by_name(&self, display_name: &str) -> StoreResult<Option<Profile>> {
        let profile = query_as("SELECT * FROM profiles WHERE display_name = ?")
            .bind(display_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn select_profiles(&self, ids: &[UserId]) -> StoreResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM profiles WHERE id IN (");
        let mut list = builder.separated(", ");
        for id in ids {
            list.push_bind(*id);
        }
        builder.push(")");
        let profiles = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(profiles)
    }

    pub async fn count_profiles(&self) -> StoreResult<i64> {
        let count = query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
