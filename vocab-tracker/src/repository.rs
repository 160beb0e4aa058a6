use crate::{
    definition::parse_definition,
    error::AppError,
    model::{DifficultyFilter, NewWord, Profile, QuizScore, UserId, Word, WordId, WordPatch},
    quiz::Score,
    session::Session,
    storage::{Order, Storage, WordQuery, WordRecord},
};

/// Unfiltered recency views show at most this many words.
pub const RECENT_CAP: u32 = 12;
pub const MAX_WORD_LEN: usize = 100;
pub const MAX_DEFINITION_LEN: usize = 1000;
pub const MAX_EXAMPLE_LEN: usize = 500;
const RECENT_SCORES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordOrder {
    #[default]
    Newest,
    Alphabetical,
}

/// Filter and search state of a word listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordFilter {
    pub difficulty: DifficultyFilter,
    pub search: Option<String>,
    pub owner: Option<UserId>,
    pub limit: Option<u32>,
    pub order: WordOrder,
}

impl WordFilter {
    /// Home view: newest first, capped unless searching.
    pub fn recent(search: Option<&str>) -> Self {
        let search = normalize_search(search);
        Self {
            limit: if search.is_none() { Some(RECENT_CAP) } else { None },
            search,
            ..Default::default()
        }
    }

    pub fn browse(difficulty: DifficultyFilter, search: Option<&str>) -> Self {
        Self {
            difficulty,
            search: normalize_search(search),
            order: WordOrder::Alphabetical,
            ..Default::default()
        }
    }

    /// Every word eligible for a quiz; never capped.
    pub fn quiz_pool(difficulty: DifficultyFilter) -> Self {
        Self {
            difficulty,
            ..Default::default()
        }
    }

    pub fn owned_by(user: UserId) -> Self {
        Self {
            owner: Some(user),
            ..Default::default()
        }
    }

    fn to_query(&self) -> WordQuery {
        WordQuery {
            difficulty: self.difficulty.difficulty(),
            word_contains: self.search.clone(),
            owner: self.owner,
            created_since: None,
            order: match self.order {
                WordOrder::Newest => Order::Newest,
                WordOrder::Alphabetical => Order::Alphabetical,
            },
            limit: self.limit,
        }
    }
}

fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone)]
pub struct ProfileSummary {
    pub profile: Profile,
    pub word_count: usize,
    pub quizzes_taken: i64,
    pub recent_scores: Vec<QuizScore>,
    pub words: Vec<Word>,
}

/// Checks length limits and normalizes a submitted word for storage.
pub fn validate(new_word: NewWord) -> Result<WordRecord, AppError> {
    let word = new_word.word.trim().to_lowercase();
    let definition = new_word.definition.trim().to_owned();
    let example_sentence = new_word
        .example_sentence
        .map(|example| example.trim().to_owned())
        .filter(|example| !example.is_empty());
    if word.is_empty() || definition.is_empty() {
        return Err(AppError::Invalid("Word and definition are required.".into()));
    }
    if word.chars().count() > MAX_WORD_LEN
        || definition.chars().count() > MAX_DEFINITION_LEN
        || example_sentence
            .as_ref()
            .is_some_and(|example| example.chars().count() > MAX_EXAMPLE_LEN)
    {
        return Err(AppError::Invalid("Input too long.".into()));
    }
    let senses = new_word
        .senses
        .filter(|senses| !senses.is_empty())
        .unwrap_or_else(|| parse_definition(&definition));
    Ok(WordRecord {
        word,
        definition,
        senses,
        example_sentence,
        difficulty: new_word.difficulty,
    })
}

#[derive(Clone)]
pub struct WordRepository {
    storage: Storage,
}

impl WordRepository {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub async fn list(&self, filter: &WordFilter) -> Result<Vec<Word>, AppError> {
        self.storage
            .select_words(&filter.to_query())
            .await
            .map_err(|error| {
                tracing::warn!(%error, ?filter, "word listing failed");
                AppError::FetchFailed(error)
            })
    }

    pub async fn count(&self, filter: &WordFilter) -> Result<i64, AppError> {
        self.storage
            .count_words(&filter.to_query())
            .await
            .map_err(AppError::FetchFailed)
    }

    pub async fn get(&self, id: WordId) -> Result<Option<Word>, AppError> {
        self.storage
            .select_word(id)
            .await
            .map_err(AppError::FetchFailed)
    }

    pub async fn add(&self, session: &Session, new_word: NewWord) -> Result<Word, AppError> {
        let user = session.require_user()?;
        let record = validate(new_word)?;
        let word = self
            .storage
            .insert_word(Some(user.id), &record)
            .await
            .map_err(AppError::from_write)?;
        tracing::info!(word = %word.word, id = %word.id, user = %user.id, "added word");
        Ok(word)
    }

    pub async fn update(
        &self,
        session: &Session,
        id: WordId,
        mut patch: WordPatch,
    ) -> Result<Word, AppError> {
        let user = session.require_user()?;
        if let Some(definition) = patch.definition.as_mut() {
            *definition = definition.trim().to_owned();
            if definition.is_empty() {
                return Err(AppError::Invalid("Definition is required.".into()));
            }
            if definition.chars().count() > MAX_DEFINITION_LEN {
                return Err(AppError::Invalid("Input too long.".into()));
            }
        }
        if let Some(example) = patch.example_sentence.as_mut() {
            *example = example
                .take()
                .map(|text| text.trim().to_owned())
                .filter(|text| !text.is_empty());
            if example
                .as_ref()
                .is_some_and(|text| text.chars().count() > MAX_EXAMPLE_LEN)
            {
                return Err(AppError::Invalid("Input too long.".into()));
            }
        }
        let senses = patch.definition.as_deref().map(parse_definition);
        self.storage
            .update_word(id, user.id, &patch, senses.as_deref())
            .await
            .map_err(AppError::from_write)
    }

    pub async fn remove(&self, session: &Session, id: WordId) -> Result<(), AppError> {
        let user = session.require_user()?;
        self.storage
            .delete_word(id, user.id)
            .await
            .map_err(AppError::from_write)?;
        tracing::info!(%id, user = %user.id, "removed word");
        Ok(())
    }

    pub async fn record_quiz_score(
        &self,
        session: &Session,
        score: Score,
        filter: DifficultyFilter,
    ) -> Result<QuizScore, AppError> {
        let user = session.require_user()?;
        self.storage
            .insert_quiz_score(
                user.id,
                score.correct as i64,
                score.total as i64,
                filter.as_str(),
            )
            .await
            .map_err(AppError::from_write)
    }

    pub async fn profile_summary(&self, session: &Session) -> Result<ProfileSummary, AppError> {
        let user = session.require_user()?;
        let owned = WordFilter::owned_by(user.id).to_query();
        let (profile, words, quizzes_taken, recent_scores) = futures::try_join!(
            self.storage.select_profile(user.id),
            self.storage.select_words(&owned),
            self.storage.count_quiz_scores(user.id),
            self.storage.select_quiz_scores(user.id, RECENT_SCORES),
        )
        .map_err(AppError::FetchFailed)?;
        Ok(ProfileSummary {
            profile: profile.unwrap_or_else(|| user.clone()),
            word_count: words.len(),
            quizzes_taken,
            recent_scores,
            words,
        })
    }
}
