//! Matching quiz: up to five words in one column, their definitions shuffled
//! in another, and the player pairs them up.
//!
//! `QuizSession` is the synchronous state machine (Setup -> Playing ->
//! Results). `start_quiz` and `submit_quiz` wrap it with the reads and writes
//! against the word repository.

use std::collections::BTreeMap;

use rand::Rng;
use thiserror::Error;

use crate::{
    error::AppError,
    model::{DifficultyFilter, Word, WordId},
    repository::{WordFilter, WordRepository},
    session::Session,
    shuffle::{fisher_yates, sample},
};

pub const QUIZ_SIZE: usize = 5;
pub const MIN_POOL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Playing,
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("need at least 2 words to start a quiz, found {available}")]
    InsufficientWords { available: usize },
    #[error("every word must be matched before submitting")]
    Incomplete,
    #[error("not possible while the quiz is in the {0:?} phase")]
    WrongPhase(Phase),
    #[error("word list arrived for an outdated request")]
    StaleResponse,
}

/// Entry of the definition column. `owner` is the word the text belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionCard {
    pub owner: WordId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    pub fn verdict(&self) -> &'static str {
        if self.correct == self.total {
            "Perfect score!"
        } else if self.correct * 2 > self.total {
            "Great job!"
        } else {
            "Keep practicing."
        }
    }
}

/// Ticket for a pool fetch. Only the newest ticket may start the quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRequest {
    generation: u64,
    pub filter: DifficultyFilter,
}

#[derive(Debug)]
pub struct Outcome<'a> {
    pub word: &'a Word,
    pub chosen: Option<&'a DefinitionCard>,
    pub correct: bool,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    filter: DifficultyFilter,
    phase: Phase,
    quiz_words: Vec<Word>,
    definitions: Vec<DefinitionCard>,
    selected: Option<WordId>,
    matches: BTreeMap<WordId, WordId>,
    results: Option<Score>,
    generation: u64,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(DifficultyFilter::All)
    }
}

impl QuizSession {
    pub fn new(filter: DifficultyFilter) -> Self {
        Self {
            filter,
            phase: Phase::Setup,
            quiz_words: Vec::new(),
            definitions: Vec::new(),
            selected: None,
            matches: BTreeMap::new(),
            results: None,
            generation: 0,
        }
    }

    pub fn filter(&self) -> DifficultyFilter {
        self.filter
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn quiz_words(&self) -> &[Word] {
        &self.quiz_words
    }

    pub fn definitions(&self) -> &[DefinitionCard] {
        &self.definitions
    }

    pub fn selected(&self) -> Option<WordId> {
        self.selected
    }

    pub fn matches(&self) -> &BTreeMap<WordId, WordId> {
        &self.matches
    }

    pub fn results(&self) -> Option<Score> {
        self.results
    }

    pub fn is_matched(&self, word: WordId) -> bool {
        self.matches.contains_key(&word)
    }

    pub fn is_definition_used(&self, owner: WordId) -> bool {
        self.matches.values().any(|used| *used == owner)
    }

    pub fn can_start(pool_size: usize) -> bool {
        pool_size >= MIN_POOL
    }

    /// Changes the difficulty filter. Only possible during setup; any pool
    /// fetched for the previous filter becomes stale.
    pub fn set_filter(&mut self, filter: DifficultyFilter) -> Result<(), QuizError> {
        if self.phase != Phase::Setup {
            return Err(QuizError::WrongPhase(self.phase));
        }
        if self.filter != filter {
            self.filter = filter;
            self.generation += 1;
        }
        Ok(())
    }

    pub fn request_pool(&self) -> PoolRequest {
        PoolRequest {
            generation: self.generation,
            filter: self.filter,
        }
    }

    /// Draws a new puzzle from `pool` and enters `Playing`. Works from any
    /// phase, so it also serves as retry and restart.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        request: PoolRequest,
        pool: Vec<Word>,
        rng: &mut R,
    ) -> Result<(), QuizError> {
        if request.generation != self.generation {
            return Err(QuizError::StaleResponse);
        }
        if !Self::can_start(pool.len()) {
            return Err(QuizError::InsufficientWords {
                available: pool.len(),
            });
        }
        let quiz_words = sample(pool, QUIZ_SIZE, rng);
        let mut definitions: Vec<DefinitionCard> = quiz_words
            .iter()
            .map(|word| DefinitionCard {
                owner: word.id,
                text: word.definition.clone(),
            })
            .collect();
        fisher_yates(&mut definitions, rng);

        self.quiz_words = quiz_words;
        self.definitions = definitions;
        self.matches.clear();
        self.selected = None;
        self.results = None;
        self.phase = Phase::Playing;
        self.generation += 1;
        Ok(())
    }

    /// Toggles selection of an unmatched word. Returns whether anything changed.
    pub fn select_word(&mut self, word: WordId) -> bool {
        if self.phase != Phase::Playing
            || self.is_matched(word)
            || !self.quiz_words.iter().any(|candidate| candidate.id == word)
        {
            return false;
        }
        self.selected = if self.selected == Some(word) {
            None
        } else {
            Some(word)
        };
        true
    }

    /// Pairs the selected word with the definition owned by `owner`.
    /// Returns whether a match was recorded.
    pub fn choose_definition(&mut self, owner: WordId) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        let Some(selected) = self.selected else {
            return false;
        };
        if self.is_definition_used(owner)
            || !self.definitions.iter().any(|card| card.owner == owner)
        {
            return false;
        }
        self.matches.insert(selected, owner);
        self.selected = None;
        true
    }

    /// Undoes the match of `word`, freeing its definition again.
    pub fn unmatch(&mut self, word: WordId) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        self.matches.remove(&word).is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Playing && self.matches.len() == self.quiz_words.len()
    }

    pub fn submit(&mut self) -> Result<Score, QuizError> {
        if self.phase != Phase::Playing {
            return Err(QuizError::WrongPhase(self.phase));
        }
        if !self.can_submit() {
            return Err(QuizError::Incomplete);
        }
        let correct = self
            .quiz_words
            .iter()
            .filter(|word| self.matches.get(&word.id) == Some(&word.id))
            .count();
        let score = Score {
            correct,
            total: self.quiz_words.len(),
        };
        self.results = Some(score);
        self.phase = Phase::Results;
        Ok(score)
    }

    /// Back to setup so the filter can be changed.
    pub fn new_quiz(&mut self) {
        self.quiz_words.clear();
        self.definitions.clear();
        self.matches.clear();
        self.selected = None;
        self.results = None;
        self.phase = Phase::Setup;
        self.generation += 1;
    }

    pub fn outcomes(&self) -> Vec<Outcome<'_>> {
        self.quiz_words
            .iter()
            .map(|word| {
                let chosen = self
                    .matches
                    .get(&word.id)
                    .and_then(|owner| self.definitions.iter().find(|card| card.owner == *owner));
                Outcome {
                    word,
                    chosen,
                    correct: chosen.is_some_and(|card| card.owner == word.id),
                }
            })
            .collect()
    }
}

/// Fetches the whole pool for the session's filter and starts (or retries)
/// the quiz with a fresh sample.
pub async fn start_quiz<R: Rng + ?Sized>(
    session: &mut QuizSession,
    words: &WordRepository,
    rng: &mut R,
) -> Result<(), AppError> {
    let request = session.request_pool();
    let pool = words.list(&WordFilter::quiz_pool(request.filter)).await?;
    let available = pool.len();
    session.start(request, pool, rng)?;
    tracing::info!(
        filter = %request.filter,
        available,
        drawn = session.quiz_words().len(),
        "quiz started"
    );
    Ok(())
}

/// Scores the session. Signed-in players get the result saved; a failed save
/// is logged and does not hide the score.
pub async fn submit_quiz(
    session: &mut QuizSession,
    words: &WordRepository,
    user: &Session,
) -> Result<Score, AppError> {
    let score = session.submit()?;
    tracing::info!(correct = score.correct, total = score.total, "quiz submitted");
    if user.user().is_some() {
        if let Err(error) = words.record_quiz_score(user, score, session.filter()).await {
            tracing::warn!(%error, "failed to save quiz score");
        }
    }
    Ok(score)
}
