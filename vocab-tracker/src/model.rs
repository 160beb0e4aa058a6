use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct WordId(pub i64);

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty '{0}', expected easy, medium or hard")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.trim().to_lowercase()[..] {
            "easy" | "e" => Ok(Difficulty::Easy),
            "medium" | "m" => Ok(Difficulty::Medium),
            "hard" | "h" => Ok(Difficulty::Hard),
            other => Err(UnknownDifficulty(other.to_owned())),
        }
    }
}

/// Difficulty selection used by browse views and the quiz setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DifficultyFilter {
    #[default]
    All,
    Only(Difficulty),
}

impl DifficultyFilter {
    pub fn difficulty(self) -> Option<Difficulty> {
        match self {
            DifficultyFilter::All => None,
            DifficultyFilter::Only(difficulty) => Some(difficulty),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyFilter::All => "all",
            DifficultyFilter::Only(difficulty) => difficulty.as_str(),
        }
    }
}

impl fmt::Display for DifficultyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyFilter {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.trim().to_lowercase()[..] {
            "all" | "a" | "" => Ok(DifficultyFilter::All),
            other => other.parse().map(DifficultyFilter::Only),
        }
    }
}

impl From<Difficulty> for DifficultyFilter {
    fn from(difficulty: Difficulty) -> Self {
        DifficultyFilter::Only(difficulty)
    }
}

/// One part-of-speech group of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sense {
    /// Empty when the definition was entered as plain text.
    pub part_of_speech: String,
    pub definitions: Vec<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Word {
    pub id: WordId,
    pub word: String,
    pub definition: String,
    pub senses: Json<Vec<Sense>>,
    pub example_sentence: Option<String>,
    pub difficulty: Difficulty,
    pub created_at: NaiveDateTime,
    #[sqlx(rename = "user_id")]
    pub owner: Option<UserId>,
}

/// Word as submitted by a user, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWord {
    pub word: String,
    pub definition: String,
    /// Structure already known (dictionary lookups); parsed from `definition` otherwise.
    pub senses: Option<Vec<Sense>>,
    pub example_sentence: Option<String>,
    pub difficulty: Difficulty,
}

impl NewWord {
    /// A word entered by hand. A blank example counts as none; the senses are
    /// parsed from `definition` on insert.
    pub fn typed(word: &str, definition: &str, example: &str, difficulty: Difficulty) -> Self {
        let example = example.trim();
        Self {
            word: word.to_owned(),
            definition: definition.to_owned(),
            senses: None,
            example_sentence: (!example.is_empty()).then(|| example.to_owned()),
            difficulty,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordPatch {
    pub definition: Option<String>,
    /// `Some(None)` clears the example.
    pub example_sentence: Option<Option<String>>,
    pub difficulty: Option<Difficulty>,
}

impl WordPatch {
    pub fn is_empty(&self) -> bool {
        self.definition.is_none() && self.example_sentence.is_none() && self.difficulty.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct QuizScore {
    pub id: i64,
    pub user_id: UserId,
    pub score: i64,
    pub total: i64,
    /// Filter label the quiz was played with ("all", "easy", ...).
    pub difficulty: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Profile {
    pub id: UserId,
    pub display_name: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Profile {
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Anonymous")
    }
}

#[cfg(test)]
pub(crate) fn fixture(id: i64, word: &str) -> Word {
    Word {
        id: WordId(id),
        word: word.to_owned(),
        definition: format!("definition of {word}"),
        senses: Json(vec![Sense {
            part_of_speech: String::new(),
            definitions: vec![format!("definition of {word}")],
        }]),
        example_sentence: None,
        difficulty: Difficulty::Medium,
        created_at: chrono::Utc::now().naive_utc(),
        owner: None,
    }
}
