//! Quiz, question and answer option definitions
//!
//! This module defines the immutable quiz input the runtime receives at
//! session creation. Validation runs once at the handoff boundary; the game
//! itself trusts a quiz that reached it.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::media::Media;
use crate::constants::quiz as limits;

/// Identifier of a question or option as assigned by the authoring side
///
/// Authoring stores may hand out numeric or textual identifiers; both are
/// accepted and carried as text so answers can be compared uniformly.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(from = "RawItemId", into = "String")]
pub struct ItemId(String);

/// Wire form of an [`ItemId`]
#[derive(Deserialize)]
#[serde(untagged)]
enum RawItemId {
    Text(String),
    Number(i64),
}

impl From<RawItemId> for ItemId {
    fn from(raw: RawItemId) -> Self {
        match raw {
            RawItemId::Text(text) => Self(text),
            RawItemId::Number(number) => Self(number.to_string()),
        }
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl ItemId {
    /// Returns the identifier as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn default_points() -> i64 {
    limits::DEFAULT_POINTS
}

/// Checks that a question offers exactly one correct option and no duplicate ids
#[allow(clippy::ptr_arg)]
fn validate_options(options: &Vec<AnswerOption>, _ctx: &()) -> garde::Result {
    let correct = options.iter().filter(|option| option.is_correct).count();
    if correct != 1 {
        return Err(garde::Error::new(format!(
            "expected exactly one correct option, found {correct}"
        )));
    }
    if !options.iter().map(|option| &option.id).all_unique() {
        return Err(garde::Error::new("option identifiers must be unique"));
    }
    Ok(())
}

/// A complete quiz: a title and an ordered list of questions
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Quiz {
    /// Display title of the quiz
    #[garde(length(chars, max = limits::MAX_TITLE_LENGTH))]
    pub title: String,
    /// Time limit for questions that do not carry their own
    #[garde(range(max = limits::MAX_TIME_LIMIT))]
    #[serde(default, alias = "defaultTimeLimit")]
    pub default_time_limit: Option<u64>,
    /// Questions in presentation order
    #[garde(length(min = 1, max = limits::MAX_QUESTION_COUNT), dive)]
    pub questions: Vec<Question>,
}

/// A single-correct-answer multiple choice question
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Question {
    /// Identifier assigned by the authoring side
    #[garde(skip)]
    pub id: ItemId,
    /// The question as shown to everyone
    #[garde(length(chars, min = 1, max = limits::MAX_QUESTION_LENGTH))]
    pub text: String,
    /// Seconds available for answering; resolved against quiz defaults on handoff
    #[garde(range(max = limits::MAX_TIME_LIMIT))]
    #[serde(default, alias = "timeLimit")]
    pub time_limit: Option<u64>,
    /// Base points for a correct answer; negative values award nothing
    #[garde(skip)]
    #[serde(default = "default_points")]
    pub points: i64,
    /// Image or other media shown alongside the question
    #[garde(dive)]
    #[serde(default, alias = "media_url", alias = "mediaUrl")]
    pub media: Option<Media>,
    /// Revealed together with the correct answer
    #[garde(length(chars, max = limits::MAX_EXPLANATION_LENGTH))]
    #[serde(default)]
    pub explanation: Option<String>,
    /// Exactly four options, one of them correct
    #[garde(length(min = limits::OPTION_COUNT, max = limits::OPTION_COUNT), custom(validate_options), dive)]
    pub options: Vec<AnswerOption>,
}

/// One of the answer options of a question
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerOption {
    /// Identifier participants submit
    #[garde(skip)]
    pub id: ItemId,
    /// Option text
    #[garde(length(chars, min = 1, max = limits::MAX_OPTION_LENGTH))]
    pub text: String,
    /// Whether this is the right answer
    #[garde(skip)]
    #[serde(default, alias = "isCorrect")]
    pub is_correct: bool,
}

impl Quiz {
    /// Number of questions in the quiz
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the quiz has no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Returns the question at `index`, if any
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    /// Fills in every missing question time limit
    ///
    /// The quiz-level default wins over `fallback`, which is normally the
    /// session settings' default timer.
    #[must_use]
    pub fn with_resolved_time_limits(mut self, fallback: u64) -> Self {
        let default = self.default_time_limit.unwrap_or(fallback);
        for question in &mut self.questions {
            question.time_limit.get_or_insert(default);
        }
        self
    }
}

impl Question {
    /// Seconds available for answering this question
    pub fn time_limit(&self) -> u64 {
        self.time_limit.unwrap_or(limits::DEFAULT_TIME_LIMIT)
    }

    /// The option flagged correct, if the question has one
    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|option| option.is_correct)
    }

    /// Whether `option_id` names the correct option of this question
    pub fn is_correct(&self, option_id: &ItemId) -> bool {
        self.correct_option()
            .is_some_and(|option| &option.id == option_id)
    }
}
