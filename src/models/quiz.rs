// src/models/quiz.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub option_id: String,
    pub text: String,
    pub is_correct: bool,
}

/// A stored question. `correct_option_ids` is derived from the options'
/// `is_correct` flags during normalization and never read from input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question_id: String,
    pub text: String,
    pub options: Vec<AnswerOption>,
    pub score: i32,
    pub correct_option_ids: Vec<String>,
}

/// Represents the 'quizzes' table. Questions are kept as a JSONB document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub instructor_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub year_of_study: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Minutes a student has once the quiz is opened.
    pub duration: i32,
    pub questions: Vec<Question>,
    pub total_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where `now` falls relative to a quiz's scheduling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// `now < start_time`: still editable, not attemptable.
    NotStarted,
    /// `start_time <= now <= end_time`: attempts are admitted and scored.
    Open,
    /// `now > end_time`: results are visible.
    Closed,
}

impl Quiz {
    pub fn phase(&self, now: DateTime<Utc>) -> QuizPhase {
        if now < self.start_time {
            QuizPhase::NotStarted
        } else if now > self.end_time {
            QuizPhase::Closed
        } else {
            QuizPhase::Open
        }
    }

    /// A quiz can no longer be updated or deleted once it has started.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }

    /// Results open at `end_time` itself, not strictly after it.
    pub fn results_available(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }
}

/// `?status=` filter used by quiz listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Active,
    Upcoming,
    Past,
}

impl StatusFilter {
    pub fn matches(&self, phase: QuizPhase) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => phase == QuizPhase::Open,
            StatusFilter::Upcoming => phase == QuizPhase::NotStarted,
            StatusFilter::Past => phase == QuizPhase::Closed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub status: Option<StatusFilter>,
}

/// DTO for an option inside a create/update request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptionPayload {
    #[validate(length(min = 1, max = 64))]
    pub option_id: Option<String>,
    #[validate(length(min = 1, max = 1000, message = "Please add option text"))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for a question inside a create/update request.
/// Any `correctOptionIds` sent by the client is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPayload {
    #[validate(length(min = 1, max = 64))]
    pub question_id: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Please add question text"))]
    pub text: String,
    #[validate(length(min = 1, max = 50, message = "A question needs between 1 and 50 options"), nested)]
    pub options: Vec<OptionPayload>,
    #[validate(range(min = 1, max = 1000, message = "Score must be between 1 and 1000"))]
    pub score: i32,
}

/// DTO for creating or updating a quiz.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizPayload {
    #[validate(length(min = 1, max = 200, message = "Please add a title"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 4))]
    pub year_of_study: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub duration: i32,
    #[validate(length(min = 1, max = 200, message = "A quiz needs between 1 and 200 questions"), nested)]
    pub questions: Vec<QuestionPayload>,
}

/// A normalized quiz ready to be written. Only produced by
/// `services::quiz_service::normalize_quiz`, so every write carries freshly
/// derived `correct_option_ids` and `total_score`.
#[derive(Debug, Clone)]
pub struct QuizDraft {
    pub title: String,
    pub description: Option<String>,
    pub year_of_study: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i32,
    pub questions: Vec<Question>,
    pub total_score: i32,
}

/// Response for create/update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub quiz_id: i64,
    pub title: String,
    pub year_of_study: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        Self {
            quiz_id: quiz.id,
            title: quiz.title.clone(),
            year_of_study: quiz.year_of_study,
            start_time: quiz.start_time,
            end_time: quiz.end_time,
        }
    }
}

/// Listing entry for students' assigned quizzes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizListItem {
    pub quiz_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub year_of_study: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i32,
}

impl From<&Quiz> for QuizListItem {
    fn from(quiz: &Quiz) -> Self {
        Self {
            quiz_id: quiz.id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            year_of_study: quiz.year_of_study,
            start_time: quiz.start_time,
            end_time: quiz.end_time,
            duration: quiz.duration,
        }
    }
}

/// Option as shown to a student taking the quiz (no correctness flag).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOption {
    pub option_id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub question_id: String,
    pub text: String,
    pub options: Vec<PublicOption>,
}

/// DTO for sending a quiz to a student (excludes correct answers).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuiz {
    pub quiz_id: i64,
    pub title: String,
    pub duration: i32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        Self {
            quiz_id: quiz.id,
            title: quiz.title.clone(),
            duration: quiz.duration,
            questions: quiz
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    question_id: q.question_id.clone(),
                    text: q.text.clone(),
                    options: q
                        .options
                        .iter()
                        .map(|o| PublicOption {
                            option_id: o.option_id.clone(),
                            text: o.text.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// DTO for the instructor's edit form (includes correctness).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditableQuiz {
    pub quiz_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub year_of_study: i32,
    pub total_score: i32,
    pub questions: Vec<Question>,
}

impl From<Quiz> for EditableQuiz {
    fn from(quiz: Quiz) -> Self {
        Self {
            quiz_id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            duration: quiz.duration,
            start_time: quiz.start_time,
            end_time: quiz.end_time,
            year_of_study: quiz.year_of_study,
            total_score: quiz.total_score,
            questions: quiz.questions,
        }
    }
}
