// src/services/quiz_service.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        quiz::{
            AnswerOption, EditableQuiz, PublicQuiz, Question, Quiz, QuizDraft, QuizListItem,
            QuizPayload, QuizPhase, StatusFilter,
        },
        user::Requester,
    },
    repositories::Store,
    services::scoring,
    utils::html::{clean_html, clean_optional},
};

/// Length of generated question/option identifiers.
const GENERATED_ID_LEN: usize = 10;

fn generate_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(GENERATED_ID_LEN);
    id
}

/// Turns a create/update payload into the only shape the quiz repository
/// writes.
///
/// * Rejects `end_time <= start_time`, duplicate question/option ids and
///   questions without a correct option.
/// * Generates ids that the client left out.
/// * Derives each question's `correct_option_ids` from the `is_correct`
///   flags and the quiz `total_score` from the question scores.
pub fn normalize_quiz(payload: QuizPayload) -> Result<QuizDraft, AppError> {
    if payload.end_time <= payload.start_time {
        return Err(AppError::BadRequest(
            "End time must be after start time".to_string(),
        ));
    }

    let mut question_ids = HashSet::new();
    let mut questions = Vec::with_capacity(payload.questions.len());

    for q in payload.questions {
        let question_id = q.question_id.unwrap_or_else(generate_id);
        if !question_ids.insert(question_id.clone()) {
            return Err(AppError::BadRequest(format!(
                "Duplicate question id '{}'",
                question_id
            )));
        }

        let mut option_ids = HashSet::new();
        let mut options = Vec::with_capacity(q.options.len());
        for o in q.options {
            let option_id = o.option_id.unwrap_or_else(generate_id);
            if !option_ids.insert(option_id.clone()) {
                return Err(AppError::BadRequest(format!(
                    "Duplicate option id '{}' in question '{}'",
                    option_id, question_id
                )));
            }
            options.push(AnswerOption {
                option_id,
                text: clean_html(&o.text),
                is_correct: o.is_correct,
            });
        }

        let correct_option_ids: Vec<String> = options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.option_id.clone())
            .collect();
        if correct_option_ids.is_empty() {
            return Err(AppError::BadRequest(format!(
                "Question '{}' needs at least one correct option",
                question_id
            )));
        }

        questions.push(Question {
            question_id,
            text: clean_html(&q.text),
            options,
            score: q.score,
            correct_option_ids,
        });
    }

    let total_score = scoring::sum_scores(questions.iter().map(|q| q.score))?;

    Ok(QuizDraft {
        title: clean_html(&payload.title),
        description: clean_optional(payload.description.as_deref()),
        year_of_study: payload.year_of_study,
        start_time: payload.start_time,
        end_time: payload.end_time,
        duration: payload.duration,
        questions,
        total_score,
    })
}

/// Loads a quiz and checks that `requester` owns it.
async fn owned_quiz(store: &Store, requester: &Requester, quiz_id: i64, action: &str) -> Result<Quiz, AppError> {
    let quiz = store
        .quizzes
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.instructor_id != requester.user_id {
        return Err(AppError::Forbidden(format!(
            "Not authorized to {} this quiz",
            action
        )));
    }

    Ok(quiz)
}

pub async fn create_quiz(store: &Store, requester: &Requester, payload: QuizPayload) -> Result<Quiz, AppError> {
    let draft = normalize_quiz(payload)?;
    let quiz = store.quizzes.create_quiz(requester.user_id, draft).await?;
    tracing::info!(quiz_id = quiz.id, instructor_id = requester.user_id, "Quiz created");
    Ok(quiz)
}

/// Replaces a quiz that has not started yet.
pub async fn update_quiz(
    store: &Store,
    requester: &Requester,
    quiz_id: i64,
    payload: QuizPayload,
    now: DateTime<Utc>,
) -> Result<Quiz, AppError> {
    let quiz = owned_quiz(store, requester, quiz_id, "update").await?;
    if quiz.is_locked(now) {
        return Err(AppError::BadRequest(
            "Cannot update quiz after start time".to_string(),
        ));
    }

    let draft = normalize_quiz(payload)?;
    store
        .quizzes
        .update_quiz(quiz_id, draft)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))
}

/// Deletes a quiz that has not started yet.
pub async fn delete_quiz(store: &Store, requester: &Requester, quiz_id: i64, now: DateTime<Utc>) -> Result<(), AppError> {
    let quiz = owned_quiz(store, requester, quiz_id, "delete").await?;
    if quiz.is_locked(now) {
        return Err(AppError::BadRequest(
            "Cannot delete quiz after start time".to_string(),
        ));
    }

    if !store.quizzes.delete_quiz(quiz_id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    tracing::info!(quiz_id, instructor_id = requester.user_id, "Quiz deleted");
    Ok(())
}

/// Quiz as shown to a student about to attempt it: same cohort, open window,
/// no correct answers.
pub async fn quiz_for_student(
    store: &Store,
    requester: &Requester,
    quiz_id: i64,
    now: DateTime<Utc>,
) -> Result<PublicQuiz, AppError> {
    let profile = store
        .users
        .find_profile(requester.user_id)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    let quiz = store
        .quizzes
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.year_of_study != profile.year_of_study {
        return Err(AppError::Forbidden(
            "Quiz not assigned to your year".to_string(),
        ));
    }
    if quiz.phase(now) != QuizPhase::Open {
        return Err(AppError::BadRequest("Quiz is not available".to_string()));
    }

    Ok(PublicQuiz::from(&quiz))
}

/// Full quiz, correct answers included, for its owner's edit form.
pub async fn quiz_for_edit(store: &Store, requester: &Requester, quiz_id: i64) -> Result<EditableQuiz, AppError> {
    let quiz = owned_quiz(store, requester, quiz_id, "edit").await?;
    Ok(EditableQuiz::from(quiz))
}

/// Quizzes of the student's cohort, filtered by phase (`active` by default).
pub async fn assigned_quizzes(
    store: &Store,
    requester: &Requester,
    status: Option<StatusFilter>,
    now: DateTime<Utc>,
) -> Result<Vec<QuizListItem>, AppError> {
    let profile = store
        .users
        .find_profile(requester.user_id)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    let filter = status.unwrap_or(StatusFilter::Active);
    let quizzes = store.quizzes.list_quizzes_by_year(profile.year_of_study).await?;

    Ok(quizzes
        .iter()
        .filter(|q| filter.matches(q.phase(now)))
        .map(QuizListItem::from)
        .collect())
}

/// Listing entry for an instructor's own quizzes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorQuizItem {
    pub quiz_id: i64,
    pub title: String,
    pub year_of_study: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_attempts: i64,
}

/// The instructor's quizzes (all by default) with scored-attempt counts.
pub async fn instructor_quizzes(
    store: &Store,
    requester: &Requester,
    status: Option<StatusFilter>,
    now: DateTime<Utc>,
) -> Result<Vec<InstructorQuizItem>, AppError> {
    let filter = status.unwrap_or(StatusFilter::All);
    let quizzes: Vec<Quiz> = store
        .quizzes
        .list_quizzes_by_instructor(requester.user_id)
        .await?
        .into_iter()
        .filter(|q| filter.matches(q.phase(now)))
        .collect();

    let ids: Vec<i64> = quizzes.iter().map(|q| q.id).collect();
    let counts = store.attempts.count_scored_attempts(&ids).await?;

    Ok(quizzes
        .into_iter()
        .map(|q| InstructorQuizItem {
            total_attempts: counts.get(&q.id).copied().unwrap_or(0),
            quiz_id: q.id,
            title: q.title,
            year_of_study: q.year_of_study,
            start_time: q.start_time,
            end_time: q.end_time,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        profile::ProfileRequest,
        quiz::{OptionPayload, QuestionPayload},
        user::Role,
    };
    use crate::repositories::memory::MemoryStore;
    use chrono::{Duration, TimeZone};
    use validator::Validate;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap()
    }

    fn option(id: Option<&str>, text: &str, is_correct: bool) -> OptionPayload {
        OptionPayload {
            option_id: id.map(str::to_string),
            text: text.to_string(),
            is_correct,
        }
    }

    fn payload() -> QuizPayload {
        QuizPayload {
            title: "  Ownership  ".to_string(),
            description: Some("Borrowing rules".to_string()),
            year_of_study: 2,
            start_time: t0(),
            end_time: t0() + Duration::hours(1),
            duration: 30,
            questions: vec![
                QuestionPayload {
                    question_id: Some("q1".to_string()),
                    text: "Which are Copy?".to_string(),
                    options: vec![
                        option(Some("A"), "i32", true),
                        option(Some("B"), "String", false),
                        option(Some("C"), "bool", true),
                    ],
                    score: 4,
                },
                QuestionPayload {
                    question_id: None,
                    text: "Pick one".to_string(),
                    options: vec![option(None, "yes", true), option(None, "no", false)],
                    score: 6,
                },
            ],
        }
    }

    fn instructor(user_id: i64) -> Requester {
        Requester {
            user_id,
            role: Role::Instructor,
        }
    }

    #[test]
    fn test_normalize_derives_correct_ids_and_total() {
        let draft = normalize_quiz(payload()).unwrap();

        assert_eq!(draft.title, "Ownership");
        assert_eq!(draft.total_score, 10);
        assert_eq!(draft.questions[0].correct_option_ids, vec!["A", "C"]);

        let generated = &draft.questions[1];
        assert_eq!(generated.question_id.len(), GENERATED_ID_LEN);
        assert_eq!(generated.correct_option_ids.len(), 1);
        assert_eq!(generated.correct_option_ids[0], generated.options[0].option_id);
    }

    #[test]
    fn test_normalize_rejects_inverted_window() {
        let mut p = payload();
        p.end_time = p.start_time;
        assert!(matches!(normalize_quiz(p), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_normalize_rejects_duplicate_ids() {
        let mut p = payload();
        p.questions[1].question_id = Some("q1".to_string());
        assert!(matches!(normalize_quiz(p), Err(AppError::BadRequest(_))));

        let mut p = payload();
        p.questions[0].options[1].option_id = Some("A".to_string());
        assert!(matches!(normalize_quiz(p), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_normalize_rejects_question_without_correct_option() {
        let mut p = payload();
        for o in &mut p.questions[1].options {
            o.is_correct = false;
        }
        assert!(matches!(normalize_quiz(p), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_normalize_rejects_overflowing_total() {
        let mut p = payload();
        p.questions[0].score = i32::MAX;
        assert!(matches!(normalize_quiz(p), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_payload_caps_question_score() {
        let mut p = payload();
        assert!(p.validate().is_ok());
        p.questions[0].score = 1001;
        assert!(p.validate().is_err());
    }

    #[tokio::test]
    async fn test_update_recomputes_total_score() {
        let store = Store::from_backend(MemoryStore::new());
        let owner = instructor(1);
        let quiz = create_quiz(&store, &owner, payload()).await.unwrap();
        assert_eq!(quiz.total_score, 10);

        let mut changed = payload();
        changed.questions[0].score = 20;
        let updated = update_quiz(&store, &owner, quiz.id, changed, t0() - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(updated.total_score, 26);
    }

    #[tokio::test]
    async fn test_started_quiz_is_immutable_for_everyone() {
        let store = Store::from_backend(MemoryStore::new());
        let owner = instructor(1);
        let quiz = create_quiz(&store, &owner, payload()).await.unwrap();

        for now in [t0(), t0() + Duration::minutes(5), t0() + Duration::days(2)] {
            let update = update_quiz(&store, &owner, quiz.id, payload(), now).await;
            assert!(matches!(update, Err(AppError::BadRequest(_))));
            let delete = delete_quiz(&store, &owner, quiz.id, now).await;
            assert!(matches!(delete, Err(AppError::BadRequest(_))));

            let stranger = delete_quiz(&store, &instructor(99), quiz.id, now).await;
            assert!(matches!(stranger, Err(AppError::Forbidden(_))));
        }

        assert!(store.quizzes.find_quiz(quiz.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_owner_can_delete_before_start() {
        let store = Store::from_backend(MemoryStore::new());
        let owner = instructor(1);
        let quiz = create_quiz(&store, &owner, payload()).await.unwrap();

        delete_quiz(&store, &owner, quiz.id, t0() - Duration::minutes(1))
            .await
            .unwrap();
        assert!(store.quizzes.find_quiz(quiz.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_student_view_checks_cohort_and_window() {
        let store = Store::from_backend(MemoryStore::new());
        let quiz = create_quiz(&store, &instructor(1), payload()).await.unwrap();
        let student = Requester {
            user_id: 50,
            role: Role::Student,
        };

        let missing = quiz_for_student(&store, &student, quiz.id, t0()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let mut profile = ProfileRequest {
            first_name: "Ada".to_string(),
            last_name: "L".to_string(),
            year_of_study: 3,
            department: "CS".to_string(),
            roll_number: "R1".to_string(),
        };
        store.users.upsert_profile(50, profile.clone()).await.unwrap();
        let wrong_year = quiz_for_student(&store, &student, quiz.id, t0()).await;
        assert!(matches!(wrong_year, Err(AppError::Forbidden(_))));

        profile.year_of_study = 2;
        store.users.upsert_profile(50, profile).await.unwrap();
        let early = quiz_for_student(&store, &student, quiz.id, t0() - Duration::seconds(1)).await;
        assert!(matches!(early, Err(AppError::BadRequest(_))));

        let view = quiz_for_student(&store, &student, quiz.id, t0()).await.unwrap();
        assert_eq!(view.questions.len(), 2);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.to_string().find("isCorrect").is_none());
    }
}
