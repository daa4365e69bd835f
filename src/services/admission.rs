// src/services/admission.rs

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptReceipt, AttemptResults, AttemptSummary, NewAttempt, ResultQuiz, SubmittedAnswer},
        quiz::QuizPhase,
        user::Requester,
    },
    repositories::Store,
    services::scoring,
};

/// Admits, scores and stores a submission.
///
/// Checks run in this order and stop at the first failure:
/// 1. the quiz exists (`NotFound`);
/// 2. `start_time <= now <= end_time` (`BadRequest`);
/// 3. the user has no scored attempt for the quiz yet (`Conflict`).
///
/// The third check is repeated by the store's uniqueness constraint, so two
/// racing submissions still produce a single scored attempt.
pub async fn submit_attempt(
    store: &Store,
    requester: &Requester,
    quiz_id: i64,
    answers: &[SubmittedAnswer],
    now: DateTime<Utc>,
) -> Result<AttemptReceipt, AppError> {
    let quiz = store
        .quizzes
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let is_scored = quiz.phase(now) == QuizPhase::Open;
    if !is_scored {
        tracing::debug!(quiz_id, user_id = requester.user_id, "Submission outside quiz window");
        return Err(AppError::BadRequest("Quiz is not available".to_string()));
    }

    if store
        .attempts
        .find_scored_attempt(quiz_id, requester.user_id)
        .await?
        .is_some()
    {
        tracing::info!(quiz_id, user_id = requester.user_id, "Rejected repeated submission");
        return Err(AppError::Conflict("Quiz already attempted".to_string()));
    }

    let evaluation = scoring::evaluate(&quiz, answers)?;

    let attempt = store
        .attempts
        .insert_attempt(NewAttempt {
            quiz_id,
            user_id: requester.user_id,
            submitted_at: now,
            is_scored,
            answers: evaluation.answers,
            total_score: evaluation.total_score,
        })
        .await?;

    tracing::info!(
        attempt_id = attempt.id,
        quiz_id,
        user_id = requester.user_id,
        total_score = attempt.total_score,
        "Attempt recorded"
    );

    Ok(AttemptReceipt {
        attempt_id: attempt.id,
        quiz_id,
        total_score: attempt.total_score,
        is_scored: attempt.is_scored,
    })
}

/// The requester's latest attempt and the full quiz, once the quiz has ended.
pub async fn attempt_results(
    store: &Store,
    requester: &Requester,
    quiz_id: i64,
    now: DateTime<Utc>,
) -> Result<AttemptResults, AppError> {
    let quiz = store
        .quizzes
        .find_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if !quiz.results_available(now) {
        return Err(AppError::Forbidden(
            "Results not available until quiz ends".to_string(),
        ));
    }

    let attempt = store
        .attempts
        .find_latest_attempt(quiz_id, requester.user_id)
        .await?
        .ok_or(AppError::NotFound("No attempt found for this quiz".to_string()))?;

    Ok(AttemptResults {
        attempt: AttemptSummary {
            attempt_id: attempt.id,
            quiz_id,
            total_score: attempt.total_score,
            answers: attempt.answers,
        },
        quiz: ResultQuiz {
            questions: quiz.questions,
        },
    })
}
