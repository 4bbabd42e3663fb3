// src/handlers/submissions.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    config::DEFAULT_TIME_SPENT_SECS,
    error::AppError,
    handlers::require_user,
    models::attempt::{
        AnswerInput, Attempt, AttemptHistoryEntry, GradedAnswer, SectionResult, StudentAnswer,
        SubmitQuizRequest,
    },
    utils::jwt::Claims,
};

/// Flattened quiz tree row: one question of one section, with the canonical
/// answer and the section's subject name.
#[derive(sqlx::FromRow)]
struct QuizQuestionRow {
    section_id: i64,
    subject_name: String,
    question_id: i64,
    prompt: Option<String>,
    image_url: Option<String>,
    correct_one: String,
}

/// Outcome of grading one submission, before it is persisted.
#[derive(Debug)]
struct GradedSubmission {
    total_questions: i32,
    correct_answers: i32,
    wrong_answers: i32,
    sections: Vec<SectionResult>,
}

/// Grades a submission against the quiz's own question set.
///
/// The quiz is authoritative: every question known to the quiz produces one
/// result, an absent submission counts as an empty (wrong) answer, and
/// submitted ids outside the quiz are ignored. Comparison is exact string
/// equality with the canonical answer.
fn grade_submission(rows: &[QuizQuestionRow], answers: &[AnswerInput]) -> GradedSubmission {
    let submitted: HashMap<i64, (&str, i32)> = answers
        .iter()
        .map(|a| {
            (
                a.question_id,
                (
                    a.selected_answer.as_str(),
                    a.time_spent.unwrap_or(DEFAULT_TIME_SPENT_SECS),
                ),
            )
        })
        .collect();

    let mut correct_answers = 0;
    let mut wrong_answers = 0;
    let mut sections: Vec<SectionResult> = Vec::new();

    for row in rows {
        let (selected_answer, time_spent) = submitted
            .get(&row.question_id)
            .map(|(answer, spent)| (answer.to_string(), *spent))
            .unwrap_or_else(|| (String::new(), DEFAULT_TIME_SPENT_SECS));

        let is_correct = selected_answer == row.correct_one;
        if is_correct {
            correct_answers += 1;
        } else {
            wrong_answers += 1;
        }

        let graded = GradedAnswer {
            question_id: row.question_id,
            prompt: row.prompt.clone(),
            image_url: row.image_url.clone(),
            selected_answer,
            is_correct,
            time_spent,
        };

        // Rows arrive ordered by section, so grouping is a running append.
        match sections.last_mut() {
            Some(section) if section.section_id == row.section_id => {
                section.questions.push(graded)
            }
            _ => sections.push(SectionResult {
                section_id: row.section_id,
                subject: row.subject_name.clone(),
                questions: vec![graded],
            }),
        }
    }

    GradedSubmission {
        total_questions: correct_answers + wrong_answers,
        correct_answers,
        wrong_answers,
        sections,
    }
}

/// Pass/fail derivation: a tie passes.
fn attempt_status(correct_answers: i32, wrong_answers: i32) -> &'static str {
    if correct_answers >= wrong_answers {
        "PASSED"
    } else {
        "FAILED"
    }
}

/// Persists one graded submission as a unit of work: the attempt row plus one
/// student_answers row per quiz question, committed atomically. Any failure
/// rolls the whole write back; no partial attempt is ever visible.
async fn record_attempt(
    pool: &PgPool,
    student_id: i64,
    quiz_id: i64,
    graded: &GradedSubmission,
) -> Result<Attempt, AppError> {
    let mut tx = pool.begin().await?;

    let attempt = sqlx::query_as::<_, Attempt>(
        r#"
        INSERT INTO quiz_attempts
            (student_id, quiz_id, total_questions, correct_answers, wrong_answers, score, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, student_id, quiz_id, total_questions, correct_answers,
                  wrong_answers, score, status, completed_at
        "#,
    )
    .bind(student_id)
    .bind(quiz_id)
    .bind(graded.total_questions)
    .bind(graded.correct_answers)
    .bind(graded.wrong_answers)
    .bind(graded.correct_answers) // score is the raw correct count
    .bind(attempt_status(graded.correct_answers, graded.wrong_answers))
    .fetch_one(&mut *tx)
    .await?;

    for section in &graded.sections {
        for answer in &section.questions {
            sqlx::query(
                r#"
                INSERT INTO student_answers
                    (attempt_id, question_id, selected_answer, is_correct, time_spent)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(attempt.id)
            .bind(answer.question_id)
            .bind(&answer.selected_answer)
            .bind(answer.is_correct)
            .bind(answer.time_spent)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;

    Ok(attempt)
}

/// Loads the flattened section -> question tree of one quiz, in section order.
async fn load_quiz_questions(pool: &PgPool, quiz_id: i64) -> Result<Vec<QuizQuestionRow>, AppError> {
    let rows = sqlx::query_as::<_, QuizQuestionRow>(
        r#"
        SELECT s.id AS section_id, subj.name AS subject_name,
               q.id AS question_id, q.prompt, q.image_url, q.correct_one
        FROM quiz_sections s
        JOIN subjects subj ON subj.id = s.subject_id
        JOIN question_sections qs ON qs.section_id = s.id
        JOIN questions q ON q.id = qs.question_id
        WHERE s.quiz_id = $1
        ORDER BY s.position, s.id, qs.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Submits a student's answers for one quiz and grades them.
///
/// * Rejects an empty answers list before any lookup.
/// * 404 for an unknown quiz, 403 when the session maps to no student record.
/// * Exactly one attempt row and one answer row per quiz question are written,
///   in a single transaction. Repeat submissions create independent attempts.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    payload: Result<Json<SubmitQuizRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    // A missing or malformed answers array is the caller's fault, not a
    // semantic 422: surface every body-shape rejection as 400.
    let Json(payload) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    if payload.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let quiz_exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(&pool)
        .await?;

    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let student = require_user(&pool, &claims, "STUDENT").await?;

    let rows = load_quiz_questions(&pool, quiz_id).await?;

    let graded = grade_submission(&rows, &payload.answers);

    let attempt = record_attempt(&pool, student.id, quiz_id, &graded).await?;

    tracing::info!(
        "Student {} attempted quiz {}: {}/{} correct ({})",
        student.id,
        quiz_id,
        attempt.correct_answers,
        attempt.total_questions,
        attempt.status
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "message": "Quiz submitted successfully",
            "data": graded.sections,
            "result": attempt,
        })),
    ))
}

/// Advisory check for a prior attempt at this quiz by the current student.
///
/// Nothing in the submission path enforces this; a student who submits anyway
/// simply accumulates another attempt.
pub async fn check_eligibility(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = require_user(&pool, &claims, "STUDENT").await?;

    let quiz_exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .fetch_optional(&pool)
        .await?;

    if quiz_exists.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let last_attempt = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, student_id, quiz_id, total_questions, correct_answers,
               wrong_answers, score, status, completed_at
        FROM quiz_attempts
        WHERE student_id = $1 AND quiz_id = $2
        ORDER BY completed_at DESC
        LIMIT 1
        "#,
    )
    .bind(student.id)
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "eligible": last_attempt.is_none(),
        "last_attempt": last_attempt,
    })))
}

/// Lists the current student's attempt history, newest first.
pub async fn list_my_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student = require_user(&pool, &claims, "STUDENT").await?;

    let attempts = sqlx::query_as::<_, AttemptHistoryEntry>(
        r#"
        SELECT a.id, a.quiz_id, qz.name AS quiz_name, a.total_questions,
               a.correct_answers, a.wrong_answers, a.score, a.status, a.completed_at
        FROM quiz_attempts a
        JOIN quizzes qz ON qz.id = a.quiz_id
        WHERE a.student_id = $1
        ORDER BY a.completed_at DESC
        "#,
    )
    .bind(student.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}

/// Returns one of the current student's past attempts with its per-question
/// answer rows, for reviewing a finished quiz.
pub async fn get_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student = require_user(&pool, &claims, "STUDENT").await?;

    let attempt = sqlx::query_as::<_, Attempt>(
        r#"
        SELECT id, student_id, quiz_id, total_questions, correct_answers,
               wrong_answers, score, status, completed_at
        FROM quiz_attempts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.student_id != student.id {
        return Err(AppError::Forbidden(
            "Attempt belongs to another student".to_string(),
        ));
    }

    let answers = sqlx::query_as::<_, StudentAnswer>(
        r#"
        SELECT id, attempt_id, question_id, selected_answer, is_correct, time_spent
        FROM student_answers
        WHERE attempt_id = $1
        ORDER BY id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "attempt": attempt,
        "answers": answers,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        section_id: i64,
        subject: &str,
        question_id: i64,
        prompt: &str,
        correct: &str,
    ) -> QuizQuestionRow {
        QuizQuestionRow {
            section_id,
            subject_name: subject.to_string(),
            question_id,
            prompt: Some(prompt.to_string()),
            image_url: None,
            correct_one: correct.to_string(),
        }
    }

    fn answer(question_id: i64, selected: &str) -> AnswerInput {
        AnswerInput {
            question_id,
            selected_answer: selected.to_string(),
            time_spent: None,
        }
    }

    #[test]
    fn test_tie_counts_and_passes() {
        // Quiz with A(correct="x") and B(correct="y"); student gets A right, B wrong.
        let rows = vec![row(1, "Math", 10, "A?", "x"), row(1, "Math", 11, "B?", "y")];
        let answers = vec![answer(10, "x"), answer(11, "z")];

        let graded = grade_submission(&rows, &answers);

        assert_eq!(graded.total_questions, 2);
        assert_eq!(graded.correct_answers, 1);
        assert_eq!(graded.wrong_answers, 1);
        assert_eq!(attempt_status(graded.correct_answers, graded.wrong_answers), "PASSED");

        let questions = &graded.sections[0].questions;
        assert!(questions[0].is_correct);
        assert!(!questions[1].is_correct);
    }

    #[test]
    fn test_omitted_answer_recorded_as_empty_and_wrong() {
        let rows = vec![row(1, "Math", 10, "A?", "x"), row(1, "Math", 11, "B?", "y")];
        let answers = vec![answer(10, "x")];

        let graded = grade_submission(&rows, &answers);

        assert_eq!(graded.total_questions, 2);
        assert_eq!(graded.wrong_answers, 1);

        let unanswered = &graded.sections[0].questions[1];
        assert_eq!(unanswered.selected_answer, "");
        assert!(!unanswered.is_correct);
        assert_eq!(unanswered.time_spent, DEFAULT_TIME_SPENT_SECS);
    }

    #[test]
    fn test_foreign_question_id_is_ignored() {
        let rows = vec![row(1, "Math", 10, "A?", "x")];
        let answers = vec![answer(10, "x"), answer(999, "x")];

        let graded = grade_submission(&rows, &answers);

        assert_eq!(graded.total_questions, 1);
        assert_eq!(graded.correct_answers, 1);
        assert_eq!(graded.wrong_answers, 0);
        assert_eq!(graded.sections[0].questions.len(), 1);
    }

    #[test]
    fn test_mostly_wrong_fails() {
        let rows = vec![
            row(1, "Math", 1, "A?", "a"),
            row(1, "Math", 2, "B?", "b"),
            row(1, "Math", 3, "C?", "c"),
        ];
        let answers = vec![answer(1, "a"), answer(2, "x"), answer(3, "x")];

        let graded = grade_submission(&rows, &answers);

        assert_eq!(graded.correct_answers, 1);
        assert_eq!(graded.wrong_answers, 2);
        assert_eq!(attempt_status(graded.correct_answers, graded.wrong_answers), "FAILED");
    }

    #[test]
    fn test_grouping_by_section_with_subject_names() {
        let rows = vec![
            row(1, "Math", 10, "A?", "x"),
            row(1, "Math", 11, "B?", "y"),
            row(2, "Physics", 12, "C?", "z"),
        ];
        let answers = vec![answer(10, "x"), answer(11, "y"), answer(12, "z")];

        let graded = grade_submission(&rows, &answers);

        assert_eq!(graded.sections.len(), 2);
        assert_eq!(graded.sections[0].subject, "Math");
        assert_eq!(graded.sections[0].questions.len(), 2);
        assert_eq!(graded.sections[1].subject, "Physics");
        assert_eq!(graded.sections[1].questions.len(), 1);
        assert_eq!(graded.correct_answers, 3);
    }

    #[test]
    fn test_time_spent_kept_when_provided() {
        let rows = vec![row(1, "Math", 10, "A?", "x")];
        let answers = vec![AnswerInput {
            question_id: 10,
            selected_answer: "x".to_string(),
            time_spent: Some(42),
        }];

        let graded = grade_submission(&rows, &answers);

        assert_eq!(graded.sections[0].questions[0].time_spent, 42);
    }

    #[test]
    fn test_empty_quiz_grades_to_zero_and_passes() {
        let graded = grade_submission(&[], &[answer(1, "a")]);

        assert_eq!(graded.total_questions, 0);
        assert!(graded.sections.is_empty());
        assert_eq!(attempt_status(0, 0), "PASSED");
    }
}
