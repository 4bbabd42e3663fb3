// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'quiz_attempts' table in the database.
/// One immutable record per completed submission; never updated afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub student_id: i64,
    pub quiz_id: i64,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,

    /// Raw correct-answer count; percentages are computed at display time.
    pub score: i32,

    /// 'PASSED' or 'FAILED'. Assigned once at creation.
    pub status: String,

    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'student_answers' table: one row per quiz question per attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub selected_answer: String,
    pub is_correct: bool,
    pub time_spent: i32,
}

/// One submitted answer tuple.
#[derive(Debug, Deserialize)]
pub struct AnswerInput {
    pub question_id: i64,
    pub selected_answer: String,
    /// Seconds spent on the question; defaults when absent.
    pub time_spent: Option<i32>,
}

/// DTO for submitting a quiz.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<AnswerInput>,
}

/// Per-question grading outcome, returned to the client and persisted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub prompt: Option<String>,
    pub image_url: Option<String>,
    pub selected_answer: String,
    pub is_correct: bool,
    pub time_spent: i32,
}

/// Graded questions of one quiz section, paired with its subject name.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionResult {
    pub section_id: i64,
    pub subject: String,
    pub questions: Vec<GradedAnswer>,
}

/// Attempt history row for the student dashboard (joined with quiz name).
#[derive(Debug, Serialize, FromRow)]
pub struct AttemptHistoryEntry {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_name: String,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub score: i32,
    pub status: String,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Attempt row for the teacher dashboard (joined with student username).
#[derive(Debug, Serialize, FromRow)]
pub struct QuizAttemptEntry {
    pub id: i64,
    pub student_id: i64,
    pub username: String,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub score: i32,
    pub status: String,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}
