// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::PublicQuestion;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub name: String,

    /// Display ordinal chosen by the teacher (e.g., "Mock Test 3").
    pub number: i32,

    pub duration_minutes: i32,

    /// After this instant the quiz is closed for new attempts in the UI.
    pub ends_at: chrono::DateTime<chrono::Utc>,

    pub teacher_id: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for one section of a quiz being created.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateSectionRequest {
    pub subject_id: i64,

    #[validate(length(min = 1, message = "A section needs at least one question"))]
    pub question_ids: Vec<i64>,
}

/// DTO for creating a new quiz with its sections.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(range(min = 1))]
    pub number: i32,

    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,

    pub ends_at: chrono::DateTime<chrono::Utc>,

    #[validate(nested, length(min = 1, message = "A quiz needs at least one section"))]
    pub sections: Vec<CreateSectionRequest>,
}

/// DTO for updating a quiz's scalar fields. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuizRequest {
    pub name: Option<String>,
    pub number: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub ends_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for quiz discovery.
#[derive(Debug, Deserialize)]
pub struct QuizListParams {
    /// Only quizzes containing a section for this subject.
    pub subject_id: Option<i64>,

    /// Search keyword for name match.
    pub q: Option<String>,

    /// Sort order: 'newest' (default), 'ends_at' or 'number'.
    pub sort: Option<String>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,
}

/// One section of a quiz detail response, with its questions.
#[derive(Debug, Serialize)]
pub struct SectionDetail {
    pub id: i64,
    pub subject_id: i64,
    pub subject_name: String,
    pub questions: Vec<PublicQuestion>,
}

/// Full quiz tree as served to students (correct answers hidden).
#[derive(Debug, Serialize)]
pub struct QuizDetail {
    pub id: i64,
    pub name: String,
    pub number: i32,
    pub duration_minutes: i32,
    pub ends_at: chrono::DateTime<chrono::Utc>,
    pub teacher_id: i64,
    pub sections: Vec<SectionDetail>,
}
