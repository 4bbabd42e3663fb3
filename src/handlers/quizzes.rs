// src/handlers/quizzes.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::DEFAULT_LIST_LIMIT,
    error::AppError,
    handlers::require_user,
    models::{
        attempt::QuizAttemptEntry,
        question::PublicQuestion,
        quiz::{
            CreateQuizRequest, Quiz, QuizDetail, QuizListParams, SectionDetail, UpdateQuizRequest,
        },
    },
    utils::jwt::Claims,
};

/// Row of the flattened quiz tree: one question inside one section.
#[derive(sqlx::FromRow)]
struct SectionQuestionRow {
    section_id: i64,
    subject_id: i64,
    subject_name: String,
    question_id: i64,
    prompt: Option<String>,
    image_url: Option<String>,
    options: SqlJson<Vec<String>>,
}

/// Lists quizzes for discovery, optionally filtered by subject and name
/// keyword. Sort orders are whitelisted; anything else falls back to newest.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT DISTINCT qz.id, qz.name, qz.number, qz.duration_minutes,
                qz.ends_at, qz.teacher_id, qz.created_at
         FROM quizzes qz",
    );

    if let Some(subject_id) = params.subject_id {
        builder.push(" JOIN quiz_sections s ON s.quiz_id = qz.id AND s.subject_id = ");
        builder.push_bind(subject_id);
    }

    if let Some(keyword) = &params.q {
        builder.push(" WHERE qz.name ILIKE ");
        builder.push_bind(format!("%{}%", keyword));
    }

    match params.sort.as_deref() {
        Some("ends_at") => builder.push(" ORDER BY qz.ends_at ASC"),
        Some("number") => builder.push(" ORDER BY qz.number ASC"),
        _ => builder.push(" ORDER BY qz.created_at DESC, qz.id DESC"),
    };

    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 100);
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    let quizzes: Vec<Quiz> = builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list quizzes: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(quizzes))
}

/// Retrieves one quiz with its full section -> question tree.
/// Correct answers are hidden behind `PublicQuestion`.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT id, name, number, duration_minutes, ends_at, teacher_id, created_at
         FROM quizzes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let rows = sqlx::query_as::<_, SectionQuestionRow>(
        r#"
        SELECT s.id AS section_id, s.subject_id, subj.name AS subject_name,
               q.id AS question_id, q.prompt, q.image_url, q.options
        FROM quiz_sections s
        JOIN subjects subj ON subj.id = s.subject_id
        JOIN question_sections qs ON qs.section_id = s.id
        JOIN questions q ON q.id = qs.question_id
        WHERE s.quiz_id = $1
        ORDER BY s.position, s.id, qs.id
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let mut sections: Vec<SectionDetail> = Vec::new();
    for row in rows {
        let question = PublicQuestion {
            id: row.question_id,
            prompt: row.prompt,
            image_url: row.image_url,
            options: row.options,
        };

        match sections.last_mut() {
            Some(section) if section.id == row.section_id => section.questions.push(question),
            _ => sections.push(SectionDetail {
                id: row.section_id,
                subject_id: row.subject_id,
                subject_name: row.subject_name,
                questions: vec![question],
            }),
        }
    }

    Ok(Json(QuizDetail {
        id: quiz.id,
        name: quiz.name,
        number: quiz.number,
        duration_minutes: quiz.duration_minutes,
        ends_at: quiz.ends_at,
        teacher_id: quiz.teacher_id,
        sections,
    }))
}

/// Creates a quiz with its sections and question links in one transaction.
/// Teacher only.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let teacher = require_user(&pool, &claims, "TEACHER").await?;

    let mut tx = pool.begin().await?;

    let (quiz_id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO quizzes (name, number, duration_minutes, ends_at, teacher_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(&payload.name)
    .bind(payload.number)
    .bind(payload.duration_minutes)
    .bind(payload.ends_at)
    .bind(teacher.id)
    .fetch_one(&mut *tx)
    .await?;

    for (position, section) in payload.sections.iter().enumerate() {
        let (section_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO quiz_sections (quiz_id, subject_id, position)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .bind(section.subject_id)
        .bind(position as i32)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
                AppError::BadRequest(format!("Subject {} does not exist", section.subject_id))
            } else {
                AppError::from(e)
            }
        })?;

        for question_id in &section.question_ids {
            sqlx::query("INSERT INTO question_sections (question_id, section_id) VALUES ($1, $2)")
                .bind(question_id)
                .bind(section_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
                        AppError::BadRequest(format!("Question {} does not exist", question_id))
                    } else {
                        AppError::from(e)
                    }
                })?;
        }
    }

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": quiz_id}))))
}

/// Fetches a quiz and checks it belongs to the calling teacher.
async fn require_owned_quiz(
    pool: &PgPool,
    claims: &Claims,
    quiz_id: i64,
) -> Result<Quiz, AppError> {
    let teacher = require_user(pool, claims, "TEACHER").await?;

    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT id, name, number, duration_minutes, ends_at, teacher_id, created_at
         FROM quizzes WHERE id = $1",
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.teacher_id != teacher.id {
        return Err(AppError::Forbidden(
            "Quiz belongs to another teacher".to_string(),
        ));
    }

    Ok(quiz)
}

/// Updates a quiz's scalar fields by ID.
/// Teacher only; owner only.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_owned_quiz(&pool, &claims, id).await?;

    if payload.name.is_none()
        && payload.number.is_none()
        && payload.duration_minutes.is_none()
        && payload.ends_at.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(number) = payload.number {
        separated.push("number = ");
        separated.push_bind_unseparated(number);
    }

    if let Some(duration_minutes) = payload.duration_minutes {
        separated.push("duration_minutes = ");
        separated.push_bind_unseparated(duration_minutes);
    }

    if let Some(ends_at) = payload.ends_at {
        separated.push("ends_at = ");
        separated.push_bind_unseparated(ends_at);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz: {:?}", e);
        AppError::from(e)
    })?;

    Ok(StatusCode::OK)
}

/// Deletes a quiz by ID. Sections, links, and attempts go with it by cascade.
/// Teacher only; owner only.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_owned_quiz(&pool, &claims, id).await?;

    sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::from(e)
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Lists attempts for one quiz, newest first, for the teacher dashboard.
/// Teacher only; owner only.
pub async fn list_quiz_attempts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    require_owned_quiz(&pool, &claims, id).await?;

    let attempts = sqlx::query_as::<_, QuizAttemptEntry>(
        r#"
        SELECT a.id, a.student_id, u.username, a.total_questions,
               a.correct_answers, a.wrong_answers, a.score, a.status, a.completed_at
        FROM quiz_attempts a
        JOIN users u ON u.id = a.student_id
        WHERE a.quiz_id = $1
        ORDER BY a.completed_at DESC
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attempts))
}
