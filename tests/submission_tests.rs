// tests/submission_tests.rs
//
// End-to-end coverage of the submission & grading path: webhook user sync,
// teacher authoring, student discovery, grading, and the attempt records.

use testtrack::{config::Config, routes, state::AppState, utils::jwt::sign_jwt};

use sqlx::postgres::PgPoolOptions;

const TEST_JWT_SECRET: &str = "test_secret_for_integration_tests";
const TEST_WEBHOOK_SECRET: &str = "test_webhook_secret";

async fn spawn_app() -> String {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        rust_log: "error".to_string(),
    };

    let state = AppState { pool, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn unique_id(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

async fn sync_user_and_token(
    client: &reqwest::Client,
    address: &str,
    external_id: &str,
    role: &str,
) -> String {
    let response = client
        .post(format!("{}/api/webhooks/users", address))
        .header("X-Webhook-Secret", TEST_WEBHOOK_SECRET)
        .json(&serde_json::json!({
            "event": "created",
            "external_id": external_id,
            "username": format!("user_{}", &external_id[..8.min(external_id.len())]),
            "role": role,
        }))
        .send()
        .await
        .expect("Failed to call user webhook");
    assert_eq!(response.status().as_u16(), 200);

    sign_jwt(external_id, role, TEST_JWT_SECRET, 600).expect("Failed to sign test token")
}

async fn create_question(
    client: &reqwest::Client,
    address: &str,
    teacher_token: &str,
    prompt: &str,
    options: &[&str],
    correct: &str,
) -> i64 {
    let response = client
        .post(format!("{}/api/questions", address))
        .bearer_auth(teacher_token)
        .json(&serde_json::json!({
            "prompt": prompt,
            "options": options,
            "correct_one": correct,
        }))
        .send()
        .await
        .expect("Failed to create question");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

/// Authors the two-question quiz used by the grading scenarios:
/// A (correct "x", options ["x","y"]) and B (correct "y", options ["y","z"]).
async fn build_two_question_quiz(
    client: &reqwest::Client,
    address: &str,
    teacher_token: &str,
) -> (i64, i64, i64) {
    let subject_response = client
        .post(format!("{}/api/subjects", address))
        .bearer_auth(teacher_token)
        .json(&serde_json::json!({"name": unique_id("Subject")}))
        .send()
        .await
        .expect("Failed to create subject");
    assert_eq!(subject_response.status().as_u16(), 201);
    let subject: serde_json::Value = subject_response.json().await.unwrap();
    let subject_id = subject["id"].as_i64().unwrap();

    let question_a = create_question(client, address, teacher_token, "A?", &["x", "y"], "x").await;
    let question_b = create_question(client, address, teacher_token, "B?", &["y", "z"], "y").await;

    let quiz_response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(teacher_token)
        .json(&serde_json::json!({
            "name": unique_id("Mock Quiz"),
            "number": 1,
            "duration_minutes": 30,
            "ends_at": "2030-01-01T00:00:00Z",
            "sections": [
                {"subject_id": subject_id, "question_ids": [question_a, question_b]}
            ],
        }))
        .send()
        .await
        .expect("Failed to create quiz");
    assert_eq!(quiz_response.status().as_u16(), 201);
    let quiz: serde_json::Value = quiz_response.json().await.unwrap();

    (quiz["id"].as_i64().unwrap(), question_a, question_b)
}

async fn create_subject(client: &reqwest::Client, address: &str, teacher_token: &str) -> i64 {
    let response = client
        .post(format!("{}/api/subjects", address))
        .bearer_auth(teacher_token)
        .json(&serde_json::json!({"name": unique_id("Subject")}))
        .send()
        .await
        .expect("Failed to create subject");
    assert_eq!(response.status().as_u16(), 201);
    let subject: serde_json::Value = response.json().await.unwrap();
    subject["id"].as_i64().unwrap()
}

async fn create_quiz(
    client: &reqwest::Client,
    address: &str,
    teacher_token: &str,
    name: &str,
    number: i32,
    subject_id: i64,
    question_id: i64,
) -> i64 {
    let response = client
        .post(format!("{}/api/quizzes", address))
        .bearer_auth(teacher_token)
        .json(&serde_json::json!({
            "name": name,
            "number": number,
            "duration_minutes": 30,
            "ends_at": "2030-01-01T00:00:00Z",
            "sections": [
                {"subject_id": subject_id, "question_ids": [question_id]}
            ],
        }))
        .send()
        .await
        .expect("Failed to create quiz");
    assert_eq!(response.status().as_u16(), 201);
    let quiz: serde_json::Value = response.json().await.unwrap();
    quiz["id"].as_i64().unwrap()
}

#[tokio::test]
async fn discovery_filters_by_subject_and_sorts_by_number() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher_token = sync_user_and_token(&client, &address, &unique_id("tch"), "TEACHER").await;

    let math_id = create_subject(&client, &address, &teacher_token).await;
    let physics_id = create_subject(&client, &address, &teacher_token).await;
    let question =
        create_question(&client, &address, &teacher_token, "A?", &["x", "y"], "x").await;

    // Unique name prefix keeps keyword queries independent of other test data.
    let prefix = unique_id("Quiz");
    let math_quiz = create_quiz(
        &client,
        &address,
        &teacher_token,
        &format!("{} math", prefix),
        2,
        math_id,
        question,
    )
    .await;
    let physics_quiz = create_quiz(
        &client,
        &address,
        &teacher_token,
        &format!("{} physics", prefix),
        1,
        physics_id,
        question,
    )
    .await;

    // Subject filter: only the quiz containing a section for that subject.
    let response = client
        .get(format!("{}/api/quizzes?subject_id={}", address, math_id))
        .bearer_auth(&teacher_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let quizzes: serde_json::Value = response.json().await.unwrap();
    let quizzes = quizzes.as_array().unwrap();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0]["id"].as_i64(), Some(math_quiz));

    // Keyword search narrows to this run's quizzes; sort=number is ascending.
    let response = client
        .get(format!("{}/api/quizzes?q={}&sort=number", address, prefix))
        .bearer_auth(&teacher_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let quizzes: serde_json::Value = response.json().await.unwrap();
    let quizzes = quizzes.as_array().unwrap();
    assert_eq!(quizzes.len(), 2);
    assert_eq!(quizzes[0]["id"].as_i64(), Some(physics_quiz));
    assert_eq!(quizzes[1]["id"].as_i64(), Some(math_quiz));
}

#[tokio::test]
async fn quiz_detail_hides_correct_answers() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher_token = sync_user_and_token(&client, &address, &unique_id("tch"), "TEACHER").await;
    let student_token = sync_user_and_token(&client, &address, &unique_id("stu"), "STUDENT").await;

    let (quiz_id, _, _) = build_two_question_quiz(&client, &address, &teacher_token).await;

    let response = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("Failed to fetch quiz");
    assert_eq!(response.status().as_u16(), 200);

    let body = response.text().await.unwrap();
    assert!(!body.contains("correct_one"));

    let detail: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(detail["sections"].as_array().unwrap().len(), 1);
    assert_eq!(
        detail["sections"][0]["questions"].as_array().unwrap().len(),
        2
    );
}

#[tokio::test]
async fn tie_submission_passes_with_exact_counts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher_token = sync_user_and_token(&client, &address, &unique_id("tch"), "TEACHER").await;
    let student_token = sync_user_and_token(&client, &address, &unique_id("stu"), "STUDENT").await;

    let (quiz_id, question_a, question_b) =
        build_two_question_quiz(&client, &address, &teacher_token).await;

    let response = client
        .post(format!("{}/api/quiz/{}/submit", address, quiz_id))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({
            "answers": [
                {"question_id": question_a, "selected_answer": "x", "time_spent": 25},
                {"question_id": question_b, "selected_answer": "z"},
            ],
        }))
        .send()
        .await
        .expect("Failed to submit quiz");
    assert_eq!(response.status().as_u16(), 202);

    let body: serde_json::Value = response.json().await.unwrap();
    let result = &body["result"];
    assert_eq!(result["total_questions"], 2);
    assert_eq!(result["correct_answers"], 1);
    assert_eq!(result["wrong_answers"], 1);
    assert_eq!(result["score"], 1);
    assert_eq!(result["status"], "PASSED");

    let sections = body["data"].as_array().unwrap();
    assert_eq!(sections.len(), 1);
    let questions = sections[0]["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0]["is_correct"], true);
    assert_eq!(questions[0]["time_spent"], 25);
    assert_eq!(questions[1]["is_correct"], false);
    // Absent time_spent falls back to the default constant.
    assert_eq!(questions[1]["time_spent"], 10);

    // The persisted attempt carries exactly one answer row per quiz question.
    let attempt_id = result["id"].as_i64().unwrap();
    let response = client
        .get(format!("{}/api/attempts/{}", address, attempt_id))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("Failed to fetch attempt");
    assert_eq!(response.status().as_u16(), 200);
    let detail: serde_json::Value = response.json().await.unwrap();
    assert_eq!(detail["answers"].as_array().unwrap().len(), 2);
    assert_eq!(detail["attempt"]["status"], "PASSED");
}

#[tokio::test]
async fn omitted_question_is_recorded_as_unanswered() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher_token = sync_user_and_token(&client, &address, &unique_id("tch"), "TEACHER").await;
    let student_token = sync_user_and_token(&client, &address, &unique_id("stu"), "STUDENT").await;

    let (quiz_id, question_a, question_b) =
        build_two_question_quiz(&client, &address, &teacher_token).await;

    let response = client
        .post(format!("{}/api/quiz/{}/submit", address, quiz_id))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({
            "answers": [
                {"question_id": question_a, "selected_answer": "x"},
            ],
        }))
        .send()
        .await
        .expect("Failed to submit quiz");
    assert_eq!(response.status().as_u16(), 202);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["result"]["total_questions"], 2);
    assert_eq!(body["result"]["wrong_answers"], 1);

    let questions = body["data"][0]["questions"].as_array().unwrap();
    let omitted = questions
        .iter()
        .find(|q| q["question_id"].as_i64() == Some(question_b))
        .expect("Omitted question must still appear in the results");
    assert_eq!(omitted["selected_answer"], "");
    assert_eq!(omitted["is_correct"], false);
}

#[tokio::test]
async fn submission_rejects_bad_input() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher_token = sync_user_and_token(&client, &address, &unique_id("tch"), "TEACHER").await;
    let student_token = sync_user_and_token(&client, &address, &unique_id("stu"), "STUDENT").await;

    let (quiz_id, question_a, _) =
        build_two_question_quiz(&client, &address, &teacher_token).await;

    // Empty answers list -> 400 before any lookup.
    let response = client
        .post(format!("{}/api/quiz/{}/submit", address, quiz_id))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({"answers": []}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // 'answers' not a list -> 400, not axum's default 422.
    let response = client
        .post(format!("{}/api/quiz/{}/submit", address, quiz_id))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({"answers": 5}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // 'answers' missing entirely -> 400 as well.
    let response = client
        .post(format!("{}/api/quiz/{}/submit", address, quiz_id))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Unknown quiz -> 404.
    let response = client
        .post(format!("{}/api/quiz/{}/submit", address, 999_999_999))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({
            "answers": [{"question_id": question_a, "selected_answer": "x"}],
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 404);

    // Teacher sessions cannot submit.
    let response = client
        .post(format!("{}/api/quiz/{}/submit", address, quiz_id))
        .bearer_auth(&teacher_token)
        .json(&serde_json::json!({
            "answers": [{"question_id": question_a, "selected_answer": "x"}],
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn repeat_submissions_accumulate_attempts() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let teacher_token = sync_user_and_token(&client, &address, &unique_id("tch"), "TEACHER").await;
    let student_token = sync_user_and_token(&client, &address, &unique_id("stu"), "STUDENT").await;

    let (quiz_id, question_a, question_b) =
        build_two_question_quiz(&client, &address, &teacher_token).await;

    // Fresh student: eligible.
    let response = client
        .get(format!("{}/api/quiz/{}/eligibility", address, quiz_id))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["eligible"], true);

    let submission = serde_json::json!({
        "answers": [
            {"question_id": question_a, "selected_answer": "x"},
            {"question_id": question_b, "selected_answer": "y"},
        ],
    });

    for _ in 0..2 {
        let response = client
            .post(format!("{}/api/quiz/{}/submit", address, quiz_id))
            .bearer_auth(&student_token)
            .json(&submission)
            .send()
            .await
            .expect("Failed to submit quiz");
        assert_eq!(response.status().as_u16(), 202);
    }

    // Eligibility is advisory only; both submissions produced attempts.
    let response = client
        .get(format!("{}/api/quiz/{}/eligibility", address, quiz_id))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("Failed to execute request");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["eligible"], false);

    let response = client
        .get(format!("{}/api/attempts", address))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let attempts: serde_json::Value = response.json().await.unwrap();
    assert_eq!(attempts.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn teacher_dashboard_lists_attempts_for_owned_quiz_only() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let owner_token = sync_user_and_token(&client, &address, &unique_id("tch"), "TEACHER").await;
    let other_token = sync_user_and_token(&client, &address, &unique_id("tch"), "TEACHER").await;
    let student_token = sync_user_and_token(&client, &address, &unique_id("stu"), "STUDENT").await;

    let (quiz_id, question_a, _) = build_two_question_quiz(&client, &address, &owner_token).await;

    let response = client
        .post(format!("{}/api/quiz/{}/submit", address, quiz_id))
        .bearer_auth(&student_token)
        .json(&serde_json::json!({
            "answers": [{"question_id": question_a, "selected_answer": "x"}],
        }))
        .send()
        .await
        .expect("Failed to submit quiz");
    assert_eq!(response.status().as_u16(), 202);

    let response = client
        .get(format!("{}/api/quizzes/{}/attempts", address, quiz_id))
        .bearer_auth(&owner_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let attempts: serde_json::Value = response.json().await.unwrap();
    assert_eq!(attempts.as_array().unwrap().len(), 1);

    // Another teacher cannot read or delete someone else's quiz.
    let response = client
        .get(format!("{}/api/quizzes/{}/attempts", address, quiz_id))
        .bearer_auth(&other_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .delete(format!("{}/api/quizzes/{}", address, quiz_id))
        .bearer_auth(&other_token)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 403);
}
