// tests/quiz_api_tests.rs

use sis_backend::{config::Config, routes, state::AppState, utils::jwt::sign_jwt};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

const TEST_SECRET: &str = "test_secret_for_integration_tests";

/// Spawns the app on a random port against a fresh in-memory database.
/// Returns the base URL and the pool (same connection the server uses).
async fn spawn_app() -> (String, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

/// Seeds an instructor account directly and returns a signed token for it.
async fn instructor_token(pool: &SqlitePool) -> String {
    let email = format!("inst_{}@school.test", &uuid::Uuid::new_v4().to_string()[..8]);
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password, full_name, role) VALUES (?, 'unused', 'Test Instructor', 'instructor') RETURNING id",
    )
    .bind(&email)
    .fetch_one(pool)
    .await
    .unwrap();

    sign_jwt(id, "instructor", TEST_SECRET, 600).unwrap()
}

/// Registers a student through the API and logs them in.
/// Returns (token, student_id).
async fn register_student(client: &reqwest::Client, address: &str) -> (String, i64) {
    let email = format!("stud_{}@school.test", &uuid::Uuid::new_v4().to_string()[..8]);
    let number = format!("S-{}", &uuid::Uuid::new_v4().to_string()[..8]);

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": email,
            "password": "password123",
            "fullName": "Test Student",
            "studentNumber": number,
            "program": "BS Computer Science",
            "yearLevel": 2
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);
    let body: serde_json::Value = resp.json().await.unwrap();
    let student_id = body["studentId"].as_i64().unwrap();

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .unwrap();

    (login["token"].as_str().unwrap().to_string(), student_id)
}

fn sample_quiz_body() -> serde_json::Value {
    serde_json::json!({
        "title": "Prelim Quiz 1",
        "description": "Covers weeks 1-3",
        "durationMinutes": 30,
        "questions": [
            {
                "question": "Which option is A?",
                "type": "multiple-choice",
                "options": ["A", "B", "C"],
                "correctAnswer": "A",
                "points": 1
            },
            {
                "question": "The sky is blue.",
                "type": "true-false",
                "options": ["True", "False"],
                "correctAnswer": "True",
                "points": 2
            }
        ]
    })
}

async fn create_quiz(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    body: &serde_json::Value,
) -> serde_json::Value {
    let resp = client
        .post(format!("{}/api/subjects/1/offerings/7/quizzes", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(body)
        .send()
        .await
        .expect("Create quiz failed");
    assert_eq!(resp.status().as_u16(), 201);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn duplicate_registration_conflicts_and_rolls_back() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let email = format!("dup_{}@school.test", &uuid::Uuid::new_v4().to_string()[..8]);
    let number = format!("S-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let body = serde_json::json!({
        "email": email,
        "password": "password123",
        "fullName": "First Registrant",
        "studentNumber": number,
        "program": "BS Computer Science",
        "yearLevel": 1
    });

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    // Same email again, different student number.
    let mut same_email = body.clone();
    same_email["studentNumber"] =
        serde_json::json!(format!("S-{}", &uuid::Uuid::new_v4().to_string()[..8]));
    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&same_email)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    // New email, duplicate student number.
    let other_email = format!("dup2_{}@school.test", &uuid::Uuid::new_v4().to_string()[..8]);
    let mut same_number = body.clone();
    same_number["email"] = serde_json::json!(other_email);
    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&same_number)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);

    // The profile insert failed inside the transaction, so the user insert
    // rolled back with it: no profile-less account left behind.
    let orphan: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(&other_email)
        .fetch_optional(&pool)
        .await
        .unwrap();
    assert!(orphan.is_none());

    // Exactly one account and one profile survive.
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(body["email"].as_str().unwrap())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 1);
    let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE student_number = ?")
        .bind(&number)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(profiles, 1);
}

#[tokio::test]
async fn login_rejects_empty_credentials() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": "", "password": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/quizzes/1", address))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn create_quiz_round_trip() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;

    let quiz = create_quiz(&client, &address, &token, &sample_quiz_body()).await;

    assert_eq!(quiz["title"], "Prelim Quiz 1");
    assert_eq!(quiz["status"], "draft");
    assert_eq!(quiz["subjectId"], 1);
    assert_eq!(quiz["offeringId"], 7);
    // Derived server-side: 1 + 2
    assert_eq!(quiz["totalPoints"], 3);

    // Fetch it back with a privileged role: content identical to what was
    // submitted, aside from server-assigned fields.
    let fetched: serde_json::Value = client
        .get(format!("{}/api/quizzes/{}", address, quiz["id"]))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(fetched["title"], quiz["title"]);
    assert_eq!(fetched["durationMinutes"], 30);
    assert_eq!(fetched["questions"], sample_quiz_body()["questions"]);
}

#[tokio::test]
async fn create_quiz_rejects_empty_or_missing_questions() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;

    for questions in [serde_json::json!([]), serde_json::Value::Null] {
        let mut body = sample_quiz_body();
        body["questions"] = questions;

        let resp = client
            .post(format!("{}/api/subjects/1/offerings/7/quizzes", address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400);
    }

    // Nothing persisted.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quizzes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn create_quiz_rejects_incomplete_question() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;

    for missing in ["question", "type", "options", "correctAnswer"] {
        let mut body = sample_quiz_body();
        body["questions"][0]
            .as_object_mut()
            .unwrap()
            .remove(missing);

        let resp = client
            .post(format!("{}/api/subjects/1/offerings/7/quizzes", address))
            .header("Authorization", format!("Bearer {}", token))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "missing field: {}", missing);
    }
}

#[tokio::test]
async fn students_cannot_author_quizzes() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (student_token, _) = register_student(&client, &address).await;

    let resp = client
        .post(format!("{}/api/subjects/1/offerings/7/quizzes", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&sample_quiz_body())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn student_views_never_contain_correct_answers() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;
    let (student_token, _) = register_student(&client, &address).await;

    let quiz = create_quiz(&client, &address, &token, &sample_quiz_body()).await;

    // Single-quiz read path.
    let single = client
        .get(format!("{}/api/quizzes/{}", address, quiz["id"]))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!single.contains("correctAnswer"));

    // List read path.
    let list = client
        .get(format!("{}/api/offerings/7/quizzes", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!list.contains("correctAnswer"));

    // The instructor always sees them on both paths.
    for url in [
        format!("{}/api/quizzes/{}", address, quiz["id"]),
        format!("{}/api/offerings/7/quizzes", address),
    ] {
        let text = client
            .get(url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(text.contains("correctAnswer"));
    }
}

#[tokio::test]
async fn list_quizzes_returns_newest_first() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;

    let mut first = sample_quiz_body();
    first["title"] = serde_json::json!("Older quiz");
    let mut second = sample_quiz_body();
    second["title"] = serde_json::json!("Newer quiz");

    create_quiz(&client, &address, &token, &first).await;
    let newer = create_quiz(&client, &address, &token, &second).await;

    let list: Vec<serde_json::Value> = client
        .get(format!("{}/api/offerings/7/quizzes", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], newer["id"]);
}

#[tokio::test]
async fn update_quiz_replaces_fields_and_rederives_points() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;

    let quiz = create_quiz(&client, &address, &token, &sample_quiz_body()).await;

    let updated_body = serde_json::json!({
        "title": "Prelim Quiz 1 (revised)",
        "durationMinutes": 45,
        "status": "published",
        "questions": [
            {
                "question": "Pick B this time",
                "type": "multiple-choice",
                "options": ["A", "B"],
                "correctAnswer": "B",
                "points": 5
            }
        ]
    });

    let resp = client
        .put(format!("{}/api/quizzes/{}", address, quiz["id"]))
        .header("Authorization", format!("Bearer {}", token))
        .json(&updated_body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let updated: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(updated["title"], "Prelim Quiz 1 (revised)");
    assert_eq!(updated["status"], "published");
    assert_eq!(updated["totalPoints"], 5);
    assert_eq!(updated["questions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_unknown_quiz_returns_404() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;

    let resp = client
        .put(format!("{}/api/quizzes/9999", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&sample_quiz_body())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn get_unknown_quiz_returns_404() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;

    let resp = client
        .get(format!("{}/api/quizzes/9999", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn delete_quiz_cascades_submissions() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;
    let (student_token, student_id) = register_student(&client, &address).await;

    let quiz = create_quiz(&client, &address, &token, &sample_quiz_body()).await;
    let quiz_id = quiz["id"].as_i64().unwrap();

    // Student submits, leaving a grading record behind.
    let resp = client
        .post(format!("{}/api/quizzes/{}/submit", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({ "answers": ["A", "True"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = client
        .delete(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Quiz and its submissions are both gone.
    let resp = client
        .get(format!("{}/api/quizzes/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = client
        .get(format!(
            "{}/api/quizzes/{}/submissions/{}",
            address, quiz_id, student_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM submissions WHERE quiz_id = ?")
        .bind(quiz_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn admin_creates_instructor_accounts() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let admin_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password, full_name, role) VALUES ('admin@school.test', 'unused', 'Registrar', 'admin') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    let admin_token = sign_jwt(admin_id, "admin", TEST_SECRET, 600).unwrap();

    let email = format!("new_inst_{}@school.test", &uuid::Uuid::new_v4().to_string()[..8]);
    let resp = client
        .post(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "email": email,
            "password": "password123",
            "fullName": "New Instructor",
            "role": "instructor"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    // The new instructor can log in and author quizzes.
    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(login["role"], "instructor");

    create_quiz(
        &client,
        &address,
        login["token"].as_str().unwrap(),
        &sample_quiz_body(),
    )
    .await;

    // Non-admins are kept out of the admin router.
    let (student_token, _) = register_student(&client, &address).await;
    let resp = client
        .get(format!("{}/api/admin/users", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn delete_unknown_quiz_returns_404() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = instructor_token(&pool).await;

    let resp = client
        .delete(format!("{}/api/quizzes/9999", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 404);
}
