// tests/grading_flow.rs
//
// End-to-end flow: answer key, roster import, sheet scanning, alerts,
// item analysis and score summary for one exam.

use scanmark::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

async fn spawn_app() -> (String, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        admin_username: None,
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

async fn login(client: &reqwest::Client, address: &str) -> String {
    let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    login["token"].as_str().expect("Token not found").to_string()
}

/// Creates a 2-question exam, imports a roster, saves the key "A","B".
async fn setup_exam(client: &reqwest::Client, address: &str, token: &str) -> i64 {
    let exam: serde_json::Value = client
        .post(format!("{}/api/exams", address))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "title": "Unit quiz",
            "num_items": 2,
            "choices_per_item": 4
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let exam_id = exam["id"].as_i64().unwrap();

    let response = client
        .post(format!("{}/api/exams/{}/students/import", address, exam_id))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "students": [
                {"student_number": "S001", "name": "Ada"},
                {"student_number": "S002", "name": "Ben"},
                {"student_number": "S003", "name": "Cai"},
                {"student_number": "S004", "name": "Dee"}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);

    let response = client
        .put(format!("{}/api/exams/{}/answer-key", address, exam_id))
        .bearer_auth(token)
        .json(&serde_json::json!({"answers": ["A", "B"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    exam_id
}

async fn scan(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    exam_id: i64,
    student_number: Option<&str>,
    answers: [&str; 2],
) -> serde_json::Value {
    let response = client
        .post(format!("{}/api/exams/{}/sheets", address, exam_id))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "student_number": student_number,
            "answers": answers
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn answer_key_validation_and_locking() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;
    let exam_id = setup_exam(&client, &address, &token).await;

    // Wrong length
    let response = client
        .put(format!("{}/api/exams/{}/answer-key", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({"answers": ["A"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Label outside A-D for a 4-choice exam
    let response = client
        .put(format!("{}/api/exams/{}/answer-key", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({"answers": ["A", "E"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    // Lowercase input is normalized to uppercase
    let response = client
        .put(format!("{}/api/exams/{}/answer-key", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({"answers": ["a", "b"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let key: serde_json::Value = response.json().await.unwrap();
    assert_eq!(key["answers"], serde_json::json!(["A", "B"]));

    // Lock, then saving is a conflict
    let response = client
        .post(format!("{}/api/exams/{}/answer-key/lock", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = client
        .put(format!("{}/api/exams/{}/answer-key", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({"answers": ["C", "D"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn sheets_are_scored_and_matched_at_ingest() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;
    let exam_id = setup_exam(&client, &address, &token).await;

    let sheet = scan(&client, &address, &token, exam_id, Some("S001"), ["A", "B"]).await;
    assert_eq!(sheet["score"], 2);
    assert_eq!(sheet["is_null_id"], false);

    // Unknown student number: stored but flagged
    let sheet = scan(&client, &address, &token, exam_id, Some("NOPE"), ["A", "B"]).await;
    assert_eq!(sheet["is_null_id"], true);

    // No student number at all
    let sheet = scan(&client, &address, &token, exam_id, None, ["B", "B"]).await;
    assert_eq!(sheet["is_null_id"], true);

    // Wrong answer count is rejected
    let response = client
        .post(format!("{}/api/exams/{}/sheets", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({"student_number": "S002", "answers": ["A"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn replacing_the_key_rescores_stored_sheets() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;
    let exam_id = setup_exam(&client, &address, &token).await;

    // Scored 2 against the original key "A","B"
    let sheet = scan(&client, &address, &token, exam_id, Some("S001"), ["A", "B"]).await;
    assert_eq!(sheet["score"], 2);

    // Re-key while unlocked; the stored sheet must be rescored
    let response = client
        .put(format!("{}/api/exams/{}/answer-key", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({"answers": ["B", "B"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let sheets: Vec<serde_json::Value> = client
        .get(format!("{}/api/exams/{}/sheets", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sheets[0]["score"], 1);

    // Summary agrees with the recomputing analysis view
    let summary: serde_json::Value = client
        .get(format!("{}/api/exams/{}/summary", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["highest"], 1);
    assert_eq!(summary["mean"], 1.0);
}

#[tokio::test]
async fn alerts_surface_null_ids_and_duplicates() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;
    let exam_id = setup_exam(&client, &address, &token).await;

    scan(&client, &address, &token, exam_id, Some("S001"), ["A", "B"]).await;
    scan(&client, &address, &token, exam_id, Some("S001"), ["A", "C"]).await;
    scan(&client, &address, &token, exam_id, None, ["B", "B"]).await;

    let alerts: serde_json::Value = client
        .get(format!("{}/api/exams/{}/alerts", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(alerts["null_id_sheets"].as_array().unwrap().len(), 1);
    let dupes = alerts["duplicate_students"].as_array().unwrap();
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes[0]["student_number"], "S001");
    assert_eq!(dupes[0]["sheet_count"], 2);
}

#[tokio::test]
async fn analysis_reports_item_statistics() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;
    let exam_id = setup_exam(&client, &address, &token).await;

    // Four valid sheets and one null-ID sheet that must not count.
    scan(&client, &address, &token, exam_id, Some("S001"), ["A", "B"]).await;
    scan(&client, &address, &token, exam_id, Some("S002"), ["A", "C"]).await;
    scan(&client, &address, &token, exam_id, Some("S003"), ["B", "B"]).await;
    scan(&client, &address, &token, exam_id, Some("S004"), ["A", "B"]).await;
    scan(&client, &address, &token, exam_id, None, ["A", "B"]).await;

    let body: serde_json::Value = client
        .get(format!("{}/api/exams/{}/analysis", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
    let analysis = &body["analysis"];
    assert_eq!(analysis["total_papers"], 4);
    assert_eq!(analysis["avg_correct_rate"], 75);

    let q1 = &analysis["questions"][0];
    assert_eq!(q1["correct_rate"], 75);
    assert_eq!(q1["difficulty"], "medium");
    assert_eq!(q1["total_responses"], 4);
    assert_eq!(q1["distribution"]["A"], 3);
    assert_eq!(q1["distribution"]["B"], 1);
    assert_eq!(q1["discrimination"], 0.5);

    let q2 = &analysis["questions"][1];
    assert_eq!(q2["correct_rate"], 75);
    assert_eq!(q2["difficulty"], "medium");
    assert_eq!(q2["distribution"]["B"], 3);
    assert_eq!(q2["distribution"]["C"], 1);
}

#[tokio::test]
async fn analysis_empty_states_are_distinguished() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;

    // Exam without an answer key
    let exam: serde_json::Value = client
        .post(format!("{}/api/exams", address))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "title": "No key yet",
            "num_items": 2,
            "choices_per_item": 4
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let exam_id = exam["id"].as_i64().unwrap();

    let body: serde_json::Value = client
        .get(format!("{}/api/exams/{}/analysis", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "no_answer_key");
    assert!(body["analysis"].is_null());

    // Key saved, but no sheets scanned yet
    client
        .put(format!("{}/api/exams/{}/answer-key", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({"answers": ["A", "B"]}))
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = client
        .get(format!("{}/api/exams/{}/analysis", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "no_valid_sheets");
    let analysis = &body["analysis"];
    assert_eq!(analysis["total_papers"], 0);
    assert_eq!(analysis["questions"].as_array().unwrap().len(), 2);
    assert_eq!(analysis["questions"][0]["total_responses"], 0);
}

#[tokio::test]
async fn summary_reports_score_distribution() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;
    let exam_id = setup_exam(&client, &address, &token).await;

    scan(&client, &address, &token, exam_id, Some("S001"), ["A", "B"]).await;
    scan(&client, &address, &token, exam_id, Some("S002"), ["A", "C"]).await;
    scan(&client, &address, &token, exam_id, Some("S003"), ["C", "D"]).await;
    // Null-ID sheet excluded from the summary
    scan(&client, &address, &token, exam_id, None, ["A", "B"]).await;

    let summary: serde_json::Value = client
        .get(format!("{}/api/exams/{}/summary", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(summary["total_sheets"], 3);
    assert_eq!(summary["highest"], 2);
    assert_eq!(summary["lowest"], 0);
    assert_eq!(summary["mean"], 1.0);
    assert_eq!(summary["histogram"]["2"], 1);
    assert_eq!(summary["histogram"]["1"], 1);
    assert_eq!(summary["histogram"]["0"], 1);
}

#[tokio::test]
async fn roster_import_skips_duplicates() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;
    let exam_id = setup_exam(&client, &address, &token).await;

    let result: serde_json::Value = client
        .post(format!("{}/api/exams/{}/students/import", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "students": [
                {"student_number": "S001", "name": "Ada again"},
                {"student_number": "S005", "name": "Eve"}
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(result["inserted"], 1);
    assert_eq!(result["skipped"], 1);

    let students: Vec<serde_json::Value> = client
        .get(format!("{}/api/exams/{}/students", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(students.len(), 5);

    // Malformed student number in an import payload
    let response = client
        .post(format!("{}/api/exams/{}/students/import", address, exam_id))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "students": [{"student_number": "bad id!", "name": "X"}]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn deleting_a_sheet_removes_it_from_analysis() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let token = login(&client, &address).await;
    let exam_id = setup_exam(&client, &address, &token).await;

    scan(&client, &address, &token, exam_id, Some("S001"), ["A", "B"]).await;
    let second = scan(&client, &address, &token, exam_id, Some("S002"), ["C", "C"]).await;
    let sheet_id = second["id"].as_i64().unwrap();

    let response = client
        .delete(format!(
            "{}/api/exams/{}/sheets/{}",
            address, exam_id, sheet_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let body: serde_json::Value = client
        .get(format!("{}/api/exams/{}/analysis", address, exam_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["analysis"]["total_papers"], 1);
    assert_eq!(body["analysis"]["questions"][0]["correct_rate"], 100);
}
