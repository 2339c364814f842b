//! API integration tests
//!
//! Drive the full router over the in-memory store; no server or database
//! needed.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Local};
use serde_json::{json, Value};
use tower::ServiceExt;

use catalogue_server::{
    config::AppConfig,
    create_router,
    models::{Capability, UserClaims},
    repository::Repository,
    AppState,
};

struct TestApp {
    router: Router,
    secret: String,
}

impl TestApp {
    fn new() -> Self {
        let config = AppConfig::default();
        let secret = config.auth.jwt_secret.clone();
        let router = create_router(AppState::new(config, Repository::in_memory()));
        Self { router, secret }
    }

    fn token(&self, user_id: i32, capabilities: Vec<Capability>) -> String {
        UserClaims::new(user_id, format!("user{}", user_id), capabilities, 1)
            .create_token(&self.secret)
            .expect("Failed to sign token")
    }

    fn librarian(&self) -> String {
        self.token(1, vec![Capability::CanMarkReturned])
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Body is not JSON")
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }
}

fn date_from_today(days: i64) -> String {
    (Local::now().date_naive() + Duration::days(days)).to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/v1/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.get("/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = TestApp::new();
    let (status, body) = app.get("/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/books"].is_object());
}

#[tokio::test]
async fn test_mutation_requires_token() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/genres",
            None,
            Some(json!({ "name": "Poetry" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthenticated");
}

#[tokio::test]
async fn test_mutation_requires_capability() {
    let app = TestApp::new();
    let member = app.token(5, vec![]);
    let (status, _) = app
        .post("/api/v1/genres", &member, json!({ "name": "Poetry" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post("/api/v1/genres", &app.librarian(), json!({ "name": "Poetry" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_catalogue_flow() {
    let app = TestApp::new();
    let lib = app.librarian();

    let (status, author) = app
        .post(
            "/api/v1/authors",
            &lib,
            json!({ "first_name": "Isaac", "last_name": "Asimov", "date_of_birth": "1920-01-02" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, genre) = app
        .post("/api/v1/genres", &lib, json!({ "name": "Science Fiction" }))
        .await;

    let (status, book) = app
        .post(
            "/api/v1/books",
            &lib,
            json!({
                "title": "Foundation",
                "author_id": author["id"],
                "summary": "The fall of the Galactic Empire.",
                "isbn": "9780553293357",
                "genre_ids": [genre["id"]]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["genres"][0]["name"], "Science Fiction");

    let (status, _) = app
        .post(
            "/api/v1/books",
            &lib,
            json!({ "title": "Foundation again", "isbn": "9780553293357" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, copy) = app
        .post(
            "/api/v1/instances",
            &lib,
            json!({ "book_id": book["id"], "imprint": "Bantam, 1991", "status": "available" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, details) = app
        .get(&format!("/api/v1/books/{}", book["id"]), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["author"]["last_name"], "Asimov");
    assert_eq!(details["instances"][0]["id"], copy["id"]);

    let (status, body) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/books/{}", book["id"]),
            Some(&lib),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "StillReferenced");

    let (status, stats) = app.get("/api/v1/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["books"], 1);
    assert_eq!(stats["instances"], 1);
    assert_eq!(stats["instances_available"], 1);
    assert_eq!(stats["authors"], 1);
    assert_eq!(stats["genres"], 1);
}

#[tokio::test]
async fn test_list_books_paginated() {
    let app = TestApp::new();
    let lib = app.librarian();
    for (title, isbn) in [("Emma", "1"), ("Beloved", "2"), ("Dracula", "3")] {
        let (status, _) = app
            .post("/api/v1/books", &lib, json!({ "title": title, "isbn": isbn }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app.get("/api/v1/books?page=1&per_page=2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"][0]["title"], "Beloved");
    assert_eq!(page["items"][1]["title"], "Dracula");

    let (_, page) = app.get("/api/v1/books?page=2&per_page=2", None).await;
    assert_eq!(page["items"][0]["title"], "Emma");
}

#[tokio::test]
async fn test_loans_and_renewal() {
    let app = TestApp::new();
    let lib = app.librarian();

    let (_, borrower) = app
        .post("/api/v1/borrowers", &lib, json!({ "username": "reader" }))
        .await;
    let borrower_id = borrower["id"].as_i64().expect("borrower id") as i32;
    let (_, book) = app
        .post("/api/v1/books", &lib, json!({ "title": "Kindred", "isbn": "9780807083697" }))
        .await;
    let (_, copy) = app
        .post(
            "/api/v1/instances",
            &lib,
            json!({
                "book_id": book["id"],
                "status": "on_loan",
                "borrower_id": borrower_id,
                "due_back": date_from_today(-2)
            }),
        )
        .await;
    let copy_id = copy["id"].as_str().expect("copy id").to_string();

    let reader = app.token(borrower_id, vec![]);
    let (status, mine) = app.get("/api/v1/loans/mine", Some(&reader)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["total"], 1);
    assert_eq!(mine["items"][0]["is_overdue"], true);
    assert_eq!(mine["items"][0]["book_title"], "Kindred");

    let (status, _) = app.get("/api/v1/loans", Some(&reader)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, all) = app.get("/api/v1/loans", Some(&lib)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["total"], 1);

    let renew_uri = format!("/api/v1/instances/{}/renew", copy_id);
    let (status, proposal) = app.get(&renew_uri, Some(&lib)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proposal["proposed_due_back"], date_from_today(21));

    let (status, body) = app
        .post(&renew_uri, &lib, json!({ "due_back": date_from_today(-1) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    let (status, _) = app
        .post(&renew_uri, &reader, json!({ "due_back": date_from_today(7) }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let new_date = date_from_today(14);
    let (status, renewed) = app
        .post(&renew_uri, &lib, json!({ "due_back": new_date }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renewed["due_back"], new_date);

    let (_, mine) = app.get("/api/v1/loans/mine", Some(&reader)).await;
    assert_eq!(mine["items"][0]["is_overdue"], false);
}

#[tokio::test]
async fn test_renew_unknown_copy() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            &format!("/api/v1/instances/{}/renew", uuid::Uuid::new_v4()),
            &app.librarian(),
            json!({ "due_back": date_from_today(7) }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_author_delete_keeps_books() {
    let app = TestApp::new();
    let lib = app.librarian();
    let (_, author) = app
        .post(
            "/api/v1/authors",
            &lib,
            json!({ "first_name": "Octavia", "last_name": "Butler" }),
        )
        .await;
    let (_, book) = app
        .post(
            "/api/v1/books",
            &lib,
            json!({ "title": "Dawn", "isbn": "9780446603775", "author_id": author["id"] }),
        )
        .await;

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/authors/{}", author["id"]),
            Some(&lib),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, details) = app
        .get(&format!("/api/v1/books/{}", book["id"]), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["author_id"], Value::Null);
    assert_eq!(details["author"], Value::Null);
}

#[tokio::test]
async fn test_patch_clears_nullable_field() {
    let app = TestApp::new();
    let lib = app.librarian();
    let (_, author) = app
        .post(
            "/api/v1/authors",
            &lib,
            json!({ "first_name": "Mary", "last_name": "Shelley", "date_of_death": "1851-02-01" }),
        )
        .await;
    let uri = format!("/api/v1/authors/{}", author["id"]);

    let (status, updated) = app
        .send(Method::PUT, &uri, Some(&lib), Some(json!({ "first_name": "M." })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["date_of_death"], "1851-02-01");

    let (_, updated) = app
        .send(Method::PUT, &uri, Some(&lib), Some(json!({ "date_of_death": null })))
        .await;
    assert_eq!(updated["date_of_death"], Value::Null);
    assert_eq!(updated["first_name"], "M.");
}

#[tokio::test]
async fn test_token_with_unrecognised_capability() {
    let app = TestApp::new();
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": "librarian",
        "user_id": 1,
        "capabilities": ["can_mark_returned", "can_edit"],
        "iat": now,
        "exp": now + 3600,
    });
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(app.secret.as_bytes()),
    )
    .expect("Failed to sign token");

    let (status, genre) = app
        .post("/api/v1/genres", &token, json!({ "name": "Poetry" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(genre["name"], "Poetry");
}

#[tokio::test]
async fn test_page_number_beyond_range() {
    let app = TestApp::new();
    let (status, page) = app
        .get(&format!("/api/v1/books?page={}&per_page=20", i64::MAX), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"], json!([]));
}
