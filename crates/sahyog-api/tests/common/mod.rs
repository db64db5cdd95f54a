#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

use sahyog_api::auth::ensure_admin;
use sahyog_api::{AppState, AppStateInner};
use sahyog_db::Database;

pub const SECRET: &str = "integration-test-secret";
pub const PASSWORD: &str = "secret123";

#[derive(Clone)]
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, SECRET.to_string(), chrono::Duration::hours(24));
        let router = sahyog_api::router(state.clone());
        Self { state, router }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PATCH, uri, Some(token), Some(body)).await
    }

    /// Returns `(user_id, token)`.
    pub async fn signup(&self, name: &str, email: &str, role: &str) -> (i64, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        (
            body["user"]["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    pub async fn admin(&self) -> String {
        ensure_admin(&self.state, "Admin", "admin@sahyog.test", PASSWORD)
            .await
            .unwrap();
        let (status, body) = self.login("admin@sahyog.test", PASSWORD).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    /// An NGO user with a profile. Returns `(ngo_id, token)`.
    pub async fn ngo(&self, name: &str, email: &str) -> (i64, String) {
        let (_, token) = self.signup(name, email, "ngo").await;
        let (status, body) = self
            .post(
                "/api/ngos",
                &token,
                json!({
                    "organizationName": name,
                    "location": "Bengaluru",
                    "focusAreas": ["food"],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "ngo profile failed: {body}");
        (body["id"].as_i64().unwrap(), token)
    }

    /// Returns the new donation's id.
    pub async fn rice_bags(&self, donor_token: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/donations",
                donor_token,
                json!({
                    "type": "food",
                    "title": "Rice bags",
                    "quantity": "20 bags",
                    "pickupAddress": "12 MG Road",
                    "urgency": "high",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create donation failed: {body}");
        body["id"].as_i64().unwrap()
    }
}
