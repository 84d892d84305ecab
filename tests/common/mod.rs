//! Shared harness for the HTTP tests: a fresh in-memory database per app,
//! a seeded administrator, and thin request helpers around `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use farmlands::{
    app::build_app,
    config::{AdminConfig, AppConfig, JwtConfig},
    db,
    state::AppState,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@farm.test";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        database_max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: JWT_SECRET.into(),
            ttl_hours: 24,
        },
        admin: AdminConfig {
            username: "root".into(),
            email: ADMIN_EMAIL.into(),
            password: Some(ADMIN_PASSWORD.into()),
        },
    }
}

pub async fn spawn_app() -> TestApp {
    let config = test_config();
    let pool = db::connect(&config.database_url, config.database_max_connections)
        .await
        .unwrap();
    db::bootstrap(&pool, &config.admin).await.unwrap();
    let state = AppState::from_parts(pool, Arc::new(config));
    TestApp {
        router: build_app(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec(), headers)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = Request::builder().uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let (status, body, _) = self.send(req.body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, token, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, token: Option<&str>, body: String) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .uri(uri)
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let (status, body, _) = self.send(req.body(Body::from(body)).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, json) = self
            .post_json(
                "/api/usuario/login",
                None,
                json!({"email": email, "password": password}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {json}");
        json["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Registers a plain user and returns its id.
    pub async fn register_user(&self, username: &str, email: &str) -> i64 {
        let (status, json) = self
            .post_json(
                "/api/usuario/register",
                None,
                json!({
                    "name": "Ana",
                    "lastname": "Gómez",
                    "username": username,
                    "email": email,
                    "password": "secret1"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {json}");
        json["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_project(&self, token: &str, descripcion: &str) -> i64 {
        let (status, json) = self
            .post_json(
                "/api/proyectos",
                Some(token),
                json!({
                    "descripcion": descripcion,
                    "fecha_inicio": "2025-03-01",
                    "fecha_cierre": "2025-09-30"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create project failed: {json}");
        json["data"]["id"].as_i64().unwrap()
    }

    pub async fn create_catalog_item(&self, token: &str, path: &str, descripcion: &str) -> i64 {
        let (status, json) = self
            .post_json(path, Some(token), json!({"descripcion": descripcion}))
            .await;
        assert_eq!(status, StatusCode::OK, "create {path} failed: {json}");
        json["data"]["id"].as_i64().unwrap()
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.state.db)
            .await
            .unwrap()
    }
}
