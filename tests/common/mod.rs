use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

use vigil::auth::jwt::{self, Claims};
use vigil::config::Config;

const JWT_SECRET: &str = "integration-test-secret";

/// A running test server instance with a dedicated test database.
///
/// Requires `TEST_DATABASE_URL` pointing at a Postgres the tests may create
/// and drop databases on; `spawn_app` returns `None` (and the test skips)
/// when it is not set.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub client: Client,
    pub db_name: String,
    admin_url: String,
}

pub async fn spawn_app() -> Option<TestApp> {
    let Ok(admin_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping integration test");
        return None;
    };

    let db_name = format!("vigil_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&admin_url)
        .await
        .expect("connect to admin database");
    admin_pool
        .execute(format!("CREATE DATABASE {db_name}").as_str())
        .await
        .expect("create test database");
    drop(admin_pool);

    let base = admin_url
        .rsplit_once('/')
        .map(|(base, _)| base)
        .expect("TEST_DATABASE_URL should contain a database path");
    let database_url = format!("{base}/{db_name}");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: JWT_SECRET.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        max_body_size: 262_144,
        trusted_proxies: Vec::new(),
        log_level: "warn".to_string(),
        ingest_queue_size: 1024,
        // Small on purpose so a 3-row export exercises multiple batches.
        export_chunk_size: 2,
        query_timeout_secs: 5,
    };

    let (app, _audit_writer) = vigil::build_app(pool.clone(), config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("test server failed");
    });

    Some(TestApp {
        addr,
        pool,
        client: Client::new(),
        db_name,
        admin_url,
    })
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Mint a token for a fresh user in `tenant` carrying `caps`.
    pub fn token(&self, tenant_id: Uuid, caps: &[&str]) -> String {
        self.token_for_user(tenant_id, Uuid::now_v7(), caps)
    }

    pub fn token_for_user(&self, tenant_id: Uuid, user_id: Uuid, caps: &[&str]) -> String {
        let claims = Claims::new(
            user_id,
            tenant_id,
            Some("auditor@test.com".to_string()),
            caps.iter().map(|c| c.to_string()).collect(),
        );
        jwt::encode_token(&claims, JWT_SECRET).expect("encode test token")
    }

    pub async fn ingest(&self, token: &str, payload: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/v1/audit/events"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .expect("ingest request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get_json(&self, token: &str, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Ingestion is asynchronous; poll the list endpoint until the tenant's
    /// total reaches `expected`.
    pub async fn wait_for_total(&self, read_token: &str, expected: i64) {
        for _ in 0..100 {
            let (body, status) = self
                .get_json(read_token, "/api/v1/audit/logs?limit=1")
                .await;
            if status == StatusCode::OK && body["pagination"]["total_count"] == json!(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("timed out waiting for {expected} audit events");
    }
}

pub async fn cleanup(app: TestApp) {
    let TestApp {
        pool,
        db_name,
        admin_url,
        ..
    } = app;
    pool.close().await;

    let admin_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&admin_url)
        .await
        .expect("connect to admin database for cleanup");
    let _ = admin_pool
        .execute(format!("DROP DATABASE IF EXISTS {db_name} WITH (FORCE)").as_str())
        .await;
}
