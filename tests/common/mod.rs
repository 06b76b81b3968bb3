//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use chat_relay::config::{
    CorsSettings, DatabaseSettings, DispatcherSettings, JwtSettings, ServerSettings, Settings,
    StoreBackend, StoreSettings, WebSocketSettings,
};
use chat_relay::domain::UserDisplay;
use chat_relay::infrastructure::repositories::MemoryChatStore;
use chat_relay::presentation::middleware::JwtVerifier;
use chat_relay::startup::{build_router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars";

/// Settings for a memory-backed app that never touches the network
pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        store: StoreSettings {
            backend: StoreBackend::Memory,
        },
        database: DatabaseSettings {
            url: None,
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: 1,
            run_migrations: false,
        },
        jwt: JwtSettings {
            secret: TEST_SECRET.into(),
            expiry_minutes: 60,
        },
        cors: CorsSettings {
            allowed_origins: vec![],
        },
        websocket: WebSocketSettings {
            max_message_size: 65536,
            max_frame_size: 16384,
            send_timeout_ms: 1000,
        },
        dispatcher: DispatcherSettings {
            queue_capacity: 100,
            workers: 1,
        },
        environment: "test".into(),
    }
}

/// Test application over the in-memory store
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryChatStore>,
    verifier: JwtVerifier,
}

impl TestApp {
    /// Create a test application seeded with alice (u1), bob (u2) and carol (u3)
    pub fn new() -> Self {
        let settings = test_settings();
        let store = Arc::new(MemoryChatStore::with_users([
            UserDisplay::new("u1", "alice"),
            UserDisplay::new("u2", "bob"),
            UserDisplay::new("u3", "carol"),
        ]));
        let verifier = JwtVerifier::new(&settings.jwt);
        let state = AppState::new(settings, store.clone());
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            verifier,
        }
    }

    /// Mint a valid token for `user_id`
    pub fn token_for(&self, user_id: &str) -> String {
        self.verifier.issue(user_id).unwrap()
    }

    /// Send a request through the router
    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated GET request
    pub async fn get_auth(&self, uri: &str, token: &str) -> axum::response::Response {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post_json_auth(
        &self,
        uri: &str,
        body: &str,
        token: &str,
    ) -> axum::response::Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Read a response body as JSON
pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status, then decode the body
pub async fn expect_json(response: axum::response::Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    json_body(response).await
}
