use std::sync::Arc;

use auth::Authenticator;
use auth::PasswordHasher;
use auth::TokenCodec;
use auth::TokenLifetimes;
use auth_service::domain::user::service::AuthService;
use auth_service::inbound::http::router::create_router;
use auth_service::outbound::repositories::InMemoryUserRepository;
use reqwest::StatusCode;
use serde_json::json;
use serde_json::Value;

pub const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub repository: InMemoryUserRepository,
    pub api_client: reqwest::Client,
    pub token_codec: TokenCodec,
}

/// Tokens returned by a successful login
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        // Clones share storage, so the test can inspect what the server wrote
        let repository = InMemoryUserRepository::new();

        let authenticator = Arc::new(Authenticator::with_settings(
            TEST_SECRET,
            PasswordHasher::with_cost(PasswordHasher::MIN_COST).unwrap(),
            TokenLifetimes::default(),
        ));

        let auth_service = Arc::new(AuthService::new(
            Arc::new(repository.clone()),
            Arc::clone(&authenticator),
        ));

        let router = create_router(auth_service, authenticator);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            repository,
            api_client: reqwest::Client::new(),
            token_codec: TokenCodec::new(TEST_SECRET),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/auth{}", self.address, path)
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(self.url(path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(self.url(path))
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(self.url(path))
    }

    /// Helper to make DELETE request
    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.delete(self.url(path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make PUT request with Bearer token
    pub fn put_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.put(path).bearer_auth(token)
    }

    /// Helper to make DELETE request with Bearer token
    pub fn delete_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.delete(path).bearer_auth(token)
    }

    /// Helper to call the refresh endpoint with a refresh token header
    pub fn refresh(&self, refresh_token: &str) -> reqwest::RequestBuilder {
        self.post("/refresh").header("Refresh-Token", refresh_token)
    }

    /// Register a user and assert it succeeded
    pub async fn register(&self, email: &str, password: &str) -> Value {
        let response = self
            .post("/register")
            .json(&json!({
                "email": email,
                "password": password,
                "first_name": "Alice",
                "last_name": "A"
            }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.expect("Failed to parse response")
    }

    /// Log a user in and return the issued tokens
    pub async fn login(&self, email: &str, password: &str) -> LoginTokens {
        let response = self
            .post("/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.expect("Failed to parse response");

        LoginTokens {
            access_token: body["data"]["access_token"].as_str().unwrap().to_string(),
            refresh_token: body["data"]["refresh_token"].as_str().unwrap().to_string(),
        }
    }
}
