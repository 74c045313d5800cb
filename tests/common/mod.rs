#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use recipe_api::app::app;
use recipe_api::config::AppConfig;
use recipe_api::database::MemoryStore;
use recipe_api::state::AppState;

pub const PASSWORD: &str = "testpass123";

/// bcrypt's minimum accepted cost
const TEST_BCRYPT_COST: u32 = 4;

/// In-process server over a fresh in-memory store.
///
/// The server task lives on the calling test's runtime, so every test gets its
/// own isolated instance.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let mut config = AppConfig::development();
        config.database.url = None;
        config.server.enable_request_logging = false;
        config.security.bcrypt_cost = TEST_BCRYPT_COST;

        let state = AppState::new(Arc::new(MemoryStore::new()), &config);
        let router = app(state, &config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            client: Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn create_user(&self, email: &str, password: &str, name: &str) -> Result<reqwest::Response> {
        let res = self
            .client
            .post(self.url("/user/create/"))
            .json(&json!({ "email": email, "password": password, "name": name }))
            .send()
            .await?;
        Ok(res)
    }

    pub async fn token(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        let res = self
            .client
            .post(self.url("/user/token/"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(res)
    }

    /// Register `email` and return a client that sends its token on every request
    pub async fn authenticated(&self, email: &str) -> Result<Client> {
        let res = self.create_user(email, PASSWORD, "Test Name").await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "user creation failed: {}", res.status());

        let body: Value = self.token(email, PASSWORD).await?.json().await?;
        let key = body["data"]["token"]
            .as_str()
            .context("token missing from response")?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Token {}", key))?);
        Ok(Client::builder().default_headers(headers).build()?)
    }

    /// POST a recipe with defaults for any field `overrides` leaves out
    pub async fn create_recipe(&self, client: &Client, overrides: Value) -> Result<Value> {
        let mut payload = json!({
            "title": "Sample recipe title",
            "time_minutes": 22,
            "price": "5.25",
            "description": "Sample description",
            "link": "http://example.com/recipe.pdf",
        });
        if let (Some(target), Some(extra)) = (payload.as_object_mut(), overrides.as_object()) {
            target.extend(extra.clone());
        }

        let res = client.post(self.url("/recipe/recipes/")).json(&payload).send().await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "recipe creation failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["data"].clone())
    }
}

pub fn recipe_url(id: &Value) -> String {
    format!("/recipe/recipes/{}/", id)
}

pub fn tag_url(id: &Value) -> String {
    format!("/recipe/tags/{}/", id)
}

/// Tag names from a rendered recipe, sorted for order-insensitive comparison
pub fn tag_names(recipe: &Value) -> Vec<String> {
    let mut names: Vec<String> = recipe["tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
