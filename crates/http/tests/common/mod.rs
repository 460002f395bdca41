//! Shared helpers for the client integration tests

#![allow(dead_code)]

use paydash_core::{Credentials, MemorySessionStore, Role, Session};
use paydash_http::ApiClient;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::{MockServer, Request, ResponseTemplate, Match};

/// Wrap `data` the way the API does
pub fn envelope(data: Value) -> Value {
    json!({"statusCode": 200, "message": "OK", "data": data})
}

pub fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(envelope(data))
}

pub fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401)
        .set_body_json(json!({"statusCode": 401, "message": "Unauthorized", "data": null}))
}

pub fn token_pair(access: &str, refresh: &str) -> Value {
    json!({"accessToken": access, "refreshToken": refresh})
}

pub fn store_with(access: &str, refresh: Option<&str>, role: Role) -> Arc<MemorySessionStore> {
    let credentials = match refresh {
        Some(refresh) => Credentials::new(access, refresh),
        None => Credentials::access_only(access),
    };
    Arc::new(MemorySessionStore::with_session(Session::new(credentials, role)))
}

pub fn client_for(server: &MockServer, store: Arc<MemorySessionStore>) -> ApiClient {
    ApiClient::builder()
        .base_url(server.uri())
        .session_store(store)
        .build()
        .unwrap()
}

/// Matches requests whose bearer token starts with a prefix
pub struct BearerPrefix(pub &'static str);

impl Match for BearerPrefix {
    fn matches(&self, request: &Request) -> bool {
        request
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(&format!("Bearer {}", self.0)))
    }
}

/// Matches requests that carry no `Authorization` header
pub struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

pub fn authorization_of(request: &Request) -> Option<String> {
    request
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
