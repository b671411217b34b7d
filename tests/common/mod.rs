//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use banking_core::api::{self, AppState};
use banking_core::ledger::{InstrumentLocks, LedgerEngine, LedgerSettings};
use banking_core::notify::{LogNotifier, NotificationDispatcher};
use banking_core::provisioning::{ProvisioningService, ProvisioningSettings};
use banking_core::store::{InMemoryStore, InstrumentStore};

pub const PIN: &str = "1234";

/// Wire the services over a fresh in-memory store
pub fn setup_state() -> AppState {
    let store: Arc<dyn InstrumentStore> = Arc::new(InMemoryStore::new());
    let (notifier, _worker) = NotificationDispatcher::spawn(Arc::new(LogNotifier), 256);
    let locks = Arc::new(InstrumentLocks::new());

    AppState::new(
        LedgerEngine::new(store.clone(), locks.clone(), notifier, LedgerSettings::default()),
        ProvisioningService::new(store, locks, ProvisioningSettings::default()),
    )
}

/// Full router, as served by the binary
pub fn setup_app() -> Router {
    api::build_router(setup_state())
}

/// Send a request and decode the JSON response (Null for empty bodies)
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(json) => builder.body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, json)
}

/// Register a customer, open one account and fund it. Returns the account number.
pub async fn funded_account(app: &Router, email: &str, amount: &str) -> u64 {
    let (status, customer) = send(
        app,
        Method::POST,
        "/api/v1/customers",
        Some(serde_json::json!({ "full_name": "Test Customer", "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "customer creation failed: {}", customer);

    let (status, account) = send(
        app,
        Method::POST,
        &format!("/api/v1/customers/{}/accounts", customer["id"].as_str().unwrap()),
        Some(serde_json::json!({ "account_type": "SAVINGS", "pin": PIN })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "account opening failed: {}", account);
    let number = account["number"].as_u64().unwrap();

    if amount != "0" {
        let (status, _) = send(
            app,
            Method::POST,
            &format!("/api/v1/accounts/{}/deposit", number),
            Some(serde_json::json!({ "amount": amount })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "deposit failed");
    }

    number
}

/// Current balance of an account
pub async fn balance(app: &Router, number: u64) -> Decimal {
    let (status, account) = send(app, Method::GET, &format!("/api/v1/accounts/{}", number), None).await;
    assert_eq!(status, StatusCode::OK);
    account["balance"].as_str().unwrap().parse().unwrap()
}
