//! API Integration Tests

use axum::http::{Method, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{balance, funded_account, send, PIN};

#[tokio::test]
async fn test_health_check() {
    let app = common::setup_app();

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let app = common::setup_app();
    let correlation_id = uuid::Uuid::new_v4().to_string();

    let request = axum::http::Request::builder()
        .uri("/api/v1/transactions")
        .header("x-correlation-id", &correlation_id)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        correlation_id.as_str()
    );
}

#[tokio::test]
async fn test_debit_card_transfer_e2e() {
    let app = common::setup_app();

    // 1. Two funded accounts
    let payer = funded_account(&app, "payer@example.com", "300.00").await;
    let payee = funded_account(&app, "payee@example.com", "100.00").await;

    // 2. Issue a debit card on the payer's account
    let (status, card) = send(
        &app,
        Method::POST,
        &format!("/api/v1/accounts/{}/debit-card", payer),
        Some(json!({ "holder_name": "Payer Person", "pin": PIN })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "card issuance failed: {}", card);
    assert_eq!(card["kind"], "debit");
    assert_eq!(card["cvv"].as_str().unwrap().len(), 3);
    let card_number = card["number"].as_u64().unwrap();

    // 3. Transfer with the card
    let (status, transaction) = send(
        &app,
        Method::POST,
        "/api/v1/transfers",
        Some(json!({
            "direction": "debit_card_to_account",
            "card": card_number,
            "account": payee,
            "amount": "50.00",
            "pin": PIN,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "transfer failed: {}", transaction);
    assert_eq!(transaction["kind"], "DEBIT_CARD_TRANSFER");
    assert_eq!(transaction["source"]["kind"], "debit_card");
    assert_eq!(transaction["source"]["number"], card_number);

    // 4. Balances moved, and the row is retrievable by id
    assert_eq!(balance(&app, payer).await, dec!(250.00));
    assert_eq!(balance(&app, payee).await, dec!(150.00));

    let (status, fetched) = send(
        &app,
        Method::GET,
        &format!("/api/v1/transactions/{}", transaction["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["amount"], "50.00");

    // The card never returns its CVV after issuance
    let (status, card) = send(
        &app,
        Method::GET,
        &format!("/api/v1/debit-cards/{}", card_number),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(card.get("cvv").is_none());

    // 5. The card spend shows on the card and on the payer's statement
    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/v1/debit-cards/{}/transactions", card_number),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 1);
    assert_eq!(history["transactions"][0]["kind"], "DEBIT_CARD_TRANSFER");

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/v1/accounts/{}/transactions", payer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 2);
    assert_eq!(history["transactions"][0]["kind"], "CREDIT");
    assert_eq!(history["transactions"][1]["kind"], "DEBIT_CARD_TRANSFER");

    let (status, linked) = send(
        &app,
        Method::GET,
        &format!("/api/v1/accounts/{}/debit-card", payer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["number"], card_number);
    assert!(linked.get("cvv").is_none());
}

#[tokio::test]
async fn test_withdraw_and_account_history() {
    let app = common::setup_app();
    let account = funded_account(&app, "saver@example.com", "500.00").await;

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/accounts/{}/withdraw", account),
        Some(json!({ "amount": "200.00", "pin": PIN })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(balance(&app, account).await, dec!(300.00));

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/v1/accounts/{}/transactions", account),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 2);
    assert_eq!(history["transactions"][0]["kind"], "CREDIT");
    assert_eq!(history["transactions"][1]["kind"], "DEBIT");
}

#[tokio::test]
async fn test_error_statuses() {
    let app = common::setup_app();
    let from = funded_account(&app, "from@example.com", "100.00").await;
    let to = funded_account(&app, "to@example.com", "0").await;

    let transfer = |amount: &str, pin: &str, to: u64| {
        json!({
            "direction": "account_to_account",
            "from": from,
            "to": to,
            "amount": amount,
            "pin": pin,
        })
    };

    // Wrong PIN
    let (status, body) = send(&app, Method::POST, "/api/v1/transfers", Some(transfer("10.00", "9999", to))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "credential_mismatch");

    // Insufficient funds
    let (status, body) = send(&app, Method::POST, "/api/v1/transfers", Some(transfer("100.01", PIN, to))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "insufficient_funds");

    // Non-positive amount
    let (status, body) = send(&app, Method::POST, "/api/v1/transfers", Some(transfer("0", PIN, to))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_amount");

    // Self transfer
    let (status, body) = send(&app, Method::POST, "/api/v1/transfers", Some(transfer("10.00", PIN, from))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "self_transfer");

    // Unknown target
    let (status, body) = send(&app, Method::POST, "/api/v1/transfers", Some(transfer("10.00", PIN, 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "not_found");

    // Nothing moved
    assert_eq!(balance(&app, from).await, dec!(100.00));
    assert_eq!(balance(&app, to).await, dec!(0));
}

#[tokio::test]
async fn test_duplicate_account_type_conflicts() {
    let app = common::setup_app();

    let (_, customer) = send(
        &app,
        Method::POST,
        "/api/v1/customers",
        Some(json!({ "full_name": "Dup Customer", "email": "dup@example.com" })),
    )
    .await;
    let uri = format!("/api/v1/customers/{}/accounts", customer["id"].as_str().unwrap());
    let body = json!({ "account_type": "CURRENT", "pin": PIN });

    let (status, _) = send(&app, Method::POST, &uri, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, error) = send(&app, Method::POST, &uri, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error_code"], "already_exists");

    let (status, accounts) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accounts.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_blocked_card_is_forbidden() {
    let app = common::setup_app();
    let payer = funded_account(&app, "blocked@example.com", "100.00").await;
    let payee = funded_account(&app, "open@example.com", "0").await;

    let (_, card) = send(
        &app,
        Method::POST,
        &format!("/api/v1/accounts/{}/credit-card", payer),
        Some(json!({ "holder_name": "Blocked Person", "pin": PIN, "card_limit": "1000.00" })),
    )
    .await;
    let card_number = card["number"].as_u64().unwrap();
    assert_eq!(card["available_limit"], "1000.00");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/cards/credit/{}/status", card_number),
        Some(json!({ "pin": PIN, "blocked": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "BLOCKED");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/transfers",
        Some(json!({
            "direction": "credit_card_to_account",
            "card": card_number,
            "account": payee,
            "amount": "10.00",
            "pin": PIN,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "instrument_blocked");
    assert_eq!(balance(&app, payee).await, dec!(0));
}

#[tokio::test]
async fn test_change_pin_then_delete_account_keeps_history() {
    let app = common::setup_app();
    let account = funded_account(&app, "pin@example.com", "20.00").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/v1/instruments/pin",
        Some(json!({
            "instrument": { "kind": "account", "number": account },
            "old_pin": PIN,
            "new_pin": "4321",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let withdraw = |pin: &str| json!({ "amount": "5.00", "pin": pin });
    let uri = format!("/api/v1/accounts/{}/withdraw", account);

    let (status, _) = send(&app, Method::POST, &uri, Some(withdraw(PIN))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::POST, &uri, Some(withdraw("4321"))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/accounts/{}", account), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &format!("/api/v1/accounts/{}", account), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/v1/accounts/{}/transactions", account),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 2);
}

#[tokio::test]
async fn test_credit_card_history_and_listings() {
    let app = common::setup_app();
    let holder = funded_account(&app, "credit@example.com", "10.00").await;
    let merchant = funded_account(&app, "merchant@example.com", "0").await;

    let (status, card) = send(
        &app,
        Method::POST,
        &format!("/api/v1/accounts/{}/credit-card", holder),
        Some(json!({ "holder_name": "Credit Person", "pin": PIN, "card_limit": "500.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let card_number = card["number"].as_u64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/transfers",
        Some(json!({
            "direction": "credit_card_to_account",
            "card": card_number,
            "account": merchant,
            "amount": "40.00",
            "pin": PIN,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/v1/credit-cards/{}/transactions", card_number),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 1);
    assert_eq!(history["transactions"][0]["amount"], "40.00");

    // Credit card rows stay off the linked account's statement
    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/api/v1/accounts/{}/transactions", holder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["total"], 1);

    let (status, linked) = send(
        &app,
        Method::GET,
        &format!("/api/v1/accounts/{}/credit-card", holder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["available_limit"], "460.00");

    let (status, cards) = send(&app, Method::GET, "/api/v1/credit-cards", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cards.as_array().unwrap().len(), 1);

    let (status, cards) = send(&app, Method::GET, "/api/v1/debit-cards", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cards.as_array().unwrap().is_empty());

    let (status, accounts) = send(&app, Method::GET, "/api/v1/accounts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accounts.as_array().unwrap().len(), 2);

    // No debit card was issued on this account
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/v1/accounts/{}/debit-card", holder),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blocked_account_cannot_withdraw() {
    let app = common::setup_app();
    let account = funded_account(&app, "frozen@example.com", "50.00").await;
    let status_uri = format!("/api/v1/accounts/{}/status", account);
    let withdraw_uri = format!("/api/v1/accounts/{}/withdraw", account);
    let withdraw = json!({ "amount": "5.00", "pin": PIN });

    let (status, body) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(json!({ "pin": PIN, "blocked": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "BLOCKED");

    let (status, body) = send(&app, Method::POST, &withdraw_uri, Some(withdraw.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "instrument_blocked");
    assert_eq!(balance(&app, account).await, dec!(50.00));

    let (status, _) = send(
        &app,
        Method::PUT,
        &status_uri,
        Some(json!({ "pin": PIN, "blocked": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, &withdraw_uri, Some(withdraw)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(balance(&app, account).await, dec!(45.00));
}

#[tokio::test]
async fn test_customer_lifecycle() {
    let app = common::setup_app();

    let (status, customer) = send(
        &app,
        Method::POST,
        "/api/v1/customers",
        Some(json!({ "full_name": "Life Cycle", "email": "cycle@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_uri = format!("/api/v1/customers/{}", customer["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/customers/exists?email=cycle@example.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exists"], true);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/customers/exists?email=nobody@example.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "not_found");

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &customer_uri,
        Some(json!({ "full_name": "Renamed Person" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["full_name"], "Renamed Person");
    assert_eq!(updated["email"], "cycle@example.com");

    let (status, customers) = send(&app, Method::GET, "/api/v1/customers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(customers.as_array().unwrap().len(), 1);

    // A customer holding an account is not deleted
    let (status, account) = send(
        &app,
        Method::POST,
        &format!("{}/accounts", customer_uri),
        Some(json!({ "account_type": "CURRENT", "pin": PIN })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::DELETE, &customer_uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "validation_failed");

    let account_uri = format!("/api/v1/accounts/{}", account["number"]);
    let (status, _) = send(&app, Method::DELETE, &account_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &customer_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, &customer_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
