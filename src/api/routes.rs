//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Account, CreditCard, Customer, DebitCard, Instrument};
use crate::domain::{
    AccountNumber, AccountType, CardKind, CardNumber, CustomerId, DomainError, InstrumentRef,
    InstrumentStatus, OperationContext, Transaction, TransactionId, TransactionKind,
};
use crate::error::AppError;
use crate::ledger::{DepositCommand, TransferCommand, WithdrawCommand};
use crate::provisioning::{
    ChangePinCommand, CreateCustomerCommand, IssueCardCommand, IssuedCard, OpenAccountCommand,
    SetBlockedCommand, UpdateCustomerCommand,
};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    pub full_name: String,
    pub email: String,
}

/// Absent fields keep their current value
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateCustomerRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerExistsQuery {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerExistsResponse {
    pub email: String,
    pub exists: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: CustomerId,
    pub full_name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id(),
            full_name: customer.full_name().to_string(),
            email: customer.email().to_string(),
            created_at: customer.created_at(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenAccountRequest {
    pub account_type: AccountType,
    pub pin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub number: AccountNumber,
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub status: InstrumentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            number: account.number(),
            customer_id: account.customer_id(),
            account_type: account.account_type(),
            balance: account.balance().value(),
            status: account.status(),
            created_at: account.created_at(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: String,
    pub pin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssueCardRequest {
    pub holder_name: String,
    pub pin: String,
    /// Credit cards only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CardResponse {
    pub kind: CardKind,
    pub number: CardNumber,
    pub account_number: AccountNumber,
    pub holder_name: String,
    pub status: InstrumentStatus,
    pub expires_on: NaiveDate,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_limit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_limit: Option<Decimal>,
}

impl From<DebitCard> for CardResponse {
    fn from(card: DebitCard) -> Self {
        Self {
            kind: CardKind::Debit,
            number: card.number(),
            account_number: card.account_number(),
            holder_name: card.holder_name().to_string(),
            status: card.status(),
            expires_on: card.expires_on(),
            issued_at: card.issued_at(),
            card_limit: None,
            available_limit: None,
        }
    }
}

impl From<CreditCard> for CardResponse {
    fn from(card: CreditCard) -> Self {
        Self {
            kind: CardKind::Credit,
            number: card.number(),
            account_number: card.account_number(),
            holder_name: card.holder_name().to_string(),
            status: card.status(),
            expires_on: card.expires_on(),
            issued_at: card.issued_at(),
            card_limit: Some(card.card_limit().value()),
            available_limit: Some(card.available_limit().value()),
        }
    }
}

/// Returned once, at issuance. The CVV is not retrievable afterwards.
#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedCardResponse {
    #[serde(flatten)]
    pub card: CardResponse,
    pub cvv: String,
}

impl<C: Into<CardResponse>> From<IssuedCard<C>> for IssuedCardResponse {
    fn from(issued: IssuedCard<C>) -> Self {
        Self {
            card: issued.card.into(),
            cvv: issued.cvv,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub pin: String,
    pub blocked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub instrument: InstrumentRef,
    pub status: InstrumentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub source: InstrumentRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<InstrumentRef>,
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id(),
            kind: transaction.kind(),
            amount: transaction.amount().value(),
            source: transaction.source(),
            counterparty: transaction.counterparty(),
            created_at: transaction.created_at(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub total: usize,
}

impl From<Vec<Transaction>> for TransactionListResponse {
    fn from(transactions: Vec<Transaction>) -> Self {
        let transactions: Vec<TransactionResponse> =
            transactions.into_iter().map(Into::into).collect();
        Self {
            total: transactions.len(),
            transactions,
        }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Customers
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/exists", get(customer_exists))
        .route(
            "/customers/:customer_id",
            get(get_customer)
                .patch(update_customer)
                .delete(delete_customer),
        )
        .route(
            "/customers/:customer_id/accounts",
            get(list_customer_accounts).post(open_account),
        )
        // Accounts
        .route("/accounts", get(list_accounts))
        .route("/accounts/:number", get(get_account).delete(delete_account))
        .route("/accounts/:number/deposit", post(deposit))
        .route("/accounts/:number/withdraw", post(withdraw))
        .route("/accounts/:number/status", put(set_account_status))
        .route(
            "/accounts/:number/debit-card",
            get(get_account_debit_card).post(issue_debit_card),
        )
        .route(
            "/accounts/:number/credit-card",
            get(get_account_credit_card).post(issue_credit_card),
        )
        .route("/accounts/:number/transactions", get(get_account_transactions))
        // Transfers
        .route("/transfers", post(transfer))
        // Cards
        .route("/debit-cards", get(list_debit_cards))
        .route(
            "/debit-cards/:number",
            get(get_debit_card).delete(delete_debit_card),
        )
        .route(
            "/debit-cards/:number/transactions",
            get(get_debit_card_transactions),
        )
        .route("/credit-cards", get(list_credit_cards))
        .route(
            "/credit-cards/:number",
            get(get_credit_card).delete(delete_credit_card),
        )
        .route(
            "/credit-cards/:number/transactions",
            get(get_credit_card_transactions),
        )
        .route("/cards/:kind/:number/status", put(set_card_status))
        .route("/instruments/pin", put(change_pin))
        // Transaction log
        .route("/transactions", get(list_transactions))
        .route("/transactions/:transaction_id", get(get_transaction))
}

// =========================================================================
// Customers
// =========================================================================

async fn create_customer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    let customer = state
        .provisioning
        .create_customer(CreateCustomerCommand::new(request.full_name, request.email))
        .await?;

    tracing::debug!(
        customer_id = %customer.id(),
        initiated_by = ?context.initiated_by,
        "Customer created via API"
    );

    Ok((StatusCode::CREATED, Json(customer.into())))
}

async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    let customers = state.provisioning.customers()?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

/// 200 when a customer is registered under the e-mail address, 404 otherwise
async fn customer_exists(
    State(state): State<AppState>,
    Query(query): Query<CustomerExistsQuery>,
) -> Result<Json<CustomerExistsResponse>, AppError> {
    if !state.provisioning.customer_exists(&query.email)? {
        return Err(DomainError::not_found("Customer", &query.email).into());
    }
    Ok(Json(CustomerExistsResponse {
        email: query.email,
        exists: true,
    }))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = state.provisioning.customer(customer_id)?;
    Ok(Json(customer.into()))
}

async fn update_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
    Json(request): Json<UpdateCustomerRequest>,
) -> Result<Json<CustomerResponse>, AppError> {
    let command = UpdateCustomerCommand {
        customer_id,
        full_name: request.full_name,
        email: request.email,
    };
    let customer = state.provisioning.update_customer(command).await?;
    Ok(Json(customer.into()))
}

/// Only customers without accounts can be deleted
async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
) -> Result<StatusCode, AppError> {
    state.provisioning.delete_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_customer_accounts(
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = state.provisioning.accounts_for_customer(customer_id)?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

async fn open_account(
    State(state): State<AppState>,
    Path(customer_id): Path<CustomerId>,
    Json(request): Json<OpenAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let account = state
        .provisioning
        .open_account(OpenAccountCommand::new(
            customer_id,
            request.account_type,
            request.pin,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

// =========================================================================
// Accounts
// =========================================================================

async fn list_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = state.provisioning.accounts()?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

async fn get_account(
    State(state): State<AppState>,
    Path(number): Path<AccountNumber>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state.provisioning.account(number)?;
    Ok(Json(account.into()))
}

/// Delete an account and its cards. The transaction log is kept.
async fn delete_account(
    State(state): State<AppState>,
    Path(number): Path<AccountNumber>,
) -> Result<StatusCode, AppError> {
    state.provisioning.delete_account(number).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn deposit(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(number): Path<AccountNumber>,
    Json(request): Json<DepositRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = state
        .ledger
        .deposit(DepositCommand::new(number, request.amount), &context)
        .await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

async fn withdraw(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(number): Path<AccountNumber>,
    Json(request): Json<WithdrawRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = state
        .ledger
        .withdraw(
            WithdrawCommand::new(number, request.amount, request.pin),
            &context,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

async fn issue_debit_card(
    State(state): State<AppState>,
    Path(number): Path<AccountNumber>,
    Json(request): Json<IssueCardRequest>,
) -> Result<(StatusCode, Json<IssuedCardResponse>), AppError> {
    let issued = state
        .provisioning
        .issue_debit_card(IssueCardCommand::new(
            number,
            request.holder_name,
            request.pin,
        ))
        .await?;

    Ok((StatusCode::CREATED, Json(issued.into())))
}

async fn issue_credit_card(
    State(state): State<AppState>,
    Path(number): Path<AccountNumber>,
    Json(request): Json<IssueCardRequest>,
) -> Result<(StatusCode, Json<IssuedCardResponse>), AppError> {
    let mut command = IssueCardCommand::new(number, request.holder_name, request.pin);
    if let Some(card_limit) = request.card_limit {
        command = command.with_card_limit(card_limit);
    }

    let issued = state.provisioning.issue_credit_card(command).await?;

    Ok((StatusCode::CREATED, Json(issued.into())))
}

async fn get_account_debit_card(
    State(state): State<AppState>,
    Path(number): Path<AccountNumber>,
) -> Result<Json<CardResponse>, AppError> {
    let card = state.provisioning.debit_card_for_account(number)?;
    Ok(Json(card.into()))
}

async fn get_account_credit_card(
    State(state): State<AppState>,
    Path(number): Path<AccountNumber>,
) -> Result<Json<CardResponse>, AppError> {
    let card = state.provisioning.credit_card_for_account(number)?;
    Ok(Json(card.into()))
}

async fn set_account_status(
    State(state): State<AppState>,
    Path(number): Path<AccountNumber>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    set_status(&state, InstrumentRef::Account(number), request).await
}

/// The account's own rows plus those of its debit card
async fn get_account_transactions(
    State(state): State<AppState>,
    Path(number): Path<AccountNumber>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let transactions = state.ledger.account_statement(number)?;
    Ok(Json(transactions.into()))
}

// =========================================================================
// POST /transfers
// =========================================================================

async fn transfer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(command): Json<TransferCommand>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = state.ledger.transfer(command, &context).await?;
    Ok((StatusCode::CREATED, Json(transaction.into())))
}

// =========================================================================
// Cards
// =========================================================================

async fn list_debit_cards(
    State(state): State<AppState>,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    let cards = state.provisioning.debit_cards()?;
    Ok(Json(cards.into_iter().map(Into::into).collect()))
}

async fn get_debit_card(
    State(state): State<AppState>,
    Path(number): Path<CardNumber>,
) -> Result<Json<CardResponse>, AppError> {
    let card = state.provisioning.debit_card(number)?;
    Ok(Json(card.into()))
}

async fn delete_debit_card(
    State(state): State<AppState>,
    Path(number): Path<CardNumber>,
) -> Result<StatusCode, AppError> {
    state.provisioning.delete_card(CardKind::Debit, number).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_debit_card_transactions(
    State(state): State<AppState>,
    Path(number): Path<CardNumber>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let transactions = state
        .ledger
        .transactions_for(InstrumentRef::DebitCard(number))?;
    Ok(Json(transactions.into()))
}

async fn list_credit_cards(
    State(state): State<AppState>,
) -> Result<Json<Vec<CardResponse>>, AppError> {
    let cards = state.provisioning.credit_cards()?;
    Ok(Json(cards.into_iter().map(Into::into).collect()))
}

async fn get_credit_card(
    State(state): State<AppState>,
    Path(number): Path<CardNumber>,
) -> Result<Json<CardResponse>, AppError> {
    let card = state.provisioning.credit_card(number)?;
    Ok(Json(card.into()))
}

async fn delete_credit_card(
    State(state): State<AppState>,
    Path(number): Path<CardNumber>,
) -> Result<StatusCode, AppError> {
    state.provisioning.delete_card(CardKind::Credit, number).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_credit_card_transactions(
    State(state): State<AppState>,
    Path(number): Path<CardNumber>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let transactions = state
        .ledger
        .transactions_for(InstrumentRef::CreditCard(number))?;
    Ok(Json(transactions.into()))
}

async fn set_card_status(
    State(state): State<AppState>,
    Path((kind, number)): Path<(CardKind, CardNumber)>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    set_status(&state, InstrumentRef::card(kind, number), request).await
}

async fn set_status(
    state: &AppState,
    instrument: InstrumentRef,
    request: SetStatusRequest,
) -> Result<Json<StatusResponse>, AppError> {
    let status = state
        .provisioning
        .set_blocked(SetBlockedCommand::new(
            instrument,
            request.pin,
            request.blocked,
        ))
        .await?;

    Ok(Json(StatusResponse { instrument, status }))
}

/// Change the PIN of any instrument
async fn change_pin(
    State(state): State<AppState>,
    Json(command): Json<ChangePinCommand>,
) -> Result<StatusCode, AppError> {
    state.provisioning.change_pin(command).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Transaction log
// =========================================================================

async fn list_transactions(
    State(state): State<AppState>,
) -> Result<Json<TransactionListResponse>, AppError> {
    let transactions = state.ledger.all_transactions()?;
    Ok(Json(transactions.into()))
}

async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = state.ledger.transaction(transaction_id)?;
    Ok(Json(transaction.into()))
}
