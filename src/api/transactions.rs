// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer and history API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    models::{DecryptedTransaction, DesensitizedTransaction, Transaction, TxStatus},
    state::AppState,
    storage::page_window,
};

/// Request to move funds between two wallets.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TransferRequest {
    pub from_wallet_id: String,
    pub to_wallet_id: String,
    /// Positive amount with at most 2 decimal places.
    #[schema(value_type = String, example = "30.00")]
    pub amount: Decimal,
}

/// Transfer outcome.
///
/// A transfer rejected by compliance policy is not an error: it comes back
/// with `status = failed`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub transaction: Transaction,
    /// Human-readable summary
    pub message: String,
}

/// Pagination parameters (1-based).
#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Page number (default: 1)
    #[param(default = 1)]
    pub page: Option<usize>,
    /// Page size, 1..=100 (default: 10)
    #[param(default = 10)]
    pub page_size: Option<usize>,
}

impl PageQuery {
    fn resolve(&self) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let (_, size) = page_window(page, self.page_size.unwrap_or(10));
        (page, size)
    }
}

/// Transaction list response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionListResponse {
    /// Direct transfers, newest first
    pub transactions: Vec<Transaction>,
    pub page: usize,
    pub page_size: usize,
}

/// Request to open the caller's encrypted history.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DecryptHistoryRequest {
    /// PKCS#8 PEM private key of the wallet
    pub private_key_pem: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DecryptedHistoryResponse {
    /// Records this wallet paid, newest first
    pub transactions: Vec<DecryptedTransaction>,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsResponse {
    pub transactions: Vec<DesensitizedTransaction>,
    pub page: usize,
    pub page_size: usize,
}

/// Transfer funds.
///
/// Routed through three proxy wallets on the ledger. Over-ceiling amounts
/// are recorded as abnormal and returned with `status = failed`.
#[utoipa::path(
    post,
    path = "/v1/transfers",
    tag = "Transactions",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer settled", body = TransferResponse),
        (status = 200, description = "Transfer rejected by compliance policy", body = TransferResponse),
        (status = 400, description = "Invalid amount or wallets"),
        (status = 404, description = "Wallet not found"),
        (status = 422, description = "Insufficient balance"),
        (status = 503, description = "Not enough proxy wallets")
    )
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>), ApiError> {
    let transaction = state
        .blocking(move |s| {
            s.engine
                .transfer(&request.from_wallet_id, &request.to_wallet_id, request.amount)
                .map_err(ApiError::from)
        })
        .await?;

    let (status, message) = match transaction.status {
        TxStatus::Completed => (StatusCode::CREATED, "Transfer settled"),
        _ => (StatusCode::OK, "Transfer rejected by compliance policy"),
    };

    Ok((
        status,
        Json(TransferResponse {
            transaction,
            message: message.to_string(),
        }),
    ))
}

/// List direct transfers touching a wallet.
#[utoipa::path(
    get,
    path = "/v1/wallets/{wallet_id}/transactions",
    tag = "Transactions",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Transaction list", body = TransactionListResponse),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let (page, page_size) = query.resolve();
    let transactions = state
        .blocking(move |s| {
            s.engine
                .history(&wallet_id, page, page_size)
                .map_err(ApiError::from)
        })
        .await?;

    Ok(Json(TransactionListResponse {
        transactions,
        page,
        page_size,
    }))
}

/// Decrypt the caller's own encrypted transaction records.
#[utoipa::path(
    post,
    path = "/v1/wallets/{wallet_id}/transactions/decrypt",
    tag = "Transactions",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID"),
        PageQuery
    ),
    request_body = DecryptHistoryRequest,
    responses(
        (status = 200, description = "Decrypted records", body = DecryptedHistoryResponse),
        (status = 400, description = "Private key does not match wallet"),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn decrypt_transactions(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Query(query): Query<PageQuery>,
    Json(request): Json<DecryptHistoryRequest>,
) -> Result<Json<DecryptedHistoryResponse>, ApiError> {
    let (page, page_size) = query.resolve();
    let transactions = state
        .blocking(move |s| {
            s.engine
                .decrypted_history(&wallet_id, &request.private_key_pem, page, page_size)
                .map_err(ApiError::from)
        })
        .await?;
    Ok(Json(DecryptedHistoryResponse {
        transactions,
        page,
        page_size,
    }))
}

/// Desensitized feed for analytics consumers.
#[utoipa::path(
    get,
    path = "/v1/analytics/transactions",
    tag = "Analytics",
    params(PageQuery),
    responses(
        (status = 200, description = "Desensitized records, newest first", body = AnalyticsResponse)
    )
)]
pub async fn list_desensitized(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let (page, page_size) = query.resolve();
    let transactions = state
        .blocking(move |s| {
            s.ledger
                .list_desensitized(page, page_size)
                .map_err(ApiError::from)
        })
        .await?;

    Ok(Json(AnalyticsResponse {
        transactions,
        page,
        page_size,
    }))
}
