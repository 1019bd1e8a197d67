// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet API endpoints.
//!
//! Wallet creation and retrieval. The private key never leaves the ledger
//! through these handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    models::{Wallet, WalletRole},
    provisioning,
    state::AppState,
};

/// Request to create a new wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    /// Unique display name.
    pub name: String,
    /// Opening balance (at most 2 decimal places).
    #[serde(default)]
    #[schema(value_type = String, example = "100.00")]
    pub initial_balance: Decimal,
}

/// Response after creating a wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWalletResponse {
    /// The created wallet details.
    pub wallet: Wallet,
    /// Message indicating success.
    pub message: String,
}

/// Create a new wallet.
///
/// Generates a secp256k1 key pair and stores it with the wallet. Returns the
/// wallet (never the private key).
#[utoipa::path(
    post,
    path = "/v1/wallets",
    tag = "Wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created successfully", body = CreateWalletResponse),
        (status = 400, description = "Invalid name or balance"),
        (status = 409, description = "Name already taken"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<CreateWalletResponse>), ApiError> {
    let wallet = state
        .blocking(move |s| {
            provisioning::create_wallet(
                &s.ledger,
                &request.name,
                request.initial_balance,
                WalletRole::User,
            )
            .map_err(ApiError::from)
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateWalletResponse {
            wallet,
            message: "Wallet created successfully".to_string(),
        }),
    ))
}

/// Get a wallet by ID.
#[utoipa::path(
    get,
    path = "/v1/wallets/{wallet_id}",
    tag = "Wallets",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID")
    ),
    responses(
        (status = 200, description = "Wallet found", body = Wallet),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<Wallet>, ApiError> {
    let wallet = state
        .blocking(move |s| s.ledger.get_wallet(&wallet_id).map_err(ApiError::from))
        .await?;
    Ok(Json(wallet))
}
