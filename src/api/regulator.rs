// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Compliance and regulator endpoints.
//!
//! - Policy check and abnormal-transaction listing
//! - Alert intake (the regulator side of the alert channel)
//! - Key escrow: split, inspect, recover

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    compliance::{AlertPayload, Verdict},
    error::ApiError,
    models::{AbnormalTransaction, DecryptedShare, EscrowStatus, KeyShare},
    state::AppState,
};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ComplianceCheckRequest {
    pub wallet_id: String,
    #[schema(value_type = String, example = "15000.00")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AbnormalListResponse {
    /// Newest first
    pub abnormal_transactions: Vec<AbnormalTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlertAck {
    pub received: bool,
}

/// Escrow state and the sealed shares of one wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EscrowResponse {
    pub wallet_id: String,
    pub status: EscrowStatus,
    /// Ciphertext only; each share opens with one custodian's key
    pub shares: Vec<KeyShare>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RecoverRequest {
    /// Shares already opened by their custodians
    pub shares: Vec<DecryptedShare>,
}

#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct RecoverResponse {
    pub wallet_id: String,
    /// PKCS#8 PEM of the recovered wallet key
    pub private_key_pem: String,
    pub status: EscrowStatus,
}

/// Evaluate a hypothetical transfer against the compliance policy.
#[utoipa::path(
    post,
    path = "/v1/compliance/check",
    tag = "Compliance",
    request_body = ComplianceCheckRequest,
    responses(
        (status = 200, description = "Policy verdict", body = Verdict),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn check_compliance(
    State(state): State<AppState>,
    Json(request): Json<ComplianceCheckRequest>,
) -> Result<Json<Verdict>, ApiError> {
    let verdict = state
        .blocking(move |s| {
            let wallet = s.ledger.get_wallet(&request.wallet_id)?;
            Ok(s.engine.monitor().check(request.amount, &wallet))
        })
        .await?;
    Ok(Json(verdict))
}

/// List every transfer rejected by the compliance policy.
#[utoipa::path(
    get,
    path = "/v1/regulator/abnormal",
    tag = "Regulator",
    responses(
        (status = 200, description = "Abnormal transactions", body = AbnormalListResponse)
    )
)]
pub async fn list_abnormal(
    State(state): State<AppState>,
) -> Result<Json<AbnormalListResponse>, ApiError> {
    let abnormal_transactions = state
        .blocking(|s| s.ledger.list_abnormal().map_err(ApiError::from))
        .await?;
    Ok(Json(AbnormalListResponse {
        abnormal_transactions,
    }))
}

/// Receive a compliance alert.
#[utoipa::path(
    post,
    path = "/v1/regulator/alert",
    tag = "Regulator",
    request_body = AlertPayload,
    responses(
        (status = 202, description = "Alert accepted", body = AlertAck)
    )
)]
pub async fn receive_alert(Json(alert): Json<AlertPayload>) -> (StatusCode, Json<AlertAck>) {
    tracing::warn!(
        abnormal_id = %alert.abnormal_id,
        wallet_id = %alert.wallet_id,
        transaction_id = %alert.transaction.id,
        amount = %alert.transaction.amount,
        evidence = %alert.evidence,
        "Compliance alert received"
    );
    (StatusCode::ACCEPTED, Json(AlertAck { received: true }))
}

/// Split a wallet's private key across the jury.
#[utoipa::path(
    post,
    path = "/v1/regulator/escrow/{wallet_id}",
    tag = "Escrow",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID")
    ),
    responses(
        (status = 201, description = "Key escrowed", body = EscrowResponse),
        (status = 404, description = "Wallet or key not found"),
        (status = 409, description = "Wallet already escrowed")
    )
)]
pub async fn split_key(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<(StatusCode, Json<EscrowResponse>), ApiError> {
    let response = state
        .blocking(move |s| {
            let shares = s.escrow.split(&wallet_id)?;
            let status = s.escrow.state(&wallet_id)?;
            Ok(EscrowResponse {
                wallet_id,
                status,
                shares,
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Escrow state and sealed shares of a wallet.
#[utoipa::path(
    get,
    path = "/v1/regulator/escrow/{wallet_id}",
    tag = "Escrow",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID")
    ),
    responses(
        (status = 200, description = "Escrow state", body = EscrowResponse),
        (status = 404, description = "Wallet not found")
    )
)]
pub async fn get_escrow(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
) -> Result<Json<EscrowResponse>, ApiError> {
    let response = state
        .blocking(move |s| {
            s.ledger.get_wallet(&wallet_id)?;
            Ok(EscrowResponse {
                status: s.escrow.state(&wallet_id)?,
                shares: s.escrow.shares(&wallet_id)?,
                wallet_id,
            })
        })
        .await?;
    Ok(Json(response))
}

/// Reassemble an escrowed key from custodian shares.
///
/// Requires an abnormal transaction on record for the wallet and at least
/// three distinct shares.
#[utoipa::path(
    post,
    path = "/v1/regulator/escrow/{wallet_id}/recover",
    tag = "Escrow",
    params(
        ("wallet_id" = String, Path, description = "Wallet ID")
    ),
    request_body = RecoverRequest,
    responses(
        (status = 200, description = "Key recovered", body = RecoverResponse),
        (status = 400, description = "Invalid or mismatched shares"),
        (status = 404, description = "Wallet not found or not escrowed"),
        (status = 409, description = "No compliance trigger for wallet"),
        (status = 422, description = "Fewer than three shares")
    )
)]
pub async fn recover_key(
    State(state): State<AppState>,
    Path(wallet_id): Path<String>,
    Json(request): Json<RecoverRequest>,
) -> Result<Json<RecoverResponse>, ApiError> {
    let recovered = state
        .blocking(move |s| Ok(s.escrow.recover(&wallet_id, &request.shares)?))
        .await?;
    Ok(Json(RecoverResponse {
        wallet_id: recovered.wallet_id.clone(),
        private_key_pem: recovered.private_key_pem.to_string(),
        status: recovered.status.clone(),
    }))
}
