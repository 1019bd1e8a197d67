// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    compliance::{AlertPayload, Verdict},
    models::{
        AbnormalTransaction, AmountRange, DecryptedShare, DecryptedTransaction,
        DesensitizedTransaction, EscrowState, EscrowStatus, KeyShare, TimeRange, Transaction,
        TxKind, TxStatus, Wallet, WalletRole,
    },
    state::AppState,
};

pub mod health;
pub mod regulator;
pub mod transactions;
pub mod wallets;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/wallets", post(wallets::create_wallet))
        .route("/wallets/{wallet_id}", get(wallets::get_wallet))
        .route(
            "/wallets/{wallet_id}/transactions",
            get(transactions::list_transactions),
        )
        .route(
            "/wallets/{wallet_id}/transactions/decrypt",
            post(transactions::decrypt_transactions),
        )
        .route("/transfers", post(transactions::create_transfer))
        .route(
            "/analytics/transactions",
            get(transactions::list_desensitized),
        )
        .route("/compliance/check", post(regulator::check_compliance))
        .route("/regulator/abnormal", get(regulator::list_abnormal))
        .route("/regulator/alert", post(regulator::receive_alert))
        .route(
            "/regulator/escrow/{wallet_id}",
            get(regulator::get_escrow).post(regulator::split_key),
        )
        .route(
            "/regulator/escrow/{wallet_id}/recover",
            post(regulator::recover_key),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        wallets::create_wallet,
        wallets::get_wallet,
        transactions::create_transfer,
        transactions::list_transactions,
        transactions::decrypt_transactions,
        transactions::list_desensitized,
        regulator::check_compliance,
        regulator::list_abnormal,
        regulator::receive_alert,
        regulator::split_key,
        regulator::get_escrow,
        regulator::recover_key
    ),
    components(
        schemas(
            Wallet,
            WalletRole,
            Transaction,
            TxKind,
            TxStatus,
            DecryptedTransaction,
            DesensitizedTransaction,
            AmountRange,
            TimeRange,
            AbnormalTransaction,
            KeyShare,
            DecryptedShare,
            EscrowState,
            EscrowStatus,
            Verdict,
            AlertPayload,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            wallets::CreateWalletRequest,
            wallets::CreateWalletResponse,
            transactions::TransferRequest,
            transactions::TransferResponse,
            transactions::TransactionListResponse,
            transactions::DecryptHistoryRequest,
            transactions::DecryptedHistoryResponse,
            transactions::AnalyticsResponse,
            regulator::ComplianceCheckRequest,
            regulator::AbnormalListResponse,
            regulator::AlertAck,
            regulator::EscrowResponse,
            regulator::RecoverRequest,
            regulator::RecoverResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Wallets", description = "Wallet provisioning"),
        (name = "Transactions", description = "Transfers and history"),
        (name = "Analytics", description = "Desensitized transaction feed"),
        (name = "Compliance", description = "Transfer policy"),
        (name = "Regulator", description = "Abnormal transactions and alerts"),
        (name = "Escrow", description = "Threshold key escrow")
    )
)]
pub struct ApiDoc;
