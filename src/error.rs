// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::engine::TransferError;
use crate::escrow::EscrowError;
use crate::provisioning::ProvisionError;
use crate::storage::LedgerError;

/// Failure classes shared by every core operation.
///
/// A compliance violation is not here: it is a `Failed` transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidInput,
    InsufficientBalance,
    /// Not enough proxy wallets or key shares
    ResourceExhausted,
    NotFound,
    /// Request conflicts with stored state (duplicate name, escrow state)
    Conflict,
    CryptoFailure,
    PersistenceFailure,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Default status for a category. Callers override where one category
    /// maps to different statuses.
    pub fn from_category(category: ErrorCategory, message: impl Into<String>) -> Self {
        let message = message.into();
        match category {
            ErrorCategory::InvalidInput => Self::bad_request(message),
            ErrorCategory::NotFound => Self::not_found(message),
            ErrorCategory::InsufficientBalance => Self::unprocessable(message),
            ErrorCategory::ResourceExhausted => Self::service_unavailable(message),
            ErrorCategory::Conflict => Self::conflict(message),
            ErrorCategory::CryptoFailure | ErrorCategory::PersistenceFailure => {
                tracing::error!(error = %message, "Internal failure");
                Self::internal("internal error")
            }
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        Self::from_category(e.category(), e.to_string())
    }
}

impl From<EscrowError> for ApiError {
    fn from(e: EscrowError) -> Self {
        match e {
            // The caller can fix this by sending more shares
            EscrowError::InsufficientShares { .. } => Self::unprocessable(e.to_string()),
            other => Self::from_category(other.category(), other.to_string()),
        }
    }
}

impl From<ProvisionError> for ApiError {
    fn from(e: ProvisionError) -> Self {
        Self::from_category(e.category(), e.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        if e.is_not_found() {
            Self::not_found(e.to_string())
        } else {
            Self::from_category(ErrorCategory::PersistenceFailure, e.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!(error = %e, "Blocking task failed");
        Self::internal("internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
