// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Regulator Alerts
//!
//! Fire-and-forget notification of compliance violations.
//!
//! The transfer path only ever calls [`AlertDispatcher::dispatch`], which
//! does a non-blocking `try_send` into a bounded queue. A background
//! [`AlertWorker`] drains the queue and hands each payload to an
//! [`AlertSink`]. Delivery is at-most-once: a full queue or a failed POST is
//! logged and the alert dropped. The `AbnormalTransaction` row is the
//! durable record.
//!
//! ## Shutdown
//!
//! The worker stops on `CancellationToken` cancellation, or once every
//! dispatcher has been dropped and the queue is drained.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::models::{AbnormalTransaction, Transaction};

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert queue is full")]
    QueueFull,

    #[error("alert queue is closed")]
    QueueClosed,

    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Body POSTed to the regulator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct AlertPayload {
    /// Id of the stored abnormal-transaction marker
    pub abnormal_id: String,
    /// Originating wallet
    pub wallet_id: String,
    /// The `Failed` direct transaction
    pub transaction: Transaction,
    pub evidence: String,
}

impl AlertPayload {
    pub fn new(abnormal: &AbnormalTransaction, transaction: &Transaction) -> Self {
        Self {
            abnormal_id: abnormal.id.clone(),
            wallet_id: abnormal.wallet_id.clone(),
            transaction: transaction.clone(),
            evidence: abnormal.evidence.clone(),
        }
    }
}

// =============================================================================
// Sink
// =============================================================================

/// External endpoint receiving alerts.
pub trait AlertSink: Send + Sync + 'static {
    fn notify(&self, alert: &AlertPayload) -> impl Future<Output = Result<(), AlertError>> + Send;
}

/// POSTs alerts as JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAlertSink {
    endpoint: String,
    http: Client,
}

impl HttpAlertSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::Delivery(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl AlertSink for HttpAlertSink {
    async fn notify(&self, alert: &AlertPayload) -> Result<(), AlertError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(alert)
            .send()
            .await
            .map_err(|e| AlertError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AlertError::Delivery(format!(
                "regulator endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Producer half of the alert queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    tx: mpsc::Sender<AlertPayload>,
}

/// Consumer half, handed to [`AlertWorker::new`].
pub struct AlertQueue {
    rx: mpsc::Receiver<AlertPayload>,
}

impl AlertDispatcher {
    /// Create a bounded queue holding at most `capacity` pending alerts.
    pub fn channel(capacity: usize) -> (Self, AlertQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, AlertQueue { rx })
    }

    /// Enqueue without waiting.
    pub fn dispatch(&self, alert: AlertPayload) -> Result<(), AlertError> {
        self.tx.try_send(alert).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AlertError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => AlertError::QueueClosed,
        })
    }
}

impl AlertQueue {
    /// Next queued alert, or `None` once every dispatcher is gone.
    pub async fn recv(&mut self) -> Option<AlertPayload> {
        self.rx.recv().await
    }

    /// Non-blocking pop, for draining in tests.
    pub fn try_recv(&mut self) -> Option<AlertPayload> {
        self.rx.try_recv().ok()
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Background task delivering queued alerts to a sink.
pub struct AlertWorker<S> {
    queue: AlertQueue,
    sink: S,
}

impl<S: AlertSink> AlertWorker<S> {
    pub fn new(queue: AlertQueue, sink: S) -> Self {
        Self { queue, sink }
    }

    /// Run until cancelled or the queue closes.
    ///
    /// ```rust,ignore
    /// tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Alert worker starting");

        loop {
            let alert = tokio::select! {
                alert = self.queue.recv() => alert,
                _ = shutdown.cancelled() => {
                    info!("Alert worker shutting down");
                    return;
                }
            };

            let Some(alert) = alert else {
                info!("Alert queue closed, worker exiting");
                return;
            };

            match self.sink.notify(&alert).await {
                Ok(()) => debug!(
                    abnormal_id = %alert.abnormal_id,
                    transaction_id = %alert.transaction.id,
                    "Alert delivered"
                ),
                Err(e) => warn!(
                    abnormal_id = %alert.abnormal_id,
                    transaction_id = %alert.transaction.id,
                    error = %e,
                    "Alert delivery failed, dropping"
                ),
            }
        }
    }
}
