// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Compliance Monitor
//!
//! Transfer policy and regulator notification.
//!
//! [`ComplianceMonitor::check`] is a pure function of the policy and its
//! inputs. Persisting the `AbnormalTransaction` marker is the engine's job;
//! this module only judges and, when asked, enqueues the alert.

pub mod alert;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::models::{AbnormalTransaction, Transaction, Wallet};

pub use alert::{
    AlertDispatcher, AlertError, AlertPayload, AlertQueue, AlertSink, AlertWorker, HttpAlertSink,
};

/// Default per-transfer ceiling.
pub const DEFAULT_TRANSFER_CEILING: Decimal = dec!(10000);

/// Configured limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompliancePolicy {
    /// Largest amount a single transfer may move (inclusive)
    pub ceiling: Decimal,
}

impl Default for CompliancePolicy {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_TRANSFER_CEILING,
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Ok,
    Violation { evidence: String },
}

impl Verdict {
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation { .. })
    }
}

pub struct ComplianceMonitor {
    policy: CompliancePolicy,
    alerts: AlertDispatcher,
}

impl ComplianceMonitor {
    pub fn new(policy: CompliancePolicy, alerts: AlertDispatcher) -> Self {
        Self { policy, alerts }
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    /// Judge a transfer of `amount` out of `wallet`.
    pub fn check(&self, amount: Decimal, wallet: &Wallet) -> Verdict {
        if amount > self.policy.ceiling {
            Verdict::Violation {
                evidence: format!(
                    "amount {amount} from wallet {} exceeds ceiling {}",
                    wallet.id, self.policy.ceiling
                ),
            }
        } else {
            Verdict::Ok
        }
    }

    /// Enqueue a regulator alert for a recorded violation.
    ///
    /// Never blocks. An error means the alert was dropped; the caller's
    /// outcome is unaffected.
    pub fn alert(
        &self,
        transaction: &Transaction,
        abnormal: &AbnormalTransaction,
    ) -> Result<(), AlertError> {
        let result = self
            .alerts
            .dispatch(AlertPayload::new(abnormal, transaction));
        if let Err(e) = &result {
            warn!(
                transaction_id = %transaction.id,
                abnormal_id = %abnormal.id,
                error = %e,
                "Compliance alert dropped"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WalletRole;
    use chrono::Utc;

    fn wallet() -> Wallet {
        let now = Utc::now();
        Wallet {
            id: "w1".to_string(),
            name: "alice".to_string(),
            balance: dec!(0),
            role: WalletRole::User,
            public_key: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn monitor(ceiling: Decimal) -> (ComplianceMonitor, AlertQueue) {
        let (alerts, queue) = AlertDispatcher::channel(4);
        (
            ComplianceMonitor::new(CompliancePolicy { ceiling }, alerts),
            queue,
        )
    }

    #[test]
    fn default_ceiling_is_ten_thousand() {
        assert_eq!(CompliancePolicy::default().ceiling, dec!(10000));
    }

    #[test]
    fn ceiling_is_inclusive() {
        let (m, _q) = monitor(dec!(10000));
        assert_eq!(m.check(dec!(10000), &wallet()), Verdict::Ok);
        assert_eq!(m.check(dec!(0.01), &wallet()), Verdict::Ok);
        assert!(m.check(dec!(10000.01), &wallet()).is_violation());
    }

    #[test]
    fn violation_carries_evidence() {
        let (m, _q) = monitor(dec!(10000));
        match m.check(dec!(15000), &wallet()) {
            Verdict::Violation { evidence } => {
                assert!(evidence.contains("15000"));
                assert!(evidence.contains("w1"));
            }
            Verdict::Ok => panic!("expected violation"),
        }
    }

    #[test]
    fn alert_is_enqueued() {
        let (m, mut q) = monitor(dec!(1));
        let tx = Transaction::direct("w1", "w2", dec!(5));
        let abnormal = AbnormalTransaction::new(&tx, "too much");
        m.alert(&tx, &abnormal).unwrap();

        let queued = q.try_recv().unwrap();
        assert_eq!(queued.abnormal_id, abnormal.id);
        assert_eq!(queued.transaction.id, tx.id);
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let json = serde_json::to_value(Verdict::Violation {
            evidence: "x".to_string(),
        })
        .unwrap();
        assert_eq!(json["verdict"], "violation");
        assert_eq!(json["evidence"], "x");
        assert_eq!(serde_json::to_value(Verdict::Ok).unwrap()["verdict"], "ok");
    }
}
