// SPDX-License-Identifier: MIT

//! Simulated node operations
//!
//! Stand-ins for the banking back-ends a flow would normally call. Each
//! call waits a random latency, fails with the configured probability and
//! otherwise returns a kind-specific payload.

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

use crate::engine::{InvokeError, Node, NodeInvoker, NodeKind};
use crate::flow::config::SimulationConfig;

pub struct SimulatedInvoker {
    config: SimulationConfig,
    rng: Mutex<StdRng>,
}

impl SimulatedInvoker {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Draw latency and outcome up front so the lock is not held across the wait
    fn draw(&self, node: &Node) -> (Duration, Result<Value, InvokeError>) {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let min = self.config.min_latency.as_millis() as u64;
        let max = self.config.max_latency.as_millis() as u64;
        let latency = Duration::from_millis(rng.gen_range(min..=max.max(min)));

        let failure_rate = if self.config.failure_rate.is_nan() {
            0.0
        } else {
            self.config.failure_rate.clamp(0.0, 1.0)
        };
        let outcome = if rng.gen_bool(failure_rate) {
            Err(InvokeError::failed(node.kind.as_str(), failure_message(&node.kind)))
        } else {
            Ok(payload(&node.kind, node.label(), &mut *rng))
        };

        (latency, outcome)
    }
}

impl Default for SimulatedInvoker {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

#[async_trait]
impl NodeInvoker for SimulatedInvoker {
    async fn invoke(&self, node: &Node) -> Result<Value, InvokeError> {
        if let NodeKind::Other(kind) = &node.kind {
            return Err(InvokeError::UnsupportedKind(kind.clone()));
        }

        log::debug!("Calling {} operation for node {}", node.kind, node.id);
        let (latency, outcome) = self.draw(node);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        outcome
    }
}

fn pick<'a, R: Rng>(rng: &mut R, options: &[&'a str]) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

fn failure_message(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Start => "Flow start failed: initial context unavailable",
        NodeKind::Auth => "Authentication failed: invalid account or password",
        NodeKind::Account => "Account lookup failed: account missing or frozen",
        NodeKind::Transaction => "Transaction failed: insufficient funds or system maintenance",
        NodeKind::Risk => "Risk control failed: risk model error",
        NodeKind::Payment => "Payment gateway failed: provider temporarily unavailable",
        NodeKind::Verify => "Identity verification failed: code invalid or expired",
        NodeKind::Balance => "Balance query failed: account system under maintenance",
        NodeKind::Validate => "Transaction validation failed: rule or limit violated",
        NodeKind::Fraud => "Fraud detection failed: model could not be loaded",
        NodeKind::Notify => "Notification failed: gateway error",
        NodeKind::Audit => "Audit log failed: log storage full",
        NodeKind::Report => "Report generation failed: data source unreachable",
        NodeKind::Sync => "Data sync failed: target system timed out",
        NodeKind::Other(_) => "unsupported node type",
    }
}

fn payload<R: Rng>(kind: &NodeKind, label: &str, rng: &mut R) -> Value {
    let now = Utc::now();
    let millis = now.timestamp_millis();
    let timestamp = now.to_rfc3339();

    match kind {
        NodeKind::Start => json!({
            "success": true,
            "result": format!("Flow started: {}", label),
            "startedAt": timestamp,
        }),
        NodeKind::Auth => json!({
            "success": true,
            "result": format!("User authenticated: {}", label),
            "userId": format!("USER_{}", rng.gen_range(0..10_000)),
            "authToken": format!("TOKEN_{}", millis),
            "loginTime": timestamp,
        }),
        NodeKind::Account => json!({
            "success": true,
            "result": format!("Account verified: {}", label),
            "accountId": format!("ACC_{}", rng.gen_range(0..1_000_000)),
            "accountType": pick(rng, &["savings", "checking", "credit"]),
            "status": "active",
        }),
        NodeKind::Transaction => json!({
            "success": true,
            "result": format!("Transaction processed: {}", label),
            "transactionId": format!("TXN_{}_{}", millis, rng.gen_range(0..1_000)),
            "amount": format!("{:.2}", rng.gen_range(100.0..10_100.0)),
            "currency": "TWD",
            "status": "completed",
        }),
        NodeKind::Risk => {
            let level = pick(rng, &["low", "medium", "high"]);
            json!({
                "success": true,
                "result": format!("Risk assessed: {}", label),
                "riskLevel": level,
                "riskScore": format!("{:.1}", rng.gen_range(0.0..100.0)),
                "recommendation": if level == "high" { "manual review recommended" } else { "proceed" },
            })
        }
        NodeKind::Payment => json!({
            "success": true,
            "result": format!("Payment processed: {}", label),
            "paymentId": format!("PAY_{}", millis),
            "method": pick(rng, &["credit card", "debit card", "online banking", "e-wallet"]),
            "gatewayResponse": "approved",
        }),
        NodeKind::Verify => json!({
            "success": true,
            "result": format!("Identity verified: {}", label),
            "verificationMethod": pick(rng, &["SMS OTP", "biometric", "two-factor"]),
            "verificationTime": timestamp,
            "confidence": format!("{:.2}", rng.gen_range(0.8..1.0)),
        }),
        NodeKind::Balance => json!({
            "success": true,
            "result": format!("Balance retrieved: {}", label),
            "availableBalance": format!("{:.2}", rng.gen_range(1_000.0..51_000.0)),
            "currency": "TWD",
            "lastUpdate": timestamp,
        }),
        NodeKind::Validate => json!({
            "success": true,
            "result": format!("Transaction validated: {}", label),
            "validationRules": ["amount limit", "trading hours", "payee check", "duplicate check"],
            "allPassed": true,
            "validationTime": timestamp,
        }),
        NodeKind::Fraud => {
            let suspicious = rng.gen_bool(0.3);
            let indicators: Vec<&str> = if suspicious {
                vec![pick(
                    rng,
                    &["unusual login location", "unusual hour", "large amount", "high frequency"],
                )]
            } else {
                vec![]
            };
            json!({
                "success": true,
                "result": format!("Fraud check complete: {}", label),
                "isSuspicious": suspicious,
                "riskIndicators": indicators,
                "confidence": format!("{:.2}", rng.gen_range(0.7..1.0)),
            })
        }
        NodeKind::Notify => json!({
            "success": true,
            "result": format!("Notification sent: {}", label),
            "notificationType": pick(rng, &["sms", "email", "push", "in-app"]),
            "recipient": "user@example.com",
            "messageId": format!("MSG_{}", millis),
        }),
        NodeKind::Audit => json!({
            "success": true,
            "result": format!("Audit entry written: {}", label),
            "logId": format!("LOG_{}", millis),
            "eventType": "transaction",
            "logLevel": "INFO",
            "recordTime": timestamp,
        }),
        NodeKind::Report => json!({
            "success": true,
            "result": format!("Report generated: {}", label),
            "reportType": pick(rng, &["transactions", "balances", "risk analysis", "compliance"]),
            "reportId": format!("RPT_{}", millis),
            "recordCount": rng.gen_range(50..1_050),
        }),
        NodeKind::Sync => json!({
            "success": true,
            "result": format!("Data synced: {}", label),
            "syncedRecords": rng.gen_range(100..600),
            "syncTarget": pick(rng, &["primary database", "backup database", "data warehouse"]),
            "syncTime": timestamp,
        }),
        NodeKind::Other(other) => json!({
            "success": false,
            "result": format!("No operation for {}", other),
        }),
    }
}
