//! Notification/Audit Sink
//!
//! Fire-and-forget outcome events for downstream logging. Publishing
//! pushes onto an unbounded channel and never blocks the orchestrator's
//! commit path; a spawned consumer drains the channel into structured
//! logs.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core_types::{AccountId, MinorUnits};

/// One audit event per terminated transfer attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub transfer_id: String,
    pub outcome: String,
    pub amount: MinorUnits,
    pub sender_account_id: AccountId,
    pub recipient_account_id: AccountId,
    pub timestamp_ms: i64,
}

pub trait AuditSink: Send + Sync {
    /// Must not block.
    fn publish(&self, event: AuditEvent);
}

/// Channel-backed sink with a logging consumer task.
pub struct ChannelAuditSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Spawn the consumer task and return the sink plus its handle.
    pub fn spawn() -> (Arc<Self>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                info!(
                    target: "audit",
                    transfer_id = %event.transfer_id,
                    outcome = %event.outcome,
                    amount = event.amount,
                    sender = event.sender_account_id,
                    recipient = event.recipient_account_id,
                    "transfer outcome"
                );
            }
        });
        (Arc::new(Self { tx }), handle)
    }
}

impl AuditSink for ChannelAuditSink {
    fn publish(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            warn!("audit consumer gone, dropping event");
        }
    }
}

/// Sink that drops everything. Used in tests.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn publish(&self, _event: AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_does_not_block_and_is_consumed() {
        let (sink, handle) = ChannelAuditSink::spawn();
        for i in 0..100 {
            sink.publish(AuditEvent {
                transfer_id: format!("t{}", i),
                outcome: "completed".into(),
                amount: 1,
                sender_account_id: 1,
                recipient_account_id: 2,
                timestamp_ms: 0,
            });
        }
        drop(sink);
        // Consumer exits once all senders are gone and the queue drains.
        handle.await.unwrap();
    }
}
