//! Notification port and fan-out helper.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::timeout;

use crate::{domain::UserId, errors::Error, Result};

/// Port for delivering a text notification to a single recipient.
///
/// Implementations are best-effort: by the time this is called, the store
/// mutation that triggered the notification has already committed, and a
/// failed delivery must never roll it back.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, recipient: UserId, text: &str) -> Result<()>;
}

/// Per-recipient outcome of a fan-out.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: Vec<UserId>,
    pub failed: Vec<(UserId, Error)>,
}

impl DeliveryReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deliver `text` to every recipient concurrently, one task per recipient.
///
/// Each attempt is bounded by `per_recipient_timeout`; a failed or stalled
/// recipient never delays delivery to the others. The caller decides what to
/// do with the report (typically: log failures).
pub async fn broadcast(
    dispatcher: Arc<dyn NotificationDispatcher>,
    recipients: &[UserId],
    text: &str,
    per_recipient_timeout: Duration,
) -> DeliveryReport {
    let mut handles = Vec::with_capacity(recipients.len());
    for &recipient in recipients {
        let dispatcher = dispatcher.clone();
        let text = text.to_string();
        handles.push((
            recipient,
            tokio::spawn(async move {
                timeout(per_recipient_timeout, dispatcher.notify(recipient, &text)).await
            }),
        ));
    }

    let mut report = DeliveryReport::default();
    for (recipient, handle) in handles {
        match handle.await {
            Ok(Ok(Ok(()))) => report.delivered.push(recipient),
            Ok(Ok(Err(e))) => report.failed.push((recipient, e)),
            Ok(Err(_elapsed)) => report.failed.push((
                recipient,
                Error::DeliveryFailed {
                    recipient,
                    reason: "delivery timed out".to_string(),
                },
            )),
            Err(join_err) => report.failed.push((
                recipient,
                Error::DeliveryFailed {
                    recipient,
                    reason: format!("delivery task failed: {join_err}"),
                },
            )),
        }
    }
    report
}
