//! Notification Dispatcher
//!
//! Fire-and-forget customer alerts for credits and debits. The ledger
//! enqueues after commit; a background task delivers. Delivery failures
//! are logged and never reach the ledger.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::{Amount, TransactionId};

/// Direction of money movement from the recipient's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Credited,
    Debited,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Credited => write!(f, "credited"),
            NotificationKind::Debited => write!(f, "debited"),
        }
    }
}

/// One customer alert
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub address: String,
    pub kind: NotificationKind,
    pub amount: Amount,
    /// Last four digits, prefixed with `**`
    pub masked_instrument: String,
    pub transaction_id: TransactionId,
}

impl Notification {
    /// Message body as sent to the customer
    pub fn render(&self) -> String {
        format!(
            "Your instrument {} has been {} with {}. Transaction reference: {}.",
            self.masked_instrument, self.kind, self.amount, self.transaction_id
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivery channel (mail, SMS, ...)
pub trait Notifier: Send + Sync + 'static {
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that writes alerts to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.address,
            kind = %notification.kind,
            instrument = %notification.masked_instrument,
            transaction_id = %notification.transaction_id,
            "{}",
            notification.render()
        );
        Ok(())
    }
}

/// Handle used by the ledger to enqueue notifications
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Notification>,
}

impl NotificationDispatcher {
    /// Start the delivery task with a bounded queue.
    ///
    /// The task ends once every dispatcher clone has been dropped and the
    /// queue is drained.
    pub fn spawn(notifier: Arc<dyn Notifier>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<Notification>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                if let Err(e) = notifier.deliver(&notification) {
                    tracing::warn!(
                        transaction_id = %notification.transaction_id,
                        error = %e,
                        "Notification delivery failed"
                    );
                }
            }
            tracing::debug!("Notification queue closed");
        });

        (Self { sender }, handle)
    }

    /// Enqueue without waiting. A full or closed queue drops the notification.
    pub fn notify(&self, notification: Notification) {
        if let Err(e) = self.sender.try_send(notification) {
            let (reason, notification) = match e {
                mpsc::error::TrySendError::Full(n) => ("queue full", n),
                mpsc::error::TrySendError::Closed(n) => ("queue closed", n),
            };
            tracing::warn!(
                transaction_id = %notification.transaction_id,
                reason,
                "Notification dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Notification>>);

    impl Notifier for Recording {
        fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn notification(kind: NotificationKind) -> Notification {
        Notification {
            address: "asha@example.com".to_string(),
            kind,
            amount: Amount::from_integer(50).unwrap(),
            masked_instrument: "**9010".to_string(),
            transaction_id: TransactionId::new(3),
        }
    }

    #[test]
    fn test_render() {
        let text = notification(NotificationKind::Debited).render();
        assert_eq!(
            text,
            "Your instrument **9010 has been debited with 50.00. Transaction reference: 3."
        );
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_in_order() {
        let recorder = Arc::new(Recording::default());
        let (dispatcher, handle) = NotificationDispatcher::spawn(recorder.clone(), 8);

        dispatcher.notify(notification(NotificationKind::Debited));
        dispatcher.notify(notification(NotificationKind::Credited));
        drop(dispatcher);
        handle.await.unwrap();

        let delivered = recorder.0.lock().unwrap();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].kind, NotificationKind::Debited);
        assert_eq!(delivered[1].kind, NotificationKind::Credited);
    }

    #[tokio::test]
    async fn test_notify_after_task_end_does_not_panic() {
        let (dispatcher, handle) = NotificationDispatcher::spawn(Arc::new(LogNotifier), 1);
        handle.abort();
        let _ = handle.await;

        dispatcher.notify(notification(NotificationKind::Credited));
    }
}
