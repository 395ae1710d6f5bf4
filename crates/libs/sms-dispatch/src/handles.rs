use tokio::sync::{mpsc, oneshot};

use crate::types::{SendResult, SmsFormat};

/// One-shot completion handle for a single message part.
///
/// Consuming `complete` guarantees the caller observes at most one result.
/// Dropping the handle without completing closes the receiver.
#[derive(Debug)]
pub struct SentHandle {
    tx: oneshot::Sender<SendResult>,
}

impl SentHandle {
    pub fn channel() -> (Self, oneshot::Receiver<SendResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn complete(self, result: SendResult) {
        if self.tx.send(result).is_err() {
            log::debug!("sms: sent handle receiver dropped before {:?}", result);
        }
    }
}

/// Raw status report forwarded to the delivery handle of the tracker it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub format: SmsFormat,
    pub pdu: Vec<u8>,
}

/// Delivery-notification handle. Unlike [`SentHandle`] it may fire more than
/// once: every transient report is forwarded, followed by the terminal one.
#[derive(Debug, Clone)]
pub struct DeliveryHandle {
    tx: mpsc::UnboundedSender<DeliveryReport>,
}

impl DeliveryHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DeliveryReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns `false` when the receiver is gone.
    pub fn notify(&self, report: DeliveryReport) -> bool {
        self.tx.send(report).is_ok()
    }
}

/// Caller handles attached to one message part.
#[derive(Debug, Default)]
pub struct PartHandles {
    pub sent: Option<SentHandle>,
    pub delivery: Option<DeliveryHandle>,
}

impl PartHandles {
    pub fn new(sent: SentHandle, delivery: Option<DeliveryHandle>) -> Self {
        Self { sent: Some(sent), delivery }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Completes the sent handle, if any, with a failure result.
    pub fn fail(self, result: SendResult) {
        if let Some(sent) = self.sent {
            sent.complete(result);
        }
    }
}
