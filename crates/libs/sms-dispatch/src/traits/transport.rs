use tokio::sync::mpsc;

use crate::engine::Event;
use crate::request::SendOptions;
use crate::tracker::OutboundTracker;
use crate::types::{Route, SendResult, SmsFormat};

/// Single data message handed to a transport.
#[derive(Debug)]
pub struct DataSubmission {
    pub unique_id: u64,
    pub destination: String,
    pub service_center: Option<String>,
    pub port: u16,
    pub data: Vec<u8>,
    pub options: SendOptions,
    pub tracker: OutboundTracker,
}

/// Single text message handed to a transport.
#[derive(Debug)]
pub struct TextSubmission {
    pub unique_id: u64,
    pub destination: String,
    pub service_center: Option<String>,
    pub text: String,
    pub options: SendOptions,
    pub tracker: OutboundTracker,
}

/// Multipart text; `trackers[i]` belongs to `parts[i]`.
#[derive(Debug)]
pub struct MultipartSubmission {
    pub unique_id: u64,
    pub destination: String,
    pub service_center: Option<String>,
    pub parts: Vec<String>,
    pub options: SendOptions,
    pub trackers: Vec<OutboundTracker>,
}

/// How a transport finished with one part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartOutcome {
    Sent,
    Failed(SendResult),
    /// The transport wants the part resent, possibly over another route.
    Retry,
}

/// Reply port a transport uses to hand each part back to the engine.
#[derive(Clone, Debug)]
pub struct TransportReply {
    route: Route,
    tx: mpsc::UnboundedSender<Event>,
}

impl TransportReply {
    pub(crate) fn new(route: Route, tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { route, tx }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn sent(&self, tracker: OutboundTracker) {
        self.post(tracker, PartOutcome::Sent);
    }

    pub fn failed(&self, tracker: OutboundTracker, result: SendResult) {
        self.post(tracker, PartOutcome::Failed(result));
    }

    pub fn retry(&self, tracker: OutboundTracker) {
        self.post(tracker, PartOutcome::Retry);
    }

    fn post(&self, tracker: OutboundTracker, outcome: PartOutcome) {
        let event = Event::PartCompleted { route: self.route, tracker, outcome };
        if self.tx.send(event).is_err() {
            log::debug!("sms: dispatcher gone, dropping {} completion", self.route);
        }
    }
}

/// A transport dispatcher (IMS, GSM or CDMA). Sends are fire-and-forget and
/// every part comes back through the [`TransportReply`].
///
/// Implementations assign the message reference and wire unit on each tracker
/// (see [`OutboundTracker::set_encoded`]) before replying.
pub trait SmsTransport: Send + Sync {
    fn format(&self) -> SmsFormat;

    fn is_available(&self) -> bool;

    fn supports_emergency_sms(&self, _destination: &str) -> bool {
        false
    }

    fn send_data(&self, submission: DataSubmission, reply: TransportReply);

    fn send_text(&self, submission: TextSubmission, reply: TransportReply);

    fn send_multipart_text(&self, submission: MultipartSubmission, reply: TransportReply);

    /// Sends an already encoded part again.
    fn resend(&self, tracker: OutboundTracker, reply: TransportReply);
}
