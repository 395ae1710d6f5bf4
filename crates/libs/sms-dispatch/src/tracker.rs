use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::handles::{DeliveryHandle, DeliveryReport, PartHandles, SentHandle};
use crate::types::{MessageRef, SendResult, SmsFormat};

/// Payload needed to rebuild a submit PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPayload {
    Text(String),
    Data { port: u16, data: Vec<u8> },
}

/// Fields originally supplied by the caller, kept so a retry can re-encode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryFields {
    pub service_center: Option<String>,
    pub destination: Option<String>,
    pub payload: Option<RetryPayload>,
}

/// Encoded submit PDU plus its encoded service-center address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireUnit {
    pub service_center: Option<Vec<u8>>,
    pub pdu: Vec<u8>,
}

/// Shared state of the parts belonging to one multipart message.
#[derive(Debug)]
pub struct MultipartProgress {
    unsent: AtomicUsize,
    any_failed: AtomicBool,
}

impl MultipartProgress {
    pub fn new(parts: usize) -> Arc<Self> {
        Arc::new(Self { unsent: AtomicUsize::new(parts), any_failed: AtomicBool::new(false) })
    }

    /// Records one part outcome and returns whether it was the last unsent part.
    fn record(&self, success: bool) -> bool {
        if !success {
            self.any_failed.store(true, Ordering::SeqCst);
        }
        let previous = self
            .unsent
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        previous <= 1
    }

    fn any_failed(&self) -> bool {
        self.any_failed.load(Ordering::SeqCst)
    }
}

/// Per-part outbound state: awaits the send result and, when requested, the
/// delivery status report.
#[derive(Debug)]
pub struct OutboundTracker {
    unique_id: u64,
    message_id: u64,
    format: SmsFormat,
    message_ref: MessageRef,
    fields: Option<RetryFields>,
    wire: WireUnit,
    sent: Option<SentHandle>,
    delivery: Option<DeliveryHandle>,
    progress: Option<Arc<MultipartProgress>>,
    message_uri: Option<String>,
    used_packet_transport: bool,
}

impl OutboundTracker {
    pub fn new(unique_id: u64, message_id: u64, format: SmsFormat) -> Self {
        Self {
            unique_id,
            message_id,
            format,
            message_ref: 0,
            fields: None,
            wire: WireUnit::default(),
            sent: None,
            delivery: None,
            progress: None,
            message_uri: None,
            used_packet_transport: false,
        }
    }

    pub fn with_fields(mut self, fields: RetryFields) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_handles(mut self, handles: PartHandles) -> Self {
        self.sent = handles.sent;
        self.delivery = handles.delivery;
        self
    }

    pub fn with_progress(mut self, progress: Arc<MultipartProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_message_uri(mut self, uri: Option<String>) -> Self {
        self.message_uri = uri;
        self
    }

    pub fn with_encoded(mut self, message_ref: MessageRef, wire: WireUnit) -> Self {
        self.set_encoded(message_ref, wire);
        self
    }

    /// Called by a transport once it has encoded and numbered the part.
    pub fn set_encoded(&mut self, message_ref: MessageRef, wire: WireUnit) {
        self.message_ref = message_ref;
        self.wire = wire;
    }

    pub fn unique_id(&self) -> u64 {
        self.unique_id
    }

    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    pub fn format(&self) -> SmsFormat {
        self.format
    }

    pub fn message_ref(&self) -> MessageRef {
        self.message_ref
    }

    pub fn fields(&self) -> Option<&RetryFields> {
        self.fields.as_ref()
    }

    pub fn wire(&self) -> &WireUnit {
        &self.wire
    }

    pub fn destination(&self) -> Option<&str> {
        self.fields.as_ref().and_then(|fields| fields.destination.as_deref())
    }

    pub fn message_uri(&self) -> Option<&str> {
        self.message_uri.as_deref()
    }

    pub fn expects_status_report(&self) -> bool {
        self.delivery.is_some()
    }

    pub fn used_packet_transport(&self) -> bool {
        self.used_packet_transport
    }

    pub fn is_multipart(&self) -> bool {
        self.progress.is_some()
    }

    pub fn any_part_failed(&self) -> bool {
        self.progress.as_ref().is_some_and(|progress| progress.any_failed())
    }

    pub(crate) fn mark_packet_transport(&mut self) {
        self.used_packet_transport = true;
    }

    pub(crate) fn replace_encoding(&mut self, format: SmsFormat, wire: WireUnit) {
        self.format = format;
        self.wire = wire;
    }

    /// Records this part's outcome; returns whether it was the single or last part.
    pub(crate) fn record_part(&self, success: bool) -> bool {
        match &self.progress {
            Some(progress) => progress.record(success),
            None => true,
        }
    }

    /// Delivers the part result to the caller. Later calls are no-ops.
    pub(crate) fn complete(&mut self, result: SendResult) {
        if let Some(sent) = self.sent.take() {
            sent.complete(result);
        }
    }

    pub(crate) fn notify_delivery(&self, report: DeliveryReport) -> bool {
        match &self.delivery {
            Some(delivery) => delivery.notify(report),
            None => false,
        }
    }
}
