use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;
use crate::request::{DataRequest, MultipartTextRequest, RequestKind, TextRequest};
use crate::tracker::OutboundTracker;
use crate::traits::RadioEvent;
use crate::types::{ServiceState, SmsFormat};

use super::Event;

/// Cloneable entry point into a running dispatcher.
///
/// Every call only posts an event; work happens on the dispatcher loop in
/// posting order. Once the dispatcher is disposed all calls fail with
/// [`DispatchError::EngineStopped`].
#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
    next_id: Arc<AtomicU64>,
}

impl DispatcherHandle {
    pub(super) fn new(tx: mpsc::UnboundedSender<Event>, cancel: CancellationToken) -> Self {
        Self { tx, cancel, next_id: Arc::new(AtomicU64::new(1)) }
    }

    fn post(&self, event: Event) -> Result<(), DispatchError> {
        if self.cancel.is_cancelled() {
            return Err(DispatchError::EngineStopped);
        }
        self.tx.send(event).map_err(|_| DispatchError::EngineStopped)
    }

    fn submit(&self, kind: RequestKind) -> Result<u64, DispatchError> {
        let unique_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.post(Event::Submit { unique_id, kind })?;
        Ok(unique_id)
    }

    /// Queues a data message; returns its correlation id.
    pub fn send_data(&self, request: DataRequest) -> Result<u64, DispatchError> {
        self.submit(RequestKind::Data(request))
    }

    pub fn send_text(&self, request: TextRequest) -> Result<u64, DispatchError> {
        self.submit(RequestKind::Text(request))
    }

    pub fn send_multipart_text(&self, request: MultipartTextRequest) -> Result<u64, DispatchError> {
        let request = request.validate()?;
        self.submit(RequestKind::MultipartText(request))
    }

    /// Resends a part a transport gave up on, re-encoding it if the new route
    /// uses another format.
    pub fn retry(&self, tracker: OutboundTracker) -> Result<(), DispatchError> {
        self.post(Event::Retry(tracker))
    }

    /// Correlates a raw status report received in `format`.
    pub fn handle_status_report(
        &self,
        format: SmsFormat,
        pdu: Vec<u8>,
    ) -> Result<(), DispatchError> {
        self.post(Event::StatusReport { format, pdu })
    }

    pub fn on_service_state_changed(&self, state: ServiceState) -> Result<(), DispatchError> {
        self.post(Event::Radio(RadioEvent::ServiceStateChanged(state)))
    }

    /// An inbound reassembly handler left its "waiting for segments" state.
    pub fn notify_reassembly_idle(&self) -> Result<(), DispatchError> {
        self.post(Event::ReassemblyIdle)
    }

    /// A mobile-terminated message arrived over the packet domain.
    pub fn notify_received_via_packet(&self, origin: Option<String>) -> Result<(), DispatchError> {
        self.post(Event::ReceivedViaPacket { origin })
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stops the dispatcher: releases negotiations, fails queued requests with
    /// a generic failure and cancels the segment timer. Returns once the loop
    /// has finished; idempotent.
    pub async fn dispose(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Event::Dispose(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
        self.cancel.cancel();
    }
}
