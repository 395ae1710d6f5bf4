use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::Event;
use crate::request::{PendingRequest, RequestKind, SendOptions};
use crate::tracker::{MultipartProgress, OutboundTracker, RetryFields, RetryPayload};
use crate::traits::{
    DataSubmission, MultipartSubmission, SmsTransport, TextSubmission, TransportReply,
};
use crate::types::{Domain, Route, SmsFormat};

/// Picks the transport for a resolved domain and circuit-switched format.
///
/// `Domain::Unknown` must be resolved by the caller first; it is treated as
/// circuit-switched here.
pub fn route(domain: Domain, format: SmsFormat) -> Route {
    match (domain, format) {
        (Domain::PacketSwitched, _) => Route::Ims,
        (_, SmsFormat::ThreeGpp2) => Route::Cdma,
        _ => Route::Gsm,
    }
}

/// The transport dispatchers of one subscription.
#[derive(Clone)]
pub struct Transports {
    pub ims: Arc<dyn SmsTransport>,
    pub gsm: Arc<dyn SmsTransport>,
    /// Absent on devices without a 3GPP2 stack; CDMA routes fall back to GSM.
    pub cdma: Option<Arc<dyn SmsTransport>>,
}

impl Transports {
    pub fn new(ims: Arc<dyn SmsTransport>, gsm: Arc<dyn SmsTransport>) -> Self {
        Self { ims, gsm, cdma: None }
    }

    pub fn with_cdma(mut self, cdma: Arc<dyn SmsTransport>) -> Self {
        self.cdma = Some(cdma);
        self
    }

    /// Route actually served and its transport.
    pub fn resolve(&self, route: Route) -> (Route, &Arc<dyn SmsTransport>) {
        match route {
            Route::Ims => (Route::Ims, &self.ims),
            Route::Gsm => (Route::Gsm, &self.gsm),
            Route::Cdma => match &self.cdma {
                Some(cdma) => (Route::Cdma, cdma),
                None => {
                    log::warn!("sms: no cdma transport, using gsm");
                    (Route::Gsm, &self.gsm)
                }
            },
        }
    }

    /// Format the transport behind `route` encodes with.
    pub fn format(&self, route: Route) -> SmsFormat {
        self.resolve(route).1.format()
    }

    pub fn packet_available(&self) -> bool {
        self.ims.is_available()
    }

    /// Hands `request` to the transport behind `route`. Retry trackers must
    /// already be encoded for that transport's format.
    pub(crate) fn dispatch(
        &self,
        route: Route,
        request: PendingRequest,
        events: &mpsc::UnboundedSender<Event>,
    ) -> Route {
        let (route, transport) = self.resolve(route);
        let reply = TransportReply::new(route, events.clone());
        let format = transport.format();
        let over_packet = route == Route::Ims;
        let unique_id = request.unique_id;
        log::debug!("sms: {} request {} ==> {}", request.kind.name(), unique_id, route);

        let new_tracker = |message_id: u64, uri: Option<String>, fields: RetryFields| {
            let mut tracker = OutboundTracker::new(unique_id, message_id, format)
                .with_fields(fields)
                .with_message_uri(uri);
            if over_packet {
                tracker.mark_packet_transport();
            }
            tracker
        };

        match request.kind {
            RequestKind::Data(data) => {
                let options = transport_options(data.options, over_packet);
                let tracker = new_tracker(
                    options.message_id,
                    options.message_uri.clone(),
                    RetryFields {
                        service_center: data.service_center.clone(),
                        destination: Some(data.destination.clone()),
                        payload: Some(RetryPayload::Data {
                            port: data.port,
                            data: data.data.clone(),
                        }),
                    },
                )
                .with_handles(data.handles);
                transport.send_data(
                    DataSubmission {
                        unique_id,
                        destination: data.destination,
                        service_center: data.service_center,
                        port: data.port,
                        data: data.data,
                        options,
                        tracker,
                    },
                    reply,
                );
            }
            RequestKind::Text(text) => {
                let options = transport_options(text.options, over_packet);
                let tracker = new_tracker(
                    options.message_id,
                    options.message_uri.clone(),
                    RetryFields {
                        service_center: text.service_center.clone(),
                        destination: Some(text.destination.clone()),
                        payload: Some(RetryPayload::Text(text.text.clone())),
                    },
                )
                .with_handles(text.handles);
                transport.send_text(
                    TextSubmission {
                        unique_id,
                        destination: text.destination,
                        service_center: text.service_center,
                        text: text.text,
                        options,
                        tracker,
                    },
                    reply,
                );
            }
            RequestKind::MultipartText(multipart) => {
                let options = transport_options(multipart.options, over_packet);
                let progress = MultipartProgress::new(multipart.parts.len());
                let trackers = multipart
                    .parts
                    .iter()
                    .zip(multipart.handles)
                    .map(|(part, handles)| {
                        new_tracker(
                            options.message_id,
                            options.message_uri.clone(),
                            RetryFields {
                                service_center: multipart.service_center.clone(),
                                destination: Some(multipart.destination.clone()),
                                payload: Some(RetryPayload::Text(part.clone())),
                            },
                        )
                        .with_handles(handles)
                        .with_progress(progress.clone())
                    })
                    .collect();
                transport.send_multipart_text(
                    MultipartSubmission {
                        unique_id,
                        destination: multipart.destination,
                        service_center: multipart.service_center,
                        parts: multipart.parts,
                        options,
                        trackers,
                    },
                    reply,
                );
            }
            RequestKind::Retry(mut tracker) => {
                if over_packet {
                    tracker.mark_packet_transport();
                }
                transport.resend(tracker, reply);
            }
        }
        route
    }
}

impl fmt::Debug for Transports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transports")
            .field("ims", &self.ims.format())
            .field("gsm", &self.gsm.format())
            .field("cdma", &self.cdma.as_ref().map(|cdma| cdma.format()))
            .finish()
    }
}

/// IMS carries each part as its own transaction, so "more to come" never applies.
fn transport_options(mut options: SendOptions, over_packet: bool) -> SendOptions {
    if over_packet {
        options.expect_more = false;
    }
    options
}
