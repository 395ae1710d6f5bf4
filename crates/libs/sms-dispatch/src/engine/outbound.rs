use tokio::sync::mpsc::error::SendError;

use crate::error::{EmergencyError, SelectionError};
use crate::reencode::reencode_for_retry;
use crate::request::{PendingRequest, RequestKind};
use crate::router::route;
use crate::selection::{Drain, Scenario, SubmitOutcome};
use crate::tracker::OutboundTracker;
use crate::types::{Domain, Route, SendResult, SmsFormat};

use super::{Dispatcher, Event};

impl Dispatcher {
    /// Circuit-switched format: the voice network's, unless 3GPP2 is disabled.
    pub(super) fn circuit_format(&self) -> SmsFormat {
        self.coerce_format(self.radio.voice_format())
    }

    /// Format for a circuit-switched send without domain selection: follows
    /// the packet registration when SMS is registered there.
    fn legacy_mo_format(&self) -> SmsFormat {
        let registration = self.packet_registration;
        let format = if self.transports.packet_available() {
            self.transports.ims.format()
        } else if let Some(format) = registration.format.filter(|_| registration.registered) {
            format
        } else {
            self.radio.voice_format()
        };
        self.coerce_format(format)
    }

    fn coerce_format(&self, format: SmsFormat) -> SmsFormat {
        if format.is_3gpp2() && !self.config.format_b_enabled {
            SmsFormat::ThreeGpp
        } else {
            format
        }
    }

    pub(super) fn on_submit(&mut self, unique_id: u64, kind: RequestKind) {
        let kind = self.with_default_service_center(kind);
        let request = PendingRequest::new(unique_id, self.circuit_format(), kind);
        log::debug!(
            "sms({}): {} request {} (message {})",
            self.config.name,
            request.kind.name(),
            unique_id,
            request.kind.message_id()
        );

        if !self.domain_selection_enabled {
            self.send_legacy(request);
            return;
        }

        let emergency = match &request.kind {
            RequestKind::Data(_) => false,
            kind => kind.destination().is_some_and(|dest| self.is_emergency_number(dest)),
        };
        if emergency {
            self.start_emergency_session(request);
        } else {
            self.submit_for_selection(Scenario::Normal, request);
        }
    }

    pub(super) fn on_retry(&mut self, tracker: OutboundTracker) {
        if !tracker.used_packet_transport() && self.domain_selection_enabled {
            let emergency =
                tracker.destination().is_some_and(|dest| self.is_emergency_number(dest));
            let request = PendingRequest::new(
                tracker.unique_id(),
                self.circuit_format(),
                RequestKind::Retry(tracker),
            );
            self.submit_for_selection(Scenario::from_emergency(emergency), request);
            return;
        }

        let domain = if !tracker.used_packet_transport() && self.transports.packet_available() {
            Domain::PacketSwitched
        } else {
            Domain::CircuitSwitched
        };
        let circuit_format = self.circuit_format();
        self.send_retry(tracker, domain, circuit_format);
    }

    fn with_default_service_center(&self, mut kind: RequestKind) -> RequestKind {
        let service_center = match &mut kind {
            RequestKind::Data(request) => Some(&mut request.service_center),
            RequestKind::Text(request) => Some(&mut request.service_center),
            RequestKind::MultipartText(request) => Some(&mut request.service_center),
            RequestKind::Retry(_) => None,
        };
        if let Some(service_center) = service_center {
            if service_center.as_deref().map_or(true, str::is_empty) {
                *service_center = self.radio.sim_service_center();
            }
        }
        kind
    }

    fn start_emergency_session(&self, request: PendingRequest) {
        let emergency = self.emergency.clone();
        let events = self.events.clone();
        let message_id = request.kind.message_id();
        let is_test = request
            .kind
            .destination()
            .is_some_and(|dest| self.emergency_numbers.is_test_emergency_number(dest));

        tokio::spawn(async move {
            let result = emergency.start_emergency_sms(message_id, is_test).await;
            if let Err(SendError(Event::EmergencySessionStarted { request, .. })) =
                events.send(Event::EmergencySessionStarted { request, result })
            {
                request.fail(SendResult::GenericFailure);
            }
        });
    }

    pub(super) fn on_emergency_session_started(
        &mut self,
        request: PendingRequest,
        result: Result<(), EmergencyError>,
    ) {
        match result {
            Ok(()) => log::info!(
                "sms({}): emergency session started for message {}",
                self.config.name,
                request.kind.message_id()
            ),
            Err(err) => log::warn!(
                "sms({}): emergency session for message {} not started: {}",
                self.config.name,
                request.kind.message_id(),
                err
            ),
        }
        self.submit_for_selection(Scenario::Emergency, request);
    }

    fn submit_for_selection(&mut self, scenario: Scenario, request: PendingRequest) {
        match self.selection.submit(scenario, request) {
            SubmitOutcome::Queued => {}
            SubmitOutcome::Negotiate(negotiation) => {
                let events = self.events.clone();
                let scenario = negotiation.scenario;
                let session_id = negotiation.session_id;
                log::debug!(
                    "sms({}): {} selection session {} started",
                    self.config.name,
                    scenario,
                    session_id
                );
                tokio::spawn(async move {
                    let result = negotiation.run().await;
                    let _ = events.send(Event::DomainSelected { scenario, session_id, result });
                });
            }
            SubmitOutcome::Unavailable(drain) => self.route_drain(drain),
        }
    }

    pub(super) fn on_domain_selected(
        &mut self,
        scenario: Scenario,
        session_id: u64,
        result: Result<Domain, SelectionError>,
    ) {
        if let Some(drain) = self.selection.complete(scenario, session_id, result) {
            self.route_drain(drain);
        }
    }

    /// Routes every drained request with the resolved domain, in order.
    fn route_drain(&mut self, drain: Drain) {
        let (domain, fallback) = drain.resolved_domain(self.transports.packet_available());
        if fallback {
            log::warn!(
                "sms({}): {} selection gave no domain, falling back to {}",
                self.config.name,
                drain.scenario,
                domain
            );
        }
        log::debug!(
            "sms({}): draining {} {} request(s) over {}",
            self.config.name,
            drain.requests.len(),
            drain.scenario,
            domain
        );

        for request in drain.requests {
            let PendingRequest { unique_id, circuit_format, kind } = request;
            let domain = match &kind {
                RequestKind::Text(text)
                    if fallback
                        && domain != Domain::PacketSwitched
                        && self.transports.ims.supports_emergency_sms(&text.destination) =>
                {
                    Domain::PacketSwitched
                }
                _ => domain,
            };
            match kind {
                RequestKind::Retry(tracker) => self.send_retry(tracker, domain, circuit_format),
                kind => {
                    let request = PendingRequest::new(unique_id, circuit_format, kind);
                    self.transports.dispatch(route(domain, circuit_format), request, &self.events);
                }
            }
        }
    }

    fn send_legacy(&mut self, request: PendingRequest) {
        let PendingRequest { unique_id, circuit_format, kind } = request;
        let packet_available = self.transports.packet_available();
        let kind = match kind {
            RequestKind::Retry(tracker) => {
                log::warn!(
                    "sms({}): retry {} arrived as a new request",
                    self.config.name,
                    tracker.unique_id()
                );
                return self.on_retry(tracker);
            }
            kind => kind,
        };
        let domain = match &kind {
            RequestKind::Text(text)
                if packet_available
                    || self.transports.ims.supports_emergency_sms(&text.destination) =>
            {
                Domain::PacketSwitched
            }
            _ if packet_available => Domain::PacketSwitched,
            _ => Domain::CircuitSwitched,
        };
        let request = PendingRequest::new(unique_id, circuit_format, kind);
        self.transports.dispatch(route(domain, self.legacy_mo_format()), request, &self.events);
    }

    /// Re-encodes `tracker` for the route serving `domain` and resends it.
    fn send_retry(
        &mut self,
        mut tracker: OutboundTracker,
        domain: Domain,
        circuit_format: SmsFormat,
    ) {
        let route: Route = route(domain, circuit_format);
        let new_format = self.transports.format(route);
        if let Err(err) = reencode_for_retry(&mut tracker, new_format, &self.codecs) {
            log::error!(
                "sms({}): retry of message {} failed: {}",
                self.config.name,
                tracker.message_id(),
                err
            );
            let (route, _) = self.transports.resolve(route);
            let is_last_part = tracker.record_part(false);
            self.notify_sent(&tracker, route.domain(), is_last_part, false);
            tracker.complete(SendResult::RetryFailed);
            return;
        }

        let unique_id = tracker.unique_id();
        let request = PendingRequest::new(unique_id, circuit_format, RequestKind::Retry(tracker));
        self.transports.dispatch(route, request, &self.events);
    }

    /// Emergency bookkeeping after a part finished on `domain`.
    pub(super) fn notify_sent(
        &self,
        tracker: &OutboundTracker,
        domain: Domain,
        is_last_part: bool,
        success: bool,
    ) {
        if !self.domain_selection_enabled {
            return;
        }
        if tracker.destination().is_some_and(|dest| self.is_emergency_number(dest)) {
            self.emergency.end_sms(tracker.message_id(), success, domain, is_last_part);
        }
    }
}
