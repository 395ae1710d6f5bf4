//! Dispatcher event loop.
//!
//! Submodules by responsibility:
//!   handle   - public handle posting events into the loop
//!   outbound - domain selection, legacy routing, retries
//!   delivery - transport completions and status-report correlation
//!   segments - service-availability window and partial-segment reaping

mod delivery;
mod handle;
mod outbound;
mod segments;

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::codec::CodecRegistry;
use crate::config::DispatchConfig;
use crate::correlation::DeliveryCorrelation;
use crate::error::{EmergencyError, RadioError, SelectionError};
use crate::request::{PendingRequest, RequestKind};
use crate::router::Transports;
use crate::selection::{DomainSelectionCoordinator, Scenario};
use crate::time::Clock;
use crate::timer::ServiceAvailabilityWindow;
use crate::tracker::OutboundTracker;
use crate::traits::{
    DomainSelectionService, EmergencyNumbers, EmergencyStateTracker, InboundReassembly,
    MessageStore, PartOutcome, RadioEvent, RadioInterface, SegmentReaper,
};
use crate::types::{Domain, PacketRegistration, Route, SendResult, ServiceState, SmsFormat};

pub use handle::DispatcherHandle;

/// Units of work serialized onto the dispatcher loop.
#[derive(Debug)]
pub(crate) enum Event {
    Submit { unique_id: u64, kind: RequestKind },
    Retry(OutboundTracker),
    EmergencySessionStarted { request: PendingRequest, result: Result<(), EmergencyError> },
    DomainSelected { scenario: Scenario, session_id: u64, result: Result<Domain, SelectionError> },
    PartCompleted { route: Route, tracker: OutboundTracker, outcome: PartOutcome },
    StatusReport { format: SmsFormat, pdu: Vec<u8> },
    Radio(RadioEvent),
    RegistrationQueried(Result<PacketRegistration, RadioError>),
    ReassemblyIdle,
    SegmentTimerExpired { generation: u64, window_start: u64 },
    ReceivedViaPacket { origin: Option<String> },
    Dispose(oneshot::Sender<()>),
}

/// External capabilities the dispatcher drives.
#[derive(Clone)]
pub struct Collaborators {
    pub radio: Arc<dyn RadioInterface>,
    pub domain_selection: Arc<dyn DomainSelectionService>,
    pub transports: Transports,
    pub codecs: CodecRegistry,
    pub emergency: Arc<dyn EmergencyStateTracker>,
    pub emergency_numbers: Arc<dyn EmergencyNumbers>,
    pub store: Arc<dyn MessageStore>,
    pub reaper: Arc<dyn SegmentReaper>,
    /// Inbound handlers whose "waiting for segments" state defers a reap.
    pub reassembly: Vec<Arc<dyn InboundReassembly>>,
    pub clock: Arc<dyn Clock>,
}

/// State owned by the dispatcher loop. Only reachable through a
/// [`DispatcherHandle`].
pub struct Dispatcher {
    config: DispatchConfig,
    domain_selection_enabled: bool,
    radio: Arc<dyn RadioInterface>,
    selection: DomainSelectionCoordinator,
    transports: Transports,
    codecs: CodecRegistry,
    emergency: Arc<dyn EmergencyStateTracker>,
    emergency_numbers: Arc<dyn EmergencyNumbers>,
    store: Arc<dyn MessageStore>,
    reaper: Arc<dyn SegmentReaper>,
    reassembly: Vec<Arc<dyn InboundReassembly>>,
    clock: Arc<dyn Clock>,
    correlation: DeliveryCorrelation,
    window: ServiceAvailabilityWindow,
    segment_timer: Option<JoinHandle<()>>,
    timer_generation: u64,
    service_state: ServiceState,
    packet_registration: PacketRegistration,
    events: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Starts the dispatcher loop on the current tokio runtime.
    pub fn spawn(config: DispatchConfig, collaborators: Collaborators) -> DispatcherHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let radio_events = collaborators.radio.subscribe();

        let dispatcher = Self::new(config, collaborators, tx.clone(), cancel.clone());
        log::info!(
            "sms({}): dispatcher started (domain selection {})",
            dispatcher.config.name,
            if dispatcher.domain_selection_enabled { "on" } else { "off" }
        );
        tokio::spawn(dispatcher.run(rx, radio_events));

        DispatcherHandle::new(tx, cancel)
    }

    fn new(
        config: DispatchConfig,
        collaborators: Collaborators,
        events: mpsc::UnboundedSender<Event>,
        cancel: CancellationToken,
    ) -> Self {
        let domain_selection_enabled =
            config.domain_selection_enabled && collaborators.domain_selection.is_supported();
        let selection = DomainSelectionCoordinator::new(
            collaborators.domain_selection,
            config.slot_index,
            config.subscription_id,
        );
        let window = ServiceAvailabilityWindow::new(config.partial_segment_wait());
        let service_state = collaborators.radio.service_state();

        Self {
            config,
            domain_selection_enabled,
            radio: collaborators.radio,
            selection,
            transports: collaborators.transports,
            codecs: collaborators.codecs,
            emergency: collaborators.emergency,
            emergency_numbers: collaborators.emergency_numbers,
            store: collaborators.store,
            reaper: collaborators.reaper,
            reassembly: collaborators.reassembly,
            clock: collaborators.clock,
            correlation: DeliveryCorrelation::new(),
            window,
            segment_timer: None,
            timer_generation: 0,
            service_state,
            packet_registration: PacketRegistration::default(),
            events,
            cancel,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<Event>,
        mut radio_events: mpsc::UnboundedReceiver<RadioEvent>,
    ) {
        let cancel = self.cancel.clone();
        self.reset_timer();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.shutdown();
                    break;
                },
                Some(event) = rx.recv() => {
                    if let Event::Dispose(ack) = event {
                        self.shutdown();
                        cancel.cancel();
                        let _ = ack.send(());
                        break;
                    }
                    self.handle_event(event);
                },
                Some(event) = radio_events.recv() => {
                    self.on_radio_event(event);
                },
            }
        }

        log::info!("sms({}): dispatcher stopped", self.config.name);
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Submit { unique_id, kind } => self.on_submit(unique_id, kind),
            Event::Retry(tracker) => self.on_retry(tracker),
            Event::EmergencySessionStarted { request, result } => {
                self.on_emergency_session_started(request, result)
            }
            Event::DomainSelected { scenario, session_id, result } => {
                self.on_domain_selected(scenario, session_id, result)
            }
            Event::PartCompleted { route, tracker, outcome } => {
                self.on_part_completed(route, tracker, outcome)
            }
            Event::StatusReport { format, pdu } => self.on_status_report(format, pdu),
            Event::Radio(event) => self.on_radio_event(event),
            Event::RegistrationQueried(result) => self.on_registration_queried(result),
            Event::ReassemblyIdle => self.reevaluate_timer(),
            Event::SegmentTimerExpired { generation, window_start } => {
                self.on_segment_timer(generation, window_start)
            }
            Event::ReceivedViaPacket { origin } => self.on_received_via_packet(origin),
            Event::Dispose(_) => {}
        }
    }

    fn on_radio_event(&mut self, event: RadioEvent) {
        match event {
            RadioEvent::RadioOn | RadioEvent::PacketRegistrationChanged => {
                self.query_registration()
            }
            RadioEvent::ServiceStateChanged(state) => {
                log::debug!("sms({}): service state {:?}", self.config.name, state);
                self.service_state = state;
                self.reevaluate_timer();
            }
        }
    }

    fn query_registration(&self) {
        let radio = self.radio.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = radio.query_packet_registration().await;
            let _ = events.send(Event::RegistrationQueried(result));
        });
    }

    fn on_registration_queried(&mut self, result: Result<PacketRegistration, RadioError>) {
        match result {
            Ok(registration) => {
                log::debug!(
                    "sms({}): packet registration registered={} format={:?}",
                    self.config.name,
                    registration.registered,
                    registration.format
                );
                self.packet_registration = registration;
            }
            Err(err) => {
                log::error!("sms({}): registration query failed: {}", self.config.name, err);
            }
        }
    }

    fn on_received_via_packet(&self, origin: Option<String>) {
        if !self.domain_selection_enabled {
            return;
        }
        if origin.as_deref().is_some_and(|origin| self.is_emergency_number(origin)) {
            self.emergency.on_emergency_sms_received();
        }
    }

    fn is_emergency_number(&self, number: &str) -> bool {
        self.emergency_numbers.is_emergency_number(number)
    }

    /// Releases negotiations, fails everything still queued and stops the timer.
    fn shutdown(&mut self) {
        self.cancel_segment_timer();
        let queued = self.selection.teardown();
        log::info!(
            "sms({}): disposing, failing {} queued request(s)",
            self.config.name,
            queued.len()
        );
        for request in queued {
            request.fail(SendResult::GenericFailure);
        }
    }
}
