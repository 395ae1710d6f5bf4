#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sms_dispatch::{
    Clock, CodecError, CodecRegistry, Collaborators, DataSubmission, DeliveryStatus,
    DispatchConfig, Dispatcher, DispatcherHandle, Domain, DomainSelectionService, EmergencyError,
    EmergencyNumbers, EmergencyStateTracker, FormatCodec, InboundReassembly, MessageStore,
    MultipartSubmission, OutboundTracker, PacketRegistration, RadioError, RadioEvent,
    RadioInterface, RetryPayload, SegmentReaper, SelectionAttributes, SelectionConnection,
    SelectionError, ServiceState, SmsFormat, SmsTransport, StatusReport, SubmitFields,
    TextSubmission, TransportReply, Transports, WireUnit,
};
use tokio::sync::{mpsc, oneshot};

const WAIT: Duration = Duration::from_secs(2);

pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv()).await.expect("timed out").expect("channel closed")
}

/// Lets the dispatcher drain what was posted so far.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached");
}

// ---- radio ----

pub struct FakeRadio {
    events: Mutex<Option<mpsc::UnboundedSender<RadioEvent>>>,
    voice_format: Mutex<SmsFormat>,
    voice_queries: AtomicUsize,
    registration_queries: AtomicUsize,
    service_state: Mutex<ServiceState>,
    registration: Mutex<Result<PacketRegistration, RadioError>>,
    sim_service_center: Option<String>,
}

impl FakeRadio {
    pub fn set_voice_format(&self, format: SmsFormat) {
        *self.voice_format.lock().expect("lock") = format;
    }

    pub fn voice_queries(&self) -> usize {
        self.voice_queries.load(Ordering::SeqCst)
    }

    pub fn registration_queries(&self) -> usize {
        self.registration_queries.load(Ordering::SeqCst)
    }

    pub fn set_registration(&self, registration: Result<PacketRegistration, RadioError>) {
        *self.registration.lock().expect("lock") = registration;
    }

    pub fn emit(&self, event: RadioEvent) {
        if let Some(tx) = self.events.lock().expect("lock").as_ref() {
            let _ = tx.send(event);
        }
    }
}

#[async_trait]
impl RadioInterface for FakeRadio {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<RadioEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().expect("lock") = Some(tx);
        rx
    }

    async fn query_packet_registration(&self) -> Result<PacketRegistration, RadioError> {
        self.registration_queries.fetch_add(1, Ordering::SeqCst);
        self.registration.lock().expect("lock").clone()
    }

    fn voice_format(&self) -> SmsFormat {
        self.voice_queries.fetch_add(1, Ordering::SeqCst);
        *self.voice_format.lock().expect("lock")
    }

    fn service_state(&self) -> ServiceState {
        *self.service_state.lock().expect("lock")
    }

    fn sim_service_center(&self) -> Option<String> {
        self.sim_service_center.clone()
    }
}

// ---- domain selection ----

/// One opened negotiation; answer it through `reply`.
pub struct Negotiation {
    pub attributes: SelectionAttributes,
    pub reply: oneshot::Sender<Result<Domain, SelectionError>>,
}

pub struct FakeSelection {
    supported: bool,
    connects: bool,
    opened: mpsc::UnboundedSender<Negotiation>,
    finished: Arc<AtomicUsize>,
}

impl FakeSelection {
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

struct FakeConnection {
    opened: mpsc::UnboundedSender<Negotiation>,
    finished: Arc<AtomicUsize>,
}

#[async_trait]
impl SelectionConnection for FakeConnection {
    async fn select_domain(
        &self,
        attributes: SelectionAttributes,
    ) -> Result<Domain, SelectionError> {
        let (reply, answer) = oneshot::channel();
        let _ = self.opened.send(Negotiation { attributes, reply });
        answer.await.unwrap_or_else(|_| Err(SelectionError::Unavailable("dropped".into())))
    }

    fn finish_selection(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

impl DomainSelectionService for FakeSelection {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn connect(&self, _emergency: bool) -> Option<Arc<dyn SelectionConnection>> {
        if !self.connects {
            return None;
        }
        Some(Arc::new(FakeConnection {
            opened: self.opened.clone(),
            finished: self.finished.clone(),
        }))
    }
}

// ---- transports ----

#[derive(Debug)]
pub enum Call {
    Data(DataSubmission),
    Text(TextSubmission),
    Multipart(MultipartSubmission),
    Resend(OutboundTracker),
}

#[derive(Debug)]
pub struct TransportCall {
    pub call: Call,
    pub reply: TransportReply,
}

impl TransportCall {
    pub fn into_text(self) -> (TextSubmission, TransportReply) {
        match self.call {
            Call::Text(text) => (text, self.reply),
            other => panic!("expected text, got {other:?}"),
        }
    }

    pub fn into_data(self) -> (DataSubmission, TransportReply) {
        match self.call {
            Call::Data(data) => (data, self.reply),
            other => panic!("expected data, got {other:?}"),
        }
    }

    pub fn into_multipart(self) -> (MultipartSubmission, TransportReply) {
        match self.call {
            Call::Multipart(multipart) => (multipart, self.reply),
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    pub fn into_resend(self) -> (OutboundTracker, TransportReply) {
        match self.call {
            Call::Resend(tracker) => (tracker, self.reply),
            other => panic!("expected resend, got {other:?}"),
        }
    }

    pub fn unique_id(&self) -> u64 {
        match &self.call {
            Call::Data(data) => data.unique_id,
            Call::Text(text) => text.unique_id,
            Call::Multipart(multipart) => multipart.unique_id,
            Call::Resend(tracker) => tracker.unique_id(),
        }
    }
}

pub struct FakeTransport {
    format: SmsFormat,
    available: AtomicBool,
    emergency_capable: bool,
    calls: mpsc::UnboundedSender<TransportCall>,
}

impl FakeTransport {
    fn new(
        format: SmsFormat,
        available: bool,
        emergency_capable: bool,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<TransportCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            format,
            available: AtomicBool::new(available),
            emergency_capable,
            calls,
        });
        (transport, rx)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn record(&self, call: Call, reply: TransportReply) {
        let _ = self.calls.send(TransportCall { call, reply });
    }
}

impl SmsTransport for FakeTransport {
    fn format(&self) -> SmsFormat {
        self.format
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn supports_emergency_sms(&self, _destination: &str) -> bool {
        self.emergency_capable
    }

    fn send_data(&self, submission: DataSubmission, reply: TransportReply) {
        self.record(Call::Data(submission), reply);
    }

    fn send_text(&self, submission: TextSubmission, reply: TransportReply) {
        self.record(Call::Text(submission), reply);
    }

    fn send_multipart_text(&self, submission: MultipartSubmission, reply: TransportReply) {
        self.record(Call::Multipart(submission), reply);
    }

    fn resend(&self, tracker: OutboundTracker, reply: TransportReply) {
        self.record(Call::Resend(tracker), reply);
    }
}

// ---- codecs ----

/// Submit PDU: format tag, destination, payload. Status report PDU: 2-byte
/// reference then 4-byte status, big endian.
pub struct FakeCodec(pub SmsFormat);

pub const TAG_3GPP: u8 = 0xA1;
pub const TAG_3GPP2: u8 = 0xB2;

impl FormatCodec for FakeCodec {
    fn format(&self) -> SmsFormat {
        self.0
    }

    fn encode_submit(&self, fields: &SubmitFields<'_>) -> Result<WireUnit, CodecError> {
        let mut pdu = vec![if self.0.is_3gpp2() { TAG_3GPP2 } else { TAG_3GPP }];
        pdu.extend_from_slice(fields.destination.as_bytes());
        match fields.payload {
            RetryPayload::Text(text) => pdu.extend_from_slice(text.as_bytes()),
            RetryPayload::Data { port, data } => {
                pdu.extend_from_slice(&port.to_be_bytes());
                pdu.extend_from_slice(data);
            }
        }
        Ok(WireUnit { service_center: fields.service_center.map(|sc| sc.as_bytes().to_vec()), pdu })
    }

    fn decode_status_report(&self, pdu: &[u8]) -> Result<StatusReport, CodecError> {
        if pdu.len() < 6 {
            return Err(CodecError::Decode(format!("short report ({} bytes)", pdu.len())));
        }
        Ok(StatusReport {
            message_ref: u16::from_be_bytes([pdu[0], pdu[1]]),
            status: u32::from_be_bytes([pdu[2], pdu[3], pdu[4], pdu[5]]),
        })
    }
}

pub fn status_report(message_ref: u16, status: u32) -> Vec<u8> {
    let mut pdu = message_ref.to_be_bytes().to_vec();
    pdu.extend_from_slice(&status.to_be_bytes());
    pdu
}

pub fn wire(tag: u8) -> WireUnit {
    WireUnit { service_center: None, pdu: vec![tag] }
}

// ---- emergency, storage, clock ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndSms {
    pub message_id: u64,
    pub success: bool,
    pub domain: Domain,
    pub is_last_part: bool,
}

#[derive(Default)]
pub struct FakeEmergency {
    pub reject_start: bool,
    starts: Mutex<Vec<(u64, bool)>>,
    ends: Mutex<Vec<EndSms>>,
    received: AtomicUsize,
}

impl FakeEmergency {
    pub fn starts(&self) -> Vec<(u64, bool)> {
        self.starts.lock().expect("lock").clone()
    }

    pub fn ends(&self) -> Vec<EndSms> {
        self.ends.lock().expect("lock").clone()
    }

    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmergencyStateTracker for FakeEmergency {
    async fn start_emergency_sms(
        &self,
        message_id: u64,
        is_test: bool,
    ) -> Result<(), EmergencyError> {
        self.starts.lock().expect("lock").push((message_id, is_test));
        if self.reject_start {
            Err(EmergencyError::Rejected(1))
        } else {
            Ok(())
        }
    }

    fn end_sms(&self, message_id: u64, success: bool, domain: Domain, is_last_part: bool) {
        self.ends.lock().expect("lock").push(EndSms { message_id, success, domain, is_last_part });
    }

    fn on_emergency_sms_received(&self) {
        self.received.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct EmergencyList {
    numbers: Vec<String>,
    test_numbers: Vec<String>,
}

impl EmergencyNumbers for EmergencyList {
    fn is_emergency_number(&self, number: &str) -> bool {
        self.numbers.iter().chain(&self.test_numbers).any(|n| n == number)
    }

    fn is_test_emergency_number(&self, number: &str) -> bool {
        self.test_numbers.iter().any(|n| n == number)
    }
}

#[derive(Default)]
pub struct FakeStore {
    updates: Mutex<Vec<(String, DeliveryStatus)>>,
}

impl FakeStore {
    pub fn updates(&self) -> Vec<(String, DeliveryStatus)> {
        self.updates.lock().expect("lock").clone()
    }
}

impl MessageStore for FakeStore {
    fn update_status(&self, message_uri: &str, status: DeliveryStatus) -> std::io::Result<()> {
        self.updates.lock().expect("lock").push((message_uri.to_string(), status));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeReaper {
    reaps: Mutex<Vec<u64>>,
}

impl FakeReaper {
    pub fn reaps(&self) -> Vec<u64> {
        self.reaps.lock().expect("lock").clone()
    }
}

impl SegmentReaper for FakeReaper {
    fn reclaim_stale_segments(&self, older_than_ms: u64) {
        self.reaps.lock().expect("lock").push(older_than_ms);
    }
}

#[derive(Default)]
pub struct FakeReassembly {
    waiting: AtomicBool,
    checks: AtomicUsize,
}

impl FakeReassembly {
    pub fn set_waiting(&self, waiting: bool) {
        self.waiting.store(waiting, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl InboundReassembly for FakeReassembly {
    fn is_waiting_for_segments(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.waiting.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn set(&self, millis: u64) {
        self.0.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ---- harness ----

pub struct Setup {
    pub domain_selection: bool,
    pub selection_connects: bool,
    pub ims_available: bool,
    pub ims_emergency_capable: bool,
    pub voice_format: SmsFormat,
    pub format_b_enabled: bool,
    pub service_state: ServiceState,
    pub emergency_numbers: Vec<&'static str>,
    pub test_emergency_numbers: Vec<&'static str>,
    pub reject_emergency_start: bool,
    pub sim_service_center: Option<&'static str>,
    pub partial_segment_wait_secs: u64,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            domain_selection: true,
            selection_connects: true,
            ims_available: false,
            ims_emergency_capable: false,
            voice_format: SmsFormat::ThreeGpp,
            format_b_enabled: true,
            service_state: ServiceState::OutOfService,
            emergency_numbers: vec!["911"],
            test_emergency_numbers: Vec::new(),
            reject_emergency_start: false,
            sim_service_center: None,
            partial_segment_wait_secs: 60,
        }
    }
}

pub struct Harness {
    pub handle: DispatcherHandle,
    pub radio: Arc<FakeRadio>,
    pub selection: Arc<FakeSelection>,
    pub negotiations: mpsc::UnboundedReceiver<Negotiation>,
    pub ims: Arc<FakeTransport>,
    pub ims_calls: mpsc::UnboundedReceiver<TransportCall>,
    pub gsm_calls: mpsc::UnboundedReceiver<TransportCall>,
    pub cdma_calls: mpsc::UnboundedReceiver<TransportCall>,
    pub emergency: Arc<FakeEmergency>,
    pub store: Arc<FakeStore>,
    pub reaper: Arc<FakeReaper>,
    pub reassembly: Arc<FakeReassembly>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn start(setup: Setup) -> Self {
        let radio = Arc::new(FakeRadio {
            events: Mutex::new(None),
            voice_format: Mutex::new(setup.voice_format),
            voice_queries: AtomicUsize::new(0),
            registration_queries: AtomicUsize::new(0),
            service_state: Mutex::new(setup.service_state),
            registration: Mutex::new(Ok(PacketRegistration::default())),
            sim_service_center: setup.sim_service_center.map(str::to_string),
        });
        let (opened, negotiations) = mpsc::unbounded_channel();
        let selection = Arc::new(FakeSelection {
            supported: true,
            connects: setup.selection_connects,
            opened,
            finished: Arc::new(AtomicUsize::new(0)),
        });
        let (ims, ims_calls) = FakeTransport::new(
            SmsFormat::ThreeGpp,
            setup.ims_available,
            setup.ims_emergency_capable,
        );
        let (gsm, gsm_calls) = FakeTransport::new(SmsFormat::ThreeGpp, true, false);
        let (cdma, cdma_calls) = FakeTransport::new(SmsFormat::ThreeGpp2, true, false);
        let emergency = Arc::new(FakeEmergency {
            reject_start: setup.reject_emergency_start,
            ..Default::default()
        });
        let store = Arc::new(FakeStore::default());
        let reaper = Arc::new(FakeReaper::default());
        let reassembly = Arc::new(FakeReassembly::default());
        let clock = Arc::new(ManualClock::default());

        let config = DispatchConfig {
            name: "test".into(),
            domain_selection_enabled: setup.domain_selection,
            format_b_enabled: setup.format_b_enabled,
            partial_segment_wait_secs: setup.partial_segment_wait_secs,
            ..DispatchConfig::default()
        };
        let collaborators = Collaborators {
            radio: radio.clone(),
            domain_selection: selection.clone(),
            transports: Transports::new(ims.clone(), gsm).with_cdma(cdma),
            codecs: CodecRegistry::new()
                .with(Arc::new(FakeCodec(SmsFormat::ThreeGpp)))
                .with(Arc::new(FakeCodec(SmsFormat::ThreeGpp2))),
            emergency: emergency.clone(),
            emergency_numbers: Arc::new(EmergencyList {
                numbers: setup.emergency_numbers.iter().map(|n| n.to_string()).collect(),
                test_numbers: setup.test_emergency_numbers.iter().map(|n| n.to_string()).collect(),
            }),
            store: store.clone(),
            reaper: reaper.clone(),
            reassembly: vec![reassembly.clone() as Arc<dyn InboundReassembly>],
            clock: clock.clone(),
        };

        let handle = Dispatcher::spawn(config, collaborators);
        Self {
            handle,
            radio,
            selection,
            negotiations,
            ims,
            ims_calls,
            gsm_calls,
            cdma_calls,
            emergency,
            store,
            reaper,
            reassembly,
            clock,
        }
    }

    /// Asserts no transport received anything further.
    pub async fn assert_no_more_sends(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(self.ims_calls.try_recv().is_err(), "unexpected ims send");
        assert!(self.gsm_calls.try_recv().is_err(), "unexpected gsm send");
        assert!(self.cdma_calls.try_recv().is_err(), "unexpected cdma send");
    }
}

pub mod requests {
    use sms_dispatch::{
        DataRequest, DeliveryHandle, DeliveryReport, MultipartTextRequest, PartHandles,
        SendOptions, SendResult, SentHandle, TextRequest,
    };
    use tokio::sync::{mpsc, oneshot};

    pub struct Observed {
        pub sent: oneshot::Receiver<SendResult>,
        pub delivery: mpsc::UnboundedReceiver<DeliveryReport>,
    }

    pub fn handles() -> (PartHandles, Observed) {
        let (sent, sent_rx) = SentHandle::channel();
        let (delivery, delivery_rx) = DeliveryHandle::channel();
        (PartHandles::new(sent, Some(delivery)), Observed { sent: sent_rx, delivery: delivery_rx })
    }

    pub fn text(destination: &str, body: &str, handles: PartHandles) -> TextRequest {
        TextRequest {
            destination: destination.into(),
            service_center: Some("+15550000".into()),
            text: body.into(),
            handles,
            options: SendOptions { message_id: 100, ..SendOptions::default() },
        }
    }

    pub fn data(destination: &str, port: u16, handles: PartHandles) -> DataRequest {
        DataRequest {
            destination: destination.into(),
            service_center: Some("+15550000".into()),
            port,
            data: vec![0xde, 0xad],
            handles,
            options: SendOptions { message_id: 200, ..SendOptions::default() },
        }
    }

    pub fn multipart(
        destination: &str,
        parts: &[&str],
        handles: Vec<PartHandles>,
    ) -> MultipartTextRequest {
        MultipartTextRequest {
            destination: destination.into(),
            service_center: Some("+15550000".into()),
            parts: parts.iter().map(|p| p.to_string()).collect(),
            handles,
            options: SendOptions { message_id: 300, ..SendOptions::default() },
        }
    }
}
