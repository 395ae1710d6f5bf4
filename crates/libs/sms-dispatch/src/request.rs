use crate::error::DispatchError;
use crate::handles::PartHandles;
use crate::tracker::OutboundTracker;
use crate::types::{SendResult, SmsFormat};

/// Per-request flags shared by every message shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub persist: bool,
    pub priority: Option<u8>,
    pub expect_more: bool,
    /// Validity period in minutes.
    pub validity_period: Option<u32>,
    pub skip_short_code_check: bool,
    /// Persisted-message reference updated on terminal delivery status.
    pub message_uri: Option<String>,
    /// Opaque id used in logs and emergency bookkeeping.
    pub message_id: u64,
}

#[derive(Debug)]
pub struct DataRequest {
    pub destination: String,
    pub service_center: Option<String>,
    pub port: u16,
    pub data: Vec<u8>,
    pub handles: PartHandles,
    pub options: SendOptions,
}

#[derive(Debug)]
pub struct TextRequest {
    pub destination: String,
    pub service_center: Option<String>,
    pub text: String,
    pub handles: PartHandles,
    pub options: SendOptions,
}

/// Ordered text parts of one logical message, one handle set per part.
#[derive(Debug)]
pub struct MultipartTextRequest {
    pub destination: String,
    pub service_center: Option<String>,
    pub parts: Vec<String>,
    pub handles: Vec<PartHandles>,
    pub options: SendOptions,
}

impl MultipartTextRequest {
    /// Pads missing handle sets and rejects surplus ones or an empty message.
    pub(crate) fn validate(mut self) -> Result<Self, DispatchError> {
        if self.parts.is_empty() {
            return Err(DispatchError::InvalidRequest("multipart text has no parts".into()));
        }
        if self.handles.len() > self.parts.len() {
            return Err(DispatchError::InvalidRequest(format!(
                "{} handle sets for {} parts",
                self.handles.len(),
                self.parts.len()
            )));
        }
        self.handles.resize_with(self.parts.len(), PartHandles::none);
        Ok(self)
    }
}

/// Shape of a queued request.
#[derive(Debug)]
pub enum RequestKind {
    Data(DataRequest),
    Text(TextRequest),
    MultipartText(MultipartTextRequest),
    Retry(OutboundTracker),
}

impl RequestKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Text(_) => "text",
            Self::MultipartText(_) => "multipart",
            Self::Retry(_) => "retry",
        }
    }

    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Data(request) => Some(&request.destination),
            Self::Text(request) => Some(&request.destination),
            Self::MultipartText(request) => Some(&request.destination),
            Self::Retry(tracker) => tracker.destination(),
        }
    }

    pub fn message_id(&self) -> u64 {
        match self {
            Self::Data(request) => request.options.message_id,
            Self::Text(request) => request.options.message_id,
            Self::MultipartText(request) => request.options.message_id,
            Self::Retry(tracker) => tracker.message_id(),
        }
    }
}

/// A request waiting in the engine; consumed exactly once by routing or failure.
#[derive(Debug)]
pub struct PendingRequest {
    pub unique_id: u64,
    /// Circuit-switched format in effect when the request was created.
    pub circuit_format: SmsFormat,
    pub kind: RequestKind,
}

impl PendingRequest {
    pub fn new(unique_id: u64, circuit_format: SmsFormat, kind: RequestKind) -> Self {
        Self { unique_id, circuit_format, kind }
    }

    /// Completes every part's sent handle with `result` and drops the request.
    pub fn fail(self, result: SendResult) {
        match self.kind {
            RequestKind::Data(request) => request.handles.fail(result),
            RequestKind::Text(request) => request.handles.fail(result),
            RequestKind::MultipartText(request) => {
                for handles in request.handles {
                    handles.fail(result);
                }
            }
            RequestKind::Retry(mut tracker) => {
                tracker.record_part(false);
                tracker.complete(result);
            }
        }
    }
}
