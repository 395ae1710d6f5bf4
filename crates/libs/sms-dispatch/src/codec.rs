use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::CodecError;
use crate::tracker::{RetryPayload, WireUnit};
use crate::types::{MessageRef, SmsFormat};

/// Input to a submit-PDU encoder.
#[derive(Debug, Clone, Copy)]
pub struct SubmitFields<'a> {
    pub service_center: Option<&'a str>,
    pub destination: &'a str,
    pub payload: &'a RetryPayload,
    pub status_report_requested: bool,
    pub message_ref: MessageRef,
}

/// Decoded status report: the reference it answers and the raw status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub message_ref: MessageRef,
    pub status: u32,
}

/// Encoder/decoder for one SMS wire format.
pub trait FormatCodec: Send + Sync {
    fn format(&self) -> SmsFormat;

    fn encode_submit(&self, fields: &SubmitFields<'_>) -> Result<WireUnit, CodecError>;

    fn decode_status_report(&self, pdu: &[u8]) -> Result<StatusReport, CodecError>;
}

/// Codecs keyed by the format they implement.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<SmsFormat, Arc<dyn FormatCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, codec: Arc<dyn FormatCodec>) -> Self {
        self.register(codec);
        self
    }

    /// Registers `codec` under its own format, replacing any previous entry.
    pub fn register(&mut self, codec: Arc<dyn FormatCodec>) {
        self.codecs.insert(codec.format(), codec);
    }

    pub fn get(&self, format: SmsFormat) -> Option<&Arc<dyn FormatCodec>> {
        self.codecs.get(&format)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.codecs.keys()).finish()
    }
}
