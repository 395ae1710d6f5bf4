use std::collections::HashMap;

use crate::tracker::OutboundTracker;
use crate::types::{DeliveryStatus, MessageRef, SmsFormat};

/// TP-Status values below this are "transaction completed".
const TP_STATUS_COMPLETE_LIMIT: u32 = 0x20;
/// TP-Status values at or above this are permanent errors.
const TP_STATUS_FAILED_FROM: u32 = 0x40;

const ERROR_CLASS_SHIFT: u32 = 24;
const ERROR_CLASS_MASK: u32 = 0x03;
const ERROR_CLASS_NONE: u32 = 0;
const ERROR_CLASS_TEMPORARY: u32 = 2;

/// Classification of a status report relative to its tracker's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportClass {
    Complete,
    Failed,
    /// Transient; more reports will follow.
    Pending,
}

impl ReportClass {
    pub fn classify(format: SmsFormat, status: u32) -> Self {
        match format {
            SmsFormat::ThreeGpp => {
                if status < TP_STATUS_COMPLETE_LIMIT {
                    Self::Complete
                } else if status >= TP_STATUS_FAILED_FROM {
                    Self::Failed
                } else {
                    Self::Pending
                }
            }
            SmsFormat::ThreeGpp2 => match (status >> ERROR_CLASS_SHIFT) & ERROR_CLASS_MASK {
                ERROR_CLASS_NONE => Self::Complete,
                ERROR_CLASS_TEMPORARY => Self::Pending,
                _ => Self::Failed,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Status persisted for a terminal report.
    pub fn stored_status(&self) -> Option<DeliveryStatus> {
        match self {
            Self::Complete => Some(DeliveryStatus::Complete),
            Self::Failed => Some(DeliveryStatus::Failed),
            Self::Pending => None,
        }
    }
}

/// Tracker located for a status report.
#[derive(Debug)]
pub enum Correlated<'a> {
    /// Terminal report: the tracker has been removed from its table.
    Final(OutboundTracker),
    /// Transient report: the tracker stays registered.
    Pending(&'a OutboundTracker),
}

impl Correlated<'_> {
    pub fn tracker(&self) -> &OutboundTracker {
        match self {
            Self::Final(tracker) => tracker,
            Self::Pending(tracker) => tracker,
        }
    }
}

/// Outstanding trackers awaiting a status report, partitioned by format.
#[derive(Debug, Default)]
pub struct DeliveryCorrelation {
    pending_3gpp: HashMap<MessageRef, OutboundTracker>,
    pending_3gpp2: HashMap<MessageRef, OutboundTracker>,
}

impl DeliveryCorrelation {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, format: SmsFormat) -> &HashMap<MessageRef, OutboundTracker> {
        match format {
            SmsFormat::ThreeGpp => &self.pending_3gpp,
            SmsFormat::ThreeGpp2 => &self.pending_3gpp2,
        }
    }

    fn table_mut(&mut self, format: SmsFormat) -> &mut HashMap<MessageRef, OutboundTracker> {
        match format {
            SmsFormat::ThreeGpp => &mut self.pending_3gpp,
            SmsFormat::ThreeGpp2 => &mut self.pending_3gpp2,
        }
    }

    /// Inserts `tracker` under its own format and message reference.
    pub fn register(&mut self, tracker: OutboundTracker) {
        let format = tracker.format();
        let message_ref = tracker.message_ref();
        if let Some(previous) = self.table_mut(format).insert(message_ref, tracker) {
            log::warn!(
                "sms: {} reference {} reused, dropping tracker of message {}",
                format,
                message_ref,
                previous.message_id()
            );
        }
    }

    /// Looks up the tracker a report refers to. 3GPP2 reports fall back to the
    /// 3GPP table, some carriers answer IMS-sent 3GPP messages that way.
    pub fn on_status_report(
        &mut self,
        format: SmsFormat,
        message_ref: MessageRef,
        class: ReportClass,
    ) -> Option<Correlated<'_>> {
        let table_format = if self.table(format).contains_key(&message_ref) {
            format
        } else if format == SmsFormat::ThreeGpp2
            && self.pending_3gpp.contains_key(&message_ref)
        {
            SmsFormat::ThreeGpp
        } else {
            return None;
        };

        let table = self.table_mut(table_format);
        if class.is_terminal() {
            table.remove(&message_ref).map(Correlated::Final)
        } else {
            table.get(&message_ref).map(Correlated::Pending)
        }
    }

    pub fn contains(&self, format: SmsFormat, message_ref: MessageRef) -> bool {
        self.table(format).contains_key(&message_ref)
    }

    pub fn len(&self) -> usize {
        self.pending_3gpp.len() + self.pending_3gpp2.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
