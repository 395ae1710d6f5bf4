use std::io;

use crate::types::DeliveryStatus;

/// Persisted message store; the engine only writes terminal delivery status.
pub trait MessageStore: Send + Sync {
    fn update_status(&self, message_uri: &str, status: DeliveryStatus) -> io::Result<()>;
}

/// Reclaims partial inbound multipart messages.
pub trait SegmentReaper: Send + Sync {
    /// Deletes partial segments received before `older_than_ms` (epoch millis).
    fn reclaim_stale_segments(&self, older_than_ms: u64);
}

pub trait InboundReassembly: Send + Sync {
    fn is_waiting_for_segments(&self) -> bool;
}
