mod emergency;
mod radio;
mod selection;
mod storage;
mod transport;

pub use emergency::{EmergencyNumbers, EmergencyStateTracker};
pub use radio::{RadioEvent, RadioInterface};
pub use selection::{DomainSelectionService, SelectionAttributes, SelectionConnection};
pub use storage::{InboundReassembly, MessageStore, SegmentReaper};
pub use transport::{
    DataSubmission, MultipartSubmission, PartOutcome, SmsTransport, TextSubmission,
    TransportReply,
};
