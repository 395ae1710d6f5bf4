//! Outbound SMS dispatch engine.
//!
//! This crate coordinates mobile-originated SMS over a telephony stack that
//! can carry a message either over the packet-switched (IMS) domain or the
//! circuit-switched domain, and correlates delivery status reports back to the
//! request that produced them. It provides:
//!
//! - **Domain selection coordination**: one in-flight negotiation per
//!   scenario (normal or emergency), queued requests drained in FIFO order
//! - **Transport routing** over packet-switched IMS or circuit-switched GSM/CDMA
//! - **Retry re-encoding** when a resend changes the wire format
//! - **Delivery correlation tables** keyed by transport message reference
//! - **Partial-segment reclamation timer** driven by in-service time
//!
//! Everything runs on a single event loop ([`Dispatcher`]); callers interact
//! through a cloneable [`DispatcherHandle`]. External capabilities (radio,
//! transports, domain selection, codecs, storage) are injected through
//! [`Collaborators`].

pub mod codec;
pub mod config;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod handles;
pub mod reencode;
pub mod request;
pub mod router;
pub mod selection;
pub mod time;
pub mod timer;
pub mod tracker;
pub mod traits;
pub mod types;

pub use codec::{CodecRegistry, FormatCodec, StatusReport, SubmitFields};
pub use config::DispatchConfig;
pub use engine::{Collaborators, Dispatcher, DispatcherHandle};
pub use error::{
    CodecError, ConfigError, DispatchError, EmergencyError, RadioError, RetryEncodeError,
    SelectionError,
};
pub use handles::{DeliveryHandle, DeliveryReport, PartHandles, SentHandle};
pub use request::{DataRequest, MultipartTextRequest, SendOptions, TextRequest};
pub use router::{route, Transports};
pub use selection::Scenario;
pub use time::{Clock, SystemClock};
pub use tracker::{OutboundTracker, RetryFields, RetryPayload, WireUnit};
pub use traits::*;
pub use types::*;
