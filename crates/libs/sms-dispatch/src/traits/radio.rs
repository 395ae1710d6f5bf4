use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::RadioError;
use crate::types::{PacketRegistration, ServiceState, SmsFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadioEvent {
    RadioOn,
    PacketRegistrationChanged,
    ServiceStateChanged(ServiceState),
}

/// Radio and registration state of the subscription the engine serves.
#[async_trait]
pub trait RadioInterface: Send + Sync {
    /// Event stream; the engine subscribes once at start.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<RadioEvent>;

    /// Asks the modem whether SMS is registered over the packet domain.
    async fn query_packet_registration(&self) -> Result<PacketRegistration, RadioError>;

    /// Format used on the circuit-switched (voice) network.
    fn voice_format(&self) -> SmsFormat;

    fn service_state(&self) -> ServiceState;

    /// Service center stored on the SIM.
    fn sim_service_center(&self) -> Option<String> {
        None
    }
}
