use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SelectionError;
use crate::types::Domain;

/// Parameters handed to the selection service for one negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionAttributes {
    pub slot_index: u32,
    pub subscription_id: i32,
    pub emergency: bool,
}

/// Source of domain-selection connections.
pub trait DomainSelectionService: Send + Sync {
    /// Whether the platform provides domain selection at all.
    fn is_supported(&self) -> bool;

    /// Opens a connection for one negotiation, `None` when none can be had.
    fn connect(&self, emergency: bool) -> Option<Arc<dyn SelectionConnection>>;
}

/// One negotiation with the selection service.
#[async_trait]
pub trait SelectionConnection: Send + Sync {
    async fn select_domain(&self, attributes: SelectionAttributes)
        -> Result<Domain, SelectionError>;

    /// Releases the connection. Called exactly once per negotiation.
    fn finish_selection(&self);
}
