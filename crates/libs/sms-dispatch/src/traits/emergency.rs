use async_trait::async_trait;

use crate::error::EmergencyError;
use crate::types::Domain;

/// Emergency-session bookkeeping owned outside the engine.
#[async_trait]
pub trait EmergencyStateTracker: Send + Sync {
    async fn start_emergency_sms(&self, message_id: u64, is_test: bool)
        -> Result<(), EmergencyError>;

    fn end_sms(&self, message_id: u64, success: bool, domain: Domain, is_last_part: bool);

    fn on_emergency_sms_received(&self);
}

pub trait EmergencyNumbers: Send + Sync {
    fn is_emergency_number(&self, number: &str) -> bool;

    fn is_test_emergency_number(&self, _number: &str) -> bool {
        false
    }
}
