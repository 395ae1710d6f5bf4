use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Default time a partial multipart message may wait for its missing segments
/// while the device is in service: 24 hours.
pub const PARTIAL_SEGMENT_WAIT_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Log tag, e.g. the phone slot name.
    pub name: String,
    /// Feature flag; selection is used only if the service also supports it.
    pub domain_selection_enabled: bool,
    /// When false, 3GPP2 is never chosen as an outbound format.
    pub format_b_enabled: bool,
    pub slot_index: u32,
    pub subscription_id: i32,
    pub partial_segment_wait_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            name: "sms".to_string(),
            domain_selection_enabled: true,
            format_b_enabled: true,
            slot_index: 0,
            subscription_id: -1,
            partial_segment_wait_secs: PARTIAL_SEGMENT_WAIT_SECS,
        }
    }
}

impl DispatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn partial_segment_wait(&self) -> Duration {
        Duration::from_secs(self.partial_segment_wait_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.partial_segment_wait_secs == 0 {
            return Err(ConfigError::Invalid(
                "partial_segment_wait_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
