use thiserror::Error;

use crate::types::SmsFormat;

/// Errors returned by the public dispatcher handle.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatcher stopped")]
    EngineStopped,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Why a retry could not rebuild the wire unit for its new format.
#[derive(Debug, Error)]
pub enum RetryEncodeError {
    #[error("tracker is missing the fields needed to re-encode")]
    MissingFields,
    #[error("tracker has no destination address")]
    MissingDestination,
    #[error("no encoder registered for {0}")]
    NoEncoder(SmsFormat),
    #[error("encoder rejected message: {0}")]
    Encoder(#[from] CodecError),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Outcome of a domain-selection negotiation that did not produce a domain.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("domain selection terminated abnormally (cause {cause})")]
    Terminated { cause: i32 },
    #[error("domain selection unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EmergencyError {
    #[error("emergency session rejected with code {0}")]
    Rejected(i32),
    #[error("emergency state tracker unavailable")]
    Unavailable,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RadioError {
    #[error("radio not available")]
    NotAvailable,
    #[error("registration query failed: {0}")]
    Query(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
