use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-native message reference (TP-MR for 3GPP, message id for 3GPP2).
pub type MessageRef = u16;

/// Wire encoding of an SMS PDU. Each format has its own reference space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmsFormat {
    #[serde(rename = "3gpp")]
    ThreeGpp,
    #[serde(rename = "3gpp2")]
    ThreeGpp2,
}

impl SmsFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreeGpp => "3gpp",
            Self::ThreeGpp2 => "3gpp2",
        }
    }

    pub fn is_3gpp2(&self) -> bool {
        matches!(self, Self::ThreeGpp2)
    }
}

impl fmt::Display for SmsFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network domain carrying a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Selection failed or produced no answer; resolved by the fallback policy.
    Unknown,
    CircuitSwitched,
    PacketSwitched,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "UNKNOWN",
            Self::CircuitSwitched => "CS",
            Self::PacketSwitched => "PS",
        })
    }
}

/// Identity of the transport dispatcher a message is handed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// Packet-switched (SMS over IMS).
    Ims,
    /// Circuit-switched, 3GPP encoding.
    Gsm,
    /// Circuit-switched, 3GPP2 encoding.
    Cdma,
}

impl Route {
    pub fn domain(&self) -> Domain {
        match self {
            Self::Ims => Domain::PacketSwitched,
            Self::Gsm | Self::Cdma => Domain::CircuitSwitched,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ims => "ims",
            Self::Gsm => "gsm",
            Self::Cdma => "cdma",
        })
    }
}

/// Result code delivered once to a caller's sent handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendResult {
    Success,
    GenericFailure,
    RadioUnavailable,
    NoService,
    RetryFailed,
}

/// Registration state reported by the radio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ServiceState {
    InService,
    #[default]
    OutOfService,
    EmergencyOnly,
    PowerOff,
}

impl ServiceState {
    pub fn is_in_service(&self) -> bool {
        matches!(self, Self::InService)
    }
}

/// Packet-domain SMS registration as answered by the radio registration query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacketRegistration {
    pub registered: bool,
    pub format: Option<SmsFormat>,
}

/// Delivery outcome written to the message store on a terminal status report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryStatus {
    Complete,
    Failed,
}
