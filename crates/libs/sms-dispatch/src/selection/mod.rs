//! Domain selection coordination.
//!
//! One [`SelectionHolder`] per scenario keeps the requests waiting on a
//! negotiation. The first request on an idle holder opens a connection and
//! starts the negotiation; later ones ride along until the answer drains the
//! whole queue.

mod holder;

use std::fmt;
use std::sync::Arc;

use crate::error::SelectionError;
use crate::request::PendingRequest;
use crate::traits::{DomainSelectionService, SelectionAttributes, SelectionConnection};
use crate::types::Domain;

use holder::{ActiveSession, SelectionHolder};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    Normal,
    Emergency,
}

impl Scenario {
    pub fn from_emergency(emergency: bool) -> Self {
        if emergency {
            Self::Emergency
        } else {
            Self::Normal
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self, Self::Emergency)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Emergency => "emergency",
        })
    }
}

/// A negotiation the caller must run and report back through
/// [`DomainSelectionCoordinator::complete`].
pub struct Negotiation {
    pub scenario: Scenario,
    pub session_id: u64,
    pub connection: Arc<dyn SelectionConnection>,
    pub attributes: SelectionAttributes,
}

impl Negotiation {
    pub async fn run(self) -> Result<Domain, SelectionError> {
        self.connection.select_domain(self.attributes).await
    }
}

impl fmt::Debug for Negotiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Negotiation")
            .field("scenario", &self.scenario)
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Requests released from a holder, in submission order.
#[derive(Debug)]
pub struct Drain {
    pub scenario: Scenario,
    pub selected: Domain,
    pub requests: Vec<PendingRequest>,
}

impl Drain {
    /// Resolves `Domain::Unknown`: packet-switched when the packet transport
    /// is available, otherwise circuit-switched. Returns whether the
    /// fallback applied.
    pub fn resolved_domain(&self, packet_available: bool) -> (Domain, bool) {
        match self.selected {
            Domain::Unknown if packet_available => (Domain::PacketSwitched, true),
            Domain::Unknown => (Domain::CircuitSwitched, true),
            domain => (domain, false),
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// A negotiation is already running for this scenario.
    Queued,
    /// A new negotiation was opened and must be started.
    Negotiate(Negotiation),
    /// No connection could be acquired; drain with the fallback domain.
    Unavailable(Drain),
}

pub struct DomainSelectionCoordinator {
    service: Arc<dyn DomainSelectionService>,
    slot_index: u32,
    subscription_id: i32,
    normal: SelectionHolder,
    emergency: SelectionHolder,
    next_session: u64,
}

impl DomainSelectionCoordinator {
    pub fn new(
        service: Arc<dyn DomainSelectionService>,
        slot_index: u32,
        subscription_id: i32,
    ) -> Self {
        Self {
            service,
            slot_index,
            subscription_id,
            normal: SelectionHolder::new(Scenario::Normal),
            emergency: SelectionHolder::new(Scenario::Emergency),
            next_session: 0,
        }
    }

    fn holder_mut(&mut self, scenario: Scenario) -> &mut SelectionHolder {
        match scenario {
            Scenario::Normal => &mut self.normal,
            Scenario::Emergency => &mut self.emergency,
        }
    }

    pub fn queued(&self, scenario: Scenario) -> usize {
        match scenario {
            Scenario::Normal => self.normal.queued(),
            Scenario::Emergency => self.emergency.queued(),
        }
    }

    pub fn is_negotiating(&self, scenario: Scenario) -> bool {
        match scenario {
            Scenario::Normal => self.normal.is_negotiating(),
            Scenario::Emergency => self.emergency.is_negotiating(),
        }
    }

    /// Queues `request` on the scenario's holder and opens a negotiation when
    /// the holder is idle.
    pub fn submit(&mut self, scenario: Scenario, request: PendingRequest) -> SubmitOutcome {
        let attributes = SelectionAttributes {
            slot_index: self.slot_index,
            subscription_id: self.subscription_id,
            emergency: scenario.is_emergency(),
        };
        let session_id = self.next_session;
        let service = self.service.clone();

        let holder = self.holder_mut(scenario);
        holder.push(request);
        if holder.is_negotiating() {
            log::debug!("sms: {} selection in progress, {} queued", scenario, holder.queued());
            return SubmitOutcome::Queued;
        }

        let Some(connection) = service.connect(scenario.is_emergency()) else {
            log::warn!("sms: no {} selection connection, falling back", scenario);
            return SubmitOutcome::Unavailable(Drain {
                scenario,
                selected: Domain::Unknown,
                requests: holder.take_queue(),
            });
        };

        holder.start(ActiveSession { id: session_id, connection: connection.clone() });
        self.next_session = self.next_session.wrapping_add(1);
        SubmitOutcome::Negotiate(Negotiation { scenario, session_id, connection, attributes })
    }

    /// Ends the negotiation `session_id` and releases its queue. Results for a
    /// session that is no longer active are ignored.
    pub fn complete(
        &mut self,
        scenario: Scenario,
        session_id: u64,
        result: Result<Domain, SelectionError>,
    ) -> Option<Drain> {
        let holder = self.holder_mut(scenario);
        if holder.session_id() != Some(session_id) {
            log::debug!(
                "sms: ignoring stale {} selection result (session {})",
                scenario,
                session_id
            );
            return None;
        }

        let selected = match result {
            Ok(domain) => domain,
            Err(err) => {
                log::warn!("sms: {} selection failed: {}", scenario, err);
                Domain::Unknown
            }
        };
        holder.finish();
        Some(Drain { scenario: holder.scenario(), selected, requests: holder.take_queue() })
    }

    /// Releases both sessions and returns every queued request.
    pub fn teardown(&mut self) -> Vec<PendingRequest> {
        let mut requests = Vec::new();
        for holder in [&mut self.normal, &mut self.emergency] {
            holder.finish();
            requests.extend(holder.take_queue());
        }
        requests
    }
}
