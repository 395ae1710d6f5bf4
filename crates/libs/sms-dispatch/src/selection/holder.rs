use std::collections::VecDeque;
use std::sync::Arc;

use crate::request::PendingRequest;
use crate::traits::SelectionConnection;

use super::Scenario;

pub(crate) struct ActiveSession {
    pub(crate) id: u64,
    pub(crate) connection: Arc<dyn SelectionConnection>,
}

/// Queue plus at most one in-flight negotiation for one scenario.
pub(crate) struct SelectionHolder {
    scenario: Scenario,
    queue: VecDeque<PendingRequest>,
    session: Option<ActiveSession>,
}

impl SelectionHolder {
    pub(crate) fn new(scenario: Scenario) -> Self {
        Self { scenario, queue: VecDeque::new(), session: None }
    }

    pub(crate) fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub(crate) fn push(&mut self, request: PendingRequest) {
        self.queue.push_back(request);
    }

    pub(crate) fn is_negotiating(&self) -> bool {
        self.session.is_some()
    }

    pub(crate) fn session_id(&self) -> Option<u64> {
        self.session.as_ref().map(|session| session.id)
    }

    pub(crate) fn start(&mut self, session: ActiveSession) {
        self.session = Some(session);
    }

    /// Releases the session, if any. The connection is finished exactly once.
    pub(crate) fn finish(&mut self) {
        if let Some(session) = self.session.take() {
            session.connection.finish_selection();
        }
    }

    /// Empties the queue in FIFO order.
    pub(crate) fn take_queue(&mut self) -> Vec<PendingRequest> {
        self.queue.drain(..).collect()
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }
}
