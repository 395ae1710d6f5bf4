use std::time::Duration;

use crate::timer::TimerAction;

use super::{Dispatcher, Event};

impl Dispatcher {
    /// Starts a fresh availability window from the current service state.
    pub(super) fn reset_timer(&mut self) {
        let now = self.clock.now_millis();
        let action = self.window.reset(now, self.service_state.is_in_service());
        self.apply_timer(action);
    }

    /// Credits in-service time after a service-state or reassembly change.
    pub(super) fn reevaluate_timer(&mut self) {
        let now = self.clock.now_millis();
        let action = self.window.on_transition(now, self.service_state.is_in_service());
        self.apply_timer(action);
    }

    pub(super) fn on_segment_timer(&mut self, generation: u64, window_start: u64) {
        if generation != self.timer_generation {
            log::trace!("sms({}): stale segment timer {}", self.config.name, generation);
            return;
        }
        self.segment_timer = None;
        self.reap(window_start);
    }

    pub(super) fn cancel_segment_timer(&mut self) {
        if let Some(timer) = self.segment_timer.take() {
            timer.abort();
        }
    }

    fn apply_timer(&mut self, action: TimerAction) {
        self.cancel_segment_timer();
        match action {
            TimerAction::Idle => {}
            TimerAction::Schedule { delay_ms, window_start } => {
                self.schedule_segment_timer(delay_ms, window_start)
            }
            TimerAction::Reap { older_than } => self.reap(older_than),
        }
    }

    fn schedule_segment_timer(&mut self, delay_ms: u64, window_start: u64) {
        self.timer_generation = self.timer_generation.wrapping_add(1);
        let generation = self.timer_generation;
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        log::trace!("sms({}): segment timer in {}ms", self.config.name, delay_ms);

        self.segment_timer = Some(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {},
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
                    let _ = events.send(Event::SegmentTimerExpired { generation, window_start });
                },
            }
        }));
    }

    /// Reclaims partial segments older than `older_than` and starts a new
    /// window, unless an inbound handler is still waiting for segments.
    fn reap(&mut self, older_than: u64) {
        if self.reassembly.iter().any(|handler| handler.is_waiting_for_segments()) {
            log::debug!(
                "sms({}): inbound reassembly waiting, deferring segment reap",
                self.config.name
            );
            return;
        }

        log::info!(
            "sms({}): reclaiming partial segments older than {}",
            self.config.name,
            older_than
        );
        self.reaper.reclaim_stale_segments(older_than);
        self.reset_timer();
    }
}
