use std::time::Duration;

/// What the engine must do after the window changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerAction {
    /// Cancel any pending expiry; nothing to schedule while out of service.
    Idle,
    /// (Re)arm the expiry timer.
    Schedule { delay_ms: u64, window_start: u64 },
    /// Reclaim partial segments received before `older_than`, then reset.
    Reap { older_than: u64 },
}

/// Cumulative in-service time since the current window opened.
///
/// Time only counts while the device is in service, so partial segments are
/// reclaimed after the device has had a full threshold of service in which
/// the missing parts could have arrived.
#[derive(Debug, Clone)]
pub struct ServiceAvailabilityWindow {
    threshold_ms: u64,
    last_in_service: Option<u64>,
    elapsed_ms: u64,
    window_start: Option<u64>,
}

impl ServiceAvailabilityWindow {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold_ms: u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX),
            last_in_service: None,
            elapsed_ms: 0,
            window_start: None,
        }
    }

    /// Credits in-service time up to `now` and re-evaluates the window.
    pub fn on_transition(&mut self, now: u64, in_service: bool) -> TimerAction {
        if let Some(last) = self.last_in_service.take() {
            self.elapsed_ms = self.elapsed_ms.saturating_add(now.saturating_sub(last));
        }
        // Already credited up to `now`; keep crediting only while in service.
        self.last_in_service = in_service.then_some(now);

        if self.elapsed_ms >= self.threshold_ms {
            if let Some(start) = self.window_start {
                return TimerAction::Reap { older_than: start };
            }
        }

        if !in_service {
            return TimerAction::Idle;
        }
        let start = *self.window_start.get_or_insert(now);
        TimerAction::Schedule {
            delay_ms: self.threshold_ms.saturating_sub(self.elapsed_ms),
            window_start: start,
        }
    }

    /// Starts a fresh window: open at `now` when in service, empty otherwise.
    pub fn reset(&mut self, now: u64, in_service: bool) -> TimerAction {
        self.elapsed_ms = 0;
        if in_service {
            self.window_start = Some(now);
            self.last_in_service = Some(now);
            TimerAction::Schedule { delay_ms: self.threshold_ms, window_start: now }
        } else {
            self.window_start = None;
            self.last_in_service = None;
            TimerAction::Idle
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn window_start(&self) -> Option<u64> {
        self.window_start
    }
}
