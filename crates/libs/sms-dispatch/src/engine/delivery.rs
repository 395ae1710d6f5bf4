use crate::correlation::{Correlated, ReportClass};
use crate::handles::DeliveryReport;
use crate::tracker::OutboundTracker;
use crate::traits::PartOutcome;
use crate::types::{Route, SendResult, SmsFormat};

use super::Dispatcher;

impl Dispatcher {
    pub(super) fn on_part_completed(
        &mut self,
        route: Route,
        mut tracker: OutboundTracker,
        outcome: PartOutcome,
    ) {
        log::trace!(
            "sms({}): part of request {} over {}: {:?}",
            self.config.name,
            tracker.unique_id(),
            route,
            outcome
        );
        match outcome {
            PartOutcome::Sent => {
                let is_last_part = tracker.record_part(true);
                let success = !tracker.any_part_failed();
                self.notify_sent(&tracker, route.domain(), is_last_part, success);
                tracker.complete(SendResult::Success);
                if tracker.expects_status_report() {
                    self.correlation.register(tracker);
                }
            }
            PartOutcome::Failed(result) => {
                let is_last_part = tracker.record_part(false);
                self.notify_sent(&tracker, route.domain(), is_last_part, false);
                tracker.complete(result);
            }
            PartOutcome::Retry => self.on_retry(tracker),
        }
    }

    pub(super) fn on_status_report(&mut self, format: SmsFormat, pdu: Vec<u8>) {
        let Some(codec) = self.codecs.get(format) else {
            log::warn!("sms({}): no decoder for {} status report", self.config.name, format);
            return;
        };
        let report = match codec.decode_status_report(&pdu) {
            Ok(report) => report,
            Err(err) => {
                log::error!(
                    "sms({}): dropping undecodable {} status report {}: {}",
                    self.config.name,
                    format,
                    hex::encode(&pdu),
                    err
                );
                return;
            }
        };

        let class = ReportClass::classify(format, report.status);
        let Some(found) = self.correlation.on_status_report(format, report.message_ref, class)
        else {
            log::warn!(
                "sms({}): no tracker for {} status report ref={} status={:#x}",
                self.config.name,
                format,
                report.message_ref,
                report.status
            );
            return;
        };

        let tracker = found.tracker();
        log::debug!(
            "sms({}): {} status report for message {} ref={} class={:?}",
            self.config.name,
            format,
            tracker.message_id(),
            report.message_ref,
            class
        );
        if !tracker.notify_delivery(DeliveryReport { format, pdu }) {
            log::debug!("sms({}): delivery receiver gone", self.config.name);
        }

        if let (Correlated::Final(tracker), Some(status)) = (&found, class.stored_status()) {
            if let Some(uri) = tracker.message_uri() {
                if let Err(err) = self.store.update_status(uri, status) {
                    log::error!(
                        "sms({}): failed to store status {:?} for {}: {}",
                        self.config.name,
                        status,
                        uri,
                        err
                    );
                }
            }
        }
    }
}
