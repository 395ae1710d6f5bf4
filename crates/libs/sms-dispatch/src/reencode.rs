//! Rebuilds a tracker's wire unit when a retry changes the outbound format.

use crate::codec::{CodecRegistry, SubmitFields};
use crate::error::RetryEncodeError;
use crate::tracker::OutboundTracker;
use crate::types::SmsFormat;

/// Re-encodes `tracker` for `new_format` from its recorded fields.
///
/// Same format is a passthrough. On error the tracker is left untouched.
pub fn reencode_for_retry(
    tracker: &mut OutboundTracker,
    new_format: SmsFormat,
    codecs: &CodecRegistry,
) -> Result<(), RetryEncodeError> {
    let old_format = tracker.format();
    log::debug!("sms: retry format {} ==> {}", old_format, new_format);
    if old_format == new_format {
        return Ok(());
    }

    let fields = tracker.fields().ok_or(RetryEncodeError::MissingFields)?;
    let payload = fields.payload.as_ref().ok_or(RetryEncodeError::MissingFields)?;
    let destination = fields
        .destination
        .as_deref()
        .filter(|destination| !destination.is_empty())
        .ok_or(RetryEncodeError::MissingDestination)?;
    let codec = codecs.get(new_format).ok_or(RetryEncodeError::NoEncoder(new_format))?;

    let wire = codec.encode_submit(&SubmitFields {
        service_center: fields.service_center.as_deref(),
        destination,
        payload,
        status_report_requested: tracker.expects_status_report(),
        message_ref: tracker.message_ref(),
    })?;
    tracker.replace_encoding(new_format, wire);
    Ok(())
}
