use lazy_static::lazy_static;
use regex::Regex;

use crate::scan_types::{ScanError, SlotStatus};

lazy_static! {
    static ref AVAILABLE_RE: Regex = Regex::new(r#""available"\s*:\s*true"#).unwrap();
    static ref EMPTY_RE: Regex = Regex::new(r#""title"\s*:\s*null"#).unwrap();
}

/// Classify a deliveries response body.
///
/// The body must be JSON, but only its text is inspected: any
/// `"available": true` means a slot is open, otherwise any `"title": null`
/// means the listing is empty, otherwise there is no slot. Whitespace around
/// the colon is ignored so compact and pretty-printed bodies match alike.
pub fn classify_response(body: &str) -> Result<SlotStatus, ScanError> {
    serde_json::from_str::<serde_json::Value>(body)
        .map_err(|e| ScanError::Parse(e.to_string()))?;

    Ok(classify_text(body))
}

fn classify_text(body: &str) -> SlotStatus {
    if AVAILABLE_RE.is_match(body) {
        SlotStatus::Available
    } else if EMPTY_RE.is_match(body) {
        SlotStatus::Empty
    } else {
        SlotStatus::NoSlot
    }
}
