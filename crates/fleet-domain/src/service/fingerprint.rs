//! Natural de-duplication key for violations

use sha2::{Digest, Sha256};

use fleet_types::ViolationEvent;

/// SHA-256 over (driver, type, severity, source reading timestamp, subject).
///
/// Redelivery of the same event, or re-evaluation of the same reading, yields
/// the same fingerprint even though the violation id differs.
pub fn fingerprint(event: &ViolationEvent) -> String {
    let subject = event
        .subject
        .map(|m| m.key())
        .unwrap_or_else(|| "-".to_string());
    let reading_millis = event.original_data.timestamp.timestamp_millis().to_string();
    let mut hasher = Sha256::new();
    for part in [
        event.driver_id.as_str(),
        event.violation_type.code(),
        event.severity.code(),
        reading_millis.as_str(),
        subject.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}
