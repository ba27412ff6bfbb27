use crate::models::{FieldKind, ValidationResult, VaccineRecord};

fn present(record: &VaccineRecord, field: FieldKind) -> bool {
    record.get(field).map_or(false, |v| !v.trim().is_empty())
}

/// Derives the completeness flags for a record. A record is complete when
/// an identity (or product) name, a serial number and both dates are
/// present; the manufacturer is informative but not required.
pub fn validate(record: &VaccineRecord) -> ValidationResult {
    let has_identity =
        present(record, FieldKind::IdentityName) || present(record, FieldKind::ProductName);
    let has_serial = present(record, FieldKind::SerialNumber);
    let has_dates = present(record, FieldKind::MfgDate) && present(record, FieldKind::ExpDate);
    let has_manufacturer = present(record, FieldKind::Manufacturer);

    ValidationResult {
        has_identity,
        has_serial,
        has_dates,
        has_manufacturer,
        is_complete: has_identity && has_serial && has_dates,
    }
}
