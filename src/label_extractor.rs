// Extraction orchestrator: runs the field extractors over one engine's
// raw text pair and assembles a record. The label region carries the
// printed identity block, the data region the lot-specific values; a few
// fields fall back across regions when their home region fails.

use log::debug;

use crate::models::{FieldKind, RawOcrText, VaccineRecord};
use crate::processing::dates::{extract_exp_date, extract_mfg_date, repair_exp_date};
use crate::processing::extractors::{
    extract_identity_name, extract_manufacturer, extract_product_name,
    extract_registration_number,
};
use crate::processing::registration::fraction_of;
use crate::processing::serial::{extract_serial_number, is_strict_serial};

pub struct LabelExtractor;

/// A registration value this short or digits-only is a truncated misread;
/// the other region may hold the full one.
fn registration_is_dubious(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => {
            let compact: String = v.chars().filter(|c| !c.is_whitespace()).collect();
            compact.len() < 4 || compact.chars().all(|c| c.is_ascii_digit())
        }
    }
}

impl LabelExtractor {
    /// Extracts a structured record from one engine's raw text pair.
    pub fn extract(ocr: &RawOcrText) -> VaccineRecord {
        let label = ocr.label_text.as_str();
        let data = ocr.data_text.as_str();

        let identity_name = extract_identity_name(label);
        let mut product_name = extract_product_name(label);
        let manufacturer = extract_manufacturer(label);

        let mut registration_number = extract_registration_number(label);
        if registration_is_dubious(registration_number.as_deref()) {
            if let Some(from_data) = extract_registration_number(data) {
                registration_number = Some(from_data);
            }
        }
        let fraction = registration_number.as_deref().and_then(fraction_of);

        // The serial lives in the data region; a strict-shaped candidate
        // from the label region still beats a loose one from data.
        let mut serial_number = extract_serial_number(data, fraction.as_ref());
        if !matches!(serial_number.as_deref(), Some(s) if is_strict_serial(s)) {
            if let Some(from_label) = extract_serial_number(label, fraction.as_ref()) {
                if is_strict_serial(&from_label) || serial_number.is_none() {
                    serial_number = Some(from_label);
                }
            }
        }

        let mfg_date = extract_mfg_date(data).or_else(|| extract_mfg_date(label));
        let mut exp_date = extract_exp_date(data).or_else(|| extract_exp_date(label));

        if product_name.is_none() {
            product_name = infer_product(identity_name.as_deref(), label);
        }

        // Expiry repair runs last, once every other field is settled.
        if let Some(repaired) =
            repair_exp_date(mfg_date.as_deref(), exp_date.as_deref(), data, label)
        {
            debug!(
                "expiry repaired: {} -> {}",
                exp_date.as_deref().unwrap_or("absent"),
                repaired
            );
            exp_date = Some(repaired);
        }

        let mut record = VaccineRecord::default();
        record.set(FieldKind::IdentityName, identity_name);
        record.set(FieldKind::ProductName, product_name);
        record.set(FieldKind::Manufacturer, manufacturer);
        record.set(FieldKind::RegistrationNumber, registration_number);
        record.set(FieldKind::SerialNumber, serial_number);
        record.set(FieldKind::MfgDate, mfg_date);
        record.set(FieldKind::ExpDate, exp_date);

        for field in FieldKind::ALL {
            debug!(
                "{}: {}",
                field.label(),
                record.get(field).unwrap_or("not found")
            );
        }
        record
    }
}

/// Infers the product line from the identity name or label text when no
/// brand token survived OCR.
fn infer_product(identity: Option<&str>, label_text: &str) -> Option<String> {
    let haystack = format!(
        "{} {}",
        identity.unwrap_or_default().to_uppercase(),
        label_text.to_uppercase()
    );
    if haystack.contains("FELINE") || haystack.contains("FELOCELL") {
        return Some("FELOCELL".to_string());
    }
    if haystack.contains("RABIES") || haystack.contains("DEFENSOR") {
        return Some("DEFENSOR".to_string());
    }
    None
}
