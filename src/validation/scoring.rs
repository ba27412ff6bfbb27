// Structural confidence scoring for field values. The score depends only
// on a value's shape, never on which engine produced it, so the same
// scorer serves both single-record validation metrics and the merge
// quality report.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{FieldKind, VaccineRecord};
use crate::processing::dates::MONTHS;

lazy_static! {
    static ref STRICT_SERIAL: Regex = Regex::new(r"^\d{5,7}[A-Z]{0,2}$").unwrap();
    static ref FRACTION_PREFIX: Regex = Regex::new(r"\b[A-Z0-9]{1,3} \d{1,3}/").unwrap();
    static ref PAREN_SUFFIX: Regex = Regex::new(r"\(([A-Z0-9]+)\)\s*$").unwrap();
}

/// Scores one field value on a 0-100 scale from field-specific structural
/// heuristics. Absent values score 0.
pub fn score_field(field: FieldKind, value: Option<&str>) -> u8 {
    let value = match value {
        Some(v) if !v.trim().is_empty() => v.trim(),
        _ => return 0,
    };

    match field {
        FieldKind::MfgDate | FieldKind::ExpDate => score_date(value),
        FieldKind::RegistrationNumber => score_registration(value),
        FieldKind::SerialNumber => score_serial(value),
        FieldKind::IdentityName | FieldKind::ProductName => {
            if value.len() >= 3 {
                100
            } else {
                50
            }
        }
        _ => 100,
    }
}

fn score_date(value: &str) -> u8 {
    let parts: Vec<&str> = value.split_whitespace().collect();
    if parts.len() != 3 {
        return 0;
    }
    let mut score = 0u8;
    if matches!(parts[0].parse::<u32>(), Ok(d) if (1..=31).contains(&d)) {
        score += 33;
    }
    let month = parts[1].to_uppercase();
    if MONTHS.iter().any(|&(abbrev, _)| abbrev == month) {
        score += 34;
    }
    if parts[2].len() == 4 && matches!(parts[2].parse::<u32>(), Ok(y) if (2000..=2030).contains(&y))
    {
        score += 33;
    }
    score
}

fn score_registration(value: &str) -> u8 {
    let mut score = 0u32;
    if let Some(pos) = value.find('/') {
        score += 40;
        let bytes = value.as_bytes();
        let digit_before = pos > 0 && bytes[pos - 1].is_ascii_digit();
        let digit_after = pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_digit();
        if digit_before && digit_after {
            score += 30;
        }
        if FRACTION_PREFIX.is_match(value) {
            score += 20;
        }
    }
    if let Some(caps) = PAREN_SUFFIX.captures(value) {
        if caps[1].chars().all(|c| c.is_ascii_alphabetic()) {
            score += 10;
        } else {
            score += 5;
        }
    }
    score.min(100) as u8
}

fn score_serial(value: &str) -> u8 {
    let upper = value.to_uppercase();
    if STRICT_SERIAL.is_match(&upper) {
        return 100;
    }
    let cleaned: String = upper.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let mut score = 0u8;
    if (5..=9).contains(&cleaned.len()) {
        score += 50;
    }
    let digit_prefix = cleaned.chars().take_while(|c| c.is_ascii_digit()).count();
    if (5..=7).contains(&digit_prefix) {
        score += 30;
    }
    let trailing_letters = cleaned
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    if trailing_letters <= 2 {
        score += 20;
    }
    score
}

/// Average score across the fixed field set, used for the merge quality
/// report.
pub fn average_score(record: &VaccineRecord) -> f64 {
    let total: u32 = FieldKind::ALL
        .iter()
        .map(|&field| score_field(field, record.get(field)) as u32)
        .sum();
    total as f64 / FieldKind::ALL.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_scoring() {
        assert_eq!(score_field(FieldKind::MfgDate, Some("22 Jan 2023")), 100);
        // Unrecognized month token loses only the month share.
        assert_eq!(score_field(FieldKind::MfgDate, Some("26 Exp 2005")), 66);
        // Year outside the plausible range.
        assert_eq!(score_field(FieldKind::ExpDate, Some("22 Jan 1999")), 67);
        assert_eq!(score_field(FieldKind::ExpDate, None), 0);
    }

    #[test]
    fn test_registration_scoring() {
        assert_eq!(
            score_field(FieldKind::RegistrationNumber, Some("1F 2/56 (B)")),
            100
        );
        assert_eq!(
            score_field(FieldKind::RegistrationNumber, Some("1F 2/56 (8)")),
            95
        );
        assert_eq!(score_field(FieldKind::RegistrationNumber, Some("2F 18/59")), 90);
        assert_eq!(score_field(FieldKind::RegistrationNumber, Some("SCR 643797")), 0);
    }

    #[test]
    fn test_serial_scoring() {
        assert_eq!(score_field(FieldKind::SerialNumber, Some("643797")), 100);
        assert_eq!(score_field(FieldKind::SerialNumber, Some("739176C")), 100);
        // Loose token: length and trailing-run credit only.
        assert_eq!(score_field(FieldKind::SerialNumber, Some("AB12CD")), 70);
    }

    #[test]
    fn test_name_scoring() {
        assert_eq!(score_field(FieldKind::IdentityName, Some("Rabies Vaccine")), 100);
        assert_eq!(score_field(FieldKind::ProductName, Some("X")), 50);
        assert_eq!(score_field(FieldKind::ProductName, None), 0);
        assert_eq!(score_field(FieldKind::Manufacturer, Some("Zoetis Inc.")), 100);
    }

    #[test]
    fn test_average_score() {
        let record = VaccineRecord {
            identity_name: Some("Rabies Vaccine".into()),
            mfg_date: Some("22 Jan 2023".into()),
            ..Default::default()
        };
        let avg = average_score(&record);
        assert!((avg - 200.0 / 7.0).abs() < 1e-9);
    }
}
