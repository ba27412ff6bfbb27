// Serial-number extraction.
//
// The strict domain shape (5-7 digits, up to 2 trailing letters) is
// preferred: it is searched first in a bounded window after a SER/SERIAL
// label, then anywhere in the text. A looser alphanumeric token is only a
// last resort. A candidate whose digits reproduce an already-detected
// registration fraction is rejected, so a registration suffix is never
// mistaken for a serial number.

use lazy_static::lazy_static;
use regex::Regex;

use super::normalize::normalize_ocr_text;

lazy_static! {
    static ref SERIAL_LABEL: Regex = Regex::new(r"\b(?:SER|SERIAL)\b").unwrap();
    static ref STRICT_SHAPE: Regex = Regex::new(r"\b(\d{5,7}[A-Z]{0,2})\b").unwrap();
    static ref STRICT_SHAPE_EXACT: Regex = Regex::new(r"^\d{5,7}[A-Z]{0,2}$").unwrap();
    static ref LABELED_TOKEN: Regex =
        Regex::new(r"(?:SER|SERIAL)\s*[:\-]?\s*([A-Z0-9]{4,12})").unwrap();
    static ref LOOSE_TOKEN: Regex = Regex::new(r"\b([A-Z0-9]{4,12})\b").unwrap();
}

/// Width of the window searched after a SER/SERIAL label.
const LABEL_WINDOW: usize = 40;

/// Whether a value already matches the strict serial shape.
pub fn is_strict_serial(value: &str) -> bool {
    STRICT_SHAPE_EXACT.is_match(&value.to_uppercase())
}

/// Quick shape heuristics for serial-like strings: strip non-alphanumerics,
/// then fix likely letter misreads towards digits when digits dominate, or
/// the reverse when letters dominate.
pub fn normalize_serial(raw: &str) -> String {
    let s: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if s.is_empty() {
        return raw.to_string();
    }

    let digits = s.chars().filter(|c| c.is_ascii_digit()).count();
    let letters = s.chars().filter(|c| c.is_ascii_alphabetic()).count();

    if digits >= letters || (digits > 0 && letters > 0) {
        s.replace('S', "5")
            .replace('O', "0")
            .replace('I', "1")
            .replace('L', "1")
    } else {
        s.replace('0', "O")
    }
}

fn digits_of(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// A candidate is a misread registration suffix if its digits are exactly
/// the two fraction halves concatenated.
fn conflicts_with_fraction(candidate: &str, fraction: Option<&(String, String)>) -> bool {
    match fraction {
        Some((n1, n2)) => digits_of(candidate) == format!("{}{}", n1, n2),
        None => false,
    }
}

fn label_window(text: &str) -> Option<&str> {
    let m = SERIAL_LABEL.find(text)?;
    let end = (m.end() + LABEL_WINDOW).min(text.len());
    Some(&text[m.end()..end])
}

/// Extracts a serial number from one region's raw text. `registration_fraction`
/// is the fraction of an already-detected registration number, if any.
pub fn extract_serial_number(
    text: &str,
    registration_fraction: Option<&(String, String)>,
) -> Option<String> {
    let t = normalize_ocr_text(text);
    if t.is_empty() {
        return None;
    }

    // Strict shape near the label, then strict shape anywhere.
    if let Some(window) = label_window(&t) {
        for m in STRICT_SHAPE.find_iter(window) {
            if !conflicts_with_fraction(m.as_str(), registration_fraction) {
                return Some(normalize_serial(m.as_str()));
            }
        }
    }
    for m in STRICT_SHAPE.find_iter(&t) {
        if !conflicts_with_fraction(m.as_str(), registration_fraction) {
            return Some(normalize_serial(m.as_str()));
        }
    }

    // Looser fallback: labelled alphanumeric token, then any token.
    if let Some(caps) = LABELED_TOKEN.captures(&t) {
        let raw = caps.get(1).unwrap().as_str();
        if !conflicts_with_fraction(raw, registration_fraction) {
            return Some(normalize_serial(raw));
        }
    }
    for caps in LOOSE_TOKEN.captures_iter(&t) {
        let raw = caps.get(1).unwrap().as_str();
        if !conflicts_with_fraction(raw, registration_fraction) {
            return Some(normalize_serial(raw));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_shape_near_label() {
        assert_eq!(
            extract_serial_number("SER 643797 MFG: 22 JAN 23", None).as_deref(),
            Some("643797")
        );
        assert_eq!(
            extract_serial_number("Ser 739176C\nMFG 26", None).as_deref(),
            Some("739176C")
        );
    }

    #[test]
    fn test_strict_shape_anywhere() {
        assert_eq!(
            extract_serial_number("LOT DATA 345678 OTHER", None).as_deref(),
            Some("345678")
        );
    }

    #[test]
    fn test_misread_letters_normalized() {
        // S and O misreads inside a digit-dominated token.
        assert_eq!(
            extract_serial_number("SER 6437S7", None).as_deref(),
            Some("643757")
        );
    }

    #[test]
    fn test_registration_fraction_guard() {
        let fraction = ("18".to_string(), "159".to_string());
        // 18159 is the fraction halves concatenated, so it must be skipped.
        assert_eq!(
            extract_serial_number("SER 18159 LOT 643797", Some(&fraction)).as_deref(),
            Some("643797")
        );
        assert_eq!(extract_serial_number("SER 18159", Some(&fraction)), None);
    }

    #[test]
    fn test_loose_fallback_only_without_strict_candidate() {
        assert_eq!(
            extract_serial_number("SERIAL AB12CD", None).as_deref(),
            Some("AB12CD")
        );
    }

    #[test]
    fn test_is_strict_serial() {
        assert!(is_strict_serial("643797"));
        assert!(is_strict_serial("739176C"));
        assert!(is_strict_serial("1234567AB"));
        assert!(!is_strict_serial("1234"));
        assert!(!is_strict_serial("643797ABC"));
        assert!(!is_strict_serial("AB12CD"));
    }
}
