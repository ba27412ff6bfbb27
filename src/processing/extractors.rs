// Label-region field extractors: identity name, product/brand name,
// manufacturer and registration number. Each is an ordered chain of
// pattern rules tried in decreasing confidence order; the first rule that
// matches wins. Extractors never fail: an unmatched field is absent.

use lazy_static::lazy_static;
use regex::Regex;

use super::normalize::{clean_text, normalize_ocr_text};
use super::registration::canonicalize;

/// Disease/antigen vocabulary scanned for the identity name, in fixed
/// order: tolerated keyword variants on the left, the canonical component
/// on the right.
const IDENTITY_COMPONENTS: &[(&[&str], &str)] = &[
    (&["RABIES VACCINE", "RABIES"], "Rabies Vaccine"),
    (
        &["FELINE RHINOTRACHEITIS", "RHINOTRACHEITIS"],
        "Feline Rhinotracheitis",
    ),
    (
        &["CALICI", "PANLEUKOPENIA", "PANLCUKOPENIA"],
        "Calici-Panleukopenia",
    ),
    (&["CHLAMYDIA", "PSITTACI", "PSITTACH"], "Chlamydia psittaci"),
];

/// Brand-token misspellings rewritten to canonical form inside a matched
/// product string.
const BRAND_FIXES: &[(&str, &str)] = &[
    ("DEFERUSOR", "DEFENSOR"),
    ("DEFERUSO", "DEFENSOR"),
    ("CEFENSOR", "DEFENSOR"),
    ("FEUOKCELL", "FELOCELL"),
    ("FEUOCELL", "FELOCELL"),
    ("FEU O K", "FELOCELL"),
];

/// Manufacturer keyword to canonical display name.
const MANUFACTURERS: &[(&str, &str)] = &[
    ("ZOETIS", "Zoetis Inc."),
    ("BOEHRINGER", "Boehringer Ingelheim"),
    ("INTERVET", "Intervet"),
    ("MERIAL", "Merial"),
];

lazy_static! {
    static ref BRAND_FALLBACK: Regex =
        Regex::new(r"(NOBIVAC|DEFENSOR|FELOCELL|FEUOCELL|FEUOKCELL|CEFENSOR)\s*\d*").unwrap();
    static ref PRODUCT_PATTERN: Regex = Regex::new(
        r"(DEFENSOR|DEFERUSOR|DEFERUSO|CEFENSOR|NOBIVAC|FELOCELL|FEUOCELL|FEUOKCELL|FEU O K|RABISIN)\s*[TM]*\s*\d*"
    )
    .unwrap();
    static ref INC_PATTERN: Regex =
        Regex::new(r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+Inc\.?").unwrap();
    static ref REG_LABELED: Regex = Regex::new(
        r"REG(?:ISTER|ISTRATION)?\s*(?:NO\.?:?)?\s*[:\-]?\s*([A-Z0-9 /()\-]{2,30})"
    )
    .unwrap();
    static ref REG_TOKEN: Regex = Regex::new(r"REG(?:ISTER|ISTRATION)?\s*(?:NO\.?:?)?").unwrap();
    static ref REG_WINDOW_VALUE: Regex =
        Regex::new(r"([A-Z0-9]{1,3})[\s/\-]?(\d{1,6}(?:/\d{1,4})?)(\s*\([A-Z0-9 ]+\))?").unwrap();
    static ref FRACTION_ANYWHERE: Regex = Regex::new(r"([0-9]{1,3}/[0-9]{1,3})").unwrap();
    static ref PREFIX_DIGITS_ANYWHERE: Regex =
        Regex::new(r"\b([A-Z]{1,4})\s*(\d{2,6})(\s*\([A-Z0-9 ]+\))?").unwrap();
    static ref FOLLOWING_LABELS: Regex =
        Regex::new(r"\b(?:SERIAL|SER|S/N|MFG|EXP|MANU|MANUFACT|DATE)\b").unwrap();
    static ref TRAILING_SERIAL_NOISE: Regex = Regex::new(r"\b(?:SER|SET|S/N|SERIAL)\b\s*$").unwrap();
    static ref PAREN_TRAILING: Regex = Regex::new(r"\(([A-Z0-9 ]+)\)").unwrap();
}

/// Serial-label tokens that must never be treated as a registration prefix.
const SERIAL_LIKE_PREFIXES: &[&str] = &["SCR", "SER", "SN", "S/N", "SERIAL"];

/// Width of the window searched after an explicit REG label.
const REG_WINDOW: usize = 80;

/// Extracts the identity (disease/antigen) name by vocabulary membership,
/// concatenating every matched component in scan order. Falls back to a
/// brand keyword when no vocabulary term matches.
pub fn extract_identity_name(text: &str) -> Option<String> {
    let t = normalize_ocr_text(text);
    if t.is_empty() {
        return None;
    }

    let mut components = Vec::new();
    for &(keywords, canonical) in IDENTITY_COMPONENTS {
        if keywords.iter().any(|k| t.contains(k)) {
            components.push(canonical);
        }
    }
    if !components.is_empty() {
        return Some(components.join("; "));
    }

    BRAND_FALLBACK
        .find(&t)
        .map(|m| apply_brand_fixes(m.as_str().trim()))
}

fn apply_brand_fixes(matched: &str) -> String {
    let mut out = matched.to_string();
    for &(from, to) in BRAND_FIXES {
        out = out.replace(from, to);
    }
    out
}

/// Extracts the product/brand name from a fixed brand alternation that
/// tolerates known misspellings; misspelled tokens are rewritten to
/// canonical form in the returned value.
pub fn extract_product_name(text: &str) -> Option<String> {
    let t = normalize_ocr_text(text);
    PRODUCT_PATTERN
        .find(&t)
        .map(|m| apply_brand_fixes(m.as_str().trim()))
}

/// Extracts the manufacturer via a keyword lookup table, falling back to a
/// generic `Capitalized Words Inc.` pattern on the raw mixed-case text.
pub fn extract_manufacturer(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    for &(keyword, canonical) in MANUFACTURERS {
        if upper.contains(keyword) {
            return Some(canonical.to_string());
        }
    }

    INC_PATTERN.find(text).map(|m| m.as_str().to_string())
}

fn strip_label_noise(value: &str) -> String {
    let truncated = match FOLLOWING_LABELS.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    };
    TRAILING_SERIAL_NOISE
        .replace(truncated, "")
        .trim()
        .to_string()
}

/// Extracts a registration number via a multi-stage search. Every stage
/// terminates in the canonicalizer: a stage that matches but cannot be
/// canonicalized yields absent, never the raw value.
pub fn extract_registration_number(text: &str) -> Option<String> {
    let t = normalize_ocr_text(text);
    if t.is_empty() {
        return None;
    }

    // Stage 1: explicit REG/REG NO label with a bounded trailing capture.
    if let Some(caps) = REG_LABELED.captures(&t) {
        let val = strip_label_noise(&clean_text(&caps[1]));
        return canonicalize(&val);
    }

    // Stage 1b: a bare REG token whose trailing window holds a prefix and
    // digit run the labelled capture could not isolate.
    if let Some(label) = REG_TOKEN.find(&t) {
        let window = &t[label.end()..(label.end() + REG_WINDOW).min(t.len())];
        if let Some(caps) = REG_WINDOW_VALUE.captures(window) {
            let mut val = format!("{} {}", &caps[1], &caps[2]);
            if let Some(paren) = caps.get(3) {
                val.push_str(paren.as_str());
            }
            return canonicalize(&strip_label_noise(&clean_text(&val)));
        }
        return None;
    }

    // Stage 2: a slash-delimited fraction anywhere; the token immediately
    // preceding it becomes the prefix.
    if let Some(m) = FRACTION_ANYWHERE.find(&t) {
        let before = t[..m.start()].trim_end();
        let prefix: String = before
            .rsplit(' ')
            .next()
            .unwrap_or("")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let after = t[m.end()..].trim_start();
        let paren = if after.starts_with('(') {
            PAREN_TRAILING.captures(after).map(|c| format!(" ({})", &c[1]))
        } else {
            None
        };
        let val = format!("{} {}{}", prefix, m.as_str(), paren.unwrap_or_default());
        return canonicalize(strip_label_noise(&val).as_str());
    }

    // Stage 3: an alphabetic prefix directly followed by a digit run, with
    // no slash, anywhere in the text.
    if let Some(caps) = PREFIX_DIGITS_ANYWHERE.captures(&t) {
        let prefix = &caps[1];
        if SERIAL_LIKE_PREFIXES.contains(&prefix) {
            return None;
        }
        let mut val = format!("{} {}", prefix, &caps[2]);
        if let Some(paren) = caps.get(3) {
            val.push_str(paren.as_str());
        }
        return canonicalize(&strip_label_noise(&clean_text(&val)));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_vocabulary_membership() {
        assert_eq!(
            extract_identity_name("FOR ANIMAL TREATMENT ONLY RABIES VACCINE KILLED VIRUS").as_deref(),
            Some("Rabies Vaccine")
        );
        assert_eq!(
            extract_identity_name("Feline Rhinotracheitis; Calici-Panleukopenia; Chlamydia psittaci")
                .as_deref(),
            Some("Feline Rhinotracheitis; Calici-Panleukopenia; Chlamydia psittaci")
        );
    }

    #[test]
    fn test_identity_tolerates_component_misreads() {
        assert_eq!(
            extract_identity_name("PANLCUKOPENIA AND PSITTACH").as_deref(),
            Some("Calici-Panleukopenia; Chlamydia psittaci")
        );
    }

    #[test]
    fn test_identity_brand_fallback() {
        assert_eq!(extract_identity_name("FEUOCELL 4").as_deref(), Some("FELOCELL 4"));
    }

    #[test]
    fn test_product_name_with_trailing_digits() {
        assert_eq!(
            extract_product_name("zoetis DEFENSOR 3").as_deref(),
            Some("DEFENSOR 3")
        );
        assert_eq!(
            extract_product_name("DEFERUSOR 3").as_deref(),
            Some("DEFENSOR 3")
        );
    }

    #[test]
    fn test_manufacturer_lookup_and_fallback() {
        assert_eq!(
            extract_manufacturer("Killed Virus zoetis").as_deref(),
            Some("Zoetis Inc.")
        );
        assert_eq!(
            extract_manufacturer("made by Acme Labs Inc.").as_deref(),
            Some("Acme Labs Inc.")
        );
        assert_eq!(extract_manufacturer("no maker here"), None);
    }

    #[test]
    fn test_registration_labelled() {
        assert_eq!(
            extract_registration_number("Reg No 1F 2/56 (B)").as_deref(),
            Some("1F 2/56 (B)")
        );
        assert_eq!(
            extract_registration_number("Reg No 2F18/59 (B) SER").as_deref(),
            Some("2F 18/59 (B)")
        );
    }

    #[test]
    fn test_registration_labelled_noncanonical_rejected() {
        // Matches the labelled stage but cannot be canonicalized.
        assert_eq!(extract_registration_number("Reg No NO 190"), None);
    }

    #[test]
    fn test_registration_fraction_anywhere() {
        assert_eq!(
            extract_registration_number("ZOETIS 2F 18/59 (B) lot data").as_deref(),
            Some("2F 18/59 (B)")
        );
    }

    #[test]
    fn test_registration_serial_prefix_rejected() {
        assert_eq!(extract_registration_number("SCR 643797"), None);
    }

    #[test]
    fn test_registration_absent() {
        assert_eq!(extract_registration_number(""), None);
        assert_eq!(extract_registration_number("DEFENSOR 3 ZOETIS"), None);
    }
}
