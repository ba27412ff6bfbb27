// OCR text normalization applied before any field extraction runs.
//
// Misread rewrites are ordered association lists applied as literal text
// replacements: domain terms first, then generic OCR misreads, then month
// fixes, so a later generic rule cannot re-break an already-fixed domain
// term.

use lazy_static::lazy_static;
use regex::Regex;

/// Brand and registration-label typos specific to the vaccine-label domain.
pub const DOMAIN_REPLACEMENTS: &[(&str, &str)] = &[
    ("DEFERRUSOR", "DEFENSOR"),
    ("DEFERUSOR", "DEFENSOR"),
    ("DEFERUSO", "DEFENSOR"),
    ("CEFENSOR", "DEFENSOR"),
    ("DEFENSOR3", "DEFENSOR 3"),
    ("ZORTS", "ZOETIS"),
    ("FEUOKCELL", "FELOCELL"),
    ("FEUOCELL", "FELOCELL"),
    ("RSG", "REG"),
    ("RGS", "REG"),
    ("RS G", "REG"),
    (" REG NO IF ", " REG NO 1F "),
    (" REG NO IF", " REG NO 1F"),
    (" IF ", " 1F "),
    (" I F ", " 1F "),
];

/// Generic OCR misreads seen across labels.
pub const OCR_REPLACEMENTS: &[(&str, &str)] = &[
    ("HLFG", "MFG"),
    ("HIFG", "MFG"),
    ("MIFG", "MFG"),
    ("JAM", "JAN"),
    ("J A M", "JAN"),
    ("J A N", "JAN"),
    ("J U N", "JUN"),
    ("J U L", "JUL"),
    ("&", "4"),
    ("SCR ", "SER "),
    ("SET ", "SER "),
];

/// Month-token misreads, applied last.
pub const MONTH_REPLACEMENTS: &[(&str, &str)] = &[
    ("OOT", "OCT"),
    ("0CT", "OCT"),
    ("O0T", "OCT"),
    ("RAY", "MAY"),
    ("R O V", "NOV"),
    ("ROV", "NOV"),
    ("R0V", "NOV"),
    ("AO", "APR"),
    ("A0", "APR"),
];

lazy_static! {
    static ref DISALLOWED: Regex = Regex::new(r"[^A-Z0-9\s/():\-]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref CLEAN_DISALLOWED: Regex = Regex::new(r"[^A-Za-z0-9_\s/()\-]").unwrap();
}

fn apply_misread_fixes(text: &str) -> String {
    let mut t = text.to_string();
    for &(from, to) in DOMAIN_REPLACEMENTS {
        t = t.replace(from, to);
    }
    for &(from, to) in OCR_REPLACEMENTS {
        t = t.replace(from, to);
    }
    for &(from, to) in MONTH_REPLACEMENTS {
        t = t.replace(from, to);
    }
    t
}

/// Rewrites known OCR misreads into canonical tokens, uppercases, strips
/// characters outside `[A-Z0-9 /():-]` and collapses whitespace.
///
/// Pure; idempotent; empty input is returned unchanged.
pub fn normalize_ocr_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let t = apply_misread_fixes(&text.to_uppercase());
    let t = DISALLOWED.replace_all(&t, "");
    let t = WHITESPACE.replace_all(&t, " ").trim().to_string();

    // Stripping can fuse a token (e.g. "I.F" -> "IF") that a fix table
    // would have matched, so the tables run once more on the cleaned text.
    let t = apply_misread_fixes(&t);
    WHITESPACE.replace_all(&t, " ").trim().to_string()
}

/// Lighter cleanup used on captured sub-strings: collapse whitespace and
/// strip everything outside word characters, spaces and `/()-`.
pub fn clean_text(text: &str) -> String {
    let t = CLEAN_DISALLOWED.replace_all(text, "");
    WHITESPACE.replace_all(&t, " ").trim().to_string()
}
