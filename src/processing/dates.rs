// Date extraction, canonical `DD Mon YYYY` formatting, and the consistency
// repair pass that keeps expiry strictly after manufacture.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use super::normalize::normalize_ocr_text;

/// Canonical three-letter month tokens.
pub const MONTHS: &[(&str, &str)] = &[
    ("JAN", "Jan"),
    ("FEB", "Feb"),
    ("MAR", "Mar"),
    ("APR", "Apr"),
    ("MAY", "May"),
    ("JUN", "Jun"),
    ("JUL", "Jul"),
    ("AUG", "Aug"),
    ("SEP", "Sep"),
    ("OCT", "Oct"),
    ("NOV", "Nov"),
    ("DEC", "Dec"),
];

/// Month-token misreads mapped to canonical three-letter keys.
const MONTH_FIXES: &[(&str, &str)] = &[
    ("JN", "JAN"),
    ("JA", "JAN"),
    ("JAIN", "JAN"),
    ("JV", "JUN"),
    ("JU", "JUN"),
    ("JUIV", "JUN"),
    ("OOT", "OCT"),
    ("0OT", "OCT"),
    ("0CT", "OCT"),
    ("O0T", "OCT"),
    ("OCTT", "OCT"),
    ("OC", "OCT"),
    ("OEC", "DEC"),
    ("APRIL", "APR"),
    ("AO", "APR"),
    ("A0", "APR"),
    ("RAY", "MAY"),
];

/// Tokens that look like months but are known layout noise; passed through
/// unconverted so they do not fabricate a date.
const NOISE_MONTHS: &[&str] = &["WS", "CO"];

/// Digit confusions tried when an expiry year run has a non-standard length.
const YEAR_DIGIT_CONFUSIONS: &[(char, char)] = &[('6', '4'), ('4', '6'), ('8', '3'), ('3', '8')];

/// Width of the window searched after an MFG/EXP label.
const DATE_WINDOW: usize = 120;

lazy_static! {
    static ref MFG_LABEL: Regex = Regex::new(r"\bMFG\b").unwrap();
    static ref EXP_LABEL: Regex = Regex::new(r"\bEXP\b").unwrap();
    static ref DAY_MONTH_YEAR: Regex =
        Regex::new(r"\b(\d{1,2})\s+([A-Z]{2,4})\s+(\d{2,4})\b").unwrap();
    static ref DAY: Regex = Regex::new(r"\b(\d{1,2})\b").unwrap();
    static ref MONTH_YEAR: Regex = Regex::new(r"\b([A-Z]{2,4})\s+(\d{2,4})\b").unwrap();
    static ref REPAIR_TOKENS: Regex =
        Regex::new(r"\b(\d{1,2})\s+([A-Z]{2,4})\s+(\d{2,6})\b").unwrap();
    static ref NON_ALNUM: Regex = Regex::new(r"[^A-Z0-9\s]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref LETTERS_ONLY: Regex = Regex::new(r"[^A-Z]").unwrap();
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Formats extracted day/month/year tokens into the canonical `DD Mon YYYY`
/// form. Month misreads are mapped to canonical abbreviations; a token that
/// is known noise is kept as-is so downstream parsing rejects it instead of
/// silently inventing a month.
pub fn format_date(day: &str, month: &str, year: &str) -> String {
    let m_raw = LETTERS_ONLY.replace_all(&month.to_uppercase(), "").to_string();

    let month_name = if NOISE_MONTHS.contains(&m_raw.as_str()) {
        capitalize(&m_raw)
    } else {
        let key = MONTH_FIXES
            .iter()
            .find(|&&(from, _)| from == m_raw)
            .map(|&(_, to)| to.to_string())
            .unwrap_or_else(|| m_raw.chars().take(3).collect());
        MONTHS
            .iter()
            .find(|&&(abbrev, _)| abbrev == key)
            .map(|&(_, name)| name.to_string())
            .unwrap_or_else(|| capitalize(&key))
    };

    let year = if year.len() == 2 {
        format!("20{}", year)
    } else {
        year.to_string()
    };

    format!("{:0>2} {} {}", day, month_name, year)
}

/// Parses a date in the canonical `DD Mon YYYY` output form.
pub fn parse_standard_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%d %b %Y").ok()
}

fn tail_after(text: &str, end: usize) -> &str {
    &text[end..(end + DATE_WINDOW).min(text.len())]
}

/// Extracts the manufacturing date: an explicit MFG label with a bounded
/// trailing window first, then the first date-shaped token anywhere.
pub fn extract_mfg_date(text: &str) -> Option<String> {
    let t = normalize_ocr_text(text);

    if let Some(label) = MFG_LABEL.find(&t) {
        let tail = tail_after(&t, label.end());
        if let Some(caps) = DAY_MONTH_YEAR.captures(tail) {
            return Some(format_date(&caps[1], &caps[2], &caps[3]));
        }
        if let Some(day) = DAY.captures(tail) {
            let after = &tail[day.get(0).unwrap().end()..];
            if let Some(caps) = MONTH_YEAR.captures(after) {
                return Some(format_date(&day[1], &caps[1], &caps[2]));
            }
        }
        if let Some(caps) = MONTH_YEAR.captures(tail) {
            return Some(format_date("01", &caps[1], &caps[2]));
        }
    }

    if let Some(caps) = DAY_MONTH_YEAR.captures(&t) {
        return Some(format_date(&caps[1], &caps[2], &caps[3]));
    }
    if let Some(caps) = MONTH_YEAR.captures(&t) {
        return Some(format_date("01", &caps[1], &caps[2]));
    }

    None
}

/// Extracts the expiry date: an explicit EXP label with a bounded trailing
/// window first, then the second date-shaped token anywhere, then the last
/// month/year pair anywhere.
pub fn extract_exp_date(text: &str) -> Option<String> {
    let t = normalize_ocr_text(text);

    if let Some(label) = EXP_LABEL.find(&t) {
        let tail = tail_after(&t, label.end());
        if let Some(caps) = DAY_MONTH_YEAR.captures(tail) {
            return Some(format_date(&caps[1], &caps[2], &caps[3]));
        }
        if let Some(caps) = MONTH_YEAR.captures_iter(tail).last() {
            return Some(format_date("01", &caps[1], &caps[2]));
        }
    }

    if let Some(caps) = DAY_MONTH_YEAR.captures_iter(&t).nth(1) {
        return Some(format_date(&caps[1], &caps[2], &caps[3]));
    }
    if let Some(caps) = MONTH_YEAR.captures_iter(&t).last() {
        return Some(format_date("01", &caps[1], &caps[2]));
    }

    None
}

/// Year candidates for a digit run found where a year was expected. Runs of
/// standard length are unambiguous and taken as-is; only non-standard runs
/// yield their 2- and 4-digit prefixes and suffixes plus single
/// digit-confusion variants. Invalid candidates are discarded by the
/// calendar parse later.
fn year_candidates(run: &str) -> Vec<String> {
    if run.len() == 2 || run.len() == 4 {
        return vec![run.to_string()];
    }

    let mut base = vec![run[..2].to_string(), run[run.len() - 2..].to_string()];
    if run.len() >= 4 {
        base.push(run[..4].to_string());
        base.push(run[run.len() - 4..].to_string());
    }

    let mut candidates = Vec::new();
    for cand in &base {
        if !candidates.contains(cand) {
            candidates.push(cand.clone());
        }
        for (i, c) in cand.char_indices() {
            for &(from, to) in YEAR_DIGIT_CONFUSIONS {
                if c == from {
                    let mut variant = cand.clone();
                    variant.replace_range(i..i + 1, &to.to_string());
                    if !candidates.contains(&variant) {
                        candidates.push(variant);
                    }
                }
            }
        }
    }
    candidates
}

/// All parseable date candidates in a text, scanned after punctuation is
/// flattened to spaces so tokens like `SEP.23` become `SEP 23`.
fn date_candidates(text: &str) -> Vec<(NaiveDate, String)> {
    let t = NON_ALNUM.replace_all(&text.to_uppercase(), " ").to_string();
    let t = WHITESPACE.replace_all(&t, " ").trim().to_string();

    let mut candidates = Vec::new();
    for caps in REPAIR_TOKENS.captures_iter(&t) {
        for year in year_candidates(&caps[3]) {
            let formatted = format_date(&caps[1], &caps[2], &year);
            if let Some(date) = parse_standard_date(&formatted) {
                candidates.push((date, formatted));
            }
        }
    }
    candidates
}

/// Repairs an expiry date that is missing or not strictly after the
/// manufacture date, by rescanning the source texts for the earliest
/// alternative candidate later than manufacture. Returns the replacement
/// expiry, or `None` when no repair applies; never fabricates a date with
/// no textual basis.
pub fn repair_exp_date(
    mfg_date: Option<&str>,
    exp_date: Option<&str>,
    data_text: &str,
    label_text: &str,
) -> Option<String> {
    let mfg = mfg_date.and_then(parse_standard_date)?;
    let exp = exp_date.and_then(parse_standard_date);
    if matches!(exp, Some(e) if e > mfg) {
        return None;
    }

    let mut candidates = date_candidates(data_text);
    if candidates.is_empty() {
        candidates = date_candidates(label_text);
    }
    candidates.sort();
    candidates
        .into_iter()
        .find(|(date, _)| *date > mfg)
        .map(|(_, formatted)| formatted)
}
