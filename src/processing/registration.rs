// Canonicalization of registration numbers.
//
// The only accepted shape is `PREFIX N1/N2[ (SUFFIX)]` where PREFIX is 1-3
// alphanumeric characters. Anything that cannot be reshaped into that
// grammar is rejected: a malformed registration number is worse than a
// missing one, because downstream consumers treat presence as a
// completeness signal.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DISALLOWED: Regex = Regex::new(r"[^A-Z0-9/() ]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref PAREN_SUFFIX: Regex = Regex::new(r"\(([A-Z0-9 ]+)\)\s*$").unwrap();
    static ref FRACTION: Regex = Regex::new(r"([0-9]{1,3}/[0-9]{1,3})").unwrap();
    // Slashless prefix + digit run, possibly with confusable letters in the
    // run (e.g. "ZF 18159", "2F18159"). The run must start with a digit so
    // the prefix cannot swallow it.
    static ref PREFIX_RUN: Regex =
        Regex::new(r"^([0-9]?[A-Z]{1,2}|[A-Z]{1,3})\s*([0-9][0-9OQDSZILBG]{1,5})$").unwrap();
}

/// Letter-to-digit OCR confusions applied when reconstructing a slashless
/// digit run. Empirically tuned; kept as data so it can be revised without
/// touching control flow.
pub const LETTER_DIGIT_CONFUSIONS: &[(char, char)] = &[
    ('O', '0'),
    ('Q', '0'),
    ('D', '0'),
    ('S', '5'),
    ('Z', '2'),
    ('I', '1'),
    ('L', '1'),
    ('B', '8'),
    ('G', '6'),
];

/// Exact-match fixes for misread prefixes ahead of an explicit fraction.
const PREFIX_TYPO_FIXES: &[(&str, &str)] = &[("IF", "1F"), ("ZF", "2F")];

fn map_confusions(run: &str) -> String {
    run.chars()
        .map(|c| {
            LETTER_DIGIT_CONFUSIONS
                .iter()
                .find(|&&(from, _)| from == c)
                .map(|&(_, to)| to)
                .unwrap_or(c)
        })
        .collect()
}

fn fix_prefix(prefix: &str) -> String {
    for &(from, to) in PREFIX_TYPO_FIXES {
        if prefix == from {
            return to.to_string();
        }
    }
    prefix.to_string()
}

fn strip_non_alnum(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Reshapes a candidate registration number into the canonical grammar, or
/// rejects it. Never returns a non-conforming value.
pub fn canonicalize(raw: &str) -> Option<String> {
    let s = raw.to_uppercase();
    let s = DISALLOWED.replace_all(&s, "");
    let mut s = WHITESPACE.replace_all(&s, " ").trim().to_string();
    if s.is_empty() {
        return None;
    }

    // Pull off a trailing parenthetical suffix like "(B)".
    let mut paren = None;
    if let Some(m) = PAREN_SUFFIX.captures(&s) {
        paren = Some(m.get(1).unwrap().as_str().replace(' ', ""));
        s = s[..m.get(0).unwrap().start()].trim().to_string();
    }
    let paren = paren.filter(|p| !p.is_empty());

    // Explicit fraction: everything before it is the prefix. Fraction
    // halves are kept verbatim here; the exactly-two-digit rule applies
    // only to the reconstruction path below.
    if let Some(m) = FRACTION.find(&s) {
        let frac = m.as_str();
        let prefix = strip_non_alnum(&s[..m.start()]);
        if prefix.is_empty() || prefix.len() > 3 {
            return None;
        }
        let prefix = fix_prefix(&prefix);
        return Some(match paren {
            Some(p) => format!("{} {} ({})", prefix, frac, p),
            None => format!("{} {}", prefix, frac),
        });
    }

    // No fraction: attempt reconstruction for a 2-char prefix followed by a
    // digit run where OCR likely dropped the slash. N1 is the first two
    // digits, N2 the last two; middle digits are dropped as noise.
    if let Some(caps) = PREFIX_RUN.captures(&s) {
        let prefix = caps.get(1).unwrap().as_str();
        let run = caps.get(2).unwrap().as_str();
        if prefix.len() != 2 {
            return None;
        }
        let digits = map_confusions(run);
        if digits.len() < 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let n1 = &digits[..2];
        let n2 = &digits[digits.len() - 2..];

        // The prefix first character may itself be a misread digit.
        let mut chars = prefix.chars();
        let p0 = chars.next().unwrap();
        let p1 = chars.next().unwrap();
        let prefix = if !p0.is_ascii_digit() {
            match LETTER_DIGIT_CONFUSIONS.iter().find(|&&(from, _)| from == p0) {
                Some(&(_, to)) => format!("{}{}", to, p1),
                None => prefix.to_string(),
            }
        } else {
            prefix.to_string()
        };

        return Some(match paren {
            Some(p) => format!("{} {}/{} ({})", prefix, n1, n2, p),
            None => format!("{} {}/{}", prefix, n1, n2),
        });
    }

    None
}

/// The two halves of a canonical registration fraction, used to guard the
/// serial extractor against mistaking a registration suffix for a serial.
pub fn fraction_of(canonical: &str) -> Option<(String, String)> {
    let m = FRACTION.find(canonical)?;
    let mut halves = m.as_str().split('/');
    Some((
        halves.next()?.to_string(),
        halves.next()?.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_canonical_input_passes_through() {
        assert_eq!(canonicalize("1F 2/56 (B)").as_deref(), Some("1F 2/56 (B)"));
        assert_eq!(canonicalize("2F 18/59").as_deref(), Some("2F 18/59"));
    }

    #[test]
    fn test_space_inserted_between_prefix_and_fraction() {
        assert_eq!(canonicalize("2F18/59 (B)").as_deref(), Some("2F 18/59 (B)"));
    }

    #[test]
    fn test_slashless_run_reconstructed() {
        // OCR dropped the slash; middle digit is noise.
        assert_eq!(canonicalize("ZF 18159").as_deref(), Some("2F 18/59"));
        assert_eq!(canonicalize("2F1859").as_deref(), Some("2F 18/59"));
    }

    #[test]
    fn test_prefix_typo_fixed() {
        assert_eq!(canonicalize("IF 2/56").as_deref(), Some("1F 2/56"));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(canonicalize("SCR 643797"), None); // 3-char prefix, no fraction
        assert_eq!(canonicalize("NE 190"), None); // run too short
        assert_eq!(canonicalize("L 5321"), None); // 1-char prefix, no fraction
        assert_eq!(canonicalize("REGNO 2/56"), None); // prefix too long
        assert_eq!(canonicalize("2/56"), None); // no prefix at all
        assert_eq!(canonicalize(""), None);
    }

    #[test]
    fn test_accepted_values_match_canonical_grammar() {
        let grammar = Regex::new(r"^[A-Z0-9]{1,3} \d{1,3}/\d{1,3}( \([A-Z0-9]+\))?$").unwrap();
        let inputs = [
            "1F 2/56 (B)",
            "2F18/59 (B)",
            "ZF 18159",
            "Reg 1F-2/56",
            "2f 18/59(b)",
            "SCR 643797",
            "NE 190",
            "garbage",
        ];
        for input in inputs {
            if let Some(out) = canonicalize(input) {
                assert!(grammar.is_match(&out), "non-canonical output {:?} from {:?}", out, input);
            }
        }
    }

    #[test]
    fn test_fraction_of() {
        assert_eq!(
            fraction_of("2F 18/59 (B)"),
            Some(("18".to_string(), "59".to_string()))
        );
        assert_eq!(fraction_of("no fraction"), None);
    }
}
