// Multi-engine merger: reconciles up to three independently extracted
// records into one best record with per-field provenance and an aggregate
// quality report. Selection is driven by fixed engine-preference orders,
// so merging the same candidates twice yields byte-identical output.

use log::debug;

use crate::models::{
    CandidateValue, EngineAverage, EngineKind, FieldDecision, FieldKind, FieldProvenance,
    MergeOutcome, MergeQualityReport, MergeReason, MergedRecord, ProvenanceEntry, VaccineRecord,
};
use crate::processing::registration::canonicalize;
use crate::utils::VaxtractError;
use crate::validation::average_score;

/// Canonical-registration preference order.
const REGISTRATION_PREFERENCE: [EngineKind; 3] =
    [EngineKind::EasyOcr, EngineKind::Tesseract, EngineKind::Hybrid];

/// Preference order for every plainly-selected field.
const GENERAL_PREFERENCE: [EngineKind; 3] =
    [EngineKind::EasyOcr, EngineKind::Hybrid, EngineKind::Tesseract];

/// Concatenation order for identity-name components. Tesseract reads the
/// label region more completely, so its components come first.
const IDENTITY_CONCAT_ORDER: [EngineKind; 3] =
    [EngineKind::Tesseract, EngineKind::EasyOcr, EngineKind::Hybrid];

/// Fixed engine order used for candidate listings and quality averages.
const ENGINE_ORDER: [EngineKind; 3] =
    [EngineKind::Tesseract, EngineKind::EasyOcr, EngineKind::Hybrid];

/// A keyword marking the identity value that preserved a defining
/// component prefix other engines tend to drop.
const DEFINING_COMPONENT_KEYWORD: &str = "FELINE";

pub struct RecordMerger;

struct Candidates<'a> {
    records: Vec<(EngineKind, &'a VaccineRecord)>,
}

impl<'a> Candidates<'a> {
    fn record_for(&self, engine: EngineKind) -> Option<&'a VaccineRecord> {
        self.records
            .iter()
            .find(|(e, _)| *e == engine)
            .map(|(_, r)| *r)
    }

    fn value_of(&self, engine: EngineKind, field: FieldKind) -> Option<&'a str> {
        self.record_for(engine)
            .and_then(|r| r.get(field))
            .filter(|v| !v.trim().is_empty())
    }
}

fn reason_for_engine(engine: EngineKind) -> MergeReason {
    match engine {
        EngineKind::EasyOcr => MergeReason::EasyPresent,
        EngineKind::Hybrid => MergeReason::HybridPresent,
        EngineKind::Tesseract => MergeReason::TesseractPresent,
    }
}

fn split_components(value: Option<&str>) -> Vec<String> {
    match value {
        Some(v) => v
            .split(|c| c == ';' || c == '\n' || c == ',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

impl RecordMerger {
    /// Merges 1-3 candidate records, one per extraction strategy. Returns
    /// the merged record with per-field provenance, per-field decision
    /// explanations, and the quality report.
    pub fn merge(
        candidates: &[(EngineKind, VaccineRecord)],
    ) -> Result<MergeOutcome, VaxtractError> {
        if candidates.is_empty() {
            return Err(VaxtractError::EmptyCandidateSet);
        }

        // First record per engine wins; iteration below is always over
        // fixed-order arrays so the outcome is deterministic.
        let mut seen = Vec::new();
        for (engine, record) in candidates {
            if !seen.iter().any(|(e, _)| e == engine) {
                seen.push((*engine, record));
            }
        }
        let candidates = Candidates { records: seen };

        let mut data = VaccineRecord::default();
        let mut sources = Vec::with_capacity(FieldKind::ALL.len());
        let mut decisions = Vec::with_capacity(FieldKind::ALL.len());

        for field in FieldKind::ALL {
            let (selected, source, reason) = Self::choose_field(&candidates, field);
            debug!(
                "merge {}: {} ({})",
                field.label(),
                selected.as_deref().unwrap_or("missing"),
                reason.as_str()
            );

            let listed: Vec<CandidateValue> = ENGINE_ORDER
                .iter()
                .filter(|e| candidates.record_for(**e).is_some())
                .map(|&engine| CandidateValue {
                    engine,
                    value: candidates.value_of(engine, field).map(str::to_string),
                })
                .collect();
            let mut distinct: Vec<String> = Vec::new();
            for cand in listed.iter().filter_map(|c| c.value.as_deref()) {
                let folded = cand.to_uppercase();
                if !distinct.contains(&folded) {
                    distinct.push(folded);
                }
            }

            decisions.push(FieldDecision {
                field,
                candidates: listed,
                selected: selected.clone(),
                source,
                reason,
                candidates_agree: distinct.len() <= 1,
            });
            sources.push(FieldProvenance {
                field,
                entry: ProvenanceEntry { source, reason },
            });
            data.set(field, selected);
        }

        let candidate_averages: Vec<EngineAverage> = ENGINE_ORDER
            .iter()
            .filter_map(|&engine| {
                candidates.record_for(engine).map(|record| EngineAverage {
                    engine,
                    average: average_score(record),
                })
            })
            .collect();
        let merged_average = average_score(&data);
        let best_candidate = candidate_averages
            .iter()
            .map(|a| a.average)
            .fold(f64::MIN, f64::max);
        let quality = MergeQualityReport {
            candidate_averages,
            merged_average,
            improvement: merged_average - best_candidate,
        };

        Ok(MergeOutcome {
            record: MergedRecord { data, sources },
            decisions,
            quality,
        })
    }

    fn choose_field(
        candidates: &Candidates,
        field: FieldKind,
    ) -> (Option<String>, Option<EngineKind>, MergeReason) {
        match field {
            FieldKind::RegistrationNumber => Self::choose_registration(candidates),
            FieldKind::IdentityName => Self::choose_identity(candidates),
            _ => Self::choose_first_present(candidates, field),
        }
    }

    /// Registration numbers are only ever surfaced in canonical form: each
    /// candidate is canonicalized independently and the first engine whose
    /// value survives wins. Raw values are never selected.
    fn choose_registration(
        candidates: &Candidates,
    ) -> (Option<String>, Option<EngineKind>, MergeReason) {
        let mut any_present = false;
        for engine in REGISTRATION_PREFERENCE {
            if let Some(value) = candidates.value_of(engine, FieldKind::RegistrationNumber) {
                any_present = true;
                if let Some(canonical) = canonicalize(value) {
                    return (Some(canonical), Some(engine), MergeReason::PreferredCanonical);
                }
            }
        }
        if any_present {
            (None, None, MergeReason::NoCanonicalFound)
        } else {
            (None, None, MergeReason::Missing)
        }
    }

    /// Identity names are merged rather than selected: candidate values are
    /// split into components, deduplicated case-insensitively, and joined
    /// in a fixed concatenation order so no engine's unique component is
    /// lost.
    fn choose_identity(
        candidates: &Candidates,
    ) -> (Option<String>, Option<EngineKind>, MergeReason) {
        let mut merged: Vec<String> = Vec::new();
        let mut seen: Vec<String> = Vec::new();
        for engine in IDENTITY_CONCAT_ORDER {
            for component in split_components(candidates.value_of(engine, FieldKind::IdentityName))
            {
                let folded = component.to_lowercase();
                if !seen.contains(&folded) {
                    seen.push(folded);
                    merged.push(component);
                }
            }
        }
        if merged.is_empty() {
            return (None, None, MergeReason::Missing);
        }
        let merged_name = merged.join("; ");

        let tess = candidates.value_of(EngineKind::Tesseract, FieldKind::IdentityName);
        let tess_count = split_components(tess).len();
        let easy = candidates.value_of(EngineKind::EasyOcr, FieldKind::IdentityName);
        let easy_count = split_components(easy).len();

        let has_keyword =
            matches!(tess, Some(t) if t.to_uppercase().contains(DEFINING_COMPONENT_KEYWORD));
        let (source, reason) = if has_keyword || tess_count > easy_count {
            (EngineKind::Tesseract, MergeReason::PreferredByContent)
        } else if easy.is_some() {
            (EngineKind::EasyOcr, MergeReason::EasyPresent)
        } else {
            // A tesseract value with components would have won above, so a
            // non-empty merge landing here came from hybrid.
            (EngineKind::Hybrid, MergeReason::HybridPresent)
        };
        (Some(merged_name), Some(source), reason)
    }

    fn choose_first_present(
        candidates: &Candidates,
        field: FieldKind,
    ) -> (Option<String>, Option<EngineKind>, MergeReason) {
        for engine in GENERAL_PREFERENCE {
            if let Some(value) = candidates.value_of(engine, field) {
                return (Some(value.to_string()), Some(engine), reason_for_engine(engine));
            }
        }
        (None, None, MergeReason::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn easy_record() -> VaccineRecord {
        VaccineRecord {
            identity_name: Some("Rabies Vaccine".into()),
            product_name: Some("DEFENSOR".into()),
            manufacturer: Some("Zoetis Inc.".into()),
            registration_number: Some("SCR 643797".into()),
            serial_number: Some("643797".into()),
            mfg_date: Some("22 Jan 2023".into()),
            exp_date: Some("11 Jun 2024".into()),
        }
    }

    fn tess_record() -> VaccineRecord {
        VaccineRecord {
            registration_number: Some("1F 2/56 (8)".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_registration_prefers_first_canonicalizable_candidate() {
        let outcome = RecordMerger::merge(&[
            (EngineKind::Tesseract, tess_record()),
            (EngineKind::EasyOcr, easy_record()),
            (EngineKind::Hybrid, VaccineRecord::default()),
        ])
        .unwrap();

        let data = &outcome.record.data;
        // EasyOCR's value fails the canonical grammar, so Tesseract's wins.
        assert_eq!(data.registration_number.as_deref(), Some("1F 2/56 (8)"));
        let entry = outcome
            .record
            .source_of(FieldKind::RegistrationNumber)
            .unwrap();
        assert_eq!(entry.source, Some(EngineKind::Tesseract));
        assert_eq!(entry.reason, MergeReason::PreferredCanonical);

        // Everything else comes from EasyOCR first.
        assert_eq!(data.serial_number.as_deref(), Some("643797"));
        assert_eq!(data.mfg_date.as_deref(), Some("22 Jan 2023"));
        assert_eq!(data.exp_date.as_deref(), Some("11 Jun 2024"));
        let serial = outcome.record.source_of(FieldKind::SerialNumber).unwrap();
        assert_eq!(serial.source, Some(EngineKind::EasyOcr));
        assert_eq!(serial.reason, MergeReason::EasyPresent);
    }

    #[test]
    fn test_no_canonical_registration_is_absent() {
        let outcome = RecordMerger::merge(&[
            (EngineKind::Tesseract, VaccineRecord::default()),
            (EngineKind::EasyOcr, easy_record()),
        ])
        .unwrap();

        assert_eq!(outcome.record.data.registration_number, None);
        let entry = outcome
            .record
            .source_of(FieldKind::RegistrationNumber)
            .unwrap();
        assert_eq!(entry.source, None);
        assert_eq!(entry.reason, MergeReason::NoCanonicalFound);
    }

    #[test]
    fn test_registration_missing_everywhere() {
        let outcome = RecordMerger::merge(&[
            (EngineKind::Tesseract, VaccineRecord::default()),
            (EngineKind::EasyOcr, VaccineRecord::default()),
        ])
        .unwrap();
        let entry = outcome
            .record
            .source_of(FieldKind::RegistrationNumber)
            .unwrap();
        assert_eq!(entry.reason, MergeReason::Missing);
    }

    #[test]
    fn test_identity_components_merged_without_duplicates() {
        let tess = VaccineRecord {
            identity_name: Some(
                "Feline Rhinotracheitis; Calici-Panleukopenia; Chlamydia psittaci".into(),
            ),
            ..Default::default()
        };
        let easy = VaccineRecord {
            identity_name: Some("Calici-Panleukopenia; Chlamydia psittaci".into()),
            ..Default::default()
        };
        let outcome = RecordMerger::merge(&[
            (EngineKind::Tesseract, tess),
            (EngineKind::EasyOcr, easy),
        ])
        .unwrap();

        assert_eq!(
            outcome.record.data.identity_name.as_deref(),
            Some("Feline Rhinotracheitis; Calici-Panleukopenia; Chlamydia psittaci")
        );
        let entry = outcome.record.source_of(FieldKind::IdentityName).unwrap();
        assert_eq!(entry.source, Some(EngineKind::Tesseract));
        assert_eq!(entry.reason, MergeReason::PreferredByContent);
    }

    #[test]
    fn test_identity_source_attribution() {
        // Tesseract holding the only value wins on component count.
        let tess_only = VaccineRecord {
            identity_name: Some("Rabies Vaccine".into()),
            ..Default::default()
        };
        let outcome = RecordMerger::merge(&[
            (EngineKind::Tesseract, tess_only),
            (EngineKind::EasyOcr, VaccineRecord::default()),
        ])
        .unwrap();
        let entry = outcome.record.source_of(FieldKind::IdentityName).unwrap();
        assert_eq!(entry.source, Some(EngineKind::Tesseract));
        assert_eq!(entry.reason, MergeReason::PreferredByContent);

        // Equal component counts without the defining keyword go to easyocr.
        let tess = VaccineRecord {
            identity_name: Some("Rabies Vaccine".into()),
            ..Default::default()
        };
        let easy = VaccineRecord {
            identity_name: Some("Rabies Vaccine".into()),
            ..Default::default()
        };
        let outcome =
            RecordMerger::merge(&[(EngineKind::Tesseract, tess), (EngineKind::EasyOcr, easy)])
                .unwrap();
        let entry = outcome.record.source_of(FieldKind::IdentityName).unwrap();
        assert_eq!(entry.source, Some(EngineKind::EasyOcr));
        assert_eq!(entry.reason, MergeReason::EasyPresent);

        // Hybrid as the only engine with a value.
        let hybrid_only = VaccineRecord {
            identity_name: Some("Rabies Vaccine".into()),
            ..Default::default()
        };
        let outcome = RecordMerger::merge(&[(EngineKind::Hybrid, hybrid_only)]).unwrap();
        let entry = outcome.record.source_of(FieldKind::IdentityName).unwrap();
        assert_eq!(entry.source, Some(EngineKind::Hybrid));
        assert_eq!(entry.reason, MergeReason::HybridPresent);
    }

    #[test]
    fn test_feline_label_merged_across_engines() {
        use crate::models::RawOcrText;
        use crate::LabelExtractor;

        let tess = LabelExtractor::extract(&RawOcrText::new(
            "FELINE RHINOTRACHEITIS-CALICI-PANLEUKOPENIA CHLAMYDIA PSITTACI VACCINE FEUOCELL 4 zoetis REG NO 2F18/59 (B)",
            "Ser 739176C MFG 26 EXP 2005 EXP 05 ROV 2025",
        ));
        let easy = LabelExtractor::extract(&RawOcrText::new(
            "CALICI-PANLEUKOPENIA CHLAMYDIA PSITTACI VACCINE FEUOCELL 4 zoetis",
            "Ser 739176C MFG 26 EXP 2005 EXP 05 ROV 2025",
        ));

        let outcome =
            RecordMerger::merge(&[(EngineKind::Tesseract, tess), (EngineKind::EasyOcr, easy)])
                .unwrap();
        let data = &outcome.record.data;

        // Tesseract kept the defining FELINE component easyocr dropped.
        assert_eq!(
            data.identity_name.as_deref(),
            Some("Feline Rhinotracheitis; Calici-Panleukopenia; Chlamydia psittaci")
        );
        let identity = outcome.record.source_of(FieldKind::IdentityName).unwrap();
        assert_eq!(identity.source, Some(EngineKind::Tesseract));
        assert_eq!(identity.reason, MergeReason::PreferredByContent);

        // Only tesseract saw the registration label.
        assert_eq!(data.registration_number.as_deref(), Some("2F 18/59 (B)"));
        let reg = outcome
            .record
            .source_of(FieldKind::RegistrationNumber)
            .unwrap();
        assert_eq!(reg.reason, MergeReason::PreferredCanonical);

        // The stray "EXP 2005" never displaces the real expiry.
        assert_eq!(data.serial_number.as_deref(), Some("739176C"));
        assert_eq!(data.exp_date.as_deref(), Some("05 Nov 2025"));
    }

    #[test]
    fn test_decisions_report_agreement() {
        let outcome = RecordMerger::merge(&[
            (EngineKind::Tesseract, easy_record()),
            (EngineKind::EasyOcr, easy_record()),
        ])
        .unwrap();
        for decision in &outcome.decisions {
            assert!(decision.candidates_agree, "{:?}", decision.field);
        }
    }

    #[test]
    fn test_quality_report_improvement() {
        let outcome = RecordMerger::merge(&[
            (EngineKind::Tesseract, tess_record()),
            (EngineKind::EasyOcr, easy_record()),
        ])
        .unwrap();
        let best = outcome
            .quality
            .candidate_averages
            .iter()
            .map(|a| a.average)
            .fold(f64::MIN, f64::max);
        assert!((outcome.quality.merged_average - best - outcome.quality.improvement).abs() < 1e-9);
        // The merged record holds EasyOCR's fields plus Tesseract's
        // canonical registration, so it must not score below the best
        // single candidate.
        assert!(outcome.quality.improvement >= 0.0);
    }

    #[test]
    fn test_merge_is_deterministic() {
        let input = [
            (EngineKind::Tesseract, tess_record()),
            (EngineKind::EasyOcr, easy_record()),
            (EngineKind::Hybrid, VaccineRecord::default()),
        ];
        let first = RecordMerger::merge(&input).unwrap();
        let second = RecordMerger::merge(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_empty_candidate_set_is_an_error() {
        assert_eq!(
            RecordMerger::merge(&[]),
            Err(VaxtractError::EmptyCandidateSet)
        );
    }
}
