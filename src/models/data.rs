use serde::{Deserialize, Serialize};

/// One OCR strategy producing a raw text pair per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Tesseract,
    EasyOcr,
    Hybrid,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Tesseract => "tesseract",
            EngineKind::EasyOcr => "easyocr",
            EngineKind::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text emitted by one OCR run, one string per image region.
/// Absence is represented by an empty string, never by a null-like value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOcrText {
    pub label_text: String,
    pub data_text: String,
}

impl RawOcrText {
    pub fn new(label_text: impl Into<String>, data_text: impl Into<String>) -> Self {
        RawOcrText {
            label_text: label_text.into(),
            data_text: data_text.into(),
        }
    }
}

/// The seven extracted fields, in fixed render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    IdentityName,
    ProductName,
    Manufacturer,
    RegistrationNumber,
    SerialNumber,
    MfgDate,
    ExpDate,
}

impl FieldKind {
    pub const ALL: [FieldKind; 7] = [
        FieldKind::IdentityName,
        FieldKind::ProductName,
        FieldKind::Manufacturer,
        FieldKind::RegistrationNumber,
        FieldKind::SerialNumber,
        FieldKind::MfgDate,
        FieldKind::ExpDate,
    ];

    /// Label used in the human-readable report.
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::IdentityName => "Vaccine Name",
            FieldKind::ProductName => "Product Name",
            FieldKind::Manufacturer => "Manufacturer",
            FieldKind::RegistrationNumber => "Registration Number",
            FieldKind::SerialNumber => "Serial Number",
            FieldKind::MfgDate => "Manufacture Date",
            FieldKind::ExpDate => "Expiry Date",
        }
    }
}

/// Structured output of one extraction run. A `None` field means the
/// extractors found no matching pattern; empty strings are never stored.
/// Dates are kept in the canonical `DD Mon YYYY` textual form once set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccineRecord {
    pub identity_name: Option<String>,
    pub product_name: Option<String>,
    pub manufacturer: Option<String>,
    pub registration_number: Option<String>,
    pub serial_number: Option<String>,
    pub mfg_date: Option<String>,
    pub exp_date: Option<String>,
}

impl VaccineRecord {
    pub fn get(&self, field: FieldKind) -> Option<&str> {
        match field {
            FieldKind::IdentityName => self.identity_name.as_deref(),
            FieldKind::ProductName => self.product_name.as_deref(),
            FieldKind::Manufacturer => self.manufacturer.as_deref(),
            FieldKind::RegistrationNumber => self.registration_number.as_deref(),
            FieldKind::SerialNumber => self.serial_number.as_deref(),
            FieldKind::MfgDate => self.mfg_date.as_deref(),
            FieldKind::ExpDate => self.exp_date.as_deref(),
        }
    }

    pub fn set(&mut self, field: FieldKind, value: Option<String>) {
        let slot = match field {
            FieldKind::IdentityName => &mut self.identity_name,
            FieldKind::ProductName => &mut self.product_name,
            FieldKind::Manufacturer => &mut self.manufacturer,
            FieldKind::RegistrationNumber => &mut self.registration_number,
            FieldKind::SerialNumber => &mut self.serial_number,
            FieldKind::MfgDate => &mut self.mfg_date,
            FieldKind::ExpDate => &mut self.exp_date,
        };
        *slot = value.filter(|v| !v.is_empty());
    }

    /// Fixed-field-order textual rendering for display, one `label: value`
    /// line per field.
    pub fn render_report(&self) -> String {
        let mut lines = Vec::with_capacity(FieldKind::ALL.len());
        for field in FieldKind::ALL {
            lines.push(format!(
                "{}: {}",
                field.label(),
                self.get(field).unwrap_or("not found")
            ));
        }
        lines.join("\n")
    }
}

/// Boolean completeness flags derived from a record; recomputed on demand,
/// never stored alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub has_identity: bool,
    pub has_serial: bool,
    pub has_dates: bool,
    pub has_manufacturer: bool,
    pub is_complete: bool,
}

/// Why a merged field ended up with the value it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeReason {
    PreferredCanonical,
    NoCanonicalFound,
    PreferredByContent,
    EasyPresent,
    HybridPresent,
    TesseractPresent,
    Missing,
}

impl MergeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeReason::PreferredCanonical => "preferred-canonical",
            MergeReason::NoCanonicalFound => "no-canonical-found",
            MergeReason::PreferredByContent => "preferred-by-content",
            MergeReason::EasyPresent => "easy-present",
            MergeReason::HybridPresent => "hybrid-present",
            MergeReason::TesseractPresent => "tesseract-present",
            MergeReason::Missing => "missing",
        }
    }
}

/// Which engine a merged field value came from, and why it was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub source: Option<EngineKind>,
    pub reason: MergeReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProvenance {
    pub field: FieldKind,
    #[serde(flatten)]
    pub entry: ProvenanceEntry,
}

/// One record reconciled from several engine candidates, with per-field
/// provenance in fixed field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub data: VaccineRecord,
    pub sources: Vec<FieldProvenance>,
}

impl MergedRecord {
    pub fn source_of(&self, field: FieldKind) -> Option<&ProvenanceEntry> {
        self.sources
            .iter()
            .find(|p| p.field == field)
            .map(|p| &p.entry)
    }
}

/// A candidate value as seen by the merger, before selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateValue {
    pub engine: EngineKind,
    pub value: Option<String>,
}

/// Per-field explanation of a merge decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecision {
    pub field: FieldKind,
    pub candidates: Vec<CandidateValue>,
    pub selected: Option<String>,
    pub source: Option<EngineKind>,
    pub reason: MergeReason,
    pub candidates_agree: bool,
}

/// Average field score per candidate and for the merged record, plus the
/// signed improvement of the merged average over the best single candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeQualityReport {
    pub candidate_averages: Vec<EngineAverage>,
    pub merged_average: f64,
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineAverage {
    pub engine: EngineKind,
    pub average: f64,
}

/// Full merger output: the merged record, per-field decision explanations
/// and the aggregate quality report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub record: MergedRecord,
    pub decisions: Vec<FieldDecision>,
    pub quality: MergeQualityReport,
}
