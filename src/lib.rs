//! Structured vaccine-label data extraction from noisy OCR text.
//!
//! The pipeline takes the raw text an OCR engine produced for a label's
//! two regions (printed label block and lot-specific data block), repairs
//! common character misreads, extracts seven structured fields, and can
//! reconcile the records of several OCR engines into one best record with
//! per-field provenance.

pub mod label_extractor;
pub mod merge;
pub mod models;
pub mod processing;
pub mod utils;
pub mod validation;

pub use label_extractor::LabelExtractor;
pub use merge::RecordMerger;
pub use models::{MergeOutcome, RawOcrText, VaccineRecord};
pub use utils::VaxtractError;
