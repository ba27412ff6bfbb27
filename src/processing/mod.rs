pub mod dates;
pub mod extractors;
pub mod normalize;
pub mod registration;
pub mod serial;

pub use normalize::{clean_text, normalize_ocr_text};
pub use registration::canonicalize;
