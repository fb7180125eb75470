//! Text cleanup: invisible characters, whitespace, boilerplate and duplicate lines.

pub mod language;
pub mod normalize;

pub use language::detect_language;
pub use normalize::{clean_text, normalize_visible, truncate_chars};
