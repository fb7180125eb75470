//! Coarse language detection for the stored digest.

/// Share of Cyrillic letters above which text is treated as Bulgarian.
const CYRILLIC_SHARE: f64 = 0.3;

/// Return `"bg"` for predominantly Cyrillic text, `"en"` otherwise.
pub fn detect_language(text: &str) -> &'static str {
    let mut letters = 0usize;
    let mut cyrillic = 0usize;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if ('\u{0400}'..='\u{04FF}').contains(&c) {
            cyrillic += 1;
        }
    }
    if letters > 0 && cyrillic as f64 / letters as f64 >= CYRILLIC_SHARE {
        "bg"
    } else {
        "en"
    }
}
