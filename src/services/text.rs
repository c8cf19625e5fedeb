//! Text normalization applied to answers before embedding.

/// Map a single token through the slang dictionary.
///
/// Single-pass: a mapped token is not looked up again ("machaa" becomes
/// "macha", not "friend").
fn map_slang(token: &str) -> &str {
    match token {
        "machaa" => "macha",
        "macha" => "friend",
        "pwoli" => "awesome",
        "sheri" => "ok",
        "alle" => "right",
        "ishtam" => "love",
        "njan" => "i",
        "nee" => "you",
        "entha" => "what",
        other => other,
    }
}

/// Normalize free-text for embedding: lowercase, strip ASCII punctuation,
/// collapse whitespace, and map slang tokens.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();
    stripped
        .split_whitespace()
        .map(map_slang)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(normalize_text("Hello, World!!"), "hello world");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_text("  late   night\tvibes "), "late night vibes");
    }

    #[test]
    fn maps_slang_tokens_single_pass() {
        assert_eq!(normalize_text("nee entha machaa"), "you what macha");
        assert_eq!(normalize_text("macha pwoli"), "friend awesome");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_text("   !!! "), "");
    }
}
