//! Whole-word keyword matching for human escalation answers.
//!
//! Matching is case-insensitive and token-based: a response is split into
//! runs of word characters (Unicode alphanumerics plus underscore), and a
//! keyword matches only when it equals a whole token. `RETRYING` therefore
//! never matches `RETRY`, and neither does `RETRY_NOW`.

/// Returns true if `keyword` appears as a whole word in `response`.
#[must_use]
pub fn contains_keyword(response: &str, keyword: &str) -> bool {
    tokens(response).any(|token| token.eq_ignore_ascii_case(keyword))
}

/// Iterates over the word tokens of a response.
fn tokens(response: &str) -> impl Iterator<Item = &str> {
    response
        .split(|c: char| !is_word_char(c))
        .filter(|t| !t.is_empty())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_word_matches() {
        assert!(contains_keyword("RETRY", "RETRY"));
        assert!(contains_keyword("retry", "RETRY"));
        assert!(contains_keyword("please Retry now", "RETRY"));
        assert!(contains_keyword("RETRY with more memory", "RETRY"));
    }

    #[test]
    fn test_substring_of_longer_token_does_not_match() {
        assert!(!contains_keyword("RETRYING", "RETRY"));
        assert!(!contains_keyword("we are retrying", "RETRY"));
        assert!(!contains_keyword("unskippable", "SKIP"));
    }

    #[test]
    fn test_underscore_counts_as_word_character() {
        assert!(!contains_keyword("RETRY_NOW", "RETRY"));
        assert!(!contains_keyword("do_not_skip", "SKIP"));
    }

    #[test]
    fn test_punctuation_is_a_boundary() {
        assert!(contains_keyword("ok, SKIP.", "SKIP"));
        assert!(contains_keyword("STOP!", "STOP"));
        assert!(contains_keyword("(accept)", "ACCEPT"));
    }

    #[test]
    fn test_empty_and_whitespace_only() {
        assert!(!contains_keyword("", "RETRY"));
        assert!(!contains_keyword("   \t\n", "RETRY"));
    }
}
