//! Rate-limit error signatures.
//!
//! Providers are inconsistent about how they report throttling. Some send a
//! bare 429, others wrap it in a 4xx/5xx with a message, and transport errors
//! sometimes carry only the text. Matching is case-insensitive.

const SIGNATURES: &[&str] = &["rate limit", "rate_limit", "too many requests", "429"];

/// Does `message` look like a rate-limit rejection?
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    SIGNATURES.iter().any(|sig| lower.contains(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_common_signatures() {
        assert!(is_rate_limit_message("Rate limit exceeded, slow down"));
        assert!(is_rate_limit_message("HTTP 429"));
        assert!(is_rate_limit_message("Too Many Requests"));
        assert!(is_rate_limit_message(r#"{"error":{"type":"rate_limit_error"}}"#));
    }

    #[test]
    fn ignores_other_failures() {
        assert!(!is_rate_limit_message("invalid image_url"));
        assert!(!is_rate_limit_message("connection reset by peer"));
        assert!(!is_rate_limit_message(""));
    }
}
