//! Utility functions for bearer-guard
//!
//! Token redaction for log output, and UTF-8 safe truncation for response
//! bodies that end up in error messages.

/// Tokens longer than this show an 8-character prefix when redacted
const REDACT_VISIBLE_THRESHOLD: usize = 12;

/// Number of leading characters kept by [`redact_token`]
const REDACT_PREFIX_CHARS: usize = 8;

/// Maximum bytes of a response body embedded in an error message
pub const MAX_ERROR_BODY_BYTES: usize = 500;

/// Redact a token for logging.
///
/// Long tokens keep their first 8 characters followed by `...`; short
/// tokens are replaced entirely since a prefix would leak most of them.
///
/// # Example
/// ```
/// use bearer_guard::utils::redact_token;
///
/// assert_eq!(redact_token("eyJhbGciOiJIUzI1NiJ9"), "eyJhbGci...");
/// assert_eq!(redact_token("short"), "***");
/// ```
#[must_use]
pub fn redact_token(token: &str) -> String {
    if token.chars().count() > REDACT_VISIBLE_THRESHOLD {
        let prefix: String = token.chars().take(REDACT_PREFIX_CHARS).collect();
        format!("{prefix}...")
    } else {
        "***".to_string()
    }
}

/// Redact an optional token, rendering absence as `<none>`
#[must_use]
pub fn redact_optional(token: Option<&str>) -> String {
    token.map_or_else(|| "<none>".to_string(), redact_token)
}

/// Safely truncate a string at a UTF-8 character boundary.
///
/// Returns a slice of at most `max_bytes` bytes, ensuring the result
/// is valid UTF-8 by finding the last valid character boundary.
///
/// # Example
/// ```
/// use bearer_guard::utils::safe_truncate;
///
/// // Emoji is 4 bytes - truncating at byte 10 would cut it in half
/// let text = "Status: 🔍 Active";
/// assert_eq!(safe_truncate(text, 10), "Status: ");
/// ```
#[inline]
#[must_use]
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut boundary = max_bytes;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    &s[..boundary]
}

/// Truncate a response body for inclusion in an error message.
///
/// Appends the total size when anything was cut.
#[must_use]
pub fn truncate_body(body: &str) -> String {
    let truncated = safe_truncate(body, MAX_ERROR_BODY_BYTES);
    if truncated.len() < body.len() {
        format!("{truncated}... (truncated, {} total bytes)", body.len())
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_long_token() {
        assert_eq!(redact_token("abcdefghijklmnop"), "abcdefgh...");
    }

    #[test]
    fn test_redact_short_token() {
        assert_eq!(redact_token("A1"), "***");
        assert_eq!(redact_token(""), "***");
        assert_eq!(redact_token("exactly12chr"), "***");
    }

    #[test]
    fn test_redact_multibyte_token() {
        // Counts characters, not bytes, so never splits a code point
        assert_eq!(redact_token("ééééééééééééé"), "éééééééé...");
    }

    #[test]
    fn test_redact_optional() {
        assert_eq!(redact_optional(None), "<none>");
        assert_eq!(redact_optional(Some("R1")), "***");
    }

    #[test]
    fn test_safe_truncate_multibyte() {
        // 'é' is 2 bytes in UTF-8
        let text = "Café";
        assert_eq!(safe_truncate(text, 4), "Caf");
        assert_eq!(safe_truncate(text, 5), "Café");
        assert_eq!(safe_truncate(text, 0), "");
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("unauthorized"), "unauthorized");

        let long = "x".repeat(MAX_ERROR_BODY_BYTES + 20);
        let truncated = truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_BYTES)));
        assert!(truncated.ends_with(&format!("(truncated, {} total bytes)", long.len())));
    }
}
