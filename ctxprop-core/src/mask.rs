//! Deterministic masking of sensitive values.
//!
//! The rendered mask is computed once when the value is written to the
//! context store; observability projections only ever see the mask.

/// Default pattern applied to sensitive fields with no explicit pattern.
pub const DEFAULT_MASK: &str = "***";

/// Render `value` according to `pattern`.
///
/// - `"***"` masks the whole value.
/// - `"*-N"` keeps the last `N` characters; when the value has `N` or fewer
///   characters the pattern literal is returned instead.
/// - A pattern containing `@` applied to a value containing `@` renders the
///   e-mail mask `***@***.***`.
/// - Anything else is returned literally.
pub fn render(pattern: &str, value: &str) -> String {
    if pattern == DEFAULT_MASK {
        return DEFAULT_MASK.to_string();
    }

    if let Some(keep) = keep_last(pattern) {
        let chars: Vec<char> = value.chars().collect();
        if chars.len() <= keep {
            return pattern.to_string();
        }
        let tail: String = chars[chars.len() - keep..].iter().collect();
        return format!("***{tail}");
    }

    if pattern.contains('@') && value.contains('@') {
        return "***@***.***".to_string();
    }

    pattern.to_string()
}

/// Parse a `*-N` pattern, returning `N`.
fn keep_last(pattern: &str) -> Option<usize> {
    let rest = pattern.strip_prefix("*-")?;
    rest.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mask() {
        assert_eq!(render("***", "secret"), "***");
    }

    #[test]
    fn keep_last_four() {
        assert_eq!(render("*-4", "4111111111111111"), "***1111");
    }

    #[test]
    fn keep_last_short_value_returns_pattern() {
        assert_eq!(render("*-4", "abc"), "*-4");
        assert_eq!(render("*-4", "abcd"), "*-4");
    }

    #[test]
    fn email_mask() {
        assert_eq!(render("***@***.***", "x@y.com"), "***@***.***");
        assert_eq!(render("*@*", "first.last@corp.example"), "***@***.***");
    }

    #[test]
    fn email_pattern_on_non_email_returns_literal() {
        assert_eq!(render("***@***.***", "no-at-sign"), "***@***.***");
        assert_eq!(render("*@*", "no-at-sign"), "*@*");
    }

    #[test]
    fn unknown_pattern_is_literal() {
        assert_eq!(render("REDACTED", "anything"), "REDACTED");
    }
}
