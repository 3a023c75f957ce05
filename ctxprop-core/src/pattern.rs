//! URL patterns for PATH extraction and Ant-style glob matching for the
//! include/exclude lists.

use glob_match::glob_match;

/// A parsed URL pattern such as `/users/{userId}/orders/{orderId}`.
///
/// Matching is segment-wise and exact except for `{name}` placeholders,
/// which capture one whole segment.
#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

impl PathPattern {
    /// Parse a pattern. Fails when no placeholder is present or a brace is
    /// unbalanced.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut placeholders = 0;
        for raw in pattern.split('/').filter(|s| !s.is_empty()) {
            if let Some(name) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
                if name.is_empty() {
                    return Err(format!("empty placeholder in '{pattern}'"));
                }
                placeholders += 1;
                segments.push(Segment::Placeholder(name.to_string()));
            } else if raw.contains('{') || raw.contains('}') {
                return Err(format!("unbalanced braces in segment '{raw}'"));
            } else {
                segments.push(Segment::Literal(raw.to_string()));
            }
        }
        if placeholders == 0 {
            return Err(format!("pattern '{pattern}' has no placeholder"));
        }
        Ok(PathPattern { segments })
    }

    /// Names of the placeholders, in order.
    pub fn placeholder_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(name) => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Match `path` and return the value captured by the placeholder named
    /// `name`, or the first placeholder when `name` doesn't appear.
    pub fn extract(&self, path: &str, name: &str) -> Option<String> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut first = None;
        let mut named = None;
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(lit) => {
                    if lit != part {
                        return None;
                    }
                }
                Segment::Placeholder(placeholder) => {
                    if first.is_none() {
                        first = Some(part.to_string());
                    }
                    if placeholder == name {
                        named = Some(part.to_string());
                    }
                }
            }
        }
        named.or(first)
    }
}

/// True when `path` matches any of the Ant-style globs.
///
/// Supported syntax: `?` one character, `*` within a segment, `**` across
/// segments (e.g. `/internal/**`, `/api/*/health`).
pub fn matches_any(globs: &[String], path: &str) -> bool {
    globs.iter().any(|g| glob_match(g, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_named_placeholder() {
        let p = PathPattern::parse("/users/{userId}/orders/{orderId}").unwrap();
        assert_eq!(
            p.extract("/users/u1/orders/o9", "orderId"),
            Some("o9".to_string())
        );
        assert_eq!(
            p.extract("/users/u1/orders/o9", "userId"),
            Some("u1".to_string())
        );
    }

    #[test]
    fn falls_back_to_first_placeholder() {
        let p = PathPattern::parse("/tenants/{tenantId}").unwrap();
        assert_eq!(
            p.extract("/tenants/acme", "somethingElse"),
            Some("acme".to_string())
        );
    }

    #[test]
    fn literal_mismatch_fails() {
        let p = PathPattern::parse("/users/{id}").unwrap();
        assert_eq!(p.extract("/accounts/u1", "id"), None);
        assert_eq!(p.extract("/users/u1/extra", "id"), None);
    }

    #[test]
    fn rejects_patterns_without_placeholder() {
        assert!(PathPattern::parse("/users/list").is_err());
        assert!(PathPattern::parse("/users/{}").is_err());
        assert!(PathPattern::parse("/users/{id").is_err());
    }

    #[test]
    fn ant_globs() {
        let globs = vec!["/health".to_string(), "/internal/**".to_string()];
        assert!(matches_any(&globs, "/health"));
        assert!(matches_any(&globs, "/internal/metrics/deep"));
        assert!(!matches_any(&globs, "/api/orders"));
    }
}
