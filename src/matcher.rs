//! Matching configured stop codes against GTFS-R stop ids.
//!
//! Users type the short public stop number ("1192") while the feed carries
//! NaPTAN-style ids ("8220DB001192"). Exact matches always win; the numeric
//! fallbacks can over-match (query "1" hits most ids) and can be switched off
//! individually.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    pub suffix: bool,
    pub substring: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            suffix: true,
            substring: true,
        }
    }
}

impl MatchPolicy {
    pub fn exact_only() -> Self {
        Self {
            suffix: false,
            substring: false,
        }
    }

    /// Returns the strongest rule under which `feed_id` matches `query`.
    pub fn matches(&self, query: &str, feed_id: &str) -> Option<MatchKind> {
        if feed_id == query {
            return Some(MatchKind::Exact);
        }
        if !is_numeric(query) {
            return None;
        }
        if self.suffix && feed_id.ends_with(query) {
            return Some(MatchKind::Suffix);
        }
        if self.substring && feed_id.contains(query) {
            return Some(MatchKind::Substring);
        }
        None
    }
}

fn is_numeric(query: &str) -> bool {
    !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_query_rules() {
        let policy = MatchPolicy::default();
        assert_eq!(policy.matches("1192", "1192"), Some(MatchKind::Exact));
        assert_eq!(
            policy.matches("1192", "8220DB001192"),
            Some(MatchKind::Suffix)
        );
        assert_eq!(policy.matches("1192", "X1192Y"), Some(MatchKind::Substring));
        assert_eq!(policy.matches("1192", "8220DB001193"), None);
    }

    #[test]
    fn test_alphanumeric_query_is_exact_only() {
        let policy = MatchPolicy::default();
        assert_eq!(
            policy.matches("DB001192", "DB001192"),
            Some(MatchKind::Exact)
        );
        assert_eq!(policy.matches("DB001192", "8220DB001192"), None);
        assert_eq!(policy.matches("DB001192", "XDB001192Y"), None);
    }

    #[test]
    fn test_digit_only_long_query_still_uses_fallbacks() {
        let policy = MatchPolicy::default();
        assert_eq!(
            policy.matches("001192", "8220DB001192"),
            Some(MatchKind::Suffix)
        );
    }

    #[test]
    fn test_rules_can_be_disabled() {
        let no_substring = MatchPolicy {
            substring: false,
            ..MatchPolicy::default()
        };
        assert_eq!(no_substring.matches("1192", "X1192Y"), None);
        assert_eq!(
            no_substring.matches("1192", "8220DB001192"),
            Some(MatchKind::Suffix)
        );

        let exact = MatchPolicy::exact_only();
        assert_eq!(exact.matches("1192", "8220DB001192"), None);
        assert_eq!(exact.matches("1192", "1192"), Some(MatchKind::Exact));
    }

    #[test]
    fn test_empty_query_never_fuzzy_matches() {
        assert_eq!(MatchPolicy::default().matches("", "8220DB001192"), None);
    }
}
