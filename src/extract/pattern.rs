use regex::Regex;

/// Builds the identifier matcher for a top-level suffix
///
/// The pattern is `[\w.\-+%]+@[\w.\-]+\.<suffix>\b`, case-insensitive.
///
/// # Examples
///
/// ```
/// use contact_harvester::extract::identifier_pattern;
///
/// let pattern = identifier_pattern("dz").unwrap();
/// assert!(pattern.is_match("Write to K.Said@Univ-X.DZ today"));
/// assert!(!pattern.is_match("k.said@univ-x.fr"));
/// ```
pub fn identifier_pattern(suffix: &str) -> Result<Regex, regex::Error> {
    let suffix = suffix.trim_start_matches('.');
    Regex::new(&format!(
        r"(?i)[\w.\-+%]+@[\w.\-]+\.{}\b",
        regex::escape(suffix)
    ))
}

/// Splits an identifier into local and domain parts
///
/// Returns `None` unless both parts are non-empty.
pub fn split_identifier(identifier: &str) -> Option<(&str, &str)> {
    let (local, domain) = identifier.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some((local, domain))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_suffix_only() {
        let pattern = identifier_pattern("dz").unwrap();
        let found: Vec<&str> = pattern
            .find_iter("a.yahiaoui@univ-x.dz, x@y.com, s.hamdi@lab.univ-x.dz.")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["a.yahiaoui@univ-x.dz", "s.hamdi@lab.univ-x.dz"]);
    }

    #[test]
    fn test_suffix_must_end_a_word() {
        let pattern = identifier_pattern("dz").unwrap();
        assert!(!pattern.is_match("k.said@univ-x.dzz"));
    }

    #[test]
    fn test_split_identifier() {
        assert_eq!(split_identifier("k.said@univ-x.dz"), Some(("k.said", "univ-x.dz")));
        assert_eq!(split_identifier("@univ-x.dz"), None);
        assert_eq!(split_identifier("k.said"), None);
    }
}
