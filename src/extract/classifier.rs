//! Personal vs institutional identifier heuristics
//!
//! The classifier is a pure predicate over the identifier string. All word
//! lists and thresholds come from [`ClassifierConfig`].

use crate::config::ClassifierConfig;
use std::fmt;

/// Outcome of classifying one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// No `@` in the identifier
    MissingAt,
    /// Local part contains this denylist entry
    Denylisted(String),
    /// Local part shorter than the minimum
    TooShort,
    /// Local part starts with this role token and a separator
    RolePrefix(String),
    /// Short separator-free local part that reads as an acronym
    Abbreviation,
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }

    /// Short label used in logs and statistics
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Accept => "accepted",
            Verdict::MissingAt => "missing_at",
            Verdict::Denylisted(_) => "denylisted",
            Verdict::TooShort => "too_short",
            Verdict::RolePrefix(_) => "role_prefix",
            Verdict::Abbreviation => "abbreviation",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Denylisted(entry) => write!(f, "denylisted ({})", entry),
            Verdict::RolePrefix(prefix) => write!(f, "role prefix ({})", prefix),
            other => f.write_str(other.label()),
        }
    }
}

/// Separates personal identifiers from role and service addresses
#[derive(Debug, Clone)]
pub struct IdentifierClassifier {
    policy: ClassifierConfig,
}

impl IdentifierClassifier {
    /// Creates a classifier; list entries are lower-cased once here
    pub fn new(mut policy: ClassifierConfig) -> Self {
        for entry in policy
            .denylist
            .iter_mut()
            .chain(policy.role_prefixes.iter_mut())
        {
            *entry = entry.to_lowercase();
        }
        Self { policy }
    }

    /// Classifies an identifier
    ///
    /// Rules are checked in order and the first failing one is reported:
    ///
    /// | Rule | Verdict |
    /// |------|---------|
    /// | no `@` | `MissingAt` |
    /// | local part contains a denylist entry | `Denylisted` |
    /// | local part shorter than `min-local-length` | `TooShort` |
    /// | role prefix followed by a separator | `RolePrefix` |
    /// | at most `abbreviation-max-length` chars, no separator, and upper-case or at most `abbreviation-short-length` chars | `Abbreviation` |
    ///
    /// # Examples
    ///
    /// ```
    /// use contact_harvester::config::ClassifierConfig;
    /// use contact_harvester::extract::{IdentifierClassifier, Verdict};
    ///
    /// let classifier = IdentifierClassifier::new(ClassifierConfig::default());
    /// assert_eq!(classifier.classify("a.yahiaoui@univ-x.dz"), Verdict::Accept);
    /// assert!(!classifier.is_personal("noreply@univ-x.dz"));
    /// ```
    pub fn classify(&self, identifier: &str) -> Verdict {
        let Some((local, _domain)) = identifier.split_once('@') else {
            return Verdict::MissingAt;
        };
        let lower = local.to_lowercase();

        if let Some(entry) = self
            .policy
            .denylist
            .iter()
            .find(|entry| !entry.is_empty() && lower.contains(entry.as_str()))
        {
            return Verdict::Denylisted(entry.clone());
        }

        let length = local.chars().count();
        if length < self.policy.min_local_length {
            return Verdict::TooShort;
        }

        if let Some(prefix) = self.policy.role_prefixes.iter().find(|prefix| {
            lower
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| self.is_separator(c))
        }) {
            return Verdict::RolePrefix(prefix.clone());
        }

        let has_separator = local.chars().any(|c| self.is_separator(c));
        let upper_case = local.chars().any(char::is_alphabetic) && !local.chars().any(char::is_lowercase);
        if length <= self.policy.abbreviation_max_length
            && !has_separator
            && (upper_case || length <= self.policy.abbreviation_short_length)
        {
            return Verdict::Abbreviation;
        }

        Verdict::Accept
    }

    pub fn is_personal(&self, identifier: &str) -> bool {
        self.classify(identifier).is_accept()
    }

    fn is_separator(&self, c: char) -> bool {
        self.policy.separators.contains(c)
    }
}
