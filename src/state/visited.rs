use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Mutex;
use url::Url;

/// Set of normalized URLs already dispatched in this run
///
/// The set only grows. Keys are the serialized normalized URL.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a URL as visited
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The URL was not visited before and is now claimed
    /// * `Ok(false)` - The URL had already been claimed
    /// * `Err(HarvestError)` - The lock was poisoned
    pub fn mark(&self, url: &Url) -> Result<bool, HarvestError> {
        let mut urls = self
            .urls
            .lock()
            .map_err(|_| HarvestError::LockPoisoned("visited set"))?;
        Ok(urls.insert(url.as_str().to_string()))
    }

    /// Claims every URL of `candidates` that is not yet visited, under one lock
    ///
    /// Returns the indices of the claimed entries, in input order. Duplicates
    /// within `candidates` are claimed once.
    pub fn claim_all<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a Url>,
    ) -> Result<Vec<usize>, HarvestError> {
        let mut urls = self
            .urls
            .lock()
            .map_err(|_| HarvestError::LockPoisoned("visited set"))?;
        Ok(candidates
            .into_iter()
            .enumerate()
            .filter(|(_, url)| urls.insert(url.as_str().to_string()))
            .map(|(i, _)| i)
            .collect())
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.urls
            .lock()
            .map(|urls| urls.contains(url.as_str()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.urls.lock().map(|urls| urls.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_mark_once() {
        let visited = VisitedSet::new();
        let a = url("https://univ-x.dz/a");

        assert!(visited.mark(&a).unwrap());
        assert!(!visited.mark(&a).unwrap());
        assert!(visited.contains(&a));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_claim_all_skips_visited_and_duplicates() {
        let visited = VisitedSet::new();
        let a = url("https://univ-x.dz/a");
        let b = url("https://univ-x.dz/b");
        let c = url("https://univ-x.dz/c");
        visited.mark(&a).unwrap();

        let claimed = visited.claim_all([&a, &b, &b, &c]).unwrap();
        assert_eq!(claimed, vec![1, 3]);
        assert_eq!(visited.len(), 3);

        // Nothing left to claim the second time
        assert!(visited.claim_all([&a, &b, &c]).unwrap().is_empty());
    }
}
