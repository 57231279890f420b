use std::collections::BTreeSet;

/// Set of cell ids emphasized on the map for the current query result.
///
/// The set is replaced wholesale per result; `revision` bumps on every
/// replacement, including replacements with identical contents, so the layer
/// composer can key recomposition off it.
///
/// Ordering contract:
/// - Iteration yields ids in ascending lexical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightSet {
    ids: BTreeSet<String>,
    revision: u64,
}

impl HighlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut s = Self::default();
        s.replace(ids);
        s
    }

    /// Replaces the whole set. Blank ids are skipped.
    pub fn replace<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| !id.trim().is_empty())
            .collect();
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.revision += 1;
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.ids.iter().map(String::as_str)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
