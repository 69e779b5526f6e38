//! Local/remote endpoint pair occurrences across sibling tunnels

use std::collections::BTreeMap;

use crate::tables::UNSET_REMOTE;

/// Builds the `"{local}-{remote}"` key; an empty remote becomes
/// [`UNSET_REMOTE`].
pub fn pair_key(local: &str, remote: &str) -> String {
    let remote = if remote.is_empty() { UNSET_REMOTE } else { remote };
    format!("{}-{}", local, remote)
}

/// encapsulation → pair key → occurrence count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiblingPairIndex {
    counts: BTreeMap<String, BTreeMap<String, u32>>,
}

impl SiblingPairIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one tunnel using `pair` under `encapsulation`.
    pub fn record(&mut self, encapsulation: &str, pair: String) {
        *self
            .counts
            .entry(encapsulation.to_string())
            .or_default()
            .entry(pair)
            .or_insert(0) += 1;
    }

    /// Number of tunnels using `pair` under `encapsulation`.
    pub fn count(&self, encapsulation: &str, pair: &str) -> u32 {
        self.counts
            .get(encapsulation)
            .and_then(|pairs| pairs.get(pair))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key() {
        assert_eq!(pair_key("10.0.0.1", "10.0.0.2"), "10.0.0.1-10.0.0.2");
        assert_eq!(pair_key("10.0.0.1", ""), "10.0.0.1-<unset>");
    }

    #[test]
    fn test_first_record_per_encapsulation_starts_at_one() {
        let mut index = SiblingPairIndex::new();
        index.record("gre", pair_key("10.0.0.1", "10.0.0.2"));
        assert_eq!(index.count("gre", "10.0.0.1-10.0.0.2"), 1);

        index.record("gre", pair_key("10.0.0.1", "10.0.0.2"));
        index.record("ipip", pair_key("10.0.0.1", "10.0.0.2"));
        assert_eq!(index.count("gre", "10.0.0.1-10.0.0.2"), 2);
        assert_eq!(index.count("ipip", "10.0.0.1-10.0.0.2"), 1);
        assert_eq!(index.count("sit", "10.0.0.1-10.0.0.2"), 0);
    }
}
