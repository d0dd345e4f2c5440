//! Required-label configuration and the match predicate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::LabelSet;

/// The label key/value pairs a secret must carry for an event to trigger.
///
/// Empty set → every secret matches (no filter configured).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredLabels(BTreeMap<String, String>);

impl RequiredLabels {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self(labels)
    }

    /// Parse a comma-separated `key=value` list, e.g. `"env=prod,trigger=true"`.
    ///
    /// Whitespace around keys and values is trimmed; entries without `=` are
    /// ignored. Values may themselves contain `=` (only the first one splits).
    pub fn parse(raw: &str) -> Self {
        let mut labels = BTreeMap::new();
        for pair in raw.split(',') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                labels.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        Self(labels)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True iff every required pair is present in `labels` with an exactly
    /// equal value. Comparison is case-sensitive on both key and value.
    pub fn matches(&self, labels: &LabelSet) -> bool {
        self.0.iter().all(|(key, value)| labels.get(key) == Some(value))
    }
}
